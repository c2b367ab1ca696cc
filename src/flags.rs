//! # Dependency Flag Synthesis
//!
//! Intersects the scanned imports with the known-problematic set and turns each hit into a
//! `--collect-all <module>` pair. One audit record per hit.
//!
//! Order of the pairs follows the detected set's iteration order, which is unspecified.
//! Nothing downstream may depend on it.

use std::collections::HashSet;
use crate::audit::{AuditLog, AuditTag};

pub const COLLECT_ALL_FLAG: &str = "--collect-all";

/// Process-wide, read-only set of libraries needing explicit collection.
#[derive(Debug, Clone)]
pub struct KnownDependencies {
    names: HashSet<String>,
}

impl KnownDependencies {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, module: &str) -> bool {
        self.names.contains(module)
    }
}

/// Matched modules plus the argument tokens they expand to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyFlags {
    pub matched: Vec<String>,
    pub args: Vec<String>,
}

impl DependencyFlags {
    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.matched.is_empty()
    }

    /// Shell-style rendering, each flag prefixed by one space. Empty when nothing matched.
    pub fn to_flag_string(&self) -> String {
        self.matched
            .iter()
            .map(|m| format!(" {} {}", COLLECT_ALL_FLAG, m))
            .collect()
    }
}

/// Builds the collection flags for every detected import that is also a known dependency.
pub fn synthesize(
    detected: &HashSet<String>,
    known: &KnownDependencies,
    audit: &mut AuditLog,
) -> DependencyFlags {
    let mut flags = DependencyFlags::default();

    for module in detected.iter().filter(|m| known.contains(m)) {
        audit.record(AuditTag::AutoImport, format!("Collected dependency: {}", module));
        flags.args.push(COLLECT_ALL_FLAG.to_string());
        flags.args.push(module.clone());
        flags.matched.push(module.clone());
    }

    flags
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_KNOWN_DEPENDENCIES;

    fn detected(names: &[&str]) -> HashSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_only_known_modules_are_collected() {
        let known = KnownDependencies::new(DEFAULT_KNOWN_DEPENDENCIES.iter().copied());
        let mut audit = AuditLog::new();

        let flags = synthesize(&detected(&["numpy", "os"]), &known, &mut audit);

        let s = flags.to_flag_string();
        assert_eq!(s.matches("--collect-all numpy").count(), 1);
        assert!(!s.contains("os"));
        assert_eq!(flags.args, vec!["--collect-all", "numpy"]);
        assert_eq!(audit.lines().len(), 1);
        assert!(audit.lines()[0].contains("Collected dependency: numpy"));
    }

    #[test]
    fn test_empty_intersection_is_empty_string() {
        let known = KnownDependencies::new(["numpy"]);
        let mut audit = AuditLog::new();

        let flags = synthesize(&detected(&["os", "sys"]), &known, &mut audit);
        assert!(flags.is_empty());
        assert_eq!(flags.to_flag_string(), "");
        assert!(flags.args.is_empty());
        assert!(audit.is_empty());
    }

    #[test]
    fn test_multiple_matches_pair_up() {
        let known = KnownDependencies::new(["numpy", "pandas", "requests"]);
        let mut audit = AuditLog::new();

        let flags = synthesize(&detected(&["pandas", "numpy", "json"]), &known, &mut audit);

        let mut matched = flags.matched.clone();
        matched.sort();
        assert_eq!(matched, vec!["numpy", "pandas"]);
        // every module is preceded by its flag
        for pair in flags.args.chunks(2) {
            assert_eq!(pair[0], COLLECT_ALL_FLAG);
            assert!(flags.matched.contains(&pair[1]));
        }
        assert_eq!(audit.lines().len(), 2);
    }

    #[test]
    fn test_match_is_case_sensitive() {
        let known = KnownDependencies::new(["PIL"]);
        let mut audit = AuditLog::new();
        assert!(synthesize(&detected(&["pil"]), &known, &mut audit).is_empty());
        assert!(!synthesize(&detected(&["PIL"]), &known, &mut audit).is_empty());
    }
}
