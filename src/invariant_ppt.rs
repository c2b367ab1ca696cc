use std::collections::HashSet;
use std::sync::Mutex;
use lazy_static::lazy_static;
use log::{error, info};

/// Exactly one of `--console` / `--windowed` is on the command line.
pub const ONE_MODE_FLAG: &str = "Invocation carries exactly one mode flag";
/// `--icon` appears once with an icon, never without.
pub const ICON_IFF_SUPPLIED: &str = "Invocation carries --icon iff an icon was supplied";
/// The source file is the final positional argument.
pub const SOURCE_IS_LAST: &str = "Invocation ends with the source path";

lazy_static! {
    /// Descriptions of every invariant that has held at least once in this process.
    static ref CHECKED_INVARIANTS: Mutex<HashSet<String>> = Mutex::new(HashSet::new());
}

/// Asserts that a build invariant holds.
///
/// A violation is logged. In debug and test builds it also panics, since a malformed
/// packager command is never worth running.
///
/// # Arguments
/// * `condition` - The boolean result of the check.
/// * `description` - What must hold (use one of the constants above where possible).
/// * `component` - Optional component tag (e.g., "Invocation", "Forge").
pub fn assert_invariant(condition: bool, description: &str, component: Option<&str>) {
    if !condition {
        let msg = format!(
            "INVARIANT VIOLATION [{}]: {}",
            component.unwrap_or("General"),
            description
        );
        error!("{}", msg);

        if cfg!(debug_assertions) || cfg!(test) {
            panic!("{}", msg);
        }
    } else {
        CHECKED_INVARIANTS
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(description.to_string());
    }
}

/// Panics unless every one of `required_invariants` has been asserted (and held) already.
#[allow(dead_code)]
pub fn contract_test(context: &str, required_invariants: &[&str]) {
    // guard must be released before panicking so the set is never poisoned
    let missing: Vec<&str> = {
        let checked = CHECKED_INVARIANTS.lock().unwrap_or_else(|e| e.into_inner());
        required_invariants
            .iter()
            .copied()
            .filter(|req| !checked.contains(*req))
            .collect()
    };

    if !missing.is_empty() {
        panic!(
            "Contract Test Failed for '{}'. The following invariants were NOT checked:\n{:#?}",
            context, missing
        );
    }
    info!("Contract Test Passed: {}", context);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_holding_invariant_is_recorded() {
        assert_invariant(true, "unit: always true", Some("Test"));
        contract_test("recorded", &["unit: always true"]);
    }

    #[test]
    #[should_panic(expected = "INVARIANT VIOLATION [Test]")]
    fn test_violation_panics_under_test() {
        assert_invariant(false, "unit: never true", Some("Test"));
    }

    #[test]
    #[should_panic(expected = "were NOT checked")]
    fn test_contract_detects_unchecked() {
        contract_test("unchecked", &["unit: nobody asserts this"]);
    }
}
