//! # Workspace Layout
//!
//! All build state lives under one root:
//!
//! ```text
//! <base>/               packager working directory (build/ and dist/ appear here)
//! <base>/workspace/
//!     input/            ingested copies of source files
//!     output/           relocated binaries, `<name>_v<YYYYMMDD_HHMMSS>.<ext>`
//!     logs/             exported audit logs
//! ```
//!
//! Nothing is created at load time. Call [`Workspace::ensure`] once at startup; it is idempotent.

use std::path::{Path, PathBuf};
use std::time::SystemTime;
use anyhow::{Context, Result};
use log::debug;
use walkdir::WalkDir;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    /// Where the packager runs.
    pub staging: PathBuf,
    pub root: PathBuf,
    pub input: PathBuf,
    pub output: PathBuf,
    pub logs: PathBuf,
}

/// A binary sitting in `output/`.
#[derive(Debug, Clone)]
pub struct ArtifactEntry {
    pub path: PathBuf,
    pub size: u64,
    pub modified: Option<SystemTime>,
}

impl Workspace {
    /// Layout rooted at `<base>/workspace`, with the packager running in `base`.
    pub fn under(base: &Path) -> Self {
        Self::at(base, &base.join("workspace"))
    }

    /// Layout with an explicit workspace root.
    pub fn at(staging: &Path, root: &Path) -> Self {
        Self {
            staging: staging.to_path_buf(),
            root: root.to_path_buf(),
            input: root.join("input"),
            output: root.join("output"),
            logs: root.join("logs"),
        }
    }

    /// Creates `input/`, `output/` and `logs/` if they are missing.
    pub fn ensure(&self) -> Result<()> {
        for dir in [&self.input, &self.output, &self.logs] {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create workspace directory {:?}", dir))?;
        }
        debug!("Workspace ready at {:?}", self.root);
        Ok(())
    }

    /// Copies `source` into `input/`, overwriting an older copy of the same name.
    pub fn ingest(&self, source: &Path) -> std::io::Result<PathBuf> {
        let file_name = source.file_name().ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("{:?} has no file name", source),
            )
        })?;
        std::fs::create_dir_all(&self.input)?;
        let dst = self.input.join(file_name);

        // copying a file onto itself truncates it first
        if let (Ok(a), Ok(b)) = (source.canonicalize(), dst.canonicalize()) {
            if a == b {
                debug!("{:?} is already in the workspace, not copying", source);
                return Ok(dst);
            }
        }

        std::fs::copy(source, &dst)?;
        Ok(dst)
    }

    /// Final resting place for a build of `name` stamped `version`.
    pub fn artifact_path(&self, name: &str, version: &str, ext: &str) -> PathBuf {
        self.output.join(artifact_file_name(name, version, ext))
    }

    /// Binaries in `output/`, newest first.
    pub fn list_artifacts(&self) -> Vec<ArtifactEntry> {
        let mut entries: Vec<ArtifactEntry> = WalkDir::new(&self.output)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter_map(|e| {
                let meta = e.metadata().ok()?;
                Some(ArtifactEntry {
                    path: e.into_path(),
                    size: meta.len(),
                    modified: meta.modified().ok(),
                })
            })
            .collect();

        entries.sort_by(|a, b| b.modified.cmp(&a.modified).then_with(|| b.path.cmp(&a.path)));
        entries
    }
}

/// `<name>_v<version>.<ext>`
pub fn artifact_file_name(name: &str, version: &str, ext: &str) -> String {
    format!("{}_v{}.{}", name, version, ext)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::under(dir.path());

        ws.ensure().unwrap();
        ws.ensure().unwrap();

        assert!(ws.input.is_dir());
        assert!(ws.output.is_dir());
        assert!(ws.logs.is_dir());
        assert_eq!(ws.root, dir.path().join("workspace"));
        assert_eq!(ws.staging, dir.path());
    }

    #[test]
    fn test_ingest_copies_into_input() {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::under(dir.path());
        let src = dir.path().join("tool.py");
        std::fs::write(&src, "import os\n").unwrap();

        let copy = ws.ingest(&src).unwrap();
        assert_eq!(copy, ws.input.join("tool.py"));
        assert_eq!(std::fs::read_to_string(&copy).unwrap(), "import os\n");
        assert!(src.exists());
    }

    #[test]
    fn test_reingesting_the_workspace_copy_keeps_its_content() {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::under(dir.path());
        ws.ensure().unwrap();
        let copy = ws.input.join("tool.py");
        std::fs::write(&copy, "import requests\n").unwrap();

        let again = ws.ingest(&copy).unwrap();
        assert_eq!(again, copy);
        assert_eq!(std::fs::read_to_string(&copy).unwrap(), "import requests\n");

        // same file reached through a non-canonical path
        let roundabout = ws.input.join("..").join("input").join("tool.py");
        ws.ingest(&roundabout).unwrap();
        assert_eq!(std::fs::read_to_string(&copy).unwrap(), "import requests\n");
    }

    #[test]
    fn test_ingest_missing_source_fails() {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::under(dir.path());
        assert!(ws.ingest(&dir.path().join("ghost.py")).is_err());
    }

    #[test]
    fn test_artifact_naming() {
        assert_eq!(
            artifact_file_name("tool", "20260102_030405", "exe"),
            "tool_v20260102_030405.exe"
        );
        let ws = Workspace::under(Path::new("/base"));
        assert_eq!(
            ws.artifact_path("tool", "20260102_030405", "exe"),
            PathBuf::from("/base/workspace/output/tool_v20260102_030405.exe")
        );
    }

    #[test]
    fn test_list_artifacts_skips_directories() {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::under(dir.path());
        ws.ensure().unwrap();
        std::fs::write(ws.output.join("a_v20260101_000000.exe"), b"MZ").unwrap();
        std::fs::write(ws.output.join("b_v20260101_000001.exe"), b"MZMZ").unwrap();
        std::fs::create_dir_all(ws.output.join("nested")).unwrap();

        let list = ws.list_artifacts();
        assert_eq!(list.len(), 2);
        let total: u64 = list.iter().map(|a| a.size).sum();
        assert_eq!(total, 6);
    }
}
