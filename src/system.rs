use std::path::{Path, PathBuf};
use std::collections::HashMap;
use std::io::Write;
use std::process::Stdio;
use std::sync::Mutex;
use anyhow::{Context, Result};
use log::debug;
use crate::error::ForgeError;
use crate::invocation::Invocation;

/// Exit information from one packager run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolStatus {
    /// `None` if the process was killed by a signal.
    pub code: Option<i32>,
    /// Whatever the process facility tells us about the run.
    pub diagnostics: String,
}

impl ToolStatus {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Abstraction for the side effects of a build (child processes, staging directories, moves).
/// This lets the orchestrator be exercised without PyInstaller or Wine installed.
pub trait BuildOps {
    /// Run the packager in `workdir` and block until it exits.
    fn run_packager(&self, invocation: &Invocation, workdir: &Path) -> Result<ToolStatus, ForgeError>;

    /// Remove a directory tree. A directory that does not exist is not an error.
    fn remove_dir(&self, path: &Path) -> Result<()>;

    fn path_exists(&self, path: &Path) -> bool;

    /// Move a file, across filesystems if need be.
    fn move_file(&self, from: &Path, to: &Path) -> Result<()>;
}

/// How much of the packager's stderr ends up in `ToolStatus::diagnostics`.
const STDERR_TAIL_LINES: usize = 20;

/// Last `max_lines` non-blank lines of captured stderr, lossily decoded.
fn stderr_tail(stderr: &[u8], max_lines: usize) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(max_lines);
    lines[start..].join("\n")
}

/// The real implementation (Production).
pub struct RealSystem;

impl BuildOps for RealSystem {
    fn run_packager(&self, invocation: &Invocation, workdir: &Path) -> Result<ToolStatus, ForgeError> {
        // stdout goes straight to the terminal, stderr is kept for the audit trail
        let output = invocation
            .to_command()
            .current_dir(workdir)
            .stdout(Stdio::inherit())
            .stderr(Stdio::piped())
            .output()
            .map_err(|source| ForgeError::Spawn {
                program: invocation.program.clone(),
                source,
            })?;

        let _ = std::io::stderr().write_all(&output.stderr);

        let mut diagnostics = format!("`{}` returned {}", invocation.program, output.status);
        let tail = stderr_tail(&output.stderr, STDERR_TAIL_LINES);
        if !tail.is_empty() {
            diagnostics.push('\n');
            diagnostics.push_str(&tail);
        }

        Ok(ToolStatus {
            code: output.status.code(),
            diagnostics,
        })
    }

    fn remove_dir(&self, path: &Path) -> Result<()> {
        match std::fs::remove_dir_all(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to remove {:?}", path)),
        }
    }

    fn path_exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn move_file(&self, from: &Path, to: &Path) -> Result<()> {
        if std::fs::rename(from, to).is_ok() {
            return Ok(());
        }
        // rename fails across devices; fall back to copy + delete
        debug!("rename {:?} -> {:?} failed, copying instead", from, to);
        std::fs::copy(from, to).with_context(|| format!("Failed to copy {:?} to {:?}", from, to))?;
        std::fs::remove_file(from).with_context(|| format!("Failed to remove {:?}", from))?;
        Ok(())
    }
}

/// A Mock System for Testing.
#[allow(dead_code)]
#[derive(Debug, Default)]
pub struct MockSystem {
    /// Exit code the fake packager returns.
    pub exit_code: i32,
    /// File (relative to the workdir) the fake packager "creates" on success.
    pub artifact_on_success: Option<PathBuf>,
    pub file_system: Mutex<Vec<PathBuf>>,
    pub invocations: Mutex<Vec<Invocation>>,
    pub removed: Mutex<Vec<PathBuf>>,
    pub moves: Mutex<HashMap<PathBuf, PathBuf>>,
}

impl MockSystem {
    #[allow(dead_code)]
    pub fn new() -> Self {
        Self::default()
    }

    /// A packager that succeeds and leaves `artifact` behind.
    #[allow(dead_code)]
    pub fn producing(artifact: &str) -> Self {
        Self {
            artifact_on_success: Some(PathBuf::from(artifact)),
            ..Default::default()
        }
    }

    /// A packager that exits with `code` and produces nothing.
    #[allow(dead_code)]
    pub fn failing(code: i32) -> Self {
        Self {
            exit_code: code,
            ..Default::default()
        }
    }
}

impl BuildOps for MockSystem {
    fn run_packager(&self, invocation: &Invocation, workdir: &Path) -> Result<ToolStatus, ForgeError> {
        self.invocations.lock().unwrap().push(invocation.clone());

        if self.exit_code == 0 {
            if let Some(artifact) = &self.artifact_on_success {
                self.file_system.lock().unwrap().push(workdir.join(artifact));
            }
        }

        Ok(ToolStatus {
            code: Some(self.exit_code),
            diagnostics: format!("mock packager returned exit status: {}", self.exit_code),
        })
    }

    fn remove_dir(&self, path: &Path) -> Result<()> {
        self.removed.lock().unwrap().push(path.to_path_buf());
        self.file_system.lock().unwrap().retain(|p| !p.starts_with(path));
        Ok(())
    }

    fn path_exists(&self, path: &Path) -> bool {
        let fs = self.file_system.lock().unwrap();
        fs.contains(&path.to_path_buf())
    }

    fn move_file(&self, from: &Path, to: &Path) -> Result<()> {
        let mut fs = self.file_system.lock().unwrap();
        let idx = fs
            .iter()
            .position(|p| p == from)
            .ok_or_else(|| anyhow::anyhow!("{:?} not found in mock file system", from))?;
        fs.remove(idx);
        fs.push(to.to_path_buf());
        self.moves.lock().unwrap().insert(from.to_path_buf(), to.to_path_buf());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_real_remove_missing_dir_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        assert!(RealSystem.remove_dir(&dir.path().join("build")).is_ok());
    }

    #[test]
    fn test_real_move_file() {
        let dir = tempfile::tempdir().unwrap();
        let from = dir.path().join("tool.exe");
        let to = dir.path().join("out").join("tool_v1.exe");
        std::fs::write(&from, b"MZ").unwrap();
        std::fs::create_dir_all(to.parent().unwrap()).unwrap();

        RealSystem.move_file(&from, &to).unwrap();
        assert!(!from.exists());
        assert_eq!(std::fs::read(&to).unwrap(), b"MZ");
    }

    #[test]
    fn test_real_spawn_failure_is_error() {
        let inv = Invocation {
            program: "winforge-definitely-not-a-real-program".to_string(),
            args: vec![],
        };
        let dir = tempfile::tempdir().unwrap();
        let result = RealSystem.run_packager(&inv, dir.path());
        assert!(matches!(result, Err(ForgeError::Spawn { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_real_failure_carries_stderr() {
        let inv = Invocation {
            program: "sh".to_string(),
            args: vec![
                "-c".to_string(),
                "echo 'ModuleNotFoundError: No module named foo' >&2; exit 3".to_string(),
            ],
        };
        let dir = tempfile::tempdir().unwrap();

        let status = RealSystem.run_packager(&inv, dir.path()).unwrap();
        assert!(!status.success());
        assert_eq!(status.code, Some(3));
        assert!(status.diagnostics.contains("ModuleNotFoundError: No module named foo"));
    }

    #[test]
    fn test_stderr_tail_keeps_last_lines() {
        let stderr = b"one\n\ntwo\nthree\nfour\n";
        assert_eq!(stderr_tail(stderr, 2), "three\nfour");
        assert_eq!(stderr_tail(stderr, 10), "one\ntwo\nthree\nfour");
        assert_eq!(stderr_tail(b"", 5), "");
    }

    #[test]
    fn test_mock_remove_drops_contents() {
        let mock = MockSystem::producing("dist/app.exe");
        let inv = Invocation { program: "p".to_string(), args: vec![] };
        mock.run_packager(&inv, Path::new("/w")).unwrap();
        assert!(mock.path_exists(Path::new("/w/dist/app.exe")));

        mock.remove_dir(Path::new("/w/dist")).unwrap();
        assert!(!mock.path_exists(Path::new("/w/dist/app.exe")));
    }
}
