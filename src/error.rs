use thiserror::Error;

/// Reasons a build attempt stops before (or while) starting the packager.
///
/// A packager that exits non-zero, or that "succeeds" without leaving a binary behind,
/// is not an error here. Those are ordinary outcomes, see `forge::BuildOutcome`.
#[derive(Debug, Error)]
pub enum ForgeError {
    /// No source file was provided.
    #[error("Policy violation: no source loaded")]
    NoSource,

    /// The executable name is empty after trimming.
    #[error("Invalid configuration: executable name required")]
    EmptyName,

    /// Settings provided no packager program.
    #[error("Invalid configuration: packager command is empty")]
    NoPackager,

    /// The packager could not be started at all (not found, not executable).
    #[error("Failed to launch packager `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Workspace filesystem work (ingest) failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The built binary could not be moved into `output/`.
    #[error("Failed to relocate artifact: {0:#}")]
    Relocate(anyhow::Error),
}
