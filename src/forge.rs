//! # Build Orchestration
//!
//! A [`Forge`] is one build session: a loaded source, an optional icon, the audit trail,
//! and the state machine for the build that is (at most one at a time) in flight:
//!
//! ```text
//! Idle -> Scanning -> CommandBuilt -> Executing -> { Succeeded | ToolFailed | ArtifactMissing } -> Idle
//! ```
//!
//! Every path returns to `Idle`. Nothing is retried.
//!
//! All process and staging-directory side effects go through [`BuildOps`] so the whole flow
//! runs against `MockSystem` in tests.

use std::path::{Path, PathBuf};
use chrono::Local;
use log::{debug, warn};
use crate::audit::{AuditLog, AuditTag};
use crate::config::Settings;
use crate::error::ForgeError;
use crate::flags::{self, DependencyFlags, KnownDependencies};
use crate::invocation::{BuildConfig, Invocation};
use crate::scanner::{self, ImportScan};
use crate::system::BuildOps;
use crate::workspace::Workspace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildState {
    Idle,
    Scanning,
    CommandBuilt,
    Executing,
    Succeeded,
    ToolFailed,
    ArtifactMissing,
}

/// How a build attempt that got as far as running the packager ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildOutcome {
    /// Binary relocated into `output/`.
    Succeeded { artifact: PathBuf },
    /// Packager exited non-zero or could not be started.
    ToolFailed { diagnostics: String },
    /// Packager reported success but nothing was at the expected location.
    ArtifactMissing { expected: PathBuf },
}

impl BuildOutcome {
    fn state(&self) -> BuildState {
        match self {
            BuildOutcome::Succeeded { .. } => BuildState::Succeeded,
            BuildOutcome::ToolFailed { .. } => BuildState::ToolFailed,
            BuildOutcome::ArtifactMissing { .. } => BuildState::ArtifactMissing,
        }
    }
}

/// Everything decided before the packager runs.
#[derive(Debug, Clone)]
pub struct BuildPlan {
    pub scan: ImportScan,
    pub dependencies: DependencyFlags,
    pub invocation: Invocation,
    /// `YYYYMMDD_HHMMSS`, embedded in the final artifact name.
    pub version: String,
}

pub struct Forge<'a, S: BuildOps> {
    settings: &'a Settings,
    workspace: &'a Workspace,
    system: S,
    known: KnownDependencies,
    source: Option<PathBuf>,
    icon: Option<PathBuf>,
    state: BuildState,
    transitions: Vec<BuildState>,
    pub audit: AuditLog,
}

impl<'a, S: BuildOps> Forge<'a, S> {
    pub fn new(settings: &'a Settings, workspace: &'a Workspace, system: S) -> Self {
        Self {
            settings,
            workspace,
            system,
            known: KnownDependencies::new(settings.known_dependencies.iter().cloned()),
            source: None,
            icon: None,
            state: BuildState::Idle,
            transitions: Vec::new(),
            audit: AuditLog::new(),
        }
    }

    #[allow(dead_code)]
    pub fn state(&self) -> BuildState {
        self.state
    }

    /// Every state entered so far, in order.
    #[allow(dead_code)]
    pub fn transitions(&self) -> &[BuildState] {
        &self.transitions
    }

    #[allow(dead_code)]
    pub fn system(&self) -> &S {
        &self.system
    }

    /// Copies `path` into the workspace and makes it the current source.
    ///
    /// Returns the file stem, the conventional default executable name.
    pub fn load_source(&mut self, path: &Path) -> Result<String, ForgeError> {
        let copy = self.workspace.ingest(path)?;
        let name = display_name(path);
        self.audit.record(AuditTag::Ingest, format!("Source accepted: {}", name));
        self.source = Some(copy);

        Ok(path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default())
    }

    pub fn select_icon(&mut self, path: &Path) {
        self.audit.record(AuditTag::Config, format!("Icon selected: {}", display_name(path)));
        self.icon = Some(path.to_path_buf());
    }

    /// Scans and assembles the command without touching the staging area or running anything.
    pub fn plan(&mut self, config: &BuildConfig) -> Result<BuildPlan, ForgeError> {
        let (source, config) = self.validate(config)?;
        let result = self.prepare(&source, &config);
        self.enter(BuildState::Idle);
        result
    }

    /// Runs one full build attempt.
    ///
    /// `Err` means the attempt was refused or the workspace failed underneath it.
    /// Every run of the packager, good or bad, ends in `Ok(outcome)`.
    pub fn build(&mut self, config: &BuildConfig) -> Result<BuildOutcome, ForgeError> {
        let (source, config) = self.validate(config)?;

        self.audit.record(
            AuditTag::Process,
            format!("Compilation started ({})", config.profile),
        );

        let result = self.run(&source, &config);
        if let Ok(outcome) = &result {
            self.enter(outcome.state());
        }
        self.enter(BuildState::Idle);
        result
    }

    fn run(&mut self, source: &Path, config: &BuildConfig) -> Result<BuildOutcome, ForgeError> {
        self.purge_staging();

        let plan = self.prepare(source, config)?;

        self.enter(BuildState::Executing);
        let status = match self.system.run_packager(&plan.invocation, &self.workspace.staging) {
            Ok(status) => status,
            Err(e) => {
                let diagnostics = e.to_string();
                self.audit.record(AuditTag::Failure, format!("Compilation error: {}", diagnostics));
                return Ok(BuildOutcome::ToolFailed { diagnostics });
            }
        };

        if !status.success() {
            self.audit.record(
                AuditTag::Failure,
                format!("Compilation error: {}", status.diagnostics),
            );
            return Ok(BuildOutcome::ToolFailed {
                diagnostics: status.diagnostics,
            });
        }

        let ext = &self.settings.artifact_extension;
        let expected = self
            .workspace
            .staging
            .join(&self.settings.dist_dir)
            .join(format!("{}.{}", config.name, ext));

        if !self.system.path_exists(&expected) {
            self.audit.record(AuditTag::Error, "EXE not found post-compilation");
            return Ok(BuildOutcome::ArtifactMissing { expected });
        }

        let artifact = self.workspace.artifact_path(&config.name, &plan.version, ext);
        self.system
            .move_file(&expected, &artifact)
            .map_err(ForgeError::Relocate)?;
        self.audit.record(
            AuditTag::Success,
            format!("Binary generated: {}", artifact.display()),
        );

        Ok(BuildOutcome::Succeeded { artifact })
    }

    /// Policy checks. Nothing is recorded or started when these fail.
    fn validate(&self, config: &BuildConfig) -> Result<(PathBuf, BuildConfig), ForgeError> {
        let source = self.source.clone().ok_or(ForgeError::NoSource)?;

        let name = config.name.trim();
        if name.is_empty() {
            return Err(ForgeError::EmptyName);
        }

        let mut config = config.clone();
        config.name = name.to_string();
        if config.icon.is_none() {
            config.icon = self.icon.clone();
        }
        Ok((source, config))
    }

    fn purge_staging(&mut self) {
        for dir in &self.settings.staging_dirs {
            let path = self.workspace.staging.join(dir);
            if let Err(e) = self.system.remove_dir(&path) {
                warn!("Could not remove {:?}: {:#}", path, e);
            }
        }
        self.audit.record(AuditTag::Cleanup, "Previous build artifacts removed");
    }

    fn prepare(&mut self, source: &Path, config: &BuildConfig) -> Result<BuildPlan, ForgeError> {
        self.enter(BuildState::Scanning);
        let scan = scanner::scan_file(source);
        if !scan.is_complete() {
            debug!("Scan incomplete, building without extra collection flags");
        }

        let dependencies = flags::synthesize(&scan.imports, &self.known, &mut self.audit);
        let invocation = Invocation::build(&self.settings.packager, config, &dependencies, source)?;
        let version = Local::now().format("%Y%m%d_%H%M%S").to_string();

        self.enter(BuildState::CommandBuilt);
        self.audit.record(AuditTag::Command, invocation.to_command_line());

        Ok(BuildPlan {
            scan,
            dependencies,
            invocation,
            version,
        })
    }

    fn enter(&mut self, state: BuildState) {
        debug!("Build state: {:?} -> {:?}", self.state, state);
        self.state = state;
        self.transitions.push(state);
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}
