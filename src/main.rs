//! # WinForge: The Main Entry Point
//!
//! This module handles Command Line Interface (CLI) parsing, logging initialization,
//! and dispatching commands to the build session in [`forge`].
//!
//! WinForge turns a single Python script into a standalone Windows executable by driving
//! PyInstaller (under Wine by default). Before it does, it scans the script's imports and adds
//! `--collect-all` for libraries that PyInstaller is known to under-collect.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use anyhow::Result;
use chrono::{DateTime, Local};
use clap::{Parser, Subcommand};
use log::{error, info, warn, LevelFilter};
use simplelog::{Config, SimpleLogger};

mod audit;
mod config;
mod error;
mod flags;
mod forge;
mod invariant_ppt;
mod invocation;
mod scanner;
mod system;
mod workspace;

use config::Settings;
use forge::{BuildOutcome, Forge};
use invocation::{BuildConfig, Mode, Profile};
use system::RealSystem;
use workspace::Workspace;

/// The primary Command Line Interface (CLI) configuration.
#[derive(Parser)]
#[command(name = "winforge", version)]
#[command(about = "Dependency-aware Windows binary builder for Python tools", long_about = None)]
struct Cli {
    /// The sub-command to execute (build, scan, init, history).
    #[command(subcommand)]
    command: Option<Commands>,

    /// Turn on verbose logging.
    ///
    /// - `-v`: Debug
    /// - `-vv`: Trace
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Settings file (JSON). Defaults to `winforge.json` in the user config directory.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Workspace root holding `input/`, `output/` and `logs/`. Defaults to `./workspace`.
    #[arg(long, global = true)]
    workspace: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a Python source file into a single executable.
    ///
    /// This command will:
    /// 1. Copy the source into `input/`.
    /// 2. Remove stale `build/` and `dist/` directories.
    /// 3. Scan imports and add `--collect-all` for known troublesome libraries.
    /// 4. Run the packager and move the binary to `output/<name>_v<timestamp>.exe`.
    Build {
        /// The Python source file.
        source: PathBuf,

        /// Executable name. Defaults to the source file stem.
        #[arg(long)]
        name: Option<String>,

        /// Icon (.ico) to embed.
        #[arg(long)]
        icon: Option<PathBuf>,

        /// Build a windowed binary (no console window).
        #[arg(long)]
        windowed: bool,

        /// Build profile, recorded in the audit log.
        #[arg(long, value_enum, default_value_t = Profile::Standard)]
        profile: Profile,

        /// Dry run: print the packager command without cleaning or running anything.
        #[arg(long)]
        dry_run: bool,

        /// Write the audit log to `logs/build_log_<timestamp>.txt` afterwards.
        #[arg(long)]
        export_log: bool,
    },
    /// Show which imports a source file has and which would be force-collected.
    Scan {
        /// The Python source file.
        source: PathBuf,
    },
    /// Create the workspace directories.
    Init,
    /// List previously built binaries, newest first.
    History,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Determine log level based on verbosity flag
    let log_level = match cli.verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    // Logging failure shouldn't stop a build
    let _ = SimpleLogger::init(log_level, Config::default());

    let Some(command) = &cli.command else {
        use clap::CommandFactory;
        let _ = Cli::command().print_help();
        return ExitCode::SUCCESS;
    };

    match run(&cli, command) {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli, command: &Commands) -> Result<ExitCode> {
    let settings = Settings::load(cli.config.as_deref())?;
    let workspace = resolve_workspace(cli.workspace.as_deref());
    workspace.ensure()?;

    match command {
        Commands::Build {
            source,
            name,
            icon,
            windowed,
            profile,
            dry_run,
            export_log,
        } => {
            let mut forge = Forge::new(&settings, &workspace, RealSystem);

            let stem = forge.load_source(source)?;
            if let Some(icon) = icon {
                forge.select_icon(icon);
            }
            let config = BuildConfig {
                name: name.clone().unwrap_or(stem),
                icon: None,
                mode: Mode::from_console(!*windowed),
                profile: *profile,
            };

            let result = if *dry_run {
                forge.plan(&config).map(|plan| {
                    println!("{}", plan.invocation.to_command_line());
                    ExitCode::SUCCESS
                })
            } else {
                forge.build(&config).map(report)
            };

            // the trail is exported even when the attempt was refused
            if *export_log {
                if let Some(file) = forge.audit.export(&workspace.logs)? {
                    info!("Log saved: {}", file.display());
                }
            }
            Ok(result?)
        }
        Commands::Scan { source } => {
            let scan = scanner::scan_file(source);
            let known = flags::KnownDependencies::new(settings.known_dependencies.iter().cloned());
            let mut audit = audit::AuditLog::new();
            let deps = flags::synthesize(&scan.imports, &known, &mut audit);

            let mut imports: Vec<&String> = scan.imports.iter().collect();
            imports.sort();

            if let scanner::ScanStatus::Unreadable(reason) = &scan.status {
                warn!("Scan incomplete: {}", reason);
            }
            println!("Imports ({}):", imports.len());
            for module in imports {
                println!("  {}", module);
            }
            println!("Extra flags:{}", deps.to_flag_string());
            Ok(ExitCode::SUCCESS)
        }
        Commands::Init => {
            info!("Workspace ready at {}", workspace.root.display());
            Ok(ExitCode::SUCCESS)
        }
        Commands::History => {
            let artifacts = workspace.list_artifacts();
            if artifacts.is_empty() {
                println!("No binaries in {}", workspace.output.display());
            }
            for a in artifacts {
                let when = a
                    .modified
                    .map(|t| DateTime::<Local>::from(t).format("%Y-%m-%d %H:%M:%S").to_string())
                    .unwrap_or_else(|| "-".to_string());
                let file = a.path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
                println!("{}  {:>10}  {}", when, a.size, file);
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Explicit `--workspace`, otherwise `<cwd>/workspace`. The packager always runs in the cwd.
fn resolve_workspace(explicit: Option<&Path>) -> Workspace {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    match explicit {
        Some(root) => Workspace::at(&cwd, root),
        None => Workspace::under(&cwd),
    }
}

fn report(outcome: BuildOutcome) -> ExitCode {
    match outcome {
        BuildOutcome::Succeeded { artifact } => {
            println!("EXE ready: {}", artifact.display());
            ExitCode::SUCCESS
        }
        BuildOutcome::ToolFailed { diagnostics } => {
            error!("Build failed: {}", diagnostics);
            ExitCode::FAILURE
        }
        BuildOutcome::ArtifactMissing { expected } => {
            warn!("Packager finished but {} was not produced", expected.display());
            ExitCode::FAILURE
        }
    }
}
