//! # Invocation Builder
//!
//! Assembles the packager command as an argument vector:
//!
//! ```text
//! <packager...> --onefile <--console|--windowed> [--icon <icon>] [--collect-all <m>]... --name <name> <source>
//! ```
//!
//! Arguments are handed to the OS one by one, never through a shell, so paths with spaces or
//! quotes need no escaping. [`Invocation::to_command_line`] produces the quoted, human-readable
//! form used in the audit log and `--dry-run` output.

use std::fmt;
use std::path::{Path, PathBuf};
use crate::error::ForgeError;
use crate::flags::{DependencyFlags, COLLECT_ALL_FLAG};
use crate::invariant_ppt::{assert_invariant, ICON_IFF_SUPPLIED, ONE_MODE_FLAG, SOURCE_IS_LAST};

pub const ONEFILE_FLAG: &str = "--onefile";
pub const ICON_FLAG: &str = "--icon";
pub const NAME_FLAG: &str = "--name";

/// Build mode label. Recorded in the audit log only; it does not change the command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum Profile {
    #[default]
    Standard,
    Audit,
    Hardened,
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Profile::Standard => "Standard",
            Profile::Audit => "Audit",
            Profile::Hardened => "Hardened",
        })
    }
}

/// Whether the produced binary opens a console window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Mode {
    #[default]
    Console,
    Windowed,
}

impl Mode {
    pub fn from_console(console: bool) -> Self {
        if console { Mode::Console } else { Mode::Windowed }
    }

    pub fn flag(self) -> &'static str {
        match self {
            Mode::Console => "--console",
            Mode::Windowed => "--windowed",
        }
    }
}

/// Options for one build attempt.
#[derive(Debug, Clone, Default)]
pub struct BuildConfig {
    pub name: String,
    pub icon: Option<PathBuf>,
    pub mode: Mode,
    pub profile: Profile,
}

/// A fully assembled packager command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
}

impl Invocation {
    /// Assembles the command for `source`.
    ///
    /// `packager` is the base argv (program first). Everything after it is fixed in shape;
    /// only the order of `--collect-all` pairs may differ between runs.
    pub fn build(
        packager: &[String],
        config: &BuildConfig,
        deps: &DependencyFlags,
        source: &Path,
    ) -> Result<Self, ForgeError> {
        let (program, base) = packager.split_first().ok_or(ForgeError::NoPackager)?;

        let mut args: Vec<String> = base.to_vec();
        args.push(ONEFILE_FLAG.to_string());
        args.push(config.mode.flag().to_string());
        if let Some(icon) = &config.icon {
            args.push(ICON_FLAG.to_string());
            args.push(icon.to_string_lossy().to_string());
        }
        args.extend(deps.args.iter().cloned());
        args.push(NAME_FLAG.to_string());
        args.push(config.name.clone());
        let source_arg = source.to_string_lossy().to_string();
        args.push(source_arg.clone());

        let invocation = Self {
            program: program.clone(),
            args,
        };

        let flags = invocation.flags();
        let modes = flags
            .iter()
            .filter(|f| **f == Mode::Console.flag() || **f == Mode::Windowed.flag())
            .count();
        assert_invariant(modes == 1, ONE_MODE_FLAG, Some("Invocation"));

        let icons = flags.iter().filter(|f| **f == ICON_FLAG).count();
        assert_invariant(
            icons == usize::from(config.icon.is_some()),
            ICON_IFF_SUPPLIED,
            Some("Invocation"),
        );

        assert_invariant(
            invocation.args.last() == Some(&source_arg),
            SOURCE_IS_LAST,
            Some("Invocation"),
        );

        Ok(invocation)
    }

    /// Flag tokens only, skipping the values that follow value-taking flags and the
    /// trailing source path.
    fn flags(&self) -> Vec<&str> {
        let mut out = Vec::new();
        let body = match self.args.split_last() {
            Some((_, rest)) => rest,
            None => return out,
        };

        let mut iter = body.iter();
        while let Some(arg) = iter.next() {
            let arg = arg.as_str();
            out.push(arg);
            if takes_value(arg) {
                iter.next();
            }
        }
        out
    }

    /// Modules named by `--collect-all`, in command order.
    #[allow(dead_code)]
    pub fn collected(&self) -> Vec<&str> {
        self.args
            .windows(2)
            .filter(|w| w[0] == COLLECT_ALL_FLAG)
            .map(|w| w[1].as_str())
            .collect()
    }

    /// The command as a single line, with icon, name and source quoted.
    pub fn to_command_line(&self) -> String {
        let mut parts = vec![self.program.clone()];
        let last = self.args.len().saturating_sub(1);
        let mut quote_next = false;

        for (i, arg) in self.args.iter().enumerate() {
            if quote_next || i == last {
                parts.push(format!("\"{}\"", arg));
            } else {
                parts.push(arg.clone());
            }
            quote_next = arg == ICON_FLAG || arg == NAME_FLAG;
        }

        parts.join(" ")
    }

    pub fn to_command(&self) -> std::process::Command {
        let mut cmd = std::process::Command::new(&self.program);
        cmd.args(&self.args);
        cmd
    }
}

fn takes_value(flag: &str) -> bool {
    flag == ICON_FLAG || flag == NAME_FLAG || flag == COLLECT_ALL_FLAG
}
