//! # Import Scanner
//!
//! A deliberately shallow, line-oriented pass over a Python source file.
//! It does not parse Python. It looks at each trimmed line, and if the line begins with
//! `import ` or `from `, it takes the second whitespace-delimited token and keeps
//! everything before the first `.`. That yields the top-level package name.
//!
//! ## Known Limitations
//!
//! - `import a, b` only yields `a,` (the comma is kept). It will never match a known
//!   dependency, so `b` is silently missed. We warn when we see it but do not "fix" it,
//!   because the set of collected dependencies would then change under the user's feet.
//! - Parenthesized multi-line `from x import (...)` is fine (we only need `x`), but
//!   anything clever like `exec("import foo")` is invisible.
//!
//! The scan never fails. An unreadable file produces an empty set tagged as
//! [`ScanStatus::Unreadable`] so callers can tell "no imports" apart from "couldn't look".

use std::collections::HashSet;
use std::path::Path;
use log::{debug, warn};

/// Whether the scanner actually managed to read the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanStatus {
    /// The whole file was read (invalid bytes dropped).
    Complete,
    /// The file could not be opened. Carries the OS error text.
    Unreadable(String),
}

/// Result of scanning one source file.
#[derive(Debug, Clone)]
pub struct ImportScan {
    /// Top-level module names, set semantics.
    pub imports: HashSet<String>,
    pub status: ScanStatus,
}

impl ImportScan {
    pub fn is_complete(&self) -> bool {
        self.status == ScanStatus::Complete
    }
}

/// Scans a file on disk.
///
/// Bytes that are not valid UTF-8 are dropped, never fatal.
pub fn scan_file(path: &Path) -> ImportScan {
    match std::fs::read(path) {
        Ok(bytes) => {
            let text = decode_ignoring_invalid(&bytes);
            ImportScan {
                imports: scan_text(&text),
                status: ScanStatus::Complete,
            }
        }
        Err(e) => {
            warn!("Could not read {:?} for import scanning: {}", path, e);
            ImportScan {
                imports: HashSet::new(),
                status: ScanStatus::Unreadable(e.to_string()),
            }
        }
    }
}

/// Extracts top-level import names from already-decoded source text.
///
/// `\n`, `\r\n` and a lone `\r` all end a line.
pub fn scan_text(src: &str) -> HashSet<String> {
    src.split(['\r', '\n']).filter_map(import_root).collect()
}

/// UTF-8 decoding that drops invalid byte sequences instead of substituting U+FFFD,
/// so `import num\xffpy` still reads as `import numpy`.
fn decode_ignoring_invalid(bytes: &[u8]) -> String {
    bytes.utf8_chunks().map(|chunk| chunk.valid()).collect()
}

/// Returns the top-level module named by a single line, if the line is an import.
fn import_root(line: &str) -> Option<String> {
    let line = line.trim();
    if !(line.starts_with("import ") || line.starts_with("from ")) {
        return None;
    }

    let token = line.split_whitespace().nth(1)?;
    let root = token.split('.').next().unwrap_or(token);

    // `from . import x` leaves nothing before the first dot
    if root.is_empty() {
        debug!("Skipping relative import: {}", line);
        return None;
    }

    if root.ends_with(',') {
        warn!("Multi-name import only partially understood: {}", line);
    }

    Some(root.to_string())
}
