//! Discovery of verifier units.
//!
//! The verifier directory is listed on every call, never cached. Entries are
//! sorted by name and capped by the configured maximum.

use std::path::{Path, PathBuf};

use crate::error::{Result, VerifyError};
use crate::types::VerifierUnit;

/// Outcome of listing the verifier directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolution {
    /// Verification is switched off by a zero cap.
    Disabled,
    /// The verifier directory does not exist.
    Missing(PathBuf),
    /// The verifier directory holds no units.
    Empty(PathBuf),
    /// Units to run, in name order, after the cap was applied.
    Units(Vec<VerifierUnit>),
}

impl Resolution {
    /// Informational reason for a verification that ran no units.
    ///
    /// `None` when there are units to run. A disabled verifier yields an
    /// empty reason.
    pub fn idle_reason(&self) -> Option<String> {
        match self {
            Resolution::Disabled => Some(String::new()),
            Resolution::Missing(dir) => Some(format!(
                "image verifier directory {} does not exist",
                dir.display()
            )),
            Resolution::Empty(dir) => Some(format!(
                "no image verifier binaries found in {}",
                dir.display()
            )),
            Resolution::Units(_) => None,
        }
    }
}

/// Lists `dir` and returns the units to run.
///
/// `max_verifiers` below zero keeps every unit, zero disables verification
/// without touching the directory, and N keeps the first N units by name.
/// Subdirectories are skipped; every other entry is a unit.
///
/// # Errors
///
/// A missing directory is not an error. Any other listing failure is
/// returned as [`VerifyError::ListDirectory`].
pub async fn resolve_units(dir: &Path, max_verifiers: i32) -> Result<Resolution> {
    if max_verifiers == 0 {
        return Ok(Resolution::Disabled);
    }

    let list_err = |source| VerifyError::ListDirectory {
        path: dir.to_path_buf(),
        source,
    };

    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(Resolution::Missing(dir.to_path_buf()));
        }
        Err(e) => return Err(list_err(e)),
    };

    let mut units = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(list_err)? {
        let path = entry.path();
        // Follows symlinks; a dangling link stays a unit and fails at launch.
        let is_dir = tokio::fs::metadata(&path)
            .await
            .map(|meta| meta.is_dir())
            .unwrap_or(false);
        if is_dir {
            continue;
        }
        units.push(VerifierUnit {
            name: entry.file_name().to_string_lossy().into_owned(),
            path,
        });
    }

    if units.is_empty() {
        return Ok(Resolution::Empty(dir.to_path_buf()));
    }

    units.sort();

    if let Ok(cap) = usize::try_from(max_verifiers) {
        if units.len() > cap {
            tracing::warn!(
                dir = %dir.display(),
                found = units.len(),
                max_verifiers = cap,
                "image verifiers are being skipped since the directory holds more entries than the configured maximum"
            );
            units.truncate(cap);
        }
    }

    Ok(Resolution::Units(units))
}
