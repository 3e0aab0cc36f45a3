//! Repair of lyrics files the strict reader rejects
//!
//! The original file is only replaced once a repaired copy has been proven to
//! parse:
//!
//! 1. Check: read the file strictly. If that works there is nothing to do.
//! 2. Recover: pull fields out of the raw text by tag search.
//! 3. Stage: write the recovered fields to `<path>.correct.xml`.
//! 4. Verify: read the staged file strictly.
//! 5. Swap: rename the staged file over the original.
//!
//! Any failure after the check removes the staged file and reports
//! [`Error::Unrecoverable`], leaving the original byte-for-byte intact.

use std::ffi::OsString;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::document::LyricsDocument;
use crate::{reader, recovery, writer};
use crate::{Error, Result};

/// Appended to the original path to name the staged copy
pub const SCRATCH_SUFFIX: &str = ".correct.xml";

/// Result of a successful tidy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TidyOutcome {
    /// The file already parsed; nothing was touched
    AlreadyClean,
    /// The file was rewritten from recovered fields
    Repaired,
}

/// Path of the staged copy for `path`
pub fn scratch_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(SCRATCH_SUFFIX);
    PathBuf::from(name)
}

/// Repair `path` in place if it does not parse
pub fn tidy_file(path: impl AsRef<Path>) -> Result<TidyOutcome> {
    tidy_file_with(path, |_, _| {})
}

/// Like [`tidy_file`], calling `on_repaired` with the recovered document once
/// the repaired file is in place, so views of the file can be refreshed.
pub fn tidy_file_with<F>(path: impl AsRef<Path>, on_repaired: F) -> Result<TidyOutcome>
where
    F: FnOnce(&Path, &LyricsDocument),
{
    let path = path.as_ref();

    match reader::read_all(path) {
        Ok(_) => return Ok(TidyOutcome::AlreadyClean),
        Err(err) if err.needs_repair() => {
            info!("Correcting {}: {}", path.display(), err);
        }
        Err(err) => return Err(err),
    }

    let unrecoverable = |source: Error| Error::Unrecoverable {
        path: path.to_path_buf(),
        source: Box::new(source),
    };

    let recovered = recovery::recover_file(path).map_err(unrecoverable)?;

    stage_and_swap(path, &recovered, |scratch| reader::read_all(scratch).map(|_| ()))
        .map_err(unrecoverable)?;

    info!(
        "Repaired {} ({} field(s) recovered)",
        path.display(),
        recovered.len()
    );
    on_repaired(path, &recovered);
    Ok(TidyOutcome::Repaired)
}

/// Write `doc` to the scratch copy of `path`, run `verify` on it, then rename
/// it over `path`. On any failure the scratch copy is removed and `path` is
/// left untouched.
fn stage_and_swap<V>(path: &Path, doc: &LyricsDocument, verify: V) -> Result<()>
where
    V: FnOnce(&Path) -> Result<()>,
{
    let scratch = scratch_path(path);
    let staged = writer::write_to_file(&scratch, doc)
        .and_then(|()| verify(&scratch))
        .and_then(|()| fs::rename(&scratch, path).map_err(|e| Error::io(path, e)));

    if let Err(err) = staged {
        discard(&scratch);
        warn!("Could not repair {}: {}", path.display(), err);
        return Err(err);
    }
    Ok(())
}

fn discard(scratch: &Path) {
    match fs::remove_file(scratch) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove {}: {}", scratch.display(), e),
    }
}
