//! Intermediate artifact of the two-phase "select, then remove" workflow:
//! a flat JSON array of statement ids, overwritten on every run.

use crate::core::{Result, StatementId, SweepError};
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

pub const DEFAULT_DUMP_FILE: &str = "temp.ids.json";

/// Writes `ids` to `path`, replacing the file atomically.
pub fn write_statement_ids(path: impl AsRef<Path>, ids: &[StatementId]) -> Result<()> {
    let path = path.as_ref();
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file = NamedTempFile::new_in(dir)?;
    serde_json::to_writer_pretty(&mut file, ids)?;
    file.write_all(b"\n")?;
    file.persist(path)
        .map_err(|err| SweepError::Io(err.to_string()))?;
    Ok(())
}

pub fn read_statement_ids(path: impl AsRef<Path>) -> Result<Vec<StatementId>> {
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}
