//! Ledger file persistence: `<OutputFolder>[/<environment>]/StackConfig.json`.

use super::{Ledger, LedgerEntry};
use crate::error::LedgerError;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const LEDGER_FILE_NAME: &str = "StackConfig.json";

/// Exclusive owner of the on-disk ledger files below one output folder.
///
/// Every write is a full-file replacement. Concurrent invocations against the
/// same environment are not coordinated; the last writer wins.
#[derive(Debug, Clone)]
pub struct LocalLedger {
    output_folder: PathBuf,
}

impl LocalLedger {
    pub fn new(output_folder: impl Into<PathBuf>) -> Self {
        Self {
            output_folder: output_folder.into(),
        }
    }

    pub fn output_folder(&self) -> &Path {
        &self.output_folder
    }

    /// Ledger path for an environment, or the single-environment path for `None`.
    pub fn path_for(&self, environment: Option<&str>) -> PathBuf {
        match environment.filter(|e| !e.is_empty()) {
            Some(env) => self.output_folder.join(env).join(LEDGER_FILE_NAME),
            None => self.output_folder.join(LEDGER_FILE_NAME),
        }
    }

    /// Load the ledger. A missing file is an empty ledger; an unreadable one is fatal.
    pub fn load(&self, environment: Option<&str>) -> Result<Ledger, LedgerError> {
        let path = self.path_for(environment);
        if !path.exists() {
            debug!(path = %path.display(), "No ledger file yet, starting empty");
            return Ok(Ledger::new());
        }

        let content = fs::read_to_string(&path)?;
        serde_json::from_str(&content).map_err(|e| LedgerError::Corrupt {
            path: path.clone(),
            reason: e.to_string(),
        })
    }

    /// Save the ledger atomically
    ///
    /// Uses temporary file + rename for atomic writes.
    pub fn save(&self, environment: Option<&str>, ledger: &Ledger) -> Result<(), LedgerError> {
        let path = self.path_for(environment);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut serialized = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut serialized, formatter);
        ledger
            .serialize(&mut serializer)
            .map_err(|e| LedgerError::IoError(std::io::Error::new(std::io::ErrorKind::Other, e)))?;

        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, &serialized)?;

        fs::rename(&temp_path, &path).map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            LedgerError::IoError(e)
        })?;

        debug!(path = %path.display(), units = ledger.len(), "Ledger saved");
        Ok(())
    }

    /// Read-merge-write of one unit's entry. Returns the ledger as saved.
    pub fn upsert(
        &self,
        environment: Option<&str>,
        unit: &str,
        entry: LedgerEntry,
    ) -> Result<Ledger, LedgerError> {
        let mut ledger = self.load(environment)?;
        ledger.upsert(unit, entry);
        self.save(environment, &ledger)?;
        Ok(ledger)
    }

    /// Delete one unit's entry. A unit that is not recorded leaves the file untouched.
    pub fn remove(&self, environment: Option<&str>, unit: &str) -> Result<Ledger, LedgerError> {
        let mut ledger = self.load(environment)?;
        if ledger.remove(unit).is_some() {
            self.save(environment, &ledger)?;
        } else {
            debug!(unit, "Unit not present in ledger, nothing to remove");
        }
        Ok(ledger)
    }
}
