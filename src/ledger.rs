//! Deployment Ledger
//!
//! In-memory view of the per-environment ledger file: one entry per deployment
//! unit holding its last update time, its kind and the outputs the provider
//! reported for it. Entry and key order follow the file so that lookups which
//! take "the first match" are stable between runs.

use crate::unit::UnitKind;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

mod store;

pub use store::{LocalLedger, LEDGER_FILE_NAME};

/// Output key that identifies a stack entry written by the provider.
pub const STACK_ID_KEY: &str = "StackId";

/// One record per deployment unit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Epoch milliseconds of the last confirmed deploy.
    #[serde(rename = "LastUpdate", default, skip_serializing_if = "Option::is_none")]
    pub last_update: Option<i64>,

    #[serde(rename = "Type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<UnitKind>,

    /// Provider outputs (endpoints, ARNs, region, ...).
    #[serde(flatten)]
    pub outputs: IndexMap<String, String>,
}

impl LedgerEntry {
    pub fn new(kind: UnitKind, last_update: i64) -> Self {
        Self {
            last_update: Some(last_update),
            kind: Some(kind),
            outputs: IndexMap::new(),
        }
    }

    pub fn with_output(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.outputs.insert(key.into(), value.into());
        self
    }

    /// Recorded kind, falling back to the presence of a `StackId` output for
    /// entries written without a `Type`.
    pub fn kind(&self) -> UnitKind {
        self.kind.unwrap_or_else(|| {
            if self.outputs.contains_key(STACK_ID_KEY) {
                UnitKind::Stack
            } else {
                UnitKind::Function
            }
        })
    }

    pub fn output(&self, key: &str) -> Option<&str> {
        self.outputs.get(key).map(String::as_str)
    }

    /// Additive merge: keys present in `other` win, everything else is kept.
    pub fn merge(&mut self, other: LedgerEntry) {
        if other.last_update.is_some() {
            self.last_update = other.last_update;
        }
        if other.kind.is_some() {
            self.kind = other.kind;
        }
        self.outputs.extend(other.outputs);
    }
}

/// The whole ledger for one environment, keyed by unit name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ledger {
    units: IndexMap<String, LedgerEntry>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, unit: &str) -> Option<&LedgerEntry> {
        self.units.get(unit)
    }

    pub fn contains(&self, unit: &str) -> bool {
        self.units.contains_key(unit)
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &LedgerEntry)> {
        self.units.iter().map(|(name, entry)| (name.as_str(), entry))
    }

    /// Owned copy of the unit names in ledger order.
    pub fn unit_names(&self) -> Vec<String> {
        self.units.keys().cloned().collect()
    }

    /// Merge `entry` into the unit's existing entry, creating it if absent.
    pub fn upsert(&mut self, unit: &str, entry: LedgerEntry) {
        match self.units.get_mut(unit) {
            Some(existing) => existing.merge(entry),
            None => {
                self.units.insert(unit.to_string(), entry);
            }
        }
    }

    /// Remove a unit, keeping the order of the remaining entries.
    pub fn remove(&mut self, unit: &str) -> Option<LedgerEntry> {
        self.units.shift_remove(unit)
    }
}

impl FromIterator<(String, LedgerEntry)> for Ledger {
    fn from_iter<T: IntoIterator<Item = (String, LedgerEntry)>>(iter: T) -> Self {
        Self {
            units: iter.into_iter().collect(),
        }
    }
}
