//! Run report for a compendium build
//!
//! Records which compendiums were written, from how many sources, and the
//! diagnostics each merge produced.

use crate::diagnostics::Diagnostics;
use crate::error::{Error, Result};
use crate::merger::Compendium;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// One written compendium
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputRecord {
    /// Compendium name
    pub name: String,
    /// Where it was written
    pub path: PathBuf,
    /// Number of entries
    pub entries: usize,
    /// Number of contributing documents
    pub sources: usize,
    /// Anomalies found while merging
    pub diagnostics: Diagnostics,
}

/// A group that could not be merged
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedGroup {
    pub group: String,
    pub error: String,
}

/// Summary of one build
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// When the build ran
    pub generated_at: DateTime<Utc>,
    /// Aggregate compendium name
    pub name: String,
    /// Written compendiums, aggregate last
    pub outputs: Vec<OutputRecord>,
    /// Groups skipped because of errors
    #[serde(default)]
    pub failures: Vec<FailedGroup>,
}

impl RunReport {
    /// Create an empty report stamped with the current time
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            generated_at: Utc::now(),
            name: name.into(),
            outputs: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// Record a written compendium
    pub fn record(&mut self, compendium: &Compendium, path: &Path) {
        self.outputs.push(OutputRecord {
            name: compendium.name.clone(),
            path: path.to_path_buf(),
            entries: compendium.entry_count(),
            sources: compendium.sources.len(),
            diagnostics: compendium.diagnostics.clone(),
        });
    }

    /// Record a skipped group
    pub fn record_failure(&mut self, group: &str, error: &Error) {
        self.failures.push(FailedGroup {
            group: group.to_string(),
            error: error.to_string(),
        });
    }

    /// Find the record for a compendium
    pub fn find_output(&self, name: &str) -> Option<&OutputRecord> {
        self.outputs.iter().find(|o| o.name == name)
    }

    /// Total diagnostics across all outputs
    pub fn diagnostic_count(&self) -> usize {
        self.outputs.iter().map(|o| o.diagnostics.len()).sum()
    }

    /// Load a report from JSON
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&content).map_err(Error::Json)
    }

    /// Save the report as JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}
