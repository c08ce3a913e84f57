//! Structured diagnostics collected during a merge

use crate::exclusion::ExclusionTag;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Which side of a duplicate survived
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Kept {
    Previous,
    Replacement,
}

/// A non-fatal anomaly found while merging
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// Same category and identity seen twice
    DuplicateEntry {
        category: String,
        identity: String,
        previous: PathBuf,
        replacement: PathBuf,
        kept: Kept,
    },
    /// Pruned merge summary
    DuplicatesRemoved { count: usize },
    /// A whole source was dropped by its root tag
    ExcludedSource { source: PathBuf, tag: ExclusionTag },
    /// A spell list names a spell that is not indexed
    MissingSpell { spell: String, class: String },
    /// A borrow whose source class has no spells
    UnresolvedBorrow { from_class: String },
    /// A subclass whose base class was not found
    UnresolvedSubclass { subclass: String, baseclass: String },
}

impl Diagnostic {
    /// Emit this diagnostic as a tracing event
    pub fn log(&self) {
        match self {
            Diagnostic::DuplicatesRemoved { .. } => tracing::info!("{}", self),
            Diagnostic::ExcludedSource { .. } => tracing::debug!("{}", self),
            _ => tracing::warn!("{}", self),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::DuplicateEntry {
                category,
                identity,
                previous,
                replacement,
                kept,
            } => {
                let (kept_path, dropped_path) = match kept {
                    Kept::Previous => (previous, replacement),
                    Kept::Replacement => (replacement, previous),
                };
                write!(
                    f,
                    "duplicate {} '{}': kept {}, discarded {}",
                    category,
                    identity,
                    kept_path.display(),
                    dropped_path.display()
                )
            }
            Diagnostic::DuplicatesRemoved { count } => write!(f, "removed {} duplicate(s)", count),
            Diagnostic::ExcludedSource { source, tag } => {
                write!(f, "excluded {} (tagged {})", source.display(), tag)
            }
            Diagnostic::MissingSpell { spell, class } => {
                write!(f, "spell list for {} names unknown spell '{}'", class, spell)
            }
            Diagnostic::UnresolvedBorrow { from_class } => {
                write!(f, "no spells to borrow from class '{}'", from_class)
            }
            Diagnostic::UnresolvedSubclass { subclass, baseclass } => {
                write!(f, "subclass '{}' has no base class '{}'", subclass, baseclass)
            }
        }
    }
}

/// Ordered collection of diagnostics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.0.push(diagnostic);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of duplicate-entry records
    pub fn duplicate_count(&self) -> usize {
        self.0
            .iter()
            .filter(|d| matches!(d, Diagnostic::DuplicateEntry { .. }))
            .count()
    }

    /// Emit every diagnostic in collection order
    pub fn log(&self) {
        self.0.iter().for_each(Diagnostic::log);
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
