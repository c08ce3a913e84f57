//! Per-category entry index with duplicate attribution

use crate::diagnostics::{Diagnostic, Diagnostics, Kept};
use crate::document::{category, Document, Element};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// An indexed entry and the file that provided it
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedEntry {
    pub element: Element,
    pub origin: PathBuf,
}

impl IndexedEntry {
    pub fn new(element: Element, origin: impl Into<PathBuf>) -> Self {
        Self {
            element,
            origin: origin.into(),
        }
    }
}

/// Entries of one category keyed by identity
pub type CategoryMap = BTreeMap<String, IndexedEntry>;

/// The identity of an entry within its category.
///
/// `spellList` entries are keyed by their `class` attribute, `borrowSpells`
/// by `fromClass`, everything else by the `name` child. Missing identities
/// are the empty string.
pub fn identity(element: &Element) -> String {
    let id = match element.name.as_str() {
        category::SPELL_LIST => element.attr("class"),
        category::BORROW_SPELLS => element.attr("fromClass"),
        _ => element.find_text("name"),
    };
    id.unwrap_or_default().trim().to_string()
}

/// Entries from one or more documents, bucketed by category.
///
/// Iterating the index yields categories and identities in sorted order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntryIndex {
    categories: BTreeMap<String, CategoryMap>,
}

impl EntryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index every entry of every document, in the order given
    pub fn build(documents: Vec<Document>, diagnostics: &mut Diagnostics) -> Self {
        let mut index = Self::new();
        for document in documents {
            tracing::debug!(
                source = %document.source_path.display(),
                entries = document.entry_count(),
                "indexing document"
            );
            for element in document.root.children {
                index.insert(element, &document.source_path, diagnostics);
            }
        }
        index
    }

    /// Add one entry, applying the category's merge rule
    pub fn insert(&mut self, element: Element, origin: &Path, diagnostics: &mut Diagnostics) {
        let key = identity(&element);
        let category_name = element.name.clone();
        let bucket = self.categories.entry(category_name.clone()).or_default();

        let Some(existing) = bucket.get_mut(&key) else {
            bucket.insert(key, IndexedEntry::new(element, origin));
            return;
        };

        match category_name.as_str() {
            category::SPELL_LIST => {
                existing.element.children.extend(element.children);
            }
            category::BORROW_SPELLS => {
                let added = element.attr("class").unwrap_or_default();
                let joined = match existing.element.attr("class") {
                    Some(current) if !current.trim().is_empty() => format!("{}, {}", current, added),
                    _ => added.to_string(),
                };
                existing.element.set_attr("class", joined);
            }
            _ => {
                diagnostics.push(Diagnostic::DuplicateEntry {
                    category: category_name,
                    identity: key,
                    previous: existing.origin.clone(),
                    replacement: origin.to_path_buf(),
                    kept: Kept::Replacement,
                });
                *existing = IndexedEntry::new(element, origin);
            }
        }
    }

    /// Entries of a category, if any were indexed
    pub fn category(&self, name: &str) -> Option<&CategoryMap> {
        self.categories.get(name)
    }

    /// Entries of a category, mutably
    pub fn category_mut(&mut self, name: &str) -> Option<&mut CategoryMap> {
        self.categories.get_mut(name)
    }

    /// Entries of a category, creating the bucket when missing
    pub fn category_entry(&mut self, name: &str) -> &mut CategoryMap {
        self.categories.entry(name.to_string()).or_default()
    }

    /// Remove a category from the index and return its entries
    pub fn take_category(&mut self, name: &str) -> CategoryMap {
        self.categories.remove(name).unwrap_or_default()
    }

    /// Look up one entry
    pub fn get(&self, category: &str, identity: &str) -> Option<&IndexedEntry> {
        self.categories.get(category)?.get(identity)
    }

    /// Total number of indexed entries
    pub fn len(&self) -> usize {
        self.categories.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Category names in sorted order
    pub fn category_names(&self) -> impl Iterator<Item = &str> {
        self.categories.keys().map(String::as_str)
    }

    pub fn into_categories(self) -> BTreeMap<String, CategoryMap> {
        self.categories
    }
}
