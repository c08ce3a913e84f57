//! Exclusion filtering by content tags
//!
//! A node carrying an attribute named after an active tag is removed together
//! with its whole subtree. A tagged document root clears the whole document.

use crate::document::{Document, Element};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Kinds of content a caller can leave out of a compendium
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ExclusionTag {
    /// Unearthed Arcana playtest material
    #[serde(rename = "UA")]
    UnearthedArcana,
    /// Modern and futuristic content
    #[serde(rename = "modern")]
    Modern,
    /// Homebrew content
    #[serde(rename = "homebrew")]
    Homebrew,
    /// Pseudo-spell entries
    #[serde(rename = "pseudo")]
    PseudoSpell,
    /// Lists inlined into other entries
    #[serde(rename = "inlined")]
    InlinedList,
}

impl ExclusionTag {
    pub const ALL: [ExclusionTag; 5] = [
        ExclusionTag::UnearthedArcana,
        ExclusionTag::Modern,
        ExclusionTag::Homebrew,
        ExclusionTag::PseudoSpell,
        ExclusionTag::InlinedList,
    ];

    /// The attribute name marking tagged content (also the CLI code)
    pub fn attribute(self) -> &'static str {
        match self {
            ExclusionTag::UnearthedArcana => "UA",
            ExclusionTag::Modern => "modern",
            ExclusionTag::Homebrew => "homebrew",
            ExclusionTag::PseudoSpell => "pseudo",
            ExclusionTag::InlinedList => "inlined",
        }
    }

    /// Look up a tag by its attribute name
    pub fn from_attribute(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.attribute() == name)
    }
}

impl fmt::Display for ExclusionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.attribute())
    }
}

impl FromStr for ExclusionTag {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.attribute().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::invalid_option("exclude", s))
    }
}

/// The set of active exclusion tags
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExclusionSet(BTreeSet<ExclusionTag>);

impl ExclusionSet {
    /// An empty set: nothing is excluded
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, tag: ExclusionTag) -> bool {
        self.0.insert(tag)
    }

    pub fn contains(&self, tag: ExclusionTag) -> bool {
        self.0.contains(&tag)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = ExclusionTag> + '_ {
        self.0.iter().copied()
    }

    /// The first active tag the element carries
    pub fn matching_tag(&self, element: &Element) -> Option<ExclusionTag> {
        element
            .attributes
            .iter()
            .filter_map(|(key, _)| ExclusionTag::from_attribute(key))
            .find(|tag| self.contains(*tag))
    }
}

impl FromIterator<ExclusionTag> for ExclusionSet {
    fn from_iter<I: IntoIterator<Item = ExclusionTag>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// What a filter pass removed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterOutcome {
    /// Set when the document root itself carried an active tag
    pub root_excluded: Option<ExclusionTag>,
    /// Number of removed subtrees (the root counts as one)
    pub removed: usize,
}

/// Remove every tagged subtree from a document in place
pub fn filter_document(document: &mut Document, excludes: &ExclusionSet) -> FilterOutcome {
    if excludes.is_empty() {
        return FilterOutcome::default();
    }

    if let Some(tag) = excludes.matching_tag(&document.root) {
        document.root.children.clear();
        document.root.text = None;
        return FilterOutcome {
            root_excluded: Some(tag),
            removed: 1,
        };
    }

    FilterOutcome {
        root_excluded: None,
        removed: filter_children(&mut document.root, excludes),
    }
}

/// Filter the children of an element recursively, returning the removal count
pub fn filter_children(element: &mut Element, excludes: &ExclusionSet) -> usize {
    let before = element.children.len();
    element
        .children
        .retain(|child| excludes.matching_tag(child).is_none());
    let mut removed = before - element.children.len();

    for child in &mut element.children {
        removed += filter_children(child, excludes);
    }
    removed
}

/// Drop every exclusion-vocabulary attribute from an element
pub fn strip_tags(element: &mut Element) {
    element
        .attributes
        .retain(|(key, _)| ExclusionTag::from_attribute(key).is_none());
}
