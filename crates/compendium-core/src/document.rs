//! Core document types for representing compendium XML

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Well-known entry categories (the element name of a root child)
pub mod category {
    pub const SPELL: &str = "spell";
    pub const CLASS: &str = "class";
    pub const BASECLASS: &str = "baseclass";
    pub const SUBCLASS: &str = "subclass";
    pub const SPELL_LIST: &str = "spellList";
    pub const BORROW_SPELLS: &str = "borrowSpells";
    pub const MONSTER: &str = "monster";
}

/// A parsed document from a single XML file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Root element; its children are the entries
    pub root: Element,
    /// Source file path
    pub source_path: PathBuf,
}

impl Document {
    /// Create a document from a root element
    pub fn new(root: Element, source_path: impl Into<PathBuf>) -> Self {
        Self {
            root,
            source_path: source_path.into(),
        }
    }

    /// Entries in document order
    pub fn entries(&self) -> &[Element] {
        &self.root.children
    }

    /// Get the number of entries
    pub fn entry_count(&self) -> usize {
        self.root.children.len()
    }

    /// Find the first entry of a category with the given name
    pub fn find_entry(&self, category: &str, name: &str) -> Option<&Element> {
        self.root
            .children
            .iter()
            .find(|e| e.name == category && e.find_text("name") == Some(name))
    }
}

/// An XML element: tag, ordered attributes, text and child elements.
///
/// Mixed content is kept in order: `text` precedes the first child and each
/// child's `tail` follows that child inside this element.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    /// Tag name (the category for entries)
    pub name: String,
    /// Attributes in document order
    pub attributes: Vec<(String, String)>,
    /// Text content before the first child, if any
    pub text: Option<String>,
    /// Child elements in document order
    pub children: Vec<Element>,
    /// Text following this element inside its parent
    #[serde(default)]
    pub tail: Option<String>,
}

impl Element {
    /// Create an empty element
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Builder: add an attribute
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(key, value);
        self
    }

    /// Builder: set the text
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Builder: append a child
    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    /// Get an attribute value
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Check for the presence of an attribute
    pub fn has_attr(&self, key: &str) -> bool {
        self.attributes.iter().any(|(k, _)| k == key)
    }

    /// Set an attribute, replacing an existing value in place
    pub fn set_attr(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((key, value)),
        }
    }

    /// Remove an attribute, returning its value
    pub fn remove_attr(&mut self, key: &str) -> Option<String> {
        let pos = self.attributes.iter().position(|(k, _)| k == key)?;
        Some(self.attributes.remove(pos).1)
    }

    /// First child with the given tag
    pub fn find(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    /// First child with the given tag, mutably
    pub fn find_mut(&mut self, name: &str) -> Option<&mut Element> {
        self.children.iter_mut().find(|c| c.name == name)
    }

    /// Text of the first child with the given tag.
    ///
    /// A present but empty child yields `Some("")`.
    pub fn find_text(&self, name: &str) -> Option<&str> {
        self.find(name).map(|c| c.text.as_deref().unwrap_or(""))
    }

    /// Children other than the `name` child
    pub fn children_without_name(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter(|c| c.name != "name")
    }

    /// Set the text of the `name` child, creating it first if needed
    pub fn set_name_text(&mut self, value: impl Into<String>) {
        match self.find_mut("name") {
            Some(name) => name.text = Some(value.into()),
            None => self
                .children
                .insert(0, Element::new("name").with_text(value)),
        }
    }

    /// Whether text is interleaved with child elements
    pub fn is_mixed(&self) -> bool {
        let has_text = |t: &Option<String>| t.as_deref().is_some_and(|t| !t.is_empty());
        !self.children.is_empty()
            && (has_text(&self.text) || self.children.iter().any(|c| has_text(&c.tail)))
    }
}

/// Split a delimited class list such as `"Wizard, Sorcerer"`
pub fn split_list(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Join a class list with `", "`
pub fn join_list(items: &[String]) -> String {
    items.join(", ")
}
