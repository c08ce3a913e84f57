//! Flattens an entry index back into a document root

use crate::document::{category, Element};
use crate::exclusion::strip_tags;
use crate::index::EntryIndex;

/// Categories consumed by class compilation and never written out
pub const INTERNAL_CATEGORIES: [&str; 2] = [category::BASECLASS, category::SUBCLASS];

/// Cross-reference inputs kept in per-group outputs but left out of the
/// final aggregate
pub const AUXILIARY_CATEGORIES: [&str; 2] = [category::SPELL_LIST, category::BORROW_SPELLS];

/// All entries ordered by (category, identity), internal categories dropped
pub fn flatten(index: EntryIndex) -> Vec<Element> {
    index
        .into_categories()
        .into_iter()
        .filter(|(name, _)| !INTERNAL_CATEGORIES.contains(&name.as_str()))
        .flat_map(|(_, entries)| entries.into_values().map(|entry| entry.element))
        .collect()
}

/// An empty output root shaped like `template`, without exclusion tags
pub fn output_root(template: &Element) -> Element {
    let mut root = Element::new(template.name.clone());
    root.attributes = template.attributes.clone();
    strip_tags(&mut root);
    root
}

/// Build an output root holding the flattened index
pub fn assemble(index: EntryIndex, template: &Element) -> Element {
    let mut root = output_root(template);
    root.children = flatten(index);
    root
}

/// Drop auxiliary entries from an output root, returning how many went
pub fn strip_auxiliary(root: &mut Element) -> usize {
    let before = root.children.len();
    root.children
        .retain(|e| !AUXILIARY_CATEGORIES.contains(&e.name.as_str()));
    before - root.children.len()
}
