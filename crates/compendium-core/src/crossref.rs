//! Folds spell lists and borrowed spells into spell class fields

use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::document::{category, join_list, split_list, Element};
use crate::index::EntryIndex;
use std::collections::BTreeMap;

/// Child of a spell entry holding its comma-delimited classes
pub const CLASSES_FIELD: &str = "classes";

/// Classes currently associated with a spell
pub fn spell_classes(spell: &Element) -> Vec<String> {
    spell
        .find_text(CLASSES_FIELD)
        .map(split_list)
        .unwrap_or_default()
}

/// Append a class to a spell's class field unless already present.
///
/// Returns true when the field changed.
pub fn add_class(spell: &mut Element, class: &str) -> bool {
    let mut classes = spell_classes(spell);
    if classes.iter().any(|c| c == class) {
        return false;
    }
    classes.push(class.to_string());

    let text = join_list(&classes);
    match spell.find_mut(CLASSES_FIELD) {
        Some(field) => field.text = Some(text),
        None => spell
            .children
            .push(Element::new(CLASSES_FIELD).with_text(text)),
    }
    true
}

/// Run both passes: spell lists first, then borrows
pub fn resolve_cross_references(index: &mut EntryIndex, diagnostics: &mut Diagnostics) {
    resolve_spell_lists(index, diagnostics);
    resolve_borrowed_spells(index, diagnostics);
}

/// Add each spell list's class to the spells it names
pub fn resolve_spell_lists(index: &mut EntryIndex, diagnostics: &mut Diagnostics) {
    let lists: Vec<(String, Vec<String>)> = match index.category(category::SPELL_LIST) {
        Some(lists) => lists
            .iter()
            .map(|(class, entry)| {
                let spells = entry
                    .element
                    .children
                    .iter()
                    .filter_map(|c| c.text.as_deref())
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect();
                (class.clone(), spells)
            })
            .collect(),
        None => return,
    };

    let mut added = 0usize;
    for (class, spell_names) in lists {
        for spell_name in spell_names {
            let spell = index
                .category_mut(category::SPELL)
                .and_then(|spells| spells.get_mut(&spell_name));
            match spell {
                Some(spell) => {
                    if add_class(&mut spell.element, &class) {
                        added += 1;
                    }
                }
                None => diagnostics.push(Diagnostic::MissingSpell {
                    spell: spell_name,
                    class: class.clone(),
                }),
            }
        }
    }
    tracing::debug!(added, "resolved spell lists");
}

/// Copy class associations along `borrowSpells` entries.
///
/// Matching uses the class fields as they stood before this pass, so a spell
/// borrowed into a class is not borrowed onward in the same run.
pub fn resolve_borrowed_spells(index: &mut EntryIndex, diagnostics: &mut Diagnostics) {
    let borrows: Vec<(String, Vec<String>)> = match index.category(category::BORROW_SPELLS) {
        Some(borrows) => borrows
            .iter()
            .map(|(from, entry)| {
                let targets = split_list(entry.element.attr("class").unwrap_or_default());
                (from.clone(), targets)
            })
            .collect(),
        None => return,
    };

    let snapshot: BTreeMap<String, Vec<String>> = index
        .category(category::SPELL)
        .map(|spells| {
            spells
                .iter()
                .map(|(name, entry)| (name.clone(), spell_classes(&entry.element)))
                .collect()
        })
        .unwrap_or_default();

    for (from_class, targets) in borrows {
        let matching: Vec<&String> = snapshot
            .iter()
            .filter(|(_, classes)| classes.contains(&from_class))
            .map(|(name, _)| name)
            .collect();

        if matching.is_empty() {
            diagnostics.push(Diagnostic::UnresolvedBorrow { from_class });
            continue;
        }

        let Some(spells) = index.category_mut(category::SPELL) else {
            continue;
        };
        for name in matching {
            if let Some(spell) = spells.get_mut(name) {
                for target in &targets {
                    add_class(&mut spell.element, target);
                }
            }
        }
    }
}
