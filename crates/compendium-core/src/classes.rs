//! Class hierarchy compiler
//!
//! Expands `baseclass` and `subclass` entries into `class` entries along two
//! axes: whether a complete class (base plus every subclass) is produced under
//! the base name, and how standalone subclass entries look.
//!
//! Subclasses find their base by family: a subclass declaring base `Fighter`
//! applies to every class whose name contains `Fighter`, so renamed or revised
//! variants of a base share its subclasses. This is a substring match over the
//! candidate names, not a key lookup, and is intentionally permissive.

use crate::diagnostics::{Diagnostic, Diagnostics, Kept};
use crate::document::{category, Element};
use crate::index::{CategoryMap, EntryIndex, IndexedEntry};
use crate::options::{BasetypeFormat, MergeOptions, SubtypeFormat};

/// Suffix of the base-only entry produced in reference mode
pub const BASE_REFERENCE_SUFFIX: &str = " !Base";

/// Attribute on a subclass naming its base class
pub const BASECLASS_ATTR: &str = "baseclass";

/// Whether `candidate` belongs to the family of `declared`
pub fn in_family(candidate: &str, declared: &str) -> bool {
    !declared.is_empty() && candidate.contains(declared)
}

fn declared_base(subclass: &Element) -> &str {
    subclass.attr(BASECLASS_ATTR).unwrap_or_default().trim()
}

/// Replace raw base and subclass entries in the index with derived classes
pub fn compile_classes(index: &mut EntryIndex, options: &MergeOptions, diagnostics: &mut Diagnostics) {
    let bases = index.take_category(category::BASECLASS);
    let subclasses = index.take_category(category::SUBCLASS);
    if bases.is_empty() && subclasses.is_empty() {
        return;
    }

    // Classes that were already compiled in an earlier merge
    let existing: CategoryMap = index.category(category::CLASS).cloned().unwrap_or_default();

    for (name, subclass) in &subclasses {
        let declared = declared_base(&subclass.element);
        let resolved = bases
            .keys()
            .chain(existing.keys())
            .any(|candidate| in_family(candidate, declared));
        if !resolved {
            diagnostics.push(Diagnostic::UnresolvedSubclass {
                subclass: name.clone(),
                baseclass: declared.to_string(),
            });
        }
    }

    let classes = index.category_entry(category::CLASS);

    if options.basetype_format == BasetypeFormat::Complete {
        build_complete(classes, &bases, &subclasses, diagnostics);
    }

    match options.subtype_format {
        SubtypeFormat::Usable => {
            for (name, subclass) in &subclasses {
                let base = find_base(&bases, &existing, declared_base(&subclass.element));
                let element = usable_entry(&subclass.element, base.map(|b| &b.element));
                insert_class(
                    classes,
                    name.clone(),
                    IndexedEntry::new(element, subclass.origin.clone()),
                    diagnostics,
                );
            }
        }
        SubtypeFormat::Reference => {
            for (name, base) in &bases {
                let reference_name = format!("{}{}", name, BASE_REFERENCE_SUFFIX);
                let mut element = base.element.clone();
                element.name = category::CLASS.to_string();
                element.set_name_text(reference_name.clone());
                insert_class(
                    classes,
                    reference_name,
                    IndexedEntry::new(element, base.origin.clone()),
                    diagnostics,
                );
            }
            for (name, subclass) in &subclasses {
                insert_class(
                    classes,
                    name.clone(),
                    IndexedEntry::new(reference_entry(&subclass.element), subclass.origin.clone()),
                    diagnostics,
                );
            }
        }
        SubtypeFormat::None => {}
    }

    tracing::debug!(
        bases = bases.len(),
        subclasses = subclasses.len(),
        classes = classes.len(),
        "compiled classes"
    );
}

/// Insert each base as a class, then fold every subclass (in name order) into
/// each class of its family
fn build_complete(
    classes: &mut CategoryMap,
    bases: &CategoryMap,
    subclasses: &CategoryMap,
    diagnostics: &mut Diagnostics,
) {
    for (name, base) in bases {
        let mut element = base.element.clone();
        element.name = category::CLASS.to_string();
        insert_class(
            classes,
            name.clone(),
            IndexedEntry::new(element, base.origin.clone()),
            diagnostics,
        );
    }

    for subclass in subclasses.values() {
        let declared = declared_base(&subclass.element);
        for (class_name, class) in classes.iter_mut() {
            if in_family(class_name, declared) {
                class
                    .element
                    .children
                    .extend(subclass.element.children_without_name().cloned());
            }
        }
    }
}

/// Exact base first, else the first family member among bases then classes
fn find_base<'a>(
    bases: &'a CategoryMap,
    existing: &'a CategoryMap,
    declared: &str,
) -> Option<&'a IndexedEntry> {
    bases
        .get(declared)
        .or_else(|| existing.get(declared))
        .or_else(|| {
            bases
                .iter()
                .chain(existing.iter())
                .find(|(name, _)| in_family(name, declared))
                .map(|(_, entry)| entry)
        })
}

fn subclass_attributes(subclass: &Element) -> Vec<(String, String)> {
    subclass
        .attributes
        .iter()
        .filter(|(key, _)| key != BASECLASS_ATTR)
        .cloned()
        .collect()
}

/// Subclass name, then the base content, then the subclass content
fn usable_entry(subclass: &Element, base: Option<&Element>) -> Element {
    let mut element = Element::new(category::CLASS);
    element.attributes = subclass_attributes(subclass);
    if let Some(name) = subclass.find("name") {
        element.children.push(name.clone());
    }
    if let Some(base) = base {
        element.children.extend(base.children_without_name().cloned());
    }
    element
        .children
        .extend(subclass.children_without_name().cloned());
    element
}

/// The subclass's own content only
fn reference_entry(subclass: &Element) -> Element {
    let mut element = Element::new(category::CLASS);
    element.attributes = subclass_attributes(subclass);
    element.children = subclass.children.clone();
    element
}

fn insert_class(
    classes: &mut CategoryMap,
    name: String,
    entry: IndexedEntry,
    diagnostics: &mut Diagnostics,
) {
    if let Some(previous) = classes.get(&name) {
        diagnostics.push(Diagnostic::DuplicateEntry {
            category: category::CLASS.to_string(),
            identity: name.clone(),
            previous: previous.origin.clone(),
            replacement: entry.origin.clone(),
            kept: Kept::Replacement,
        });
    }
    classes.insert(name, entry);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_xml_str;

    const FIGHTER: &str = r#"<compendium>
        <baseclass><name>Fighter</name><hd>10</hd><autolevel level="1"><feature><name>Second Wind</name></feature></autolevel></baseclass>
        <subclass baseclass="Fighter"><name>Battle Master</name><autolevel level="3"><feature><name>Combat Superiority</name></feature></autolevel></subclass>
    </compendium>"#;

    fn compile(xml: &str, basetype: BasetypeFormat, subtype: SubtypeFormat) -> (EntryIndex, Diagnostics) {
        let mut diags = Diagnostics::new();
        let doc = parse_xml_str(xml, "classes.xml").unwrap();
        let mut index = EntryIndex::build(vec![doc], &mut diags);
        let options = MergeOptions {
            basetype_format: basetype,
            subtype_format: subtype,
            ..Default::default()
        };
        compile_classes(&mut index, &options, &mut diags);
        (index, diags)
    }

    /// Tags of the non-name children, with the `level` attribute when present
    fn shape(index: &EntryIndex, name: &str) -> Vec<String> {
        index
            .get("class", name)
            .unwrap_or_else(|| panic!("class {name} missing"))
            .element
            .children_without_name()
            .map(|c| match c.attr("level") {
                Some(level) => format!("{}:{}", c.name, level),
                None => c.name.clone(),
            })
            .collect()
    }

    #[test]
    fn test_complete_and_usable() {
        let (index, diags) = compile(FIGHTER, BasetypeFormat::Complete, SubtypeFormat::Usable);

        assert_eq!(shape(&index, "Fighter"), vec!["hd", "autolevel:1", "autolevel:3"]);
        assert_eq!(shape(&index, "Battle Master"), vec!["hd", "autolevel:1", "autolevel:3"]);

        let battle_master = &index.get("class", "Battle Master").unwrap().element;
        assert_eq!(battle_master.find_text("name"), Some("Battle Master"));
        assert_eq!(
            battle_master.children.iter().filter(|c| c.name == "name").count(),
            1
        );
        assert!(!battle_master.has_attr("baseclass"));

        assert!(index.category("baseclass").is_none());
        assert!(index.category("subclass").is_none());
        assert!(diags.is_empty());
    }

    #[test]
    fn test_reference_mode() {
        let (index, _) = compile(FIGHTER, BasetypeFormat::None, SubtypeFormat::Reference);

        assert_eq!(shape(&index, "Fighter !Base"), vec!["hd", "autolevel:1"]);
        assert_eq!(shape(&index, "Battle Master"), vec!["autolevel:3"]);
        assert!(index.get("class", "Fighter").is_none());
        assert_eq!(
            index.get("class", "Fighter !Base").unwrap().element.find_text("name"),
            Some("Fighter !Base")
        );
    }

    #[test]
    fn test_complete_with_reference() {
        let (index, _) = compile(FIGHTER, BasetypeFormat::Complete, SubtypeFormat::Reference);

        assert_eq!(shape(&index, "Fighter"), vec!["hd", "autolevel:1", "autolevel:3"]);
        assert_eq!(shape(&index, "Fighter !Base"), vec!["hd", "autolevel:1"]);
        assert_eq!(shape(&index, "Battle Master"), vec!["autolevel:3"]);
    }

    #[test]
    fn test_usable_without_base_classes() {
        let (index, diags) = compile(FIGHTER, BasetypeFormat::None, SubtypeFormat::Usable);

        assert_eq!(shape(&index, "Battle Master"), vec!["hd", "autolevel:1", "autolevel:3"]);
        assert!(index.get("class", "Fighter").is_none());
        assert!(index.get("class", "Fighter !Base").is_none());
        assert_eq!(index.category("class").map(|c| c.len()), Some(1));
        assert!(diags.is_empty());
    }

    #[test]
    fn test_no_output_formats() {
        let (index, _) = compile(FIGHTER, BasetypeFormat::None, SubtypeFormat::None);
        assert!(index.category("class").map_or(true, |c| c.is_empty()));
    }

    #[test]
    fn test_subclasses_fold_in_name_order() {
        let xml = r#"<compendium>
            <subclass baseclass="Wizard"><name>School of Evocation</name><autolevel level="2"/></subclass>
            <subclass baseclass="Wizard"><name>School of Abjuration</name><autolevel level="6"/></subclass>
            <baseclass><name>Wizard</name><hd>6</hd></baseclass>
        </compendium>"#;

        let (index, _) = compile(xml, BasetypeFormat::Complete, SubtypeFormat::None);

        assert_eq!(shape(&index, "Wizard"), vec!["hd", "autolevel:6", "autolevel:2"]);
    }

    #[test]
    fn test_family_matching_applies_to_variants() {
        let xml = r#"<compendium>
            <baseclass><name>Ranger</name><hd>10</hd></baseclass>
            <baseclass><name>Ranger (Revised)</name><hd>10</hd></baseclass>
            <subclass baseclass="Ranger"><name>Hunter</name><autolevel level="3"/></subclass>
        </compendium>"#;

        let (index, diags) = compile(xml, BasetypeFormat::Complete, SubtypeFormat::Usable);

        assert_eq!(shape(&index, "Ranger"), vec!["hd", "autolevel:3"]);
        assert_eq!(shape(&index, "Ranger (Revised)"), vec!["hd", "autolevel:3"]);
        // The exact base is copied into the usable subclass, not the variant
        assert_eq!(shape(&index, "Hunter"), vec!["hd", "autolevel:3"]);
        assert!(diags.is_empty());
    }

    #[test]
    fn test_unresolved_subclass_is_reported_once() {
        let xml = r#"<compendium>
            <subclass baseclass="Artificer"><name>Alchemist</name><autolevel level="3"/></subclass>
        </compendium>"#;

        let (index, diags) = compile(xml, BasetypeFormat::Complete, SubtypeFormat::Usable);

        assert_eq!(
            diags.iter().collect::<Vec<_>>(),
            vec![&Diagnostic::UnresolvedSubclass {
                subclass: "Alchemist".to_string(),
                baseclass: "Artificer".to_string(),
            }]
        );
        assert_eq!(shape(&index, "Alchemist"), vec!["autolevel:3"]);
    }

    #[test]
    fn test_subclass_folds_into_existing_class() {
        let xml = r#"<compendium>
            <class><name>Monk</name><hd>8</hd></class>
            <subclass baseclass="Monk"><name>Way of Shadow</name><autolevel level="3"/></subclass>
        </compendium>"#;

        let (index, diags) = compile(xml, BasetypeFormat::Complete, SubtypeFormat::Usable);

        assert_eq!(shape(&index, "Monk"), vec!["hd", "autolevel:3"]);
        assert_eq!(shape(&index, "Way of Shadow"), vec!["hd", "autolevel:3"]);
        assert!(diags.is_empty());
    }

    #[test]
    fn test_in_family() {
        assert!(in_family("Ranger (Revised)", "Ranger"));
        assert!(in_family("Ranger", "Ranger"));
        assert!(!in_family("Fighter", "Ranger"));
        assert!(!in_family("Fighter", ""));
    }
}
