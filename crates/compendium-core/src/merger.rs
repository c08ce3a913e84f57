//! Merge engine for combining compendium documents
//!
//! Three strategies share one entry point:
//! - pruned: sort by name, first source wins on duplicates
//! - concatenate: append entries in source order
//! - templated: index by category, last source wins, then resolve spell
//!   cross-references and compile classes
//!
//! Every strategy runs the exclusion filter over each source first.

use crate::assemble::{assemble, output_root};
use crate::classes::compile_classes;
use crate::crossref::resolve_cross_references;
use crate::diagnostics::{Diagnostic, Diagnostics, Kept};
use crate::document::{Document, Element};
use crate::error::{Error, Result};
use crate::exclusion::filter_document;
use crate::index::EntryIndex;
use crate::options::MergeOptions;
use crate::parser::parse_xml;
use crate::writer::write_document;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// How source documents are combined
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeStrategy {
    Pruned,
    Concatenate,
    #[default]
    Templated,
}

impl FromStr for MergeStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pruned" => Ok(MergeStrategy::Pruned),
            "concatenate" => Ok(MergeStrategy::Concatenate),
            "templated" => Ok(MergeStrategy::Templated),
            _ => Err(Error::invalid_option("strategy", s)),
        }
    }
}

impl fmt::Display for MergeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MergeStrategy::Pruned => "pruned",
            MergeStrategy::Concatenate => "concatenate",
            MergeStrategy::Templated => "templated",
        })
    }
}

/// A merged document ready to be written
#[derive(Debug, Clone)]
pub struct Compendium {
    /// Compendium name (e.g., "Spells")
    pub name: String,
    /// Output root; its children are the merged entries
    pub root: Element,
    /// Files that contributed, in merge order
    pub sources: Vec<PathBuf>,
    /// Anomalies found while merging
    pub diagnostics: Diagnostics,
}

impl Compendium {
    /// Get the number of entries
    pub fn entry_count(&self) -> usize {
        self.root.children.len()
    }

    /// Turn the compendium into a source document for a later merge
    pub fn into_document(self, path: impl Into<PathBuf>) -> Document {
        Document::new(self.root, path)
    }

    /// Write the compendium as XML
    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        write_document(path, &self.root)
    }
}

/// Parse and merge a list of files
pub fn merge_files<P: AsRef<Path>>(
    name: &str,
    paths: &[P],
    strategy: MergeStrategy,
    options: &MergeOptions,
) -> Result<Compendium> {
    let documents = paths
        .iter()
        .map(|p| parse_xml(p.as_ref()))
        .collect::<Result<Vec<_>>>()?;
    merge_documents(name, documents, strategy, options)
}

/// Merge already-parsed documents
pub fn merge_documents(
    name: &str,
    mut documents: Vec<Document>,
    strategy: MergeStrategy,
    options: &MergeOptions,
) -> Result<Compendium> {
    if documents.is_empty() {
        return Err(Error::NoSources(name.to_string()));
    }

    let mut diagnostics = Diagnostics::new();
    for document in &mut documents {
        let outcome = filter_document(document, &options.excludes);
        if let Some(tag) = outcome.root_excluded {
            diagnostics.push(Diagnostic::ExcludedSource {
                source: document.source_path.clone(),
                tag,
            });
        } else if outcome.removed > 0 {
            tracing::debug!(
                source = %document.source_path.display(),
                removed = outcome.removed,
                "excluded tagged entries"
            );
        }
    }

    let sources: Vec<PathBuf> = documents.iter().map(|d| d.source_path.clone()).collect();
    let template = documents[0].root.clone();

    let root = match strategy {
        MergeStrategy::Pruned => {
            let mut root = output_root(&template);
            root.children = combine_pruned(documents, &mut diagnostics);
            root
        }
        MergeStrategy::Concatenate => {
            let mut root = output_root(&template);
            root.children = combine_concatenate(documents);
            root
        }
        MergeStrategy::Templated => {
            let index = combine_templated(documents, options, &mut diagnostics);
            assemble(index, &template)
        }
    };

    tracing::debug!(
        compendium = name,
        %strategy,
        sources = sources.len(),
        entries = root.children.len(),
        "merged compendium"
    );

    Ok(Compendium {
        name: name.to_string(),
        root,
        sources,
        diagnostics,
    })
}

/// Sort all entries by name and keep the first of each name.
///
/// Each dropped entry is recorded as a duplicate naming both sources,
/// followed by the number removed.
pub fn combine_pruned(documents: Vec<Document>, diagnostics: &mut Diagnostics) -> Vec<Element> {
    let mut items: Vec<(String, PathBuf, Element)> = documents
        .into_iter()
        .flat_map(|Document { root, source_path }| {
            root.children
                .into_iter()
                .map(move |e| (e.find_text("name").unwrap_or_default().to_string(), source_path.clone(), e))
        })
        .collect();

    // Stable sort keeps source order among equal names
    items.sort_by(|a, b| a.0.cmp(&b.0));

    let mut kept: Vec<(String, PathBuf, Element)> = Vec::with_capacity(items.len());
    let mut removed = 0;
    for (identity, source, element) in items {
        let duplicate_of = kept
            .last()
            .filter(|(name, _, _)| *name == identity)
            .map(|(_, path, _)| path.clone());
        match duplicate_of {
            Some(previous) => {
                removed += 1;
                diagnostics.push(Diagnostic::DuplicateEntry {
                    category: element.name,
                    identity,
                    previous,
                    replacement: source,
                    kept: Kept::Previous,
                });
            }
            None => kept.push((identity, source, element)),
        }
    }

    diagnostics.push(Diagnostic::DuplicatesRemoved { count: removed });
    kept.into_iter().map(|(_, _, e)| e).collect()
}

/// Every entry of every document, in order
pub fn combine_concatenate(documents: Vec<Document>) -> Vec<Element> {
    documents.into_iter().flat_map(|d| d.root.children).collect()
}

/// Index the documents and run the cross-reference and class passes
pub fn combine_templated(
    documents: Vec<Document>,
    options: &MergeOptions,
    diagnostics: &mut Diagnostics,
) -> EntryIndex {
    let mut index = EntryIndex::build(documents, diagnostics);
    resolve_cross_references(&mut index, diagnostics);
    compile_classes(&mut index, options, diagnostics);
    index
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exclusion::ExclusionTag;
    use crate::parser::parse_xml_str;
    use crate::writer::to_xml_string;

    fn docs() -> Vec<Document> {
        vec![
            parse_xml_str(
                r#"<compendium version="5">
                    <spell><name>Fireball</name><classes>Wizard</classes><source>A</source></spell>
                    <item><name>Rope</name></item>
                </compendium>"#,
                "a.xml",
            )
            .unwrap(),
            parse_xml_str(
                r#"<compendium version="5">
                    <spell><name>Fireball</name><classes>Wizard</classes><source>B</source></spell>
                    <spell UA="1"><name>Playtest Bolt</name></spell>
                </compendium>"#,
                "b.xml",
            )
            .unwrap(),
        ]
    }

    fn fireball_source(c: &Compendium) -> &str {
        c.root
            .children
            .iter()
            .find(|e| e.find_text("name") == Some("Fireball"))
            .and_then(|e| e.find_text("source"))
            .unwrap()
    }

    #[test]
    fn test_pruned_first_source_wins() {
        let c = merge_documents("Test", docs(), MergeStrategy::Pruned, &MergeOptions::default()).unwrap();

        assert_eq!(fireball_source(&c), "A");
        assert_eq!(c.entry_count(), 3);
        assert_eq!(
            c.diagnostics.iter().collect::<Vec<_>>(),
            vec![
                &Diagnostic::DuplicateEntry {
                    category: "spell".into(),
                    identity: "Fireball".into(),
                    previous: PathBuf::from("a.xml"),
                    replacement: PathBuf::from("b.xml"),
                    kept: Kept::Previous,
                },
                &Diagnostic::DuplicatesRemoved { count: 1 },
            ]
        );
        assert_eq!(c.diagnostics.duplicate_count(), 1);
    }

    #[test]
    fn test_templated_last_source_wins() {
        let c = merge_documents("Test", docs(), MergeStrategy::Templated, &MergeOptions::default()).unwrap();

        assert_eq!(fireball_source(&c), "B");
        assert_eq!(c.diagnostics.duplicate_count(), 1);
    }

    #[test]
    fn test_concatenate_keeps_everything_in_order() {
        let c = merge_documents("Test", docs(), MergeStrategy::Concatenate, &MergeOptions::default()).unwrap();

        let names: Vec<&str> = c
            .root
            .children
            .iter()
            .filter_map(|e| e.find_text("name"))
            .collect();
        assert_eq!(names, vec!["Fireball", "Rope", "Fireball", "Playtest Bolt"]);
        assert!(c.diagnostics.is_empty());
    }

    #[test]
    fn test_exclusions_apply_to_every_strategy() {
        let mut options = MergeOptions::default();
        options.excludes.insert(ExclusionTag::UnearthedArcana);

        for strategy in [MergeStrategy::Pruned, MergeStrategy::Concatenate, MergeStrategy::Templated] {
            let c = merge_documents("Test", docs(), strategy, &options).unwrap();
            assert!(
                c.root
                    .children
                    .iter()
                    .all(|e| e.find_text("name") != Some("Playtest Bolt")),
                "{strategy} kept excluded entry"
            );
        }
    }

    #[test]
    fn test_excluded_root_is_reported() {
        let mut options = MergeOptions::default();
        options.excludes.insert(ExclusionTag::Homebrew);
        let mut documents = docs();
        documents.push(
            parse_xml_str(
                r#"<compendium homebrew="1"><item><name>Bag of Tricks</name></item></compendium>"#,
                "hb.xml",
            )
            .unwrap(),
        );

        let c = merge_documents("Test", documents, MergeStrategy::Templated, &options).unwrap();

        assert!(c.diagnostics.iter().any(|d| matches!(
            d,
            Diagnostic::ExcludedSource { tag: ExclusionTag::Homebrew, .. }
        )));
        assert_eq!(c.sources.len(), 3);
        assert_eq!(c.entry_count(), 3);
        assert!(c
            .root
            .children
            .iter()
            .all(|e| e.find_text("name") != Some("Bag of Tricks")));
    }

    #[test]
    fn test_templated_is_idempotent() {
        let options = MergeOptions::default();
        let first = merge_documents("Test", docs(), MergeStrategy::Templated, &options).unwrap();
        let second = merge_documents("Test", docs(), MergeStrategy::Templated, &options).unwrap();

        assert_eq!(
            to_xml_string(&first.root).unwrap(),
            to_xml_string(&second.root).unwrap()
        );
    }

    #[test]
    fn test_pruned_is_idempotent() {
        let options = MergeOptions::default();
        let first = merge_documents("Test", docs(), MergeStrategy::Pruned, &options).unwrap();
        let second = merge_documents("Test", docs(), MergeStrategy::Pruned, &options).unwrap();

        assert_eq!(
            to_xml_string(&first.root).unwrap(),
            to_xml_string(&second.root).unwrap()
        );
    }

    #[test]
    fn test_no_sources() {
        let err = merge_documents("Empty", Vec::new(), MergeStrategy::Pruned, &MergeOptions::default())
            .unwrap_err();
        assert!(matches!(err, Error::NoSources(name) if name == "Empty"));
    }

    #[test]
    fn test_merge_files_names_bad_source() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.xml");
        let bad = dir.path().join("bad.xml");
        std::fs::write(&good, "<compendium><item><name>Rope</name></item></compendium>").unwrap();
        std::fs::write(&bad, "<compendium><item></compendium>").unwrap();

        let err = merge_files("Items", &[good, bad.clone()], MergeStrategy::Templated, &MergeOptions::default())
            .unwrap_err();

        match err {
            Error::XmlParse { path, .. } => assert_eq!(path, bad),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_strategy_parsing() {
        assert_eq!("Pruned".parse::<MergeStrategy>().unwrap(), MergeStrategy::Pruned);
        assert!("zip".parse::<MergeStrategy>().is_err());
        assert_eq!(MergeStrategy::Concatenate.to_string(), "concatenate");
    }
}
