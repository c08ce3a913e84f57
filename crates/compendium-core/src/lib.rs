//! compendium-core: Core library for merging tabletop content into compendiums
//!
//! This library provides functionality to:
//! - Parse and write compendium XML documents
//! - Filter out tagged content (homebrew, playtest material, ...)
//! - Merge documents with duplicate attribution (pruned, concatenate, templated)
//! - Fold spell lists and borrowed spells into spell class fields
//! - Compile base classes and subclasses into class entries
//! - Scan a content tree into groups and build every compendium
//! - Fix monster spell names against the spell lists

pub mod assemble;
pub mod build;
pub mod classes;
pub mod crossref;
pub mod diagnostics;
pub mod document;
pub mod error;
pub mod exclusion;
pub mod index;
pub mod merger;
pub mod options;
pub mod parser;
pub mod report;
pub mod scanner;
pub mod spellfix;
pub mod writer;

pub use build::{build_compendiums, build_from_scan, build_group};
pub use diagnostics::{Diagnostic, Diagnostics, Kept};
pub use document::{Document, Element};
pub use error::{Error, Result};
pub use exclusion::{filter_document, ExclusionSet, ExclusionTag};
pub use index::{EntryIndex, IndexedEntry};
pub use merger::{merge_documents, merge_files, Compendium, MergeStrategy};
pub use options::{compendium_file_name, BasetypeFormat, BuildConfig, Includes, MergeOptions, SubtypeFormat};
pub use parser::{parse_xml, parse_xml_str};
pub use report::RunReport;
pub use scanner::{scan_content, Group, GroupKind, ScanResult};
pub use spellfix::{fix_bestiary_spells, SpellFixOptions, SpellFixReport};
pub use writer::{to_xml_string, write_document};
