//! Merge options and the build configuration file

use crate::error::{Error, Result};
use crate::exclusion::ExclusionSet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Whether a fully merged class is produced under each base class name
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BasetypeFormat {
    /// Base plus every matching subclass, folded into one entry
    #[default]
    Complete,
    /// No merged base entry
    None,
}

/// Whether and how standalone subclass entries are produced
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubtypeFormat {
    /// Subclass entry carrying a copy of the base content
    #[default]
    Usable,
    /// Subclass entry with only its own content, plus one `!Base` entry per base
    Reference,
    /// No subclass entries
    None,
}

impl FromStr for BasetypeFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "complete" => Ok(BasetypeFormat::Complete),
            "none" => Ok(BasetypeFormat::None),
            _ => Err(Error::invalid_option("basetype-format", s)),
        }
    }
}

impl fmt::Display for BasetypeFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BasetypeFormat::Complete => "complete",
            BasetypeFormat::None => "none",
        })
    }
}

impl FromStr for SubtypeFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "usable" => Ok(SubtypeFormat::Usable),
            "reference" => Ok(SubtypeFormat::Reference),
            "none" => Ok(SubtypeFormat::None),
            _ => Err(Error::invalid_option("subtype-format", s)),
        }
    }
}

impl fmt::Display for SubtypeFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SubtypeFormat::Usable => "usable",
            SubtypeFormat::Reference => "reference",
            SubtypeFormat::None => "none",
        })
    }
}

/// Options shared by every merge component
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeOptions {
    pub basetype_format: BasetypeFormat,
    pub subtype_format: SubtypeFormat,
    /// Active exclusion tags
    pub excludes: ExclusionSet,
}

/// Which groups a build processes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub enum Includes {
    #[default]
    All,
    Groups(BTreeSet<String>),
}

impl Includes {
    /// Build from names; `*` or an empty list selects everything
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut groups = BTreeSet::new();
        for name in names {
            let name = name.as_ref().trim();
            if name == "*" {
                return Includes::All;
            }
            if !name.is_empty() {
                groups.insert(name.to_string());
            }
        }
        if groups.is_empty() {
            Includes::All
        } else {
            Includes::Groups(groups)
        }
    }

    /// Case-insensitive group membership
    pub fn matches(&self, group: &str) -> bool {
        match self {
            Includes::All => true,
            Includes::Groups(groups) => groups.iter().any(|g| g.eq_ignore_ascii_case(group)),
        }
    }

    pub fn is_restricted(&self) -> bool {
        matches!(self, Includes::Groups(_))
    }
}

impl From<Vec<String>> for Includes {
    fn from(names: Vec<String>) -> Self {
        Includes::from_names(names)
    }
}

impl From<Includes> for Vec<String> {
    fn from(includes: Includes) -> Self {
        match includes {
            Includes::All => vec!["*".to_string()],
            Includes::Groups(groups) => groups.into_iter().collect(),
        }
    }
}

/// A build configuration file (JSON)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Directory holding the content groups
    pub content_root: PathBuf,
    /// Directory receiving the compendiums
    pub output_dir: PathBuf,
    /// Groups to process
    pub includes: Includes,
    /// Name of the aggregate compendium
    pub name: Option<String>,
    /// Merge options
    pub merge: MergeOptions,
    /// Skip groups with malformed documents instead of aborting
    pub skip_invalid: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            content_root: PathBuf::from("."),
            output_dir: PathBuf::from("Compendiums"),
            includes: Includes::All,
            name: None,
            merge: MergeOptions::default(),
            skip_invalid: false,
        }
    }
}

impl BuildConfig {
    /// Aggregate name: explicit, else `Limited` for restricted builds, else `Full`
    pub fn aggregate_name(&self) -> &str {
        match &self.name {
            Some(name) => name.as_str(),
            None if self.includes.is_restricted() => "Limited",
            None => "Full",
        }
    }

    /// Load a configuration from JSON
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| Error::FileRead {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&content).map_err(Error::Json)
    }

    /// Save the configuration to JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}

/// Output file name for a compendium
pub fn compendium_file_name(name: &str) -> String {
    format!("{} Compendium.xml", name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exclusion::ExclusionTag;

    #[test]
    fn test_format_parsing() {
        assert_eq!("complete".parse::<BasetypeFormat>().unwrap(), BasetypeFormat::Complete);
        assert_eq!("None".parse::<BasetypeFormat>().unwrap(), BasetypeFormat::None);
        assert_eq!("reference".parse::<SubtypeFormat>().unwrap(), SubtypeFormat::Reference);
        assert!("partial".parse::<SubtypeFormat>().is_err());
    }

    #[test]
    fn test_includes() {
        let all = Includes::from_names(["*"]);
        assert!(all.matches("Spells"));
        assert!(!all.is_restricted());

        let some = Includes::from_names(["Spells", "Wizard"]);
        assert!(some.matches("spells"));
        assert!(!some.matches("Bestiary"));
        assert!(some.is_restricted());

        assert_eq!(Includes::from_names(Vec::<String>::new()), Includes::All);
    }

    #[test]
    fn test_aggregate_name() {
        let mut config = BuildConfig::default();
        assert_eq!(config.aggregate_name(), "Full");

        config.includes = Includes::from_names(["Items"]);
        assert_eq!(config.aggregate_name(), "Limited");

        config.name = Some("Table".to_string());
        assert_eq!(config.aggregate_name(), "Table");
    }

    #[test]
    fn test_config_save_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("build.json");

        let mut config = BuildConfig::default();
        config.includes = Includes::from_names(["Spells"]);
        config.merge.subtype_format = SubtypeFormat::Reference;
        config.merge.excludes.insert(ExclusionTag::Homebrew);
        config.save(&path).unwrap();

        let loaded = BuildConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_config_defaults_for_missing_fields() {
        let config: BuildConfig =
            serde_json::from_str(r#"{"merge": {"excludes": ["UA"]}}"#).unwrap();
        assert_eq!(config.output_dir, PathBuf::from("Compendiums"));
        assert!(config.merge.excludes.contains(ExclusionTag::UnearthedArcana));
        assert_eq!(config.merge.basetype_format, BasetypeFormat::Complete);
    }

    #[test]
    fn test_compendium_file_name() {
        assert_eq!(compendium_file_name("Spells"), "Spells Compendium.xml");
    }
}
