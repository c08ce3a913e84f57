//! Directory scanner for discovering and grouping content documents

use crate::error::{Error, Result};
use crate::options::Includes;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

/// Directory whose children are per-class groups
pub const CLASSES_DIR: &str = "Classes";

/// What a group compiles into
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupKind {
    /// A top-level content category (Items, Spells, ...)
    Category,
    /// One class and its subclasses
    Class,
}

/// A set of documents merged into one compendium
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    /// Group name, also the compendium name
    pub name: String,
    pub kind: GroupKind,
    /// Member files, sorted by path
    pub members: Vec<PathBuf>,
}

/// Result of scanning a content root
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResult {
    /// Directory that was scanned
    pub root: PathBuf,
    /// Included groups: categories first, then classes, each sorted by name
    pub groups: Vec<Group>,
    /// Total number of member files
    pub total_files: usize,
}

impl ScanResult {
    /// Find a group by name
    pub fn find_group(&self, name: &str) -> Option<&Group> {
        self.groups.iter().find(|g| g.name == name)
    }

    /// Get all group names
    pub fn group_names(&self) -> Vec<&str> {
        self.groups.iter().map(|g| g.name.as_str()).collect()
    }
}

/// Scan a content root for XML documents and group them.
///
/// Directories listed in `ignore` (such as the output directory) and hidden
/// directories are skipped.
pub fn scan_content<P: AsRef<Path>>(root: P, includes: &Includes, ignore: &[PathBuf]) -> Result<ScanResult> {
    let root = root.as_ref();
    if !root.is_dir() {
        return Err(Error::MissingDirectory(root.to_path_buf()));
    }

    let ignored: Vec<PathBuf> = ignore.iter().filter_map(|p| p.canonicalize().ok()).collect();
    let mut group_map: BTreeMap<(GroupKind, String), Vec<PathBuf>> = BTreeMap::new();

    let walker = WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_entry(|entry| {
            if entry.depth() == 0 || !entry.file_type().is_dir() {
                return true;
            }
            let hidden = entry.file_name().to_string_lossy().starts_with('.');
            let skipped = entry
                .path()
                .canonicalize()
                .map(|p| ignored.contains(&p))
                .unwrap_or(false);
            !hidden && !skipped
        });

    for entry in walker {
        let entry = entry?;
        let path = entry.path();

        // Only process XML files
        if !entry.file_type().is_file() || !path.extension().is_some_and(|ext| ext == "xml") {
            continue;
        }

        let relative = path.strip_prefix(root).unwrap_or(path);
        match classify(relative) {
            Some(key) if includes.matches(&key.1) => {
                group_map.entry(key).or_default().push(path.to_path_buf());
            }
            Some(_) => {}
            None => tracing::debug!(path = %path.display(), "skipping file outside any group"),
        }
    }

    let mut total_files = 0;
    let groups: Vec<Group> = group_map
        .into_iter()
        .map(|((kind, name), mut members)| {
            members.sort();
            total_files += members.len();
            Group { name, kind, members }
        })
        .collect();

    Ok(ScanResult {
        root: root.to_path_buf(),
        groups,
        total_files,
    })
}

/// Determine the group of a file from its path relative to the content root
///
/// Examples:
/// - "Spells/PHB Spells.xml" -> (Category, "Spells")
/// - "Character/Classes/Fighter/Battle Master.xml" -> (Class, "Fighter")
/// - "Homebrew/Classes/Gunslinger/Base.xml" -> (Class, "Gunslinger")
/// - "Homebrew/Spells/Extra.xml" -> (Category, "Homebrew")
/// - "loose.xml" -> None
fn classify(relative: &Path) -> Option<(GroupKind, String)> {
    let components: Vec<String> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().to_string()),
            _ => None,
        })
        .collect();

    // The last component is the file itself
    let (_, dirs) = components.split_last()?;

    if let Some(pos) = dirs.iter().position(|d| d == CLASSES_DIR) {
        if let Some(class) = dirs.get(pos + 1) {
            return Some((GroupKind::Class, class.clone()));
        }
    }

    dirs.first().map(|top| (GroupKind::Category, top.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "<compendium/>").unwrap();
    }

    #[test]
    fn test_classify_category() {
        assert_eq!(
            classify(Path::new("Spells/PHB Spells.xml")),
            Some((GroupKind::Category, "Spells".to_string()))
        );
    }

    #[test]
    fn test_classify_class() {
        assert_eq!(
            classify(Path::new("Character/Classes/Fighter/Battle Master.xml")),
            Some((GroupKind::Class, "Fighter".to_string()))
        );
        assert_eq!(
            classify(Path::new("Homebrew/Classes/Gunslinger/Base.xml")),
            Some((GroupKind::Class, "Gunslinger".to_string()))
        );
    }

    #[test]
    fn test_classify_files_directly_under_classes() {
        // No class directory: falls back to the top-level category
        assert_eq!(
            classify(Path::new("Character/Classes/index.xml")),
            Some((GroupKind::Category, "Character".to_string()))
        );
    }

    #[test]
    fn test_classify_loose_file() {
        assert_eq!(classify(Path::new("loose.xml")), None);
    }

    #[test]
    fn test_scan_groups_and_sorting() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(root, "Spells/b.xml");
        touch(root, "Spells/a.xml");
        touch(root, "Items/items.xml");
        touch(root, "Items/notes.txt");
        touch(root, "Character/Classes/Wizard/Wizard.xml");
        touch(root, "Character/Classes/Wizard/Evocation.xml");
        touch(root, "Character/Races.xml");
        touch(root, ".git/config.xml");
        touch(root, "loose.xml");

        let result = scan_content(root, &Includes::All, &[]).unwrap();

        assert_eq!(result.group_names(), vec!["Character", "Items", "Spells", "Wizard"]);
        assert_eq!(result.total_files, 6);

        let spells = result.find_group("Spells").unwrap();
        assert_eq!(spells.kind, GroupKind::Category);
        assert_eq!(spells.members, vec![root.join("Spells/a.xml"), root.join("Spells/b.xml")]);

        let wizard = result.find_group("Wizard").unwrap();
        assert_eq!(wizard.kind, GroupKind::Class);
        assert_eq!(wizard.members.len(), 2);
    }

    #[test]
    fn test_scan_respects_includes_and_ignore() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(root, "Spells/a.xml");
        touch(root, "Items/items.xml");
        touch(root, "Compendiums/Spells Compendium.xml");

        let includes = Includes::from_names(["Spells", "Compendiums"]);
        let result = scan_content(root, &includes, &[root.join("Compendiums")]).unwrap();

        assert_eq!(result.group_names(), vec!["Spells"]);
    }

    #[test]
    fn test_scan_missing_root() {
        let err = scan_content("/no/such/content", &Includes::All, &[]).unwrap_err();
        assert!(matches!(err, Error::MissingDirectory(_)));
    }
}
