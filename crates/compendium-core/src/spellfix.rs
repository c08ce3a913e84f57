//! Bestiary spell fixing
//!
//! Monsters list their spells as comma-delimited text. These helpers rewrite
//! those names to the canonical spelling of the spell entries and report names
//! that match no known spell.

use crate::document::{category, split_list, Document};
use crate::error::{Error, Result};
use crate::parser::{parse_xml, parse_xml_str};
use quick_xml::events::{BytesText, Event};
use quick_xml::{Reader, Writer};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

/// Child of a monster entry listing its spells
pub const MONSTER_SPELLS_FIELD: &str = "spells";

/// Known spell names, looked up case-insensitively
#[derive(Debug, Clone, Default)]
pub struct SpellCatalog {
    by_lowercase: BTreeMap<String, String>,
    /// Names seen more than once, ignoring case
    pub duplicates: Vec<String>,
}

impl SpellCatalog {
    /// Canonical spelling of a spell name
    pub fn canonical(&self, name: &str) -> Option<&str> {
        self.by_lowercase
            .get(&name.to_lowercase())
            .map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.canonical(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.by_lowercase.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_lowercase.is_empty()
    }
}

/// Collect spell names from every `spell` entry; the first spelling wins
pub fn collect_spell_names(documents: &[Document]) -> SpellCatalog {
    let mut catalog = SpellCatalog::default();
    let spells = documents
        .iter()
        .flat_map(|d| d.entries())
        .filter(|e| e.name == category::SPELL)
        .filter_map(|e| e.find_text("name"));

    for name in spells {
        let key = name.to_lowercase();
        if catalog.by_lowercase.contains_key(&key) {
            catalog.duplicates.push(name.to_string());
        } else {
            catalog.by_lowercase.insert(key, name.to_string());
        }
    }
    catalog
}

/// A rewritten monster spell list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonsterFix {
    pub monster: String,
    pub before: String,
    pub after: String,
}

/// A bestiary file after spell fixing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpellRewrite {
    pub content: String,
    pub fixes: Vec<MonsterFix>,
}

/// Canonical spelling for each name of a comma list. Unknown names and the
/// whitespace around every name are left as they are.
fn canonicalize_list(list: &str, catalog: &SpellCatalog) -> String {
    list.split(',')
        .map(|piece| {
            let name = piece.trim();
            match catalog.canonical(name) {
                Some(canonical) if !name.is_empty() => {
                    let lead = &piece[..piece.len() - piece.trim_start().len()];
                    let trail = &piece[piece.trim_end().len()..];
                    format!("{lead}{canonical}{trail}")
                }
                _ => piece.to_string(),
            }
        })
        .collect::<Vec<_>>()
        .join(",")
}

fn parse_failed(source: &Path, e: impl std::fmt::Display) -> Error {
    Error::XmlParse {
        path: source.to_path_buf(),
        message: e.to_string(),
    }
}

fn write_failed(source: &Path, e: impl std::fmt::Display) -> Error {
    Error::XmlWrite {
        path: source.to_path_buf(),
        message: e.to_string(),
    }
}

/// Rewrite monster spell names in bestiary XML to their canonical spelling.
///
/// Only the text of `monster/spells` fields changes; every other byte of the
/// file, declaration, comments and indentation included, is copied through.
pub fn fix_monster_spells(content: &str, source: &Path, catalog: &SpellCatalog) -> Result<SpellRewrite> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(false);
    let mut writer = Writer::new(Vec::new());

    let in_field = |stack: &[String], field: &str| {
        stack.len() == 3 && stack[1] == category::MONSTER && stack[2] == field
    };
    let mut stack: Vec<String> = Vec::new();
    let mut monster = String::new();
    let mut pending: Vec<(String, String)> = Vec::new();
    let mut fixes = Vec::new();

    loop {
        let event = reader.read_event().map_err(|e| parse_failed(source, e))?;
        match &event {
            Event::Eof => break,
            Event::Start(e) => {
                stack.push(String::from_utf8_lossy(e.name().as_ref()).into_owned());
                if stack.len() == 2 && stack[1] == category::MONSTER {
                    monster.clear();
                }
            }
            Event::End(_) => {
                let closed = stack.pop();
                if stack.len() == 1 && closed.as_deref() == Some(category::MONSTER) {
                    fixes.extend(pending.drain(..).map(|(before, after)| MonsterFix {
                        monster: monster.trim().to_string(),
                        before,
                        after,
                    }));
                }
            }
            Event::Text(t) if in_field(&stack, "name") => {
                monster.push_str(&t.unescape().map_err(|e| parse_failed(source, e))?);
            }
            Event::Text(t) if in_field(&stack, MONSTER_SPELLS_FIELD) => {
                let before = t.unescape().map_err(|e| parse_failed(source, e))?;
                let after = canonicalize_list(&before, catalog);
                if after != before {
                    writer
                        .write_event(Event::Text(BytesText::new(&after)))
                        .map_err(|e| write_failed(source, e))?;
                    pending.push((before.trim().to_string(), after.trim().to_string()));
                    continue;
                }
            }
            _ => {}
        }
        writer.write_event(event).map_err(|e| write_failed(source, e))?;
    }

    let content = String::from_utf8(writer.into_inner()).map_err(|e| write_failed(source, e))?;
    Ok(SpellRewrite { content, fixes })
}

/// Monster spell problems that fixing cannot resolve
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpellAudit {
    /// Monster spells matching no known spell
    pub unmatched: BTreeSet<String>,
    /// Monsters listing a spell twice (ignoring case), with the list text
    pub duplicate_lists: Vec<(String, String)>,
}

/// Find monster spells not in the catalog and lists with repeated spells
pub fn audit_monster_spells(documents: &[Document], catalog: &SpellCatalog) -> SpellAudit {
    let mut audit = SpellAudit::default();

    let monsters = documents
        .iter()
        .flat_map(|d| d.entries())
        .filter(|e| e.name == category::MONSTER);

    for monster in monsters {
        for field in monster.children.iter().filter(|c| c.name == MONSTER_SPELLS_FIELD) {
            let Some(text) = field.text.as_deref() else {
                continue;
            };
            let spells = split_list(text);

            let distinct: BTreeSet<String> = spells.iter().map(|s| s.to_lowercase()).collect();
            if distinct.len() != spells.len() {
                audit.duplicate_lists.push((
                    monster.find_text("name").unwrap_or_default().to_string(),
                    text.to_string(),
                ));
            }

            audit
                .unmatched
                .extend(spells.into_iter().filter(|s| !catalog.contains(s)));
        }
    }
    audit
}

/// Where the spell fixer reads from
#[derive(Debug, Clone, Copy, Default)]
pub struct SpellFixOptions {
    /// Fix homebrew monsters with official and homebrew spells
    pub homebrew: bool,
    /// Report without writing files
    pub dry_run: bool,
}

/// Outcome of a fixing run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpellFixReport {
    pub spell_sources: Vec<PathBuf>,
    pub bestiary_sources: Vec<PathBuf>,
    pub duplicate_spells: Vec<String>,
    pub fixes: Vec<(PathBuf, MonsterFix)>,
    pub written: Vec<PathBuf>,
    pub audit: SpellAudit,
}

/// XML files directly inside a directory, sorted; a missing directory is empty
pub fn xml_files_in(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "xml") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Fix the bestiary under a content root.
///
/// Official monsters (`Bestiary/`) use official spells (`Spells/`). With
/// `homebrew`, homebrew monsters (`Homebrew/Monsters/`) are fixed with both
/// official and homebrew (`Homebrew/Spells/`) spells instead.
pub fn fix_bestiary_spells(root: &Path, options: &SpellFixOptions) -> Result<SpellFixReport> {
    let mut report = SpellFixReport {
        spell_sources: xml_files_in(&root.join("Spells"))?,
        ..Default::default()
    };
    if options.homebrew {
        report
            .spell_sources
            .extend(xml_files_in(&root.join("Homebrew").join("Spells"))?);
    }
    report.bestiary_sources = if options.homebrew {
        xml_files_in(&root.join("Homebrew").join("Monsters"))?
    } else {
        xml_files_in(&root.join("Bestiary"))?
    };

    let spell_documents = report
        .spell_sources
        .iter()
        .map(parse_xml)
        .collect::<Result<Vec<_>>>()?;
    let catalog = collect_spell_names(&spell_documents);
    report.duplicate_spells = catalog.duplicates.clone();
    tracing::debug!(spells = catalog.len(), "collected spell names");

    let mut monsters = Vec::new();
    for path in &report.bestiary_sources {
        let content = fs::read_to_string(path).map_err(|source| Error::FileRead {
            path: path.clone(),
            source,
        })?;
        let rewrite = fix_monster_spells(&content, path, &catalog)?;
        if !rewrite.fixes.is_empty() {
            for fix in &rewrite.fixes {
                tracing::info!(
                    monster = %fix.monster,
                    before = %fix.before,
                    after = %fix.after,
                    "fixed spell names"
                );
            }
            if !options.dry_run {
                fs::write(path, &rewrite.content)?;
                report.written.push(path.clone());
            }
            report
                .fixes
                .extend(rewrite.fixes.into_iter().map(|fix| (path.clone(), fix)));
        }
        monsters.push(parse_xml_str(&rewrite.content, &path.to_string_lossy())?);
    }

    report.audit = audit_monster_spells(&monsters, &catalog);
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_xml_str;

    fn spells() -> Document {
        parse_xml_str(
            r#"<compendium>
                <spell><name>Fireball</name></spell>
                <spell><name>Mage Hand</name></spell>
                <spell><name>mage hand</name></spell>
            </compendium>"#,
            "spells.xml",
        )
        .unwrap()
    }

    const BESTIARY: &str = r#"<compendium>
                <monster><name>Archmage</name><spells>fireball, MAGE HAND, Wish</spells></monster>
                <monster><name>Cultist</name><spells>Fireball</spells></monster>
                <monster><spells>Fireball, fireball</spells><name>Twin</name></monster>
                <monster><name>Goblin</name><spells/></monster>
            </compendium>"#;

    fn bestiary() -> Document {
        parse_xml_str(BESTIARY, "bestiary.xml").unwrap()
    }

    #[test]
    fn test_collect_reports_case_insensitive_duplicates() {
        let catalog = collect_spell_names(&[spells()]);
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.duplicates, vec!["mage hand"]);
        assert_eq!(catalog.canonical("MAGE HAND"), Some("Mage Hand"));
    }

    #[test]
    fn test_fix_monster_spells() {
        let catalog = collect_spell_names(&[spells()]);

        let rewrite = fix_monster_spells(BESTIARY, Path::new("bestiary.xml"), &catalog).unwrap();

        assert_eq!(rewrite.fixes.len(), 2);
        assert_eq!(rewrite.fixes[0].monster, "Archmage");
        assert_eq!(rewrite.fixes[0].after, "Fireball, Mage Hand, Wish");
        assert_eq!(rewrite.fixes[1].monster, "Twin");

        let doc = parse_xml_str(&rewrite.content, "bestiary.xml").unwrap();
        assert_eq!(
            doc.find_entry("monster", "Twin").unwrap().find_text("spells"),
            Some("Fireball, Fireball")
        );
        assert_eq!(
            doc.find_entry("monster", "Cultist").unwrap().find_text("spells"),
            Some("Fireball")
        );
    }

    #[test]
    fn test_fix_keeps_everything_outside_spell_lists() {
        let catalog = collect_spell_names(&[spells()]);
        let input = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
            <!-- Source: Monster Manual -->\n\
            <compendium version=\"5\">\n\
            \t<monster>\n\
            \t\t<name>Lich</name>\n\
            \t\t<text>Cast <!-- c --> twice &amp; again</text>\n\
            \t\t<spells> fireball ,Mage Hand</spells>\n\
            \t</monster>\n\
            </compendium>\n";

        let rewrite = fix_monster_spells(input, Path::new("mm.xml"), &catalog).unwrap();

        assert_eq!(rewrite.content, input.replace(" fireball ,", " Fireball ,"));
        assert_eq!(
            rewrite.fixes,
            vec![MonsterFix {
                monster: "Lich".into(),
                before: "fireball ,Mage Hand".into(),
                after: "Fireball ,Mage Hand".into(),
            }]
        );
    }

    #[test]
    fn test_fix_rejects_malformed_bestiary() {
        let catalog = collect_spell_names(&[spells()]);
        let err = fix_monster_spells("<compendium><monster></compendium>", Path::new("bad.xml"), &catalog)
            .unwrap_err();
        assert!(err.to_string().contains("bad.xml"));
    }

    #[test]
    fn test_audit() {
        let catalog = collect_spell_names(&[spells()]);
        let audit = audit_monster_spells(&[bestiary()], &catalog);

        assert_eq!(audit.unmatched.iter().collect::<Vec<_>>(), vec!["Wish"]);
        assert_eq!(audit.duplicate_lists.len(), 1);
        assert_eq!(audit.duplicate_lists[0].0, "Twin");
    }

    #[test]
    fn test_fix_bestiary_dry_run_and_write() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("Spells")).unwrap();
        fs::create_dir_all(root.join("Bestiary")).unwrap();
        fs::write(
            root.join("Spells/phb.xml"),
            "<compendium><spell><name>Fireball</name></spell></compendium>",
        )
        .unwrap();
        let monster_path = root.join("Bestiary/mm.xml");
        fs::write(
            &monster_path,
            "<compendium><monster><name>Mage</name><spells>fireball</spells></monster></compendium>",
        )
        .unwrap();

        let dry = fix_bestiary_spells(root, &SpellFixOptions { homebrew: false, dry_run: true }).unwrap();
        assert_eq!(dry.fixes.len(), 1);
        assert!(dry.written.is_empty());
        assert!(fs::read_to_string(&monster_path).unwrap().contains("fireball"));

        let real = fix_bestiary_spells(root, &SpellFixOptions::default()).unwrap();
        assert_eq!(real.written, vec![monster_path.clone()]);
        assert_eq!(
            fs::read_to_string(&monster_path).unwrap(),
            "<compendium><monster><name>Mage</name><spells>Fireball</spells></monster></compendium>"
        );
    }

    #[test]
    fn test_homebrew_uses_both_spell_sources() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("Spells")).unwrap();
        fs::create_dir_all(root.join("Homebrew/Spells")).unwrap();
        fs::create_dir_all(root.join("Homebrew/Monsters")).unwrap();
        fs::write(
            root.join("Spells/phb.xml"),
            "<compendium><spell><name>Fireball</name></spell></compendium>",
        )
        .unwrap();
        fs::write(
            root.join("Homebrew/Spells/hb.xml"),
            "<compendium><spell><name>Frost Nova</name></spell></compendium>",
        )
        .unwrap();
        fs::write(
            root.join("Homebrew/Monsters/hb.xml"),
            "<compendium><monster><name>Ice Witch</name><spells>frost nova, FIREBALL</spells></monster></compendium>",
        )
        .unwrap();

        let report =
            fix_bestiary_spells(root, &SpellFixOptions { homebrew: true, dry_run: true }).unwrap();

        assert_eq!(report.spell_sources.len(), 2);
        assert_eq!(report.fixes[0].1.after, "Frost Nova, Fireball");
        assert!(report.audit.unmatched.is_empty());
    }
}
