//! Word lists and the canonical form of a word entry
//!
//! A word list is a plain text file with one entry per line. The 1-based
//! line number is the word's ID. An entry looks like
//! `word[,alternate]*[ (annotation)]`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::ContestError;

/// Name of the synthetic list built from the missed-word store.
pub const REVIEW_LIST: &str = "missed_words";

/// Substring of `raw` before the first `(`, trimmed.
///
/// This is the key used by the missed-word store and the selector, and the
/// source of accepted answers for the checker.
pub fn canonical_form(raw: &str) -> &str {
    raw.split('(').next().unwrap_or_default().trim()
}

/// Comma separated spellings accepted for `raw`.
pub fn accepted_answers(raw: &str) -> Vec<&str> {
    canonical_form(raw).split(',').map(str::trim).collect()
}

/// Positional word list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordList {
    pub name: String,
    entries: Vec<String>,
}

impl WordList {
    pub fn new(name: impl Into<String>, entries: Vec<String>) -> Self {
        Self {
            name: name.into(),
            entries,
        }
    }

    /// Parse newline-delimited text. Blank lines keep their position but are
    /// never returned by [`WordList::get`].
    pub fn parse(name: impl Into<String>, text: &str) -> Self {
        let entries = text.lines().map(|line| line.trim().to_string()).collect();
        Self::new(name, entries)
    }

    pub fn load(path: &Path) -> io::Result<Self> {
        let text = fs::read_to_string(path)?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        Ok(Self::parse(name, &text))
    }

    /// Entry for a 1-based word ID.
    pub fn get(&self, id: usize) -> Option<&str> {
        let entry = self.entries.get(id.checked_sub(1)?)?;
        if entry.is_empty() {
            None
        } else {
            Some(entry.as_str())
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.iter().all(|e| e.is_empty())
    }
}

/// The set of word list files a contest may be started from.
#[derive(Debug, Clone)]
pub struct WordCatalog {
    dir: PathBuf,
    names: Vec<String>,
}

impl WordCatalog {
    pub fn new(dir: impl Into<PathBuf>, names: Vec<String>) -> Self {
        Self {
            dir: dir.into(),
            names,
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    /// Load a catalog list by name. Only names in the catalog resolve to a
    /// file; anything else is rejected before touching the filesystem.
    pub fn load(&self, name: &str) -> Result<WordList, ContestError> {
        if !self.contains(name) {
            return Err(ContestError::UnknownList(name.to_string()));
        }

        let path = self.dir.join(name);
        match WordList::load(&path) {
            Ok(list) if !list.is_empty() => Ok(list),
            Ok(_) => {
                log::warn!("word list {} is empty", path.display());
                Err(ContestError::ListUnavailable(name.to_string()))
            }
            Err(e) => {
                log::warn!("error reading word list {}: {e}", path.display());
                Err(ContestError::ListUnavailable(name.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_form_drops_annotation() {
        assert_eq!(canonical_form("cat, kat (animal)"), "cat, kat");
        assert_eq!(canonical_form("  esprit de corps "), "esprit de corps");
        assert_eq!(canonical_form("(only a note)"), "");
    }

    #[test]
    fn accepted_answers_split_on_commas() {
        assert_eq!(accepted_answers("cat, kat (animal)"), vec!["cat", "kat"]);
        assert_eq!(accepted_answers("catch-22"), vec!["catch-22"]);
    }

    #[test]
    fn ids_are_one_based_and_skip_blank_lines() {
        let list = WordList::parse("t.txt", "alpha\n\n  gamma (note)  \n");
        assert_eq!(list.len(), 3);
        assert_eq!(list.get(0), None);
        assert_eq!(list.get(1), Some("alpha"));
        assert_eq!(list.get(2), None);
        assert_eq!(list.get(3), Some("gamma (note)"));
        assert_eq!(list.get(4), None);
    }

    #[test]
    fn catalog_rejects_names_outside_it() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("2025.txt"), "one\ntwo\n").unwrap();
        let catalog = WordCatalog::new(dir.path(), vec!["2025.txt".into(), "2024.txt".into()]);

        assert_eq!(catalog.load("2025.txt").unwrap().get(2), Some("two"));
        assert_eq!(
            catalog.load("../secret"),
            Err(ContestError::UnknownList("../secret".into()))
        );
        assert_eq!(
            catalog.load("2024.txt"),
            Err(ContestError::ListUnavailable("2024.txt".into()))
        );
    }
}
