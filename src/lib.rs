mod data;
pub mod query;
#[cfg(feature = "web")]
pub mod web;

pub use data::{Example, GrammarEntry, KanjiEntry, VocabWord};

use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use std::fmt;

static GRAMMAR_CATALOGS: Lazy<[Vec<GrammarEntry>; 5]> = Lazy::new(|| {
    [
        load_catalog("grammar/n5", include_str!("../data/grammar/n5.json")),
        load_catalog("grammar/n4", include_str!("../data/grammar/n4.json")),
        load_catalog("grammar/n3", include_str!("../data/grammar/n3.json")),
        load_catalog("grammar/n2", include_str!("../data/grammar/n2.json")),
        load_catalog("grammar/n1", include_str!("../data/grammar/n1.json")),
    ]
});

static KANJI_CATALOGS: Lazy<[Vec<KanjiEntry>; 5]> = Lazy::new(|| {
    [
        load_catalog("kanji/n5", include_str!("../data/kanji/n5.json")),
        load_catalog("kanji/n4", include_str!("../data/kanji/n4.json")),
        load_catalog("kanji/n3", include_str!("../data/kanji/n3.json")),
        load_catalog("kanji/n2", include_str!("../data/kanji/n2.json")),
        load_catalog("kanji/n1", include_str!("../data/kanji/n1.json")),
    ]
});

fn load_catalog<T: DeserializeOwned>(name: &str, raw: &str) -> Vec<T> {
    serde_json::from_str(raw).unwrap_or_else(|err| panic!("bundled catalog {name} parses: {err}"))
}

/// The five JLPT proficiency levels, easiest first.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum Level {
    N5,
    N4,
    N3,
    N2,
    N1,
}

impl Level {
    pub const ALL: [Level; 5] = [Level::N5, Level::N4, Level::N3, Level::N2, Level::N1];

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::N5 => "N5",
            Level::N4 => "N4",
            Level::N3 => "N3",
            Level::N2 => "N2",
            Level::N1 => "N1",
        }
    }

    /// Case-insensitive label lookup; `None` for anything that is not one of
    /// the five levels.
    pub fn parse(label: &str) -> Option<Level> {
        match label.trim().to_ascii_uppercase().as_str() {
            "N5" => Some(Level::N5),
            "N4" => Some(Level::N4),
            "N3" => Some(Level::N3),
            "N2" => Some(Level::N2),
            "N1" => Some(Level::N1),
            _ => None,
        }
    }

    fn slot(&self) -> usize {
        match self {
            Level::N5 => 0,
            Level::N4 => 1,
            Level::N3 => 2,
            Level::N2 => 3,
            Level::N1 => 4,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read-only access to the bundled grammar catalogs.
pub struct GrammarIndex;

impl GrammarIndex {
    /// Entries for a level label, in bundled order. Unknown labels yield an
    /// empty catalog rather than an error.
    pub fn entries(level: &str) -> &'static [GrammarEntry] {
        match Level::parse(level) {
            Some(level) => &GRAMMAR_CATALOGS[level.slot()],
            None => &[],
        }
    }

    /// The entry with the given identifier, if the level knows it.
    pub fn entry(level: &str, id: &str) -> Option<&'static GrammarEntry> {
        Self::entries(level).iter().find(|entry| entry.id == id)
    }
}

/// Read-only access to the bundled kanji catalogs.
pub struct KanjiIndex;

impl KanjiIndex {
    pub fn entries(level: &str) -> &'static [KanjiEntry] {
        match Level::parse(level) {
            Some(level) => &KANJI_CATALOGS[level.slot()],
            None => &[],
        }
    }

    pub fn entry(level: &str, id: &str) -> Option<&'static KanjiEntry> {
        Self::entries(level).iter().find(|entry| entry.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::ordinal;

    #[test]
    fn every_level_loads_both_catalogs() {
        for level in Level::ALL {
            assert!(
                !GrammarIndex::entries(level.as_str()).is_empty(),
                "grammar {level}"
            );
            assert!(
                !KanjiIndex::entries(level.as_str()).is_empty(),
                "kanji {level}"
            );
        }
    }

    #[test]
    fn unknown_level_is_an_empty_catalog() {
        assert!(GrammarIndex::entries("N6").is_empty());
        assert!(KanjiIndex::entries("").is_empty());
        assert!(GrammarIndex::entry("N6", "N6-1").is_none());
    }

    #[test]
    fn level_labels_parse_case_insensitively() {
        assert_eq!(Level::parse("n5"), Some(Level::N5));
        assert_eq!(Level::parse(" N1 "), Some(Level::N1));
        assert_eq!(Level::parse("N0"), None);
    }

    #[test]
    fn bundled_identifiers_are_well_formed_and_unique() {
        for level in Level::ALL {
            let mut seen = std::collections::HashSet::new();
            for entry in GrammarIndex::entries(level.as_str()) {
                assert!(entry.id.starts_with(level.as_str()), "{}", entry.id);
                assert!(ordinal(&entry.id).is_some(), "{}", entry.id);
                assert!(seen.insert(&entry.id), "duplicate {}", entry.id);
            }
            let mut seen = std::collections::HashSet::new();
            for entry in KanjiIndex::entries(level.as_str()) {
                assert!(entry.id.starts_with(level.as_str()), "{}", entry.id);
                assert!(ordinal(&entry.id).is_some(), "{}", entry.id);
                assert!(seen.insert(&entry.id), "duplicate {}", entry.id);
            }
        }
    }

    #[test]
    fn lookup_by_identifier() {
        let entry = GrammarIndex::entry("N5", "N5-1").expect("first N5 grammar point");
        assert_eq!(entry.id, "N5-1");
        assert!(KanjiIndex::entry("N5", "N5-1").is_some());
    }
}
