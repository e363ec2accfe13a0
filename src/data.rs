use serde::{Deserialize, Serialize};

/// One example sentence pair attached to a grammar point or kanji.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct Example {
    pub sentence: String,
    pub translation: String,
}

/// One vocabulary word attached to a kanji entry.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct VocabWord {
    pub word: String,
    pub reading: String,
    pub translation: String,
}

/// A single grammar point. `id` is `"<LEVEL>-<ordinal>"`, unique within its
/// level; the ordinal after the dash is the natural sort and range key.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct GrammarEntry {
    pub id: String,
    pub pattern: String,
    #[serde(default)]
    pub meaning: String,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub examples: Vec<Example>,
}

/// A single kanji character with its readings and attached vocabulary.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct KanjiEntry {
    pub id: String,
    pub kanji: String,
    #[serde(default)]
    pub meaning: String,
    #[serde(default)]
    pub onyomi: Vec<String>,
    #[serde(default)]
    pub kunyomi: Vec<String>,
    #[serde(default)]
    pub vocab: Vec<VocabWord>,
    #[serde(default)]
    pub examples: Vec<Example>,
}
