use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Chapters that open without the basmala formula.
pub const NO_BASMALA: [u32; 2] = [1, 9];

/// Language tag attached to every scraped explanation.
pub const PRIMARY_LANGUAGE: &str = "AR";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Language {
    pub id: String,
    pub name: String,
}

/// The static language table. Not scraped, emitted verbatim.
pub fn language_table() -> BTreeMap<String, Language> {
    let mut languages = BTreeMap::new();
    languages.insert(
        "AR".to_string(),
        Language {
            id: "AR".to_string(),
            name: "Arabic".to_string(),
        },
    );
    languages.insert(
        "EN".to_string(),
        Language {
            id: "EN".to_string(),
            name: "English".to_string(),
        },
    );
    languages
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Verse {
    pub id: String,
    pub number: u32,
    pub arabic_unicodes: Vec<String>,
    pub explanations: Vec<String>,
    pub page: u32,
    pub section: u32,
    pub chapter: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chapter {
    pub id: u32,
    pub number: u32,
    pub name: String,
    pub arabic_unicode: String,
    pub basmala: bool,
    pub verses: Vec<String>,
    pub pages: Vec<u32>,
    pub sections: BTreeSet<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    pub id: u32,
    pub number: u32,
    pub verses: Vec<String>,
    pub chapters: BTreeSet<u32>,
    pub sections: BTreeSet<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
    pub id: u32,
    pub verses: Vec<String>,
    pub pages: Vec<u32>,
    pub chapters: BTreeSet<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Explanation {
    pub id: String,
    pub text: String,
    pub name: String,
    pub language: String,
    pub verse: String,
    pub page: u32,
    pub section: u32,
    pub chapter: u32,
}

/// Everything a finished (or interrupted) run hands to serialization.
#[derive(Debug, Clone)]
pub struct ScrapeDatasets {
    pub languages: BTreeMap<String, Language>,
    pub verses: BTreeMap<String, Verse>,
    pub pages: BTreeMap<u32, Page>,
    pub chapters: BTreeMap<u32, Chapter>,
    pub sections: BTreeMap<u32, Section>,
    pub explanations: BTreeMap<String, Explanation>,
}

impl ScrapeDatasets {
    pub fn counts(&self) -> DatasetCounts {
        DatasetCounts {
            languages: self.languages.len(),
            verses: self.verses.len(),
            pages: self.pages.len(),
            chapters: self.chapters.len(),
            sections: self.sections.len(),
            explanations: self.explanations.len(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetCounts {
    pub languages: usize,
    pub verses: usize,
    pub pages: usize,
    pub chapters: usize,
    pub sections: usize,
    pub explanations: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputEntry {
    pub filename: String,
    pub sha256: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeRunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub status: String,
    pub started_at: String,
    pub updated_at: String,
    pub command: String,
    pub file_prefix: String,
    pub failure_reason: Option<String>,
    pub counts: DatasetCounts,
    pub output_hashes: Vec<OutputEntry>,
    pub warnings: Vec<String>,
    pub notes: Vec<String>,
}
