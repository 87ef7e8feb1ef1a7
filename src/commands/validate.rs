use std::collections::{BTreeMap, BTreeSet};

use anyhow::{Result, bail};
use tracing::{info, warn};

use crate::cli::ValidateArgs;
use crate::model::{
    Chapter, Explanation, Language, NO_BASMALA, PRIMARY_LANGUAGE, Page, Section, Verse,
};
use crate::output::load_collection;

pub fn run(args: ValidateArgs) -> Result<()> {
    let languages: BTreeMap<String, Language> = load_collection(&args.file_prefix, "languages")?;
    let verses: BTreeMap<String, Verse> = load_collection(&args.file_prefix, "verses")?;
    let pages: BTreeMap<u32, Page> = load_collection(&args.file_prefix, "pages")?;
    let chapters: BTreeMap<u32, Chapter> = load_collection(&args.file_prefix, "chapters")?;
    let sections: BTreeMap<u32, Section> = load_collection(&args.file_prefix, "sections")?;
    let explanations: BTreeMap<String, Explanation> =
        load_collection(&args.file_prefix, "explanations")?;

    info!(
        verses = verses.len(),
        pages = pages.len(),
        chapters = chapters.len(),
        sections = sections.len(),
        explanations = explanations.len(),
        "loaded datasets"
    );

    let mut issues = check_languages(&languages);
    issues.extend(check_datasets(
        &verses,
        &pages,
        &chapters,
        &sections,
        &explanations,
    ));

    if issues.is_empty() {
        info!(verses = verses.len(), "datasets validated");
        return Ok(());
    }

    for issue in &issues {
        warn!(issue = %issue, "cross-reference violation");
    }
    bail!("{} cross-reference violations", issues.len())
}

fn check_languages(languages: &BTreeMap<String, Language>) -> Vec<String> {
    let mut issues = Vec::new();
    if !languages.contains_key(PRIMARY_LANGUAGE) {
        issues.push(format!("language table is missing {PRIMARY_LANGUAGE}"));
    }
    for (id, language) in languages {
        if id != &language.id {
            issues.push(format!("language {id} keyed under mismatched id {}", language.id));
        }
    }
    issues
}

fn check_datasets(
    verses: &BTreeMap<String, Verse>,
    pages: &BTreeMap<u32, Page>,
    chapters: &BTreeMap<u32, Chapter>,
    sections: &BTreeMap<u32, Section>,
    explanations: &BTreeMap<String, Explanation>,
) -> Vec<String> {
    let mut issues = Vec::new();

    for (id, verse) in verses {
        if id != &verse.id {
            issues.push(format!("verse {id} keyed under mismatched id {}", verse.id));
        }
        if verse.id != format!("{}:{}", verse.chapter, verse.number) {
            issues.push(format!(
                "verse {id} disagrees with its chapter/number pair {}:{}",
                verse.chapter, verse.number
            ));
        }

        match pages.get(&verse.page) {
            None => issues.push(format!("verse {id} references missing page {}", verse.page)),
            Some(page) => {
                if page.verses.iter().filter(|v| *v == id).count() != 1 {
                    issues.push(format!(
                        "page {} does not list verse {id} exactly once",
                        verse.page
                    ));
                }
            }
        }
        match chapters.get(&verse.chapter) {
            None => issues.push(format!(
                "verse {id} references missing chapter {}",
                verse.chapter
            )),
            Some(chapter) => {
                if chapter.verses.iter().filter(|v| *v == id).count() != 1 {
                    issues.push(format!(
                        "chapter {} does not list verse {id} exactly once",
                        verse.chapter
                    ));
                }
            }
        }
        match sections.get(&verse.section) {
            None => issues.push(format!(
                "verse {id} references missing section {}",
                verse.section
            )),
            Some(section) => {
                if section.verses.iter().filter(|v| *v == id).count() != 1 {
                    issues.push(format!(
                        "section {} does not list verse {id} exactly once",
                        verse.section
                    ));
                }
            }
        }

        for explanation_id in &verse.explanations {
            if !explanations.contains_key(explanation_id) {
                issues.push(format!(
                    "verse {id} references missing explanation {explanation_id}"
                ));
            }
        }
    }

    for (id, chapter) in chapters {
        let expected = !NO_BASMALA.contains(id);
        if chapter.basmala != expected {
            issues.push(format!(
                "chapter {id} basmala flag is {}, expected {expected}",
                chapter.basmala
            ));
        }
    }

    for (id, page) in pages {
        let derived_chapters: BTreeSet<u32> = page
            .verses
            .iter()
            .filter_map(|verse_id| verses.get(verse_id))
            .map(|verse| verse.chapter)
            .collect();
        if derived_chapters != page.chapters {
            issues.push(format!("page {id} chapter set disagrees with its verse list"));
        }

        let derived_sections: BTreeSet<u32> = page
            .verses
            .iter()
            .filter_map(|verse_id| verses.get(verse_id))
            .map(|verse| verse.section)
            .collect();
        if derived_sections != page.sections {
            issues.push(format!("page {id} section set disagrees with its verse list"));
        }
    }

    for (id, explanation) in explanations {
        if explanation.language != PRIMARY_LANGUAGE {
            issues.push(format!(
                "explanation {id} carries language {}, expected {PRIMARY_LANGUAGE}",
                explanation.language
            ));
        }
        match verses.get(&explanation.verse) {
            None => issues.push(format!(
                "explanation {id} references missing verse {}",
                explanation.verse
            )),
            Some(verse) => {
                if !verse.explanations.contains(id) {
                    issues.push(format!(
                        "verse {} does not list explanation {id}",
                        explanation.verse
                    ));
                }
            }
        }
    }

    issues
}
