use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;

use crate::model::{
    Chapter, Explanation, NO_BASMALA, PRIMARY_LANGUAGE, Page, ScrapeDatasets, Section, Verse,
    language_table,
};
use crate::source::VerseObservation;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("duplicate verse id: {id}")]
    DuplicateVerse { id: String },
}

/// Which transitions an observation triggered. The driver logs these; tests
/// observe the chapter/section state machine through them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestOutcome {
    pub verse_id: String,
    pub page_entered: Option<u32>,
    pub chapter_entered: Option<u32>,
    pub section_entered: Option<u32>,
}

/// Folds the observation stream into the five cross-referenced collections.
///
/// Records are created lazily on first sight and mutated monotonically: verse
/// lists are append-only in observation order, related-id sets deduplicate,
/// and a page id lands in a chapter's or section's page list exactly once, at
/// the first verse of that page seen under that chapter or section.
pub struct Aggregator {
    verses: BTreeMap<String, Verse>,
    pages: BTreeMap<u32, Page>,
    chapters: BTreeMap<u32, Chapter>,
    sections: BTreeMap<u32, Section>,
    explanations: BTreeMap<String, Explanation>,
    current_chapter: Option<u32>,
    current_section: Option<u32>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self {
            verses: BTreeMap::new(),
            pages: BTreeMap::new(),
            chapters: BTreeMap::new(),
            sections: BTreeMap::new(),
            explanations: BTreeMap::new(),
            current_chapter: None,
            current_section: None,
        }
    }

    pub fn ingest(&mut self, observation: VerseObservation) -> Result<IngestOutcome, IngestError> {
        let VerseObservation {
            page_number,
            chapter,
            section_number,
            verse_number,
            arabic_unicodes,
            explanation_name,
            explanation_text,
        } = observation;

        let chapter_number = chapter.number;
        let verse_id = format!("{chapter_number}:{verse_number}");

        // Rejected before any state mutates, so a failed ingest leaves the
        // collections untouched.
        if self.verses.contains_key(&verse_id) {
            return Err(IngestError::DuplicateVerse { id: verse_id });
        }

        let page_entered = !self.pages.contains_key(&page_number);
        let page = self.pages.entry(page_number).or_insert_with(|| Page {
            id: page_number,
            number: page_number,
            verses: Vec::new(),
            chapters: BTreeSet::new(),
            sections: BTreeSet::new(),
        });

        self.explanations.insert(
            verse_id.clone(),
            Explanation {
                id: verse_id.clone(),
                text: explanation_text,
                name: explanation_name,
                language: PRIMARY_LANGUAGE.to_string(),
                verse: verse_id.clone(),
                page: page_number,
                section: section_number,
                chapter: chapter_number,
            },
        );

        self.verses.insert(
            verse_id.clone(),
            Verse {
                id: verse_id.clone(),
                number: verse_number,
                arabic_unicodes,
                explanations: vec![verse_id.clone()],
                page: page_number,
                section: section_number,
                chapter: chapter_number,
            },
        );

        let chapter_entered = self.current_chapter != Some(chapter_number);
        self.current_chapter = Some(chapter_number);
        let chapter_record = self.chapters.entry(chapter_number).or_insert_with(|| Chapter {
            id: chapter_number,
            number: chapter_number,
            name: chapter.name,
            arabic_unicode: chapter.arabic_unicode,
            basmala: !NO_BASMALA.contains(&chapter_number),
            verses: Vec::new(),
            pages: Vec::new(),
            sections: BTreeSet::new(),
        });

        let section_entered = self.current_section != Some(section_number);
        self.current_section = Some(section_number);
        let section_record = self.sections.entry(section_number).or_insert_with(|| Section {
            id: section_number,
            verses: Vec::new(),
            pages: Vec::new(),
            chapters: BTreeSet::new(),
        });

        chapter_record.sections.insert(section_number);
        page.sections.insert(section_number);
        section_record.chapters.insert(chapter_number);
        page.chapters.insert(chapter_number);

        chapter_record.verses.push(verse_id.clone());
        section_record.verses.push(verse_id.clone());
        page.verses.push(verse_id.clone());

        if !chapter_record.pages.contains(&page_number) {
            chapter_record.pages.push(page_number);
        }
        if !section_record.pages.contains(&page_number) {
            section_record.pages.push(page_number);
        }

        Ok(IngestOutcome {
            verse_id,
            page_entered: page_entered.then_some(page_number),
            chapter_entered: chapter_entered.then_some(chapter_number),
            section_entered: section_entered.then_some(section_number),
        })
    }

    /// Hands the accumulated collections to serialization, attaching the
    /// static language table. Valid on any prefix of the stream.
    pub fn finalize(self) -> ScrapeDatasets {
        ScrapeDatasets {
            languages: language_table(),
            verses: self.verses,
            pages: self.pages,
            chapters: self.chapters,
            sections: self.sections,
            explanations: self.explanations,
        }
    }
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::ChapterMeta;

    fn observation(page: u32, chapter: u32, section: u32, verse: u32) -> VerseObservation {
        VerseObservation {
            page_number: page,
            chapter: ChapterMeta {
                number: chapter,
                name: format!("Chapter {chapter}"),
                arabic_unicode: format!("سورة {chapter}"),
            },
            section_number: section,
            verse_number: verse,
            arabic_unicodes: vec![format!("token-{chapter}-{verse}-a"), format!("token-{chapter}-{verse}-b")],
            explanation_name: "التفسير الميسر".to_string(),
            explanation_text: format!("tafsir for {chapter}:{verse}"),
        }
    }

    fn ingest_all(aggregator: &mut Aggregator, observations: Vec<VerseObservation>) {
        for obs in observations {
            aggregator.ingest(obs).expect("ingest failed");
        }
    }

    #[test]
    fn three_observation_scenario_links_every_collection() {
        let mut aggregator = Aggregator::new();
        ingest_all(
            &mut aggregator,
            vec![
                observation(1, 1, 1, 1),
                observation(1, 1, 1, 2),
                observation(1, 2, 1, 1),
            ],
        );
        let datasets = aggregator.finalize();

        assert_eq!(datasets.chapters.keys().copied().collect::<Vec<_>>(), vec![1, 2]);

        let chapter_one = &datasets.chapters[&1];
        assert_eq!(chapter_one.verses, vec!["1:1", "1:2"]);
        assert_eq!(chapter_one.pages, vec![1]);

        let chapter_two = &datasets.chapters[&2];
        assert_eq!(chapter_two.verses, vec!["2:1"]);
        assert_eq!(chapter_two.pages, vec![1]);

        let page_one = &datasets.pages[&1];
        assert_eq!(page_one.verses, vec!["1:1", "1:2", "2:1"]);
        assert_eq!(page_one.chapters.iter().copied().collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(page_one.sections.iter().copied().collect::<Vec<_>>(), vec![1]);

        let section_one = &datasets.sections[&1];
        assert_eq!(section_one.chapters.iter().copied().collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(section_one.pages, vec![1]);
    }

    #[test]
    fn duplicate_verse_id_is_rejected_without_mutation() {
        let mut aggregator = Aggregator::new();
        aggregator.ingest(observation(1, 1, 1, 1)).expect("first ingest failed");

        let err = aggregator
            .ingest(observation(2, 1, 1, 1))
            .expect_err("duplicate must be rejected");
        let IngestError::DuplicateVerse { id } = err;
        assert_eq!(id, "1:1");

        let datasets = aggregator.finalize();
        assert_eq!(datasets.verses.len(), 1);
        assert_eq!(datasets.explanations.len(), 1);
        assert!(!datasets.pages.contains_key(&2));
    }

    #[test]
    fn back_references_resolve_and_appear_exactly_once() {
        let mut aggregator = Aggregator::new();
        ingest_all(
            &mut aggregator,
            vec![
                observation(1, 1, 1, 1),
                observation(1, 1, 1, 2),
                observation(2, 1, 1, 3),
                observation(2, 1, 2, 4),
                observation(3, 2, 2, 1),
            ],
        );
        let datasets = aggregator.finalize();

        assert_eq!(datasets.verses.len(), 5);
        for (id, verse) in &datasets.verses {
            assert_eq!(id, &verse.id);
            assert_eq!(verse.id, format!("{}:{}", verse.chapter, verse.number));

            let page = datasets.pages.get(&verse.page).expect("page record missing");
            assert_eq!(page.verses.iter().filter(|v| *v == id).count(), 1);

            let chapter = datasets.chapters.get(&verse.chapter).expect("chapter record missing");
            assert_eq!(chapter.verses.iter().filter(|v| *v == id).count(), 1);

            let section = datasets.sections.get(&verse.section).expect("section record missing");
            assert_eq!(section.verses.iter().filter(|v| *v == id).count(), 1);
        }
    }

    #[test]
    fn basmala_flag_follows_exception_list() {
        let mut aggregator = Aggregator::new();
        ingest_all(
            &mut aggregator,
            vec![
                observation(1, 1, 1, 1),
                observation(2, 9, 10, 1),
                observation(3, 2, 1, 1),
            ],
        );
        let datasets = aggregator.finalize();

        assert!(!datasets.chapters[&1].basmala);
        assert!(!datasets.chapters[&9].basmala);
        assert!(datasets.chapters[&2].basmala);
    }

    #[test]
    fn set_insertion_is_idempotent_while_verse_lists_append() {
        let mut aggregator = Aggregator::new();
        ingest_all(
            &mut aggregator,
            vec![observation(7, 3, 2, 1), observation(7, 3, 2, 2)],
        );
        let datasets = aggregator.finalize();

        let page = &datasets.pages[&7];
        assert_eq!(page.chapters.len(), 1);
        assert_eq!(page.sections.len(), 1);
        assert_eq!(page.verses, vec!["3:1", "3:2"]);

        let chapter = &datasets.chapters[&3];
        assert_eq!(chapter.sections.len(), 1);
        assert_eq!(chapter.pages, vec![7]);
        assert_eq!(chapter.verses, vec!["3:1", "3:2"]);

        let section = &datasets.sections[&2];
        assert_eq!(section.chapters.len(), 1);
        assert_eq!(section.pages, vec![7]);
        assert_eq!(section.verses, vec!["3:1", "3:2"]);
    }

    #[test]
    fn one_explanation_per_observation_in_the_primary_language() {
        let mut aggregator = Aggregator::new();
        ingest_all(
            &mut aggregator,
            vec![
                observation(1, 1, 1, 1),
                observation(1, 1, 1, 2),
                observation(2, 1, 1, 3),
                observation(2, 2, 1, 1),
            ],
        );
        let datasets = aggregator.finalize();

        assert_eq!(datasets.explanations.len(), 4);
        for (id, explanation) in &datasets.explanations {
            assert_eq!(explanation.language, PRIMARY_LANGUAGE);
            assert_eq!(&explanation.verse, id);

            let verse = datasets.verses.get(id).expect("verse record missing");
            assert_eq!(verse.explanations, vec![id.clone()]);
            assert_eq!(explanation.page, verse.page);
            assert_eq!(explanation.section, verse.section);
            assert_eq!(explanation.chapter, verse.chapter);
        }
    }

    #[test]
    fn outcome_reports_transitions() {
        let mut aggregator = Aggregator::new();

        let first = aggregator.ingest(observation(1, 1, 1, 1)).expect("ingest failed");
        assert_eq!(first.verse_id, "1:1");
        assert_eq!(first.page_entered, Some(1));
        assert_eq!(first.chapter_entered, Some(1));
        assert_eq!(first.section_entered, Some(1));

        let second = aggregator.ingest(observation(1, 1, 1, 2)).expect("ingest failed");
        assert_eq!(second.page_entered, None);
        assert_eq!(second.chapter_entered, None);
        assert_eq!(second.section_entered, None);

        let third = aggregator.ingest(observation(1, 2, 1, 1)).expect("ingest failed");
        assert_eq!(third.page_entered, None);
        assert_eq!(third.chapter_entered, Some(2));
        assert_eq!(third.section_entered, None);

        let fourth = aggregator.ingest(observation(2, 2, 2, 2)).expect("ingest failed");
        assert_eq!(fourth.page_entered, Some(2));
        assert_eq!(fourth.chapter_entered, None);
        assert_eq!(fourth.section_entered, Some(2));
    }

    #[test]
    fn chapter_metadata_is_captured_on_first_sight() {
        let mut aggregator = Aggregator::new();
        ingest_all(&mut aggregator, vec![observation(1, 5, 1, 1)]);
        let datasets = aggregator.finalize();

        let chapter = &datasets.chapters[&5];
        assert_eq!(chapter.name, "Chapter 5");
        assert_eq!(chapter.arabic_unicode, "سورة 5");
    }

    #[test]
    fn finalize_attaches_the_language_table() {
        let datasets = Aggregator::new().finalize();

        assert_eq!(datasets.languages.len(), 2);
        assert_eq!(datasets.languages["AR"].name, "Arabic");
        assert_eq!(datasets.languages["EN"].name, "English");
        assert!(datasets.verses.is_empty());
    }
}
