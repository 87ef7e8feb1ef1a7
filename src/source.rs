use thiserror::Error;

/// Metadata of the chapter active while a verse was read. The native-script
/// name arrives with its numeric badge already stripped.
#[derive(Debug, Clone)]
pub struct ChapterMeta {
    pub number: u32,
    pub name: String,
    pub arabic_unicode: String,
}

/// One verse as observed in the live application: the page it was read on,
/// the chapter and reading section active at that moment, its rendered token
/// spans and the commentary revealed by activating it.
#[derive(Debug, Clone)]
pub struct VerseObservation {
    pub page_number: u32,
    pub chapter: ChapterMeta,
    pub section_number: u32,
    pub verse_number: u32,
    pub arabic_unicodes: Vec<String>,
    pub explanation_name: String,
    pub explanation_text: String,
}

#[derive(Debug, Error)]
pub enum SourceError {
    /// An expected page fragment never appeared within the wait budget.
    #[error("element not found: {selector}")]
    ElementNotFound { selector: String },

    /// Text that downstream ids depend on does not parse.
    #[error("malformed {what}: {text:?}")]
    Malformed { what: &'static str, text: String },

    #[error("browser session failed: {0}")]
    Browser(anyhow::Error),
}

/// Produces a finite, ordered stream of verse observations: pages in document
/// order, verses within a page in document order. No random access.
pub trait ObservationSource {
    /// `Ok(None)` marks the end of the stream. Any error is fatal to the run;
    /// callers must not retry per-item.
    fn next_observation(&mut self) -> Result<Option<VerseObservation>, SourceError>;
}
