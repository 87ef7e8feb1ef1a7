use std::ffi::OsStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use headless_chrome::{Browser, Element, LaunchOptions, Tab};
use regex::Regex;
use tracing::{debug, info};

use crate::source::{ChapterMeta, ObservationSource, SourceError, VerseObservation};

const APP_URL: &str = "https://web.mushafmakkah.com/#!/?sura=1&aya=1&lang=ar";

// Selector table for the app's DOM. The page list and verse containers carry
// generated ids parameterized by page number, hence the format helpers.
const TAFSIR_TAB: &str = "div.HeaderInner nav > a.headerTabLink:nth-child(2)";

const PAGE_LIST: &str = "#soura-tab > div.soura-list > ul > li.hidden";
const PAGE_NUMBER: &str = "div.item-after > span.badge";
const PAGE_CLICK: &str = "div.item-content";

const VERSE_CLICK: &str = "span";
const VERSE_EXPLANATION_NAME: &str = "span.TafseerText span.tafsir-title";
const VERSE_EXPLANATION_TEXT: &str = "span.TafseerText span.TafseerText";

const ACTIVE_SECTION: &str = "#main_home_title > a";
const ACTIVE_CHAPTER: &str = ".soura-list-itemChecked";
const ACTIVE_CHAPTER_NAME: &str = ".item-after > span:first-child";
const ACTIVE_CHAPTER_NUMBER: &str = ".item-after > span.badge";
const ACTIVE_CHAPTER_ARABIC: &str = ".item-title";

fn page_content_selector(page: u32) -> String {
    format!("div#page_{page} span.aya")
}

fn verse_tokens_selector(page: u32) -> String {
    format!("span.page_{page}")
}

fn verse_active_selector(page: u32, ordinal: usize) -> String {
    format!("div#page_{page} span.aya.ayaActive:nth-child({ordinal})")
}

/// Browser-session budgets and toggles, taken from the scrape configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub headless: bool,
    pub element_wait: Duration,
    pub script_wait: Duration,
    pub load_wait: Duration,
}

struct ActivePage {
    number: u32,
    verse_count: usize,
    verse_index: usize,
}

/// Live observation source over a Chrome DevTools session.
///
/// Traversal is the app's document order: the page list is walked front to
/// back, and each page's verses are clicked in turn to reveal the commentary
/// pane before reading. Dropping the source tears the browser down.
pub struct MushafSource {
    _browser: Browser,
    tab: Arc<Tab>,
    verse_id_pattern: Regex,
    digits_pattern: Regex,
    page_count: usize,
    page_index: usize,
    page: Option<ActivePage>,
}

impl MushafSource {
    pub fn open(config: &SessionConfig) -> Result<Self, SourceError> {
        let launch = LaunchOptions::default_builder()
            .headless(config.headless)
            .idle_browser_timeout(config.script_wait)
            .args(vec![
                OsStr::new("--incognito"),
                OsStr::new("--start-maximized"),
                OsStr::new("--disable-notifications"),
                OsStr::new("--disable-extensions"),
                OsStr::new("--blink-settings=imagesEnabled=false"),
                OsStr::new("--mute-audio"),
            ])
            .build()
            .map_err(|err| SourceError::Browser(anyhow!("failed to assemble launch options: {err}")))?;

        let browser = Browser::new(launch).map_err(SourceError::Browser)?;
        let tab = browser.new_tab().map_err(SourceError::Browser)?;

        tab.set_default_timeout(config.load_wait);
        tab.navigate_to(APP_URL).map_err(SourceError::Browser)?;
        tab.wait_until_navigated().map_err(SourceError::Browser)?;
        tab.set_default_timeout(config.element_wait);

        let tafsir_tab = wait_for(&tab, TAFSIR_TAB)?;
        click(&tafsir_tab)?;

        wait_for(&tab, PAGE_LIST)?;
        let page_count = tab.find_elements(PAGE_LIST).map_err(SourceError::Browser)?.len();
        info!(pages = page_count, "opened mushaf session");

        let verse_id_pattern = Regex::new(r"sura_[0-9]+_aya_([0-9]+)")
            .map_err(|err| SourceError::Browser(anyhow!("failed to compile verse id pattern: {err}")))?;
        let digits_pattern = Regex::new(r"[0-9]+")
            .map_err(|err| SourceError::Browser(anyhow!("failed to compile digits pattern: {err}")))?;

        Ok(Self {
            _browser: browser,
            tab,
            verse_id_pattern,
            digits_pattern,
            page_count,
            page_index: 0,
            page: None,
        })
    }

    fn open_page(&self, index: usize) -> Result<ActivePage, SourceError> {
        let items = self.tab.find_elements(PAGE_LIST).map_err(SourceError::Browser)?;
        let item = items.get(index).ok_or_else(|| SourceError::ElementNotFound {
            selector: format!("{PAGE_LIST} (item {index})"),
        })?;

        let target = find_child(item, PAGE_CLICK)?;
        click(&target)?;

        let badge = find_child(item, PAGE_NUMBER)?;
        let number = self.badge_number(&inner_text(&badge)?, "page badge")?;

        wait_for(&self.tab, &page_content_selector(number))?;
        let verse_count = self
            .tab
            .find_elements(&page_content_selector(number))
            .map_err(SourceError::Browser)?
            .len();

        debug!(page = number, verses = verse_count, "opened page");
        Ok(ActivePage {
            number,
            verse_count,
            verse_index: 0,
        })
    }

    fn read_verse(&self, page_number: u32, ordinal: usize) -> Result<VerseObservation, SourceError> {
        let list_selector = page_content_selector(page_number);
        let verses = self.tab.find_elements(&list_selector).map_err(SourceError::Browser)?;
        let verse = verses.get(ordinal - 1).ok_or_else(|| SourceError::ElementNotFound {
            selector: format!("{list_selector} (item {ordinal})"),
        })?;

        let target = find_child(verse, VERSE_CLICK)?;
        click(&target)?;
        wait_for(&self.tab, &verse_active_selector(page_number, ordinal))?;

        let tokens_selector = verse_tokens_selector(page_number);
        let token_elements = verse
            .find_elements(&tokens_selector)
            .map_err(SourceError::Browser)?;
        let mut arabic_unicodes = Vec::with_capacity(token_elements.len());
        for token in &token_elements {
            arabic_unicodes.push(inner_text(token)?);
        }

        let verse_number = self.verse_number(verse, &tokens_selector)?;
        let explanation_name = inner_text(&find_child(verse, VERSE_EXPLANATION_NAME)?)?;
        let explanation_text = inner_text(&find_child(verse, VERSE_EXPLANATION_TEXT)?)?;

        let chapter = self.active_chapter()?;
        let section_number = self.section_number()?;

        debug!(
            page = page_number,
            chapter = chapter.number,
            verse = verse_number,
            "read verse"
        );
        Ok(VerseObservation {
            page_number,
            chapter,
            section_number,
            verse_number,
            arabic_unicodes,
            explanation_name,
            explanation_text,
        })
    }

    /// The verse's ordinal within its chapter, parsed from the generated id
    /// (`sura_<chapter>_aya_<verse>`) of its first token span.
    fn verse_number(&self, verse: &Element<'_>, tokens_selector: &str) -> Result<u32, SourceError> {
        let span = find_child(verse, tokens_selector)?;
        let id = element_id(&span)?.ok_or_else(|| SourceError::Malformed {
            what: "verse span id",
            text: String::new(),
        })?;

        let number = self
            .verse_id_pattern
            .captures(&id)
            .and_then(|captures| captures.get(1))
            .and_then(|m| m.as_str().parse::<u32>().ok())
            .ok_or_else(|| SourceError::Malformed {
                what: "verse span id",
                text: id.clone(),
            })?;
        Ok(number)
    }

    fn active_chapter(&self) -> Result<ChapterMeta, SourceError> {
        let entry = self
            .tab
            .find_element(ACTIVE_CHAPTER)
            .map_err(|_| not_found(ACTIVE_CHAPTER))?;

        let number = self.badge_number(
            &inner_text(&find_child(&entry, ACTIVE_CHAPTER_NUMBER)?)?,
            "chapter badge",
        )?;
        let name = inner_text(&find_child(&entry, ACTIVE_CHAPTER_NAME)?)?;

        // The native-script title embeds the chapter number badge; strip it.
        let raw = inner_text(&find_child(&entry, ACTIVE_CHAPTER_ARABIC)?)?;
        let arabic_unicode = self.digits_pattern.replace_all(&raw, "").into_owned();

        Ok(ChapterMeta {
            number,
            name,
            arabic_unicode,
        })
    }

    fn section_number(&self) -> Result<u32, SourceError> {
        let title = self
            .tab
            .find_element(ACTIVE_SECTION)
            .map_err(|_| not_found(ACTIVE_SECTION))?;
        self.badge_number(&inner_text(&title)?, "section title")
    }

    fn badge_number(&self, text: &str, what: &'static str) -> Result<u32, SourceError> {
        self.digits_pattern
            .find(text)
            .and_then(|m| m.as_str().parse::<u32>().ok())
            .ok_or_else(|| SourceError::Malformed {
                what,
                text: text.to_string(),
            })
    }
}

impl ObservationSource for MushafSource {
    fn next_observation(&mut self) -> Result<Option<VerseObservation>, SourceError> {
        loop {
            match self.page.take() {
                None => {
                    if self.page_index >= self.page_count {
                        return Ok(None);
                    }
                    self.page = Some(self.open_page(self.page_index)?);
                }
                Some(page) if page.verse_index >= page.verse_count => {
                    self.page_index += 1;
                }
                Some(mut page) => {
                    page.verse_index += 1;
                    let ordinal = page.verse_index;
                    let number = page.number;
                    self.page = Some(page);
                    return self.read_verse(number, ordinal).map(Some);
                }
            }
        }
    }
}

fn wait_for<'a>(tab: &'a Tab, selector: &str) -> Result<Element<'a>, SourceError> {
    tab.wait_for_element(selector).map_err(|_| not_found(selector))
}

fn find_child<'a>(parent: &Element<'a>, selector: &str) -> Result<Element<'a>, SourceError> {
    parent.find_element(selector).map_err(|_| not_found(selector))
}

/// Native click, falling back to a JS click for elements the app overlays.
fn click(element: &Element<'_>) -> Result<(), SourceError> {
    if element.click().is_ok() {
        return Ok(());
    }
    element
        .call_js_fn("function() { this.click(); }", Vec::new(), false)
        .map_err(SourceError::Browser)?;
    Ok(())
}

fn inner_text(element: &Element<'_>) -> Result<String, SourceError> {
    element.get_inner_text().map_err(SourceError::Browser)
}

fn element_id(element: &Element<'_>) -> Result<Option<String>, SourceError> {
    let attributes = element.get_attributes().map_err(SourceError::Browser)?;
    Ok(attributes.and_then(|pairs| {
        pairs
            .chunks_exact(2)
            .find(|pair| pair[0] == "id")
            .map(|pair| pair[1].clone())
    }))
}

fn not_found(selector: &str) -> SourceError {
    SourceError::ElementNotFound {
        selector: selector.to_string(),
    }
}
