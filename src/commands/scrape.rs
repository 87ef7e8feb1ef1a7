use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{info, warn};

use crate::aggregate::Aggregator;
use crate::browser::{MushafSource, SessionConfig};
use crate::cli::ScrapeArgs;
use crate::model::{OutputEntry, ScrapeRunManifest};
use crate::output::{manifest_path, write_datasets, write_json_indented};
use crate::source::ObservationSource;
use crate::util::{now_utc_string, sha256_file, utc_compact_string};

const MANIFEST_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunOutcome {
    Completed,
    Interrupted,
}

pub fn run(args: ScrapeArgs) -> Result<()> {
    let started_ts = Utc::now();
    let started_at = now_utc_string();
    let run_id = format!("run-{}", utc_compact_string(started_ts));

    let cancel = Arc::new(AtomicBool::new(false));
    let handler_flag = Arc::clone(&cancel);
    ctrlc::set_handler(move || handler_flag.store(true, Ordering::Relaxed))
        .context("failed to install interrupt handler")?;

    info!(run_id = %run_id, file_prefix = %args.file_prefix, "starting scrape");

    let session = SessionConfig {
        headless: args.headless,
        element_wait: Duration::from_secs_f64(args.query_wait),
        script_wait: Duration::from_secs_f64(args.script_wait),
        load_wait: Duration::from_secs_f64(args.load_wait),
    };
    let mut source = MushafSource::open(&session).context("failed to open mushaf session")?;

    let progress = Progress::new(args.log, args.log_width);
    let mut aggregator = Aggregator::new();
    let outcome = drive(&mut source, &mut aggregator, &cancel, &progress);
    drop(source);

    // Whatever the outcome, the accumulated prefix is flushed: partial
    // datasets from an interrupt or a fatal source error are still valid.
    let datasets = aggregator.finalize();
    let counts = datasets.counts();
    let written = write_datasets(&args.file_prefix, &datasets, args.indent)?;

    let mut output_hashes = Vec::with_capacity(written.len());
    for path in &written {
        output_hashes.push(OutputEntry {
            filename: path.display().to_string(),
            sha256: sha256_file(path)?,
        });
    }

    let status = match &outcome {
        Ok(RunOutcome::Completed) => "completed",
        Ok(RunOutcome::Interrupted) => "interrupted",
        Err(_) => "failed",
    };
    let mut warnings = Vec::new();
    if status != "completed" {
        warnings.push("datasets cover a prefix of the mushaf; the run ended early".to_string());
    }

    let manifest = ScrapeRunManifest {
        manifest_version: MANIFEST_VERSION,
        run_id,
        status: status.to_string(),
        started_at,
        updated_at: now_utc_string(),
        command: render_scrape_command(&args),
        file_prefix: args.file_prefix.clone(),
        failure_reason: outcome.as_ref().err().map(|err| format!("{err:#}")),
        counts,
        output_hashes,
        warnings,
        notes: vec![
            "Datasets are keyed by id and cross-reference each other by verse, page, chapter and section ids.".to_string(),
        ],
    };
    let manifest_file = manifest_path(&args.file_prefix);
    write_json_indented(&manifest_file, &manifest, args.indent)?;
    info!(path = %manifest_file.display(), "wrote run manifest");

    match outcome {
        Ok(RunOutcome::Completed) => {
            info!(
                verses = manifest.counts.verses,
                pages = manifest.counts.pages,
                chapters = manifest.counts.chapters,
                sections = manifest.counts.sections,
                "scrape completed"
            );
            Ok(())
        }
        Ok(RunOutcome::Interrupted) => {
            warn!(
                verses = manifest.counts.verses,
                "scrape interrupted, wrote partial datasets"
            );
            Ok(())
        }
        Err(err) => Err(err),
    }
}

/// Pulls observations until the stream ends, the cancellation flag is raised
/// or the source fails. The flag is only checked between observations; an
/// in-flight wait inside the source is bounded by its own timeout budget.
fn drive(
    source: &mut dyn ObservationSource,
    aggregator: &mut Aggregator,
    cancel: &AtomicBool,
    progress: &Progress,
) -> Result<RunOutcome> {
    loop {
        if cancel.load(Ordering::Relaxed) {
            return Ok(RunOutcome::Interrupted);
        }

        let observation = match source.next_observation()? {
            Some(observation) => observation,
            None => return Ok(RunOutcome::Completed),
        };

        let ingested = aggregator.ingest(observation)?;
        if let Some(page) = ingested.page_entered {
            progress.wrapped("Page", page, '=');
        }
        if let Some(chapter) = ingested.chapter_entered {
            progress.wrapped("Chapter", chapter, '-');
        }
        if let Some(section) = ingested.section_entered {
            progress.wrapped("Section", section, '*');
        }
        progress.verse(&ingested.verse_id);
    }
}

/// Realtime progress lines: banner-wrapped page/chapter/section markers and
/// one line per verse, emitted through tracing so they interleave with the
/// rest of the run log.
struct Progress {
    enabled: bool,
    width: usize,
}

impl Progress {
    fn new(enabled: bool, width: usize) -> Self {
        Self { enabled, width }
    }

    fn wrapped(&self, key: &str, value: u32, wrapper: char) {
        if !self.enabled {
            return;
        }
        let rule = wrapper.to_string().repeat(self.width);
        info!("{rule}");
        info!("{key}: {value}");
        info!("{rule}");
    }

    fn verse(&self, verse_id: &str) {
        if self.enabled {
            info!("Verse: {verse_id}");
        }
    }
}

fn render_scrape_command(args: &ScrapeArgs) -> String {
    let mut command = String::from("mushaf-scrape scrape");
    if args.headless {
        command.push_str(" --headless");
    }
    if args.log {
        command.push_str(" --log");
    }
    command.push_str(&format!(" --log-width {}", args.log_width));
    command.push_str(&format!(" --query-wait {}", args.query_wait));
    command.push_str(&format!(" --script-wait {}", args.script_wait));
    command.push_str(&format!(" --load-wait {}", args.load_wait));
    command.push_str(&format!(" --file-prefix {}", args.file_prefix));
    command.push_str(&format!(" --indent {}", args.indent));
    command
}
