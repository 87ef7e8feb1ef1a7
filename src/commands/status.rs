use std::fs;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::cli::StatusArgs;
use crate::model::ScrapeRunManifest;
use crate::output::{DATASET_NAMES, dataset_path, manifest_path};

pub fn run(args: StatusArgs) -> Result<()> {
    let manifest_file = manifest_path(&args.file_prefix);

    info!(file_prefix = %args.file_prefix, "status requested");

    if manifest_file.exists() {
        let raw = fs::read(&manifest_file)
            .with_context(|| format!("failed to read {}", manifest_file.display()))?;
        let manifest: ScrapeRunManifest = serde_json::from_slice(&raw)
            .with_context(|| format!("failed to parse {}", manifest_file.display()))?;

        info!(
            run_id = %manifest.run_id,
            status = %manifest.status,
            started_at = %manifest.started_at,
            updated_at = %manifest.updated_at,
            verses = manifest.counts.verses,
            pages = manifest.counts.pages,
            chapters = manifest.counts.chapters,
            sections = manifest.counts.sections,
            explanations = manifest.counts.explanations,
            failure_reason = %manifest.failure_reason.unwrap_or_default(),
            "loaded run manifest"
        );
    } else {
        warn!(path = %manifest_file.display(), "run manifest missing");
    }

    for name in DATASET_NAMES {
        let path = dataset_path(&args.file_prefix, name);
        if !path.exists() {
            warn!(path = %path.display(), "dataset missing");
            continue;
        }

        let raw =
            fs::read(&path).with_context(|| format!("failed to read {}", path.display()))?;
        let value: serde_json::Value = serde_json::from_slice(&raw)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        let records = value.as_object().map(|map| map.len()).unwrap_or(0);

        info!(dataset = name, records, "dataset present");
    }

    Ok(())
}
