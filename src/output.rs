use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::model::ScrapeDatasets;
use crate::util::ensure_directory;

/// Collection names in the order the datasets are written.
pub const DATASET_NAMES: [&str; 6] = [
    "languages",
    "verses",
    "pages",
    "chapters",
    "sections",
    "explanations",
];

pub fn dataset_path(file_prefix: &str, name: &str) -> PathBuf {
    PathBuf::from(format!("{file_prefix}{name}.json"))
}

pub fn manifest_path(file_prefix: &str) -> PathBuf {
    PathBuf::from(format!("{file_prefix}manifest.json"))
}

/// Serializes with the configured indent width. Width 0 still renders one
/// entry per line, it just drops the leading spaces.
pub fn write_json_indented<T: Serialize>(path: &Path, value: &T, indent: usize) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            ensure_directory(parent)?;
        }
    }

    let indent_unit = vec![b' '; indent];
    let mut data = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(&indent_unit);
    let mut serializer = serde_json::Serializer::with_formatter(&mut data, formatter);
    value
        .serialize(&mut serializer)
        .with_context(|| format!("failed to serialize json: {}", path.display()))?;
    data.push(b'\n');

    let mut file = File::create(path)
        .with_context(|| format!("failed to create json file: {}", path.display()))?;
    file.write_all(&data)
        .with_context(|| format!("failed to write json file: {}", path.display()))?;

    Ok(())
}

/// Writes the six collection documents, returning the paths in write order.
pub fn write_datasets(
    file_prefix: &str,
    datasets: &ScrapeDatasets,
    indent: usize,
) -> Result<Vec<PathBuf>> {
    let mut written = Vec::with_capacity(DATASET_NAMES.len());
    write_collection(file_prefix, "languages", &datasets.languages, indent, &mut written)?;
    write_collection(file_prefix, "verses", &datasets.verses, indent, &mut written)?;
    write_collection(file_prefix, "pages", &datasets.pages, indent, &mut written)?;
    write_collection(file_prefix, "chapters", &datasets.chapters, indent, &mut written)?;
    write_collection(file_prefix, "sections", &datasets.sections, indent, &mut written)?;
    write_collection(
        file_prefix,
        "explanations",
        &datasets.explanations,
        indent,
        &mut written,
    )?;
    Ok(written)
}

fn write_collection<T: Serialize>(
    file_prefix: &str,
    name: &str,
    value: &T,
    indent: usize,
    written: &mut Vec<PathBuf>,
) -> Result<()> {
    let path = dataset_path(file_prefix, name);
    write_json_indented(&path, value, indent)?;
    written.push(path);
    Ok(())
}

pub fn load_collection<T: DeserializeOwned>(file_prefix: &str, name: &str) -> Result<T> {
    let path = dataset_path(file_prefix, name);
    let raw = fs::read(&path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_slice(&raw).with_context(|| format!("failed to parse {}", path.display()))
}
