//! Table rendering and the JSON files each drill-down stage leaves behind.

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;
use serde_json::ser::PrettyFormatter;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tabled::settings::{Alignment, Style};
use tabled::{Table, Tabled};
use tracing::info;

pub const DATASOURCES_FILE: &str = "getDeviceDataSources.json";
pub const INSTANCES_FILE: &str = "output_getDatasourceInstances.json";

const RULE: &str = "======================================";

/// Grid table with a header row; an empty slice renders the header alone.
pub fn render_grid<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::ascii()).to_string()
}

/// Same frame as [`render_grid`], cells centred.
pub fn render_pretty<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows)
        .with(Style::ascii())
        .with(Alignment::center())
        .to_string()
}

pub fn banner(title: &str, company: &str, url: &str) -> String {
    format!("{RULE}\n{title}\n{RULE}\nCompany: {company}\nURL: {url}\n{RULE}")
}

/// Write `items` exactly as received, pretty-printed with four-space
/// indentation. Any existing file is replaced and `dir` is created when
/// missing.
pub fn write_items(dir: &Path, file_name: &str, items: &[Value]) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("creating {:?}", dir))?;
    let path = dir.join(file_name);
    let file = File::create(&path).with_context(|| format!("creating {:?}", path))?;
    let mut writer = BufWriter::new(file);

    let mut serializer =
        serde_json::Serializer::with_formatter(&mut writer, PrettyFormatter::with_indent(b"    "));
    items
        .serialize(&mut serializer)
        .with_context(|| format!("serializing {:?}", path))?;
    writer
        .flush()
        .with_context(|| format!("writing {:?}", path))?;

    info!(path = %path.display(), count = items.len(), "saved raw items");
    Ok(path)
}
