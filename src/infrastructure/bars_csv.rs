//! Historical bars from CSV files, for offline predictions.

use crate::domain::market::series::HistoricalBar;
use anyhow::{Context, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Read every row of a headered CSV as a bar; columns keep their header
/// names and string values, so `close`/`c` resolve as they do over HTTP.
pub fn load_bars(path: &Path) -> Result<Vec<HistoricalBar>> {
    let file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    read_bars(BufReader::new(file)).with_context(|| format!("Failed to parse {:?}", path))
}

pub fn read_bars<R: Read>(reader: R) -> Result<Vec<HistoricalBar>> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

    let mut bars = Vec::new();
    for result in rdr.deserialize() {
        let row: HashMap<String, String> = result?;
        let bar: HistoricalBar = row
            .into_iter()
            .map(|(column, value)| (column.to_ascii_lowercase(), Value::String(value)))
            .collect();
        bars.push(bar);
    }
    Ok(bars)
}
