use crate::clean::CleanStats;
use anyhow::{Context, Result};
use serde::Serialize;
use std::io::Write;

/// Information about one cleaned file, written out by `clean --report`.
#[derive(Serialize, Debug)]
pub struct CleanReport {
    pub deseqkit_version: String,
    pub input_path: String,
    pub output_path: String,
    pub clean_date: String,
    pub elapsed: f64,
    #[serde(flatten)]
    pub stats: CleanStats,
}

impl CleanReport {
    pub fn new(input: &str, output: &str, elapsed: f64, stats: CleanStats) -> Self {
        CleanReport {
            deseqkit_version: crate::cli::VERSION.to_string(),
            input_path: input.to_string(),
            output_path: output.to_string(),
            clean_date: format!("{:?}", chrono::offset::Local::now()),
            elapsed,
            stats,
        }
    }
}

/// Writes any serialisable value as pretty-printed JSON to `path`.
pub fn write_json<T: Serialize>(path: &str, value: &T) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("Unable to create file {path}"))?;
    let mut writer = std::io::BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value)
        .with_context(|| format!("Could not serialize into {path}"))?;
    writer.flush()?;
    Ok(())
}
