use crate::file::CleanReport;
use crate::io::{open_fastq, write_record, FastqReader, FastqRecord, FastqWriter};

use std::collections::BTreeSet;
use std::fmt;
use std::io::prelude::*;

use anyhow::{bail, Context, Result};
use itertools::Itertools;
use serde::Serialize;

pub struct CleanOpts {
    pub min_len: usize,
    pub alphabet: String,
    pub reserved: String,
}

impl Default for CleanOpts {
    fn default() -> Self {
        CleanOpts {
            min_len: 20,
            alphabet: String::from("ACGTN"),
            reserved: String::from("==="),
        }
    }
}

/// The reason a read was removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// The sequence contains the reserved delimiter token
    ReservedToken,
    /// The sequence is shorter than the minimum length
    TooShort { len: usize, min: usize },
    /// The sequence contains characters outside of the alphabet
    InvalidChars(BTreeSet<char>),
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::ReservedToken => f.write_str("reserved token"),
            Rejection::TooShort { len, min } => write!(f, "length {len} < {min}"),
            Rejection::InvalidChars(chars) => {
                write!(f, "invalid characters {{{}}}", chars.iter().join(", "))
            }
        }
    }
}

/// Checks a read against the cleaning options, in order: reserved token, length, alphabet.
/// Only the first failed check is reported.
pub fn check(record: &FastqRecord, opts: &CleanOpts) -> Option<Rejection> {
    let seq = &record.seq;

    if !opts.reserved.is_empty() && seq.contains(opts.reserved.as_str()) {
        return Some(Rejection::ReservedToken);
    }

    let len = seq.chars().count();
    if len < opts.min_len {
        return Some(Rejection::TooShort {
            len,
            min: opts.min_len,
        });
    }

    let invalid: BTreeSet<char> = seq.chars().filter(|c| !opts.alphabet.contains(*c)).collect();
    if !invalid.is_empty() {
        return Some(Rejection::InvalidChars(invalid));
    }

    None
}

#[derive(Serialize, Debug, Default, Clone, PartialEq, Eq)]
pub struct CleanStats {
    pub total_reads: usize,
    pub kept_reads: usize,
    pub removed_reads: usize,
    pub reserved_token: usize,
    pub too_short: usize,
    pub invalid_chars: usize,
}

impl CleanStats {
    fn add(&mut self, rejection: Option<&Rejection>) {
        self.total_reads += 1;
        match rejection {
            None => self.kept_reads += 1,
            Some(r) => {
                self.removed_reads += 1;
                match r {
                    Rejection::ReservedToken => self.reserved_token += 1,
                    Rejection::TooShort { .. } => self.too_short += 1,
                    Rejection::InvalidChars(_) => self.invalid_chars += 1,
                }
            }
        }
    }

    pub fn display_header() -> &'static str {
        "file\ttotal\tkept\tremoved\treserved_token\ttoo_short\tinvalid_chars"
    }
}

impl fmt::Display for CleanStats {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}\t{}\t{}",
            self.total_reads,
            self.kept_reads,
            self.removed_reads,
            self.reserved_token,
            self.too_short,
            self.invalid_chars
        )
    }
}

/// Copies every valid read from `reader` to `writer`, in order, and counts the rest.
///
/// Each removed read is logged as a warning along with the reason for its removal.
pub fn clean<R: BufRead>(
    reader: FastqReader<R>,
    writer: &mut impl Write,
    opts: &CleanOpts,
) -> Result<CleanStats> {
    let mut stats = CleanStats::default();

    for record in reader {
        let record = record?;

        let rejection = check(&record, opts);
        stats.add(rejection.as_ref());

        if stats.total_reads % 50000 == 0 {
            info!("Processed: {}", stats.total_reads)
        }

        match rejection {
            None => write_record(writer, &record)?,
            Some(Rejection::InvalidChars(chars)) => warn!(
                "Removing read with invalid characters: {} (Invalid: {{{}}})",
                record.id,
                chars.iter().join(", ")
            ),
            Some(r) => warn!(
                "Removing problematic read ({r}): {}\n{}",
                record.id, record.seq
            ),
        }
    }

    Ok(stats)
}

/// Returns true if both paths exist and resolve to the same file.
fn same_file(a: &str, b: &str) -> bool {
    match (std::fs::canonicalize(a), std::fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Cleans a single file, writing valid reads to `output`.
///
/// # Errors
///
/// Fails without touching either file if `output` is the same file as `input`.
pub fn clean_file(input: &str, output: &str, opts: &CleanOpts) -> Result<CleanReport> {
    let now = std::time::Instant::now();
    info!("Cleaning {input} into {output}");

    if same_file(input, output) {
        bail!("Output {output} is the same file as input {input}");
    }

    let reader = open_fastq(input)?;
    let mut writer = FastqWriter::create(output)?;

    let stats = clean(reader, &mut writer, opts)
        .with_context(|| format!("Failed while cleaning {input}"))?;
    writer
        .finish()
        .with_context(|| format!("Unable to finish writing {output}"))?;

    info!("Total reads processed: {}", stats.total_reads);
    info!("Total problematic reads removed: {}", stats.removed_reads);

    Ok(CleanReport::new(input, output, now.elapsed().as_secs_f64(), stats))
}

/// Derives the output path of a cleaned file, by inserting `-clean` before the FASTQ extension.
pub fn clean_output_path(input: &str) -> String {
    const SUFFIXES: [&str; 4] = [".fastq.gz", ".fq.gz", ".fastq", ".fq"];

    for suffix in SUFFIXES {
        if let Some(stem) = input.strip_suffix(suffix) {
            return format!("{stem}-clean{suffix}");
        }
    }
    format!("{input}-clean")
}

/// Expands a sample name into its pair of read files.
pub fn sample_inputs(sample: &str) -> Vec<String> {
    vec![
        format!("{sample}_R1.fastq.gz"),
        format!("{sample}_R2.fastq.gz"),
    ]
}
