use clap::builder::styling::AnsiColor;
use clap::builder::Styles;
use clap::{Parser, Subcommand};
use thiserror::Error;

use crate::preset::VolcanoPreset;
use crate::venn::Direction;

const fn extra_build_info() -> &'static str {
    match option_env!("CARGO_BUILD_DESC") {
        Some(e) => e,
        None => env!("CARGO_PKG_VERSION"),
    }
}
pub const VERSION: &str = extra_build_info();
const INFO_STRING: &str = "
🌋 deseqkit version ";
const AFTER_STRING: &str = "
   ──────────────────────────────────
   read cleaning, volcano plots and gene set overlaps
   for differential expression workflows";

// colouring of the help
const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Yellow.on_default().bold())
    .usage(AnsiColor::BrightMagenta.on_default().bold())
    .literal(AnsiColor::BrightMagenta.on_default())
    .placeholder(AnsiColor::White.on_default());

#[derive(Parser)]
#[command(
    version = VERSION,
    about = format!("{}{}{}", INFO_STRING, VERSION, AFTER_STRING),
    arg_required_else_help = true,
    flatten_help = true,
    styles = STYLES
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Remove malformed and low quality reads from .fastq(.gz) files
    #[command(arg_required_else_help = true)]
    Clean {
        /// the input .fastq or .fastq.gz files
        #[arg(required_unless_present = "sample", conflicts_with = "sample")]
        inputs: Vec<String>,

        /// sample name, expanding to the pair of files
        ///   <SAMPLE>_R1.fastq.gz
        ///   <SAMPLE>_R2.fastq.gz
        #[arg(long, verbatim_doc_comment)]
        sample: Option<String>,

        /// the output file. only valid for a single input; otherwise each output is named
        /// after its input, e.g. `x_R1.fastq.gz` is written to `x_R1-clean.fastq.gz`
        #[arg(short, long)]
        output: Option<String>,

        /// reads with a sequence shorter than this are removed
        #[arg(long, default_value_t = 20)]
        min_len: usize,

        /// the characters a sequence may contain
        #[arg(long, default_value = "ACGTN")]
        alphabet: String,

        /// reads with a sequence containing this token are removed
        #[arg(long, default_value = "===")]
        reserved: String,

        /// write a .json report of the cleaning statistics
        #[arg(long)]
        report: Option<String>,
    },

    /// Render a volcano plot from a differential expression .csv
    #[command(arg_required_else_help = true)]
    Volcano {
        /// the input .csv, which must contain the columns
        /// `log2FoldChange`, `pvalue` and `baseMean`, with
        /// gene identifiers in the first column
        #[arg(verbatim_doc_comment)]
        input: String,

        #[arg(long, value_enum, default_value = "standard")]
        preset: VolcanoPreset,

        /// the absolute log2 fold change a gene must reach to be called up- or
        /// downregulated. this will override the preset given.
        #[arg(long)]
        fc_threshold: Option<f64>,

        /// the p-value a gene must be at or below to be called significant
        #[arg(long, default_value_t = 0.05)]
        p_threshold: f64,

        /// the number of genes to label for each criterion (`top-n` preset only).
        /// this will override the preset given.
        #[arg(long)]
        top_n: Option<usize>,

        /// genes above this -log10 p-value are labelled (`standard` preset only)
        #[arg(long, default_value_t = 1.3)]
        label_min_neg_log10_p: f64,

        /// genes above this absolute log2 fold change are labelled (`standard` preset only)
        #[arg(long, default_value_t = 0.5)]
        label_min_abs_fc: f64,

        /// the output .svg. defaults to the input path with `.csv` replaced by `.svg`
        #[arg(short, long)]
        output: Option<String>,

        /// write a .json summary of the classification
        #[arg(long)]
        summary: Option<String>,
    },

    /// Intersect the gene sets of two headerless differential expression tables
    #[command(arg_required_else_help = true)]
    Venn {
        /// the first .csv, which produces set A
        table_a: String,

        /// the second .csv, which produces set B
        table_b: String,

        /// 0-indexed column holding the gene identifier
        #[arg(long, default_value_t = 0)]
        id_col: usize,

        /// 0-indexed column holding the log2 fold change
        #[arg(long, default_value_t = 2)]
        fc_col: usize,

        /// 0-indexed column holding the p-value
        #[arg(long, default_value_t = 5)]
        p_col: usize,

        /// rows of the first table considered after sorting by fold change, then p-value.
        /// one of `all`, `head:N` or `tail:N`
        #[arg(
            long,
            value_parser = |x: &str| ArgWindow::try_from(x),
            default_value = "head:1000",
            verbatim_doc_comment
        )]
        window_a: ArgWindow,

        /// rows of the second table considered after sorting. see `--window-a`
        #[arg(
            long,
            value_parser = |x: &str| ArgWindow::try_from(x),
            default_value = "all"
        )]
        window_b: ArgWindow,

        /// which genes of the first table's window make up set A
        #[arg(long, value_enum, default_value = "down")]
        direction_a: Direction,

        /// which genes of the second table's window make up set B
        #[arg(long, value_enum, default_value = "up")]
        direction_b: Direction,

        #[arg(long, default_value = "CR vs AL downregulated")]
        label_a: String,

        #[arg(long, default_value = "LiPTEN vs WT upregulated")]
        label_b: String,

        /// the output .svg
        #[arg(short, long, default_value = "venn_diagram.svg")]
        output: String,
    },
}

/// A slice of a sorted table: every row, the first `N` rows or the last `N` rows.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ArgWindow {
    All,
    Head(usize),
    Tail(usize),
}

/// Error type for parsing a window string.
#[derive(Error, Debug)]
#[error("Invalid window format: {0}")]
pub struct ParseWindowErr(String);

impl<'a> TryFrom<&'a str> for ArgWindow {
    type Error = ParseWindowErr;

    fn try_from(arg: &'a str) -> Result<ArgWindow, Self::Error> {
        let arg_lc = arg.trim().to_lowercase();
        if arg_lc == "all" {
            return Ok(ArgWindow::All);
        }

        let Some((kind, size)) = arg_lc.split_once(':') else {
            return Err(ParseWindowErr(indoc::formatdoc! {"
            Expected format 'all', 'head:<N>' or 'tail:<N>', got '{arg}', as in:
              --window-a all
              --window-a head:1000
              --window-b tail:500
            "}));
        };

        let size = size.trim().parse::<usize>().map_err(|_| {
            ParseWindowErr(format!(
                "Invalid window size: '{}' (should be a non-negative integer)",
                size.trim()
            ))
        })?;

        match kind.trim() {
            "head" => Ok(ArgWindow::Head(size)),
            "tail" => Ok(ArgWindow::Tail(size)),
            other => Err(ParseWindowErr(format!(
                "Unknown window kind: '{other}' (should be `head` or `tail`)"
            ))),
        }
    }
}

impl ArgWindow {
    /// The rows of `rows` which fall inside this window. Windows larger than the
    /// table select the whole table.
    pub fn select<'a, T>(&self, rows: &'a [T]) -> &'a [T] {
        match *self {
            ArgWindow::All => rows,
            ArgWindow::Head(n) => &rows[..n.min(rows.len())],
            ArgWindow::Tail(n) => &rows[rows.len().saturating_sub(n)..],
        }
    }

    /// The number of rows this window expects, if bounded.
    pub fn size(&self) -> Option<usize> {
        match *self {
            ArgWindow::All => None,
            ArgWindow::Head(n) | ArgWindow::Tail(n) => Some(n),
        }
    }
}

impl std::fmt::Display for ArgWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArgWindow::All => f.write_str("all"),
            ArgWindow::Head(n) => write!(f, "head:{n}"),
            ArgWindow::Tail(n) => write!(f, "tail:{n}"),
        }
    }
}
