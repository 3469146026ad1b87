use crate::plot::{self, Line, Scale, Text};
use crate::table::{read_de_table_path, DeRow};

use anyhow::Result;
use itertools::Itertools;
use serde::Serialize;

/// The direction in which a gene is differentially expressed.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Regulation {
    Up,
    Down,
    Neutral,
}

impl Regulation {
    pub fn color(&self) -> &'static str {
        match self {
            Regulation::Up => "red",
            Regulation::Down => "blue",
            Regulation::Neutral => "grey",
        }
    }
}

/// Which genes are given a text label on the plot.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum LabelRule {
    /// Every gene with `-log10(p) > min_neg_log10_p` and `|log2FC| > min_abs_fc`.
    /// These cutoffs are separate from the classification thresholds.
    Significant {
        min_neg_log10_p: f64,
        min_abs_fc: f64,
    },
    /// The `n` most upregulated, `n` most downregulated and `n` most significant genes.
    TopN(usize),
}

#[derive(Copy, Clone, Debug)]
pub struct VolcanoOpts {
    pub fc_threshold: f64,
    /// `-log10` of the p-value threshold
    pub sig_threshold: f64,
    pub labels: LabelRule,
}

impl VolcanoOpts {
    pub fn new(fc_threshold: f64, p_threshold: f64, labels: LabelRule) -> Self {
        VolcanoOpts {
            fc_threshold,
            sig_threshold: -p_threshold.log10(),
            labels,
        }
    }
}

pub fn classify(row: &DeRow, opts: &VolcanoOpts) -> Regulation {
    let significant = row.neg_log10_p >= opts.sig_threshold;
    if significant && row.log2_fold_change >= opts.fc_threshold {
        Regulation::Up
    } else if significant && row.log2_fold_change <= -opts.fc_threshold {
        Regulation::Down
    } else {
        Regulation::Neutral
    }
}

/// Returns the indices of the rows to label, without duplicates.
pub fn label_rows(rows: &[DeRow], classes: &[Regulation], rule: &LabelRule) -> Vec<usize> {
    match *rule {
        LabelRule::Significant {
            min_neg_log10_p,
            min_abs_fc,
        } => rows
            .iter()
            .positions(|r| {
                r.neg_log10_p > min_neg_log10_p && r.log2_fold_change.abs() > min_abs_fc
            })
            .collect(),
        LabelRule::TopN(n) => {
            let of_class = |wanted: &'static [Regulation]| {
                classes
                    .iter()
                    .positions(move |c| wanted.contains(c))
            };

            let up = of_class(&[Regulation::Up])
                .sorted_by(|&a, &b| {
                    rows[b].log2_fold_change.total_cmp(&rows[a].log2_fold_change)
                })
                .take(n);
            let down = of_class(&[Regulation::Down])
                .sorted_by(|&a, &b| {
                    rows[a].log2_fold_change.total_cmp(&rows[b].log2_fold_change)
                })
                .take(n);
            let significant = of_class(&[Regulation::Up, Regulation::Down])
                .sorted_by(|&a, &b| rows[a].pvalue.total_cmp(&rows[b].pvalue))
                .take(n);

            up.chain(down).chain(significant).unique().collect()
        }
    }
}

#[derive(Serialize, Debug)]
pub struct VolcanoSummary {
    pub input_path: String,
    pub output_path: String,
    pub fc_threshold: f64,
    pub sig_threshold: f64,
    pub genes: usize,
    pub upregulated: usize,
    pub downregulated: usize,
    /// rows whose -log10 p-value is infinite or undefined, and so are not drawn
    pub not_drawn: usize,
    pub labelled: Vec<String>,
}

#[derive(Serialize)]
struct Point {
    x: String,
    y: String,
    color: &'static str,
}

#[derive(Serialize)]
struct Tick {
    pos: String,
    label: String,
}

#[derive(Serialize)]
struct VolcanoData {
    width: u32,
    height: u32,
    frame: Frame,
    points: Vec<Point>,
    guides: Vec<Line>,
    x_ticks: Vec<Tick>,
    y_ticks: Vec<Tick>,
    x_label: Text,
    y_label: Text,
    up_count: Text,
    down_count: Text,
    labels: Vec<Text>,
}

#[derive(Serialize)]
struct Frame {
    x: String,
    y: String,
    width: String,
    height: String,
    bottom: String,
}

const WIDTH: u32 = 800;
const HEIGHT: u32 = 600;
const MARGIN_LEFT: f64 = 70.0;
const MARGIN_RIGHT: f64 = 20.0;
const MARGIN_TOP: f64 = 20.0;
const MARGIN_BOTTOM: f64 = 55.0;

/// Lays out the volcano plot and renders it as an SVG document.
///
/// Points with a non-finite coordinate are not drawn and do not contribute to the axis ranges.
pub fn render(
    rows: &[DeRow],
    classes: &[Regulation],
    labelled: &[usize],
    opts: &VolcanoOpts,
) -> Result<String> {
    let finite = |r: &&DeRow| r.log2_fold_change.is_finite() && r.neg_log10_p.is_finite();

    let xmax = rows
        .iter()
        .filter(finite)
        .map(|r| r.log2_fold_change.abs())
        .fold(0.0, f64::max);
    let xmax = if xmax > 0.0 { xmax } else { 1.0 };
    let ymax = rows
        .iter()
        .filter(finite)
        .map(|r| r.neg_log10_p)
        .fold(0.0, f64::max);

    let (left, right) = (MARGIN_LEFT, WIDTH as f64 - MARGIN_RIGHT);
    let (top, bottom) = (MARGIN_TOP, HEIGHT as f64 - MARGIN_BOTTOM);
    let xs = Scale::new(-xmax, xmax, left, right);
    let ys = Scale::new(0.0, ymax + 0.5, bottom, top);

    let points = rows
        .iter()
        .zip(classes)
        .filter(|(r, _)| finite(r))
        .map(|(r, c)| Point {
            x: plot::px(xs.map(r.log2_fold_change)),
            y: plot::px(ys.map(r.neg_log10_p)),
            color: c.color(),
        })
        .collect();

    // thresholds outside the data range would be drawn off the frame
    let mut guides = Vec::with_capacity(3);
    if ys.contains(opts.sig_threshold) {
        let y = ys.map(opts.sig_threshold);
        guides.push(Line::new(left, y, right, y));
    }
    for fc in [opts.fc_threshold, -opts.fc_threshold] {
        if xs.contains(fc) {
            guides.push(Line::new(xs.map(fc), top, xs.map(fc), bottom));
        }
    }

    let ticks = |s: &Scale| -> Vec<Tick> {
        s.ticks(4)
            .into_iter()
            .map(|v| Tick {
                pos: plot::px(s.map(v)),
                label: format!("{:.1}", v),
            })
            .collect()
    };

    let count = |class: Regulation| classes.iter().filter(|c| **c == class).count();

    let labels = labelled
        .iter()
        .map(|&i| &rows[i])
        .filter(finite)
        .map(|r| Text::new(xs.map(r.log2_fold_change), ys.map(r.neg_log10_p), &r.id))
        .collect();

    let data = VolcanoData {
        width: WIDTH,
        height: HEIGHT,
        frame: Frame {
            x: plot::px(left),
            y: plot::px(top),
            width: plot::px(right - left),
            height: plot::px(bottom - top),
            bottom: plot::px(bottom),
        },
        points,
        guides,
        x_ticks: ticks(&xs),
        y_ticks: ticks(&ys),
        x_label: Text::new((left + right) / 2.0, HEIGHT as f64 - 12.0, "Log2 Fold Change"),
        y_label: Text::new(18.0, (top + bottom) / 2.0, "-Log10 p-value"),
        up_count: Text::new(
            xs.map(xmax * 0.65),
            ys.map(ymax),
            format!("Upregulated: {}", count(Regulation::Up)),
        ),
        down_count: Text::new(
            xs.map(-xmax * 0.95),
            ys.map(ymax),
            format!("Downregulated: {}", count(Regulation::Down)),
        ),
        labels,
    };

    plot::render_svg(plot::VOLCANO_TEMPLATE, &data)
}

/// Derives the output path of a volcano plot by replacing a trailing `.csv` with `.svg`.
pub fn default_output_path(input: &str) -> String {
    format!("{}.svg", input.strip_suffix(".csv").unwrap_or(input))
}

/// Reads a differential expression table and writes its volcano plot to `output`.
///
/// The table is fully read and validated before the output file is created, so a table
/// with missing columns never leaves a plot behind.
pub fn volcano(input: &str, output: &str, opts: &VolcanoOpts) -> Result<VolcanoSummary> {
    info!("Reading differential expression table {input}");
    let rows = read_de_table_path(input)?;

    let classes: Vec<Regulation> = rows.iter().map(|r| classify(r, opts)).collect();
    let labelled = label_rows(&rows, &classes, &opts.labels);

    let not_drawn = rows
        .iter()
        .filter(|r| !(r.log2_fold_change.is_finite() && r.neg_log10_p.is_finite()))
        .count();
    if not_drawn > 0 {
        warn!(
            "{not_drawn} of {} genes have an undefined or infinite coordinate \
            (missing values, or a p-value <= 0) and are not drawn",
            rows.len()
        );
    }

    let upregulated = classes.iter().filter(|c| **c == Regulation::Up).count();
    let downregulated = classes.iter().filter(|c| **c == Regulation::Down).count();
    info!("Upregulated: {upregulated}, downregulated: {downregulated}");

    let svg = render(&rows, &classes, &labelled, opts)?;
    plot::write_svg(output, &svg)?;
    info!("Wrote volcano plot to {output}");

    Ok(VolcanoSummary {
        input_path: input.to_string(),
        output_path: output.to_string(),
        fc_threshold: opts.fc_threshold,
        sig_threshold: opts.sig_threshold,
        genes: rows.len(),
        upregulated,
        downregulated,
        not_drawn,
        labelled: labelled.iter().map(|&i| rows[i].id.clone()).collect(),
    })
}
