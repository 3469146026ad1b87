use crate::cli::ArgWindow;
use crate::plot::{self, Text};
use crate::table::{read_ranked_table_path, ColumnLayout, RankedRow};

use std::cmp::Ordering;
use std::f64::consts::PI;

use anyhow::Result;
use indexmap::IndexSet;
use itertools::Itertools;
use serde::Serialize;

/// An ordered set of gene identifiers.
pub type GeneSet = IndexSet<String>;

/// Which side of zero a gene's fold change must fall on to be kept.
#[derive(clap::ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
pub enum Direction {
    /// log2 fold change < 0
    Down,
    /// log2 fold change > 0
    Up,
}

impl Direction {
    /// Missing fold changes never match.
    pub fn matches(&self, fc: Option<f64>) -> bool {
        match (self, fc) {
            (Direction::Down, Some(v)) => v < 0.0,
            (Direction::Up, Some(v)) => v > 0.0,
            (_, None) => false,
        }
    }
}

/// How one of the two gene sets is taken from its table.
#[derive(Copy, Clone, Debug)]
pub struct SetSelection {
    pub window: ArgWindow,
    pub direction: Direction,
}

fn cmp_missing_last(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Sorts rows by ascending fold change, then ascending p-value. Missing values sort last, and
/// rows which compare equal keep their original order.
pub fn sort_ranked(rows: &mut [RankedRow]) {
    rows.sort_by(|a, b| {
        cmp_missing_last(a.fc, b.fc).then_with(|| cmp_missing_last(a.pvalue, b.pvalue))
    });
}

/// Collects the identifiers of the rows inside the window whose fold change matches the
/// direction. `rows` must already be sorted.
pub fn gene_set(rows: &[RankedRow], selection: &SetSelection) -> GeneSet {
    selection
        .window
        .select(rows)
        .iter()
        .filter(|r| selection.direction.matches(r.fc))
        .map(|r| r.id.clone())
        .collect()
}

/// The identifiers present in both sets, in the order they appear in `a`.
pub fn intersection(a: &GeneSet, b: &GeneSet) -> Vec<String> {
    a.iter().filter(|g| b.contains(*g)).cloned().collect()
}

/// Area of the lens formed by two circles of radii `r1` and `r2` with centres `d` apart.
pub fn lens_area(r1: f64, r2: f64, d: f64) -> f64 {
    if d >= r1 + r2 {
        return 0.0;
    }
    if d <= (r1 - r2).abs() {
        return PI * r1.min(r2).powi(2);
    }

    let a1 = ((d * d + r1 * r1 - r2 * r2) / (2.0 * d * r1)).clamp(-1.0, 1.0).acos();
    let a2 = ((d * d + r2 * r2 - r1 * r1) / (2.0 * d * r2)).clamp(-1.0, 1.0).acos();
    let k = (-d + r1 + r2) * (d + r1 - r2) * (d - r1 + r2) * (d + r1 + r2);

    r1 * r1 * a1 + r2 * r2 * a2 - 0.5 * k.max(0.0).sqrt()
}

/// Circle radii and centre distance of an area-proportional two-set Venn diagram, in units
/// where a circle of area `n` holds `n` genes.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct VennLayout {
    pub r_a: f64,
    pub r_b: f64,
    pub d: f64,
}

impl VennLayout {
    /// Solves for the centre distance by bisection, as the lens area shrinks monotonically
    /// as the circles move apart.
    pub fn solve(size_a: usize, size_b: usize, shared: usize) -> Self {
        let r_a = (size_a as f64 / PI).sqrt();
        let r_b = (size_b as f64 / PI).sqrt();
        let target = shared as f64;

        let (mut lo, mut hi) = ((r_a - r_b).abs(), r_a + r_b);
        if shared == 0 {
            return VennLayout { r_a, r_b, d: hi };
        }
        if shared >= size_a.min(size_b) {
            return VennLayout { r_a, r_b, d: lo };
        }

        for _ in 0..100 {
            let mid = (lo + hi) / 2.0;
            if lens_area(r_a, r_b, mid) > target {
                lo = mid;
            } else {
                hi = mid;
            }
        }

        VennLayout {
            r_a,
            r_b,
            d: (lo + hi) / 2.0,
        }
    }
}

#[derive(Serialize)]
struct Circle {
    cx: String,
    cy: String,
    r: String,
}

#[derive(Serialize)]
struct VennData {
    width: u32,
    height: u32,
    circle_a: Circle,
    circle_b: Circle,
    set_labels: Vec<Text>,
    subset_labels: Vec<Text>,
}

const WIDTH: u32 = 400;
const HEIGHT: u32 = 300;
const MARGIN: f64 = 30.0;

/// Renders the Venn diagram of two sets as an SVG document.
pub fn render(
    a: &GeneSet,
    b: &GeneSet,
    shared: usize,
    label_a: &str,
    label_b: &str,
) -> Result<String> {
    let layout = VennLayout::solve(a.len(), b.len(), shared);
    let VennLayout { r_a, r_b, d } = layout;

    // circle A is centred on 0, circle B on d
    let left = (-r_a).min(d - r_b);
    let right = r_a.max(d + r_b);
    let extent = (right - left).max(2.0 * r_a.max(r_b));

    let avail_w = WIDTH as f64 - 2.0 * MARGIN;
    let avail_h = HEIGHT as f64 - 3.0 * MARGIN;
    let scale = if extent > 0.0 {
        (avail_w / extent).min(avail_h / (2.0 * r_a.max(r_b)))
    } else {
        1.0
    };

    let mid_x = WIDTH as f64 / 2.0;
    let cy = MARGIN + avail_h / 2.0;
    let x = |v: f64| mid_x + (v - (left + right) / 2.0) * scale;

    let only_a = a.len() - shared;
    let only_b = b.len() - shared;

    let mut subset_labels = Vec::new();
    let regions = [
        (only_a, (-r_a + (d - r_b).max(-r_a)) / 2.0),
        (only_b, (r_a.min(d + r_b) + d + r_b) / 2.0),
        (shared, ((d - r_b).max(-r_a) + r_a.min(d + r_b)) / 2.0),
    ];
    for (count, centre) in regions {
        if count > 0 {
            subset_labels.push(Text::new(x(centre), cy, count.to_string()));
        }
    }

    let label_y = cy + r_a.max(r_b) * scale + 14.0;
    let data = VennData {
        width: WIDTH,
        height: HEIGHT,
        circle_a: Circle {
            cx: plot::px(x(0.0)),
            cy: plot::px(cy),
            r: plot::px(r_a * scale),
        },
        circle_b: Circle {
            cx: plot::px(x(d)),
            cy: plot::px(cy),
            r: plot::px(r_b * scale),
        },
        set_labels: vec![
            Text::new(x(0.0), label_y, label_a),
            Text::new(x(d), label_y, label_b),
        ],
        subset_labels,
    };

    plot::render_svg(plot::VENN_TEMPLATE, &data)
}

/// Reads, validates and sorts one table, logging any cells which were not numeric.
fn load_sorted(path: &str, layout: &ColumnLayout, window: &ArgWindow) -> Result<Vec<RankedRow>> {
    info!("Reading table {path}");
    let (mut rows, report) = read_ranked_table_path(path, layout)?;

    if report.fc > 0 || report.pvalue > 0 {
        warn!(
            "{path}: {} fold change and {} p-value cells of {} rows are not numeric and were \
            treated as missing",
            report.fc, report.pvalue, report.rows
        );
        debug!(
            "{path}: rows with missing values: {}",
            report.coerced_rows.iter().join(", ")
        );
    }

    if let Some(size) = window.size() {
        if rows.len() < size {
            warn!(
                "{path} has {} rows, fewer than the window {window}; the whole table is used",
                rows.len()
            );
        }
    }

    sort_ranked(&mut rows);
    Ok(rows)
}

pub struct VennOpts {
    pub layout: ColumnLayout,
    pub set_a: SetSelection,
    pub set_b: SetSelection,
    pub label_a: String,
    pub label_b: String,
}

/// Builds both gene sets, writes their Venn diagram to `output` and returns the genes common
/// to both.
pub fn venn(table_a: &str, table_b: &str, output: &str, opts: &VennOpts) -> Result<Vec<String>> {
    let rows_a = load_sorted(table_a, &opts.layout, &opts.set_a.window)?;
    let rows_b = load_sorted(table_b, &opts.layout, &opts.set_b.window)?;

    let a = gene_set(&rows_a, &opts.set_a);
    let b = gene_set(&rows_b, &opts.set_b);
    let shared = intersection(&a, &b);

    info!(
        "Set A: {} genes, set B: {} genes, {} in common",
        a.len(),
        b.len(),
        shared.len()
    );

    let svg = render(&a, &b, shared.len(), &opts.label_a, &opts.label_b)?;
    plot::write_svg(output, &svg)?;
    info!("Wrote Venn diagram to {output}");

    Ok(shared)
}
