use anyhow::{Context, Result};
use serde::Serialize;

// encode the SVG templates at compile time as string literals
pub const VOLCANO_TEMPLATE: &str = include_str!("volcano.svg.hbs");
pub const VENN_TEMPLATE: &str = include_str!("venn.svg.hbs");

/// Maps values from a data range onto a pixel range.
#[derive(Copy, Clone, Debug)]
pub struct Scale {
    pub min: f64,
    pub max: f64,
    pub px_min: f64,
    pub px_max: f64,
}

impl Scale {
    pub fn new(min: f64, max: f64, px_min: f64, px_max: f64) -> Self {
        // a zero-width range would put everything at infinity
        let max = if max > min { max } else { min + 1.0 };
        Scale {
            min,
            max,
            px_min,
            px_max,
        }
    }

    pub fn map(&self, v: f64) -> f64 {
        self.px_min + (v - self.min) / (self.max - self.min) * (self.px_max - self.px_min)
    }

    /// Whether `v` lies within the data range, inclusive of both ends.
    pub fn contains(&self, v: f64) -> bool {
        self.min <= v && v <= self.max
    }

    /// `n + 1` evenly spaced values spanning the data range.
    pub fn ticks(&self, n: usize) -> Vec<f64> {
        let n = n.max(1);
        (0..=n)
            .map(|i| self.min + (self.max - self.min) * (i as f64) / (n as f64))
            .collect()
    }
}

/// A straight line in pixel coordinates.
#[derive(Serialize, Debug, Clone)]
pub struct Line {
    pub x1: String,
    pub y1: String,
    pub x2: String,
    pub y2: String,
}

impl Line {
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Line {
            x1: px(x1),
            y1: px(y1),
            x2: px(x2),
            y2: px(y2),
        }
    }
}

/// A piece of text placed in pixel coordinates.
#[derive(Serialize, Debug, Clone)]
pub struct Text {
    pub x: String,
    pub y: String,
    pub text: String,
}

impl Text {
    pub fn new(x: f64, y: f64, text: impl Into<String>) -> Self {
        Text {
            x: px(x),
            y: px(y),
            text: text.into(),
        }
    }
}

/// Formats a pixel coordinate for SVG output.
pub fn px(v: f64) -> String {
    format!("{:.2}", v)
}

/// Renders one of the SVG templates with the given data.
///
/// Text is escaped by handlebars, so identifiers containing `<` or `&` remain valid SVG.
pub fn render_svg<T: Serialize>(template: &str, data: &T) -> Result<String> {
    let reg = handlebars::Handlebars::new();
    reg.render_template(template, data)
        .context("Could not render SVG template")
}

/// Writes a rendered SVG document to `output`, replacing any existing file.
pub fn write_svg(output: &str, svg: &str) -> Result<()> {
    std::fs::write(output, svg).with_context(|| format!("Unable to write {output}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_maps_linearly() {
        let s = Scale::new(-2.0, 2.0, 100.0, 500.0);
        assert_eq!(s.map(-2.0), 100.0);
        assert_eq!(s.map(0.0), 300.0);
        assert_eq!(s.map(2.0), 500.0);

        // inverted pixel ranges are used for y axes
        let y = Scale::new(0.0, 10.0, 400.0, 0.0);
        assert_eq!(y.map(10.0), 0.0);
        assert_eq!(y.ticks(2), vec![0.0, 5.0, 10.0]);
        assert!(y.contains(0.0) && y.contains(10.0));
        assert!(!y.contains(10.5) && !y.contains(f64::NAN));
    }

    #[test]
    fn degenerate_ranges_are_widened() {
        let s = Scale::new(0.0, 0.0, 0.0, 100.0);
        assert!(s.map(0.5).is_finite());
    }

    #[test]
    fn rendering_escapes_text() {
        let svg = render_svg(
            "<text>{{text}}</text>",
            &Text::new(0.0, 0.0, "a<b&c"),
        )
        .unwrap();
        assert_eq!(svg, "<text>a&lt;b&amp;c</text>");
    }
}
