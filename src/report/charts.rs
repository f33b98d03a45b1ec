//! Inline SVG charts.
//!
//! Coordinates are written with one decimal so that identical data always
//! produces identical markup.

use super::generator::escape_html;
use crate::analysis::stats::{format_bound, HistogramBucket};
use crate::models::ScoreScale;

const WIDTH: f64 = 480.0;
const HEIGHT: f64 = 220.0;
const MARGIN_LEFT: f64 = 40.0;
const MARGIN_RIGHT: f64 = 12.0;
const MARGIN_TOP: f64 = 12.0;
const MARGIN_BOTTOM: f64 = 36.0;

/// Most axis labels drawn under a histogram.
const MAX_AXIS_LABELS: usize = 12;

fn plot_width() -> f64 {
    WIDTH - MARGIN_LEFT - MARGIN_RIGHT
}

fn plot_height() -> f64 {
    HEIGHT - MARGIN_TOP - MARGIN_BOTTOM
}

fn open_svg(class: &str, label: &str) -> String {
    format!(
        "<svg class=\"{}\" viewBox=\"0 0 {} {}\" role=\"img\" aria-label=\"{}\" xmlns=\"http://www.w3.org/2000/svg\">\n",
        class,
        WIDTH,
        HEIGHT,
        escape_html(label)
    )
}

/// Bar chart of histogram buckets. Empty input yields an empty string.
pub fn histogram_svg(buckets: &[HistogramBucket], label: &str) -> String {
    if buckets.is_empty() {
        return String::new();
    }

    let mut svg = open_svg("chart histogram", label);
    let max_count = buckets.iter().map(|b| b.count).max().unwrap_or(0).max(1);
    let slot = plot_width() / buckets.len() as f64;
    let bar = (slot * 0.85).max(1.0);
    let baseline = MARGIN_TOP + plot_height();
    let label_step = buckets.len().div_ceil(MAX_AXIS_LABELS);

    svg.push_str(&format!(
        "<line class=\"axis\" x1=\"{:.1}\" y1=\"{:.1}\" x2=\"{:.1}\" y2=\"{:.1}\"/>\n",
        MARGIN_LEFT,
        baseline,
        MARGIN_LEFT + plot_width(),
        baseline
    ));
    svg.push_str(&format!(
        "<text class=\"tick\" x=\"{:.1}\" y=\"{:.1}\" text-anchor=\"end\">{}</text>\n",
        MARGIN_LEFT - 6.0,
        MARGIN_TOP + 4.0,
        max_count
    ));

    for (i, bucket) in buckets.iter().enumerate() {
        let height = bucket.count as f64 / max_count as f64 * plot_height();
        let x = MARGIN_LEFT + slot * i as f64 + (slot - bar) / 2.0;
        svg.push_str(&format!(
            "<rect class=\"bar\" x=\"{:.1}\" y=\"{:.1}\" width=\"{:.1}\" height=\"{:.1}\"><title>{}: {}</title></rect>\n",
            x,
            baseline - height,
            bar,
            height,
            escape_html(&bucket.label),
            bucket.count
        ));
        if i % label_step == 0 {
            svg.push_str(&format!(
                "<text class=\"tick\" x=\"{:.1}\" y=\"{:.1}\" text-anchor=\"middle\">{}</text>\n",
                MARGIN_LEFT + slot * (i as f64 + 0.5),
                baseline + 16.0,
                escape_html(&bucket.label)
            ));
        }
    }

    svg.push_str("</svg>\n");
    svg
}

/// Scatter plot of `(reference, algorithm)` pairs on one scale, with the
/// line of perfect agreement. Empty input yields an empty string.
pub fn scatter_svg(points: &[(f64, f64)], scale: &ScoreScale, label: &str) -> String {
    if points.is_empty() {
        return String::new();
    }

    let side = plot_height();
    let span = if scale.span() > 0.0 { scale.span() } else { 1.0 };
    let x = |v: f64| MARGIN_LEFT + (v - scale.min) / span * side;
    let y = |v: f64| MARGIN_TOP + side - (v - scale.min) / span * side;

    let mut svg = open_svg("chart scatter", label);
    svg.push_str(&format!(
        "<rect class=\"frame\" x=\"{:.1}\" y=\"{:.1}\" width=\"{:.1}\" height=\"{:.1}\"/>\n",
        MARGIN_LEFT, MARGIN_TOP, side, side
    ));
    svg.push_str(&format!(
        "<line class=\"diagonal\" x1=\"{:.1}\" y1=\"{:.1}\" x2=\"{:.1}\" y2=\"{:.1}\"/>\n",
        x(scale.min),
        y(scale.min),
        x(scale.max),
        y(scale.max)
    ));

    for &(reference, score) in points {
        svg.push_str(&format!(
            "<circle class=\"point\" cx=\"{:.1}\" cy=\"{:.1}\" r=\"3\"><title>reference {} / algorithm {}</title></circle>\n",
            x(reference),
            y(score),
            format_bound(reference),
            format_bound(score)
        ));
    }

    let bottom = MARGIN_TOP + side;
    svg.push_str(&format!(
        "<text class=\"tick\" x=\"{:.1}\" y=\"{:.1}\" text-anchor=\"middle\">{}</text>\n",
        x(scale.min),
        bottom + 16.0,
        escape_html(&format_bound(scale.min))
    ));
    svg.push_str(&format!(
        "<text class=\"tick\" x=\"{:.1}\" y=\"{:.1}\" text-anchor=\"middle\">{}</text>\n",
        x(scale.max),
        bottom + 16.0,
        escape_html(&format_bound(scale.max))
    ));
    svg.push_str(&format!(
        "<text class=\"axis-label\" x=\"{:.1}\" y=\"{:.1}\" text-anchor=\"middle\">reference</text>\n",
        MARGIN_LEFT + side / 2.0,
        bottom + 30.0
    ));
    svg.push_str(&format!(
        "<text class=\"axis-label\" x=\"{:.1}\" y=\"{:.1}\">algorithm</text>\n",
        MARGIN_LEFT + side + 12.0,
        MARGIN_TOP + 12.0
    ));

    svg.push_str("</svg>\n");
    svg
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bucket(label: &str, count: usize) -> HistogramBucket {
        HistogramBucket {
            label: label.to_string(),
            lower: 0.0,
            upper: 0.0,
            count,
        }
    }

    #[test]
    fn test_histogram_svg_bars() {
        let svg = histogram_svg(&[bucket("0", 1), bucket("1", 4), bucket("<2>", 0)], "g");
        assert!(svg.starts_with("<svg"));
        assert_eq!(svg.matches("<rect class=\"bar\"").count(), 3);
        assert!(svg.contains("<title>1: 4</title>"));
        assert!(svg.contains("&lt;2&gt;"));
        assert!(!svg.contains("<2>"));
    }

    #[test]
    fn test_histogram_svg_all_zero() {
        let svg = histogram_svg(&[bucket("0", 0), bucket("1", 0)], "g");
        assert!(svg.contains("height=\"0.0\""));
        assert!(!svg.contains("NaN"));
    }

    #[test]
    fn test_empty_charts() {
        assert_eq!(histogram_svg(&[], "g"), "");
        assert_eq!(scatter_svg(&[], &ScoreScale::numeric(0.0, 1.0), "g"), "");
    }

    #[test]
    fn test_scatter_svg_points() {
        let scale = ScoreScale::numeric(0.0, 10.0);
        let svg = scatter_svg(&[(0.0, 0.0), (10.0, 5.0)], &scale, "g");
        assert_eq!(svg.matches("<circle").count(), 2);
        assert!(svg.contains("reference 10 / algorithm 5"));
        assert!(svg.contains("class=\"diagonal\""));
    }

    #[test]
    fn test_charts_are_deterministic() {
        let scale = ScoreScale::numeric(0.0, 1.0);
        let points = [(0.3, 0.7), (0.1, 0.2)];
        assert_eq!(
            scatter_svg(&points, &scale, "g"),
            scatter_svg(&points, &scale, "g")
        );
    }
}
