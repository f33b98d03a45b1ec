//! Numeric helpers for score statistics.
//!
//! Every function returns `None` instead of dividing by zero.

use crate::models::ScoreScale;
use serde::{Deserialize, Serialize};

/// Discrete scores over at most this many points get one histogram bucket per point.
const MAX_POINT_BUCKETS: usize = 21;

/// One histogram bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramBucket {
    pub label: String,
    /// Inclusive lower bound.
    pub lower: f64,
    /// Upper bound; exclusive except for the last bucket.
    pub upper: f64,
    pub count: usize,
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Population standard deviation.
pub fn std_dev(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    Some(variance.sqrt())
}

/// Pearson correlation; `None` for fewer than two pairs or zero variance.
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }
    let mx = mean(xs)?;
    let my = mean(ys)?;

    let mut cov = 0.0;
    let mut vx = 0.0;
    let mut vy = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        cov += (x - mx) * (y - my);
        vx += (x - mx).powi(2);
        vy += (y - my).powi(2);
    }

    if vx == 0.0 || vy == 0.0 {
        return None;
    }
    Some((cov / (vx.sqrt() * vy.sqrt())).clamp(-1.0, 1.0))
}

/// 1-based ranks, ties sharing their average rank.
pub fn ranks(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut out = vec![0.0; values.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && values[order[j + 1]] == values[order[i]] {
            j += 1;
        }
        let rank = (i + j) as f64 / 2.0 + 1.0;
        for &index in &order[i..=j] {
            out[index] = rank;
        }
        i = j + 1;
    }
    out
}

/// Spearman rank correlation.
pub fn spearman(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() {
        return None;
    }
    pearson(&ranks(xs), &ranks(ys))
}

/// Quadratic weighted kappa over the discrete points of `scale`.
///
/// `None` unless both score lists are discrete on `scale` (see
/// [`ScoreScale::discrete_points`]), and for empty input or when every
/// score falls on one point.
pub fn quadratic_weighted_kappa(xs: &[f64], ys: &[f64], scale: &ScoreScale) -> Option<f64> {
    let k = scale.discrete_points(xs)?.min(scale.discrete_points(ys)?);
    if k < 2 || xs.is_empty() || xs.len() != ys.len() {
        return None;
    }
    let category = |v: f64| ((v - scale.min).round().max(0.0) as usize).min(k - 1);

    let mut observed = vec![vec![0.0; k]; k];
    let mut hist_x = vec![0.0; k];
    let mut hist_y = vec![0.0; k];
    for (&x, &y) in xs.iter().zip(ys) {
        let (i, j) = (category(x), category(y));
        observed[i][j] += 1.0;
        hist_x[i] += 1.0;
        hist_y[j] += 1.0;
    }

    let n = xs.len() as f64;
    let denom_weight = ((k - 1) * (k - 1)) as f64;
    let mut num = 0.0;
    let mut den = 0.0;
    for i in 0..k {
        for j in 0..k {
            let weight = ((i as f64 - j as f64).powi(2)) / denom_weight;
            num += weight * observed[i][j];
            den += weight * hist_x[i] * hist_y[j] / n;
        }
    }

    if den == 0.0 {
        return None;
    }
    Some(1.0 - num / den)
}

/// Histogram over the declared scale.
///
/// Discrete scores on a small scale get one bucket per point, labelled with
/// the point (or its categorical label). Anything else gets `buckets`
/// equal-width buckets; the scale maximum falls in the last one.
pub fn histogram(values: &[f64], scale: &ScoreScale, buckets: usize) -> Vec<HistogramBucket> {
    if let Some(points) = scale
        .discrete_points(values)
        .filter(|&p| p <= MAX_POINT_BUCKETS)
    {
        let mut out: Vec<HistogramBucket> = (0..points)
            .map(|i| {
                let value = scale.min + i as f64;
                HistogramBucket {
                    label: scale
                        .label_for(value)
                        .map(String::from)
                        .unwrap_or_else(|| format_bound(value)),
                    lower: value,
                    upper: value,
                    count: 0,
                }
            })
            .collect();
        for &v in values {
            let index = ((v - scale.min).round().max(0.0) as usize).min(points - 1);
            out[index].count += 1;
        }
        return out;
    }

    let buckets = buckets.max(1);
    let width = scale.span() / buckets as f64;
    let mut out: Vec<HistogramBucket> = (0..buckets)
        .map(|i| {
            let lower = scale.min + width * i as f64;
            let upper = if i + 1 == buckets {
                scale.max
            } else {
                scale.min + width * (i + 1) as f64
            };
            HistogramBucket {
                label: format!("{}–{}", format_bound(lower), format_bound(upper)),
                lower,
                upper,
                count: 0,
            }
        })
        .collect();
    for &v in values {
        let position = (v - scale.min) * buckets as f64 / scale.span();
        let index = (position.floor().max(0.0) as usize).min(buckets - 1);
        out[index].count += 1;
    }
    out
}

/// Format a number with at most three decimals and no trailing zeros.
pub fn format_bound(value: f64) -> String {
    let text = format!("{:.3}", value);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text == "-0" {
        "0".to_string()
    } else {
        text.to_string()
    }
}
