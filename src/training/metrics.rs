//! Evaluation metrics per problem type

use crate::core::{ClassScores, ClassificationReport, EvaluationMetrics};
use log::warn;
use smartcore::metrics::distance::{Distance, Distances};
use std::collections::{BTreeMap, BTreeSet};

/// Fraction of matching class codes
pub fn accuracy(y_true: &[i32], y_pred: &[i32]) -> f64 {
    smartcore::metrics::accuracy(&y_true.to_vec(), &y_pred.to_vec())
}

pub fn mean_squared_error(y_true: &[f64], y_pred: &[f64]) -> f64 {
    smartcore::metrics::mean_squared_error(&y_true.to_vec(), &y_pred.to_vec())
}

pub fn r2(y_true: &[f64], y_pred: &[f64]) -> f64 {
    smartcore::metrics::r2(&y_true.to_vec(), &y_pred.to_vec())
}

/// Per-class precision, recall and f1 over the classes present in either
/// vector; an undefined ratio counts as 0
pub fn classification_report(
    y_true: &[i32],
    y_pred: &[i32],
    labels: &[String],
) -> ClassificationReport {
    let present: BTreeSet<i32> = y_true.iter().chain(y_pred).copied().collect();
    let label_of = |code: i32| {
        usize::try_from(code)
            .ok()
            .and_then(|i| labels.get(i))
            .cloned()
            .unwrap_or_else(|| code.to_string())
    };

    let mut classes = BTreeMap::new();
    for &code in &present {
        let mut tp = 0usize;
        let mut fp = 0usize;
        let mut fn_ = 0usize;
        for (&t, &p) in y_true.iter().zip(y_pred) {
            match (t == code, p == code) {
                (true, true) => tp += 1,
                (false, true) => fp += 1,
                (true, false) => fn_ += 1,
                (false, false) => {}
            }
        }

        let precision = ratio(tp, tp + fp);
        let recall = ratio(tp, tp + fn_);
        let f1_score = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };
        classes.insert(
            label_of(code),
            ClassScores {
                precision,
                recall,
                f1_score,
                support: tp + fn_,
            },
        );
    }

    let total: usize = classes.values().map(|s| s.support).sum();
    let macro_avg = average(&classes, |_| 1.0, total);
    let weighted_avg = average(&classes, |s| s.support as f64, total);

    ClassificationReport {
        classes,
        macro_avg,
        weighted_avg,
    }
}

fn average(
    classes: &BTreeMap<String, ClassScores>,
    weight: impl Fn(&ClassScores) -> f64,
    support: usize,
) -> ClassScores {
    let norm: f64 = classes.values().map(&weight).sum();
    let mean = |value: fn(&ClassScores) -> f64| {
        if norm > 0.0 {
            classes.values().map(|s| weight(s) * value(s)).sum::<f64>() / norm
        } else {
            0.0
        }
    };
    ClassScores {
        precision: mean(|s| s.precision),
        recall: mean(|s| s.recall),
        f1_score: mean(|s| s.f1_score),
        support,
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// Mean silhouette coefficient with Euclidean distances.
///
/// `None` when the labels form fewer than 2 clusters or as many clusters as
/// there are rows.
pub fn silhouette_score(rows: &[Vec<f64>], labels: &[i32]) -> Option<f64> {
    let n = rows.len();
    let clusters: BTreeSet<i32> = labels.iter().copied().collect();
    if n != labels.len() || clusters.len() < 2 || clusters.len() >= n {
        return None;
    }

    let metric = Distances::euclidian::<f64>();
    let total: f64 = (0..n)
        .map(|i| {
            let mut sums: BTreeMap<i32, (f64, usize)> = BTreeMap::new();
            for j in (0..n).filter(|&j| j != i) {
                let entry = sums.entry(labels[j]).or_insert((0.0, 0));
                entry.0 += metric.distance(&rows[i], &rows[j]);
                entry.1 += 1;
            }

            // Singleton clusters score 0
            let a = match sums.get(&labels[i]) {
                Some(&(sum, count)) if count > 0 => sum / count as f64,
                _ => return 0.0,
            };
            let b = sums
                .iter()
                .filter(|(&label, _)| label != labels[i])
                .map(|(_, &(sum, count))| sum / count as f64)
                .fold(f64::INFINITY, f64::min);

            let denom = a.max(b);
            if denom > 0.0 {
                (b - a) / denom
            } else {
                0.0
            }
        })
        .sum();

    Some(total / n as f64)
}

/// Test-split metrics for a classifier
pub fn classification_metrics(
    y_true: &[i32],
    y_pred: &[i32],
    labels: &[String],
) -> EvaluationMetrics {
    let mut metrics = EvaluationMetrics::new();
    metrics.insert("accuracy", accuracy(y_true, y_pred));
    metrics.report = Some(classification_report(y_true, y_pred, labels));
    metrics
}

/// Test-split metrics for a regressor
pub fn regression_metrics(y_true: &[f64], y_pred: &[f64]) -> EvaluationMetrics {
    let mut metrics = EvaluationMetrics::new();
    metrics.insert("mse", mean_squared_error(y_true, y_pred));
    metrics.insert("r2", r2(y_true, y_pred));
    metrics
}

/// Silhouette of the fitted rows, or "N/A" when undefined
pub fn clustering_metrics(rows: &[Vec<f64>], labels: &[i32]) -> EvaluationMetrics {
    let mut metrics = EvaluationMetrics::new();
    match silhouette_score(rows, labels) {
        Some(score) => metrics.insert("silhouette", score),
        None => {
            warn!("Silhouette score is undefined for this clustering");
            metrics.insert_unavailable("silhouette");
        }
    }
    metrics
}
