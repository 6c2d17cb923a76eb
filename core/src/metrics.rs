//! Label-sequence classification metrics (accuracy, support-weighted
//! precision/recall/F1).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassificationMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

impl ClassificationMetrics {
    /// Computes every metric over parallel gold/predicted label sequences.
    pub fn compute<L: AsRef<str>>(gold: &[L], predicted: &[L]) -> Self {
        let accuracy = accuracy_score(gold, predicted);
        let (precision, recall, f1) = weighted_precision_recall_f1(gold, predicted);
        Self {
            accuracy,
            precision,
            recall,
            f1,
        }
    }
}

impl std::ops::Add for ClassificationMetrics {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            accuracy: self.accuracy + other.accuracy,
            precision: self.precision + other.precision,
            recall: self.recall + other.recall,
            f1: self.f1 + other.f1,
        }
    }
}

impl std::ops::Div<f64> for ClassificationMetrics {
    type Output = Self;

    fn div(self, divisor: f64) -> Self {
        Self {
            accuracy: self.accuracy / divisor,
            precision: self.precision / divisor,
            recall: self.recall / divisor,
            f1: self.f1 / divisor,
        }
    }
}

/// Fraction of positions where the labels agree. Empty input scores 0.0.
pub fn accuracy_score<L: AsRef<str>>(gold: &[L], predicted: &[L]) -> f64 {
    let total = gold.len().min(predicted.len());
    if total == 0 {
        return 0.0;
    }
    let correct = gold
        .iter()
        .zip(predicted)
        .filter(|(g, p)| g.as_ref() == p.as_ref())
        .count();
    correct as f64 / total as f64
}

#[derive(Default)]
struct LabelCounts {
    true_positive: usize,
    predicted: usize,
    support: usize,
}

/// Per-label precision/recall/F1 averaged with weights equal to each label's
/// gold support. Undefined ratios (no predictions or no support) count as 0.
pub fn weighted_precision_recall_f1<L: AsRef<str>>(gold: &[L], predicted: &[L]) -> (f64, f64, f64) {
    let mut counts: BTreeMap<&str, LabelCounts> = BTreeMap::new();

    for (g, p) in gold.iter().zip(predicted) {
        let (g, p) = (g.as_ref(), p.as_ref());
        counts.entry(g).or_default().support += 1;
        counts.entry(p).or_default().predicted += 1;
        if g == p {
            counts.entry(g).or_default().true_positive += 1;
        }
    }

    let total_support: usize = counts.values().map(|c| c.support).sum();
    if total_support == 0 {
        return (0.0, 0.0, 0.0);
    }

    let (mut precision, mut recall, mut f1) = (0.0, 0.0, 0.0);
    for c in counts.values().filter(|c| c.support > 0) {
        let p = ratio(c.true_positive, c.predicted);
        let r = ratio(c.true_positive, c.support);
        let f = if p + r > 0.0 { 2.0 * p * r / (p + r) } else { 0.0 };
        let weight = c.support as f64 / total_support as f64;
        precision += weight * p;
        recall += weight * r;
        f1 += weight * f;
    }

    (precision, recall, f1)
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}
