/// Loss between a score vector and the index of the gold candidate.
pub trait Criterion {
    fn loss(&self, scores: &[f32], target: usize) -> f32;

    /// `d loss / d scores`, same length as `scores`.
    fn gradient(&self, scores: &[f32], target: usize) -> Vec<f32>;
}

/// Softmax cross-entropy over the candidates of one target recipe.
#[derive(Debug, Default, Clone, Copy)]
pub struct CrossEntropyLoss;

impl CrossEntropyLoss {
    fn softmax(scores: &[f32]) -> Vec<f32> {
        let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let exps: Vec<f32> = scores.iter().map(|s| (s - max).exp()).collect();
        let sum: f32 = exps.iter().sum();
        exps.into_iter().map(|e| e / sum).collect()
    }
}

impl Criterion for CrossEntropyLoss {
    fn loss(&self, scores: &[f32], target: usize) -> f32 {
        let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let log_sum_exp = max + scores.iter().map(|s| (s - max).exp()).sum::<f32>().ln();
        log_sum_exp - scores[target]
    }

    fn gradient(&self, scores: &[f32], target: usize) -> Vec<f32> {
        let mut grad = Self::softmax(scores);
        grad[target] -= 1.0;
        grad
    }
}
