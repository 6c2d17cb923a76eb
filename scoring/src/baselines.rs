use crate::model::{ModelError, ScoreRequest, ScoringModel};
use recipe_align_core::embedding::cosine_similarity;

/// Aligns the i-th action of the source recipe with the i-th node of the
/// target recipe (clamped to the last node).
#[derive(Debug, Default, Clone, Copy)]
pub struct SequenceModel;

impl ScoringModel for SequenceModel {
    fn name(&self) -> &str {
        "sequence"
    }

    fn score(&self, request: &ScoreRequest<'_>) -> anyhow::Result<Vec<f32>> {
        let position = request
            .source_recipe
            .position(&request.source.id)
            .ok_or_else(|| ModelError::UnknownSource(request.source.id.clone()))?;

        let candidates = request.candidate_count();
        let mut scores = vec![0.0; candidates];
        if let Some(last) = candidates.checked_sub(1) {
            scores[position.min(last)] = 1.0;
        }
        Ok(scores)
    }
}

/// Scores candidates by cosine similarity of mean action embeddings.
#[derive(Debug, Default, Clone, Copy)]
pub struct CosineSimilarityModel;

impl ScoringModel for CosineSimilarityModel {
    fn name(&self) -> &str {
        "cosine-similarity"
    }

    fn score(&self, request: &ScoreRequest<'_>) -> anyhow::Result<Vec<f32>> {
        let source = request.source_recipe.action_vector(request.source);
        let target = request.target_recipe;

        target
            .nodes()
            .iter()
            .map(|node| {
                let candidate = target.action_vector(node);
                cosine_similarity(&source, &candidate).ok_or_else(|| {
                    ModelError::DimensionMismatch {
                        expected: source.len(),
                        actual: candidate.len(),
                    }
                    .into()
                })
            })
            .collect()
    }
}
