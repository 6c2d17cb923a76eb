use recipe_align_core::error::{AlignError, ErrorCode};
use recipe_align_core::model::{ActionNode, Recipe};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("model {0} is not differentiable")]
    NotDifferentiable(String),
    #[error("expected {expected}-dimensional vectors, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("expected {expected} parameters, got {actual}")]
    ParameterCount { expected: usize, actual: usize },
    #[error("gradient has {actual} entries for {expected} scores")]
    GradientLength { expected: usize, actual: usize },
    #[error("source action {0} is not part of the source recipe")]
    UnknownSource(String),
}

impl AlignError for ModelError {
    fn error_code(&self) -> ErrorCode {
        match self {
            ModelError::NotDifferentiable(_) => ErrorCode::InvalidArgument,
            _ => ErrorCode::Internal,
        }
    }
}

/// Everything a scorer may look at for one source action: the action
/// itself plus both recipes with their embeddings and lookups.
#[derive(Debug, Clone, Copy)]
pub struct ScoreRequest<'a> {
    pub source: &'a ActionNode,
    pub source_recipe: &'a Recipe,
    pub target_recipe: &'a Recipe,
}

impl<'a> ScoreRequest<'a> {
    pub fn new(source: &'a ActionNode, source_recipe: &'a Recipe, target_recipe: &'a Recipe) -> Self {
        Self {
            source,
            source_recipe,
            target_recipe,
        }
    }

    pub fn candidate_count(&self) -> usize {
        self.target_recipe.nodes().len()
    }
}

/// Scores every node of the target recipe (root included) as the
/// counterpart of the source action.
pub trait ScoringModel: Send {
    fn name(&self) -> &str;

    /// Returns one score per target node, in target node order.
    fn score(&self, request: &ScoreRequest<'_>) -> anyhow::Result<Vec<f32>>;

    fn set_training(&mut self, _training: bool) {}

    fn as_differentiable(&mut self) -> Option<&mut dyn Differentiable> {
        None
    }
}

/// Gradient hooks of a trainable scorer over a flat parameter vector.
pub trait Differentiable {
    fn zero_grad(&mut self);

    /// Accumulates parameter gradients given `d loss / d scores`.
    fn backward(&mut self, request: &ScoreRequest<'_>, score_grad: &[f32]) -> anyhow::Result<()>;

    fn parameters(&self) -> &[f32];

    fn params_and_grads(&mut self) -> (&mut [f32], &[f32]);

    fn load_parameters(&mut self, parameters: &[f32]) -> Result<(), ModelError>;
}

/// Index of the highest score; ties resolve to the lowest index. NaN ranks
/// below every number.
pub fn argmax(scores: &[f32]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (idx, score) in scores.iter().enumerate() {
        match best {
            Some(_) if score.is_nan() => {}
            Some(b) if !scores[b].is_nan() && *score <= scores[b] => {}
            _ => best = Some(idx),
        }
    }
    best
}
