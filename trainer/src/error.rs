use corpus::CorpusError;
use recipe_align_core::error::{AlignError, ErrorCode};
use scoring::ModelError;
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum TrainerError {
    #[error("dish {dish}: gold target {target_id} for action {action_id} of {recipe1} is not a node of {recipe2}")]
    GoldTargetNotFound {
        dish: String,
        recipe1: String,
        recipe2: String,
        action_id: String,
        target_id: String,
    },
    #[error("dish {dish}: gold pair references unknown recipe {recipe}")]
    MissingRecipe { dish: String, recipe: String },
    #[error("dish {dish}: model failed on action {action_id} of {recipe1} against {recipe2}: {source}")]
    Scoring {
        dish: String,
        recipe1: String,
        recipe2: String,
        action_id: String,
        #[source]
        source: BoxError,
    },
    #[error("dish {dish}: model returned {actual} scores for {expected} candidates of {recipe2}")]
    ScoreCount {
        dish: String,
        recipe2: String,
        expected: usize,
        actual: usize,
    },
    #[error("model {0} has no trainable parameters")]
    NotTrainable(String),
    #[error("{stage} produced {steps} scored actions, too few to average")]
    InsufficientSteps { stage: &'static str, steps: usize },
    #[error("cross-validation needs at least 2 dishes, found {0}")]
    NotEnoughDishes(usize),
    #[error("unknown dish: {0}")]
    UnknownDish(String),
    #[error("invalid cross-validation settings: {0}")]
    InvalidSettings(String),
    #[error("checkpoint holds model {found}, cannot restore into {expected}")]
    CheckpointMismatch { expected: String, found: String },
    #[error("failed to set up fold {fold}: {source}")]
    FoldSetup {
        fold: usize,
        #[source]
        source: BoxError,
    },
    #[error("invalid optimizer state: {0}")]
    OptimizerState(#[source] BoxError),
    #[error(transparent)]
    Parameters(#[from] ModelError),
    #[error(transparent)]
    Corpus(#[from] CorpusError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AlignError for TrainerError {
    fn error_code(&self) -> ErrorCode {
        match self {
            TrainerError::GoldTargetNotFound { .. } | TrainerError::InsufficientSteps { .. } => {
                ErrorCode::DataQuality
            }
            TrainerError::MissingRecipe { .. } | TrainerError::UnknownDish(_) => ErrorCode::NotFound,
            TrainerError::NotTrainable(_)
            | TrainerError::NotEnoughDishes(_)
            | TrainerError::InvalidSettings(_)
            | TrainerError::CheckpointMismatch { .. } => ErrorCode::InvalidArgument,
            TrainerError::Parameters(err) => err.error_code(),
            TrainerError::Corpus(err) => err.error_code(),
            _ => ErrorCode::Internal,
        }
    }
}
