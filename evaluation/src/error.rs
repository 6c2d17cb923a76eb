use corpus::CorpusError;
use recipe_align_core::alignment::DuplicateKeyError;
use recipe_align_core::error::{AlignError, ErrorCode};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EvalError {
    #[error("dish {dish}: no prediction file in {dir}")]
    MissingPredictionFile { dish: String, dir: PathBuf },
    #[error("dish {dish}: no prediction for action {action_id} of {recipe}")]
    MissingPrediction {
        dish: String,
        recipe: String,
        action_id: String,
    },
    #[error("dish {dish}: gold alignment table is empty")]
    EmptyGold { dish: String },
    #[error("{path}:{line}: {reason}")]
    MalformedRow {
        path: PathBuf,
        line: u64,
        reason: String,
    },
    #[error("{path}: {source}")]
    DuplicateKey {
        path: PathBuf,
        #[source]
        source: DuplicateKeyError,
    },
    #[error(transparent)]
    Corpus(#[from] CorpusError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AlignError for EvalError {
    fn error_code(&self) -> ErrorCode {
        match self {
            EvalError::MissingPredictionFile { .. } | EvalError::MissingPrediction { .. } => {
                ErrorCode::NotFound
            }
            EvalError::EmptyGold { .. }
            | EvalError::MalformedRow { .. }
            | EvalError::DuplicateKey { .. } => ErrorCode::DataQuality,
            EvalError::Corpus(err) => err.error_code(),
            EvalError::Io(_) => ErrorCode::Internal,
        }
    }
}
