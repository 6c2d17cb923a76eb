use recipe_align_core::alignment::DuplicateKeyError;
use recipe_align_core::error::{AlignError, ErrorCode};
use recipe_align_core::model::GraphError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CorpusError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TSV error in {}: {}", .path.display(), .source)]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("malformed record in {} line {}: {}", .path.display(), .line, .reason)]
    MalformedRecord {
        path: PathBuf,
        line: u64,
        reason: String,
    },
    #[error("invalid recipe document {}: {}", .path.display(), .source)]
    InvalidRecipe {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("dish {}: alignment file not found at {}", .dish, .path.display())]
    MissingAlignmentFile { dish: String, path: PathBuf },
    #[error("dish {}: recipe {} not found at {}", .dish, .recipe, .path.display())]
    MissingRecipe {
        dish: String,
        recipe: String,
        path: PathBuf,
    },
    #[error("dish {dish}: {source}")]
    DuplicateGoldKey {
        dish: String,
        #[source]
        source: DuplicateKeyError,
    },
    #[error("dish {dish}: {source}")]
    Graph {
        dish: String,
        #[source]
        source: GraphError,
    },
    #[error("dish not found: {0}")]
    DishNotFound(String),
}

impl AlignError for CorpusError {
    fn error_code(&self) -> ErrorCode {
        match self {
            CorpusError::Io(_) | CorpusError::Csv { .. } => ErrorCode::Internal,
            CorpusError::MissingAlignmentFile { .. }
            | CorpusError::MissingRecipe { .. }
            | CorpusError::DishNotFound(_) => ErrorCode::NotFound,
            CorpusError::MalformedRecord { .. }
            | CorpusError::InvalidRecipe { .. }
            | CorpusError::DuplicateGoldKey { .. }
            | CorpusError::Graph { .. } => ErrorCode::DataQuality,
        }
    }
}
