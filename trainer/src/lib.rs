pub mod checkpoint;
pub mod cross_validation;
pub mod error;
pub mod evaluator;
pub mod fold;
pub mod testing;

pub use checkpoint::{load_checkpoint, load_metrics, save_checkpoint, save_metrics, Checkpoint, MetricHistory};
pub use cross_validation::{
    read_fold_results, run_folds, CrossValidationReport, CrossValidationSettings, FoldResult, FoldSetup,
    FOLD_RESULTS_FILE,
};
pub use error::TrainerError;
pub use evaluator::{run_model, Mode, ResultTable, RunStats, TestRecord};
pub use fold::{train, valid, EpochStats, TrainingContext};
pub use testing::{test_dishes, DishTestResult, TestReport};
