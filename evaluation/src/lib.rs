pub mod aggregator;
pub mod error;
pub mod labels;

pub use aggregator::{
    DishEvaluation, DishFailure, EvaluationReport, MetricsAggregator, AGGREGATE_DIVISOR,
};
pub use error::EvalError;
pub use labels::{extract_label, gold_label, read_label_table, LabelSource, LabelTable, LabelledTarget};
