use crate::error::EvalError;
use crate::labels::{read_label_table, LabelSource, LabelTable};
use corpus::list_dishes;
use indexmap::IndexMap;
use recipe_align_core::config::AppConfig;
use recipe_align_core::metrics::ClassificationMetrics;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use tracing::{error, info, warn};

/// Corpus-wide metrics are the per-dish sum divided by this constant, not by
/// the number of dishes. Existing result tables were produced this way.
pub const AGGREGATE_DIVISOR: f64 = 2.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DishEvaluation {
    pub dish: String,
    /// First source recipe name without its two-character numeric suffix.
    pub key: String,
    pub prediction_file: PathBuf,
    pub gold_count: usize,
    pub prediction_count: usize,
    pub evaluated: usize,
    pub metrics: ClassificationMetrics,
}

impl DishEvaluation {
    pub fn count_mismatch(&self) -> bool {
        self.gold_count != self.prediction_count
    }
}

#[derive(Debug)]
pub struct DishFailure {
    pub dish: String,
    pub error: EvalError,
}

#[derive(Debug, Default)]
pub struct EvaluationReport {
    pub dishes: IndexMap<String, DishEvaluation>,
    pub aggregate: ClassificationMetrics,
    pub failures: Vec<DishFailure>,
}

/// Matches gold alignment tables of a test corpus against a directory of
/// prediction files.
#[derive(Debug, Clone)]
pub struct MetricsAggregator {
    test_root: PathBuf,
    prediction_dir: PathBuf,
    alignment_file: String,
    recipe_folder: String,
    suffix_len: usize,
}

impl MetricsAggregator {
    pub fn new(
        test_root: impl Into<PathBuf>,
        prediction_dir: impl Into<PathBuf>,
        prediction_suffix: &str,
    ) -> Self {
        Self {
            test_root: test_root.into(),
            prediction_dir: prediction_dir.into(),
            alignment_file: "alignments.tsv".to_string(),
            recipe_folder: "recipes".to_string(),
            suffix_len: prediction_suffix.chars().count(),
        }
    }

    pub fn from_config(config: &AppConfig, prediction_dir: impl Into<PathBuf>) -> Self {
        Self::new(
            &config.corpus.test_root,
            prediction_dir,
            &config.output.prediction_suffix,
        )
        .with_layout(&config.corpus.alignment_file, &config.corpus.recipe_folder)
    }

    pub fn with_layout(mut self, alignment_file: &str, recipe_folder: &str) -> Self {
        self.alignment_file = alignment_file.to_string();
        self.recipe_folder = recipe_folder.to_string();
        self
    }

    /// Evaluates every dish of the test root. Per-dish failures are
    /// collected in the report; only an unreadable corpus aborts.
    pub fn run(&self) -> Result<EvaluationReport, EvalError> {
        let dishes = list_dishes(&self.test_root, &self.recipe_folder)?;
        let prediction_files = self.prediction_files()?;

        let mut report = EvaluationReport::default();
        for dish in dishes {
            match self.evaluate_dish(&dish, &prediction_files) {
                Ok(evaluation) => {
                    let m = &evaluation.metrics;
                    info!(
                        "Results on dish {}: Accuracy: {}, Precision: {}, Recall: {}, F1: {}",
                        evaluation.key, m.accuracy, m.precision, m.recall, m.f1
                    );
                    if let Some(previous) = report.dishes.insert(evaluation.key.clone(), evaluation)
                    {
                        warn!(dish = %previous.dish, key = %previous.key, "dish key reused, earlier results replaced");
                    }
                }
                Err(err) => {
                    error!(dish = %dish, error = %err, "dish evaluation failed");
                    report.failures.push(DishFailure { dish, error: err });
                }
            }
        }

        report.aggregate = report
            .dishes
            .values()
            .fold(ClassificationMetrics::default(), |acc, d| acc + d.metrics)
            / AGGREGATE_DIVISOR;
        let a = &report.aggregate;
        info!(
            "Total accuracy: {}, Total precision: {}, Total recall: {}, Total F1: {}",
            a.accuracy, a.precision, a.recall, a.f1
        );
        Ok(report)
    }

    fn prediction_files(&self) -> Result<Vec<(String, PathBuf)>, EvalError> {
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.prediction_dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                files.push((name.to_string(), entry.path()));
            }
        }
        files.sort();
        Ok(files)
    }

    fn dish_of<'n>(&self, file_name: &'n str) -> Option<&'n str> {
        let keep = file_name.chars().count().checked_sub(self.suffix_len)?;
        let end = file_name
            .char_indices()
            .nth(keep)
            .map_or(file_name.len(), |(idx, _)| idx);
        Some(&file_name[..end])
    }

    pub fn evaluate_dish(
        &self,
        dish: &str,
        prediction_files: &[(String, PathBuf)],
    ) -> Result<DishEvaluation, EvalError> {
        let gold = read_label_table(
            &self.test_root.join(dish).join(&self.alignment_file),
            LabelSource::Gold,
        )?;

        let mut matching = prediction_files
            .iter()
            .filter(|(name, _)| self.dish_of(name) == Some(dish))
            .map(|(_, path)| path);
        let mut prediction_file = matching
            .next()
            .ok_or_else(|| EvalError::MissingPredictionFile {
                dish: dish.to_string(),
                dir: self.prediction_dir.clone(),
            })?;
        for later in matching {
            warn!(dish, ignored = %prediction_file.display(), using = %later.display(), "several prediction files match");
            prediction_file = later;
        }
        let predicted = read_label_table(prediction_file, LabelSource::Prediction)?;

        let evaluation = score_tables(dish, &gold, &predicted)?;
        Ok(DishEvaluation {
            prediction_file: prediction_file.clone(),
            ..evaluation
        })
    }
}

fn score_tables(
    dish: &str,
    gold: &LabelTable,
    predicted: &LabelTable,
) -> Result<DishEvaluation, EvalError> {
    let first = gold.keys().next().ok_or_else(|| EvalError::EmptyGold {
        dish: dish.to_string(),
    })?;
    let key = dish_key(&first.recipe);

    let counts_match = gold.len() == predicted.len();
    if !counts_match {
        warn!(
            dish,
            gold = gold.len(),
            predicted = predicted.len(),
            "gold and prediction counts differ, scoring common keys"
        );
    }

    let mut gold_labels = Vec::with_capacity(gold.len());
    let mut predicted_labels = Vec::with_capacity(gold.len());
    for (action, target) in gold.iter() {
        match predicted.get(action) {
            Some(prediction) => {
                gold_labels.push(target.label.as_str());
                predicted_labels.push(prediction.label.as_str());
            }
            None if !counts_match => continue,
            None => {
                return Err(EvalError::MissingPrediction {
                    dish: dish.to_string(),
                    recipe: action.recipe.clone(),
                    action_id: action.action_id.clone(),
                })
            }
        }
    }

    if gold_labels.is_empty() {
        return Err(EvalError::MissingPrediction {
            dish: dish.to_string(),
            recipe: first.recipe.clone(),
            action_id: first.action_id.clone(),
        });
    }

    Ok(DishEvaluation {
        dish: dish.to_string(),
        key,
        prediction_file: PathBuf::new(),
        gold_count: gold.len(),
        prediction_count: predicted.len(),
        evaluated: gold_labels.len(),
        metrics: ClassificationMetrics::compute(&gold_labels, &predicted_labels),
    })
}

/// `pumpkin_bread_6` -> `pumpkin_bread`.
fn dish_key(recipe: &str) -> String {
    let keep = recipe.chars().count().saturating_sub(2);
    recipe.chars().take(keep).collect()
}
