use crate::checkpoint::write_atomic;
use crate::error::TrainerError;
use crate::evaluator::{run_model, Mode, ResultTable};
use crate::fold::{percent, TrainingContext};
use scoring::ScoringModel;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, PartialEq)]
pub struct DishTestResult {
    pub dish: String,
    pub correct_predictions: usize,
    pub num_actions: usize,
    pub accuracy: f64,
    pub prediction_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TestReport {
    pub dishes: Vec<DishTestResult>,
    pub correct_predictions: usize,
    pub num_actions: usize,
}

impl TestReport {
    /// Overall accuracy in percent; zero when nothing was scored.
    pub fn accuracy(&self) -> f64 {
        if self.num_actions == 0 {
            return 0.0;
        }
        percent(self.correct_predictions, self.num_actions)
    }
}

#[derive(Serialize)]
struct PredictionRow<'a> {
    recipe1: &'a str,
    action_id: &'a str,
    recipe2: &'a str,
    predicted_label: &'a str,
    gold_label: &'a str,
}

/// Runs `model` over each named dish in testing mode and writes one
/// `{dish}{suffix}` prediction file per dish under `destination`.
pub fn test_dishes(
    context: &TrainingContext,
    dish_names: &[&str],
    model: &mut dyn ScoringModel,
    destination: &Path,
    suffix: &str,
) -> Result<TestReport, TrainerError> {
    model.set_training(false);

    let mut dishes = Vec::with_capacity(dish_names.len());
    let mut correct_predictions = 0;
    let mut num_actions = 0;

    for name in dish_names {
        let dish = context.dish(name)?;
        let mut table = ResultTable::new();
        let stats = run_model(dish, model, &mut Mode::Testing { sink: &mut table })?;

        let prediction_path = destination.join(format!("{name}{suffix}"));
        write_predictions(&prediction_path, &table)?;

        let accuracy = if stats.num_actions == 0 {
            0.0
        } else {
            percent(stats.correct_predictions, stats.num_actions)
        };
        info!(
            dish = %name,
            correct = stats.correct_predictions,
            actions = stats.num_actions,
            accuracy = format_args!("{accuracy:.2}"),
            "tested dish"
        );

        correct_predictions += stats.correct_predictions;
        num_actions += stats.num_actions;
        dishes.push(DishTestResult {
            dish: name.to_string(),
            correct_predictions: stats.correct_predictions,
            num_actions: stats.num_actions,
            accuracy,
            prediction_path,
        });
    }

    let report = TestReport {
        dishes,
        correct_predictions,
        num_actions,
    };
    info!(
        correct = report.correct_predictions,
        actions = report.num_actions,
        accuracy = format_args!("{:.2}", report.accuracy()),
        "testing finished"
    );
    Ok(report)
}

const PREDICTION_HEADER: [&str; 5] = ["recipe1", "action_id", "recipe2", "predicted_label", "gold_label"];

fn write_predictions(path: &Path, table: &ResultTable) -> Result<(), TrainerError> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(PREDICTION_HEADER)?;
    for record in table.records() {
        writer.serialize(PredictionRow {
            recipe1: &record.recipe1,
            action_id: &record.source_action_id,
            recipe2: &record.recipe2,
            predicted_label: &record.predicted_target_id,
            gold_label: &record.gold_target_id,
        })?;
    }
    let data = writer
        .into_inner()
        .map_err(|err| TrainerError::Io(err.into_error()))?;
    write_atomic(path, &data)
}
