use crate::checkpoint::{save_checkpoint, save_metrics, Checkpoint, MetricHistory};
use crate::error::TrainerError;
use crate::fold::{train, valid, EpochStats, TrainingContext};
use scoring::{Criterion, Optimizer, ScoringModel};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;

pub const FOLD_RESULTS_FILE: &str = "fold_results_train.tsv";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrossValidationSettings {
    pub num_folds: usize,
    pub num_epochs: usize,
    pub destination: PathBuf,
}

impl CrossValidationSettings {
    pub fn checkpoint_path(&self, fold: usize) -> PathBuf {
        self.destination.join(format!("model{fold}.ckpt"))
    }

    pub fn metrics_path(&self, fold: usize) -> PathBuf {
        self.destination.join(format!("metric{fold}.json"))
    }

    pub fn results_path(&self) -> PathBuf {
        self.destination.join(FOLD_RESULTS_FILE)
    }
}

/// Fresh model and optimizer for one fold.
pub struct FoldSetup {
    pub model: Box<dyn ScoringModel>,
    pub optimizer: Box<dyn Optimizer>,
}

/// One row of the fold results table. Losses and accuracies are the best
/// epoch's values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoldResult {
    #[serde(rename = "Fold")]
    pub fold: usize,
    #[serde(rename = "Train_Loss")]
    pub train_loss: f64,
    #[serde(rename = "Train_Accuracy")]
    pub train_accuracy: f64,
    #[serde(rename = "Valid_Loss")]
    pub valid_loss: f64,
    #[serde(rename = "Valid_Accuracy")]
    pub valid_accuracy: f64,
    #[serde(rename = "Fold_Timelapse_Minutes")]
    pub elapsed_minutes: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CrossValidationReport {
    pub folds: Vec<FoldResult>,
    pub results_path: PathBuf,
}

impl CrossValidationReport {
    pub fn total_minutes(&self) -> u64 {
        self.folds.iter().map(|f| f.elapsed_minutes).sum()
    }
}

/// Runs `num_folds` independent trainings, each from a model and optimizer
/// built by `setup` (called with the 1-based fold number).
pub fn run_folds<F>(
    context: &TrainingContext,
    settings: &CrossValidationSettings,
    criterion: &dyn Criterion,
    mut setup: F,
) -> Result<CrossValidationReport, TrainerError>
where
    F: FnMut(usize) -> anyhow::Result<FoldSetup>,
{
    if settings.num_folds == 0 || settings.num_epochs == 0 {
        return Err(TrainerError::InvalidSettings(format!(
            "need at least one fold and one epoch, got {} folds and {} epochs",
            settings.num_folds, settings.num_epochs
        )));
    }
    let (train_dishes, valid_dish) = context.split()?;
    info!(
        train = ?train_dishes,
        valid = valid_dish,
        folds = settings.num_folds,
        epochs = settings.num_epochs,
        "starting cross-validation"
    );

    let mut folds = Vec::with_capacity(settings.num_folds);
    for fold in 1..=settings.num_folds {
        info!("Fold [{}/{}]", fold, settings.num_folds);
        let start = Instant::now();

        let FoldSetup {
            mut model,
            mut optimizer,
        } = setup(fold).map_err(|err| TrainerError::FoldSetup {
            fold,
            source: err.into(),
        })?;

        let best = train_fold(
            context,
            &train_dishes,
            valid_dish,
            model.as_mut(),
            optimizer.as_mut(),
            criterion,
            settings,
            fold,
        )?;

        let elapsed = start.elapsed();
        let elapsed_minutes = elapsed.as_secs() / 60;
        info!(
            "Time elapsed: {} mins and {:.2} secs",
            elapsed_minutes,
            elapsed.as_secs_f64() % 60.0
        );

        folds.push(FoldResult {
            fold,
            train_loss: best.train.loss,
            train_accuracy: best.train.accuracy,
            valid_loss: best.valid.loss,
            valid_accuracy: best.valid.accuracy,
            elapsed_minutes,
        });
    }

    let results_path = settings.results_path();
    write_fold_results(&results_path, &folds)?;
    info!(path = %results_path.display(), "fold results saved");

    let report = CrossValidationReport {
        folds,
        results_path,
    };
    let total = report.total_minutes();
    info!(
        "Total training time for {} folds: {}h {}min",
        settings.num_folds,
        total / 60,
        total % 60
    );
    Ok(report)
}

#[derive(Debug, Clone, Copy)]
struct BestEpoch {
    train: EpochStats,
    valid: EpochStats,
}

#[allow(clippy::too_many_arguments)]
fn train_fold(
    context: &TrainingContext,
    train_dishes: &[&str],
    valid_dish: &str,
    model: &mut dyn ScoringModel,
    optimizer: &mut dyn Optimizer,
    criterion: &dyn Criterion,
    settings: &CrossValidationSettings,
    fold: usize,
) -> Result<BestEpoch, TrainerError> {
    let checkpoint_path = settings.checkpoint_path(fold);
    let metrics_path = settings.metrics_path(fold);

    let mut history = MetricHistory::default();
    let mut best = BestEpoch {
        train: EpochStats {
            loss: f64::INFINITY,
            accuracy: f64::NEG_INFINITY,
        },
        valid: EpochStats {
            loss: f64::INFINITY,
            accuracy: f64::NEG_INFINITY,
        },
    };

    for epoch in 0..settings.num_epochs {
        let train_stats = train(context, train_dishes, model, optimizer, criterion)?;
        let valid_stats = valid(context, valid_dish, model, criterion)?;
        history.push(epoch, train_stats, valid_stats);

        info!(
            "Epoch [{}/{}], Train Loss: {:.4}, Train Accuracy: {:.4}, Valid Loss: {:.4}, Valid Accuracy: {:.4}",
            epoch + 1,
            settings.num_epochs,
            train_stats.loss,
            train_stats.accuracy,
            valid_stats.loss,
            valid_stats.accuracy
        );

        if valid_stats.accuracy > best.valid.accuracy {
            best = BestEpoch {
                train: train_stats,
                valid: valid_stats,
            };
            let checkpoint =
                Checkpoint::capture(model, optimizer, valid_stats.loss, valid_stats.accuracy)?;
            save_checkpoint(&checkpoint_path, &checkpoint)?;
            save_metrics(&metrics_path, &history)?;
        }
    }

    save_metrics(&metrics_path, &history)?;
    info!(fold, "finished training");
    Ok(best)
}

fn write_fold_results(path: &Path, folds: &[FoldResult]) -> Result<(), TrainerError> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_writer(Vec::new());
    for fold in folds {
        writer.serialize(fold)?;
    }
    let data = writer
        .into_inner()
        .map_err(|err| TrainerError::Io(err.into_error()))?;
    crate::checkpoint::write_atomic(path, &data)
}

/// Reads a fold results table back.
pub fn read_fold_results(path: &Path) -> Result<Vec<FoldResult>, TrainerError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .from_path(path)?;
    let mut folds = Vec::new();
    for row in reader.deserialize() {
        folds.push(row?);
    }
    Ok(folds)
}
