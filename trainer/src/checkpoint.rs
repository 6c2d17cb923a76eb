use crate::error::TrainerError;
use crate::fold::EpochStats;
use chrono::{DateTime, Utc};
use scoring::{Optimizer, ScoringModel};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Best-so-far model state of a fold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub model: String,
    pub parameters: Vec<f32>,
    pub optimizer_state: serde_json::Value,
    pub best_valid_loss: f64,
    pub best_valid_accuracy: f64,
    pub saved_at: DateTime<Utc>,
}

impl Checkpoint {
    pub fn capture(
        model: &mut dyn ScoringModel,
        optimizer: &dyn Optimizer,
        best_valid_loss: f64,
        best_valid_accuracy: f64,
    ) -> Result<Self, TrainerError> {
        let name = model.name().to_string();
        let parameters = model
            .as_differentiable()
            .ok_or_else(|| TrainerError::NotTrainable(name.clone()))?
            .parameters()
            .to_vec();

        Ok(Self {
            model: name,
            parameters,
            optimizer_state: optimizer.state(),
            best_valid_loss,
            best_valid_accuracy,
            saved_at: Utc::now(),
        })
    }

    /// Loads the stored parameters into `model`, which must be the model the
    /// checkpoint was captured from.
    pub fn restore(&self, model: &mut dyn ScoringModel) -> Result<(), TrainerError> {
        let name = model.name().to_string();
        if name != self.model {
            return Err(TrainerError::CheckpointMismatch {
                expected: name,
                found: self.model.clone(),
            });
        }
        model
            .as_differentiable()
            .ok_or(TrainerError::NotTrainable(name))?
            .load_parameters(&self.parameters)?;
        Ok(())
    }

    pub fn restore_optimizer(&self, optimizer: &mut dyn Optimizer) -> Result<(), TrainerError> {
        optimizer
            .load_state(self.optimizer_state.clone())
            .map_err(|err| TrainerError::OptimizerState(err.into()))
    }
}

/// Per-epoch curves of one fold.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricHistory {
    pub train_loss: Vec<f64>,
    pub valid_loss: Vec<f64>,
    pub train_accuracy: Vec<f64>,
    pub valid_accuracy: Vec<f64>,
    pub epochs: Vec<usize>,
}

impl MetricHistory {
    pub fn push(&mut self, epoch: usize, train: EpochStats, valid: EpochStats) {
        self.epochs.push(epoch);
        self.train_loss.push(train.loss);
        self.train_accuracy.push(train.accuracy);
        self.valid_loss.push(valid.loss);
        self.valid_accuracy.push(valid.accuracy);
    }

    pub fn len(&self) -> usize {
        self.epochs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.epochs.is_empty()
    }
}

pub fn save_checkpoint(path: &Path, checkpoint: &Checkpoint) -> Result<(), TrainerError> {
    write_atomic(path, &serde_json::to_vec(checkpoint)?)?;
    debug!(path = %path.display(), accuracy = checkpoint.best_valid_accuracy, "checkpoint saved");
    Ok(())
}

pub fn load_checkpoint(path: &Path) -> Result<Checkpoint, TrainerError> {
    Ok(serde_json::from_slice(&fs::read(path)?)?)
}

pub fn save_metrics(path: &Path, history: &MetricHistory) -> Result<(), TrainerError> {
    write_atomic(path, &serde_json::to_vec_pretty(history)?)
}

pub fn load_metrics(path: &Path) -> Result<MetricHistory, TrainerError> {
    Ok(serde_json::from_slice(&fs::read(path)?)?)
}

/// Writes to a sibling temp file then renames over `path`.
pub(crate) fn write_atomic(path: &Path, data: &[u8]) -> Result<(), TrainerError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp_path = path.with_extension("tmp");
    fs::write(&tmp_path, data)?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use scoring::{Adam, BilinearAlignmentModel, Differentiable};
    use tempfile::tempdir;

    #[test]
    fn test_checkpoint_restores_parameters() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("model1.ckpt");

        let mut trained = BilinearAlignmentModel::new(2, false);
        trained.load_parameters(&[0.5, 0.1, 0.2, 0.3]).unwrap();
        let optimizer = Adam::new(0.01);
        let checkpoint = Checkpoint::capture(&mut trained, &optimizer, 0.7, 62.5).unwrap();
        save_checkpoint(&path, &checkpoint).unwrap();
        assert!(!path.with_extension("tmp").exists());

        let loaded = load_checkpoint(&path).unwrap();
        assert_eq!(loaded, checkpoint);

        let mut fresh = BilinearAlignmentModel::new(2, false);
        loaded.restore(&mut fresh).unwrap();
        assert_eq!(fresh.parameters(), &[0.5, 0.1, 0.2, 0.3]);

        let mut restored = Adam::new(0.01);
        loaded.restore_optimizer(&mut restored).unwrap();
        assert_eq!(restored.state(), optimizer.state());
    }

    #[test]
    fn test_restore_rejects_wrong_shape() {
        let mut small = BilinearAlignmentModel::new(2, false);
        let checkpoint = Checkpoint::capture(&mut small, &Adam::new(0.01), 1.0, 50.0).unwrap();

        let mut large = BilinearAlignmentModel::new(3, false);
        let err = checkpoint.restore(&mut large).unwrap_err();
        assert!(matches!(err, TrainerError::Parameters(_)));
    }

    #[test]
    fn test_restore_rejects_other_model() {
        let mut plain = BilinearAlignmentModel::new(2, false);
        let checkpoint = Checkpoint::capture(&mut plain, &Adam::new(0.01), 1.0, 50.0).unwrap();

        let mut featured = BilinearAlignmentModel::new(2, true);
        let err = checkpoint.restore(&mut featured).unwrap_err();
        assert!(matches!(
            err,
            TrainerError::CheckpointMismatch { ref expected, ref found }
                if expected == "alignment-with-feature" && found == "alignment-no-feature"
        ));
        assert_eq!(featured.parameters(), &[1.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_metric_history_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("metric1.json");
        let mut history = MetricHistory::default();
        let stats = EpochStats {
            loss: 0.5,
            accuracy: 50.0,
        };
        history.push(0, stats, stats);
        history.push(1, stats, stats);

        save_metrics(&path, &history).unwrap();
        assert_eq!(load_metrics(&path).unwrap(), history);
        assert_eq!(history.len(), 2);
    }
}
