use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct CorpusConfig {
    /// Root holding one sub-directory per training dish.
    pub train_root: PathBuf,
    pub test_root: PathBuf,
    pub alignment_file: String,
    pub recipe_folder: String,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            train_root: PathBuf::from("data/train"),
            test_root: PathBuf::from("data/test"),
            alignment_file: "alignments.tsv".to_string(),
            recipe_folder: "recipes".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct TrainingConfig {
    /// Registry reference of the scoring model, `name` or `name@version`.
    pub model: String,
    pub embedding_dim: usize,
    pub learning_rate: f64,
    pub num_epochs: usize,
    pub num_folds: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            model: "alignment-with-feature".to_string(),
            embedding_dim: 64,
            learning_rate: 1e-4,
            num_epochs: 40,
            num_folds: 10,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    /// Checkpoints, metric histories and fold tables land in `<destination_root>/<model name>`.
    pub destination_root: PathBuf,
    pub prediction_suffix: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            destination_root: PathBuf::from("results"),
            prediction_suffix: "_prediction.tsv".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub corpus: CorpusConfig,
    pub training: TrainingConfig,
    pub output: OutputConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Loads `<dir>/default`, then `<dir>/<RUN_MODE>` if present, then
    /// `RECIPE_ALIGN__SECTION__KEY` environment overrides.
    pub fn load_from(dir: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let dir = dir.as_ref();
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let builder = Config::builder()
            .add_source(File::from(dir.join("default")).required(false))
            .add_source(File::from(dir.join(&run_mode)).required(false))
            .add_source(Environment::with_prefix("RECIPE_ALIGN").separator("__"));

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let training = &self.training;
        if training.num_folds == 0 {
            return Err(ConfigError::Message("training.num_folds must be > 0".into()));
        }
        if training.num_epochs == 0 {
            return Err(ConfigError::Message("training.num_epochs must be > 0".into()));
        }
        if training.embedding_dim == 0 {
            return Err(ConfigError::Message("training.embedding_dim must be > 0".into()));
        }
        if training.learning_rate.is_nan() || training.learning_rate <= 0.0 {
            return Err(ConfigError::Message("training.learning_rate must be positive".into()));
        }
        if self.output.prediction_suffix.is_empty() {
            return Err(ConfigError::Message("output.prediction_suffix must not be empty".into()));
        }
        Ok(())
    }

    pub fn destination_for(&self, model_name: &str) -> PathBuf {
        self.output.destination_root.join(model_name)
    }
}
