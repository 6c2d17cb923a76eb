//! Facade wiring configuration, the model registry and the training,
//! testing and evaluation stages together.

use corpus::{DeterministicEmbedder, DishLoader, Embedder, JsonRecipeReader};
use evaluation::{EvalError, EvaluationReport, MetricsAggregator};
use recipe_align_core::config::AppConfig;
use recipe_align_core::error::{AlignError, ErrorCode};
use scoring::{Adam, CrossEntropyLoss, ModelContext, ModelRegistry, RegistryError, ScoringModel};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;
use trainer::{
    load_checkpoint, run_folds, test_dishes, CrossValidationReport, CrossValidationSettings,
    FoldSetup, TestReport, TrainerError, TrainingContext,
};

pub use recipe_align_core::init_tracing;

pub const PREDICTIONS_DIR: &str = "predictions";

pub type EmbedderFactory = Arc<dyn Fn(usize) -> Box<dyn Embedder> + Send + Sync>;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Trainer(#[from] TrainerError),
    #[error(transparent)]
    Evaluation(#[from] EvalError),
    #[error("failed to build model {model}: {source}")]
    ModelBuild {
        model: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },
}

impl AlignError for SdkError {
    fn error_code(&self) -> ErrorCode {
        match self {
            SdkError::Config(_) => ErrorCode::InvalidArgument,
            SdkError::Registry(err) => err.error_code(),
            SdkError::Trainer(err) => err.error_code(),
            SdkError::Evaluation(err) => err.error_code(),
            SdkError::ModelBuild { .. } => ErrorCode::Internal,
        }
    }
}

pub struct AlignmentHarness {
    config: AppConfig,
    registry: ModelRegistry,
    embedder: EmbedderFactory,
}

impl AlignmentHarness {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            registry: ModelRegistry::with_defaults(),
            embedder: Arc::new(|dim| Box::new(DeterministicEmbedder::new(dim))),
        }
    }

    pub fn from_env() -> Result<Self, SdkError> {
        Ok(Self::new(AppConfig::load()?))
    }

    pub fn with_registry(mut self, registry: ModelRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_embedder(mut self, embedder: EmbedderFactory) -> Self {
        self.embedder = embedder;
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub fn model_name(&self) -> &str {
        let model = &self.config.training.model;
        model.split_once('@').map_or(model.as_str(), |(name, _)| name)
    }

    pub fn destination(&self) -> PathBuf {
        self.config.destination_for(self.model_name())
    }

    pub fn prediction_dir(&self) -> PathBuf {
        self.destination().join(PREDICTIONS_DIR)
    }

    fn loader(&self, root: &Path) -> DishLoader {
        DishLoader::new(
            root,
            Box::new(JsonRecipeReader),
            (self.embedder)(self.config.training.embedding_dim),
        )
        .with_layout(
            &self.config.corpus.alignment_file,
            &self.config.corpus.recipe_folder,
        )
    }

    pub fn load_training_context(&self) -> Result<TrainingContext, SdkError> {
        Ok(TrainingContext::load(&self.loader(&self.config.corpus.train_root))?)
    }

    pub fn load_test_context(&self) -> Result<TrainingContext, SdkError> {
        Ok(TrainingContext::load(&self.loader(&self.config.corpus.test_root))?)
    }

    fn build_model(&self, training: &TrainingContext) -> Result<Box<dyn ScoringModel>, SdkError> {
        let resolved = self.registry.resolve(&self.config.training.model)?;
        let dishes: Vec<_> = training.dishes().collect();
        let context = ModelContext {
            embedding_dim: self.config.training.embedding_dim,
            training_dishes: &dishes,
        };
        resolved
            .build(&context)
            .map_err(|err| SdkError::ModelBuild {
                model: resolved.model_id.clone(),
                source: err.into(),
            })
    }

    /// k-fold cross-validation of the configured model over the training
    /// corpus. Checkpoints, metric histories and the fold table land in
    /// [`Self::destination`].
    pub fn cross_validate(&self) -> Result<CrossValidationReport, SdkError> {
        let context = self.load_training_context()?;
        info!(dishes = ?context.dish_names(), "Data successfully loaded");

        let mut candidate = self.build_model(&context)?;
        if candidate.as_differentiable().is_none() {
            return Err(TrainerError::NotTrainable(candidate.name().to_string()).into());
        }

        let training = &self.config.training;
        let settings = CrossValidationSettings {
            num_folds: training.num_folds,
            num_epochs: training.num_epochs,
            destination: self.destination(),
        };

        let report = run_folds(
            &context,
            &settings,
            &CrossEntropyLoss,
            |_fold| -> anyhow::Result<FoldSetup> {
                Ok(FoldSetup {
                    model: self.build_model(&context)?,
                    optimizer: Box::new(Adam::new(training.learning_rate)),
                })
            },
        )?;
        Ok(report)
    }

    /// Runs the configured model over every test dish, writing prediction
    /// files to [`Self::prediction_dir`]. A trainable model is first
    /// restored from `checkpoint` when one is given.
    pub fn test(&self, checkpoint: Option<&Path>) -> Result<TestReport, SdkError> {
        let training = self.load_training_context()?;
        let mut model = self.build_model(&training)?;
        if let Some(path) = checkpoint {
            load_checkpoint(path)?.restore(model.as_mut())?;
            info!(path = %path.display(), "restored checkpoint");
        }

        let context = self.load_test_context()?;
        let dishes = context.dish_names();
        let report = test_dishes(
            &context,
            &dishes,
            model.as_mut(),
            &self.prediction_dir(),
            &self.config.output.prediction_suffix,
        )?;
        Ok(report)
    }

    /// Scores the prediction files in `prediction_dir` against the test
    /// corpus gold tables.
    pub fn evaluate(&self, prediction_dir: impl Into<PathBuf>) -> Result<EvaluationReport, SdkError> {
        Ok(MetricsAggregator::from_config(&self.config, prediction_dir).run()?)
    }
}
