pub mod baselines;
pub mod bilinear;
pub mod loss;
pub mod model;
pub mod naive;
pub mod optim;
pub mod registry;

pub use baselines::{CosineSimilarityModel, SequenceModel};
pub use bilinear::BilinearAlignmentModel;
pub use loss::{Criterion, CrossEntropyLoss};
pub use model::{argmax, Differentiable, ModelError, ScoreRequest, ScoringModel};
pub use naive::{ActionPairVocabulary, NaiveModel};
pub use optim::{Adam, Optimizer};
pub use registry::{
    factory, register_default_models, ModelContext, ModelFactory, ModelRegistry, RegistryError,
    ResolvedModel,
};

#[cfg(test)]
mod test_support;
