use crate::baselines::{CosineSimilarityModel, SequenceModel};
use crate::bilinear::BilinearAlignmentModel;
use crate::model::ScoringModel;
use crate::naive::NaiveModel;
use recipe_align_core::error::{AlignError, ErrorCode};
use recipe_align_core::model::Dish;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use thiserror::Error;

pub const DEFAULT_MODEL_VERSION: &str = "1.0.0";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("model not found: {0}")]
    ModelNotFound(String),
    #[error("version not found for model {model_id}: {version}")]
    VersionNotFound { model_id: String, version: String },
    #[error("model version already exists for model {model_id}: {version}")]
    VersionAlreadyExists { model_id: String, version: String },
}

impl AlignError for RegistryError {
    fn error_code(&self) -> ErrorCode {
        match self {
            RegistryError::VersionAlreadyExists { .. } => ErrorCode::InvalidArgument,
            _ => ErrorCode::NotFound,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ModelContext<'a> {
    pub embedding_dim: usize,
    pub training_dishes: &'a [&'a Dish],
}

pub type ModelFactory =
    Arc<dyn Fn(&ModelContext<'_>) -> anyhow::Result<Box<dyn ScoringModel>> + Send + Sync>;

#[derive(Clone)]
pub struct ResolvedModel {
    pub model_id: String,
    pub version: String,
    factory: ModelFactory,
}

impl ResolvedModel {
    pub fn build(&self, context: &ModelContext<'_>) -> anyhow::Result<Box<dyn ScoringModel>> {
        (self.factory)(context)
    }
}

impl std::fmt::Debug for ResolvedModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedModel")
            .field("model_id", &self.model_id)
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

#[derive(Default)]
struct ModelFamily {
    versions: BTreeMap<String, ModelFactory>,
    active_version: Option<String>,
}

/// Named, versioned model factories. References take the form `name` (the
/// active version) or `name@version`.
#[derive(Default)]
pub struct ModelRegistry {
    families: HashMap<String, ModelFamily>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with every built-in model.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        register_default_models(&mut registry);
        registry
    }

    pub fn register(
        &mut self,
        model_id: impl Into<String>,
        version: impl Into<String>,
        factory: ModelFactory,
    ) -> Result<(), RegistryError> {
        let model_id = model_id.into();
        let version = version.into();
        let family = self.families.entry(model_id.clone()).or_default();

        if family.versions.contains_key(&version) {
            return Err(RegistryError::VersionAlreadyExists { model_id, version });
        }

        family.versions.insert(version.clone(), factory);

        // First registered version becomes active.
        if family.active_version.is_none() {
            family.active_version = Some(version);
        }

        Ok(())
    }

    pub fn activate(&mut self, model_id: &str, version: &str) -> Result<ResolvedModel, RegistryError> {
        let family = self
            .families
            .get_mut(model_id)
            .ok_or_else(|| RegistryError::ModelNotFound(model_id.to_string()))?;

        let factory = family.versions.get(version).cloned().ok_or_else(|| {
            RegistryError::VersionNotFound {
                model_id: model_id.to_string(),
                version: version.to_string(),
            }
        })?;
        family.active_version = Some(version.to_string());

        Ok(ResolvedModel {
            model_id: model_id.to_string(),
            version: version.to_string(),
            factory,
        })
    }

    pub fn resolve(&self, model_ref: &str) -> Result<ResolvedModel, RegistryError> {
        let (model_id, pinned_version) = parse_model_ref(model_ref);
        let family = self
            .families
            .get(model_id)
            .ok_or_else(|| RegistryError::ModelNotFound(model_id.to_string()))?;

        let version = match pinned_version {
            Some(v) => v.to_string(),
            None => family
                .active_version
                .clone()
                .ok_or_else(|| RegistryError::ModelNotFound(model_id.to_string()))?,
        };

        let factory = family.versions.get(&version).cloned().ok_or_else(|| {
            RegistryError::VersionNotFound {
                model_id: model_id.to_string(),
                version: version.clone(),
            }
        })?;

        Ok(ResolvedModel {
            model_id: model_id.to_string(),
            version,
            factory,
        })
    }

    pub fn model_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.families.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}

fn parse_model_ref(model_ref: &str) -> (&str, Option<&str>) {
    match model_ref.split_once('@') {
        Some((model_id, version)) if !model_id.is_empty() && !version.is_empty() => {
            (model_id, Some(version))
        }
        _ => (model_ref, None),
    }
}

/// Wraps an infallible constructor as a [`ModelFactory`].
pub fn factory<F, M>(build: F) -> ModelFactory
where
    F: Fn(&ModelContext<'_>) -> M + Send + Sync + 'static,
    M: ScoringModel + 'static,
{
    Arc::new(move |ctx: &ModelContext<'_>| Ok(Box::new(build(ctx)) as Box<dyn ScoringModel>))
}

pub fn register_default_models(registry: &mut ModelRegistry) {
    let defaults = [
        ("sequence", factory(|_| SequenceModel)),
        ("cosine-similarity", factory(|_| CosineSimilarityModel)),
        (
            "naive",
            factory(|ctx| NaiveModel::fit(ctx.training_dishes.iter().copied())),
        ),
        (
            "alignment-no-feature",
            factory(|ctx| BilinearAlignmentModel::new(ctx.embedding_dim, false)),
        ),
        (
            "alignment-with-feature",
            factory(|ctx| BilinearAlignmentModel::new(ctx.embedding_dim, true)),
        ),
    ];

    for (name, model_factory) in defaults {
        if let Err(err) = registry.register(name, DEFAULT_MODEL_VERSION, model_factory) {
            tracing::debug!(model = name, error = %err, "built-in model already registered");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_model_ref() {
        assert_eq!(parse_model_ref("naive@1.0.0"), ("naive", Some("1.0.0")));
        assert_eq!(parse_model_ref("naive"), ("naive", None));
        assert_eq!(parse_model_ref("naive@"), ("naive@", None));
    }

    #[test]
    fn test_register_duplicate_fails() {
        let mut registry = ModelRegistry::with_defaults();
        let err = registry
            .register("sequence", DEFAULT_MODEL_VERSION, factory(|_| SequenceModel))
            .unwrap_err();
        assert_eq!(
            err,
            RegistryError::VersionAlreadyExists {
                model_id: "sequence".to_string(),
                version: DEFAULT_MODEL_VERSION.to_string(),
            }
        );
        assert_eq!(err.error_code(), ErrorCode::InvalidArgument);
    }
}
