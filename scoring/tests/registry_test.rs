use recipe_align_core::error::{AlignError, ErrorCode};
use scoring::{factory, ModelContext, ModelRegistry, RegistryError, SequenceModel};

fn context() -> ModelContext<'static> {
    ModelContext {
        embedding_dim: 4,
        training_dishes: &[],
    }
}

#[test]
fn test_defaults_cover_every_builtin_model() {
    let registry = ModelRegistry::with_defaults();
    assert_eq!(
        registry.model_ids(),
        vec![
            "alignment-no-feature",
            "alignment-with-feature",
            "cosine-similarity",
            "naive",
            "sequence",
        ]
    );

    for id in registry.model_ids() {
        let model = registry.resolve(id).unwrap().build(&context()).unwrap();
        assert_eq!(model.name(), id);
    }
}

#[test]
fn test_only_bilinear_models_are_trainable() {
    let registry = ModelRegistry::with_defaults();
    for (id, trainable) in [
        ("sequence", false),
        ("naive", false),
        ("alignment-no-feature", true),
        ("alignment-with-feature", true),
    ] {
        let mut model = registry.resolve(id).unwrap().build(&context()).unwrap();
        assert_eq!(model.as_differentiable().is_some(), trainable, "{id}");
    }
}

#[test]
fn test_builds_are_independent_instances() {
    let registry = ModelRegistry::with_defaults();
    let resolved = registry.resolve("alignment-no-feature@1.0.0").unwrap();

    let mut first = resolved.build(&context()).unwrap();
    let mut second = resolved.build(&context()).unwrap();
    first
        .as_differentiable()
        .unwrap()
        .load_parameters(&[0.0; 16])
        .unwrap();

    assert_eq!(second.as_differentiable().unwrap().parameters()[0], 1.0);
}

#[test]
fn test_resolve_pinned_and_active_versions() {
    let mut registry = ModelRegistry::with_defaults();
    registry
        .register("sequence", "2.0.0", factory(|_| SequenceModel))
        .unwrap();

    assert_eq!(registry.resolve("sequence").unwrap().version, "1.0.0");
    assert_eq!(registry.resolve("sequence@2.0.0").unwrap().version, "2.0.0");

    registry.activate("sequence", "2.0.0").unwrap();
    assert_eq!(registry.resolve("sequence").unwrap().version, "2.0.0");
}

#[test]
fn test_unknown_models_are_not_found() {
    let registry = ModelRegistry::with_defaults();

    let err = registry.resolve("transformer").unwrap_err();
    assert_eq!(err, RegistryError::ModelNotFound("transformer".to_string()));
    assert_eq!(err.error_code(), ErrorCode::NotFound);

    let err = registry.resolve("naive@9.9.9").unwrap_err();
    assert_eq!(
        err,
        RegistryError::VersionNotFound {
            model_id: "naive".to_string(),
            version: "9.9.9".to_string(),
        }
    );
}
