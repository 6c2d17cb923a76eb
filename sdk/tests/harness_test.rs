use recipe_align_core::config::AppConfig;
use recipe_align_core::error::{AlignError, ErrorCode};
use recipe_align_sdk::{AlignmentHarness, SdkError, PREDICTIONS_DIR};
use std::fs;
use std::path::Path;
use tempfile::{tempdir, TempDir};
use trainer::TrainerError;

fn write_recipe(dir: &Path, name: &str, tokens: &[&str]) {
    let actions: Vec<String> = tokens
        .iter()
        .enumerate()
        .map(|(i, _)| format!(r#"{{"id": "{}", "span": [{}, {}]}}"#, i + 1, i, i + 1))
        .collect();
    let tokens: Vec<String> = tokens.iter().map(|t| format!("\"{t}\"")).collect();
    fs::write(
        dir.join(format!("{name}.json")),
        format!(
            r#"{{"tokens": [{}], "actions": [{}]}}"#,
            tokens.join(", "),
            actions.join(", ")
        ),
    )
    .unwrap();
}

fn seed_dish(root: &Path, dish: &str) {
    let recipes = root.join(dish).join("recipes");
    fs::create_dir_all(&recipes).unwrap();
    write_recipe(&recipes, &format!("{dish}_1"), &["chop", "boil", "serve"]);
    write_recipe(&recipes, &format!("{dish}_2"), &["chop", "boil", "serve"]);
    fs::write(
        root.join(dish).join("alignments.tsv"),
        format!(
            "file1\ttoken1\tfile2\ttoken2\n\
             {dish}_1\t1\t{dish}_2\t1\n\
             {dish}_1\t2\t{dish}_2\t2\n\
             {dish}_1\t3\t{dish}_2\t3\n"
        ),
    )
    .unwrap();
}

struct Workspace {
    _dir: TempDir,
    config: AppConfig,
}

fn workspace(model: &str) -> Workspace {
    let dir = tempdir().unwrap();
    let train = dir.path().join("train");
    let test = dir.path().join("test");
    for dish in ["curry", "salad", "tea"] {
        seed_dish(&train, dish);
    }
    for dish in ["bread", "soup"] {
        seed_dish(&test, dish);
    }

    let mut config = AppConfig::default();
    config.corpus.train_root = train;
    config.corpus.test_root = test;
    config.training.model = model.to_string();
    config.training.embedding_dim = 4;
    config.training.num_folds = 2;
    config.training.num_epochs = 2;
    config.output.destination_root = dir.path().join("results");
    Workspace { _dir: dir, config }
}

#[test]
fn test_train_test_evaluate_pipeline() {
    let ws = workspace("alignment-no-feature@1.0.0");
    let harness = AlignmentHarness::new(ws.config.clone());
    assert_eq!(harness.model_name(), "alignment-no-feature");

    let cv = harness.cross_validate().unwrap();
    assert_eq!(cv.folds.len(), 2);
    let destination = ws.config.output.destination_root.join("alignment-no-feature");
    assert!(destination.join("model1.ckpt").is_file());
    assert!(destination.join("model2.ckpt").is_file());
    assert!(destination.join("fold_results_train.tsv").is_file());

    let tested = harness
        .test(Some(&destination.join("model2.ckpt")))
        .unwrap();
    assert_eq!(tested.dishes.len(), 2);
    assert_eq!(tested.num_actions, 6);
    let predictions = destination.join(PREDICTIONS_DIR);
    assert!(predictions.join("bread_prediction.tsv").is_file());
    assert!(predictions.join("soup_prediction.tsv").is_file());

    let evaluated = harness.evaluate(&predictions).unwrap();
    assert!(evaluated.failures.is_empty());
    assert_eq!(evaluated.dishes.len(), 2);
    let total_accuracy: f64 = evaluated.dishes.values().map(|d| d.metrics.accuracy).sum();
    assert!((evaluated.aggregate.accuracy - total_accuracy / 2.0).abs() < 1e-12);
    let expected = tested.correct_predictions as f64 / tested.num_actions as f64;
    assert!((total_accuracy / 2.0 - expected).abs() < 1e-12);
}

#[test]
fn test_baselines_are_not_cross_validated() {
    let ws = workspace("sequence");
    let harness = AlignmentHarness::new(ws.config.clone());

    let err = harness.cross_validate().unwrap_err();
    assert!(matches!(
        err,
        SdkError::Trainer(TrainerError::NotTrainable(ref name)) if name == "sequence"
    ));

    // Identical recipes make the positional baseline exact.
    let tested = harness.test(None).unwrap();
    assert_eq!(tested.correct_predictions, tested.num_actions);

    let evaluated = harness.evaluate(harness.prediction_dir()).unwrap();
    assert_eq!(evaluated.dishes["soup"].metrics.f1, 1.0);
}

#[test]
fn test_unknown_model_is_reported() {
    let ws = workspace("transformer");
    let err = AlignmentHarness::new(ws.config).cross_validate().unwrap_err();
    assert!(matches!(err, SdkError::Registry(_)));
    assert_eq!(err.error_code(), ErrorCode::NotFound);
}

#[test]
fn test_checkpoint_of_other_model_is_rejected() {
    let ws = workspace("alignment-no-feature");
    let trained = AlignmentHarness::new(ws.config.clone());
    trained.cross_validate().unwrap();
    let checkpoint = trained.destination().join("model1.ckpt");

    let mut config = ws.config.clone();
    config.training.model = "alignment-with-feature".to_string();
    let err = AlignmentHarness::new(config)
        .test(Some(&checkpoint))
        .unwrap_err();
    assert!(matches!(
        err,
        SdkError::Trainer(TrainerError::CheckpointMismatch { ref found, .. })
            if found == "alignment-no-feature"
    ));
    assert_eq!(err.error_code(), ErrorCode::InvalidArgument);
}
