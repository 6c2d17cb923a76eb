use evaluation::{EvalError, MetricsAggregator, AGGREGATE_DIVISOR};
use recipe_align_core::error::{AlignError, ErrorCode};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

const HEADER: &str = "file1\ttoken1\tfile2\ttoken2\n";

fn write_gold(root: &Path, dish: &str, rows: &[(&str, &str, &str, &str)]) {
    let dir = root.join(dish);
    fs::create_dir_all(dir.join("recipes")).unwrap();
    fs::write(dir.join("alignments.tsv"), tsv(rows)).unwrap();
}

fn write_prediction(dir: &Path, dish: &str, rows: &[(&str, &str, &str, &str)]) {
    fs::write(dir.join(format!("{dish}_prediction.tsv")), tsv(rows)).unwrap();
}

fn tsv(rows: &[(&str, &str, &str, &str)]) -> String {
    let mut out = HEADER.to_string();
    for (r1, a, r2, label) in rows {
        out.push_str(&format!("{r1}\t{a}\t{r2}\t{label}\n"));
    }
    out
}

#[test]
fn test_identical_predictions_score_one() {
    let test_root = tempdir().unwrap();
    let predictions = tempdir().unwrap();
    let rows = [("tea_1", "1", "tea_2", "0"), ("tea_1", "2", "tea_2", "1")];
    write_gold(test_root.path(), "tea", &rows);
    write_prediction(predictions.path(), "tea", &rows);

    let report = MetricsAggregator::new(test_root.path(), predictions.path(), "_prediction.tsv")
        .run()
        .unwrap();

    assert!(report.failures.is_empty());
    let tea = &report.dishes["tea"];
    assert_eq!(tea.dish, "tea");
    assert_eq!(tea.metrics.accuracy, 1.0);
    assert_eq!(tea.metrics.precision, 1.0);
    assert_eq!(tea.metrics.recall, 1.0);
    assert_eq!(tea.metrics.f1, 1.0);
    assert_eq!(report.aggregate.accuracy, 1.0 / AGGREGATE_DIVISOR);
}

#[test]
fn test_count_mismatch_is_reported_not_fatal() {
    let test_root = tempdir().unwrap();
    let predictions = tempdir().unwrap();
    write_gold(
        test_root.path(),
        "tea",
        &[
            ("tea_1", "1", "tea_2", "1"),
            ("tea_1", "2", "tea_2", "2"),
            ("tea_1", "3", "tea_2", "3"),
        ],
    );
    write_prediction(
        predictions.path(),
        "tea",
        &[("tea_1", "1", "tea_2", "1"), ("tea_1", "3", "tea_2", "3")],
    );

    let report = MetricsAggregator::new(test_root.path(), predictions.path(), "_prediction.tsv")
        .run()
        .unwrap();

    let tea = &report.dishes["tea"];
    assert!(tea.count_mismatch());
    assert_eq!((tea.gold_count, tea.prediction_count, tea.evaluated), (3, 2, 2));
    assert_eq!(tea.metrics.accuracy, 1.0);
}

fn write_scored_prediction(dir: &Path, dish: &str, rows: &[(&str, &str, &str, &str, &str)]) {
    let mut out = "recipe1\taction_id\trecipe2\tpredicted_label\tgold_label\n".to_string();
    for (r1, a, r2, predicted, gold) in rows {
        out.push_str(&format!("{r1}\t{a}\t{r2}\t{predicted}\t{gold}\n"));
    }
    fs::write(dir.join(format!("{dish}_prediction.tsv")), out).unwrap();
}

#[test]
fn test_wrapped_prediction_labels_are_unwrapped() {
    let test_root = tempdir().unwrap();
    let predictions = tempdir().unwrap();
    write_gold(
        test_root.path(),
        "tea",
        &[("tea_1", "1", "tea_2", "0"), ("tea_1", "2", "tea_2", "12")],
    );
    write_scored_prediction(
        predictions.path(),
        "tea",
        &[("tea_1", "1", "tea_2", "[0]", "0.91"), ("tea_1", "2", "tea_2", "'12',", "0.40")],
    );

    let report = MetricsAggregator::new(test_root.path(), predictions.path(), "_prediction.tsv")
        .run()
        .unwrap();
    assert_eq!(report.dishes["tea"].metrics.accuracy, 1.0);
}

#[test]
fn test_string_action_ids_are_compared_whole() {
    let test_root = tempdir().unwrap();
    let predictions = tempdir().unwrap();
    write_gold(
        test_root.path(),
        "tea",
        &[("tea_1", "s1", "tea_2", "s12"), ("tea_1", "s2", "tea_2", "s20")],
    );
    write_scored_prediction(
        predictions.path(),
        "tea",
        &[("tea_1", "s1", "tea_2", "s13", "s12"), ("tea_1", "s2", "tea_2", "s21", "s20")],
    );

    let report = MetricsAggregator::new(test_root.path(), predictions.path(), "_prediction.tsv")
        .run()
        .unwrap();
    assert!(report.failures.is_empty());
    assert_eq!(report.dishes["tea"].metrics.accuracy, 0.0);
}

#[test]
fn test_failing_dish_does_not_stop_others() {
    let test_root = tempdir().unwrap();
    let predictions = tempdir().unwrap();
    let curry = [("curry_1", "1", "curry_2", "1"), ("curry_1", "2", "curry_2", "2")];
    let tea = [("tea_1", "1", "tea_2", "1"), ("tea_1", "2", "tea_2", "2")];
    let salad = [("salad_1", "1", "salad_2", "1")];
    write_gold(test_root.path(), "curry", &curry);
    write_gold(test_root.path(), "tea", &tea);
    write_gold(test_root.path(), "salad", &salad);

    // Same size as gold but a different key.
    write_prediction(
        predictions.path(),
        "curry",
        &[("curry_1", "1", "curry_2", "1"), ("curry_1", "7", "curry_2", "2")],
    );
    write_prediction(
        predictions.path(),
        "tea",
        &[("tea_1", "1", "tea_2", "1"), ("tea_1", "2", "tea_2", "1")],
    );
    fs::create_dir(predictions.path().join("nested_prediction.tsv")).unwrap();

    let report = MetricsAggregator::new(test_root.path(), predictions.path(), "_prediction.tsv")
        .run()
        .unwrap();

    assert_eq!(report.dishes.keys().collect::<Vec<_>>(), vec!["tea"]);
    assert_eq!(report.dishes["tea"].metrics.accuracy, 0.5);

    let failed: Vec<&str> = report.failures.iter().map(|f| f.dish.as_str()).collect();
    assert_eq!(failed, vec!["curry", "salad"]);
    assert!(matches!(
        report.failures[0].error,
        EvalError::MissingPrediction { ref action_id, .. } if action_id == "2"
    ));
    assert!(matches!(
        report.failures[1].error,
        EvalError::MissingPredictionFile { .. }
    ));
    assert_eq!(report.failures[1].error.error_code(), ErrorCode::NotFound);
}

#[test]
fn test_aggregate_divides_by_fixed_constant() {
    let test_root = tempdir().unwrap();
    let predictions = tempdir().unwrap();
    for dish in ["bread", "curry", "tea"] {
        let r1 = format!("{dish}_1");
        let r2 = format!("{dish}_2");
        let rows = [(r1.as_str(), "1", r2.as_str(), "1")];
        write_gold(test_root.path(), dish, &rows);
        write_prediction(predictions.path(), dish, &rows);
    }

    let report = MetricsAggregator::new(test_root.path(), predictions.path(), "_prediction.tsv")
        .run()
        .unwrap();

    assert_eq!(report.dishes.len(), 3);
    assert_eq!(report.aggregate.accuracy, 1.5);
    assert_eq!(report.aggregate.f1, 1.5);
}

#[test]
fn test_missing_test_root_aborts() {
    let predictions = tempdir().unwrap();
    let err = MetricsAggregator::new("/nonexistent/test/root", predictions.path(), "_prediction.tsv")
        .run()
        .unwrap_err();
    assert!(matches!(err, EvalError::Corpus(_)));
}
