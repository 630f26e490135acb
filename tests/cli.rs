//! End-to-end tests of the `scamscan` binary on the listing fixtures.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use scamscan_brf::{BalancedForest, TreeLearner};
use tempfile::TempDir;

fn fixture_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("crates")
        .join("scamscan-io")
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn scamscan(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_scamscan"))
        .arg("--quiet")
        .args(args)
        .output()
        .unwrap()
}

fn train(out: &Path, experiment: &str, train_fraction: &str) -> Output {
    let legit = fixture_path("legit_listings.csv");
    let scam = fixture_path("scam_listings.csv");
    scamscan(&[
        "train",
        "--legit",
        legit.to_str().unwrap(),
        "--scam",
        scam.to_str().unwrap(),
        "--n-estimators",
        "5",
        "--train-fraction",
        train_fraction,
        "--experiment",
        experiment,
        "--output-dir",
        out.to_str().unwrap(),
    ])
}

fn stdout_json(output: &Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).unwrap()
}

#[test]
fn train_writes_model_and_evaluation() {
    let dir = TempDir::new().unwrap();
    let output = train(dir.path(), "full", "0.8");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let summary = stdout_json(&output);
    assert_eq!(summary["test_rows"], 4);
    assert!(dir.path().join("full_model.bin").exists());
    assert!(dir.path().join("full_evaluate.json").exists());
}

#[test]
fn train_without_withheld_rows_skips_evaluation() {
    let dir = TempDir::new().unwrap();
    let output = train(dir.path(), "all_rows", "1.0");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let summary = stdout_json(&output);
    assert_eq!(summary["test_rows"], 0);
    assert!(summary["f1"].is_null());
    assert!(summary["evaluation_path"].is_null());
    assert!(!dir.path().join("all_rows_evaluate.json").exists());

    let forest = BalancedForest::<TreeLearner>::load(dir.path().join("all_rows_model.bin")).unwrap();
    assert_eq!(forest.n_estimators(), 5);
    assert_eq!(forest.feature_names().unwrap().len(), 7);
}

#[test]
fn score_rejects_reordered_columns() {
    let dir = TempDir::new().unwrap();
    assert!(train(dir.path(), "order", "0.8").status.success());
    let model = dir.path().join("order_model.bin");

    let ok = scamscan(&[
        "score",
        "--model",
        model.to_str().unwrap(),
        "--features",
        fixture_path("scam_listings.csv").to_str().unwrap(),
        "--experiment",
        "order_ok",
        "--output-dir",
        dir.path().to_str().unwrap(),
    ]);
    assert!(ok.status.success(), "{}", String::from_utf8_lossy(&ok.stderr));
    assert_eq!(stdout_json(&ok)["n_rows"], 12);

    // Swap the first two columns of every line.
    let original = fs::read_to_string(fixture_path("scam_listings.csv")).unwrap();
    let swapped: String = original
        .lines()
        .map(|line| {
            let mut cells: Vec<&str> = line.split(',').collect();
            cells.swap(0, 1);
            cells.join(",") + "\n"
        })
        .collect();
    let swapped_path = dir.path().join("swapped.csv");
    fs::write(&swapped_path, swapped).unwrap();

    let rejected = scamscan(&[
        "score",
        "--model",
        model.to_str().unwrap(),
        "--features",
        swapped_path.to_str().unwrap(),
        "--experiment",
        "order_bad",
        "--output-dir",
        dir.path().to_str().unwrap(),
    ]);
    assert!(!rejected.status.success());
    assert!(String::from_utf8_lossy(&rejected.stderr).contains("do not match"));
    assert!(!dir.path().join("order_bad_scores.json").exists());
}
