//! CLI binary smoke tests using assert_cmd.
//!
//! These tests exercise the compiled `promoter` binary against a temporary
//! models directory.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;

fn cmd() -> Command {
    Command::cargo_bin("promoter").unwrap()
}

fn models_root() -> tempfile::TempDir {
    let root = tempfile::tempdir().unwrap();
    let dir = root.path().join("E_coli");
    fs::create_dir(&dir).unwrap();
    fs::write(dir.join("model1.model"), r#"{"kind": "constant", "label": 1}"#).unwrap();
    fs::write(dir.join("model2.model"), r#"{"kind": "constant", "label": 0}"#).unwrap();
    root
}

fn models_arg(root: &Path) -> String {
    root.to_str().unwrap().to_string()
}

// ---------------------------------------------------------------------------
// Top-level
// ---------------------------------------------------------------------------

#[test]
fn no_args_shows_help() {
    cmd()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn help_flag() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("predict"))
        .stdout(predicate::str::contains("serve"));
}

#[test]
fn version_flag() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("promoter"));
}

// ---------------------------------------------------------------------------
// predict
// ---------------------------------------------------------------------------

#[test]
fn predict_requires_input() {
    cmd()
        .args(["predict", "--organism", "E_coli"])
        .assert()
        .failure();
}

#[test]
fn predict_single_sequence() {
    let root = models_root();
    cmd()
        .args(["predict", "--organism", "E_coli", "--models-dir"])
        .arg(models_arg(root.path()))
        .args(["--sequence", &"A".repeat(150)])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"model1\": 1"))
        .stdout(predicate::str::contains("\"model2\": 0"));
}

#[test]
fn predict_unknown_organism_fails() {
    let root = models_root();
    cmd()
        .args(["predict", "--organism", "unknown-organism", "--models-dir"])
        .arg(models_arg(root.path()))
        .args(["--sequence", &"A".repeat(150)])
        .assert()
        .failure()
        .stdout(predicate::str::contains("No models found for unknown-organism"));
}

#[test]
fn predict_fasta_to_tsv() {
    let root = models_root();
    let fasta = root.path().join("candidates.fa");
    fs::write(
        &fasta,
        format!(">seq1\n{}\n>short\nACGT\n", "ACGT".repeat(37) + "AC"),
    )
    .unwrap();
    let output = root.path().join("predictions.tsv");

    cmd()
        .args(["predict", "--organism", "E_coli", "--models-dir"])
        .arg(models_arg(root.path()))
        .arg("--fasta")
        .arg(&fasta)
        .arg("--output_file")
        .arg(&output)
        .assert()
        .success()
        .stderr(predicate::str::contains("Predicted 1 of 2 record(s)"));

    let table = fs::read_to_string(&output).unwrap();
    assert_eq!(
        table,
        "sequence_id\tmodel\tprediction\nseq1\tmodel1\t1\nseq1\tmodel2\t0\n"
    );
}

// ---------------------------------------------------------------------------
// Other subcommands
// ---------------------------------------------------------------------------

#[test]
fn serve_answers_each_line() {
    let root = models_root();
    let input = format!(
        "{}\nnot json\n",
        serde_json::json!({"sequence": "A".repeat(150), "organism": "E_coli"})
    );
    let assert = cmd()
        .args(["serve", "--models-dir"])
        .arg(models_arg(root.path()))
        .write_stdin(input)
        .assert()
        .success();

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let lines: Vec<serde_json::Value> = stdout
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["status"], 200);
    assert_eq!(lines[0]["body"]["predictions"]["model1"], 1);
    assert_eq!(lines[1]["status"], 400);
}

#[test]
fn encode_prints_features() {
    let assert = cmd()
        .args(["encode", "--sequence", &"A".repeat(150)])
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let features: Vec<f64> = serde_json::from_str(stdout.trim()).unwrap();
    assert_eq!(features.len(), 145);
}

#[test]
fn encode_rejects_bad_sequence() {
    cmd()
        .args(["encode", "--sequence", "ACGT"])
        .assert()
        .failure();
}

#[test]
fn organisms_and_models_listing() {
    let root = models_root();
    cmd()
        .args(["organisms", "--models-dir"])
        .arg(models_arg(root.path()))
        .assert()
        .success()
        .stdout(predicate::str::contains("E_coli"));

    cmd()
        .args(["models", "--organism", "E_coli", "--models-dir"])
        .arg(models_arg(root.path()))
        .assert()
        .success()
        .stdout(predicate::str::contains("model1\tgeneric-serialized"));
}
