//! Integration tests for CLI config parsing, FASTA input, output tables and
//! the JSON-lines loop.

use std::fs;
use std::io::Cursor;

use clap::Command;
use promoter_cli::config::{load_service_config, service_args, service_config_from_arguments};
use promoter_cli::predict::input::read_fasta;
use promoter_cli::predict::output::write_predictions;
use promoter_cli::predict::{predict_records, PredictionRow};
use promoter_cli::serve::serve_lines;
use promoter_core::{EnsembleMode, PredictionService, ServiceConfig};

fn models_root() -> tempfile::TempDir {
    let root = tempfile::tempdir().unwrap();
    let dir = root.path().join("M_genitalium");
    fs::create_dir(&dir).unwrap();
    fs::write(dir.join("only.model"), r#"{"kind": "constant", "label": 1}"#).unwrap();
    root
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[test]
fn config_missing_fields_use_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("service.json");
    fs::write(&path, r#"{"models_dir": "/srv/models", "cache_models": "yes"}"#).unwrap();

    let config = load_service_config(&path).unwrap();
    assert_eq!(config.models_dir, std::path::PathBuf::from("/srv/models"));
    // invalid value falls back
    assert!(!config.cache_models);
    assert_eq!(config.ensemble_mode, EnsembleMode::AllOrNothing);
    assert_eq!(config.formats.len(), 3);
}

#[test]
fn config_nonexistent_file_errors() {
    assert!(load_service_config(std::path::Path::new("/nonexistent/service.json")).is_err());
}

#[test]
fn cli_flags_override_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("service.json");
    fs::write(&path, r#"{"models_dir": "/srv/models", "parallel_inference": true}"#).unwrap();

    let matches = Command::new("test")
        .args(service_args())
        .try_get_matches_from([
            "test",
            "--config",
            path.to_str().unwrap(),
            "--models-dir",
            "/tmp/other",
            "--cache",
            "--partial",
            "--sequential",
        ])
        .unwrap();
    let config = service_config_from_arguments(&matches).unwrap();
    assert_eq!(config.models_dir, std::path::PathBuf::from("/tmp/other"));
    assert!(config.cache_models);
    assert_eq!(config.ensemble_mode, EnsembleMode::Partial);
    assert!(!config.parallel_inference);
}

// ---------------------------------------------------------------------------
// FASTA batch
// ---------------------------------------------------------------------------

#[test]
fn fasta_records_are_read_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("in.fasta");
    fs::write(&path, ">a first\nACGT\nACGT\n>b\nTTTT\n").unwrap();

    let records = read_fasta(&path).unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].id, "a");
    assert_eq!(records[0].sequence, "ACGTACGT");
    assert_eq!(records[1].sequence, "TTTT");
}

#[test]
fn batch_skips_invalid_records() {
    let root = models_root();
    let service = PredictionService::new(&ServiceConfig::new(root.path()));
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("in.fasta");
    fs::write(&path, format!(">ok\n{}\n>bad\n{}\n", "T".repeat(150), "N".repeat(150))).unwrap();

    let records = read_fasta(&path).unwrap();
    let outcome = predict_records(&service, &records, "M_genitalium").unwrap();
    assert_eq!(outcome.predicted, 1);
    assert_eq!(outcome.rows.len(), 1);
    assert_eq!(outcome.rejected[0].0, "bad");
}

#[test]
fn batch_aborts_on_unknown_organism() {
    let root = models_root();
    let service = PredictionService::new(&ServiceConfig::new(root.path()));
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("in.fasta");
    fs::write(&path, format!(">ok\n{}\n", "T".repeat(150))).unwrap();

    let records = read_fasta(&path).unwrap();
    assert!(predict_records(&service, &records, "H_sapiens").is_err());
}

#[test]
fn csv_output_written_by_extension() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.csv");
    let rows = vec![PredictionRow {
        sequence_id: "seq, with comma".to_string(),
        model: "xgb".to_string(),
        prediction: 1,
    }];

    write_predictions(&rows, Some(&path)).unwrap();
    let content = fs::read_to_string(&path).unwrap();
    assert_eq!(content, "sequence_id,model,prediction\n\"seq, with comma\",xgb,1\n");
}

// ---------------------------------------------------------------------------
// JSON-lines
// ---------------------------------------------------------------------------

#[test]
fn serve_lines_skips_blank_lines() {
    let root = models_root();
    let service = PredictionService::new(&ServiceConfig::new(root.path()));
    let request = serde_json::json!({"sequence": "C".repeat(150), "organism": "M_genitalium"});
    let input = format!("{}\n\n{{\"sequence\": \"ACGT\"}}\n", request);

    let mut output = Vec::new();
    let answered = serve_lines(&service, Cursor::new(input), &mut output).unwrap();
    assert_eq!(answered, 2);

    let text = String::from_utf8(output).unwrap();
    let responses: Vec<serde_json::Value> =
        text.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
    assert_eq!(responses[0]["body"]["predictions"]["only"], 1);
    assert_eq!(responses[1]["status"], 400);
    assert!(responses[1]["body"]["detail"]
        .as_str()
        .unwrap()
        .starts_with("Invalid request"));
}

#[test]
fn serve_lines_survives_invalid_utf8() {
    let root = models_root();
    let service = PredictionService::new(&ServiceConfig::new(root.path()));
    let request = serde_json::json!({"sequence": "G".repeat(150), "organism": "M_genitalium"});

    let mut input = b"{\"sequence\": \"AC\xff\xfeGT\", \"organism\": \"M_genitalium\"}\n".to_vec();
    input.extend_from_slice(format!("{}\n", request).as_bytes());

    let mut output = Vec::new();
    let answered = serve_lines(&service, Cursor::new(input), &mut output).unwrap();
    assert_eq!(answered, 2);

    let text = String::from_utf8(output).unwrap();
    let responses: Vec<serde_json::Value> =
        text.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
    assert_eq!(responses[0]["status"], 400);
    assert!(responses[0]["body"]["detail"]
        .as_str()
        .unwrap()
        .starts_with("Invalid request"));
    assert_eq!(responses[1]["status"], 200);
    assert_eq!(responses[1]["body"]["predictions"]["only"], 1);
}
