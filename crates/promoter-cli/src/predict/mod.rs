//! Batch prediction over FASTA input.
pub mod input;
pub mod output;

use anyhow::{anyhow, Result};

use promoter_core::{PredictionService, Stage};

use self::input::SequenceRecord;

/// One line of the result table.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionRow {
    pub sequence_id: String,
    pub model: String,
    pub prediction: u8,
}

#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub rows: Vec<PredictionRow>,
    pub predicted: usize,
    /// Records rejected by validation, with the reason.
    pub rejected: Vec<(String, String)>,
}

/// Predict every record against one organism's ensemble.
///
/// Invalid records are collected and skipped. Any failure past validation
/// (unknown organism, unloadable models, a failing model) aborts the batch,
/// since it would repeat for every remaining record.
pub fn predict_records(
    service: &PredictionService,
    records: &[SequenceRecord],
    organism: &str,
) -> Result<BatchOutcome> {
    let mut outcome = BatchOutcome::default();

    for record in records {
        match service.predict(&record.sequence, organism) {
            Ok(result) => {
                outcome.predicted += 1;
                for (model, label) in result.as_integers() {
                    outcome.rows.push(PredictionRow {
                        sequence_id: record.id.clone(),
                        model,
                        prediction: label,
                    });
                }
                for (model, cause) in &result.errors {
                    log::warn!("[promoter] {}: model '{}' failed: {}", record.id, model, cause);
                }
            }
            Err(err) if matches!(err.stage(), Stage::Validation | Stage::Encoding) => {
                log::warn!("[promoter] Skipping {}: {}", record.id, err);
                outcome.rejected.push((record.id.clone(), err.to_string()));
            }
            Err(err) => {
                return Err(anyhow::Error::new(err).context(format!(
                    "Prediction failed for {} ({})",
                    record.id, organism
                )));
            }
        }
    }

    if outcome.predicted == 0 && !records.is_empty() {
        return Err(anyhow!(
            "None of the {} record(s) could be predicted",
            records.len()
        ));
    }

    Ok(outcome)
}
