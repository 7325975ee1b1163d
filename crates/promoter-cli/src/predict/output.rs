use anyhow::{Context, Result};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::predict::PredictionRow;

/// Write prediction rows as CSV, or TSV when the output path ends in `.tsv`.
/// Without an output path the table goes to stdout as CSV.
pub fn write_predictions(rows: &[PredictionRow], output_path: Option<&Path>) -> Result<()> {
    let (delimiter, sink): (u8, Box<dyn Write>) = match output_path {
        Some(path) => {
            let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("csv");
            let delimiter = match extension {
                "tsv" => b'\t',
                _ => b',',
            };
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {:?}", path))?;
            (delimiter, Box::new(BufWriter::new(file)))
        }
        None => (b',', Box::new(io::stdout().lock())),
    };

    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(sink);

    writer.write_record(["sequence_id", "model", "prediction"])?;
    for row in rows {
        writer.write_record([
            row.sequence_id.as_str(),
            row.model.as_str(),
            &row.prediction.to_string(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}
