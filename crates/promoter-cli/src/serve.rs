//! JSON-lines front end: one request per input line, one response per output line.
use anyhow::Result;
use std::io::{BufRead, Write};

use promoter_core::{PredictionRequest, PredictionResponse, PredictionService};

/// Answer one raw request line.
pub fn handle_line(service: &PredictionService, line: &str) -> PredictionResponse {
    match serde_json::from_str::<PredictionRequest>(line) {
        Ok(request) => service.handle(&request),
        Err(e) => PredictionResponse::error(400, format!("Invalid request: {}", e)),
    }
}

/// Serve requests until the reader is exhausted. Blank lines are ignored and
/// lines that are not UTF-8 are answered with a 400. Returns the number of
/// requests answered.
pub fn serve_lines<R: BufRead, W: Write>(
    service: &PredictionService,
    reader: R,
    mut writer: W,
) -> Result<usize> {
    let mut answered = 0;
    for raw in reader.split(b'\n') {
        let raw = raw?;
        let response = match String::from_utf8(raw) {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                handle_line(service, &line)
            }
            Err(e) => PredictionResponse::error(400, format!("Invalid request: {}", e)),
        };
        serde_json::to_writer(&mut writer, &response)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        answered += 1;
    }
    Ok(answered)
}
