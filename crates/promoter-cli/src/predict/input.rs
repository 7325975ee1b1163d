use anyhow::{Context, Result};
use bio::io::fasta;
use std::fs::File;
use std::path::Path;

/// One named candidate sequence from a FASTA file.
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceRecord {
    pub id: String,
    pub sequence: String,
}

/// Read every record of a FASTA file. Sequences are passed on as written; the
/// validator decides whether they are usable.
pub fn read_fasta<P: AsRef<Path>>(path: P) -> Result<Vec<SequenceRecord>> {
    let path = path.as_ref();
    let file =
        File::open(path).with_context(|| format!("Failed to open FASTA file: {:?}", path))?;
    let reader = fasta::Reader::new(file);

    let mut records = Vec::new();
    for result in reader.records() {
        let record =
            result.with_context(|| format!("FASTA parsing error in {:?}", path))?;
        records.push(SequenceRecord {
            id: record.id().to_string(),
            sequence: String::from_utf8_lossy(record.seq()).into_owned(),
        });
    }

    log::info!("[promoter] Read {} record(s) from {:?}", records.len(), path);
    Ok(records)
}
