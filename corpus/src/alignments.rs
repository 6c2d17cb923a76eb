use crate::error::CorpusError;
use recipe_align_core::alignment::GoldRecord;
use std::path::Path;

/// One data row of a tab-separated table (header already skipped).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TsvRow {
    pub line: u64,
    pub fields: Vec<String>,
}

/// Reads a tab-separated file with one header row. Rows may have any width.
pub fn read_tsv_rows(path: &Path) -> Result<Vec<TsvRow>, CorpusError> {
    let csv_err = |source| CorpusError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .flexible(true)
        .quoting(false)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(csv_err)?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(csv_err)?;
        if record.iter().all(|field| field.is_empty()) {
            continue;
        }
        let line = record.position().map(|p| p.line()).unwrap_or_default();
        rows.push(TsvRow {
            line,
            fields: record.iter().map(str::to_string).collect(),
        });
    }
    Ok(rows)
}

/// Parses an alignment file: columns `file1, action_id, file2, gold_label, ...`.
pub fn read_alignment_file(path: &Path) -> Result<Vec<GoldRecord>, CorpusError> {
    read_tsv_rows(path)?
        .into_iter()
        .map(|row| {
            if row.fields.len() < 4 {
                return Err(CorpusError::MalformedRecord {
                    path: path.to_path_buf(),
                    line: row.line,
                    reason: format!("expected at least 4 columns, found {}", row.fields.len()),
                });
            }
            let mut fields = row.fields.into_iter();
            let mut next = || fields.next().unwrap_or_default();
            Ok(GoldRecord::new(next(), next(), next(), next()))
        })
        .collect()
}
