//! Load and clean the two exports.
//!
//! Grants fit in memory and are returned as a table. Payments are streamed
//! into a caller-supplied sink so multi-gigabyte files never materialise.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::Serialize;

use crate::config::{GrantRecord, PaymentRecord};
use crate::data::records::{GrantColumns, PaymentColumns, RowIssue};
use crate::data::source::CsvSource;
use crate::error::{PipelineError, Result};

/// Number of skipped line numbers remembered per issue for logging.
const SAMPLE_LINES: usize = 5;

/// Row accounting for one load.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadReport {
    pub files: usize,
    pub rows_read: usize,
    pub rows_kept: usize,
    pub skipped: BTreeMap<String, usize>,
    #[serde(skip)]
    samples: BTreeMap<RowIssue, Vec<usize>>,
}

impl LoadReport {
    fn skip(&mut self, issue: RowIssue, line: usize) {
        *self.skipped.entry(issue.as_str().to_string()).or_insert(0) += 1;
        let sample = self.samples.entry(issue).or_default();
        if sample.len() < SAMPLE_LINES {
            sample.push(line);
        }
    }

    pub fn rows_skipped(&self) -> usize {
        self.skipped.values().sum()
    }

    fn log_skips(&self, what: &str) {
        for (issue, lines) in &self.samples {
            let count = self.skipped.get(issue.as_str()).copied().unwrap_or(0);
            log::warn!(
                "{what}: skipped {count} rows ({issue}), e.g. lines {:?}",
                lines
            );
        }
    }
}

/// Read, clean and return every usable grant row.
pub fn load_grants(path: &Path, delimiter: u8) -> Result<(Vec<GrantRecord>, LoadReport)> {
    let source = CsvSource::open(path, delimiter)?;
    let mut report = LoadReport {
        files: source.files().len(),
        ..Default::default()
    };
    let mut records = Vec::new();

    let rows_read = source.for_each_row(GrantColumns::resolve, |cols, row| {
        match cols.parse(row) {
            Ok(record) => records.push(record),
            Err(issue) => report.skip(issue, row.line),
        }
    })?;
    report.rows_read = rows_read;
    report.rows_kept = records.len();
    report.log_skips("grants");

    if records.is_empty() {
        return Err(PipelineError::empty("loading grants"));
    }

    log::info!(
        "grants: {} rows read, {} kept from {} file(s)",
        report.rows_read,
        report.rows_kept,
        report.files
    );
    Ok((records, report))
}

/// Stream cleaned, de-duplicated payment rows into `sink`.
pub fn stream_payments<F>(path: &Path, delimiter: u8, mut sink: F) -> Result<LoadReport>
where
    F: FnMut(PaymentRecord),
{
    let source = CsvSource::open(path, delimiter)?;
    let mut report = LoadReport {
        files: source.files().len(),
        ..Default::default()
    };
    let mut seen: HashSet<u64> = HashSet::new();

    let rows_read = source.for_each_row(PaymentColumns::resolve, |cols, row| {
        match cols.parse(row) {
            Ok(record) => {
                if seen.insert(record.fingerprint()) {
                    report.rows_kept += 1;
                    sink(record);
                } else {
                    report.skip(RowIssue::Duplicate, row.line);
                }
            }
            Err(issue) => report.skip(issue, row.line),
        }
    })?;
    report.rows_read = rows_read;
    report.log_skips("payments");

    if report.rows_kept == 0 {
        return Err(PipelineError::empty("loading payments"));
    }

    log::info!(
        "payments: {} rows read, {} kept from {} file(s)",
        report.rows_read,
        report.rows_kept,
        report.files
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn grants_skip_malformed_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "convenios.csv",
            "NOME ÓRGÃO CONCEDENTE;NOME CONVENENTE;VALOR CONVÊNIO;UF\n\
             A;X;100,00;SP\n\
             ;X;50,00;SP\n\
             A;Y;abc;RJ\n\
             B;Y;25,50;RJ\n",
        );
        let (records, report) = load_grants(&path, b';').unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(report.rows_read, 4);
        assert_eq!(report.rows_kept, 2);
        assert_eq!(report.rows_skipped(), 2);
        assert_eq!(report.skipped.get("missing agency"), Some(&1));
        assert_eq!(report.skipped.get("invalid value"), Some(&1));
    }

    #[test]
    fn grants_all_invalid_is_empty_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "convenios.csv",
            "NOME ÓRGÃO CONCEDENTE;NOME CONVENENTE;VALOR CONVÊNIO\n;;\n",
        );
        let err = load_grants(&path, b';').unwrap_err();
        assert!(matches!(err, PipelineError::EmptyDataset { .. }));
    }

    #[test]
    fn grants_missing_column_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "c.csv", "NOME CONVENENTE;VALOR CONVÊNIO\nX;1\n");
        let err = load_grants(&path, b';').unwrap_err();
        assert!(matches!(err, PipelineError::MissingColumn { .. }));
    }

    #[test]
    fn payments_drop_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "pagamentos.csv",
            "UF;CÓDIGO MUNICÍPIO SIAFI;NOME MUNICÍPIO;NIS FAVORECIDO;NOME FAVORECIDO;VALOR PARCELA\n\
             BA;3849;SALVADOR;1;JOSE;600,00\n\
             BA;3849;SALVADOR;1;JOSE;600,00\n\
             BA;3849;SALVADOR;2;ANA;-1,00\n\
             BA;3849;SALVADOR;3;RITA;650,00\n",
        );
        let mut kept = Vec::new();
        let report = stream_payments(&path, b';', |p| kept.push(p)).unwrap();
        assert_eq!(kept.len(), 2);
        assert_eq!(report.skipped.get("duplicate row"), Some(&1));
        assert_eq!(report.skipped.get("non-positive value"), Some(&1));
    }
}
