//! Delimited-file access: input discovery, header resolution, lazy field decoding.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::data::normalize::{decode_field, header_key};
use crate::error::{PipelineError, Result};

/// One or more CSV files read in sequence as a single logical table.
#[derive(Debug, Clone)]
pub struct CsvSource {
    files: Vec<PathBuf>,
    delimiter: u8,
}

impl CsvSource {
    /// Open a single file, or every `*.csv` under a directory in path order.
    pub fn open(path: &Path, delimiter: u8) -> Result<Self> {
        let meta = std::fs::metadata(path).map_err(|e| PipelineError::io(path, e))?;

        let files = if meta.is_dir() {
            let mut files: Vec<PathBuf> = WalkDir::new(path)
                .follow_links(true)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
                .map(|e| e.into_path())
                .filter(|p| {
                    p.extension()
                        .map(|ext| ext.eq_ignore_ascii_case("csv"))
                        .unwrap_or(false)
                })
                .collect();
            files.sort();
            files
        } else {
            vec![path.to_path_buf()]
        };

        if files.is_empty() {
            return Err(PipelineError::io(
                path,
                std::io::Error::new(std::io::ErrorKind::NotFound, "no .csv files in directory"),
            ));
        }

        Ok(Self { files, delimiter })
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Visit every data row of every file. `on_header` runs once per file and
    /// resolves the column layout handed to `on_row`.
    pub fn for_each_row<C, H, F>(&self, mut on_header: H, mut on_row: F) -> Result<usize>
    where
        H: FnMut(&Header) -> Result<C>,
        F: FnMut(&C, &Row<'_>),
    {
        let mut rows = 0usize;

        for path in &self.files {
            let mut reader = csv::ReaderBuilder::new()
                .delimiter(self.delimiter)
                .has_headers(true)
                .flexible(true)
                .from_path(path)
                .map_err(|e| PipelineError::csv(path, e))?;

            let header_record = reader
                .byte_headers()
                .map_err(|e| PipelineError::csv(path, e))?
                .clone();
            let header = Header::from_record(&header_record, path);
            let columns = on_header(&header)?;

            log::debug!("{}: {} columns", path.display(), header.len());

            let mut record = csv::ByteRecord::new();
            let mut line = 0usize;
            while reader
                .read_byte_record(&mut record)
                .map_err(|e| PipelineError::csv(path, e))?
            {
                line += 1;
                rows += 1;
                on_row(
                    &columns,
                    &Row {
                        record: &record,
                        line,
                    },
                );
            }
        }

        Ok(rows)
    }
}

/// Header row of one file, keyed for accent- and case-insensitive lookup.
#[derive(Debug, Clone)]
pub struct Header {
    keys: Vec<String>,
    path: PathBuf,
}

impl Header {
    fn from_record(record: &csv::ByteRecord, path: &Path) -> Self {
        Self {
            keys: record
                .iter()
                .map(|field| header_key(&decode_field(field)))
                .collect(),
            path: path.to_path_buf(),
        }
    }

    /// Build a header from literal names (tests and in-memory sources).
    pub fn from_names(names: &[&str]) -> Self {
        Self {
            keys: names.iter().map(|n| header_key(n)).collect(),
            path: PathBuf::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn optional(&self, name: &str) -> Option<usize> {
        let key = header_key(name);
        self.keys.iter().position(|k| *k == key)
    }

    pub fn require(&self, name: &str) -> Result<usize> {
        self.optional(name)
            .ok_or_else(|| PipelineError::MissingColumn {
                column: name.to_string(),
                path: self.path.clone(),
            })
    }
}

/// A borrowed data row; fields are decoded on access.
pub struct Row<'a> {
    record: &'a csv::ByteRecord,
    /// 1-based data line within its file.
    pub line: usize,
}

impl<'a> Row<'a> {
    pub fn new(record: &'a csv::ByteRecord, line: usize) -> Self {
        Self { record, line }
    }

    /// Decoded, trimmed field; empty when the row is short.
    pub fn text(&self, idx: usize) -> String {
        self.record
            .get(idx)
            .map(|b| decode_field(b).trim().to_string())
            .unwrap_or_default()
    }

    /// Like [`Row::text`] for columns that may be absent from the header.
    pub fn text_opt(&self, idx: Option<usize>) -> String {
        idx.map(|i| self.text(i)).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn header_lookup_is_accent_insensitive() {
        let header = Header::from_names(&["NOME ÓRGÃO CONCEDENTE", "valor convenio", "UF"]);
        assert_eq!(header.optional("NOME ORGAO CONCEDENTE"), Some(0));
        assert_eq!(header.optional("VALOR CONVÊNIO"), Some(1));
        assert_eq!(header.optional("uf"), Some(2));
        assert!(header.require("NOME CONVENENTE").is_err());
    }

    #[test]
    fn open_missing_file_is_io_error() {
        let err = CsvSource::open(Path::new("/definitely/not/here.csv"), b';').unwrap_err();
        assert!(matches!(err, PipelineError::Io { .. }));
    }

    #[test]
    fn directory_sources_are_sorted() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.csv", "a.csv", "notes.txt"] {
            let mut f = std::fs::File::create(dir.path().join(name)).unwrap();
            writeln!(f, "X").unwrap();
        }
        let source = CsvSource::open(dir.path(), b';').unwrap();
        let names: Vec<_> = source
            .files()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.csv", "b.csv"]);
    }

    #[test]
    fn rows_decode_latin1_and_short_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("latin.csv");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(b"NOME;VALOR\nMINIST\xC9RIO;10,5\nSOZINHO\n").unwrap();
        drop(f);

        let source = CsvSource::open(&path, b';').unwrap();
        let mut seen = Vec::new();
        let rows = source
            .for_each_row(
                |h| Ok((h.require("NOME")?, h.require("VALOR")?)),
                |&(name, value), row| seen.push((row.line, row.text(name), row.text(value))),
            )
            .unwrap();

        assert_eq!(rows, 2);
        assert_eq!(seen[0], (1, "MINISTÉRIO".to_string(), "10,5".to_string()));
        assert_eq!(seen[1], (2, "SOZINHO".to_string(), String::new()));
    }
}
