use crate::domain::model::SourceRecord;
use crate::domain::ports::RowSource;
use crate::utils::error::{MigrationError, Result};
use csv::{ErrorKind, ReaderBuilder, StringRecord, StringRecordsIntoIter};
use indexmap::IndexMap;
use std::fs::File;
use std::io::Read;
use std::path::PathBuf;

/// Validates and streams rows from a CSV file with a header row.
#[derive(Debug, Clone)]
pub struct CsvReader {
    path: PathBuf,
}

impl CsvReader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn try_count_rows(&self) -> Result<usize> {
        let mut count = 0;
        for item in self.read_rows()? {
            match item {
                Ok(_) | Err(MigrationError::MalformedRow { .. }) => count += 1,
                Err(e) => return Err(e),
            }
        }
        Ok(count)
    }
}

impl RowSource for CsvReader {
    type Rows = RowIter<File>;

    fn location(&self) -> String {
        self.path.display().to_string()
    }

    fn validate(&self) -> Result<()> {
        if !self.path.exists() {
            return Err(MigrationError::NotFound {
                path: self.path.clone(),
            });
        }
        if !self.path.is_file() {
            return Err(MigrationError::NotAFile {
                path: self.path.clone(),
            });
        }
        tracing::debug!("File validated: {}", self.path.display());
        Ok(())
    }

    /// Number of non-blank rows. Only used for progress display, so any
    /// failure is logged and reported as 0.
    fn count_rows(&self) -> usize {
        match self.try_count_rows() {
            Ok(count) => count,
            Err(e) => {
                tracing::error!("Error counting rows: {}", e);
                0
            }
        }
    }

    /// Opens a fresh single-pass stream over the file.
    fn read_rows(&self) -> Result<RowIter<File>> {
        let file = File::open(&self.path).map_err(|e| MigrationError::ReadError {
            message: format!("cannot open {}: {}", self.path.display(), e),
        })?;
        RowIter::from_reader(file)
    }
}

fn read_error(e: csv::Error) -> MigrationError {
    MigrationError::ReadError {
        message: e.to_string(),
    }
}

/// Lazy row stream over any byte source.
///
/// Short rows leave trailing columns absent, extra cells are ignored, and
/// rows whose cells are all blank are skipped. An I/O failure is yielded
/// once as [`MigrationError::ReadError`] and ends the stream.
pub struct RowIter<R = File> {
    headers: StringRecord,
    records: StringRecordsIntoIter<R>,
    line: u64,
    done: bool,
}

impl<R: Read> RowIter<R> {
    /// Reads the header row from `source`; data rows are read on demand.
    pub fn from_reader(source: R) -> Result<Self> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(source);
        let headers = reader.headers().map_err(read_error)?.clone();
        Ok(Self {
            headers,
            records: reader.into_records(),
            line: 0,
            done: false,
        })
    }

    fn to_record(&self, row: &StringRecord) -> SourceRecord {
        // 多出的欄位忽略，缺少的欄位視為不存在
        let fields: IndexMap<String, String> = self
            .headers
            .iter()
            .zip(row.iter())
            .map(|(column, value)| (column.to_string(), value.to_string()))
            .collect();
        SourceRecord::new(self.line, fields)
    }
}

impl<R: Read> Iterator for RowIter<R> {
    type Item = Result<SourceRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        loop {
            let row = match self.records.next()? {
                Ok(row) => row,
                Err(e) => {
                    self.line += 1;
                    if matches!(e.kind(), ErrorKind::Io(_)) {
                        self.done = true;
                        return Some(Err(read_error(e)));
                    }
                    return Some(Err(MigrationError::MalformedRow {
                        line: self.line,
                        message: e.to_string(),
                    }));
                }
            };
            self.line += 1;

            let record = self.to_record(&row);
            if record.is_blank() {
                tracing::debug!("Skipping blank row {}", self.line);
                continue;
            }
            return Some(Ok(record));
        }
    }
}
