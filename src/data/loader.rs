//! CSV loader with whitespace-normalized headers.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{bail, Context, Result};
use csv::{ReaderBuilder, StringRecord};
use tracing::debug;

/// A CSV file held in memory as untyped string cells.
#[derive(Debug, Clone)]
pub struct RawTable {
    headers: Vec<String>,
    index: HashMap<String, usize>,
    rows: Vec<StringRecord>,
}

impl RawTable {
    /// Read a CSV file from disk.
    pub fn from_path(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open input file: {}", path.display()))?;
        let table = Self::from_reader(file)
            .with_context(|| format!("Failed to read CSV file: {}", path.display()))?;

        debug!(
            path = %path.display(),
            rows = table.row_count(),
            columns = table.headers.len(),
            "Loaded CSV"
        );
        Ok(table)
    }

    /// Read CSV content from any reader. Header names are trimmed before indexing.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut reader = ReaderBuilder::new().flexible(true).from_reader(reader);

        let headers: Vec<String> = reader
            .headers()
            .context("Failed to read CSV header row")?
            .iter()
            .map(|h| h.trim_matches(|c: char| c.is_whitespace() || c == '\u{feff}').to_string())
            .collect();

        let mut index = HashMap::with_capacity(headers.len());
        for (i, name) in headers.iter().enumerate() {
            // First occurrence wins on duplicate header names
            index.entry(name.clone()).or_insert(i);
        }

        let rows = reader
            .records()
            .collect::<Result<Vec<_>, _>>()
            .context("Malformed CSV record")?;

        Ok(Self { headers, index, rows })
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Position of a column, if present.
    pub fn column(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Position of a column the analysis cannot run without.
    pub fn require_column(&self, name: &str) -> Result<usize> {
        match self.column(name) {
            Some(i) => Ok(i),
            None => bail!(
                "Missing required column '{}' (found: {})",
                name,
                self.headers.join(", ")
            ),
        }
    }

    pub fn rows(&self) -> impl Iterator<Item = &StringRecord> {
        self.rows.iter()
    }
}

/// Cell accessor that tolerates short rows and absent columns.
pub fn cell(row: &StringRecord, column: Option<usize>) -> Option<&str> {
    column.and_then(|i| row.get(i))
}
