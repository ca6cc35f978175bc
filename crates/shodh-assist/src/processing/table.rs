//! Tabular uploads: delimited text and spreadsheet workbooks parsed into one
//! header-plus-rows shape.

use anyhow::{anyhow, Context, Result};
use calamine::{Data, Range, Reader, Xlsx};
use serde::{Deserialize, Serialize};
use std::io::{Cursor, Read, Seek};

use crate::types::REQUIRED_COLUMNS;

/// A parsed table. The first non-empty row of the source becomes `headers`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    /// Index of the first column named exactly `name`.
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Required columns this table lacks, in canonical order.
    pub fn missing_required(&self) -> Vec<String> {
        REQUIRED_COLUMNS
            .iter()
            .filter(|name| self.column(name).is_none())
            .map(|name| name.to_string())
            .collect()
    }

    pub fn has_required_columns(&self) -> bool {
        self.missing_required().is_empty()
    }

    /// Cell at (`row`, `col`); short rows read as empty.
    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty() || self.rows.is_empty()
    }

    /// Parse comma-delimited text with a header row. Short rows are kept and
    /// read as empty in their missing cells; rows wider than the header fail.
    pub fn from_csv(bytes: &[u8]) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(bytes);

        let headers: Vec<String> = reader
            .headers()
            .context("Failed to read CSV header row")?
            .iter()
            .map(str::to_string)
            .collect();

        let mut rows = Vec::new();
        for (i, record) in reader.records().enumerate() {
            // +2: one-based and past the header line
            let record = record.with_context(|| format!("Malformed CSV at line {}", i + 2))?;
            if record.len() > headers.len() {
                return Err(anyhow!(
                    "Malformed CSV at line {}: expected {} fields, saw {}",
                    i + 2,
                    headers.len(),
                    record.len()
                ));
            }
            let row: Vec<String> = record.iter().map(str::to_string).collect();
            if row.iter().all(|c| c.trim().is_empty()) {
                continue;
            }
            rows.push(row);
        }

        Ok(Self { headers, rows })
    }

    /// Parse the first worksheet of an xlsx workbook held in memory.
    pub fn from_xlsx(bytes: &[u8]) -> Result<Self> {
        let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes.to_vec()))
            .context("Failed to open spreadsheet")?;
        first_sheet(&mut workbook)
    }

    pub(crate) fn from_range(range: &Range<Data>) -> Self {
        let mut rows = range
            .rows()
            .map(|row| row.iter().map(cell_to_string).collect::<Vec<String>>())
            .filter(|row| !row.iter().all(|c| c.is_empty()));

        let headers = rows.next().unwrap_or_default();
        Self {
            headers,
            rows: rows.collect(),
        }
    }
}

/// Read the first worksheet of any calamine workbook into a [`Table`].
pub(crate) fn first_sheet<R, RS>(workbook: &mut R) -> Result<Table>
where
    RS: Read + Seek,
    R: Reader<RS>,
    R::Error: std::error::Error + Send + Sync + 'static,
{
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| anyhow!("Spreadsheet has no sheets"))?
        .context("Failed to read first worksheet")?;

    let table = Table::from_range(&range);
    tracing::debug!(
        columns = table.headers.len(),
        rows = table.rows.len(),
        "Spreadsheet parsed"
    );
    Ok(table)
}

/// Convert a calamine cell to a clean string representation.
pub(crate) fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => {
            // Whole floats display as integers (1500.0 → "1500")
            if f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
                (*f as i64).to_string()
            } else {
                f.to_string()
            }
        }
        Data::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
        Data::Error(e) => format!("#ERR:{:?}", e),
        Data::DateTime(dt) => dt.to_string(),
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
    }
}
