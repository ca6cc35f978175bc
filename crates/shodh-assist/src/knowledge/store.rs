//! Persistent table stores backing the knowledge base.

use anyhow::{Context, Result};
use calamine::open_workbook_auto;
use parking_lot::Mutex;
use rust_xlsxwriter::Workbook;
use std::path::{Path, PathBuf};

use crate::processing::table::{first_sheet, Table};

/// Where the authoritative knowledge table lives between sessions.
///
/// `read` returns `Ok(None)` when nothing has been persisted yet and `Err`
/// when something exists but cannot be parsed.
pub trait KnowledgeStore: Send + Sync {
    fn read(&self) -> Result<Option<Table>>;
    fn write(&self, table: &Table) -> Result<()>;
    /// Human-readable location for diagnostics.
    fn location(&self) -> String;
}

/// Single-sheet xlsx workbook on disk.
#[derive(Debug, Clone)]
pub struct XlsxStore {
    path: PathBuf,
}

impl XlsxStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn staging_path(&self) -> PathBuf {
        let name = self
            .path
            .file_stem()
            .and_then(|n| n.to_str())
            .unwrap_or("knowledge");
        self.path.with_file_name(format!(".{}.staging.xlsx", name))
    }
}

impl KnowledgeStore for XlsxStore {
    fn read(&self) -> Result<Option<Table>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let mut workbook = open_workbook_auto(&self.path)
            .with_context(|| format!("Failed to open workbook: {}", self.path.display()))?;
        first_sheet(&mut workbook).map(Some)
    }

    fn write(&self, table: &Table) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        for (col, header) in table.headers.iter().enumerate() {
            let col = u16::try_from(col).context("Table has too many columns for a worksheet")?;
            sheet.write_string(0, col, header.as_str())?;
        }
        for (r, row) in table.rows.iter().enumerate() {
            let r = u32::try_from(r + 1).context("Table has too many rows for a worksheet")?;
            for (col, value) in row.iter().enumerate() {
                if value.is_empty() {
                    continue;
                }
                let col = u16::try_from(col).context("Table has too many columns for a worksheet")?;
                sheet.write_string(r, col, value.as_str())?;
            }
        }

        // Stage then rename so readers never open a half-written workbook
        let staging = self.staging_path();
        workbook
            .save(&staging)
            .with_context(|| format!("Failed to write workbook: {}", staging.display()))?;
        if let Err(e) = std::fs::rename(&staging, &self.path) {
            std::fs::remove_file(&staging).ok();
            return Err(e).with_context(|| format!("Failed to replace {}", self.path.display()));
        }

        tracing::info!(
            path = %self.path.display(),
            rows = table.rows.len(),
            "Knowledge table persisted"
        );
        Ok(())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

/// In-process store, for hosts that keep the table elsewhere and for tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    table: Mutex<Option<Table>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(table: Table) -> Self {
        Self {
            table: Mutex::new(Some(table)),
        }
    }
}

impl KnowledgeStore for MemoryStore {
    fn read(&self) -> Result<Option<Table>> {
        Ok(self.table.lock().clone())
    }

    fn write(&self, table: &Table) -> Result<()> {
        *self.table.lock() = Some(table.clone());
        Ok(())
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("shodh-assist-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn sample() -> Table {
        Table::new(
            vec!["Question".into(), "Response".into(), "Notes".into()],
            vec![
                vec!["I have a fever".into(), "Drink fluids and rest".into(), String::new()],
                vec!["headache".into(), "Rest in a dark room".into(), "mild".into()],
            ],
        )
    }

    #[test]
    fn test_missing_file_reads_as_absent() {
        let dir = scratch_dir();
        let store = XlsxStore::new(dir.join("knowledge.xlsx"));
        assert!(store.read().unwrap().is_none());
        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_xlsx_store_round_trips_all_columns() {
        let dir = scratch_dir();
        let store = XlsxStore::new(dir.join("nested").join("knowledge.xlsx"));
        store.write(&sample()).unwrap();

        let table = store.read().unwrap().unwrap();
        assert_eq!(table.headers, vec!["Question", "Response", "Notes"]);
        assert_eq!(table.cell(0, 0), "I have a fever");
        assert_eq!(table.cell(1, 2), "mild");
        assert!(!store.staging_path().exists());
        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_failed_rename_cleans_up_staging() {
        let dir = scratch_dir();
        // A non-empty directory at the target path makes the rename fail
        let path = dir.join("knowledge.xlsx");
        std::fs::create_dir_all(path.join("occupied")).unwrap();

        let store = XlsxStore::new(&path);
        assert!(store.write(&sample()).is_err());
        assert!(!store.staging_path().exists());
        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_too_wide_table_is_an_error() {
        let dir = scratch_dir();
        let store = XlsxStore::new(dir.join("knowledge.xlsx"));
        let headers: Vec<String> = (0..=u16::MAX as usize + 1).map(|i| format!("c{}", i)).collect();
        assert!(store.write(&Table::new(headers, Vec::new())).is_err());
        assert!(!store.path().exists());
        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = scratch_dir();
        let path = dir.join("knowledge.xlsx");
        std::fs::write(&path, b"not a zip").unwrap();
        assert!(XlsxStore::new(&path).read().is_err());
        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryStore::new();
        assert!(store.read().unwrap().is_none());
        store.write(&sample()).unwrap();
        assert_eq!(store.read().unwrap(), Some(sample()));
    }
}
