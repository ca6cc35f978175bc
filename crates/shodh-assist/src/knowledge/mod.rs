//! The curated (question, response) table and its lifecycle.

pub mod store;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{IngestError, SourceError};
use crate::processing::table::Table;
use crate::types::{QUESTION_COLUMN, RESPONSE_COLUMN};

pub use store::{KnowledgeStore, MemoryStore, XlsxStore};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    pub question: String,
    pub response: String,
}

/// Ordered knowledge entries. Duplicated questions are kept; lookups resolve
/// to the first one in storage order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeBase {
    entries: Vec<KnowledgeEntry>,
    /// True once built from a table carrying both required columns and at
    /// least one data row.
    valid: bool,
}

impl KnowledgeBase {
    /// A knowledge base with no dataset behind it.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from a table with both required columns. Rows whose question or
    /// response is blank are skipped. A header-only table yields a knowledge
    /// base that is not valid, matching how [`KnowledgeBase::load`] treats it.
    pub fn from_table(table: &Table) -> Result<Self, IngestError> {
        let (Some(q_col), Some(r_col)) = (table.column(QUESTION_COLUMN), table.column(RESPONSE_COLUMN))
        else {
            return Err(IngestError::MissingColumns {
                missing: table.missing_required(),
            });
        };

        let entries: Vec<KnowledgeEntry> = (0..table.rows.len())
            .filter_map(|row| {
                let question = table.cell(row, q_col);
                let response = table.cell(row, r_col);
                if question.trim().is_empty() || response.trim().is_empty() {
                    return None;
                }
                Some(KnowledgeEntry {
                    question: question.to_string(),
                    response: response.to_string(),
                })
            })
            .collect();

        let skipped = table.rows.len() - entries.len();
        if skipped > 0 {
            tracing::debug!(skipped, "Skipped rows with a blank question or response");
        }

        Ok(Self {
            entries,
            valid: !table.rows.is_empty(),
        })
    }

    pub fn from_entries(entries: Vec<KnowledgeEntry>) -> Self {
        Self {
            entries,
            valid: true,
        }
    }

    /// Read the persisted table, reporting why it could not be used.
    pub fn load(store: &dyn KnowledgeStore) -> Result<Self, SourceError> {
        let table = match store.read() {
            Ok(Some(table)) => table,
            Ok(None) => {
                return Err(SourceError::NotFound {
                    location: store.location(),
                })
            }
            Err(e) => {
                return Err(SourceError::Unreadable {
                    reason: format!("{:#}", e),
                })
            }
        };

        if table.is_empty() {
            return Err(SourceError::Empty);
        }

        Self::from_table(&table).map_err(|_| SourceError::MissingColumns {
            missing: table.missing_required(),
        })
    }

    /// Like [`KnowledgeBase::load`] but degrades to an empty knowledge base,
    /// handing the diagnostic back for display.
    pub fn load_or_empty(store: &dyn KnowledgeStore) -> (Self, Option<SourceError>) {
        match Self::load(store) {
            Ok(kb) => {
                tracing::info!(
                    entries = kb.len(),
                    location = %store.location(),
                    "Knowledge base loaded"
                );
                (kb, None)
            }
            Err(e) => {
                tracing::warn!(kind = ?e.kind(), "Knowledge base unavailable: {}", e);
                (Self::empty(), Some(e))
            }
        }
    }

    /// Whether a dataset with the required columns backs this knowledge base.
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn entries(&self) -> &[KnowledgeEntry] {
        &self.entries
    }

    pub fn questions(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.question.as_str())
    }

    /// Response of the first entry whose question equals `question` exactly.
    pub fn response_for(&self, question: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.question == question)
            .map(|e| e.response.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Current knowledge snapshot shared between the query path and ingestion.
///
/// Readers clone the `Arc`; a replace swaps in a fully built table, so a
/// reader sees either the old table or the new one.
#[derive(Debug, Default)]
pub struct KnowledgeHandle {
    current: RwLock<Arc<KnowledgeBase>>,
}

impl KnowledgeHandle {
    pub fn new(kb: KnowledgeBase) -> Self {
        Self {
            current: RwLock::new(Arc::new(kb)),
        }
    }

    pub fn snapshot(&self) -> Arc<KnowledgeBase> {
        self.current.read().clone()
    }

    pub fn swap(&self, kb: KnowledgeBase) -> Arc<KnowledgeBase> {
        let next = Arc::new(kb);
        *self.current.write() = next.clone();
        next
    }

    /// Validate `table`, persist it in full, then make it current.
    /// Nothing changes if validation or persistence fails.
    pub fn replace(
        &self,
        store: &dyn KnowledgeStore,
        table: &Table,
    ) -> Result<Arc<KnowledgeBase>, IngestError> {
        let kb = KnowledgeBase::from_table(table)?;

        store.write(table).map_err(|e| IngestError::Persist {
            reason: format!("{:#}", e),
        })?;

        tracing::info!(entries = kb.len(), "Knowledge base replaced");
        Ok(self.swap(kb))
    }
}
