use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::extract::{DocxParagraphExtractor, PageExtractor, ParagraphExtractor, PdfPageExtractor};
use super::table::Table;
use crate::error::IngestError;
use crate::types::MediaType;

/// Routing decision for a declared media type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentKind {
    DelimitedTable,
    SpreadsheetTable,
    PagedDocument,
    ParagraphDocument,
    Unsupported,
}

impl DocumentKind {
    pub fn classify(media_type: &MediaType) -> Self {
        match media_type {
            MediaType::CSV => Self::DelimitedTable,
            MediaType::XLSX => Self::SpreadsheetTable,
            MediaType::PDF => Self::PagedDocument,
            MediaType::DOCX => Self::ParagraphDocument,
            MediaType::Other(_) => Self::Unsupported,
        }
    }
}

/// One uploaded artifact awaiting classification.
#[derive(Debug, Clone)]
pub struct IngestionCandidate {
    pub bytes: Vec<u8>,
    pub media_type: MediaType,
}

impl IngestionCandidate {
    pub fn new(bytes: Vec<u8>, media_type: MediaType) -> Self {
        Self { bytes, media_type }
    }

    pub fn from_mime(bytes: Vec<u8>, mime: &str) -> Self {
        Self::new(bytes, MediaType::from_mime(mime))
    }
}

/// Result of normalizing one artifact.
#[derive(Debug, Clone, PartialEq)]
pub enum IngestionOutcome {
    /// A table carrying both required columns, ready to replace the knowledge base.
    TabularUpdate(Table),
    /// Extracted text for display only.
    FreeText(String),
    Rejected(IngestError),
}

impl IngestionOutcome {
    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }
}

/// Turns uploaded artifacts into tables or display text.
#[derive(Clone)]
pub struct DocumentNormalizer {
    pages: Arc<dyn PageExtractor>,
    paragraphs: Arc<dyn ParagraphExtractor>,
}

impl DocumentNormalizer {
    pub fn new() -> Self {
        Self {
            pages: Arc::new(PdfPageExtractor),
            paragraphs: Arc::new(DocxParagraphExtractor),
        }
    }

    pub fn with_extractors(
        pages: Arc<dyn PageExtractor>,
        paragraphs: Arc<dyn ParagraphExtractor>,
    ) -> Self {
        Self { pages, paragraphs }
    }

    pub fn normalize(&self, candidate: &IngestionCandidate) -> IngestionOutcome {
        let kind = DocumentKind::classify(&candidate.media_type);
        let label = candidate.media_type.label();

        let outcome = match kind {
            DocumentKind::DelimitedTable => match Table::from_csv(&candidate.bytes) {
                Ok(table) => Self::validate_table(table),
                Err(e) => IngestionOutcome::Rejected(IngestError::extraction(label, &e)),
            },
            DocumentKind::SpreadsheetTable => match Table::from_xlsx(&candidate.bytes) {
                Ok(table) => Self::validate_table(table),
                Err(e) => IngestionOutcome::Rejected(IngestError::extraction(label, &e)),
            },
            DocumentKind::PagedDocument => match self.pages.extract_pages(&candidate.bytes) {
                Ok(pages) => IngestionOutcome::FreeText(join_pages(pages)),
                Err(e) => IngestionOutcome::Rejected(IngestError::extraction(label, &e)),
            },
            DocumentKind::ParagraphDocument => {
                match self.paragraphs.extract_paragraphs(&candidate.bytes) {
                    Ok(paragraphs) => IngestionOutcome::FreeText(paragraphs.join("\n")),
                    Err(e) => IngestionOutcome::Rejected(IngestError::extraction(label, &e)),
                }
            }
            DocumentKind::Unsupported => IngestionOutcome::Rejected(IngestError::UnsupportedType {
                media_type: candidate.media_type.as_mime().to_string(),
            }),
        };

        match &outcome {
            IngestionOutcome::TabularUpdate(table) => {
                tracing::info!(kind = ?kind, rows = table.rows.len(), "Upload parsed as table")
            }
            IngestionOutcome::FreeText(text) => {
                tracing::info!(kind = ?kind, chars = text.len(), "Upload extracted as text")
            }
            IngestionOutcome::Rejected(err) => {
                tracing::warn!(kind = ?kind, "Upload rejected: {}", err)
            }
        }

        outcome
    }

    fn validate_table(table: Table) -> IngestionOutcome {
        let missing = table.missing_required();
        if missing.is_empty() {
            IngestionOutcome::TabularUpdate(table)
        } else {
            IngestionOutcome::Rejected(IngestError::MissingColumns { missing })
        }
    }
}

impl Default for DocumentNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Pages that yield no text are dropped before joining.
fn join_pages(pages: Vec<String>) -> String {
    pages
        .into_iter()
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
