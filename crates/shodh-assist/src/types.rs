use serde::{Deserialize, Serialize};

/// Column holding the stored question text.
pub const QUESTION_COLUMN: &str = "Question";
/// Column holding the reply returned for a matched question.
pub const RESPONSE_COLUMN: &str = "Response";
/// Both columns a knowledge table must carry, exactly named.
pub const REQUIRED_COLUMNS: [&str; 2] = [QUESTION_COLUMN, RESPONSE_COLUMN];

pub const MIME_CSV: &str = "text/csv";
pub const MIME_XLSX: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const MIME_PDF: &str = "application/pdf";
pub const MIME_DOCX: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Declared media type of an uploaded artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaType {
    CSV,
    XLSX,
    PDF,
    DOCX,
    Other(String),
}

impl MediaType {
    pub fn from_mime(mime: &str) -> Self {
        // Parameters such as "; charset=utf-8" do not change the format
        let essence = mime.split(';').next().unwrap_or("").trim().to_lowercase();
        match essence.as_str() {
            MIME_CSV => Self::CSV,
            MIME_XLSX => Self::XLSX,
            MIME_PDF => Self::PDF,
            MIME_DOCX => Self::DOCX,
            _ => Self::Other(mime.to_string()),
        }
    }

    pub fn from_extension(ext: &str) -> Self {
        match ext.trim_start_matches('.').to_lowercase().as_str() {
            "csv" => Self::CSV,
            "xlsx" => Self::XLSX,
            "pdf" => Self::PDF,
            "docx" => Self::DOCX,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_mime(&self) -> &str {
        match self {
            Self::CSV => MIME_CSV,
            Self::XLSX => MIME_XLSX,
            Self::PDF => MIME_PDF,
            Self::DOCX => MIME_DOCX,
            Self::Other(raw) => raw,
        }
    }

    /// Short human name used in error messages.
    pub fn label(&self) -> &str {
        match self {
            Self::CSV => "CSV",
            Self::XLSX => "Excel workbook",
            Self::PDF => "PDF",
            Self::DOCX => "Word document",
            Self::Other(raw) => raw,
        }
    }
}
