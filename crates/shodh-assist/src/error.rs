//! Typed errors for the knowledge source and the ingestion pipeline.
//!
//! Every variant renders a message that is safe to show to the user as-is.

/// Coarse classification shared by all boundary errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Persisted knowledge source does not exist or cannot be read.
    SourceAbsent,
    /// Persisted knowledge source exists but is empty or has the wrong columns.
    SourceInvalid,
    /// Uploaded artifact was refused; the knowledge base is untouched.
    IngestionRejected,
    /// The underlying parser failed on the uploaded bytes.
    ExtractionFault,
}

/// Why the persisted knowledge table could not be loaded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    #[error("Database not found at {location}! Please upload a dataset in the 'Data Upload' section.")]
    NotFound { location: String },

    #[error("Error loading dataset: {reason}")]
    Unreadable { reason: String },

    #[error("The dataset is empty. Please upload a valid dataset.")]
    Empty,

    #[error("Dataset is missing required columns: {}. Please upload a valid dataset.", quote_all(.missing))]
    MissingColumns { missing: Vec<String> },
}

impl SourceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } | Self::Unreadable { .. } => ErrorKind::SourceAbsent,
            Self::Empty | Self::MissingColumns { .. } => ErrorKind::SourceInvalid,
        }
    }
}

/// Why an uploaded artifact did not produce a result.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IngestError {
    #[error("Unsupported file type: {media_type}")]
    UnsupportedType { media_type: String },

    #[error("Uploaded dataset must contain 'Question' and 'Response' columns (missing: {}).", quote_all(.missing))]
    MissingColumns { missing: Vec<String> },

    #[error("Error reading {format}: {reason}")]
    Extraction { format: String, reason: String },

    #[error("Error saving dataset: {reason}")]
    Persist { reason: String },
}

impl IngestError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Extraction { .. } => ErrorKind::ExtractionFault,
            Self::UnsupportedType { .. } | Self::MissingColumns { .. } | Self::Persist { .. } => {
                ErrorKind::IngestionRejected
            }
        }
    }

    pub(crate) fn extraction(format: &str, err: &anyhow::Error) -> Self {
        Self::Extraction {
            format: format.to_string(),
            // `{:#}` keeps the context chain on one line
            reason: format!("{:#}", err),
        }
    }
}

fn quote_all(names: &[String]) -> String {
    names
        .iter()
        .map(|n| format!("'{}'", n))
        .collect::<Vec<_>>()
        .join(" and ")
}
