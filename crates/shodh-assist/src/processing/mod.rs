pub mod extract;
pub mod normalizer;
pub mod table;

pub use extract::{DocxParagraphExtractor, PageExtractor, ParagraphExtractor, PdfPageExtractor};
pub use normalizer::{DocumentKind, DocumentNormalizer, IngestionCandidate, IngestionOutcome};
pub use table::Table;
