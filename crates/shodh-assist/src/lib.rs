pub mod assistant;
pub mod config;
pub mod conversation;
pub mod error;
pub mod knowledge;
pub mod matching;
pub mod processing;
pub mod types;

// Re-export primary types for convenience
pub use assistant::{Assistant, UploadReport};
pub use config::AssistConfig;
pub use conversation::{ConversationLog, ConversationTurn, Role};
pub use error::{ErrorKind, IngestError, SourceError};
pub use knowledge::{KnowledgeBase, KnowledgeEntry, KnowledgeHandle, KnowledgeStore, MemoryStore, XlsxStore};
pub use matching::{MatchEngine, MatchOutcome};
pub use processing::{DocumentKind, DocumentNormalizer, IngestionCandidate, IngestionOutcome, Table};
pub use types::MediaType;
