//! Session-facing entry point tying the knowledge base, the normalizer and
//! the match engine together.

use std::sync::Arc;

use crate::config::AssistConfig;
use crate::conversation::{ConversationLog, Role};
use crate::error::{IngestError, SourceError};
use crate::knowledge::{KnowledgeBase, KnowledgeHandle, KnowledgeStore, XlsxStore};
use crate::matching::MatchEngine;
use crate::processing::{DocumentNormalizer, IngestionCandidate, IngestionOutcome, Table};

/// What an upload did, for display.
#[derive(Debug, Clone, PartialEq)]
pub enum UploadReport {
    /// The table replaced the knowledge base; `table` is the uploaded table.
    KnowledgeReplaced { table: Table, entries: usize },
    /// Extracted document text; the knowledge base is untouched.
    Text(String),
    Rejected(IngestError),
}

impl UploadReport {
    pub fn message(&self) -> String {
        match self {
            Self::KnowledgeReplaced { .. } => "Dataset uploaded and saved successfully!".to_string(),
            Self::Text(text) => text.clone(),
            Self::Rejected(err) => err.to_string(),
        }
    }
}

pub struct Assistant {
    store: Arc<dyn KnowledgeStore>,
    knowledge: KnowledgeHandle,
    normalizer: DocumentNormalizer,
    engine: MatchEngine,
}

impl Assistant {
    /// Open the workbook named by `config`. A missing or unusable workbook is
    /// not fatal: the assistant starts empty and the diagnostic is returned.
    pub fn open(config: &AssistConfig) -> (Self, Option<SourceError>) {
        Self::with_store(config, Arc::new(XlsxStore::new(&config.knowledge_file)))
    }

    pub fn with_store(
        config: &AssistConfig,
        store: Arc<dyn KnowledgeStore>,
    ) -> (Self, Option<SourceError>) {
        let (kb, diagnostic) = KnowledgeBase::load_or_empty(store.as_ref());
        let assistant = Self {
            store,
            knowledge: KnowledgeHandle::new(kb),
            normalizer: DocumentNormalizer::new(),
            engine: MatchEngine::from_config(config),
        };
        (assistant, diagnostic)
    }

    pub fn with_normalizer(mut self, normalizer: DocumentNormalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    pub fn engine(&self) -> &MatchEngine {
        &self.engine
    }

    /// Answer one query, recording the user turn and then the reply.
    pub fn ask(&self, log: &mut ConversationLog, query: &str) -> String {
        log.append(Role::User, query);
        let kb = self.knowledge.snapshot();
        let outcome = self.engine.evaluate(query, &kb);
        tracing::debug!(session = log.session_id(), outcome = ?outcome, "Query answered");
        let reply = self.engine.reply(&outcome);
        log.append(Role::Assistant, reply.as_str());
        reply
    }

    /// Normalize an upload; a valid table replaces the knowledge base in full.
    pub fn upload(&self, candidate: &IngestionCandidate) -> UploadReport {
        match self.normalizer.normalize(candidate) {
            IngestionOutcome::TabularUpdate(table) => {
                match self.knowledge.replace(self.store.as_ref(), &table) {
                    Ok(kb) => UploadReport::KnowledgeReplaced {
                        entries: kb.len(),
                        table,
                    },
                    Err(e) => {
                        tracing::warn!("Dataset not saved: {}", e);
                        UploadReport::Rejected(e)
                    }
                }
            }
            IngestionOutcome::FreeText(text) => UploadReport::Text(text),
            IngestionOutcome::Rejected(e) => UploadReport::Rejected(e),
        }
    }

    /// Current knowledge snapshot, for a database overview.
    pub fn overview(&self) -> Arc<KnowledgeBase> {
        self.knowledge.snapshot()
    }

    /// Persisted table as stored, including columns beyond the required two.
    pub fn stored_table(&self) -> Result<Option<Table>, SourceError> {
        self.store.read().map_err(|e| SourceError::Unreadable {
            reason: format!("{:#}", e),
        })
    }

    /// Re-read the persisted source and make it current.
    pub fn reload(&self) -> Option<SourceError> {
        let (kb, diagnostic) = KnowledgeBase::load_or_empty(self.store.as_ref());
        self.knowledge.swap(kb);
        diagnostic
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::knowledge::MemoryStore;
    use crate::types::MediaType;

    fn assistant_with(csv: Option<&[u8]>) -> (Assistant, Arc<MemoryStore>) {
        let store = Arc::new(match csv {
            Some(bytes) => MemoryStore::with_table(Table::from_csv(bytes).unwrap()),
            None => MemoryStore::new(),
        });
        let config = AssistConfig::with_data_dir("/tmp/shodh-assist-test");
        let (assistant, _) = Assistant::with_store(&config, store.clone());
        (assistant, store)
    }

    fn csv_upload(bytes: &[u8]) -> IngestionCandidate {
        IngestionCandidate::new(bytes.to_vec(), MediaType::CSV)
    }

    #[test]
    fn test_ask_logs_both_turns() {
        let (assistant, _) = assistant_with(Some(b"Question,Response\nI have a fever,Drink fluids and rest\n"));
        let mut log = ConversationLog::new();

        let reply = assistant.ask(&mut log, "I have a fever");
        assert_eq!(reply, "Drink fluids and rest");

        let turns = log.all();
        assert_eq!(turns.len(), 2);
        assert_eq!((turns[0].role, turns[0].text.as_str()), (Role::User, "I have a fever"));
        assert_eq!((turns[1].role, turns[1].text.as_str()), (Role::Assistant, "Drink fluids and rest"));
    }

    #[test]
    fn test_starts_empty_when_source_missing() {
        let store = Arc::new(MemoryStore::new());
        let config = AssistConfig::with_data_dir("/tmp/shodh-assist-test");
        let (assistant, diagnostic) = Assistant::with_store(&config, store);
        assert_eq!(diagnostic.map(|d| d.kind()), Some(ErrorKind::SourceAbsent));

        let mut log = ConversationLog::new();
        assert_eq!(assistant.ask(&mut log, "hello"), "Hello! How can I assist you today?");
        assert!(assistant.ask(&mut log, "fever").contains("no valid dataset"));
    }

    #[test]
    fn test_upload_replaces_knowledge() {
        let (assistant, store) = assistant_with(Some(b"Question,Response\nwhat should I eat,old answer\n"));
        let mut log = ConversationLog::new();
        assert_eq!(assistant.ask(&mut log, "what should I eat"), "old answer");

        let report = assistant.upload(&csv_upload(b"Question,Response,Notes\nI have a fever,new answer,x\n"));
        match &report {
            UploadReport::KnowledgeReplaced { table, entries } => {
                assert_eq!(*entries, 1);
                assert_eq!(table.headers.len(), 3);
            }
            other => panic!("expected replacement, got {:?}", other),
        }
        assert!(report.message().contains("successfully"));

        assert_eq!(assistant.ask(&mut log, "I have a fever"), "new answer");
        assert!(assistant.ask(&mut log, "what should I eat").contains("couldn't find relevant data"));
        assert_eq!(store.read().unwrap().unwrap().headers[2], "Notes");
    }

    #[test]
    fn test_upload_missing_response_leaves_knowledge() {
        let (assistant, store) = assistant_with(Some(b"Question,Response\nfever,rest\n"));
        let report = assistant.upload(&csv_upload(b"Question,Answer\nfever,ignore me\n"));

        match report {
            UploadReport::Rejected(err) => assert_eq!(err.kind(), ErrorKind::IngestionRejected),
            other => panic!("expected rejection, got {:?}", other),
        }
        assert_eq!(assistant.overview().response_for("fever"), Some("rest"));
        assert_eq!(store.read().unwrap().unwrap().headers, vec!["Question", "Response"]);
    }

    #[test]
    fn test_header_only_upload_answers_same_after_reload() {
        let (assistant, _) = assistant_with(Some(b"Question,Response\nfever,rest\n"));
        let report = assistant.upload(&csv_upload(b"Question,Response\n"));
        assert!(matches!(report, UploadReport::KnowledgeReplaced { entries: 0, .. }));

        let mut log = ConversationLog::new();
        let before = assistant.ask(&mut log, "fever");
        assert!(before.contains("no valid dataset"));

        assert_eq!(assistant.reload(), Some(SourceError::Empty));
        assert_eq!(assistant.ask(&mut log, "fever"), before);
    }

    #[test]
    fn test_document_text_is_not_merged() {
        let (assistant, _) = assistant_with(Some(b"Question,Response\nfever,rest\n"));
        let bytes = crate::processing::extract::tests::docx_bytes(
            "<w:p><w:r><w:t>Question: headache</w:t></w:r></w:p>",
        );
        let report = assistant.upload(&IngestionCandidate::new(bytes, MediaType::DOCX));
        assert_eq!(report, UploadReport::Text("Question: headache".into()));
        assert_eq!(assistant.overview().len(), 1);
    }

    #[test]
    fn test_unsupported_upload() {
        let (assistant, _) = assistant_with(None);
        let report = assistant.upload(&IngestionCandidate::from_mime(vec![1, 2, 3], "image/png"));
        assert_eq!(report.message(), "Unsupported file type: image/png");
    }

    #[test]
    fn test_reload_picks_up_external_write() {
        let (assistant, store) = assistant_with(None);
        assert!(!assistant.overview().is_valid());

        store
            .write(&Table::from_csv(b"Question,Response\ncough,honey tea\n").unwrap())
            .unwrap();
        assert!(assistant.reload().is_none());

        let mut log = ConversationLog::new();
        assert_eq!(assistant.ask(&mut log, "cough"), "honey tea");
        assert_eq!(assistant.stored_table().unwrap().unwrap().rows.len(), 1);
    }
}
