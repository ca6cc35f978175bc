//! Query answering: greeting shortcut, fuzzy lookup, thresholded fallback.

pub mod fuzzy;

use serde::{Deserialize, Serialize};

use crate::config::{AssistConfig, MatchingConfig, ReplyConfig};
use crate::knowledge::KnowledgeBase;

/// How a query was resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchOutcome {
    Greeting,
    /// No dataset with the required columns is loaded.
    NoDataset,
    Matched {
        question: String,
        score: u8,
        response: String,
    },
    /// Best candidate (if any) did not clear the threshold.
    NoMatch { best: Option<(String, u8)> },
}

#[derive(Debug, Clone)]
pub struct MatchEngine {
    threshold: u8,
    greetings: Vec<String>,
    replies: ReplyConfig,
}

impl MatchEngine {
    pub fn new(matching: &MatchingConfig, replies: &ReplyConfig) -> Self {
        Self {
            threshold: matching.threshold,
            greetings: matching
                .greetings
                .iter()
                .map(|g| g.trim().to_lowercase())
                .collect(),
            replies: replies.clone(),
        }
    }

    pub fn from_config(config: &AssistConfig) -> Self {
        Self::new(&config.matching, &config.replies)
    }

    pub fn threshold(&self) -> u8 {
        self.threshold
    }

    /// Trimmed, lowercased exact match, so padded input like `" Hi "` still
    /// counts as a greeting.
    fn is_greeting(&self, query: &str) -> bool {
        let normalized = query.trim().to_lowercase();
        self.greetings.iter().any(|g| *g == normalized)
    }

    /// Resolve `query` against a knowledge snapshot. Pure: the same inputs
    /// always give the same outcome.
    pub fn evaluate(&self, query: &str, kb: &KnowledgeBase) -> MatchOutcome {
        if self.is_greeting(query) {
            return MatchOutcome::Greeting;
        }

        if !kb.is_valid() {
            return MatchOutcome::NoDataset;
        }

        let Some((_, question, score)) = fuzzy::extract_one(query, kb.questions()) else {
            return MatchOutcome::NoMatch { best: None };
        };

        tracing::debug!(score, threshold = self.threshold, question, "Best knowledge match");

        if score > self.threshold {
            if let Some(response) = kb.response_for(question) {
                return MatchOutcome::Matched {
                    question: question.to_string(),
                    score,
                    response: response.to_string(),
                };
            }
        }

        MatchOutcome::NoMatch {
            best: Some((question.to_string(), score)),
        }
    }

    /// Reply text for an outcome.
    pub fn reply(&self, outcome: &MatchOutcome) -> String {
        match outcome {
            MatchOutcome::Greeting => self.replies.greeting.clone(),
            MatchOutcome::NoDataset => self.replies.no_dataset.clone(),
            MatchOutcome::Matched { response, .. } => response.clone(),
            MatchOutcome::NoMatch { .. } => self.replies.fallback.clone(),
        }
    }

    /// Answer `query` from `kb`. Never fails; degenerate inputs get one of the
    /// fixed replies.
    pub fn answer(&self, query: &str, kb: &KnowledgeBase) -> String {
        self.reply(&self.evaluate(query, kb))
    }
}

impl Default for MatchEngine {
    fn default() -> Self {
        Self::new(&MatchingConfig::default(), &ReplyConfig::default())
    }
}
