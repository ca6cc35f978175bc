use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistConfig {
    pub data_dir: PathBuf,
    /// Workbook holding the authoritative knowledge table.
    pub knowledge_file: PathBuf,
    pub matching: MatchingConfig,
    pub replies: ReplyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    /// A stored question is used only when its score is strictly above this.
    /// Tunable; 60 suits short FAQ-style questions.
    pub threshold: u8,
    /// Phrases answered with the greeting reply, compared case-insensitively.
    pub greetings: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplyConfig {
    pub greeting: String,
    pub no_dataset: String,
    pub fallback: String,
}

impl AssistConfig {
    /// Validate config values, returning errors for clearly broken configurations.
    pub fn validate(&self) -> Result<(), String> {
        if self.matching.threshold > 100 {
            return Err("matching.threshold must be in [0, 100]".into());
        }
        if self.matching.greetings.iter().all(|g| g.trim().is_empty()) {
            return Err("matching.greetings must contain at least one phrase".into());
        }
        if self.knowledge_file.as_os_str().is_empty() {
            return Err("knowledge_file must not be empty".into());
        }
        Ok(())
    }

    /// Load config from a JSON file, falling back to defaults for missing fields.
    pub fn from_file(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {}", e))?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| format!("Failed to parse config: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Config rooted at `data_dir`, everything else default.
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            knowledge_file: data_dir.join("knowledge.xlsx"),
            data_dir,
            ..Self::default()
        }
    }
}

impl Default for AssistConfig {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("shodh-assist");

        let knowledge_file = match std::env::var("SHODH_ASSIST_KNOWLEDGE") {
            Ok(path) if !path.trim().is_empty() => PathBuf::from(path),
            _ => data_dir.join("knowledge.xlsx"),
        };

        Self {
            data_dir,
            knowledge_file,
            matching: MatchingConfig::default(),
            replies: ReplyConfig::default(),
        }
    }
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            threshold: 60,
            greetings: [
                "hi",
                "hello",
                "hey",
                "greetings",
                "good morning",
                "good evening",
                "namaste",
            ]
            .iter()
            .map(|g| g.to_string())
            .collect(),
        }
    }
}

impl Default for ReplyConfig {
    fn default() -> Self {
        Self {
            greeting: "Hello! How can I assist you today?".into(),
            no_dataset: "I'm here to help, but no valid dataset was found. Please upload a proper dataset.".into(),
            fallback: "I'm here to help, but I couldn't find relevant data. Can you provide more details?".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = AssistConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.matching.threshold, 60);
        assert_eq!(config.matching.greetings.len(), 7);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: AssistConfig =
            serde_json::from_str(r#"{ "matching": { "threshold": 75 } }"#).unwrap();
        assert_eq!(config.matching.threshold, 75);
        assert!(config.matching.greetings.contains(&"namaste".to_string()));
        assert!(config.replies.fallback.contains("couldn't find relevant data"));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = AssistConfig::with_data_dir("/tmp/assist");
        config.matching.threshold = 101;
        assert!(config.validate().is_err());

        let mut config = AssistConfig::with_data_dir("/tmp/assist");
        config.matching.greetings.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_with_data_dir() {
        let config = AssistConfig::with_data_dir("/srv/assist");
        assert_eq!(config.knowledge_file, PathBuf::from("/srv/assist/knowledge.xlsx"));
    }

    #[test]
    fn test_from_file_missing() {
        assert!(AssistConfig::from_file(Path::new("/nonexistent/assist.json")).is_err());
    }
}
