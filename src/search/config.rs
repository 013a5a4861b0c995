//! Search configuration

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Query-time behaviour of the relevance engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Add the phrase-match clause
    #[serde(default = "default_true")]
    pub match_sentences: bool,

    /// Add the AND / OR word-match clauses
    #[serde(default = "default_true")]
    pub match_words: bool,

    /// Private discussions (recipient users/groups) are indexed and searchable
    #[serde(default)]
    pub private_messaging: bool,

    /// Documents carry tag ids
    #[serde(default = "default_true")]
    pub tags: bool,

    /// Discussion documents carry the sticky flag
    #[serde(default)]
    pub sticky: bool,

    /// Relevance multiplier per content type, 1.0 when absent
    #[serde(default)]
    pub boosts: HashMap<String, f64>,
}

impl SearchConfig {
    /// Configured multiplier of a content type
    pub fn boost_for(&self, content_type: &str) -> f64 {
        self.boosts.get(content_type).copied().unwrap_or(1.0)
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            match_sentences: true,
            match_words: true,
            private_messaging: false,
            tags: true,
            sticky: false,
            boosts: HashMap::new(),
        }
    }
}

fn default_true() -> bool {
    true
}

/// Builder for SearchConfig
pub struct SearchConfigBuilder {
    config: SearchConfig,
}

impl SearchConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: SearchConfig::default(),
        }
    }

    pub fn match_sentences(mut self, enabled: bool) -> Self {
        self.config.match_sentences = enabled;
        self
    }

    pub fn match_words(mut self, enabled: bool) -> Self {
        self.config.match_words = enabled;
        self
    }

    pub fn private_messaging(mut self, enabled: bool) -> Self {
        self.config.private_messaging = enabled;
        self
    }

    pub fn tags(mut self, enabled: bool) -> Self {
        self.config.tags = enabled;
        self
    }

    pub fn sticky(mut self, enabled: bool) -> Self {
        self.config.sticky = enabled;
        self
    }

    pub fn boost(mut self, content_type: impl Into<String>, boost: f64) -> Self {
        self.config.boosts.insert(content_type.into(), boost);
        self
    }

    pub fn build(self) -> SearchConfig {
        self.config
    }
}

impl Default for SearchConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
