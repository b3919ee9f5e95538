use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::LexiError;

/// A legal term to look up, English or Chinese. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermQuery(String);

impl TermQuery {
    pub fn new(raw: &str) -> Result<Self, LexiError> {
        let query = raw.trim();
        if query.is_empty() {
            return Err(LexiError::EmptyQuery);
        }
        Ok(Self(query.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A reference term plus the candidate translations to score against it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComparisonRequest {
    reference: String,
    candidates: Vec<String>,
}

impl ComparisonRequest {
    /// Whitespace-only candidates are dropped; the rest keep their submission order.
    pub fn new<I, S>(reference: &str, candidates: I) -> Result<Self, LexiError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let reference = reference.trim();
        if reference.is_empty() {
            return Err(LexiError::EmptyReference);
        }
        let candidates: Vec<String> = candidates
            .into_iter()
            .map(|c| c.as_ref().trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();
        if candidates.is_empty() {
            return Err(LexiError::NoCandidates);
        }
        Ok(Self {
            reference: reference.to_string(),
            candidates,
        })
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }

    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DictionaryEntry {
    /// The term as submitted (trimmed).
    pub query: String,
    /// Markdown-formatted explanation produced by the model.
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ComparisonResultItem {
    pub term: String,
    /// Compatibility with the reference term, 0 to 100.
    pub score: u8,
    pub reason: String,
}

impl ComparisonResultItem {
    pub fn tier(&self) -> ScoreTier {
        ScoreTier::for_score(self.score)
    }
}

/// Display band for a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ScoreTier {
    Strong,
    Fair,
    Weak,
}

impl ScoreTier {
    pub fn for_score(score: u8) -> Self {
        if score > 80 {
            ScoreTier::Strong
        } else if score > 50 {
            ScoreTier::Fair
        } else {
            ScoreTier::Weak
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ScoreTier::Strong => "strong",
            ScoreTier::Fair => "fair",
            ScoreTier::Weak => "weak",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ComparisonReport {
    pub reference: String,
    /// One entry per submitted candidate, highest score first.
    pub analysis: Vec<ComparisonResultItem>,
}
