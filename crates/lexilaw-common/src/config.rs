use crate::error::LexiError;
use crate::gemini::GeminiClientConfig;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Settings shared by every LexiLaw front end, loaded from environment variables.
///
/// Optional:
/// - `LEXILAW_DICTIONARY_MODEL`: model used for term lookup
/// - `LEXILAW_COMPARISON_MODEL`: model used for translation comparison
///
/// Client settings are documented on [`GeminiClientConfig::from_vars`].
#[derive(Debug, Clone)]
pub struct LexiLawConfig {
    pub gemini: GeminiClientConfig,
    pub dictionary_model: String,
    pub comparison_model: String,
}

impl LexiLawConfig {
    pub fn from_env() -> Result<Self, LexiError> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    pub fn from_vars<F>(var: F) -> Result<Self, LexiError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let gemini = GeminiClientConfig::from_vars(&var)?;
        let model = |key: &str| {
            var(key)
                .map(|m| m.trim().to_string())
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| DEFAULT_MODEL.to_string())
        };
        Ok(Self {
            gemini,
            dictionary_model: model("LEXILAW_DICTIONARY_MODEL"),
            comparison_model: model("LEXILAW_COMPARISON_MODEL"),
        })
    }
}
