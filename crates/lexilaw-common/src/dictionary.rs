/// Term lookup: one `generateContent` call with the lexicographer instruction,
/// whose text is passed through for display.
use std::sync::Arc;

use tracing::{error, info};

use crate::error::LexiError;
use crate::gemini::{Content, GenerateContentRequest, GeminiClient, GenerationConfig};
use crate::model::{DictionaryEntry, TermQuery};
use crate::prompts::{DICTIONARY_SYSTEM_INSTRUCTION, DICTIONARY_TEMPERATURE};

pub const NO_DEFINITION: &str = "No definition found.";

#[derive(Clone)]
pub struct DictionaryService {
    client: Arc<GeminiClient>,
    model: String,
}

impl DictionaryService {
    pub fn new(client: Arc<GeminiClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub async fn lookup(&self, query: &TermQuery) -> Result<DictionaryEntry, LexiError> {
        info!(model = %self.model, query = query.as_str(), "dictionary lookup");
        let response = self
            .client
            .generate_content(&self.model, &build_request(query))
            .await
            .inspect_err(|e| error!(error = %e, model = %self.model, "dictionary lookup failed"))
            .map_err(|_| LexiError::Lookup)?;
        Ok(entry(query, response.text().unwrap_or_default()))
    }

    /// Same contract as [`lookup`](Self::lookup), handing text to `on_chunk` as it arrives.
    pub async fn lookup_streaming<F>(
        &self,
        query: &TermQuery,
        on_chunk: F,
    ) -> Result<DictionaryEntry, LexiError>
    where
        F: FnMut(&str),
    {
        info!(model = %self.model, query = query.as_str(), "streaming dictionary lookup");
        let text = self
            .client
            .stream_generate_content(&self.model, &build_request(query), on_chunk)
            .await
            .inspect_err(|e| error!(error = %e, model = %self.model, "dictionary lookup failed"))
            .map_err(|_| LexiError::Lookup)?;
        Ok(entry(query, text))
    }
}

fn build_request(query: &TermQuery) -> GenerateContentRequest {
    GenerateContentRequest {
        contents: vec![Content::user(query.as_str())],
        system_instruction: Some(Content::instruction(DICTIONARY_SYSTEM_INSTRUCTION)),
        generation_config: Some(GenerationConfig {
            temperature: Some(DICTIONARY_TEMPERATURE),
            ..Default::default()
        }),
    }
}

fn entry(query: &TermQuery, text: String) -> DictionaryEntry {
    let text = if text.trim().is_empty() {
        NO_DEFINITION.to_string()
    } else {
        text
    };
    DictionaryEntry {
        query: query.as_str().to_string(),
        text,
    }
}
