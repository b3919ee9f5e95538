/// Translation comparison: a schema-constrained `generateContent` call whose
/// JSON answer is checked against the request, clamped and ranked.
use std::sync::Arc;

use serde::Deserialize;
use tracing::{error, info};

use crate::error::LexiError;
use crate::gemini::{Content, GenerateContentRequest, GeminiClient, GenerationConfig};
use crate::model::{ComparisonReport, ComparisonRequest, ComparisonResultItem};
use crate::prompts::{comparison_prompt, comparison_response_schema};

#[derive(Clone)]
pub struct ComparisonService {
    client: Arc<GeminiClient>,
    model: String,
}

impl ComparisonService {
    pub fn new(client: Arc<GeminiClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub async fn compare(&self, request: &ComparisonRequest) -> Result<ComparisonReport, LexiError> {
        info!(
            model = %self.model,
            reference = request.reference(),
            candidates = request.candidates().len(),
            "comparing translations"
        );
        let response = self
            .client
            .generate_content(&self.model, &build_request(request))
            .await
            .inspect_err(|e| error!(error = %e, model = %self.model, "comparison request failed"))
            .map_err(|_| LexiError::Comparison)?;

        let text = response.text().ok_or_else(|| {
            error!(model = %self.model, "comparison response carried no text");
            LexiError::Comparison
        })?;

        let analysis = parse_analysis(&text, request.candidates().len()).map_err(|e| {
            error!(error = %e, model = %self.model, "comparison response rejected");
            LexiError::Comparison
        })?;

        Ok(ComparisonReport {
            reference: request.reference().to_string(),
            analysis,
        })
    }
}

fn build_request(request: &ComparisonRequest) -> GenerateContentRequest {
    GenerateContentRequest {
        contents: vec![Content::user(comparison_prompt(request))],
        system_instruction: None,
        generation_config: Some(GenerationConfig {
            response_mime_type: Some("application/json".to_string()),
            response_schema: Some(comparison_response_schema()),
            ..Default::default()
        }),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("invalid analysis JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("expected {expected} analysis entries, got {actual}")]
    CountMismatch { expected: usize, actual: usize },
}

#[derive(Debug, Deserialize)]
struct RawAnalysis {
    analysis: Vec<RawAnalysisItem>,
}

#[derive(Debug, Deserialize)]
struct RawAnalysisItem {
    term: String,
    // Schema asks for INTEGER; accept floats anyway and round.
    score: f64,
    reason: String,
}

/// Parse the model's JSON answer into ranked results.
///
/// The answer must hold exactly one entry per submitted candidate. Scores are
/// rounded and clamped to `0..=100`, then sorted highest first; ties keep the
/// order the model returned them in.
pub fn parse_analysis(
    text: &str,
    expected: usize,
) -> Result<Vec<ComparisonResultItem>, AnalysisError> {
    let raw: RawAnalysis = serde_json::from_str(strip_code_fence(text))?;
    if raw.analysis.len() != expected {
        return Err(AnalysisError::CountMismatch {
            expected,
            actual: raw.analysis.len(),
        });
    }

    let mut items: Vec<ComparisonResultItem> = raw
        .analysis
        .into_iter()
        .map(|item| ComparisonResultItem {
            term: item.term.trim().to_string(),
            score: clamp_score(item.score),
            reason: item.reason.trim().to_string(),
        })
        .collect();
    sort_by_score(&mut items);
    Ok(items)
}

pub fn clamp_score(score: f64) -> u8 {
    if score.is_nan() {
        return 0;
    }
    score.round().clamp(0.0, 100.0) as u8
}

/// Stable sort, highest score first.
pub fn sort_by_score(items: &mut [ComparisonResultItem]) {
    items.sort_by(|a, b| b.score.cmp(&a.score));
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop an optional language tag on the opening fence line.
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}
