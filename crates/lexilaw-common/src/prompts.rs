//! Fixed prompt text and the structured-output schema sent to the model.

use serde_json::json;

use crate::model::ComparisonRequest;

pub const DICTIONARY_TEMPERATURE: f32 = 0.3;

pub const DICTIONARY_SYSTEM_INSTRUCTION: &str = "\
You are a distinguished Legal English lexicographer and translator, modeled after the style of the Collins COBUILD Dictionary and Black's Law Dictionary.

Your task is to explain the provided legal term (which may be in English or Chinese).

Rules:
1. If the input is English, provide the Chinese translation, a clear English definition, and a Chinese explanation.
2. If the input is Chinese, provide the English translation(s), and explain the English legal concept.
3. **Crucial**: Adopt the \"Collins Style\" of defining words using full sentences (e.g., \"If you refer to a contract as void, you mean that...\").
4. Provide 2-3 bilingual example sentences in a legal context (Contracts, Torts, Criminal Law, etc.).
5. List any relevant collocations (idiomatic phrases).
6. Format the output using clean Markdown (Bold key terms, use bullet points).";

pub fn comparison_prompt(request: &ComparisonRequest) -> String {
    // serde_json keeps quotes and non-ASCII intact inside the candidate list.
    let candidates =
        serde_json::to_string(request.candidates()).unwrap_or_else(|_| "[]".to_string());
    format!(
        "Chinese Legal Term (Standard): \"{reference}\"\n\
Candidate English Translations: {candidates}\n\
\n\
Task:\n\
Analyze how appropriate each English candidate is as a translation for the Chinese legal term in a formal legal context (e.g., contracts, court documents).\n\
\n\
For each candidate:\n\
1. Assign a compatibility score from 0 to 100 (100 being a perfect, legally binding equivalent).\n\
2. Provide a concise reason explaining the nuance, legal accuracy, or potential ambiguity.\n\
\n\
Return the result strictly as JSON.",
        reference = request.reference(),
    )
}

/// `responseSchema` for the comparison call, in Gemini's OpenAPI subset.
pub fn comparison_response_schema() -> serde_json::Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "analysis": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "term": { "type": "STRING" },
                        "score": { "type": "INTEGER" },
                        "reason": { "type": "STRING" }
                    },
                    "required": ["term", "score", "reason"]
                }
            }
        },
        "required": ["analysis"]
    })
}
