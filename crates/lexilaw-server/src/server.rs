/// MCP server exposing the LexiLaw operations as tools:
/// - `lookup_term`: bilingual dictionary-style explanation of a legal term
/// - `compare_translations`: score candidate translations against a reference term
/// - `session_status`: state and last outcome of both operations
use std::future::Future;
use std::sync::Arc;

use rmcp::{
    Json, ServerHandler,
    handler::server::router::tool::ToolRouter,
    handler::server::wrapper::Parameters,
    model::*,
    tool, tool_handler, tool_router,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{error, info};

use lexilaw_common::comparison::ComparisonService;
use lexilaw_common::dictionary::DictionaryService;
use lexilaw_common::error::LexiError;
use lexilaw_common::model::{ComparisonReport, ComparisonRequest, DictionaryEntry, TermQuery};
use lexilaw_common::session::{Panel, PanelSnapshot};

#[derive(Clone)]
pub struct LexiLawServer {
    dictionary: DictionaryService,
    comparison: ComparisonService,
    dictionary_panel: Arc<Mutex<Panel<DictionaryEntry>>>,
    comparison_panel: Arc<Mutex<Panel<ComparisonReport>>>,
    tool_router: ToolRouter<LexiLawServer>,
}

impl LexiLawServer {
    pub fn new(dictionary: DictionaryService, comparison: ComparisonService) -> Self {
        Self {
            dictionary,
            comparison,
            dictionary_panel: Arc::new(Mutex::new(Panel::new("lookup"))),
            comparison_panel: Arc::new(Mutex::new(Panel::new("comparison"))),
            tool_router: Self::tool_router(),
        }
    }
}

/// Record the outcome on the panel and hand it back in tool form.
async fn settle<T: Clone>(
    panel: &Mutex<Panel<T>>,
    outcome: Result<T, LexiError>,
) -> Result<T, String> {
    let mut panel = panel.lock().await;
    match outcome {
        Ok(value) => {
            panel.succeed(value.clone());
            Ok(value)
        }
        Err(e) => {
            let message = e.to_string();
            panel.fail(message.clone());
            Err(message)
        }
    }
}

/// Run `work` on its own task so a dropped call still settles the panel. A
/// task that dies before settling (a panic) is recorded as a failure.
async fn run_detached<T, F>(
    panel: Arc<Mutex<Panel<T>>>,
    operation: &'static str,
    work: F,
) -> Result<T, String>
where
    T: Clone + Send + 'static,
    F: Future<Output = Result<T, LexiError>> + Send + 'static,
{
    let task_panel = Arc::clone(&panel);
    match tokio::spawn(async move { settle(&task_panel, work.await).await }).await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!(operation, error = %e, "request task failed");
            let message = format!("{operation} task failed: {e}");
            panel.lock().await.fail(message.clone());
            Err(message)
        }
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
struct LookupTermParams {
    /// Legal term in English or Chinese, e.g. "force majeure" or "善意第三人".
    query: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct CompareTranslationsParams {
    /// Standard-language term the candidates are measured against.
    reference: String,
    /// Proposed translations. Blank entries are ignored.
    candidates: Vec<String>,
}

#[derive(Debug, Serialize, JsonSchema)]
struct SessionStatus {
    dictionary: PanelSnapshot<DictionaryEntry>,
    comparison: PanelSnapshot<ComparisonReport>,
}

#[tool_router]
impl LexiLawServer {
    #[tool(description = "Look up a legal term (English or Chinese) and return a Collins-style bilingual dictionary entry in Markdown: translation, definition, example sentences and collocations.")]
    async fn lookup_term(
        &self,
        Parameters(params): Parameters<LookupTermParams>,
    ) -> Result<Json<DictionaryEntry>, String> {
        let query = TermQuery::new(&params.query).map_err(|e| e.to_string())?;
        self.dictionary_panel
            .lock()
            .await
            .begin()
            .map_err(|e| e.to_string())?;

        let dictionary = self.dictionary.clone();
        let entry = run_detached(Arc::clone(&self.dictionary_panel), "lookup", async move {
            dictionary.lookup(&query).await
        })
        .await?;
        Ok(Json(entry))
    }

    #[tool(description = "Score candidate translations of a legal term against a reference term. Returns one entry per non-blank candidate with a 0-100 score and a short reason, highest score first.")]
    async fn compare_translations(
        &self,
        Parameters(params): Parameters<CompareTranslationsParams>,
    ) -> Result<Json<ComparisonReport>, String> {
        let request = ComparisonRequest::new(&params.reference, &params.candidates)
            .map_err(|e| e.to_string())?;
        self.comparison_panel
            .lock()
            .await
            .begin()
            .map_err(|e| e.to_string())?;

        let comparison = self.comparison.clone();
        let report = run_detached(Arc::clone(&self.comparison_panel), "comparison", async move {
            comparison.compare(&request).await
        })
        .await?;
        info!(
            reference = %report.reference,
            results = report.analysis.len(),
            "comparison complete"
        );
        Ok(Json(report))
    }

    #[tool(description = "Report the state (idle, loading, success, error) and last outcome of the lookup and comparison operations in this session.")]
    async fn session_status(&self) -> Result<Json<SessionStatus>, String> {
        let dictionary = self.dictionary_panel.lock().await.snapshot();
        let comparison = self.comparison_panel.lock().await.snapshot();
        Ok(Json(SessionStatus {
            dictionary,
            comparison,
        }))
    }
}

#[tool_handler]
impl ServerHandler for LexiLawServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_06_18,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "lexilaw".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                title: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Legal English dictionary and terminology analysis. Use lookup_term for a \
bilingual explanation of an English or Chinese legal term, and compare_translations to rank \
candidate English translations against a Chinese reference term. Each operation runs one \
request at a time; session_status shows what is in flight and the last result."
                    .to_string(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rmcp::handler::server::wrapper::Parameters;
    use tokio::sync::Mutex;

    use lexilaw_common::comparison::ComparisonService;
    use lexilaw_common::dictionary::DictionaryService;
    use lexilaw_common::error::LexiError;
    use lexilaw_common::gemini::{GeminiClient, GeminiClientConfig};
    use lexilaw_common::session::{LoadingState, Panel};

    use super::{run_detached, CompareTranslationsParams, LexiLawServer, LookupTermParams};

    fn offline_server() -> LexiLawServer {
        // Nothing below reaches the network, so the discard port is never dialed.
        let client = Arc::new(
            GeminiClient::new(GeminiClientConfig {
                base_url: "http://127.0.0.1:9/v1beta".to_string(),
                api_key: "test-key".to_string(),
                timeout: None,
                max_error_body_bytes: 1024,
            })
            .unwrap(),
        );
        LexiLawServer::new(
            DictionaryService::new(Arc::clone(&client), "gemini-2.5-flash"),
            ComparisonService::new(client, "gemini-2.5-flash"),
        )
    }

    #[test]
    fn tools_publish_output_schemas() {
        let tools = LexiLawServer::tool_router().list_all();
        for name in ["lookup_term", "compare_translations", "session_status"] {
            let tool = tools
                .iter()
                .find(|t| t.name == name)
                .unwrap_or_else(|| panic!("missing tool: {name}"));
            assert!(
                tool.output_schema.is_some(),
                "tool {name} should publish output_schema"
            );
        }
    }

    #[tokio::test]
    async fn blank_inputs_are_rejected_before_the_panel_moves() {
        let server = offline_server();

        let Err(err) = server
            .lookup_term(Parameters(LookupTermParams {
                query: "   ".to_string(),
            }))
            .await
        else {
            panic!("expected an error");
        };
        assert_eq!(err, "query must not be empty");

        let Err(err) = server
            .compare_translations(Parameters(CompareTranslationsParams {
                reference: "不可抗力".to_string(),
                candidates: vec!["".to_string(), "  ".to_string()],
            }))
            .await
        else {
            panic!("expected an error");
        };
        assert_eq!(err, "at least one non-empty candidate translation is required");

        let Err(err) = server
            .compare_translations(Parameters(CompareTranslationsParams {
                reference: " ".to_string(),
                candidates: vec!["force majeure".to_string()],
            }))
            .await
        else {
            panic!("expected an error");
        };
        assert_eq!(err, "reference term must not be empty");

        assert_eq!(server.dictionary_panel.lock().await.status(), LoadingState::Idle);
        assert_eq!(server.comparison_panel.lock().await.status(), LoadingState::Idle);
    }

    #[tokio::test]
    async fn second_request_while_loading_is_refused() {
        let server = offline_server();
        server.dictionary_panel.lock().await.begin().unwrap();

        let Err(err) = server
            .lookup_term(Parameters(LookupTermParams {
                query: "tort".to_string(),
            }))
            .await
        else {
            panic!("expected an error");
        };
        assert_eq!(err, "a lookup request is already in progress");

        // The comparison panel is independent.
        assert_eq!(server.comparison_panel.lock().await.status(), LoadingState::Idle);
    }

    #[tokio::test]
    async fn session_status_starts_idle() {
        let server = offline_server();
        let status = server.session_status().await.unwrap().0;
        assert_eq!(status.dictionary.status, LoadingState::Idle);
        assert!(status.dictionary.result.is_none());
        assert_eq!(status.comparison.status, LoadingState::Idle);
    }

    #[tokio::test]
    async fn panicking_request_task_leaves_the_panel_usable() {
        let panel = Arc::new(Mutex::new(Panel::<String>::new("lookup")));
        panel.lock().await.begin().unwrap();

        let outcome = run_detached(Arc::clone(&panel), "lookup", async {
            if true {
                panic!("service panicked");
            }
            Ok::<_, LexiError>(String::new())
        })
        .await;
        let Err(err) = outcome else {
            panic!("expected an error");
        };
        assert!(err.starts_with("lookup task failed"), "{err}");

        let mut panel = panel.lock().await;
        assert_eq!(panel.status(), LoadingState::Error);
        panel.begin().unwrap();
        assert_eq!(panel.status(), LoadingState::Loading);
    }
}
