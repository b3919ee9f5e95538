mod config;
mod server;

use std::net::SocketAddr;
use std::sync::Arc;

use rmcp::transport::streamable_http_server::{
    session::local::LocalSessionManager, StreamableHttpServerConfig, StreamableHttpService,
};
use rmcp::{ServiceExt, transport::stdio};
use tracing::info;
use tracing_subscriber::EnvFilter;

use lexilaw_common::comparison::ComparisonService;
use lexilaw_common::dictionary::DictionaryService;
use lexilaw_common::gemini::GeminiClient;

use config::{ServerConfig, Transport};
use server::LexiLawServer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout is reserved for MCP JSON-RPC when serving on stdio
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    info!("starting lexilaw MCP server");

    let config = ServerConfig::from_env()?;
    info!(
        base_url = %config.lexilaw.gemini.base_url,
        dictionary_model = %config.lexilaw.dictionary_model,
        comparison_model = %config.lexilaw.comparison_model,
        transport = ?config.transport,
        "configuration loaded"
    );

    let client = Arc::new(GeminiClient::new(config.lexilaw.gemini.clone())?);
    let server = LexiLawServer::new(
        DictionaryService::new(Arc::clone(&client), config.lexilaw.dictionary_model.clone()),
        ComparisonService::new(client, config.lexilaw.comparison_model.clone()),
    );

    match config.transport {
        Transport::Stdio => serve_stdio(server).await,
        Transport::Http(addr) => serve_http(server, addr).await,
    }
}

async fn serve_stdio(server: LexiLawServer) -> anyhow::Result<()> {
    info!("MCP server ready, serving on stdio");
    let service = server.serve(stdio()).await.inspect_err(|e| {
        tracing::error!(error = %e, "MCP server error");
    })?;

    service.waiting().await?;
    info!("MCP server shut down");
    Ok(())
}

async fn serve_http(server: LexiLawServer, addr: SocketAddr) -> anyhow::Result<()> {
    // One server value per HTTP session; clones share the operation panels.
    let service = StreamableHttpService::new(
        move || Ok(server.clone()),
        LocalSessionManager::default().into(),
        StreamableHttpServerConfig::default(),
    );
    let router = axum::Router::new().nest_service("/mcp", service);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "MCP server ready, serving streamable HTTP on /mcp");
    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    info!("MCP server shut down");
    Ok(())
}
