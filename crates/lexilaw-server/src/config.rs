use std::net::SocketAddr;

use lexilaw_common::config::LexiLawConfig;
use lexilaw_common::error::LexiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Stdio,
    Http(SocketAddr),
}

/// Server configuration loaded explicitly from environment variables.
///
/// Optional:
/// - `LEXILAW_TRANSPORT`: `stdio` (default) or `http`
/// - `LEXILAW_HTTP_ADDR`: bind address when serving over HTTP (default `127.0.0.1:8080`)
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub lexilaw: LexiLawConfig,
    pub transport: Transport,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, LexiError> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    pub fn from_vars<F>(var: F) -> Result<Self, LexiError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lexilaw = LexiLawConfig::from_vars(&var)?;

        let transport = match var("LEXILAW_TRANSPORT")
            .map(|t| t.trim().to_ascii_lowercase())
            .as_deref()
        {
            None | Some("") | Some("stdio") => Transport::Stdio,
            Some("http") => {
                let raw = var("LEXILAW_HTTP_ADDR").unwrap_or_else(|| "127.0.0.1:8080".to_string());
                let addr = raw.trim().parse::<SocketAddr>().map_err(|_| {
                    LexiError::Config(format!("LEXILAW_HTTP_ADDR is not a socket address: {raw}"))
                })?;
                Transport::Http(addr)
            }
            Some(other) => {
                return Err(LexiError::Config(format!(
                    "unknown LEXILAW_TRANSPORT '{other}', expected 'stdio' or 'http'"
                )))
            }
        };

        Ok(Self { lexilaw, transport })
    }
}
