//! Terminal front end for LexiLaw.
//!
//! Reads the Gemini API key from `GEMINI_API_KEY` (or `API_KEY`).
//!
//! ```sh
//! lexilaw lookup force majeure
//! lexilaw lookup 善意第三人 --stream
//! lexilaw compare --reference 不可抗力 "force majeure" "act of God" "accident"
//! ```

mod render;
mod stream;

use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use lexilaw_common::comparison::ComparisonService;
use lexilaw_common::config::LexiLawConfig;
use lexilaw_common::dictionary::DictionaryService;
use lexilaw_common::error::LexiError;
use lexilaw_common::gemini::GeminiClient;
use lexilaw_common::model::{ComparisonRequest, TermQuery};

use crate::stream::StreamPrinter;

/// Legal English dictionary and terminology analysis.
#[derive(Debug, Parser)]
#[command(name = "lexilaw", version)]
struct Cli {
    /// Log progress to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Explain a legal term in English and Chinese.
    Lookup {
        /// The term; several words are joined with spaces.
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,

        /// Print the explanation as it is generated.
        #[arg(long, conflicts_with = "json")]
        stream: bool,

        /// Print the result as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Score candidate translations against a reference term.
    Compare {
        /// Standard-language reference term.
        #[arg(short, long)]
        reference: String,

        /// Candidate translations to score.
        #[arg(required = true, num_args = 1..)]
        candidates: Vec<String>,

        /// Print the result as JSON.
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::INFO
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(exit_status(&e))
        }
    }
}

/// 2 for rejected input, 1 for everything else.
fn exit_status(e: &LexiError) -> u8 {
    if e.is_validation() {
        2
    } else {
        1
    }
}

async fn run(command: Command) -> Result<(), LexiError> {
    match command {
        Command::Lookup {
            query,
            stream,
            json,
        } => {
            let query = TermQuery::new(&query.join(" "))?;
            let config = load_config()?;
            let service = DictionaryService::new(client(&config)?, config.dictionary_model);
            if stream {
                let mut printer = StreamPrinter::new(std::io::stdout());
                let entry = service
                    .lookup_streaming(&query, |chunk| printer.push(chunk))
                    .await?;
                printer
                    .finish(&entry)
                    .map_err(|e| LexiError::Output(e.to_string()))?;
            } else {
                let entry = service.lookup(&query).await?;
                if json {
                    println!("{}", to_json(&entry)?);
                } else {
                    print!("{}", render::render_entry(&entry));
                }
            }
        }
        Command::Compare {
            reference,
            candidates,
            json,
        } => {
            let request = ComparisonRequest::new(&reference, &candidates)?;
            let config = load_config()?;
            let service = ComparisonService::new(client(&config)?, config.comparison_model);
            let report = service.compare(&request).await?;
            if json {
                println!("{}", to_json(&report)?);
            } else {
                print!("{}", render::render_report(&report));
            }
        }
    }
    Ok(())
}

fn load_config() -> Result<LexiLawConfig, LexiError> {
    LexiLawConfig::from_env()
}

fn client(config: &LexiLawConfig) -> Result<Arc<GeminiClient>, LexiError> {
    GeminiClient::new(config.gemini.clone())
        .map(Arc::new)
        .map_err(|e| LexiError::Config(format!("failed to build HTTP client: {e}")))
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, LexiError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| LexiError::Config(format!("failed to encode result: {e}")))
}
