use std::process::ExitCode;

use authgate::{ApiError, ApiPayload, AppState, ConfigError, ErrorCode, GateConfig, Router, StateError};
use clap::{Parser, Subcommand};
use serde_json::{Value, json};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    State(#[from] StateError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("failed to render output: {0}")]
    Render(#[from] serde_json::Error),
}

impl ErrorCode for CliError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Config(e) => e.error_code(),
            Self::State(e) => e.error_code(),
            Self::Api(e) => e.error_code(),
            Self::Render(_) => "E_RENDER",
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "authgate", about = "Session bootstrap and API client for the course catalog")]
struct Cli {
    /// In-app route currently shown; a 401 sends re-login back here.
    #[arg(long, global = true, env = "AUTHGATE_CURRENT_PATH", default_value = "/")]
    current_path: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the route table and bootstrap guard for an absolute URL.
    Navigate {
        url: String,
        /// Follow internal redirects until the guard decides.
        #[arg(long)]
        follow: bool,
    },
    /// GET any API path through the pipeline.
    Get {
        path: String,
        #[arg(long = "query", value_parser = parse_pair)]
        query: Vec<(String, String)>,
    },
    /// POST a JSON body to any API path through the pipeline.
    Post {
        path: String,
        #[arg(long, value_parser = parse_json, default_value = "{}")]
        body: Value,
    },
    Books {
        #[arg(long = "param", value_parser = parse_pair)]
        params: Vec<(String, String)>,
    },
    Lessons {
        book_id: String,
    },
    Lesson {
        lesson_id: String,
    },
    Words {
        lesson_id: String,
    },
    /// Show the stored session without its tokens.
    Session,
    Logout,
}

fn parse_pair(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(key, value)| (key.to_owned(), value.to_owned()))
        .ok_or_else(|| format!("expected KEY=VALUE, got `{raw}`"))
}

fn parse_json(raw: &str) -> Result<Value, String> {
    serde_json::from_str(raw).map_err(|e| format!("invalid JSON body: {e}"))
}

fn borrowed(pairs: &[(String, String)]) -> Vec<(&str, &str)> {
    pairs.iter().map(|(key, value)| (key.as_str(), value.as_str())).collect()
}

fn init_tracing() {
    let filter = EnvFilter::builder().with_default_directive(LevelFilter::INFO.into()).from_env_lossy();
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

#[tokio::main]
async fn main() -> ExitCode {
    // Loaded before the subscriber so RUST_LOG may come from `.env`.
    let dotenv = dotenvy::dotenv();
    init_tracing();
    if let Err(e) = dotenv {
        if !e.not_found() {
            tracing::warn!(error = %e, "failed to load .env");
        }
    }

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}: {e}", e.error_code());
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = GateConfig::from_env()?;
    let state = AppState::from_config(config, &cli.current_path)?;

    match cli.command {
        Command::Navigate { url, follow } => {
            let navigation =
                if follow { state.navigate_following(&url).await? } else { state.navigate(&url).await? };
            print_json(&json!({ "navigation": navigation, "currentPath": state.router.current_path() }))
        }
        Command::Get { path, query } => print_payload(state.api.get(&path, &borrowed(&query)).await?),
        Command::Post { path, body } => print_payload(state.api.post(&path, body).await?),
        Command::Books { params } => print_json(&state.catalog.book_list(&borrowed(&params)).await?),
        Command::Lessons { book_id } => print_json(&state.catalog.lesson_list(&book_id).await?),
        Command::Lesson { lesson_id } => print_json(&state.catalog.lesson(&lesson_id).await?),
        Command::Words { lesson_id } => print_json(&state.catalog.word_list(&lesson_id).await?),
        Command::Session => {
            let session = state.session.snapshot();
            print_json(&json!({
                "hasToken": session.has_token(),
                "authenticated": session.is_authenticated(),
                "userInfo": session.user_info,
            }))
        }
        Command::Logout => {
            state.session.clear();
            print_json(&json!({ "cleared": true }))
        }
    }
}

fn print_payload(payload: ApiPayload) -> Result<(), CliError> {
    match payload {
        ApiPayload::Json(value) => print_json(&value),
        ApiPayload::Text(text) => {
            println!("{text}");
            Ok(())
        }
        ApiPayload::Binary { content_type, bytes } => {
            print_json(&json!({ "contentType": content_type, "bytes": bytes.len() }))
        }
    }
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
