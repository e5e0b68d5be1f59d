//! rustabit - Master's Program Advisor
//!
//! A Rust microservice that scrapes the ITMO AI master's program pages and
//! answers applicant questions about them through an LLM.
//!
//! ## Usage
//!
//! ### CLI Mode
//! ```bash
//! rustabit scrape
//! rustabit ask "Какие экзамены нужно сдавать?"
//! rustabit profile setup --user-id 42
//! rustabit recommend --user-id 42
//! ```
//!
//! ### HTTP Server Mode
//! ```bash
//! rustabit serve --port 3000
//! ```

use anyhow::{Context, Result};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use clap::{Parser, Subcommand};
use rustabit::advisor::{store_profile, Advisor};
use rustabit::context::profile_card;
use rustabit::itmo::{ProgramScraper, ScraperConfig, DEFAULT_USER_AGENT};
use rustabit::llm::{LlmConfig, OpenAiClient, DEFAULT_BASE_URL, DEFAULT_MODEL};
use rustabit::models::{now_iso, UserProfile};
use rustabit::profile::{ProfileWizard, WizardStep};
use rustabit::store::{default_data_dir, JsonStore, RecordStore};
use serde::{Deserialize, Serialize};
use std::io::{BufRead, Write};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn, Level};
use tracing_subscriber::{fmt, EnvFilter};

// ============================================================================
// CLI Definition
// ============================================================================

/// Master's Program Advisor - Rust Microservice
#[derive(Parser)]
#[command(name = "rustabit")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    /// Directory holding programs, profiles and the conversation log
    #[arg(long, global = true, env = "RUSTABIT_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// LLM API base URL
    #[arg(long, global = true, env = "OPENAI_BASE_URL", default_value = DEFAULT_BASE_URL)]
    llm_base_url: String,

    /// LLM API key
    #[arg(long, global = true, env = "OPENAI_API_KEY", hide_env_values = true)]
    llm_key: Option<String>,

    /// LLM model name
    #[arg(long, global = true, env = "OPENAI_MODEL", default_value = DEFAULT_MODEL)]
    llm_model: String,

    /// LLM request timeout in seconds
    #[arg(long, global = true, default_value = "60")]
    llm_timeout: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape the program pages into the data directory
    Scrape {
        /// Seconds to wait between page downloads
        #[arg(long, default_value = "1")]
        delay: u64,

        /// User agent sent to the program site
        #[arg(long, env = "SCRAPER_USER_AGENT", default_value = DEFAULT_USER_AGENT)]
        user_agent: String,
    },

    /// Ask a question about the programs
    Ask {
        /// The question
        question: String,

        /// User whose profile personalises the answer
        #[arg(long, default_value = "0")]
        user_id: i64,
    },

    /// Personal program recommendation from a stored profile
    Recommend {
        #[arg(long)]
        user_id: i64,
    },

    /// Compare the programs
    Compare,

    /// Admission guide for both programs
    Guide,

    /// Manage user profiles
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },

    /// Run as HTTP server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },
}

#[derive(Subcommand)]
enum ProfileAction {
    /// Fill in a profile interactively on stdin
    Setup {
        #[arg(long)]
        user_id: i64,

        #[arg(long, default_value = "")]
        username: String,
    },
    /// Print a stored profile
    Show {
        #[arg(long)]
        user_id: i64,
    },
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.debug { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));

    if cli.log_json {
        fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(false)
            .init();
    } else {
        fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(false)
            .init();
    }

    let data_dir = cli.data_dir.clone().unwrap_or_else(default_data_dir);
    let store = Arc::new(
        JsonStore::open(&data_dir)
            .with_context(|| format!("Failed to open data directory {}", data_dir.display()))?,
    );

    match cli.command {
        Commands::Scrape { delay, ref user_agent } => {
            run_scrape(store, delay, user_agent.clone()).await
        }
        Commands::Ask { ref question, user_id } => {
            let (advisor, model) = build_advisor(&cli, store)?;
            println!("{}", advisor.answer(question, user_id).await);
            log_usage(&model);
            Ok(())
        }
        Commands::Recommend { user_id } => {
            let (advisor, model) = build_advisor(&cli, store)?;
            println!("{}", advisor.recommend_for(user_id).await);
            log_usage(&model);
            Ok(())
        }
        Commands::Compare => {
            let (advisor, model) = build_advisor(&cli, store)?;
            println!("{}", advisor.compare().await);
            log_usage(&model);
            Ok(())
        }
        Commands::Guide => {
            let (advisor, model) = build_advisor(&cli, store)?;
            println!("{}", advisor.admission_guide().await);
            log_usage(&model);
            Ok(())
        }
        Commands::Profile { ref action } => handle_profile(action, store.as_ref()),
        Commands::Serve { port, ref host } => {
            let (advisor, model) = build_advisor(&cli, store.clone())?;
            let result = run_server(host, port, advisor, store).await;
            log_usage(&model);
            result
        }
    }
}

/// Build the advisor; model-backed commands need an API key
fn build_advisor(cli: &Cli, store: Arc<JsonStore>) -> Result<(Advisor, Arc<OpenAiClient>)> {
    let api_key = cli
        .llm_key
        .clone()
        .context("LLM API key is required (--llm-key or OPENAI_API_KEY)")?;

    let model = OpenAiClient::new(LlmConfig {
        base_url: cli.llm_base_url.clone(),
        api_key,
        model: cli.llm_model.clone(),
        timeout_secs: cli.llm_timeout,
    })
    .context("Failed to create LLM client")?;

    info!(model = %cli.llm_model, "LLM client ready");
    let model = Arc::new(model);
    Ok((Advisor::new(store, model.clone()), model))
}

/// Session token totals
fn log_usage(model: &OpenAiClient) {
    let usage = model.usage();
    info!(
        prompt_tokens = usage.prompt_tokens,
        completion_tokens = usage.completion_tokens,
        total_tokens = usage.total_tokens,
        "Session token usage"
    );
}

// ============================================================================
// Scraping
// ============================================================================

async fn run_scrape(store: Arc<JsonStore>, delay: u64, user_agent: String) -> Result<()> {
    let config = ScraperConfig {
        user_agent,
        delay_secs: delay,
        ..Default::default()
    };
    let total = config.urls.len();
    let scraper = ProgramScraper::new(config).context("Failed to create scraper")?;

    let saved = scraper.scrape_into(store.as_ref()).await;
    println!(
        "Saved {}/{} programs to {}",
        saved,
        total,
        store.dir().display()
    );

    if saved == 0 {
        anyhow::bail!("No program pages could be scraped");
    }
    Ok(())
}

// ============================================================================
// Profile Management
// ============================================================================

fn handle_profile(action: &ProfileAction, store: &dyn RecordStore) -> Result<()> {
    match action {
        ProfileAction::Setup { user_id, username } => {
            let profile = run_wizard(*user_id, username)?;
            match store_profile(store, &profile) {
                Ok(reply) => {
                    println!("{}\n", reply);
                    println!("{}", profile_card(&profile));
                }
                Err(reply) => {
                    println!("{}", reply);
                    anyhow::bail!("Failed to save profile for user {}", user_id);
                }
            }
        }
        ProfileAction::Show { user_id } => match store.get_user_profile(*user_id)? {
            Some(profile) => println!("{}", profile_card(&profile)),
            None => println!("Профиль не найден. Создайте его командой `rustabit profile setup`."),
        },
    }
    Ok(())
}

/// Walk the wizard over stdin lines
fn run_wizard(user_id: i64, username: &str) -> Result<UserProfile> {
    let mut wizard = ProfileWizard::new(user_id, username);
    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();

    let mut prompt = wizard.prompt();
    loop {
        println!("{}\n", prompt);
        print!("> ");
        std::io::stdout().flush()?;

        let line = lines
            .next()
            .context("Input ended before the profile was complete")??;

        match wizard.advance(&line) {
            WizardStep::Next(next) => prompt = next,
            WizardStep::Complete(profile) => return Ok(profile),
        }
    }
}

// ============================================================================
// HTTP Server
// ============================================================================

async fn run_server(
    host: &str,
    port: u16,
    advisor: Advisor,
    store: Arc<JsonStore>,
) -> Result<()> {
    info!(host = %host, port = port, "Starting HTTP server");
    println!("Starting server at http://{}:{}", host, port);

    let app_state = Arc::new(AppState { advisor, store });

    let app = Router::new()
        .route("/health", get(health_handler))
        .route("/ask", post(ask_handler))
        .route("/recommend", post(recommend_handler))
        .route("/compare", get(compare_handler))
        .route("/guide", get(guide_handler))
        .route(
            "/profiles/{user_id}",
            get(get_profile_handler).put(put_profile_handler),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .context("Invalid host:port")?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    println!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

/// Profile reads and writes go straight to the store on the blocking pool.
/// The advisor's own store calls are short file reads and stay inline.
struct AppState {
    advisor: Advisor,
    store: Arc<JsonStore>,
}

/// Run a store call off the async worker threads
async fn blocking<T, F>(f: F) -> std::result::Result<T, StatusCode>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| {
        error!(error = %e, "Blocking store task failed");
        StatusCode::INTERNAL_SERVER_ERROR
    })
}

/// Text reply of every answer endpoint
#[derive(Debug, Serialize)]
struct AdvisorResponse {
    response: String,
}

impl From<String> for AdvisorResponse {
    fn from(response: String) -> Self {
        Self { response }
    }
}

/// Health check endpoint
async fn health_handler() -> &'static str {
    "OK"
}

#[derive(Debug, Deserialize)]
struct AskRequest {
    question: String,
    #[serde(default)]
    user_id: i64,
}

async fn ask_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AskRequest>,
) -> Json<AdvisorResponse> {
    info!(user_id = req.user_id, "Ask request");
    Json(state.advisor.answer(&req.question, req.user_id).await.into())
}

#[derive(Debug, Deserialize)]
struct RecommendRequest {
    user_id: i64,
}

async fn recommend_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RecommendRequest>,
) -> Json<AdvisorResponse> {
    info!(user_id = req.user_id, "Recommend request");
    Json(state.advisor.recommend_for(req.user_id).await.into())
}

async fn compare_handler(State(state): State<Arc<AppState>>) -> Json<AdvisorResponse> {
    Json(state.advisor.compare().await.into())
}

async fn guide_handler(State(state): State<Arc<AppState>>) -> Json<AdvisorResponse> {
    Json(state.advisor.admission_guide().await.into())
}

async fn get_profile_handler(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
) -> std::result::Result<Json<UserProfile>, StatusCode> {
    let store = state.store.clone();
    match blocking(move || store.get_user_profile(user_id)).await? {
        Ok(Some(profile)) => Ok(Json(profile)),
        Ok(None) => Err(StatusCode::NOT_FOUND),
        Err(e) => {
            warn!(user_id, error = %e, "Failed to read profile");
            Err(StatusCode::NOT_FOUND)
        }
    }
}

/// Whole-record upsert; the path id wins over the body
async fn put_profile_handler(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
    Json(mut profile): Json<UserProfile>,
) -> std::result::Result<Json<AdvisorResponse>, StatusCode> {
    if profile.user_id != 0 && profile.user_id != user_id {
        warn!(path = user_id, body = profile.user_id, "Profile id mismatch, using path id");
    }
    profile.user_id = user_id;

    let store = state.store.clone();
    let reply = blocking(move || {
        let now = now_iso();
        if profile.created_at.is_empty() {
            profile.created_at = store
                .get_user_profile(user_id)
                .ok()
                .flatten()
                .map(|existing| existing.created_at)
                .unwrap_or_else(|| now.clone());
        }
        profile.updated_at = now;

        match store_profile(store.as_ref(), &profile) {
            Ok(reply) | Err(reply) => reply,
        }
    })
    .await?;

    Ok(Json(reply.to_string().into()))
}
