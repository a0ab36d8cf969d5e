//! Privacy Shield Server
//!
//! Analyzes uploaded contracts (PDF or scanned image) and returns the
//! extracted text, a redacted copy with personal data replaced by
//! placeholders, and a keyword-based risk assessment. Every run is paid
//! with per-user tokens and kept in the user's history.
//!
//! ## Storage
//!
//! With `--data-dir` balances and history are written as JSON below that
//! directory; without it both live in memory and vanish on restart.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use clap::Parser;
use extraction_engine::{ExtractionService, PdfiumRasterizer};
use pipeline_core::{DocumentPipeline, HistoryStore, JsonFileHistoryStore, MemoryHistoryStore};
use redaction_engine::Redactor;
use risk_engine::RiskEngine;
use token_ledger::{AccountStore, JsonFileAccountStore, MemoryAccountStore, TokenLedger};
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod api;
mod config;
mod error;
#[cfg(test)]
mod tests;

use api::{
    handle_analyze, handle_balance, handle_clear_history, handle_credit, handle_health,
    handle_history, handle_history_record, handle_list_packs,
};
use config::ShieldConfig;

/// Command-line arguments for the Privacy Shield server
#[derive(Parser, Debug)]
#[command(name = "shield-server")]
#[command(about = "Contract analysis server with PII redaction and token billing")]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "3000")]
    port: u16,

    /// Host address to bind to
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory for balances and history; in-memory when omitted
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Maximum request body size in megabytes
    #[arg(long, default_value = "20")]
    max_body_mb: usize,

    /// Rate limit: requests per second per IP
    #[arg(long, default_value = "10")]
    rate_limit: u32,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<DocumentPipeline>,
    pub max_body_bytes: usize,
    /// `None` closes the credit endpoint
    pub credit_secret: Option<Arc<str>>,
}

/// All API routes with CORS and request tracing; rate limiting is added by
/// `main`.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(handle_health))
        // Pipeline
        .route("/api/analyze", post(handle_analyze))
        // Tokens
        .route("/api/tokens", get(handle_balance))
        .route("/api/tokens/credit", post(handle_credit))
        .route("/api/token-packs", get(handle_list_packs))
        // History
        .route(
            "/api/history",
            get(handle_history).delete(handle_clear_history),
        )
        .route("/api/history/:id", get(handle_history_record))
        .layer(DefaultBodyLimit::max(state.max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn build_pipeline(
    config: &ShieldConfig,
    data_dir: Option<&PathBuf>,
) -> anyhow::Result<DocumentPipeline> {
    let (accounts, history): (Arc<dyn AccountStore>, Arc<dyn HistoryStore>) = match data_dir {
        Some(dir) => {
            let accounts = JsonFileAccountStore::new(dir.join("accounts.json"))
                .await
                .context("Failed to open account store")?;
            let history = JsonFileHistoryStore::new(dir.join("history"), config.history.clone())
                .await
                .context("Failed to open history store")?;
            (Arc::new(accounts), Arc::new(history))
        }
        None => (
            Arc::new(MemoryAccountStore::new()),
            Arc::new(MemoryHistoryStore::new(config.history.clone())),
        ),
    };

    let extraction = ExtractionService::new(
        config.extraction.clone(),
        Arc::new(PdfiumRasterizer::new(config.ocr.pdfium_dir.clone())),
        Arc::new(config.ocr.provider()),
    );
    let ledger = Arc::new(TokenLedger::new(accounts, config.ledger.clone()));

    Ok(DocumentPipeline::new(
        extraction,
        Redactor::new(),
        RiskEngine::new(),
        ledger,
        history,
        config.pipeline.clone(),
    ))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match &args.config {
        Some(path) => ShieldConfig::from_file(path)?,
        None => ShieldConfig::default(),
    };

    info!("Starting Privacy Shield server on {}:{}", args.host, args.port);

    let pipeline = Arc::new(build_pipeline(&config, args.data_dir.as_ref()).await?);

    let mut updates = pipeline.ledger().subscribe();
    tokio::spawn(async move {
        while let Ok(update) = updates.recv().await {
            debug!(
                user = %update.user_id,
                delta = update.delta,
                balance = update.balance,
                cap = update.cap,
                "balance changed"
            );
        }
    });

    // Create rate limiter configuration
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(args.rate_limit.into())
            .burst_size(args.rate_limit.saturating_mul(2))
            .finish()
            .context("Invalid rate limit; must be at least 1 request/second")?,
    );

    let state = AppState {
        pipeline,
        max_body_bytes: args.max_body_mb.saturating_mul(1024 * 1024),
        credit_secret: config
            .payments
            .credit_secret
            .as_deref()
            .filter(|secret| !secret.is_empty())
            .map(Arc::from),
    };

    if state.credit_secret.is_none() {
        warn!("No [payments] credit_secret configured; token credits are disabled");
    }

    let app = build_router(state).layer(GovernorLayer {
        config: governor_conf,
    });

    // Start server
    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("Server listening on http://{}", addr);
    info!("Rate limit: {} requests/second per IP", args.rate_limit);
    match &args.data_dir {
        Some(dir) => info!("Data directory: {}", dir.display()),
        None => info!("No data directory; balances and history are kept in memory"),
    }

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
