//! Trailwise Engine - Main entry point.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::{HeaderValue, Method};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use trailwise_engine::api;
use trailwise_engine::infrastructure::{
    clock::SystemClock, config::AppConfig, gemini::GeminiClient, ports::ClockPort,
};
use trailwise_engine::App;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment from repo root (the engine may be run from `crates/engine`).
    load_dotenv_from_repo_root();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "trailwise_engine=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Trailwise Engine");

    let config = AppConfig::from_env()?;

    let gemini = GeminiClient::from_config(&config);
    if gemini.has_credentials() {
        tracing::info!(
            base_url = %config.gemini_base_url,
            timeout_secs = config.llm_timeout_secs,
            "Gemini client configured"
        );
    } else {
        tracing::warn!("GEMINI_API_KEY is not set; every model call will fall back");
    }

    let clock: Arc<dyn ClockPort> = Arc::new(SystemClock::new());
    let app = Arc::new(App::new(
        Arc::new(gemini),
        clock,
        &config.models,
        Duration::from_secs(config.session_idle_secs),
    ));

    // Background sweep of idle games
    {
        let app = Arc::clone(&app);
        let interval = Duration::from_secs(config.session_sweep_secs);
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                let expired = app.use_cases.game.sweep_idle();
                if expired > 0 {
                    tracing::info!(
                        expired,
                        remaining = app.use_cases.game.game_count(),
                        "Idle games expired"
                    );
                }
            }
        });
    }

    let mut router = api::http::routes()
        .with_state(app)
        .layer(TraceLayer::new_for_http());

    if let Some(cors) = config
        .cors_allowed_origins
        .as_deref()
        .and_then(build_cors_layer)
    {
        router = router.layer(cors);
    }

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server_host, config.server_port).parse()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}

fn load_dotenv_from_repo_root() {
    let repo_root = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..");

    // Prefer local overrides.
    for filename in [".env.local", ".env"] {
        let path = repo_root.join(filename);
        if path.exists() {
            let _ = dotenvy::from_path(path);
        }
    }
}

/// CORS for a comma-separated origin list, or `*` for any origin.
fn build_cors_layer(allowed_origins: &str) -> Option<CorsLayer> {
    let allowed_origins = allowed_origins.trim();
    if allowed_origins.is_empty() {
        return None;
    }

    let mut cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        // JSON bodies trigger CORS preflights.
        .allow_headers([axum::http::header::CONTENT_TYPE]);

    if allowed_origins == "*" {
        cors = cors.allow_origin(Any);
    } else {
        let origins: Vec<HeaderValue> = allowed_origins
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .filter_map(|s| HeaderValue::from_str(s).ok())
            .collect();

        if origins.is_empty() {
            return None;
        }

        cors = cors.allow_origin(origins);
    }

    Some(cors)
}
