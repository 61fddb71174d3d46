mod config;
mod db;
mod error;
mod llm;
mod rate_limit;
mod routes;
mod services;
mod state;

use std::sync::Arc;
use std::time::Duration;

use crate::llm::LlmChat;

const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(15 * 60);

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt::init();

    let config = config::ServerConfig::from_env().expect("invalid server config");
    let limits = rate_limit::RateLimitConfig::from_env().expect("invalid rate limit config");

    let pool = db::init_pool(&config)
        .await
        .expect("database init failed");

    // AI endpoints fall back to localized apologies without an LLM.
    let llm: Option<Arc<dyn LlmChat>> = match llm::LlmClient::from_env() {
        Ok(client) => {
            tracing::info!(model = client.model(), "LLM client initialized");
            Some(Arc::new(client))
        }
        Err(e) => {
            tracing::warn!(error = %e, "LLM client not configured, AI features degraded");
            None
        }
    };

    let port = config.port;
    let state = state::AppState::new(pool.clone(), llm, rate_limit::RateLimiter::new(limits), config);
    let _sweeper = services::session::spawn_session_sweeper(pool, SESSION_SWEEP_INTERVAL);

    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .expect("failed to bind");

    tracing::info!(%port, "raha listening");
    axum::serve(listener, app).await.expect("server failed");
}
