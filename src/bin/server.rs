use anyhow::Result;
use axum::{
    extract::State,
    http::{HeaderValue, StatusCode},
    routing::{get, post},
    Json, Router,
};
use pnlchat::{
    core::{config::PnlConfig, init, init::AppContext},
    db,
    query::{self, ChatTurn},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

// Request/Response types
#[derive(Deserialize)]
struct ChatRequest {
    company_slug: String,
    question: String,
    #[serde(default)]
    history: Vec<ChatTurn>,
}

#[derive(Serialize)]
struct ChatResponse {
    answer: String,
    sources: Vec<String>,
}

#[derive(Serialize)]
struct SlugsResponse {
    company_slugs: Vec<String>,
}

struct AppState {
    ctx: AppContext,
}

async fn health() -> &'static str {
    "OK"
}

/// Chat endpoint: retrieve the company's top chunks, compose the prompt and
/// return the model's answer with its sources. Any search or generation
/// failure surfaces as a 500 with a generic message; no partial answers.
async fn chat(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, (StatusCode, String)> {
    let result = query::answer_question(
        state.ctx.store.as_ref(),
        &state.ctx.llm,
        &req.company_slug,
        &req.question,
        &req.history,
    )
    .await
    .map_err(|e| {
        log::error!("chat request failed for {}: {:#}", req.company_slug, e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "chat request failed".to_string(),
        )
    })?;

    Ok(Json(ChatResponse {
        answer: result.answer,
        sources: result.sources,
    }))
}

/// List the distinct company slugs present in the index.
async fn slugs(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SlugsResponse>, (StatusCode, String)> {
    let company_slugs = db::list_company_slugs(&state.ctx.pool).await.map_err(|e| {
        log::error!("slug listing failed: {:#}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "slug listing failed".to_string(),
        )
    })?;

    Ok(Json(SlugsResponse { company_slugs }))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    env_logger::init();

    let config = PnlConfig::from_env()?;
    let ctx = init::initialize(&config).await?;
    let app_state = Arc::new(AppState { ctx });

    // The dashboard is served separately during development.
    let cors = CorsLayer::new()
        .allow_origin("http://localhost:3000".parse::<HeaderValue>()?)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/health", get(health))
        .route("/api/chat", post(chat))
        .route("/api/slugs", get(slugs))
        .layer(cors)
        .with_state(app_state);

    let listener = tokio::net::TcpListener::bind("0.0.0.0:8000").await?;
    log::info!("chat API listening on http://0.0.0.0:8000");
    axum::serve(listener, app).await?;

    Ok(())
}
