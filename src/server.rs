use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::State,
    http::HeaderValue,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::cascade;
use crate::config::{AppConfig, CorsOrigins, SharedConfig};
use crate::db::models::UpdateSettingsInput;
use crate::db::repos::settings as settings_repo;
use crate::db::DbPool;
use crate::error::AppError;

/// Shared state for request handlers.
#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub config: SharedConfig,
}

pub fn router(pool: DbPool, config: SharedConfig, cors: &CorsOrigins) -> Router {
    let state = AppState { pool, config };

    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/api/output-language", get(get_output_language))
        .route("/api/settings", get(get_settings).put(update_settings))
        .layer(cors_layer(cors))
        .with_state(Arc::new(state))
}

/// Bind and serve until the process is stopped.
pub async fn serve(
    pool: DbPool,
    config: SharedConfig,
    app_config: &AppConfig,
) -> Result<(), AppError> {
    let app = router(pool, config, &app_config.cors_origins);
    let addr = SocketAddr::from(([0, 0, 0, 0], app_config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down");
        })
        .await?;

    Ok(())
}

fn cors_layer(cors: &CorsOrigins) -> CorsLayer {
    match cors {
        CorsOrigins::Any => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
        CorsOrigins::List(origins) => {
            let parsed: Vec<HeaderValue> = origins
                .iter()
                .filter_map(|origin| origin.parse().ok())
                .collect();
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(parsed))
                .allow_methods(Any)
                .allow_headers(Any)
        }
    }
}

async fn index() -> impl IntoResponse {
    Json(serde_json::json!({
        "name": "Slideforge API",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "AI-powered slide deck generation service",
        "endpoints": {
            "health": "/health",
            "settings": "/api/settings",
            "output_language": "/api/output-language",
        }
    }))
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok", "message": "Slideforge API is running" }))
}

/// GET /api/output-language — the user's output language preference,
/// read from the settings row on every call.
async fn get_output_language(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let language = cascade::output_language(&state.pool);
    Json(serde_json::json!({ "data": { "language": language } }))
}

async fn get_settings(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    let settings = settings_repo::get_or_create(&state.pool)?;
    Ok(Json(serde_json::json!({ "data": settings })))
}

/// PUT /api/settings — partial update of the settings singleton, then
/// re-resolve the effective configuration so the change applies without a
/// restart.
async fn update_settings(
    State(state): State<Arc<AppState>>,
    Json(input): Json<UpdateSettingsInput>,
) -> Result<impl IntoResponse, AppError> {
    let settings = settings_repo::update(&state.pool, &input)?;

    match state.config.write() {
        Ok(mut config) => cascade::resolve(&state.pool, &mut config),
        Err(e) => tracing::warn!("Effective config lock poisoned, skipping refresh: {}", e),
    }

    Ok(Json(serde_json::json!({ "data": settings })))
}
