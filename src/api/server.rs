//! HTTP API server (axum)
//!
//! GET /api/health
//! GET /api/dashboard
//! GET /api/readings?limit=N
//! GET /api/logs.csv

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::header,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};

use super::dashboard::{self, DashboardSnapshot, ReadingView};
use crate::constants::{APP_NAME, APP_VERSION, TABLE_ROWS};
use crate::logic::context::MonitorContext;

type AppState = Arc<MonitorContext>;

/// Upper bound for `/api/readings?limit=`
const MAX_READINGS: usize = 5000;

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    name: &'static str,
    version: &'static str,
    timestamp: i64,
}

#[derive(Debug, Deserialize)]
pub struct ReadingsQuery {
    limit: Option<usize>,
}

pub fn router(ctx: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/dashboard", get(get_dashboard))
        .route("/api/readings", get(get_readings))
        .route("/api/logs.csv", get(download_csv))
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any))
        .with_state(ctx)
}

/// Serve until the context shuts down
pub async fn serve(ctx: AppState, bind: &str) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    log::info!("Dashboard API listening on http://{}", listener.local_addr()?);

    let mut shutdown = ctx.shutdown_signal();
    axum::serve(listener, router(ctx))
        .with_graceful_shutdown(async move {
            while !*shutdown.borrow() {
                if shutdown.changed().await.is_err() {
                    break;
                }
            }
        })
        .await
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        name: APP_NAME,
        version: APP_VERSION,
        timestamp: chrono::Utc::now().timestamp(),
    })
}

async fn get_dashboard(State(ctx): State<AppState>) -> Json<DashboardSnapshot> {
    Json(dashboard::get_dashboard(&ctx))
}

async fn get_readings(
    State(ctx): State<AppState>,
    Query(query): Query<ReadingsQuery>,
) -> Json<Vec<ReadingView>> {
    let limit = query.limit.unwrap_or(TABLE_ROWS).min(MAX_READINGS);
    Json(dashboard::get_readings(&ctx, limit))
}

async fn download_csv(State(ctx): State<AppState>) -> impl IntoResponse {
    let filename = ctx
        .config()
        .persistence
        .csv_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "logs.csv".to_string());

    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        dashboard::export_csv(&ctx),
    )
}
