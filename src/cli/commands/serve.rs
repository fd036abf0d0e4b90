//! HTTP API server for integration with other systems.
//!
//! Provides REST endpoints for querying the course index and inspecting
//! the catalog.

use crate::cli::Output;
use crate::config::Settings;
use crate::error::PensumError;
use crate::rag::RagSystem;
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// Shared application state.
struct AppState {
    system: RagSystem,
}

/// Run the HTTP API server.
pub async fn run_serve(host: &str, port: u16, settings: Settings) -> anyhow::Result<()> {
    let system = RagSystem::new(&settings)?;
    let state = Arc::new(AppState { system });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/health", get(health))
        .route("/api/query", post(query))
        .route("/api/courses", get(courses))
        .layer(cors)
        .with_state(state);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("Pensum API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET  /health");
    Output::kv("Query", "POST /api/query");
    Output::kv("Courses", "GET  /api/courses");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app).await?;

    Ok(())
}

// === Request/Response Types ===

#[derive(Deserialize)]
struct QueryRequest {
    query: String,
    /// Omit to start a new conversation; echo back to continue one.
    #[serde(default)]
    session_id: Option<String>,
}

#[derive(Serialize)]
struct QueryResponse {
    answer: String,
    sources: Vec<SourceInfo>,
    session_id: String,
}

#[derive(Serialize)]
struct SourceInfo {
    text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    link: Option<String>,
}

#[derive(Serialize)]
struct CoursesResponse {
    total_courses: usize,
    course_titles: Vec<String>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

// === Handlers ===

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn query(
    State(state): State<Arc<AppState>>,
    Json(req): Json<QueryRequest>,
) -> impl IntoResponse {
    match state
        .system
        .query(&req.query, req.session_id.as_deref())
        .await
    {
        Ok(outcome) => Json(QueryResponse {
            answer: outcome.answer,
            sources: outcome
                .citations
                .into_iter()
                .map(|c| SourceInfo {
                    text: c.label,
                    link: c.link,
                })
                .collect(),
            session_id: outcome.session_id,
        })
        .into_response(),
        Err(e @ PensumError::InvalidInput(_)) => (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: e.to_string(),
            }),
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: e.to_string(),
            }),
        )
            .into_response(),
    }
}

async fn courses(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.system.analytics().await {
        Ok(analytics) => Json(CoursesResponse {
            total_courses: analytics.total_courses,
            course_titles: analytics.course_titles,
        })
        .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: e.to_string(),
            }),
        )
            .into_response(),
    }
}
