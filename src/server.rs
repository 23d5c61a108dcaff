//! HTTP tool server.
//!
//! Exposes the store's tool surface as a JSON API suitable for integration
//! with MCP-style AI tool clients. Every tool is dispatched through the same
//! `POST /tools/{name}` handler.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/tools/list` | List available tools |
//! | `POST` | `/tools/{name}` | Call a tool by name |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "input_error", "message": "query must not be empty" } }
//! ```
//!
//! Codes: `input_error` (400), `not_found` (404), `backend_unavailable` and
//! `backend_error` (502), `persistence_error` (500), `unknown_tool` (404).

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::config::Config;
use crate::error::StoreError;
use crate::models::TagSpec;
use crate::store::MemoryStore;

#[derive(Clone)]
struct AppState {
    store: Arc<MemoryStore>,
    config: Arc<Config>,
}

/// Serve the tool API on the configured bind address until the process is
/// terminated.
pub async fn run_server(store: Arc<MemoryStore>, config: &Config) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();

    let state = AppState {
        store,
        config: Arc::new(config.clone()),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/tools/list", get(handle_list_tools))
        .route("/tools/{name}", post(handle_tool_call))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state);

    info!("tool server listening on http://{bind_addr}");
    println!("Tool server listening on http://{bind_addr}");

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "input_error",
        message: message.into(),
    }
}

fn unknown_tool(name: &str) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "unknown_tool",
        message: format!("no tool registered with name: {name}"),
    }
}

fn map_store_error(err: StoreError) -> AppError {
    let message = err.to_string();
    let (status, code) = match err {
        StoreError::Input(_) => (StatusCode::BAD_REQUEST, "input_error"),
        StoreError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
        StoreError::BackendUnavailable(_) => (StatusCode::BAD_GATEWAY, "backend_unavailable"),
        StoreError::Backend(_) => (StatusCode::BAD_GATEWAY, "backend_error"),
        StoreError::Persistence(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "persistence_error")
        }
    };

    AppError {
        status,
        code,
        message,
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ GET /tools/list ============

#[derive(Serialize)]
struct ToolInfo {
    name: &'static str,
    description: &'static str,
}

const TOOLS: &[ToolInfo] = &[
    ToolInfo {
        name: "remember",
        description: "Store a short note in semantic memory",
    },
    ToolInfo {
        name: "ingest",
        description: "Chunk and store long-form content or a text file",
    },
    ToolInfo {
        name: "recall",
        description: "Semantic search returning ranked document snippets",
    },
    ToolInfo {
        name: "forget",
        description: "Delete documents and their chunks by id",
    },
    ToolInfo {
        name: "list",
        description: "List stored documents, newest first",
    },
    ToolInfo {
        name: "download",
        description: "Export documents as line-delimited JSON",
    },
    ToolInfo {
        name: "upload",
        description: "Import line-delimited JSON records",
    },
];

async fn handle_list_tools() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "tools": TOOLS }))
}

// ============ POST /tools/{name} ============

#[derive(Deserialize)]
struct RememberParams {
    content: String,
    tags: Option<TagSpec>,
}

#[derive(Deserialize)]
struct IngestParams {
    content: Option<String>,
    filename: Option<PathBuf>,
    tags: Option<TagSpec>,
}

#[derive(Deserialize)]
struct RecallParams {
    query: String,
    limit: Option<usize>,
    threshold: Option<f32>,
    tags: Option<TagSpec>,
    hyde: Option<bool>,
}

/// Id input for `forget`: one id or a list.
#[derive(Deserialize)]
#[serde(untagged)]
enum IdSpec {
    One(String),
    Many(Vec<String>),
}

impl IdSpec {
    fn into_vec(self) -> Vec<String> {
        match self {
            IdSpec::One(id) => vec![id],
            IdSpec::Many(ids) => ids,
        }
    }
}

#[derive(Deserialize)]
struct ForgetParams {
    ids: IdSpec,
}

#[derive(Deserialize)]
struct PageParams {
    offset: Option<usize>,
    limit: Option<usize>,
    tags: Option<TagSpec>,
}

#[derive(Deserialize)]
struct UploadParams {
    jsonl: String,
}

fn tags_of(input: Option<TagSpec>) -> Vec<String> {
    input.map(TagSpec::normalize).unwrap_or_default()
}

fn parse<T: serde::de::DeserializeOwned>(params: serde_json::Value) -> Result<T, AppError> {
    serde_json::from_value(params).map_err(|e| bad_request(e.to_string()))
}

async fn handle_tool_call(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(params): Json<serde_json::Value>,
) -> Result<Json<serde_json::Value>, AppError> {
    let store = &state.store;
    let retrieval = &state.config.retrieval;

    let result = match name.as_str() {
        "remember" => {
            let p: RememberParams = parse(params)?;
            let outcome = store
                .remember(&p.content, tags_of(p.tags))
                .await
                .map_err(map_store_error)?;
            serde_json::to_value(outcome)
        }
        "ingest" => {
            let p: IngestParams = parse(params)?;
            let outcome = store
                .ingest(p.content, p.filename.as_deref(), tags_of(p.tags))
                .await
                .map_err(map_store_error)?;
            serde_json::to_value(outcome)
        }
        "recall" => {
            let p: RecallParams = parse(params)?;
            let hits = store
                .recall(
                    &p.query,
                    p.limit.unwrap_or(retrieval.default_limit),
                    p.threshold.unwrap_or(retrieval.default_threshold),
                    tags_of(p.tags),
                    p.hyde.unwrap_or(false),
                )
                .await
                .map_err(map_store_error)?;
            serde_json::to_value(hits)
        }
        "forget" => {
            let p: ForgetParams = parse(params)?;
            let outcome = store
                .forget(&p.ids.into_vec())
                .await
                .map_err(map_store_error)?;
            serde_json::to_value(outcome)
        }
        "list" => {
            let p: PageParams = parse(params)?;
            let page = store
                .list(
                    tags_of(p.tags),
                    p.offset.unwrap_or(0),
                    p.limit.unwrap_or(10),
                )
                .await
                .map_err(map_store_error)?;
            serde_json::to_value(page)
        }
        "download" => {
            let p: PageParams = parse(params)?;
            let records = store
                .download(
                    tags_of(p.tags),
                    p.offset.unwrap_or(0),
                    p.limit.unwrap_or(50),
                )
                .await
                .map_err(map_store_error)?;
            let jsonl: Vec<String> = records
                .iter()
                .map(|r| serde_json::to_string(r).unwrap_or_default())
                .collect();
            serde_json::to_value(serde_json::json!({
                "records": records.len(),
                "jsonl": jsonl.join("\n"),
            }))
        }
        "upload" => {
            let p: UploadParams = parse(params)?;
            let report = store.upload(&p.jsonl).await.map_err(map_store_error)?;
            serde_json::to_value(report)
        }
        other => return Err(unknown_tool(other)),
    };

    let result = result.map_err(|e| map_store_error(StoreError::Persistence(e.to_string())))?;

    Ok(Json(serde_json::json!({ "result": result })))
}
