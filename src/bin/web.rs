//! Quill HTTP 服务
//!
//! 启动: cargo run --bin quill-web --features web
//! 监听地址取自 [web].bind（默认 127.0.0.1:8000）

#![cfg(feature = "web")]

use std::net::SocketAddr;

use anyhow::Context;
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use quill::config::load_config;
use quill::core::{RuntimeConfig, RuntimeConfigUpdate};
use quill::observability::content_preview;
use quill::services::{AnalysisReport, CheckRequest, CheckResponse, EditRequest, EditResult};
use quill::{AppError, Services, ServicesBuilder};

#[derive(Clone)]
struct AppState {
    services: Services,
    log_content: bool,
}

type ApiResult<T> = Result<Json<T>, (StatusCode, String)>;

fn api_error(err: AppError) -> (StatusCode, String) {
    let status = StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if status.is_server_error() {
        tracing::error!("Request failed: {}", err);
    } else {
        tracing::warn!("Request rejected: {}", err);
    }
    (status, err.to_string())
}

#[derive(Deserialize)]
struct AnalyzeRequest {
    text: String,
}

#[derive(Serialize)]
struct ModelsResponse {
    models: Vec<String>,
}

/// GET /health
async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// GET /runtime/config：当前路由配置
async fn get_runtime_config(State(state): State<AppState>) -> Json<RuntimeConfig> {
    Json(state.services.store.get())
}

/// POST /runtime/config：部分更新并持久化，空字段保留旧值
async fn update_runtime_config(
    State(state): State<AppState>,
    Json(update): Json<RuntimeConfigUpdate>,
) -> ApiResult<RuntimeConfig> {
    state
        .services
        .update_runtime_config(update)
        .await
        .map(Json)
        .map_err(api_error)
}

/// GET /runtime/models：后端可用模型
async fn list_models(State(state): State<AppState>) -> ApiResult<ModelsResponse> {
    let models = state
        .services
        .list_available_models()
        .await
        .map_err(api_error)?;
    Ok(Json(ModelsResponse { models }))
}

/// POST /v1/text/check：语法检查，检查器不可用时返回空列表
async fn check_text(State(state): State<AppState>, Json(req): Json<CheckRequest>) -> Json<CheckResponse> {
    tracing::info!(
        "Grammar check request | chars={}{}",
        req.text.chars().count(),
        content_preview(state.log_content, &req.text)
    );
    Json(state.services.grammar.check(&req.text, req.config.as_ref()).await)
}

/// POST /v1/text/edit
async fn edit_text(State(state): State<AppState>, Json(req): Json<EditRequest>) -> ApiResult<EditResult> {
    tracing::info!(
        "Edit request | mode={} chars={}{}",
        req.mode,
        req.text.chars().count(),
        content_preview(state.log_content, &req.text)
    );
    state.services.editing.edit(&req).await.map(Json).map_err(api_error)
}

/// POST /v1/text/analyze
async fn analyze_text(State(state): State<AppState>, Json(req): Json<AnalyzeRequest>) -> ApiResult<AnalysisReport> {
    tracing::info!(
        "Analysis request | chars={}{}",
        req.text.chars().count(),
        content_preview(state.log_content, &req.text)
    );
    state.services.analysis.analyze(&req.text).await.map(Json).map_err(api_error)
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/runtime/config", get(get_runtime_config).post(update_runtime_config))
        .route("/runtime/models", get(list_models))
        .route("/v1/text/check", post(check_text))
        .route("/v1/text/edit", post(edit_text))
        .route("/v1/text/analyze", post(analyze_text))
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    quill::observability::init();

    let cfg = load_config(None).context("Failed to load config")?;
    let addr: SocketAddr = cfg
        .web
        .bind
        .parse()
        .with_context(|| format!("Invalid bind address: {}", cfg.web.bind))?;
    let log_content = cfg.app.log_content_enabled;
    tracing::info!("Starting quill-web | environment={}", cfg.app.environment);

    let services = ServicesBuilder::new(cfg)
        .build()
        .context("Failed to build services")?;
    let app = router(AppState { services, log_content });

    tracing::info!("Quill web listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("Quill web stopped");
    Ok(())
}

/// Ctrl+C 或 SIGTERM 时停止接收新连接，在途请求处理完后退出
async fn shutdown_signal() {
    let ctrl_c = async {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Received Ctrl+C, shutting down");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM, shutting down");
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
