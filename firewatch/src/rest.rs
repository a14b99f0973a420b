use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

use crate::auth::{self, Principal, TokenStore};
use crate::config::Config;
use crate::errors::Error;
use crate::export::SheetEncoder;
use crate::metrics::{
    INGEST_LATENCY_SECONDS, INVALID_SAMPLES_TOTAL, SAMPLES_TOTAL, STORE_FAILURES_TOTAL,
    UNAUTHORIZED_TOTAL,
};
use crate::model::{CurrentView, HistoryResponse, SampleView};
use crate::online::is_online;
use crate::store::{Order, TelemetryStore};
use crate::train::Trainer;
use crate::validate::parse_payload;

#[derive(Clone)]
pub struct AppState {
    pub store: TelemetryStore,
    pub tokens: Arc<TokenStore>,
    pub trainer: Arc<dyn Trainer>,
    pub encoder: Arc<dyn SheetEncoder>,
    pub config: Arc<Config>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/api/health", get(health))
        .route("/api/sensor", post(post_sensor))
        .route("/api/current", get(get_current))
        .route("/api/history", get(get_history))
        .route("/api/login", post(login))
        .route("/api/logout", post(logout))
        .route("/api/admin/delete_history", post(delete_history))
        .route("/api/admin/export_excel", get(export_history))
        .route("/api/admin/train_ai", post(train_ai))
        .with_state(state)
}

async fn home() -> &'static str {
    "Firewatch server is running"
}

async fn health() -> Json<Value> {
    Json(json!({"ok": true, "server_time": Utc::now().timestamp()}))
}

async fn post_sensor(
    State(state): State<AppState>,
    body: String,
) -> Result<Json<Value>, ApiError> {
    SAMPLES_TOTAL.inc();

    let payload: Value = if body.trim().is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&body).map_err(|e| {
            INVALID_SAMPLES_TOTAL.inc();
            Error::Validation(format!("malformed JSON payload: {e}"))
        })?
    };

    let input = match parse_payload(&payload) {
        Ok(input) => input,
        Err(e) => {
            INVALID_SAMPLES_TOTAL.inc();
            return Err(e.into());
        }
    };

    // Timestamp is assigned here, at acceptance, not at request arrival.
    let start = Instant::now();
    let classified = state
        .store
        .ingest(input, Utc::now().timestamp())
        .await
        .map_err(|e| {
            STORE_FAILURES_TOTAL.inc();
            error!("ingest failed: {}", e);
            ApiError::from(e)
        })?;
    INGEST_LATENCY_SECONDS.observe(start.elapsed().as_secs_f64());

    Ok(Json(json!({
        "ok": true,
        "status": classified.status,
        "level": classified.status.level(),
    })))
}

async fn get_current(State(state): State<AppState>) -> Result<Json<CurrentView>, ApiError> {
    let current = state.store.current().await?;
    let online = is_online(
        current.map(|c| c.reading.timestamp),
        Utc::now().timestamp(),
        state.config.online_window_secs,
    );
    Ok(Json(CurrentView {
        sample: current.map(SampleView::from),
        online,
    }))
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    limit: Option<usize>,
    order: Option<String>,
}

async fn get_history(
    State(state): State<AppState>,
    Query(params): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let limit = params
        .limit
        .unwrap_or(state.config.history_default_limit)
        .clamp(1, state.config.history_max_limit);
    let order = match params.order.as_deref() {
        Some("asc") => Order::Ascending,
        _ => Order::Descending,
    };

    let items = state.store.history(limit, order).await?;
    Ok(Json(HistoryResponse {
        ok: true,
        items: items.into_iter().map(SampleView::from).collect(),
    }))
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

async fn login(
    State(state): State<AppState>,
    body: Option<Json<LoginRequest>>,
) -> Result<Json<Value>, ApiError> {
    let req = body.map(|Json(b)| b).unwrap_or_default();

    if req.username == state.config.admin_user && req.password == state.config.admin_pass {
        let (token, expires_in) = state.tokens.issue(Utc::now().timestamp());
        info!("admin login");
        Ok(Json(json!({"ok": true, "token": token, "expires_in": expires_in})))
    } else {
        warn!("rejected login for {:?}", req.username);
        Err(Error::Unauthorized("invalid username or password").into())
    }
}

async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    gate(&state, &headers, None)?;
    if let Some(token) = auth::bearer_token(&headers) {
        state.tokens.revoke(&token);
    }
    Ok(Json(json!({"ok": true})))
}

#[derive(Debug, Default, Deserialize)]
pub struct DeleteRequest {
    #[serde(default)]
    mode: String,
    timestamp: Option<i64>,
}

async fn delete_history(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Option<Json<DeleteRequest>>,
) -> Result<Json<Value>, ApiError> {
    gate(&state, &headers, None)?;
    let req = body.map(|Json(b)| b).unwrap_or_default();

    match req.mode.as_str() {
        "all" => {
            let deleted = state.store.delete_history().await?;
            info!("history cleared, {} rows removed", deleted);
            Ok(Json(json!({"ok": true, "deleted": deleted})))
        }
        "older_than" => {
            let cutoff = req.timestamp.unwrap_or(0);
            if cutoff <= 0 {
                return Err(Error::Validation("timestamp must be positive".to_string()).into());
            }
            let deleted = state.store.delete_history_older_than(cutoff).await?;
            info!("history before {} cleared, {} rows removed", cutoff, deleted);
            Ok(Json(json!({
                "ok": true,
                "deleted": deleted,
                "mode": "older_than",
                "timestamp": cutoff,
            })))
        }
        _ => Err(Error::Validation("mode must be \"all\" or \"older_than\"".to_string()).into()),
    }
}

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    limit: Option<usize>,
    token: Option<String>,
}

async fn export_history(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<ExportQuery>,
) -> Result<Response, ApiError> {
    gate(&state, &headers, params.token.as_deref())?;

    let limit = params
        .limit
        .unwrap_or(state.config.export_default_limit)
        .clamp(1, state.config.export_max_limit);
    let rows = state.store.history(limit, Order::Descending).await?;
    let sheet = state.encoder.encode(&rows)?;

    let filename = format!(
        "sensor_history_{}.{}",
        Utc::now().timestamp(),
        sheet.extension
    );
    let response_headers = [
        (header::CONTENT_TYPE, sheet.content_type.to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{filename}\""),
        ),
    ];
    Ok((response_headers, sheet.bytes).into_response())
}

#[derive(Debug, Deserialize)]
pub struct TrainRequest {
    limit: Option<usize>,
}

async fn train_ai(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Option<Json<TrainRequest>>,
) -> Result<Json<Value>, ApiError> {
    gate(&state, &headers, None)?;

    let limit = body
        .and_then(|Json(b)| b.limit)
        .unwrap_or(state.config.train_default_limit)
        .clamp(50, state.config.train_max_limit);
    let samples = state.store.history(limit, Order::Ascending).await?;
    let trained = state.trainer.retrain(&samples)?;
    info!("baseline retrained on {} samples", trained);

    Ok(Json(json!({"ok": true, "trained_samples": trained})))
}

/// Authorizes an admin request, counting rejections. Handlers call this
/// before any side effect.
fn gate(
    state: &AppState,
    headers: &HeaderMap,
    query_token: Option<&str>,
) -> Result<Principal, ApiError> {
    auth::authorize(&state.tokens, headers, query_token, Utc::now().timestamp()).map_err(|e| {
        UNAUTHORIZED_TOTAL.inc();
        ApiError::from(e)
    })
}

#[derive(Debug)]
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("API error: {}", self.0);
        }
        (
            status,
            Json(json!({"ok": false, "error": self.0.to_string()})),
        )
            .into_response()
    }
}
