use crate::config::{ApiConfig, RetentionConfig};
use crate::errors::Error;
use crate::model::{HealthReport, Reading, ReadingFilter, ReadingValue, Statistics};
use crate::pagination::{validate_time_bound, PageInfo, PaginationParams};
use crate::store::ReadingStore;
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, error};

/// Devices seen within this window count as active in `/api/stats`.
const ACTIVE_WINDOW_HOURS: i64 = 24;

#[derive(Debug, Clone)]
pub struct AppState {
    pub store: ReadingStore,
    pub api: ApiConfig,
    pub retention: RetentionConfig,
    pub show_error_details: bool,
}

#[derive(Debug, Deserialize)]
pub struct IngestRequest {
    device_id: Option<Value>,
    device_name: Option<Value>,
    data: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(flatten)]
    page: PaginationParams,
    count: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DataQuery {
    device_id: Option<String>,
    from_date: Option<String>,
    to_date: Option<String>,
    #[serde(flatten)]
    page: PaginationParams,
    count: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FilterEcho {
    device_id: Option<String>,
    from_date: Option<String>,
    to_date: Option<String>,
}

/// Page of readings returned by the history and data endpoints
#[derive(Debug, Serialize)]
pub struct ReadingsResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    pub count: usize,
    pub data: Vec<Reading>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filters: Option<FilterEcho>,
    pub pagination: PageInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_count: Option<i64>,
    pub timestamp: DateTime<Utc>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/data", get(get_data).post(post_data))
        .route("/api/devices", get(get_devices))
        .route("/api/device/:id/history", get(get_device_history))
        .route("/api/stats", get(get_stats))
        .route("/api/health", get(get_health))
        .route("/api/config", get(get_config))
        .with_state(state)
}

async fn post_data(
    State(state): State<AppState>,
    body: Result<Json<IngestRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let Json(req) = body.map_err(|e| AppError::BadRequest(json!({ "error": e.body_text() })))?;

    let (Some(device_id), Some(device_name), Some(data)) =
        (&req.device_id, &req.device_name, &req.data)
    else {
        return Err(AppError::BadRequest(json!({
            "error": "Missing required fields",
            "required": ["device_id", "device_name", "data"],
            "received": {
                "device_id": &req.device_id,
                "device_name": &req.device_name,
                "data": if req.data.is_some() { "provided" } else { "missing" },
            },
        })));
    };

    let device_id = non_empty_str(device_id, "device_id")?;
    let device_name = non_empty_str(device_name, "device_name")?;

    let id = state
        .store
        .insert(device_id, device_name, &ReadingValue::from(data.clone()))
        .await
        .map_err(|e| state.fail(e, "Failed to upload data"))?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Data uploaded successfully",
            "id": id,
            "timestamp": Utc::now(),
        })),
    ))
}

async fn get_devices(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let devices = state
        .store
        .latest_per_device()
        .await
        .map_err(|e| state.fail(e, "Failed to fetch devices"))?;

    Ok(Json(json!({
        "success": true,
        "count": devices.len(),
        "data": devices,
        "timestamp": Utc::now(),
    })))
}

async fn get_device_history(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<HistoryQuery>,
) -> Result<Json<ReadingsResponse>, AppError> {
    let device_id = id.trim();
    if device_id.is_empty() {
        return Err(AppError::BadRequest(json!({ "error": "Invalid device ID" })));
    }

    let page = params
        .page
        .normalize(state.api.default_limit, state.api.max_limit);
    debug!(
        device_id,
        limit = page.limit,
        offset = page.offset,
        "Fetching device history"
    );

    let history = state
        .store
        .history(device_id, page)
        .await
        .map_err(|e| state.fail(e, "Failed to fetch device history"))?;

    let total_count = if wants_count(params.count.as_deref()) {
        Some(
            state
                .store
                .count(&ReadingFilter::device(device_id))
                .await
                .map_err(|e| state.fail(e, "Failed to fetch device history"))?,
        )
    } else {
        None
    };

    Ok(Json(ReadingsResponse {
        success: true,
        device_id: Some(device_id.to_string()),
        count: history.len(),
        pagination: page.page_info(history.len()),
        data: history,
        filters: None,
        total_count,
        timestamp: Utc::now(),
    }))
}

async fn get_data(
    State(state): State<AppState>,
    Query(params): Query<DataQuery>,
) -> Result<Json<ReadingsResponse>, AppError> {
    let page = params
        .page
        .normalize(state.api.default_limit, state.api.max_limit);

    let from = validate_time_bound(params.from_date.as_deref(), "from_date")?;
    let to = validate_time_bound(params.to_date.as_deref(), "to_date")?;
    let device_id = params
        .device_id
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    let filter = ReadingFilter {
        device_id: device_id.clone(),
        from,
        to,
    };

    let data = state
        .store
        .filtered(&filter, page)
        .await
        .map_err(|e| state.fail(e, "Failed to fetch data"))?;

    let total_count = if wants_count(params.count.as_deref()) {
        Some(
            state
                .store
                .count(&filter)
                .await
                .map_err(|e| state.fail(e, "Failed to fetch data"))?,
        )
    } else {
        None
    };

    Ok(Json(ReadingsResponse {
        success: true,
        device_id: None,
        count: data.len(),
        pagination: page.page_info(data.len()),
        data,
        filters: Some(FilterEcho {
            device_id,
            from_date: params.from_date.filter(|s| !s.is_empty()),
            to_date: params.to_date.filter(|s| !s.is_empty()),
        }),
        total_count,
        timestamp: Utc::now(),
    }))
}

async fn get_stats(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let statistics: Statistics = state
        .store
        .stats(chrono::Duration::hours(ACTIVE_WINDOW_HOURS))
        .await
        .map_err(|e| state.fail(e, "Failed to fetch statistics"))?;

    Ok(Json(json!({
        "success": true,
        "statistics": statistics,
        "timestamp": Utc::now(),
    })))
}

async fn get_health(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let health: HealthReport = state.store.health_probe().await;

    if health.is_healthy() {
        (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "database": health,
                "retention": {
                    "enabled": state.retention.enabled,
                    "days": state.retention.retention_days,
                },
            })),
        )
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "success": false,
                "database": health,
            })),
        )
    }
}

async fn get_config(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "success": true,
        "config": {
            "api": {
                "defaultLimit": state.api.default_limit,
                "maxLimit": state.api.max_limit,
            },
            "dataRetention": {
                "enabled": state.retention.enabled,
                "retentionDays": state.retention.retention_days,
            },
        },
    }))
}

fn non_empty_str<'a>(value: &'a Value, field: &str) -> Result<&'a str, AppError> {
    match value.as_str().map(str::trim) {
        Some(s) if !s.is_empty() => Ok(s),
        _ => Err(AppError::BadRequest(json!({
            "error": format!("{} must be a non-empty string", field)
        }))),
    }
}

fn wants_count(raw: Option<&str>) -> bool {
    raw == Some("true")
}

impl AppState {
    /// Maps a store error to a response, hiding storage details unless
    /// configured to show them.
    fn fail(&self, err: Error, context: &'static str) -> AppError {
        match err {
            Error::Validation(msg) => AppError::BadRequest(json!({ "error": msg })),
            other => {
                error!(transient = other.is_transient(), "{}: {}", context, other);
                // Pool timeouts and dropped connections are worth a retry
                let status = if other.is_transient() {
                    StatusCode::SERVICE_UNAVAILABLE
                } else {
                    StatusCode::INTERNAL_SERVER_ERROR
                };
                let message = if self.show_error_details {
                    other.to_string()
                } else {
                    context.to_string()
                };
                AppError::Internal { status, message }
            }
        }
    }
}

#[derive(Debug)]
enum AppError {
    BadRequest(Value),
    Internal { status: StatusCode, message: String },
}

impl From<Error> for AppError {
    fn from(err: Error) -> Self {
        match err {
            Error::Validation(msg) => AppError::BadRequest(json!({ "error": msg })),
            other => {
                error!("API error: {}", other);
                AppError::Internal {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    message: "Internal server error".to_string(),
                }
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::BadRequest(body) => (StatusCode::BAD_REQUEST, Json(body)).into_response(),
            AppError::Internal { status, message } => (
                status,
                Json(json!({
                    "error": "Internal server error",
                    "message": message,
                    "data": [],
                })),
            )
                .into_response(),
        }
    }
}
