//! REST API endpoints for the tally-service.
//!
//! # Concurrency and Lock Acquisition
//!
//! - **`state.config`** (RwLock): read to resolve the default collection and
//!   output settings. Released before the store is touched.
//! - **`state.store`** (Mutex): held for the duration of one database call.
//!   Aggregations lock it through their
//!   [`CollectionHandle`](tally_store::CollectionHandle).
//!
//! ## Error Handling
//!
//! All endpoints return structured JSON errors via [`AppError`]: a bad
//! timestamp, an unknown group type or a malformed value is a 400, a missing
//! collection a 404, and any store failure a 500.
//!
//! # Example
//!
//! ```ignore
//! use axum::Router;
//! use tally_service::api;
//!
//! let app = api::router().with_state(state);
//! ```

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{
        FromRequest, FromRequestParts, Query, Request, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{StatusCode, request::Parts},
    response::IntoResponse,
    routing::{get, post},
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::{error, warn};

use tally_core::timestamp;
use tally_core::{AggregateRequest, AggregateResponse, TimeInput};
use tally_store::{CollectionStats, RecordQuery};
use tally_types::{Amount, Record};

use crate::state::AppState;

/// Create the API router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/aggregate", get(aggregate_query).post(aggregate))
        .route("/api/records", get(list_records).post(insert_records))
        .route("/api/records/stats", get(record_stats))
}

/// JSON body extractor whose rejections use the `{"error": ...}` shape.
#[derive(Debug)]
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

/// Query string extractor whose rejections use the `{"error": ...}` shape.
#[derive(Debug)]
pub struct ApiQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

/// Health check endpoint.
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: OffsetDateTime::now_utc(),
    })
}

/// Body of `POST /api/aggregate`.
#[derive(Debug, Deserialize)]
pub struct AggregateBody {
    #[serde(flatten)]
    pub request: AggregateRequest,
    /// Collection to read; the configured default when absent.
    #[serde(default)]
    pub collection: Option<String>,
    /// Overrides `output.drop_timezone`.
    #[serde(default)]
    pub drop_timezone: Option<bool>,
}

/// Query string of `GET /api/aggregate`.
#[derive(Debug, Deserialize)]
pub struct AggregateParams {
    #[serde(alias = "dt_from")]
    pub start_time: String,
    #[serde(alias = "dt_upto")]
    pub end_time: String,
    #[serde(default)]
    pub group_type: Option<String>,
    #[serde(default)]
    pub collection: Option<String>,
    #[serde(default)]
    pub drop_timezone: Option<bool>,
}

async fn run_aggregate(
    state: &AppState,
    request: AggregateRequest,
    collection: Option<&str>,
    drop_timezone: Option<bool>,
) -> Result<AggregateResponse, AppError> {
    let drop_timezone = match drop_timezone {
        Some(drop) => drop,
        None => state.config.read().await.output.drop_timezone,
    };
    let aggregator = state.aggregator(collection).await;
    Ok(aggregator.handle(request, drop_timezone).await?)
}

/// Aggregate a window into calendar buckets.
async fn aggregate(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<AggregateBody>,
) -> Result<Json<AggregateResponse>, AppError> {
    let response = run_aggregate(
        &state,
        body.request,
        body.collection.as_deref(),
        body.drop_timezone,
    )
    .await?;
    Ok(Json(response))
}

/// Query-string form of [`aggregate`].
async fn aggregate_query(
    State(state): State<Arc<AppState>>,
    ApiQuery(params): ApiQuery<AggregateParams>,
) -> Result<Json<AggregateResponse>, AppError> {
    let request = AggregateRequest {
        start_time: TimeInput::from(params.start_time),
        end_time: TimeInput::from(params.end_time),
        group_type: params.group_type,
    };
    let response = run_aggregate(
        &state,
        request,
        params.collection.as_deref(),
        params.drop_timezone,
    )
    .await?;
    Ok(Json(response))
}

/// Collection selector shared by the record endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct CollectionParams {
    #[serde(default)]
    pub collection: Option<String>,
}

/// One record in an insert body.
#[derive(Debug, Deserialize)]
pub struct RecordBody {
    pub timestamp: TimeInput,
    pub value: Amount,
}

/// Insert response.
#[derive(Debug, Serialize)]
pub struct InsertResponse {
    pub collection: String,
    pub inserted: usize,
}

async fn resolve_collection(state: &AppState, requested: Option<String>) -> String {
    match requested {
        Some(name) => name,
        None => state.config.read().await.storage.collection.clone(),
    }
}

/// Insert records. Either every record is written or none is.
async fn insert_records(
    State(state): State<Arc<AppState>>,
    ApiQuery(params): ApiQuery<CollectionParams>,
    ApiJson(body): ApiJson<Vec<RecordBody>>,
) -> Result<(StatusCode, Json<InsertResponse>), AppError> {
    let records = body
        .into_iter()
        .enumerate()
        .map(|(i, row)| {
            timestamp::parse(row.timestamp)
                .map(|ts| Record::new(ts, row.value))
                .map_err(|e| AppError::BadRequest(format!("record {}: {}", i, e)))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let collection = resolve_collection(&state, params.collection).await;
    let inserted = {
        let mut store = state.store.lock().await;
        store.insert_records(&collection, &records)?
    };

    Ok((
        StatusCode::CREATED,
        Json(InsertResponse {
            collection,
            inserted,
        }),
    ))
}

/// Query parameters for listing records.
#[derive(Debug, Default, Deserialize)]
pub struct RecordsParams {
    #[serde(default)]
    pub collection: Option<String>,
    #[serde(default)]
    pub since: Option<String>,
    #[serde(default)]
    pub until: Option<String>,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub offset: Option<u32>,
}

/// A record as listed by the API.
#[derive(Debug, Serialize)]
pub struct RecordResponse {
    pub id: i64,
    pub timestamp: String,
    pub value: Amount,
}

/// List records of one collection, newest first.
async fn list_records(
    State(state): State<Arc<AppState>>,
    ApiQuery(params): ApiQuery<RecordsParams>,
) -> Result<Json<Vec<RecordResponse>>, AppError> {
    let collection = resolve_collection(&state, params.collection).await;
    let mut query = RecordQuery::new().collection(&collection);

    if let Some(since) = params.since {
        query = query.since(timestamp::parse(since)?);
    }
    if let Some(until) = params.until {
        query = query.until(timestamp::parse(until)?);
    }
    if let Some(limit) = params.limit {
        query = query.limit(limit);
    }
    if let Some(offset) = params.offset {
        query = query.offset(offset);
    }

    let store = state.store.lock().await;
    let records = store.query_records(&query)?;
    Ok(Json(
        records
            .into_iter()
            .map(|r| RecordResponse {
                id: r.id,
                timestamp: timestamp::to_iso(r.timestamp, false),
                value: r.value,
            })
            .collect(),
    ))
}

/// Per-collection count, time bounds and total.
async fn record_stats(
    State(state): State<Arc<AppState>>,
    ApiQuery(params): ApiQuery<CollectionParams>,
) -> Result<Json<Vec<CollectionStats>>, AppError> {
    let store = state.store.lock().await;
    let stats = store.stats(params.collection.as_deref())?;
    Ok(Json(stats))
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    BadRequest(String),
    Aggregate(tally_core::Error),
    Store(tally_store::Error),
}

impl From<tally_store::Error> for AppError {
    fn from(e: tally_store::Error) -> Self {
        match e {
            tally_store::Error::CollectionNotFound(name) => {
                AppError::NotFound(format!("Collection not found: {}", name))
            }
            tally_store::Error::InvalidCollection(_) => AppError::BadRequest(e.to_string()),
            other => AppError::Store(other),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<tally_core::Error> for AppError {
    fn from(e: tally_core::Error) -> Self {
        AppError::Aggregate(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Aggregate(e) if e.is_client_error() => {
                (StatusCode::BAD_REQUEST, e.to_string())
            }
            AppError::Aggregate(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            AppError::Store(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
        };

        if status.is_server_error() {
            error!("Request failed: {}", message);
        } else {
            warn!("Rejected request: {}", message);
        }

        let body = serde_json::json!({
            "error": message,
        });

        (status, Json(body)).into_response()
    }
}
