//! Request handlers: decode the body, resolve ids, call the engine, wrap the
//! answer in an [`Envelope`].

use super::envelope::{
    AddAreaAnswer, AddClusterRequest, AddPointRequest, AreaAnswer, ClearAreaRequest, Envelope,
    StatusAnswer, TrainAnswer, TrainRequest, into_points,
};
use crate::clustering::{DistanceFunc, DistanceInfo, Training};
use crate::config::TrainingConfig;
use crate::error::EngineError;
use crate::storage::AreaStore;
use crate::types::MaxAge;
use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, error, warn};

/// Shared state handed to every handler.
#[derive(Clone, Debug)]
pub struct AppState {
    pub store: AreaStore,
    pub training: TrainingConfig,
}

impl AppState {
    pub fn new(store: AreaStore, training: TrainingConfig) -> Self {
        Self { store, training }
    }

    fn metric(&self, dist_id: i64) -> Result<DistanceFunc, EngineError> {
        let id = if dist_id == 0 {
            i64::from(self.training.default_distance)
        } else {
            dist_id
        };
        DistanceFunc::lookup(id)
    }

    fn max_age(&self, max_age: i64) -> Result<MaxAge, EngineError> {
        if max_age == 0 {
            MaxAge::new(i64::from(self.training.default_max_age))
        } else {
            MaxAge::new(max_age)
        }
    }
}

/// Errors surfaced by the HTTP layer
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("incorrect json")]
    IncorrectJson(#[source] serde_json::Error),

    #[error("incorrect request")]
    IncorrectRequest,

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("Engine task failed: {0}")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::IncorrectJson(_) | Self::IncorrectRequest => StatusCode::BAD_REQUEST,
            Self::Engine(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = match &self {
            Self::Engine(e) => Some(e.status_code()),
            _ => None,
        };

        match &self {
            Self::IncorrectJson(source) => warn!(%source, "rejected request body"),
            Self::Internal(reason) => error!(%reason, "request failed"),
            other => warn!(error = %other, "request failed"),
        }

        let body = Envelope::error(status.as_u16(), self.to_string(), code);
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<Json<Envelope<T>>, ApiError>;

/// Bodies are decoded from raw bytes: browser clients post JSON text with a
/// form content type.
fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(ApiError::IncorrectJson)
}

/// Runs an engine call on the blocking pool. Area operations wait on the
/// area's mutex, which a training run may hold for many iterations.
async fn off_runtime<T, F>(work: F) -> Result<T, ApiError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))
}

fn parse_param(raw: &str) -> Result<i64, ApiError> {
    raw.trim().parse().map_err(|_| ApiError::IncorrectRequest)
}

pub async fn health_check() -> &'static str {
    "OK"
}

pub async fn add_area(State(state): State<AppState>) -> ApiResult<AddAreaAnswer> {
    let id = state.store.create();
    Ok(Json(Envelope::ok(AddAreaAnswer { id: id.get() })))
}

pub async fn add_point(State(state): State<AppState>, body: Bytes) -> ApiResult<StatusAnswer> {
    let request: AddPointRequest = parse_body(&body)?;
    let area = state.store.get_raw(request.id)?;
    let points = into_points(request.points)?;
    off_runtime(move || area.add_points(points)).await??;
    Ok(Json(Envelope::ok(StatusAnswer::ok())))
}

pub async fn add_cluster(State(state): State<AppState>, body: Bytes) -> ApiResult<StatusAnswer> {
    let request: AddClusterRequest = parse_body(&body)?;
    let area = state.store.get_raw(request.id)?;
    let centers = into_points(request.clusters)?;
    off_runtime(move || area.add_clusters(centers)).await??;
    Ok(Json(Envelope::ok(StatusAnswer::ok())))
}

pub async fn train(State(state): State<AppState>, body: Bytes) -> ApiResult<TrainAnswer> {
    let request: TrainRequest = parse_body(&body)?;
    let area = state.store.get_raw(request.id)?;
    let metric = state.metric(request.dist_id)?;
    // The budget only matters for a full run
    let training = if request.by_step {
        Training::Step
    } else {
        Training::UpTo(state.max_age(request.max_age)?)
    };

    let report = off_runtime(move || area.train_and_report(metric, training)).await?;

    debug!(
        area = request.id,
        %metric,
        ?training,
        finished = report.finished,
        iterations = report.iterations,
        "train request served"
    );
    Ok(Json(Envelope::ok(TrainAnswer {
        finished: report.finished,
        iterations: report.iterations,
        clusters: report.clusters,
    })))
}

pub async fn get_area(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<AreaAnswer> {
    area_answer(&state, &id, None).await
}

pub async fn get_area_with_metric(
    State(state): State<AppState>,
    Path((id, dist_id)): Path<(String, String)>,
) -> ApiResult<AreaAnswer> {
    area_answer(&state, &id, Some(&dist_id)).await
}

async fn area_answer(state: &AppState, id: &str, dist_id: Option<&str>) -> ApiResult<AreaAnswer> {
    let id = parse_param(id)?;
    let dist_id = dist_id.map(parse_param).transpose()?.unwrap_or(0);

    let area = state.store.get_raw(id)?;
    let metric = state.metric(dist_id)?;
    let clusters = off_runtime(move || area.clusters_with_points(metric)).await?;
    Ok(Json(Envelope::ok(AreaAnswer { clusters })))
}

pub async fn clear_area(State(state): State<AppState>, body: Bytes) -> ApiResult<StatusAnswer> {
    let request: ClearAreaRequest = parse_body(&body)?;
    let area = state.store.get_raw(request.id)?;
    off_runtime(move || area.clear()).await?;
    Ok(Json(Envelope::ok(StatusAnswer::ok())))
}

pub async fn list_distances() -> Json<Envelope<Vec<DistanceInfo>>> {
    Json(Envelope::ok(DistanceFunc::describe_catalog()))
}
