//! JSON shapes exchanged with clients: request bodies, answer payloads and
//! the response envelope wrapping every answer.

use crate::clustering::{ClusterView, Point};
use crate::error::EngineResult;
use serde::{Deserialize, Serialize};

/// Envelope status reported on success. Clients treat 100..200 as success.
pub const STATUS_OK: u16 = 100;

/// Message carried by undecodable bodies.
pub const INCORRECT_JSON: &str = "incorrect json";

/// Message carried by malformed URL parameters.
pub const INCORRECT_REQUEST: &str = "incorrect request";

/// Wrapper around every response body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Envelope<T> {
    pub status: u16,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Stable machine-readable error code, absent on success
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl<T> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            status: STATUS_OK,
            message: "ok".to_string(),
            data: Some(data),
            code: None,
        }
    }

    pub fn is_success(&self) -> bool {
        (100..200).contains(&self.status)
    }
}

impl Envelope<()> {
    pub fn error(status: u16, message: impl Into<String>, code: Option<String>) -> Self {
        Self {
            status,
            message: message.into(),
            data: None,
            code,
        }
    }
}

/// A point as sent by clients: either a coordinate array or a 2-D object.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PointInput {
    Coords(Vec<f64>),
    Planar { x: f64, y: f64 },
}

impl PointInput {
    pub fn into_point(self) -> EngineResult<Point> {
        match self {
            Self::Coords(coords) => Point::new(coords),
            Self::Planar { x, y } => Point::new(vec![x, y]),
        }
    }
}

/// Converts a whole batch, failing on the first invalid item.
pub fn into_points(inputs: Vec<PointInput>) -> EngineResult<Vec<Point>> {
    inputs.into_iter().map(PointInput::into_point).collect()
}

#[derive(Debug, Deserialize)]
pub struct AddPointRequest {
    pub id: i64,
    #[serde(default)]
    pub points: Vec<PointInput>,
}

#[derive(Debug, Deserialize)]
pub struct AddClusterRequest {
    pub id: i64,
    #[serde(default)]
    pub clusters: Vec<PointInput>,
}

/// Zero or missing `dist_id`/`max_age` select the configured defaults.
#[derive(Debug, Deserialize)]
pub struct TrainRequest {
    pub id: i64,
    #[serde(default)]
    pub dist_id: i64,
    #[serde(default)]
    pub max_age: i64,
    #[serde(default)]
    pub by_step: bool,
}

#[derive(Debug, Deserialize)]
pub struct ClearAreaRequest {
    pub id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AddAreaAnswer {
    pub id: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusAnswer {
    pub status: String,
}

impl StatusAnswer {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrainAnswer {
    pub finished: bool,
    /// Iterations performed on the area since its creation or last clear
    pub iterations: u64,
    pub clusters: Vec<ClusterView>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AreaAnswer {
    pub clusters: Vec<ClusterView>,
}
