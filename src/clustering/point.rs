//! Value types manipulated by the engine: points, clusters and the
//! cluster/member projection reported back to callers.

use crate::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};

/// An immutable coordinate tuple.
///
/// Construction rejects empty and non-finite coordinates, so every stored
/// point is usable by every distance function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct Point(Vec<f64>);

impl Point {
    pub fn new(coords: Vec<f64>) -> EngineResult<Self> {
        if coords.is_empty() {
            return Err(EngineError::InvalidPoint {
                reason: "a point needs at least one coordinate".to_string(),
            });
        }
        if let Some(pos) = coords.iter().position(|c| !c.is_finite()) {
            return Err(EngineError::InvalidPoint {
                reason: format!("coordinate {pos} is not a finite number"),
            });
        }
        Ok(Self(coords))
    }

    /// Number of coordinates.
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn coords(&self) -> &[f64] {
        &self.0
    }

    pub(crate) fn coords_mut(&mut self) -> &mut [f64] {
        &mut self.0
    }
}

impl TryFrom<Vec<f64>> for Point {
    type Error = EngineError;

    fn try_from(coords: Vec<f64>) -> Result<Self, Self::Error> {
        Self::new(coords)
    }
}

impl From<Point> for Vec<f64> {
    fn from(point: Point) -> Self {
        point.0
    }
}

impl std::fmt::Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "(")?;
        for (i, c) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{c}")?;
        }
        write!(f, ")")
    }
}

/// A mutable centroid plus the indices of the points currently assigned to it.
///
/// Clusters have no identity beyond their position in the area's sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    pub(crate) center: Point,
    pub(crate) members: Vec<usize>,
}

impl Cluster {
    #[must_use]
    pub fn new(center: Point) -> Self {
        Self {
            center,
            members: Vec::new(),
        }
    }

    #[must_use]
    pub fn center(&self) -> &Point {
        &self.center
    }

    /// Point indices assigned during the last training pass.
    #[must_use]
    pub fn members(&self) -> &[usize] {
        &self.members
    }
}

/// A cluster's center paired with copies of its member points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterView {
    pub center: Point,
    pub points: Vec<Point>,
}
