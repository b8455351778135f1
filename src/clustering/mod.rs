//! Online clustering engine.
//!
//! Callers feed points and seed centers into an [`Area`], then refine the
//! clustering one Lloyd iteration at a time or until convergence, under a
//! metric chosen from the fixed [`DistanceFunc`] catalog.
//!
//! # Architecture
//! - `point`: value types (points, clusters, reported projections)
//! - `distance`: the closed metric catalog, looked up by integer id
//! - `lloyd`: pure assignment/update primitives
//! - `area`: the aggregate owning state, dimensionality and convergence

mod area;
mod distance;
mod lloyd;
mod point;

pub use area::{Area, AreaStats, TrainReport, Training};
pub use distance::{DistanceFunc, DistanceInfo, cosine_similarity};
pub use lloyd::{CONVERGENCE_TOLERANCE, assign_to_nearest_center};
pub use point::{Cluster, ClusterView, Point};
