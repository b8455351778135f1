//! The Area aggregate: one point set, one cluster set and the training state
//! that ties them together.
//!
//! Every public operation takes the area's own mutex, so at most one of them
//! runs at a time per area while unrelated areas proceed independently.

use super::distance::DistanceFunc;
use super::lloyd::{self, CONVERGENCE_TOLERANCE};
use super::point::{Cluster, ClusterView, Point};
use crate::error::{EngineError, EngineResult};
use crate::types::{AreaId, MaxAge};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::debug;

/// An isolated clustering workspace.
#[derive(Debug)]
pub struct Area {
    id: AreaId,
    tolerance: f64,
    state: Mutex<AreaState>,
}

/// Counters describing an area at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AreaStats {
    pub points: usize,
    pub clusters: usize,
    pub dimension: Option<usize>,
    pub iterations: u64,
    pub converged: bool,
}

/// How much work one training call performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Training {
    /// Exactly one assignment-and-update iteration.
    Step,
    /// Iterate until stable, at most this many times.
    UpTo(MaxAge),
}

/// Outcome of [`Area::train_and_report`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainReport {
    pub finished: bool,
    pub iterations: u64,
    pub clusters: Vec<ClusterView>,
}

#[derive(Debug, Default)]
struct AreaState {
    points: Vec<Point>,
    clusters: Vec<Cluster>,
    /// Established by the first point or cluster inserted.
    dimension: Option<usize>,
    /// Training iterations performed since creation or the last clear.
    iterations: u64,
    converged: bool,
    /// Assignment produced by the last training step. Dropped on insert so
    /// the next step compares against nothing.
    history: Option<Vec<Option<usize>>>,
    /// Cached read projection, dropped on any mutation.
    projection: Option<Projection>,
}

#[derive(Debug)]
struct Projection {
    metric: DistanceFunc,
    assignments: Vec<Option<usize>>,
}

impl Area {
    pub fn new(id: AreaId) -> Self {
        Self::with_tolerance(id, CONVERGENCE_TOLERANCE)
    }

    /// Creates an area whose convergence test allows centers to drift by at
    /// most `tolerance` per coordinate.
    pub fn with_tolerance(id: AreaId, tolerance: f64) -> Self {
        Self {
            id,
            tolerance: tolerance.abs(),
            state: Mutex::new(AreaState::default()),
        }
    }

    #[must_use]
    pub fn id(&self) -> AreaId {
        self.id
    }

    /// Appends a single point.
    pub fn add_point(&self, point: Point) -> EngineResult<()> {
        self.add_points(vec![point]).map(|_| ())
    }

    /// Appends a batch of points, all or nothing.
    ///
    /// Returns the number of points appended.
    pub fn add_points(&self, points: Vec<Point>) -> EngineResult<usize> {
        let mut state = self.state.lock();
        let dimension = state.check_batch(&points)?;
        let added = points.len();
        if added > 0 {
            state.dimension = dimension;
            state.points.extend(points);
            state.invalidate();
        }
        debug!(area = %self.id, added, total = state.points.len(), "points added");
        Ok(added)
    }

    /// Appends a single cluster seeded at `center`.
    pub fn add_cluster(&self, center: Point) -> EngineResult<()> {
        self.add_clusters(vec![center]).map(|_| ())
    }

    /// Appends a batch of clusters, all or nothing.
    pub fn add_clusters(&self, centers: Vec<Point>) -> EngineResult<usize> {
        let mut state = self.state.lock();
        let dimension = state.check_batch(&centers)?;
        let added = centers.len();
        if added > 0 {
            state.dimension = dimension;
            state.clusters.extend(centers.into_iter().map(Cluster::new));
            state.invalidate();
        }
        debug!(area = %self.id, added, total = state.clusters.len(), "clusters added");
        Ok(added)
    }

    /// Wipes points, clusters and training state, including the established
    /// dimensionality.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        *state = AreaState::default();
        debug!(area = %self.id, "area cleared");
    }

    /// Runs exactly one assignment-and-update iteration and reports whether
    /// the configuration is stable afterwards.
    pub fn train_step(&self, metric: DistanceFunc) -> bool {
        let mut state = self.state.lock();
        state.step(metric, self.tolerance)
    }

    /// Repeats the iteration until stable or until `max_age` iterations have
    /// run. State reflects the last iteration performed either way.
    pub fn train(&self, metric: DistanceFunc, max_age: MaxAge) -> bool {
        let mut state = self.state.lock();
        self.train_locked(&mut state, metric, max_age)
    }

    /// Trains as requested and captures the outcome under the same lock, so
    /// the flag, the counter and the clusters all describe one state.
    pub fn train_and_report(&self, metric: DistanceFunc, training: Training) -> TrainReport {
        let mut state = self.state.lock();
        let finished = match training {
            Training::Step => state.step(metric, self.tolerance),
            Training::UpTo(max_age) => self.train_locked(&mut state, metric, max_age),
        };

        TrainReport {
            finished,
            iterations: state.iterations,
            clusters: state.project(metric),
        }
    }

    fn train_locked(&self, state: &mut AreaState, metric: DistanceFunc, max_age: MaxAge) -> bool {
        for age in 1..=max_age.get() {
            if state.step(metric, self.tolerance) {
                debug!(area = %self.id, %metric, steps = age, "training converged");
                return true;
            }
        }

        debug!(
            area = %self.id,
            %metric,
            max_age = max_age.get(),
            "training stopped at iteration budget"
        );
        false
    }

    /// Reports every cluster's center with the points nearest to it under
    /// `metric`, in cluster insertion order. Centers are never moved.
    pub fn clusters_with_points(&self, metric: DistanceFunc) -> Vec<ClusterView> {
        let mut state = self.state.lock();
        state.project(metric)
    }

    #[must_use]
    pub fn stats(&self) -> AreaStats {
        let state = self.state.lock();
        AreaStats {
            points: state.points.len(),
            clusters: state.clusters.len(),
            dimension: state.dimension,
            iterations: state.iterations,
            converged: state.converged,
        }
    }

    /// Copies of the stored points, in insertion order.
    #[must_use]
    pub fn points(&self) -> Vec<Point> {
        self.state.lock().points.clone()
    }

    /// Copies of the current cluster centers, in insertion order.
    #[must_use]
    pub fn centers(&self) -> Vec<Point> {
        self.state
            .lock()
            .clusters
            .iter()
            .map(|c| c.center.clone())
            .collect()
    }
}

impl AreaState {
    /// Validates a batch against the established dimensionality, or against
    /// its own first item when none is established yet.
    fn check_batch(&self, batch: &[Point]) -> EngineResult<Option<usize>> {
        let expected = match self.dimension.or_else(|| batch.first().map(Point::dimension)) {
            Some(expected) => expected,
            None => return Ok(None),
        };

        if let Some(bad) = batch.iter().find(|p| p.dimension() != expected) {
            return Err(EngineError::DimensionMismatch {
                expected,
                actual: bad.dimension(),
            });
        }

        Ok(Some(expected))
    }

    fn invalidate(&mut self) {
        self.history = None;
        self.projection = None;
        self.converged = false;
    }

    fn step(&mut self, metric: DistanceFunc, tolerance: f64) -> bool {
        self.iterations += 1;
        self.projection = None;

        if self.points.is_empty() || self.clusters.is_empty() {
            for cluster in &mut self.clusters {
                cluster.members.clear();
            }
            self.history = Some(vec![None; self.points.len()]);
            self.converged = true;
            return true;
        }

        let assignments = lloyd::assign_points(&self.points, &self.clusters, metric);
        let reassigned = self
            .history
            .as_deref()
            .is_some_and(|previous| previous != assignments.as_slice());

        lloyd::apply_assignments(&mut self.clusters, &assignments);
        let shift = lloyd::update_centers(&self.points, &mut self.clusters);
        self.history = Some(assignments);

        self.converged = !reassigned && shift <= tolerance;
        self.converged
    }

    fn project(&mut self, metric: DistanceFunc) -> Vec<ClusterView> {
        if self.clusters.is_empty() {
            return Vec::new();
        }

        let current = self
            .projection
            .as_ref()
            .is_some_and(|p| p.metric == metric);
        if !current {
            self.projection = Some(Projection {
                metric,
                assignments: lloyd::assign_points(&self.points, &self.clusters, metric),
            });
        }

        let mut views: Vec<ClusterView> = self
            .clusters
            .iter()
            .map(|c| ClusterView {
                center: c.center.clone(),
                points: Vec::new(),
            })
            .collect();

        if let Some(projection) = &self.projection {
            for (point, assigned) in self.points.iter().zip(&projection.assignments) {
                if let Some(idx) = assigned {
                    views[*idx].points.push(point.clone());
                }
            }
        }

        views
    }
}
