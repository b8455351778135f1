//! Lloyd iteration primitives: nearest-center assignment, mean update and
//! center movement.
//!
//! These functions are pure over slices; [`Area`](super::Area) owns the state
//! and decides when a configuration is stable.
//!
//! # Algorithm Details
//! - Assignment: every point goes to the center at minimum distance under the
//!   active metric; ties resolve to the lowest cluster index
//! - Update: a center becomes the coordinate-wise mean of its members; a
//!   center without members stays where it is
//! - Movement: the largest absolute coordinate delta over all centers
//!
//! # Performance Characteristics
//! - O(n * k * d) time per iteration
//! - Assignment fans out over rayon once the point set is large enough

use super::distance::DistanceFunc;
use super::point::{Cluster, Point};
use rayon::prelude::*;

/// Default convergence tolerance for center movement, per coordinate.
pub const CONVERGENCE_TOLERANCE: f64 = 1e-9;

/// Below this many points the assignment pass stays on the calling thread.
const PARALLEL_THRESHOLD: usize = 4096;

/// Assigns a point to the nearest center.
///
/// Returns `None` only when `centers` is empty. Strict comparison keeps the
/// first (lowest index) center on ties.
pub fn assign_to_nearest_center(
    point: &[f64],
    centers: &[&[f64]],
    metric: DistanceFunc,
) -> Option<usize> {
    let (nearest, distance) = nearest_center(point, centers, metric, 1.0)?;
    if distance.is_finite() {
        return Some(nearest);
    }

    // Every distance overflowed, so rank them again on shrunken coordinates
    let factor = overflow_safe_factor(point.len());
    nearest_center(point, centers, metric, factor).map(|(i, _)| i)
}

fn nearest_center(
    point: &[f64],
    centers: &[&[f64]],
    metric: DistanceFunc,
    factor: f64,
) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64)> = None;

    for (i, center) in centers.iter().enumerate() {
        let distance = metric.scaled_distance(point, center, factor);
        match best {
            Some((_, best_distance)) if distance >= best_distance => {}
            _ => best = Some((i, distance)),
        }
    }

    best
}

/// Power-of-two factor small enough that no norm over `dimension` scaled
/// coordinate deltas can exceed `f64::MAX`.
fn overflow_safe_factor(dimension: usize) -> f64 {
    let pow = dimension.max(1).next_power_of_two() as f64;
    0.5 / pow
}

/// Runs the assignment phase over every point.
pub fn assign_points(
    points: &[Point],
    clusters: &[Cluster],
    metric: DistanceFunc,
) -> Vec<Option<usize>> {
    let centers: Vec<&[f64]> = clusters.iter().map(|c| c.center.coords()).collect();

    if points.len() >= PARALLEL_THRESHOLD {
        points
            .par_iter()
            .map(|p| assign_to_nearest_center(p.coords(), &centers, metric))
            .collect()
    } else {
        points
            .iter()
            .map(|p| assign_to_nearest_center(p.coords(), &centers, metric))
            .collect()
    }
}

/// Rebuilds each cluster's member list from an assignment vector.
pub fn apply_assignments(clusters: &mut [Cluster], assignments: &[Option<usize>]) {
    for cluster in clusters.iter_mut() {
        cluster.members.clear();
    }
    for (point_idx, assigned) in assignments.iter().enumerate() {
        if let Some(cluster_idx) = assigned {
            clusters[*cluster_idx].members.push(point_idx);
        }
    }
}

/// Runs the update phase: moves every non-empty cluster to the mean of its
/// members and returns the largest coordinate shift observed.
pub fn update_centers(points: &[Point], clusters: &mut [Cluster]) -> f64 {
    let mut max_shift = 0.0f64;

    for cluster in clusters.iter_mut() {
        if cluster.members.is_empty() {
            continue;
        }

        // Running mean: every partial result stays within the members' range
        let mut means = vec![0.0f64; cluster.center.dimension()];
        for (seen, &idx) in cluster.members.iter().enumerate() {
            let n = (seen + 1) as f64;
            for (mean, value) in means.iter_mut().zip(points[idx].coords()) {
                *mean += value / n - *mean / n;
            }
        }

        for (current, mean) in cluster.center.coords_mut().iter_mut().zip(means) {
            max_shift = max_shift.max((mean - *current).abs());
            *current = mean;
        }
    }

    max_shift
}
