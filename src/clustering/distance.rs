//! Fixed catalog of distance functions addressable by small integer ids.
//!
//! The catalog is closed: metrics are variants of [`DistanceFunc`], and
//! lookup of an id outside the catalog fails instead of falling back.
//!
//! | id | metric |
//! |----|--------|
//! | 1  | Euclidean (default) |
//! | 2  | Manhattan |
//! | 3  | Chebyshev |
//! | 4  | Cosine distance |

use crate::error::{EngineError, EngineResult};
use crate::types::DistanceId;
use serde::Serialize;

/// A pure metric comparing a point against a cluster center.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DistanceFunc {
    #[default]
    Euclidean,
    Manhattan,
    Chebyshev,
    Cosine,
}

/// Catalog entry as reported to clients.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DistanceInfo {
    pub id: u32,
    pub name: &'static str,
}

const CATALOG: [DistanceFunc; 4] = [
    DistanceFunc::Euclidean,
    DistanceFunc::Manhattan,
    DistanceFunc::Chebyshev,
    DistanceFunc::Cosine,
];

impl DistanceFunc {
    /// Resolves a caller-supplied id against the catalog.
    pub fn lookup(id: i64) -> EngineResult<Self> {
        CATALOG
            .iter()
            .copied()
            .find(|f| i64::from(f.id().get()) == id)
            .ok_or(EngineError::UnknownDistanceFunction { id })
    }

    /// All metrics in id order.
    #[must_use]
    pub fn catalog() -> &'static [DistanceFunc] {
        &CATALOG
    }

    #[must_use]
    pub fn describe_catalog() -> Vec<DistanceInfo> {
        CATALOG
            .iter()
            .map(|f| DistanceInfo {
                id: f.id().get(),
                name: f.name(),
            })
            .collect()
    }

    #[must_use]
    pub fn id(&self) -> DistanceId {
        match self {
            Self::Euclidean => DistanceId::new_unchecked(1),
            Self::Manhattan => DistanceId::new_unchecked(2),
            Self::Chebyshev => DistanceId::new_unchecked(3),
            Self::Cosine => DistanceId::new_unchecked(4),
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Euclidean => "euclidean",
            Self::Manhattan => "manhattan",
            Self::Chebyshev => "chebyshev",
            Self::Cosine => "cosine",
        }
    }

    /// Computes the distance between two coordinate slices of equal length.
    ///
    /// Never NaN for finite inputs. The result is infinite only when the
    /// true distance exceeds `f64::MAX`.
    #[must_use]
    pub fn distance(&self, a: &[f64], b: &[f64]) -> f64 {
        self.scaled_distance(a, b, 1.0)
    }

    /// Distance after multiplying every coordinate by `factor`.
    ///
    /// The three norms scale linearly with a power-of-two `factor`, so the
    /// ordering between distances is preserved while large magnitudes stay
    /// representable.
    pub(crate) fn scaled_distance(&self, a: &[f64], b: &[f64], factor: f64) -> f64 {
        debug_assert_eq!(a.len(), b.len(), "Points must have same dimension");

        let deltas = a.iter().zip(b).map(|(x, y)| (x * factor - y * factor).abs());
        match self {
            Self::Euclidean => euclidean_norm(deltas),
            Self::Manhattan => deltas.sum(),
            Self::Chebyshev => deltas.fold(0.0, f64::max),
            Self::Cosine => (1.0 - cosine_similarity(a, b)).max(0.0),
        }
    }
}

/// Euclidean norm of non-negative deltas, accumulated relative to the
/// running maximum so squaring never overflows.
fn euclidean_norm(deltas: impl Iterator<Item = f64>) -> f64 {
    let mut scale = 0.0f64;
    let mut sum_sq = 1.0f64;

    for delta in deltas {
        if delta == 0.0 {
            continue;
        }
        if delta.is_infinite() {
            return f64::INFINITY;
        }
        if scale < delta {
            let ratio = scale / delta;
            sum_sq = 1.0 + sum_sq * ratio * ratio;
            scale = delta;
        } else {
            let ratio = delta / scale;
            sum_sq += ratio * ratio;
        }
    }

    scale * sum_sq.sqrt()
}

fn max_abs(v: &[f64]) -> f64 {
    v.iter().fold(0.0, |m, x| m.max(x.abs()))
}

impl std::fmt::Display for DistanceFunc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name(), self.id())
    }
}

/// Computes cosine similarity between two vectors.
///
/// Returns a value in `[-1, 1]`; zero-norm inputs yield `0.0`. Each vector is
/// divided by its largest magnitude first, which leaves the angle unchanged
/// and keeps the products finite.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    let scale_a = max_abs(a);
    let scale_b = max_abs(b);
    if scale_a == 0.0 || scale_b == 0.0 {
        return 0.0;
    }

    let (mut dot_product, mut norm_a, mut norm_b) = (0.0f64, 0.0f64, 0.0f64);
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (x / scale_a, y / scale_b);
        dot_product += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    (dot_product / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0)
}
