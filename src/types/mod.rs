//! Type-safe identifiers and bounds shared by the engine and the transport.
//!
//! Raw integers arrive from JSON bodies and URL segments; these newtypes keep
//! them from being mixed up once they cross into the engine.

use crate::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use std::num::{NonZeroU32, NonZeroU64};

/// Default iteration budget for a full training run.
pub const DEFAULT_MAX_AGE: u32 = 100;

/// Identifier of the default distance function.
pub const DEFAULT_DISTANCE_ID: u32 = 1;

/// Identifier of an area in the registry.
///
/// Ids are issued from 1 upwards and never reused during a process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AreaId(NonZeroU64);

impl AreaId {
    /// Returns `None` if the provided id is zero.
    #[must_use]
    pub fn new(id: u64) -> Option<Self> {
        NonZeroU64::new(id).map(Self)
    }

    /// Converts a caller-supplied integer, failing with `UnknownArea` for
    /// values that can never name an area (zero or negative).
    pub fn from_raw(id: i64) -> EngineResult<Self> {
        u64::try_from(id)
            .ok()
            .and_then(Self::new)
            .ok_or(EngineError::UnknownArea { id })
    }

    #[must_use]
    pub fn get(&self) -> u64 {
        self.0.get()
    }
}

impl std::fmt::Display for AreaId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of an entry in the distance function catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DistanceId(NonZeroU32);

impl DistanceId {
    #[must_use]
    pub fn new(id: u32) -> Option<Self> {
        NonZeroU32::new(id).map(Self)
    }

    /// Creates a new `DistanceId`, panicking if zero.
    ///
    /// # Panics
    /// Panics if `id` is zero. Use `new()` for fallible construction.
    #[must_use]
    pub const fn new_unchecked(id: u32) -> Self {
        match NonZeroU32::new(id) {
            Some(id) => Self(id),
            None => panic!("DistanceId cannot be zero"),
        }
    }

    /// Id of the catalog's default metric.
    #[must_use]
    pub const fn default_metric() -> Self {
        Self::new_unchecked(DEFAULT_DISTANCE_ID)
    }

    #[must_use]
    pub fn get(&self) -> u32 {
        self.0.get()
    }
}

impl std::fmt::Display for DistanceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Iteration budget for [`Area::train`](crate::clustering::Area::train).
///
/// Always at least one, so a training run performs at least one step and
/// terminates after at most `get()` steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaxAge(NonZeroU32);

impl MaxAge {
    /// Validates a caller-supplied budget. Zero and negative values are
    /// rejected; default substitution is the caller's job.
    pub fn new(value: i64) -> EngineResult<Self> {
        u32::try_from(value)
            .ok()
            .and_then(NonZeroU32::new)
            .map(Self)
            .ok_or(EngineError::InvalidMaxAge { value })
    }

    #[must_use]
    pub fn get(&self) -> u32 {
        self.0.get()
    }
}

impl Default for MaxAge {
    fn default() -> Self {
        Self(NonZeroU32::new(DEFAULT_MAX_AGE).unwrap_or(NonZeroU32::MIN))
    }
}
