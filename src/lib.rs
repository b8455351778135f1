/// The main library module for clusterlab
pub mod clustering;
pub mod config;
pub mod display;
pub mod error;
pub mod experiment;
pub mod http;
pub mod storage;
pub mod types;

// Explicit exports for better API clarity
pub use clustering::{Area, AreaStats, ClusterView, DistanceFunc, Point, TrainReport, Training};
pub use config::Settings;
pub use error::{EngineError, EngineResult};
pub use storage::AreaStore;
pub use types::{AreaId, DistanceId, MaxAge};
