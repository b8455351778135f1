//! Terminal display utilities for CLI output.

pub mod tables;

pub use tables::{TableBuilder, create_clusters_table, create_distances_table};
