//! HTTP transport over the clustering engine.
//!
//! A thin layer: every endpoint decodes its input, performs exactly one
//! engine operation and answers inside an [`envelope::Envelope`].

pub mod envelope;
#[cfg(feature = "http-server")]
pub mod handlers;
pub mod server;

#[cfg(feature = "http-server")]
pub use handlers::{ApiError, AppState};
#[cfg(feature = "http-server")]
pub use server::{router, with_static_files};
pub use server::serve_http;
