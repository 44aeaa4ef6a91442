//! HTTP API.

pub mod endpoints;
pub mod error;
mod router;

pub use error::ApiError;
pub use router::router;
