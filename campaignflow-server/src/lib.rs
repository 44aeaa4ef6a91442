//! HTTP service for campaign generation.
//!
//! - `POST /generate` starts a run (or runs it inline with `mode: "sync"`)
//! - `GET /progress?key=` returns the latest progress record for a subject
//! - `GET /health` is a liveness check
//!
//! [`wiring`] builds the pipeline either against real HTTP providers or,
//! in demo mode, against deterministic in-process fakes.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, missing_docs, rust_2018_idioms)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc
)]

pub mod api;
pub mod state;
pub mod wiring;

pub use api::router;
pub use state::AppState;
