//! Utility functions for identifiers and timestamps.

pub mod timestamps;

pub use timestamps::{elapsed_ms, now_utc, Timestamp};

use uuid::Uuid;

/// Generates a time-ordered run identifier (UUID v7).
#[must_use]
pub fn generate_run_id() -> Uuid {
    Uuid::now_v7()
}

/// Truncates text to at most `max_chars` characters, respecting char boundaries.
#[must_use]
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
