//! Error type shared by the whole simulation view.
//!
//! Every error here is recovered locally: a failed tick is skipped, a bad
//! color skips one segment, a missing element is a no-op. Nothing is ever
//! surfaced to whoever is looking at the SVG except stale colors.
//!
//! ## Rust concepts
//! - `thiserror` derive for `Display` + `std::error::Error`
//! - `#[from]` for automatic conversion with the `?` operator

use crate::SegmentAddress;

#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// Fetch failed, or the clock answered with a non-success status.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The response body did not contain a usable segment vector.
    #[error("malformed segment vector: {0}")]
    MalformedVector(String),

    /// One line of the vector is not exactly 6 hex digits.
    #[error("malformed color {0:?}: expected 6 hex digits")]
    MalformedColor(String),

    /// No element in the artwork carries both classes of this segment.
    #[error("no SVG element matches {0}")]
    MissingElement(SegmentAddress),

    /// The SVG artwork could not be parsed, edited, or serialized.
    #[error("SVG document error: {0}")]
    Svg(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SimError {
    pub(crate) fn svg(err: impl std::fmt::Display) -> Self {
        Self::Svg(err.to_string())
    }
}
