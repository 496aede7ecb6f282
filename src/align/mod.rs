//! Sentence-to-timestamp alignment.
//!
//! Two cooperating stages: the coarse locator finds a sentence inside a
//! segment-level transcript and maps it to buffered segment timestamps, and
//! the precision refiner tightens that span using a word-level transcription
//! of the rough clip.

pub mod locator;
pub mod normalize;
pub mod refiner;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use locator::locate;
pub use refiner::refine;

/// A time span in seconds.
///
/// The time base depends on which media was searched: spans from
/// [`locate`] are absolute recording time, spans from [`refine`] are local
/// to the clip that was transcribed. Callers cutting a second clip from the
/// rough clip use refined spans as-is; callers needing recording time call
/// [`Span::offset_by`] with the rough clip's absolute start.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Span {
    pub start: f64,
    pub end: f64,
}

impl Span {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    pub fn duration(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }

    /// Expand symmetrically by `margin` seconds, flooring the start at zero.
    pub fn with_margin(&self, margin: f64) -> Self {
        Self {
            start: (self.start - margin).max(0.0),
            end: self.end + margin,
        }
    }

    /// Shift into another time base (e.g. clip-local to absolute).
    pub fn offset_by(&self, offset: f64) -> Self {
        Self {
            start: self.start + offset,
            end: self.end + offset,
        }
    }
}

/// Malformed alignment input. Absence of a match is not an error; both
/// alignment stages signal it with `Ok(None)`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AlignError {
    #[error("Sentence is empty after normalization")]
    EmptySentence,

    #[error("Transcript contains no segments")]
    EmptyTranscript,
}
