//! Error types for the fusion engine
//!
//! Only programmer-contract violations surface as errors here. Solver
//! non-convergence, degenerate fits, and under-constrained hypotheses are
//! normal "no result" outcomes handled locally by the search.

use std::fmt;

/// Errors raised at the fusion engine's API boundary
#[derive(Debug, Clone)]
pub enum FusionError {
    /// Bounding box with `bound_min` not component-wise <= `bound_max`
    InvalidBounds {
        /// Lower corner as supplied
        bound_min: [f64; 3],
        /// Upper corner as supplied
        bound_max: [f64; 3],
    },

    /// A batch localization was requested with no measurements at all
    EmptyMeasurementStream,
}

impl fmt::Display for FusionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FusionError::InvalidBounds {
                bound_min,
                bound_max,
            } => {
                write!(
                    f,
                    "Invalid bounding box: min {:?} is not component-wise <= max {:?}",
                    bound_min, bound_max
                )
            }
            FusionError::EmptyMeasurementStream => {
                write!(f, "Measurement stream is empty")
            }
        }
    }
}

impl std::error::Error for FusionError {}
