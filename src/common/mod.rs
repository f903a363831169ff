//! Shared low-level utilities.

pub mod geometry;
