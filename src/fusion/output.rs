//! Output records exported from the fusion engine
//!
//! After each processed measurement the surviving frontier can be exported
//! two ways:
//!
//! - [`LevelBest`] - the single best hypothesis per fusion level, with a
//!   size-normalized score for cross-level comparison
//! - [`LocationCandidate`] - every surviving hypothesis flattened into one
//!   list; this is the hand-off consumed by the downstream angle-of-arrival
//!   tie-break, which needs the location plus the originating antenna
//!   geometry to recompute phase coherence

use nalgebra::Vector3;
use serde::Serialize;

/// Best hypothesis at one fusion level.
#[derive(Debug, Clone, Serialize)]
pub struct LevelBest {
    /// Number of measurements fused (the frontier level)
    pub level: usize,
    /// Solved 3D location
    pub location: Vector3<f64>,
    /// Achieved least-squares cost
    pub residual_cost: f64,
    /// `residual_cost / level`: comparable across levels
    pub normalized_residual_cost: f64,
    /// Sum of the chosen candidates' selection costs
    pub combined_cluster_cost: f64,
}

/// One surviving location hypothesis with the geometry that produced it.
#[derive(Debug, Clone, Serialize)]
pub struct LocationCandidate {
    /// Solved 3D location
    pub location: Vector3<f64>,
    /// Transmit antenna locations in fusion order
    pub tx_locs: Vec<Vector3<f64>>,
    /// Originating measurement identifiers in fusion order
    pub tx_indices: Vec<usize>,
    /// How many times candidate slot 0, 1, or 2 was chosen
    pub slot_counts: [u32; 3],
    /// Sum of the chosen candidates' selection costs
    pub combined_cluster_cost: f64,
    /// Achieved least-squares cost
    pub residual_cost: f64,
}
