//! Configuration types for the fusion engine
//!
//! All numeric tuning lives here: the plausible search box, the solver's
//! residual acceptance threshold, the early-rejection gate tolerance, the
//! adaptive-termination threshold, and the optional frontier pruning
//! strategies. Defaults are the values tuned for indoor backscatter
//! deployments (meter-scale rooms, centimeter-scale ranging noise).

use nalgebra::Vector3;
use serde::Serialize;

/// Default upper bound on the solver's achieved cost for a fit to count
/// as a valid intersection.
pub const DEFAULT_RESIDUAL_COST_THRESHOLD: f64 = 0.05;

/// Default tolerance (meters) for the early-rejection gate comparing a
/// new candidate distance against a parent hypothesis's location.
pub const DEFAULT_GATE_DISTANCE_TOLERANCE: f64 = 0.1;

/// Default absolute threshold on `ln(residual_cost)` below which a fused
/// hypothesis is confident enough to end the round early.
pub const DEFAULT_STOP_LOG_RESIDUAL_THRESHOLD: f64 = -7.0;

/// Default fraction of the best log-residual used by quality pruning.
pub const DEFAULT_QUALITY_FRACTION: f64 = 0.4;

/// Default minimum separation (meters) for spatial deduplication.
pub const DEFAULT_MIN_SEPARATION: f64 = 0.01;

/// Engine configuration: search region plus numeric thresholds
#[derive(Debug, Clone, Serialize)]
pub struct FusionConfig {
    /// Lower corner of the plausible search region
    pub bound_min: Vector3<f64>,
    /// Upper corner of the plausible search region
    pub bound_max: Vector3<f64>,
    /// Solver cost above this value rejects the fit
    pub residual_cost_threshold: f64,
    /// Gate tolerance (meters) on |expected round-trip - candidate distance|
    pub gate_distance_tolerance: f64,
    /// `ln(residual_cost)` below this value ends the round early
    pub stop_log_residual_threshold: f64,
    /// Optional frontier pruning strategies
    pub pruning: PruningConfig,
}

impl FusionConfig {
    /// Create a configuration with default thresholds for the given
    /// search region.
    pub fn new(bound_min: Vector3<f64>, bound_max: Vector3<f64>) -> Self {
        Self {
            bound_min,
            bound_max,
            residual_cost_threshold: DEFAULT_RESIDUAL_COST_THRESHOLD,
            gate_distance_tolerance: DEFAULT_GATE_DISTANCE_TOLERANCE,
            stop_log_residual_threshold: DEFAULT_STOP_LOG_RESIDUAL_THRESHOLD,
            pruning: PruningConfig::default(),
        }
    }

    /// Enable frontier pruning with the given strategies.
    pub fn with_pruning(mut self, pruning: PruningConfig) -> Self {
        self.pruning = pruning;
        self
    }
}

/// Frontier pruning strategies, each independently optional
///
/// Both are disabled by default: aggressive filtering can discard a
/// branch that a later measurement would have rescued.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PruningConfig {
    /// Quality pruning: keep only solutions whose log-residual is below
    /// this fraction of the level's best log-residual.
    pub quality_fraction: Option<f64>,
    /// Spatial deduplication: minimum distance (meters) between kept
    /// solutions within a level.
    pub min_separation: Option<f64>,
}

impl PruningConfig {
    /// Enable both strategies with their default parameters.
    pub fn aggressive() -> Self {
        Self {
            quality_fraction: Some(DEFAULT_QUALITY_FRACTION),
            min_separation: Some(DEFAULT_MIN_SEPARATION),
        }
    }

    /// Enable only spatial deduplication with the default separation.
    pub fn dedup_only() -> Self {
        Self {
            quality_fraction: None,
            min_separation: Some(DEFAULT_MIN_SEPARATION),
        }
    }
}
