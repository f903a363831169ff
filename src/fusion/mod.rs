/*!
Incremental multi-hypothesis fusion of ambiguous range measurements.

The engine maintains a frontier of partial solutions indexed by how many
measurements each one fuses, extends it combinatorially per new
measurement, and prunes it for cost and plausibility. One bounded
trilateration solve runs per viable candidate extension.
*/

pub mod config;
pub mod engine;
pub mod errors;
pub mod output;
pub mod types;

mod pruning;

pub use config::{FusionConfig, PruningConfig};
pub use engine::{localize, MultiFusion, MIN_FUSED_MEASUREMENTS};
pub use errors::FusionError;
pub use output::{LevelBest, LocationCandidate};
pub use types::{Candidate, Fit, Frontier, Measurement, PartialSolution};
