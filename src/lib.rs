/*!
# Multifusion - ambiguous-range tag localization

Estimates the 3D position of a radio tag from a stream of noisy,
multi-candidate range measurements between transmit/receive antenna pairs.
Each measurement carries several ambiguous distance candidates (e.g. from
phase-wrap ambiguity); the engine fuses an arbitrary number of such
measurements into a small set of plausible locations, favoring candidate
combinations whose implied geometry is mutually consistent.

## Components

- [`solver`] - Bounded trilateration: box-constrained nonlinear least
  squares over round-trip range constraints
- [`fusion`] - Incremental multi-hypothesis fusion engine: the frontier of
  partial solutions, extension, pruning, and termination
- [`common`] - Low-level geometry utilities

## Example

```rust
use multifusion::{Candidate, FusionConfig, Measurement, MultiFusion};
use nalgebra::Vector3;

let config = FusionConfig::new(
    Vector3::new(-2.0, -2.0, -2.0),
    Vector3::new(2.0, 2.0, 2.0),
);
let mut engine = MultiFusion::new(config).unwrap();

// One measurement: two ambiguous distance candidates plus the antenna pair.
let measurement = Measurement::new(
    [Candidate::new(4.31, 0.2), Candidate::new(4.68, 0.9)],
    Vector3::new(2.5, 0.0, 0.3),  // receive antenna
    Vector3::new(2.5, 0.2, 0.4),  // transmit antenna
);
engine.process_measurement(&measurement);

// After at least three consistent measurements, fused hypotheses appear.
for candidate in engine.all_candidates() {
    println!("{:?} (residual {})", candidate.location, candidate.residual_cost);
}
```

The search is best-effort and anytime: it terminates a round early once a
sufficiently confident fused hypothesis exists, and does not guarantee the
globally best combination.
*/

pub mod common;
pub mod fusion;
pub mod solver;

// Core types
pub use fusion::{
    Candidate, Fit, Frontier, FusionConfig, Measurement, PartialSolution, PruningConfig,
};

// Engine and batch entry point
pub use fusion::{localize, MultiFusion, MIN_FUSED_MEASUREMENTS};

// Outputs
pub use fusion::{LevelBest, LocationCandidate};

// Errors
pub use fusion::FusionError;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
