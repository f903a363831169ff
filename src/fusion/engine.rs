//! Incremental multi-hypothesis fusion engine
//!
//! Maintains a frontier of partial solutions: `S(n, k)` is the set of
//! consistent fusions of exactly `k` of the first `n` measurements, defined
//! recursively as
//!
//! ```text
//! S(n, k) = S(n-1, k) + valid extensions of S(n-1, k-1) by measurement n
//! ```
//!
//! Each processed measurement rebuilds the frontier level by level from
//! `k = n` downward, solving a bounded trilateration problem per viable
//! candidate extension, until the base case or an early termination once a
//! sufficiently confident fused hypothesis exists. Lower levels skipped by
//! an early termination are intentionally dropped: the cheaper, less
//! constrained hypotheses they held are traded away for throughput.

use std::collections::BTreeMap;

use log::{debug, trace};
use nalgebra::DVector;

use crate::common::geometry::{box_center, box_is_ordered, round_trip_distance};
use crate::solver::trilateration;

use super::config::FusionConfig;
use super::errors::FusionError;
use super::output::{LevelBest, LocationCandidate};
use super::pruning::{quality_prune, spatial_dedup};
use super::types::{residual_order, Fit, Frontier, Measurement, PartialSolution};

/// Minimum number of jointly fused measurements for a hypothesis to carry
/// a solved location. Exports never report levels below this.
pub const MIN_FUSED_MEASUREMENTS: usize = 3;

/// Incremental fusion engine for one tracked tag.
///
/// Single-threaded and synchronous: `process_measurement` runs to
/// completion and the frontier is never observed mid-update. Track
/// multiple tags with one engine instance each.
#[derive(Debug, Clone)]
pub struct MultiFusion {
    config: FusionConfig,
    measurements_processed: usize,
    frontier: Frontier,
}

impl MultiFusion {
    /// Create an engine for the search region and thresholds in `config`.
    ///
    /// # Errors
    /// `FusionError::InvalidBounds` if `bound_min` is not component-wise
    /// less than or equal to `bound_max`.
    pub fn new(config: FusionConfig) -> Result<Self, FusionError> {
        if !box_is_ordered(&config.bound_min, &config.bound_max) {
            return Err(FusionError::InvalidBounds {
                bound_min: config.bound_min.into(),
                bound_max: config.bound_max.into(),
            });
        }
        Ok(Self {
            config,
            measurements_processed: 0,
            frontier: Frontier::with_sentinel(),
        })
    }

    /// Engine configuration.
    pub fn config(&self) -> &FusionConfig {
        &self.config
    }

    /// Number of measurements processed so far.
    pub fn measurements_processed(&self) -> usize {
        self.measurements_processed
    }

    /// Read access to the current frontier snapshot.
    pub fn frontier(&self) -> &Frontier {
        &self.frontier
    }

    /// Fold one new measurement into the frontier.
    ///
    /// Rebuilds levels from `k = n` downward: each new level carries the
    /// previous round's same-level solutions forward and adds every valid
    /// extension of the previous round's level below. The round ends at the
    /// base case, or early once a level at or below
    /// [`MIN_FUSED_MEASUREMENTS`] holds a hypothesis confident enough that
    /// weaker ones need not be recomputed.
    pub fn process_measurement(&mut self, measurement: &Measurement) {
        self.measurements_processed += 1;
        let n = self.measurements_processed;

        let mut next: BTreeMap<usize, Vec<PartialSolution>> = BTreeMap::new();
        let mut k = n;
        loop {
            if k == 0 {
                next.insert(0, vec![PartialSolution::sentinel()]);
                break;
            }

            let mut level: Vec<PartialSolution> = self.frontier.level(k).to_vec();
            for parent in self.frontier.level(k - 1) {
                level.extend(self.extend_solution(parent, measurement, n));
            }
            level.sort_by(residual_order);

            let stop = self.should_stop(k, &level);
            next.insert(k, level);

            if stop {
                trace!("round {}: terminated at level {}", n, k);
                // The sentinel is permanent; everything between it and the
                // stop level is dropped.
                next.insert(0, vec![PartialSolution::sentinel()]);
                break;
            }
            k -= 1;
        }

        self.frontier = Frontier::from_levels(next);
        self.prune_frontier();

        debug!(
            "measurement {}: frontier holds {} solutions across levels 0..={}",
            n,
            self.frontier.num_solutions(),
            self.frontier.max_level()
        );
    }

    /// Extension Rule: produce the valid children of one parent solution
    /// and the new measurement's candidates.
    fn extend_solution(
        &self,
        parent: &PartialSolution,
        measurement: &Measurement,
        measurement_id: usize,
    ) -> Vec<PartialSolution> {
        let mut children = Vec::new();

        for (slot, candidate) in measurement.candidates.iter().enumerate() {
            if !candidate.is_valid() {
                continue;
            }

            // Early-rejection gate: a cheap necessary-consistency check
            // against the parent's already-solved location. Only possible
            // once the parent is constrained enough to have one.
            if let Some(parent_fit) = &parent.fit {
                let expected = round_trip_distance(
                    &parent_fit.location,
                    &measurement.tx_loc,
                    &measurement.rx_loc,
                );
                let error = (expected - candidate.distance).abs();
                if error > self.config.gate_distance_tolerance {
                    trace!(
                        "gate rejected slot {} of measurement {}: range error {:.3}",
                        slot,
                        measurement_id,
                        error
                    );
                    continue;
                }
            }

            let child = parent.child(
                *candidate,
                slot,
                measurement.rx_loc,
                measurement.tx_loc,
                measurement_id,
            );

            // Under-constrained hypotheses stay unsolved until a third
            // distance arrives.
            if child.level() < MIN_FUSED_MEASUREMENTS {
                children.push(child);
                continue;
            }

            let distances = child.distances();
            let tx_locs = child.tx_locs();
            let rx_locs = child.rx_locs();
            let seed = box_center(&self.config.bound_min, &self.config.bound_max);
            let guess = DVector::from_column_slice(seed.as_slice());

            match trilateration::solve(
                &distances,
                &guess,
                &tx_locs,
                &rx_locs,
                &seed,
                distances.len(),
                self.config.residual_cost_threshold,
                &self.config.bound_min,
                &self.config.bound_max,
            ) {
                Some((location, residual_cost)) => {
                    children.push(child.with_fit(Fit {
                        location,
                        residual_cost,
                    }));
                }
                None => {
                    trace!(
                        "no valid intersection for slot {} of measurement {}",
                        slot,
                        measurement_id
                    );
                }
            }
        }

        children
    }

    /// Termination Rule: may this round end at level `k`?
    ///
    /// Stopping is only legal once the round has descended to a level where
    /// at least [`MIN_FUSED_MEASUREMENTS`] measurements are jointly fused,
    /// and the level's best hypothesis is solved with a log-residual below
    /// the absolute confidence threshold.
    fn should_stop(&self, k: usize, level: &[PartialSolution]) -> bool {
        if k > MIN_FUSED_MEASUREMENTS {
            return false;
        }
        // The list is sorted, so the first solved entry is the level's best.
        let Some(best) = level.iter().find_map(|s| s.fit.as_ref()) else {
            return false;
        };
        best.residual_cost.ln() < self.config.stop_log_residual_threshold
    }

    /// Apply the configured pruning strategies to every exportable level.
    fn prune_frontier(&mut self) {
        let quality_fraction = self.config.pruning.quality_fraction;
        let min_separation = self.config.pruning.min_separation;
        if quality_fraction.is_none() && min_separation.is_none() {
            return;
        }

        for (k, level) in self.frontier.iter_mut() {
            if k < MIN_FUSED_MEASUREMENTS {
                continue;
            }
            let before = level.len();
            if let Some(fraction) = quality_fraction {
                quality_prune(level, fraction);
            }
            if let Some(separation) = min_separation {
                spatial_dedup(level, separation);
            }
            if level.len() != before {
                trace!("level {}: pruned {} -> {}", k, before, level.len());
            }
        }
    }

    /// The single best hypothesis per exportable level, annotated with the
    /// level and a size-normalized residual for cross-level comparison.
    pub fn best_per_level(&self) -> Vec<LevelBest> {
        self.frontier
            .iter()
            .filter(|&(k, _)| k >= MIN_FUSED_MEASUREMENTS)
            .filter_map(|(k, level)| {
                let best = level.iter().find(|s| s.fit.is_some())?;
                let fit = best.fit.as_ref()?;
                Some(LevelBest {
                    level: k,
                    location: fit.location,
                    residual_cost: fit.residual_cost,
                    normalized_residual_cost: fit.residual_cost / k as f64,
                    combined_cluster_cost: best.combined_cluster_cost,
                })
            })
            .collect()
    }

    /// Every surviving hypothesis at exportable levels, flattened into one
    /// list for the downstream tie-break.
    pub fn all_candidates(&self) -> Vec<LocationCandidate> {
        self.frontier
            .iter()
            .filter(|&(k, _)| k >= MIN_FUSED_MEASUREMENTS)
            .flat_map(|(_, level)| level.iter())
            .filter_map(|solution| {
                let fit = solution.fit.as_ref()?;
                Some(LocationCandidate {
                    location: fit.location,
                    tx_locs: solution.tx_locs(),
                    tx_indices: solution.tx_indices(),
                    slot_counts: solution.slot_counts,
                    combined_cluster_cost: solution.combined_cluster_cost,
                    residual_cost: fit.residual_cost,
                })
            })
            .collect()
    }
}

/// Batch convenience wrapper: stream a slice of measurements through a
/// fresh engine and return the flattened candidate list.
///
/// # Errors
/// `FusionError::EmptyMeasurementStream` if `measurements` is empty, or
/// any error from [`MultiFusion::new`].
pub fn localize(
    measurements: &[Measurement],
    config: FusionConfig,
) -> Result<Vec<LocationCandidate>, FusionError> {
    if measurements.is_empty() {
        return Err(FusionError::EmptyMeasurementStream);
    }

    let mut engine = MultiFusion::new(config)?;
    for measurement in measurements {
        engine.process_measurement(measurement);
    }
    Ok(engine.all_candidates())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fusion::types::Candidate;
    use nalgebra::Vector3;

    fn test_config() -> FusionConfig {
        FusionConfig::new(
            Vector3::new(-1.0, -1.0, -1.0),
            Vector3::new(1.0, 1.0, 1.0),
        )
    }

    /// Antenna pairs spread around the search box.
    fn antenna_pairs() -> Vec<(Vector3<f64>, Vector3<f64>)> {
        vec![
            (Vector3::new(2.0, 0.0, 0.5), Vector3::new(2.0, 0.4, 0.1)),
            (Vector3::new(-2.0, 0.3, 0.5), Vector3::new(-2.0, -0.3, 0.2)),
            (Vector3::new(0.0, 2.0, -0.5), Vector3::new(0.4, 2.0, 0.0)),
            (Vector3::new(0.3, -2.0, 0.4), Vector3::new(-0.3, -2.0, -0.2)),
        ]
    }

    /// Measurements whose sole candidate is the exact round-trip distance
    /// for `truth`.
    fn exact_measurements(truth: &Vector3<f64>) -> Vec<Measurement> {
        antenna_pairs()
            .into_iter()
            .map(|(tx, rx)| {
                Measurement::new(
                    [Candidate::new(round_trip_distance(truth, &tx, &rx), 0.1)],
                    rx,
                    tx,
                )
            })
            .collect()
    }

    #[test]
    fn test_invalid_bounds_rejected() {
        let config = FusionConfig::new(
            Vector3::new(1.0, -1.0, -1.0),
            Vector3::new(-1.0, 1.0, 1.0),
        );
        assert!(matches!(
            MultiFusion::new(config),
            Err(FusionError::InvalidBounds { .. })
        ));
    }

    #[test]
    fn test_sentinel_survives_every_round() {
        let mut engine = MultiFusion::new(test_config()).unwrap();
        let truth = Vector3::new(0.2, -0.1, 0.3);

        for measurement in exact_measurements(&truth) {
            engine.process_measurement(&measurement);

            let level0 = engine.frontier().level(0);
            assert_eq!(level0.len(), 1);
            assert!(level0[0].is_sentinel());
            assert!(level0[0].fit.is_none());
        }
    }

    #[test]
    fn test_chain_invariants() {
        let mut engine = MultiFusion::new(test_config()).unwrap();
        let truth = Vector3::new(0.2, -0.1, 0.3);

        for measurement in exact_measurements(&truth) {
            engine.process_measurement(&measurement);
        }

        for (k, level) in engine.frontier().iter() {
            for solution in level {
                assert_eq!(solution.candidates().len(), k);
                let ids = solution.tx_indices();
                assert_eq!(ids.len(), k);
                assert!(ids.windows(2).all(|w| w[0] < w[1]));
            }
        }
    }

    #[test]
    fn test_early_termination_drops_lower_levels() {
        let mut engine = MultiFusion::new(test_config()).unwrap();
        let truth = Vector3::new(0.2, -0.1, 0.3);
        let measurements = exact_measurements(&truth);

        // Two measurements: no solvable level yet, the round runs to the base
        // case and keeps the under-constrained levels.
        engine.process_measurement(&measurements[0]);
        engine.process_measurement(&measurements[1]);
        assert!(!engine.frontier().level(1).is_empty());
        assert!(!engine.frontier().level(2).is_empty());

        // Third measurement: level 3 solves with near-zero residual, so the
        // round terminates there and levels 1-2 are dropped.
        engine.process_measurement(&measurements[2]);
        assert!(!engine.frontier().level(3).is_empty());
        assert!(engine.frontier().level(2).is_empty());
        assert!(engine.frontier().level(1).is_empty());
        assert_eq!(engine.frontier().level(0).len(), 1);
    }

    #[test]
    fn test_exports_never_report_low_levels() {
        let mut engine = MultiFusion::new(test_config()).unwrap();
        let truth = Vector3::new(0.2, -0.1, 0.3);

        for measurement in exact_measurements(&truth) {
            engine.process_measurement(&measurement);
            assert!(engine
                .best_per_level()
                .iter()
                .all(|b| b.level >= MIN_FUSED_MEASUREMENTS));
            assert!(engine
                .all_candidates()
                .iter()
                .all(|c| c.tx_indices.len() >= MIN_FUSED_MEASUREMENTS));
        }
    }

    #[test]
    fn test_normalized_residual() {
        let mut engine = MultiFusion::new(test_config()).unwrap();
        let truth = Vector3::new(0.2, -0.1, 0.3);

        for measurement in exact_measurements(&truth) {
            engine.process_measurement(&measurement);
        }

        for best in engine.best_per_level() {
            let expected = best.residual_cost / best.level as f64;
            assert!((best.normalized_residual_cost - expected).abs() < 1e-15);
        }
    }

    #[test]
    fn test_empty_stream_is_an_error() {
        let result = localize(&[], test_config());
        assert!(matches!(result, Err(FusionError::EmptyMeasurementStream)));
    }

    #[test]
    fn test_localize_batch() {
        let truth = Vector3::new(0.2, -0.1, 0.3);
        let candidates = localize(&exact_measurements(&truth), test_config()).unwrap();

        assert!(!candidates.is_empty());
        let best = candidates
            .iter()
            .min_by(|a, b| a.residual_cost.total_cmp(&b.residual_cost))
            .unwrap();
        assert!((best.location - truth).norm() < 0.01);
    }
}
