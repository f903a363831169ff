//! Frontier pruning strategies
//!
//! Two independent, optional per-level filters applied after sorting:
//! quality pruning (drop solutions far from the level's best in
//! log-residual space) and spatial deduplication (collapse near-duplicate
//! locations). Both are idempotent and preserve list order.

use nalgebra::Vector3;

use super::types::PartialSolution;

/// Drop solutions whose log-residual is not below `fraction` times the
/// level's best log-residual.
///
/// Operates in log space: residual costs of good fits are far below 1, so
/// their logs are large negative numbers and the fraction keeps only
/// solutions close to the best. Unsolved entries are left untouched.
pub(crate) fn quality_prune(solutions: &mut Vec<PartialSolution>, fraction: f64) {
    let Some(best) = solutions.iter().find_map(|s| s.fit.as_ref()) else {
        return;
    };
    let best_log = best.residual_cost.ln();

    solutions.retain(|s| match &s.fit {
        Some(fit) => fit.residual_cost.ln() < fraction * best_log,
        None => true,
    });
}

/// Scan the sorted list in order, keeping a solution only if its location
/// is farther than `min_separation` from every already-kept solution.
pub(crate) fn spatial_dedup(solutions: &mut Vec<PartialSolution>, min_separation: f64) {
    let mut kept: Vec<Vector3<f64>> = Vec::new();

    solutions.retain(|s| {
        let Some(fit) = &s.fit else {
            return true;
        };
        if kept
            .iter()
            .any(|loc| (loc - fit.location).norm() < min_separation)
        {
            false
        } else {
            kept.push(fit.location);
            true
        }
    });
}
