//! Core data model for the fusion search
//!
//! This module defines the units the frontier search operates on:
//!
//! - [`Candidate`] - One ambiguous distance hypothesis within a measurement
//! - [`Measurement`] - One observation event: candidates + antenna pair
//! - [`PartialSolution`] - A fused hypothesis built from exactly `k` measurements
//! - [`Frontier`] - The per-level sets of partial solutions
//!
//! Partial solutions are immutable. Extending one produces a child that
//! shares the parent's candidate chain through an `Arc` link instead of
//! copying the growing sequences on every extension.

use std::collections::BTreeMap;
use std::sync::Arc;

use nalgebra::Vector3;
use smallvec::SmallVec;

/// One ambiguous range estimate within a measurement's ranked candidate list.
///
/// A non-finite `distance` marks an invalid/unavailable candidate; the
/// engine skips it without error.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    /// Estimated round-trip distance in meters
    pub distance: f64,
    /// Selection cost assigned by the upstream candidate ranking
    pub cost: f64,
}

impl Candidate {
    /// Create a new candidate
    pub fn new(distance: f64, cost: f64) -> Self {
        Self { distance, cost }
    }

    /// Whether this candidate carries a usable distance value
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.distance.is_finite()
    }
}

/// One observation event: a ranked candidate list plus the antenna pair
/// geometry it was taken with. Immutable once created.
#[derive(Debug, Clone)]
pub struct Measurement {
    /// Ranked distance candidates (slot 0 first)
    pub candidates: SmallVec<[Candidate; 4]>,
    /// Receive antenna location
    pub rx_loc: Vector3<f64>,
    /// Transmit antenna location
    pub tx_loc: Vector3<f64>,
}

impl Measurement {
    /// Create a new measurement
    pub fn new(
        candidates: impl IntoIterator<Item = Candidate>,
        rx_loc: Vector3<f64>,
        tx_loc: Vector3<f64>,
    ) -> Self {
        Self {
            candidates: candidates.into_iter().collect(),
            rx_loc,
            tx_loc,
        }
    }

    /// Number of candidates (valid or not)
    #[inline]
    pub fn num_candidates(&self) -> usize {
        self.candidates.len()
    }
}

/// A solved location together with the least-squares cost that produced it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fit {
    /// Solved 3D location
    pub location: Vector3<f64>,
    /// Achieved least-squares cost (lower is more consistent)
    pub residual_cost: f64,
}

/// One link in a partial solution's candidate chain.
///
/// Children reference their parent's chain rather than copying it, so an
/// extension is O(1) regardless of how many measurements are already fused.
#[derive(Debug)]
struct FusionStep {
    candidate: Candidate,
    slot: usize,
    rx_loc: Vector3<f64>,
    tx_loc: Vector3<f64>,
    measurement_id: usize,
    parent: Option<Arc<FusionStep>>,
}

/// A fused hypothesis: one candidate chosen from each of `k` measurements,
/// plus the solved location and fit quality when at least 3 distances
/// constrain it.
///
/// The level-0 sentinel and under-constrained hypotheses (`k < 3`) carry
/// `fit: None`; a `Some` fit always holds a genuinely solved location.
#[derive(Debug, Clone)]
pub struct PartialSolution {
    path: Option<Arc<FusionStep>>,
    depth: usize,
    /// Sum of the selection costs of the chosen candidates (NaN for the sentinel)
    pub combined_cluster_cost: f64,
    /// Solved location and residual cost, if this hypothesis has been solved
    pub fit: Option<Fit>,
    /// How many times candidate slot 0, 1, or 2 was chosen (diagnostic only)
    pub slot_counts: [u32; 3],
}

impl PartialSolution {
    /// The level-0 sentinel: no candidates chosen, undefined location.
    pub(crate) fn sentinel() -> Self {
        Self {
            path: None,
            depth: 0,
            combined_cluster_cost: f64::NAN,
            fit: None,
            slot_counts: [0; 3],
        }
    }

    /// Extend this solution with one candidate from a new measurement.
    /// The child starts unsolved; attach a fit with [`PartialSolution::with_fit`].
    pub(crate) fn child(
        &self,
        candidate: Candidate,
        slot: usize,
        rx_loc: Vector3<f64>,
        tx_loc: Vector3<f64>,
        measurement_id: usize,
    ) -> Self {
        let mut slot_counts = self.slot_counts;
        if slot < slot_counts.len() {
            slot_counts[slot] += 1;
        }

        let combined_cluster_cost = if self.is_sentinel() {
            candidate.cost
        } else {
            self.combined_cluster_cost + candidate.cost
        };

        Self {
            path: Some(Arc::new(FusionStep {
                candidate,
                slot,
                rx_loc,
                tx_loc,
                measurement_id,
                parent: self.path.clone(),
            })),
            depth: self.depth + 1,
            combined_cluster_cost,
            fit: None,
            slot_counts,
        }
    }

    /// Attach a solved fit to an unsolved child.
    pub(crate) fn with_fit(mut self, fit: Fit) -> Self {
        self.fit = Some(fit);
        self
    }

    /// Number of measurements fused into this solution (its frontier level).
    #[inline]
    pub fn level(&self) -> usize {
        self.depth
    }

    /// Whether this is the level-0 sentinel.
    #[inline]
    pub fn is_sentinel(&self) -> bool {
        self.path.is_none()
    }

    /// Chosen candidates in fusion order (oldest measurement first).
    pub fn candidates(&self) -> Vec<Candidate> {
        self.collect_rev(|step| step.candidate)
    }

    /// Chosen candidate distances in fusion order.
    pub fn distances(&self) -> Vec<f64> {
        self.collect_rev(|step| step.candidate.distance)
    }

    /// Receive antenna locations in fusion order.
    pub fn rx_locs(&self) -> Vec<Vector3<f64>> {
        self.collect_rev(|step| step.rx_loc)
    }

    /// Transmit antenna locations in fusion order.
    pub fn tx_locs(&self) -> Vec<Vector3<f64>> {
        self.collect_rev(|step| step.tx_loc)
    }

    /// Originating measurement identifiers in fusion order.
    pub fn tx_indices(&self) -> Vec<usize> {
        self.collect_rev(|step| step.measurement_id)
    }

    /// Candidate slot indices chosen at each step, in fusion order.
    pub fn slots(&self) -> Vec<usize> {
        self.collect_rev(|step| step.slot)
    }

    /// Walk the chain newest-to-oldest, collect, and reverse into fusion order.
    fn collect_rev<T>(&self, f: impl Fn(&FusionStep) -> T) -> Vec<T> {
        let mut out = Vec::with_capacity(self.depth);
        let mut next = self.path.as_deref();
        while let Some(step) = next {
            out.push(f(step));
            next = step.parent.as_deref();
        }
        out.reverse();
        out
    }
}

/// Ordering by residual cost, unsolved entries last.
pub(crate) fn residual_order(a: &PartialSolution, b: &PartialSolution) -> std::cmp::Ordering {
    match (&a.fit, &b.fit) {
        (Some(fa), Some(fb)) => fa.residual_cost.total_cmp(&fb.residual_cost),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    }
}

/// The search frontier: level `k` maps to the partial solutions fusing
/// exactly `k` measurements, sorted ascending by residual cost.
///
/// Level 0 holds the single sentinel for the lifetime of the engine.
/// Levels dropped by an early round termination simply have no entry.
#[derive(Debug, Clone)]
pub struct Frontier {
    levels: BTreeMap<usize, Vec<PartialSolution>>,
}

impl Frontier {
    /// A fresh frontier with only the level-0 sentinel populated.
    pub(crate) fn with_sentinel() -> Self {
        let mut levels = BTreeMap::new();
        levels.insert(0, vec![PartialSolution::sentinel()]);
        Self { levels }
    }

    pub(crate) fn from_levels(levels: BTreeMap<usize, Vec<PartialSolution>>) -> Self {
        Self { levels }
    }

    /// Solutions at level `k`; empty slice if the level has no entry.
    pub fn level(&self, k: usize) -> &[PartialSolution] {
        self.levels.get(&k).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Iterate populated levels in ascending `k` order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &[PartialSolution])> + '_ {
        self.levels.iter().map(|(&k, v)| (k, v.as_slice()))
    }

    /// Mutable iteration for the per-level pruning pass.
    pub(crate) fn iter_mut(
        &mut self,
    ) -> impl Iterator<Item = (usize, &mut Vec<PartialSolution>)> + '_ {
        self.levels.iter_mut().map(|(&k, v)| (k, v))
    }

    /// Highest populated level.
    pub fn max_level(&self) -> usize {
        self.levels.keys().next_back().copied().unwrap_or(0)
    }

    /// Total number of partial solutions across all levels.
    pub fn num_solutions(&self) -> usize {
        self.levels.values().map(Vec::len).sum()
    }
}
