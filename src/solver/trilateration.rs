//! Bounded trilateration solver
//!
//! Solves for an unknown 3D point given round-trip range constraints:
//! each constraint fixes the total path length from a transmit antenna,
//! through the unknown point, to a receive antenna. The fit is a
//! box-constrained nonlinear least-squares problem minimized with
//! Levenberg-Marquardt and clamped iterates.
//!
//! The solver is stateless and reentrant: all optimization state is
//! call-local, so independent engine instances may invoke it concurrently.

use nalgebra::{DMatrix, DVector, Vector3};

use crate::common::geometry::round_trip_distance;

/// Minimum number of range constraints needed to fix a 3D point.
pub const MIN_CONSTRAINTS: usize = 3;

/// Iteration cap for the Levenberg-Marquardt loop.
const MAX_ITERATIONS: usize = 100;

/// Damping schedule bounds.
const INITIAL_DAMPING: f64 = 1e-3;
const MIN_DAMPING: f64 = 1e-12;
const MAX_DAMPING: f64 = 1e10;

/// First-order convergence: max absolute gradient component.
const GRADIENT_TOLERANCE: f64 = 1e-10;

/// Step-size convergence, relative to the current iterate.
const STEP_TOLERANCE: f64 = 1e-10;

/// Guard against zero-length direction vectors in the Jacobian.
const NORM_EPSILON: f64 = 1e-12;

/// A coordinate this close to a bound counts as an active (clipped) bound.
const BOUND_EPSILON: f64 = 1e-8;

/// Round-trip range least-squares problem over the first `dims` coordinates,
/// with the remaining coordinates held at the fallback point.
struct RangeProblem<'a> {
    distances: &'a [f64],
    tx_points: &'a [Vector3<f64>],
    rx_points: &'a [Vector3<f64>],
    fallback: &'a Vector3<f64>,
    count: usize,
    dims: usize,
}

impl RangeProblem<'_> {
    /// Build the full 3D point from the estimated coordinates plus fallback.
    fn assemble(&self, x: &DVector<f64>) -> Vector3<f64> {
        let mut p = *self.fallback;
        for j in 0..self.dims {
            p[j] = x[j];
        }
        p
    }

    /// Residual vector: expected round-trip length minus measured distance.
    fn residuals(&self, x: &DVector<f64>) -> DVector<f64> {
        let p = self.assemble(x);
        DVector::from_fn(self.count, |i, _| {
            round_trip_distance(&p, &self.tx_points[i], &self.rx_points[i]) - self.distances[i]
        })
    }

    /// Analytic Jacobian: row i is the sum of the unit vectors from each
    /// antenna toward the current point, restricted to the free coordinates.
    fn jacobian(&self, x: &DVector<f64>) -> DMatrix<f64> {
        let p = self.assemble(x);
        let mut jac = DMatrix::zeros(self.count, self.dims);
        for i in 0..self.count {
            let to_tx = p - self.tx_points[i];
            let to_rx = p - self.rx_points[i];
            let norm_tx = to_tx.norm();
            let norm_rx = to_rx.norm();
            for j in 0..self.dims {
                let g_tx = if norm_tx > NORM_EPSILON {
                    to_tx[j] / norm_tx
                } else {
                    0.0
                };
                let g_rx = if norm_rx > NORM_EPSILON {
                    to_rx[j] / norm_rx
                } else {
                    0.0
                };
                jac[(i, j)] = g_tx + g_rx;
            }
        }
        jac
    }
}

/// Clamp the free coordinates into the box.
fn clamp_in_place(x: &mut DVector<f64>, box_min: &Vector3<f64>, box_max: &Vector3<f64>) {
    for j in 0..x.len() {
        x[j] = x[j].clamp(box_min[j], box_max[j]);
    }
}

/// Solve for the unknown point given `count` round-trip range constraints.
///
/// Minimizes `0.5 * sum_i [(|p - tx_i| + |p - rx_i|) - d_i]^2` over the
/// first `initial_guess.len()` coordinates of `p`, with the remaining
/// coordinates held at `fallback_point`, subject to the box
/// `[box_min, box_max]` component-wise.
///
/// # Arguments
/// * `measured_distances` - At least `count` round-trip ranges, index-aligned
///   with the antenna points
/// * `initial_guess` - Starting values for the estimated coordinates (1-3)
/// * `tx_points` / `rx_points` - Antenna locations per constraint
/// * `fallback_point` - Values for coordinates not being estimated
/// * `count` - Number of constraints to use
/// * `cost_threshold` - Achieved cost must be strictly below this value
/// * `box_min` / `box_max` - Search region bounds
///
/// # Returns
/// The solved point and its achieved cost, or `None` when the optimizer
/// fails to converge, the cost is not below the threshold, fewer than
/// [`MIN_CONSTRAINTS`] constraints are supplied, or the solution sits on a
/// box boundary (a clipped, degenerate fit).
///
/// # Panics
/// On contract violations only: mismatched input lengths, an empty or
/// over-length guess, or an inverted box.
pub fn solve(
    measured_distances: &[f64],
    initial_guess: &DVector<f64>,
    tx_points: &[Vector3<f64>],
    rx_points: &[Vector3<f64>],
    fallback_point: &Vector3<f64>,
    count: usize,
    cost_threshold: f64,
    box_min: &Vector3<f64>,
    box_max: &Vector3<f64>,
) -> Option<(Vector3<f64>, f64)> {
    let dims = initial_guess.len();
    assert!(
        (1..=3).contains(&dims),
        "initial guess must estimate 1 to 3 coordinates, got {}",
        dims
    );
    assert!(
        measured_distances.len() >= count,
        "need {} distances, got {}",
        count,
        measured_distances.len()
    );
    assert!(
        tx_points.len() >= count && rx_points.len() >= count,
        "need {} antenna pairs, got {} tx / {} rx",
        count,
        tx_points.len(),
        rx_points.len()
    );
    assert!(
        (0..dims).all(|j| box_min[j] <= box_max[j]),
        "box_min must be component-wise <= box_max"
    );

    if count < MIN_CONSTRAINTS {
        return None;
    }

    let problem = RangeProblem {
        distances: measured_distances,
        tx_points,
        rx_points,
        fallback: fallback_point,
        count,
        dims,
    };

    let mut x = initial_guess.clone();
    clamp_in_place(&mut x, box_min, box_max);
    let mut residuals = problem.residuals(&x);
    let mut cost = 0.5 * residuals.norm_squared();
    let mut lambda = INITIAL_DAMPING;
    let mut converged = false;

    for _ in 0..MAX_ITERATIONS {
        let jac = problem.jacobian(&x);
        let gradient = jac.transpose() * &residuals;
        if gradient.amax() < GRADIENT_TOLERANCE {
            converged = true;
            break;
        }
        let jtj = jac.transpose() * &jac;

        // Escalate damping until a downhill step is found or the schedule
        // is exhausted.
        let mut stepped = false;
        while lambda <= MAX_DAMPING {
            let mut damped = jtj.clone();
            for j in 0..dims {
                damped[(j, j)] += lambda * (1.0 + jtj[(j, j)]);
            }
            let Some(chol) = damped.cholesky() else {
                lambda *= 10.0;
                continue;
            };
            let step = chol.solve(&(-&gradient));

            let mut x_new = &x + &step;
            clamp_in_place(&mut x_new, box_min, box_max);
            let residuals_new = problem.residuals(&x_new);
            let cost_new = 0.5 * residuals_new.norm_squared();

            if cost_new < cost {
                let moved = (&x_new - &x).norm();
                x = x_new;
                residuals = residuals_new;
                cost = cost_new;
                lambda = (lambda * 0.1).max(MIN_DAMPING);
                stepped = true;
                if moved < STEP_TOLERANCE * (1.0 + x.norm()) {
                    converged = true;
                }
                break;
            }
            lambda *= 10.0;
        }

        if converged {
            break;
        }
        if !stepped {
            // No downhill step exists at any damping: the iterate is a
            // (possibly clamped) local minimum.
            converged = true;
            break;
        }
    }

    if !converged || cost >= cost_threshold {
        return None;
    }

    // A solution resting on any active bound was clipped, not solved.
    for j in 0..dims {
        if x[j] - box_min[j] <= BOUND_EPSILON || box_max[j] - x[j] <= BOUND_EPSILON {
            return None;
        }
    }

    Some((problem.assemble(&x), cost))
}
