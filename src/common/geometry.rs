//! Shared 3D geometry helpers
//!
//! Small free functions used by both the trilateration solver and the
//! fusion engine: round-trip path lengths and axis-aligned box math.

use nalgebra::Vector3;

/// Total path length from `tx`, through `p`, to `rx`.
///
/// This is the quantity a round-trip range measurement observes: the
/// signal travels from the transmit antenna to the tag and back to the
/// receive antenna.
#[inline]
pub fn round_trip_distance(p: &Vector3<f64>, tx: &Vector3<f64>, rx: &Vector3<f64>) -> f64 {
    (p - tx).norm() + (p - rx).norm()
}

/// Center of the axis-aligned box `[box_min, box_max]`.
#[inline]
pub fn box_center(box_min: &Vector3<f64>, box_max: &Vector3<f64>) -> Vector3<f64> {
    (box_min + box_max) / 2.0
}

/// True if `box_min` is component-wise less than or equal to `box_max`.
#[inline]
pub fn box_is_ordered(box_min: &Vector3<f64>, box_max: &Vector3<f64>) -> bool {
    (0..3).all(|i| box_min[i] <= box_max[i])
}
