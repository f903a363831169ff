/*!
Bounded trilateration: box-constrained nonlinear least squares over
round-trip range constraints. Leaf component with no dependency on the
fusion engine.
*/

pub mod trilateration;

pub use trilateration::{solve, MIN_CONSTRAINTS};
