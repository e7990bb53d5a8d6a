//! Plaintext evaluation of the same recurrence, slot by slot.

use itertools::Itertools;

use crate::error::{Error, Result};
use crate::normalizer::Bounds;

/// `a_d` for a normalized divisor `y'`.
pub fn reference_reciprocal(y: f64, iterations: usize) -> f64 {
    let (a, _) = (0..iterations).fold((2.0 - y, 1.0 - y), |(a, b), _| {
        let b = b * b;
        (a * (1.0 + b), b)
    });
    a
}

/// `x' · a_d(y')` per slot; the `2/max` factors cancel.
pub fn reference_divide(
    x: &[f64],
    y: &[f64],
    bounds: &Bounds,
    iterations: usize,
) -> Result<Vec<f64>> {
    if x.len() != y.len() {
        return Err(Error::SlotCountMismatch {
            expected: x.len(),
            got: y.len(),
        });
    }
    bounds.validate()?;
    Ok(x.iter()
        .zip_eq(y)
        .map(|(&xi, &yi)| {
            bounds.normalize(xi) * reference_reciprocal(bounds.normalize(yi), iterations)
        })
        .collect())
}
