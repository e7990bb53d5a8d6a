//! Operand normalization into the convergence domain `[0, 2]`.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::leveled::LeveledScheme;
use crate::tracker::LevelTracker;

/// Operand domain `[min, max]`, `0 <= min < max`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    /// Smallest admitted operand.
    pub min: f64,
    /// Largest admitted operand; fixes the factor `2/max`.
    pub max: f64,
}

impl Bounds {
    /// Validated bounds.
    pub fn new(min: f64, max: f64) -> Result<Self> {
        let bounds = Self { min, max };
        bounds.validate()?;
        Ok(bounds)
    }

    /// Fails on non-finite, negative or empty ranges.
    pub fn validate(&self) -> Result<()> {
        let Self { min, max } = *self;
        if !min.is_finite() || !max.is_finite() || min < 0.0 || min >= max {
            return Err(Error::InvalidBounds { min, max });
        }
        Ok(())
    }

    /// `2 / max`: maps `[0, max]` onto `[0, 2]`.
    pub fn factor(&self) -> f64 {
        2.0 / self.max
    }

    /// `min <= value <= max`.
    pub fn contains(&self, value: f64) -> bool {
        (self.min..=self.max).contains(&value)
    }

    /// First entry outside the bounds, as an `OutOfBounds` error.
    pub fn check(&self, values: &[f64]) -> Result<()> {
        match values.iter().position(|&v| !self.contains(v)) {
            Some(slot) => Err(Error::OutOfBounds {
                slot,
                value: values[slot],
                min: self.min,
                max: self.max,
            }),
            None => Ok(()),
        }
    }

    /// `value · 2/max`.
    pub fn normalize(&self, value: f64) -> f64 {
        value * self.factor()
    }

    /// Inverse of [`Bounds::normalize`].
    pub fn denormalize(&self, value: f64) -> f64 {
        value / self.factor()
    }
}

/// Holds `2/max` encoded once at the nominal scale.
pub struct Normalizer<S: LeveledScheme> {
    bounds: Bounds,
    factor: S::Plaintext,
}

impl<S: LeveledScheme> Normalizer<S> {
    /// Encodes the factor of `bounds` for `scheme`.
    pub fn new(scheme: &S, bounds: Bounds) -> Result<Self> {
        bounds.validate()?;
        let factor = scheme.encode(
            &vec![bounds.factor(); scheme.slot_count()],
            scheme.nominal_scale(),
        )?;
        Ok(Self { bounds, factor })
    }

    /// Bounds the factor was derived from.
    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// ct · (2/max), one level deeper at the nominal scale.
    pub fn normalize(
        &self,
        tracker: &LevelTracker<'_, S>,
        ct: &S::Ciphertext,
    ) -> Result<S::Ciphertext> {
        tracker.multiply_plain(ct, &self.factor)
    }
}
