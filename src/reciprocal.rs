//! Newton-Schulz reciprocal of a normalized divisor `y' ∈ (0, 2)`.
//!
//! ```text
//! a0 = 2 - y'    b0 = 1 - y'
//! b <- b²        a <- a·(1 + b)      (d times)
//! ```
//! `a_d = 1/y' · (1 - (1 - y')^(2^(d+1)))`.

use tracing::debug;

use crate::cipher::Leveled;
use crate::error::Result;
use crate::leveled::LeveledScheme;
use crate::tracker::LevelTracker;

/// `(a_n, b_n)`; replaced wholesale on every iteration.
#[derive(Clone, Debug)]
pub struct IterationState<C> {
    /// Running reciprocal estimate.
    pub a: C,
    /// `(1 - y')^(2^n)`.
    pub b: C,
}

/// Runs a fixed number of iterations with encoded constants 1 and 2.
pub struct ReciprocalApproximator<S: LeveledScheme> {
    one: S::Plaintext,
    two: S::Plaintext,
    iterations: usize,
}

impl<S: LeveledScheme> ReciprocalApproximator<S> {
    /// Encodes the constants for `scheme`.
    pub fn new(scheme: &S, iterations: usize) -> Result<Self> {
        let slots = scheme.slot_count();
        let scale = scheme.nominal_scale();
        Ok(Self {
            one: scheme.encode(&vec![1.0; slots], scale)?,
            two: scheme.encode(&vec![2.0; slots], scale)?,
            iterations,
        })
    }

    /// Iteration count `d`.
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// `(2 - y', 1 - y')` at the level of `y'`.
    pub fn initial_state(
        &self,
        tracker: &LevelTracker<'_, S>,
        y: &S::Ciphertext,
    ) -> Result<IterationState<S::Ciphertext>> {
        let neg = tracker.scheme().negate(y);
        Ok(IterationState {
            a: tracker.add_plain(&neg, &self.two)?,
            b: tracker.add_plain(&neg, &self.one)?,
        })
    }

    /// One iteration. `b` drops one level, `a` lands one below `b`.
    pub fn step(
        &self,
        tracker: &LevelTracker<'_, S>,
        state: IterationState<S::Ciphertext>,
    ) -> Result<IterationState<S::Ciphertext>> {
        let b = tracker.square(&state.b)?;
        let one_plus_b = tracker.add_plain(&b, &self.one)?;
        let a = tracker.multiply(&state.a, &one_plus_b)?;
        Ok(IterationState { a, b })
    }

    /// `a_d` for the normalized divisor `y`.
    pub fn approximate(
        &self,
        tracker: &LevelTracker<'_, S>,
        y: &S::Ciphertext,
    ) -> Result<S::Ciphertext> {
        let initial = self.initial_state(tracker, y)?;
        let state = (0..self.iterations).try_fold(initial, |state, n| -> Result<_> {
            let next = self.step(tracker, state)?;
            debug!(
                iteration = n + 1,
                a_level = next.a.level(),
                b_level = next.b.level(),
                "reciprocal step"
            );
            Ok(next)
        })?;
        Ok(state.a)
    }
}
