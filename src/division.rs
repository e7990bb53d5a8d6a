//! Encrypted division `x / y ≈ x' · a_d(y')`.
//!
//! Both operands are normalized by the same `2/max`, the reciprocal of the
//! normalized divisor is approximated, and the normalized dividend is
//! switched down to the reciprocal's level for the final product.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::cipher::Leveled;
use crate::error::{Error, Result};
use crate::leveled::LeveledScheme;
use crate::normalizer::{Bounds, Normalizer};
use crate::reciprocal::ReciprocalApproximator;
use crate::tracker::LevelTracker;

/// Operand domain and iteration count of a division.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DivisionConfig {
    /// Domain both operands are normalized from.
    pub bounds: Bounds,
    /// Newton-Schulz iterations `d`.
    pub iterations: usize,
}

/// Levels consumed by each stage of a division.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LevelBudget {
    /// One ct×pt product per operand, run side by side.
    pub normalization: usize,
    /// `b` drops one level per iteration and `a` has to follow it down
    /// once more, so `d > 0` costs `d + 1`.
    pub approximation: usize,
    /// Final `x' · a_d` product.
    pub division: usize,
}

impl LevelBudget {
    /// Budget of a division running `iterations` steps.
    pub fn for_iterations(iterations: usize) -> Self {
        Self {
            normalization: 1,
            approximation: if iterations == 0 { 0 } else { iterations + 1 },
            division: 1,
        }
    }

    /// Levels between the inputs and the quotient.
    pub fn total(&self) -> usize {
        self.normalization + self.approximation + self.division
    }
}

/// Normalizer, approximator and final product over one scheme.
pub struct DivisionEvaluator<'a, S: LeveledScheme> {
    scheme: &'a S,
    config: DivisionConfig,
    budget: LevelBudget,
    normalizer: Normalizer<S>,
    approximator: ReciprocalApproximator<S>,
}

impl<'a, S: LeveledScheme> DivisionEvaluator<'a, S> {
    /// Fails with `ChainTooShallow` if a fresh ciphertext could not absorb
    /// the whole division.
    pub fn new(scheme: &'a S, config: DivisionConfig) -> Result<Self> {
        let budget = LevelBudget::for_iterations(config.iterations);
        check_budget(scheme, &budget, 0)?;
        Ok(Self {
            scheme,
            config,
            budget,
            normalizer: Normalizer::new(scheme, config.bounds)?,
            approximator: ReciprocalApproximator::new(scheme, config.iterations)?,
        })
    }

    /// Configuration the evaluator was built with.
    pub fn config(&self) -> &DivisionConfig {
        &self.config
    }

    /// Levels one division consumes.
    pub fn budget(&self) -> LevelBudget {
        self.budget
    }

    /// Divide two ciphertexts sitting at the same level. The result sits
    /// `budget().total()` levels deeper at the nominal scale.
    pub fn divide_encrypted(
        &self,
        x: &S::Ciphertext,
        y: &S::Ciphertext,
    ) -> Result<S::Ciphertext> {
        if x.level() != y.level() {
            return Err(Error::LevelMismatch {
                left: x.level(),
                right: y.level(),
            });
        }
        let start = x.level();
        check_budget(self.scheme, &self.budget, start)?;
        info!(
            start,
            iterations = self.config.iterations,
            max = self.config.bounds.max,
            "dividing"
        );

        let tracker = LevelTracker::new(self.scheme);
        let x_norm = self.normalizer.normalize(&tracker, x)?;
        let y_norm = self.normalizer.normalize(&tracker, y)?;
        let reciprocal = self.approximator.approximate(&tracker, &y_norm)?;
        let quotient = tracker.multiply(&x_norm, &reciprocal)?;

        info!(level = quotient.level(), scale = quotient.scale(), "division done");
        Ok(quotient)
    }

    /// Encode, encrypt and divide full slot vectors. Every dividend entry
    /// must lie within the bounds; divisors are not checked.
    pub fn divide<R: Rng + ?Sized>(
        &self,
        x: &[f64],
        y: &[f64],
        rng: &mut R,
    ) -> Result<S::Ciphertext> {
        let slots = self.scheme.slot_count();
        for values in [x, y] {
            if values.len() != slots {
                return Err(Error::SlotCountMismatch {
                    expected: slots,
                    got: values.len(),
                });
            }
        }
        self.config.bounds.check(x)?;

        let scale = self.scheme.nominal_scale();
        let x_ct = self.scheme.encrypt(&self.scheme.encode(x, scale)?, rng)?;
        let y_ct = self.scheme.encrypt(&self.scheme.encode(y, scale)?, rng)?;
        self.divide_encrypted(&x_ct, &y_ct)
    }
}

/// One-shot encrypted division of `x` by `y`.
pub fn divide<S: LeveledScheme, R: Rng + ?Sized>(
    scheme: &S,
    x: &[f64],
    y: &[f64],
    bounds: Bounds,
    iterations: usize,
    rng: &mut R,
) -> Result<S::Ciphertext> {
    DivisionEvaluator::new(scheme, DivisionConfig { bounds, iterations })?.divide(x, y, rng)
}

fn check_budget<S: LeveledScheme>(scheme: &S, budget: &LevelBudget, start: usize) -> Result<()> {
    let max_level = scheme.chain_length().saturating_sub(1);
    let required = budget.total();
    if start + required > max_level {
        return Err(Error::ChainTooShallow {
            required,
            start,
            max_level,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modulus_chain::CkksParams;
    use crate::reference::reference_divide;
    use crate::scheme::Ckks;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn scheme(seed: u64) -> (Ckks, StdRng) {
        let mut rng = StdRng::seed_from_u64(seed);
        let ckks = Ckks::generate_keys(CkksParams::toy(), &mut rng).unwrap();
        (ckks, rng)
    }

    fn bounds() -> Bounds {
        Bounds::new(0.0, 10000.0).unwrap()
    }

    fn operands(slots: usize) -> (Vec<f64>, Vec<f64>) {
        let x = vec![100.0; slots];
        let y = (1..=slots).map(|i| i as f64 * 300.0).collect();
        (x, y)
    }

    #[test]
    fn test_budget() {
        assert_eq!(LevelBudget::for_iterations(0).total(), 2);
        assert_eq!(LevelBudget::for_iterations(1).total(), 4);
        assert_eq!(LevelBudget::for_iterations(3).total(), 6);
    }

    #[test]
    fn test_level_accounting() {
        let (ckks, mut rng) = scheme(1);
        let (x, y) = operands(ckks.slot_count());
        for d in 0..=5 {
            let out = divide(&ckks, &x, &y, bounds(), d, &mut rng).unwrap();
            assert_eq!(out.level(), LevelBudget::for_iterations(d).total(), "d = {d}");
            assert_eq!(out.scale(), ckks.nominal_scale());
            assert_eq!(out.size(), 2);
        }
    }

    #[test]
    fn test_matches_reference() {
        let (ckks, mut rng) = scheme(2);
        let (x, y) = operands(ckks.slot_count());
        for d in [0, 2, 4] {
            let out = divide(&ckks, &x, &y, bounds(), d, &mut rng).unwrap();
            let got = ckks.decrypt_decode(&out).unwrap();
            let want = reference_divide(&x, &y, &bounds(), d).unwrap();
            for (g, w) in got.iter().zip(&want) {
                assert!((g - w).abs() < 1e-4 * w.abs().max(1e-3), "d = {d}: {g} vs {w}");
            }
        }
    }

    #[test]
    fn test_converges_with_iterations() {
        let (ckks, mut rng) = scheme(3);
        let (x, y) = operands(ckks.slot_count());
        let exact: Vec<f64> = x.iter().zip(&y).map(|(a, b)| a / b).collect();
        let worst = |d: usize, rng: &mut StdRng| {
            let out = divide(&ckks, &x, &y, bounds(), d, rng).unwrap();
            ckks.decrypt_decode(&out)
                .unwrap()
                .iter()
                .zip(&exact)
                .map(|(g, e)| (g - e).abs() / e)
                .fold(0.0, f64::max)
        };
        let coarse = worst(1, &mut rng);
        let fine = worst(5, &mut rng);
        assert!(fine < coarse);
        assert!(fine < 0.5);
    }

    #[test]
    fn test_deterministic_under_seed() {
        let run = |seed: u64| {
            let (ckks, mut rng) = scheme(seed);
            let (x, y) = operands(ckks.slot_count());
            let out = divide(&ckks, &x, &y, bounds(), 3, &mut rng).unwrap();
            (out.level(), out.scale(), ckks.decrypt_decode(&out).unwrap())
        };
        let first = run(9);
        assert_eq!(first, run(9));

        let other = run(10);
        assert_eq!((first.0, first.1), (other.0, other.1));
        for (a, b) in first.2.iter().zip(&other.2) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn test_chain_too_shallow() {
        let (ckks, mut rng) = scheme(4);
        let config = DivisionConfig {
            bounds: bounds(),
            iterations: 6,
        };
        assert!(matches!(
            DivisionEvaluator::new(&ckks, config),
            Err(Error::ChainTooShallow { required: 9, start: 0, max_level: 8 })
        ));

        // fits from the top but not from level 2
        let config = DivisionConfig {
            bounds: bounds(),
            iterations: 4,
        };
        let evaluator = DivisionEvaluator::new(&ckks, config).unwrap();
        let pt = ckks
            .encode(&vec![1.0; ckks.slot_count()], ckks.nominal_scale())
            .unwrap();
        let ct = ckks.mod_switch(ckks.encrypt(&pt, &mut rng).unwrap(), 2).unwrap();
        assert!(matches!(
            evaluator.divide_encrypted(&ct, &ct),
            Err(Error::ChainTooShallow { start: 2, .. })
        ));
    }

    #[test]
    fn test_rejects_bad_inputs() {
        let (ckks, mut rng) = scheme(5);
        let slots = ckks.slot_count();
        let config = DivisionConfig {
            bounds: bounds(),
            iterations: 2,
        };
        let evaluator = DivisionEvaluator::new(&ckks, config).unwrap();

        let (x, y) = operands(slots);
        assert!(matches!(
            evaluator.divide(&x[..3], &y, &mut rng),
            Err(Error::SlotCountMismatch { got: 3, .. })
        ));

        let mut big = x.clone();
        big[7] = 20000.0;
        assert!(matches!(
            evaluator.divide(&big, &y, &mut rng),
            Err(Error::OutOfBounds { slot: 7, .. })
        ));

        let pt = ckks.encode(&x, ckks.nominal_scale()).unwrap();
        let top = ckks.encrypt(&pt, &mut rng).unwrap();
        let lower = ckks.mod_switch(top.clone(), 1).unwrap();
        assert!(matches!(
            evaluator.divide_encrypted(&top, &lower),
            Err(Error::LevelMismatch { left: 0, right: 1 })
        ));
    }

    #[test]
    fn test_divisor_is_not_validated() {
        let (ckks, mut rng) = scheme(6);
        let (x, mut y) = operands(ckks.slot_count());
        // outside [0, max]: diverges numerically, still evaluates
        y[0] = 15000.0;
        let out = divide(&ckks, &x, &y, bounds(), 2, &mut rng).unwrap();
        assert_eq!(out.level(), LevelBudget::for_iterations(2).total());
    }
}
