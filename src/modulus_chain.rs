//! Encryption parameters and the modulus chain derived from them.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Error, Result};
use crate::ntt::{is_prime, NttPlan};

/// CKKS parameters: (N, data prime sizes, special prime size, Δ, σ).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CkksParams {
    /// Ring degree is `2^log_degree`.
    pub log_degree: u32,
    /// Bit sizes of the data primes, base prime first. Rescaling drops primes
    /// from the end of this list.
    pub modulus_bits: Vec<u32>,
    /// Bit size of the key-switching prime.
    pub special_modulus_bits: u32,
    /// Nominal scale is `2^log_scale`.
    pub log_scale: u32,
    /// Standard deviation of the error distribution.
    pub error_std_dev: f64,
}

impl CkksParams {
    /// Poly degree 2^14, chain [60, 40 x 6] + special 60, scale 2^40.
    pub fn demo() -> Self {
        Self {
            log_degree: 14,
            modulus_bits: vec![60, 40, 40, 40, 40, 40, 40],
            special_modulus_bits: 60,
            log_scale: 40,
            error_std_dev: 3.2,
        }
    }

    /// Small ring with a deeper chain, cheap enough for unit tests.
    pub fn toy() -> Self {
        Self {
            log_degree: 6,
            modulus_bits: vec![60, 40, 40, 40, 40, 40, 40, 40, 40],
            special_modulus_bits: 60,
            log_scale: 40,
            error_std_dev: 3.2,
        }
    }

    /// Ring degree N.
    pub fn degree(&self) -> usize {
        1 << self.log_degree
    }

    /// N / 2 real slots.
    pub fn slot_count(&self) -> usize {
        self.degree() / 2
    }

    /// Nominal scale Δ.
    pub fn scale(&self) -> f64 {
        2f64.powi(self.log_scale as i32)
    }

    /// Rejects degrees, prime sizes and scales the backend cannot handle.
    pub fn validate(&self) -> Result<()> {
        if !(1..=16).contains(&self.log_degree) {
            return Err(Error::InvalidParameters(format!(
                "log_degree {} outside [1, 16]",
                self.log_degree
            )));
        }
        if self.modulus_bits.is_empty() {
            return Err(Error::InvalidParameters(
                "modulus chain needs at least one prime".into(),
            ));
        }
        // primes must be 1 mod 2N and small enough for u128 products
        let min_bits = self.log_degree + 2;
        for &bits in self.modulus_bits.iter().chain([&self.special_modulus_bits]) {
            if bits < min_bits || bits > 61 {
                return Err(Error::InvalidParameters(format!(
                    "prime size {bits} outside [{min_bits}, 61]"
                )));
            }
        }
        if self.log_scale == 0 || self.log_scale >= self.modulus_bits[0] {
            return Err(Error::InvalidParameters(format!(
                "scale 2^{} must be below the base prime 2^{}",
                self.log_scale, self.modulus_bits[0]
            )));
        }
        if !(self.error_std_dev >= 0.0) {
            return Err(Error::InvalidParameters(format!(
                "error deviation {} must be non-negative",
                self.error_std_dev
            )));
        }
        Ok(())
    }
}

/// Data primes `q_0 .. q_L` plus the special prime `P`.
///
/// A value at level `l` lives modulo `q_0 * .. * q_{L-l}`.
#[derive(Clone, Debug)]
pub struct ModulusChain {
    primes: Vec<u64>,
    special: u64,
    degree: usize,
    /// One NTT plan per data prime, then one for the special prime.
    plans: Vec<Arc<NttPlan>>,
}

impl ModulusChain {
    /// Pick distinct NTT-friendly primes of the requested sizes and prepare
    /// their NTT plans.
    pub fn generate(params: &CkksParams) -> Result<Self> {
        params.validate()?;
        let degree = params.degree();
        let step = 2 * degree as u64;
        let mut used: Vec<u64> = Vec::new();

        let mut next_prime = |bits: u32| -> Result<u64> {
            // largest candidates k * 2N + 1 below 2^bits
            let mut candidate = (1u64 << bits) + 1 - step;
            let floor = 1u64 << (bits - 1);
            while candidate > floor {
                if !used.contains(&candidate) && is_prime(candidate) {
                    used.push(candidate);
                    return Ok(candidate);
                }
                candidate -= step;
            }
            Err(Error::InvalidParameters(format!(
                "no {bits}-bit prime congruent to 1 mod {step}"
            )))
        };

        let primes = params
            .modulus_bits
            .iter()
            .map(|&bits| next_prime(bits))
            .collect::<Result<Vec<_>>>()?;
        let special = next_prime(params.special_modulus_bits)?;
        let plans = primes
            .iter()
            .chain([&special])
            .map(|&q| {
                NttPlan::get(degree, q).ok_or_else(|| {
                    let reason = format!("prime {q} has no NTT plan for degree {degree}");
                    Error::InvalidParameters(reason)
                })
            })
            .collect::<Result<Vec<_>>>()?;

        info!(
            degree,
            levels = primes.len(),
            ?primes,
            special,
            "generated modulus chain"
        );
        Ok(Self {
            primes,
            special,
            degree,
            plans,
        })
    }

    /// Number of data primes; levels run from 0 to `len() - 1`.
    pub fn len(&self) -> usize {
        self.primes.len()
    }

    /// True only for a chain without data primes, which `generate` never builds.
    pub fn is_empty(&self) -> bool {
        self.primes.is_empty()
    }

    /// Deepest usable level, `len() - 1`.
    pub fn max_level(&self) -> usize {
        self.primes.len() - 1
    }

    /// Ring degree N.
    pub fn degree(&self) -> usize {
        self.degree
    }

    /// Key-switching prime P.
    pub fn special(&self) -> u64 {
        self.special
    }

    /// Data primes, base prime first.
    pub fn primes(&self) -> &[u64] {
        &self.primes
    }

    /// NTT plans in `key_moduli()` order.
    pub fn plans(&self) -> &[Arc<NttPlan>] {
        &self.plans
    }

    /// Moduli active at `level`.
    pub fn moduli_at(&self, level: usize) -> Result<&[u64]> {
        self.check_level(level)?;
        Ok(&self.primes[..self.primes.len() - level])
    }

    /// Prime removed by a rescale from `level` to `level + 1`.
    pub fn dropped_prime(&self, level: usize) -> Result<u64> {
        self.check_level(level + 1)?;
        Ok(self.primes[self.primes.len() - 1 - level])
    }

    /// Data primes followed by the special prime.
    pub fn key_moduli(&self) -> Vec<u64> {
        let mut moduli = self.primes.clone();
        moduli.push(self.special);
        moduli
    }

    /// `LevelExhausted` past the deepest level.
    pub fn check_level(&self, level: usize) -> Result<()> {
        if level > self.max_level() {
            return Err(Error::LevelExhausted {
                requested: level,
                max_level: self.max_level(),
            });
        }
        Ok(())
    }
}
