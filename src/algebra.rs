//! Homomorphic add / mult / relinearize / rescale / mod-switch.
//! The relinearization key is generated here from the secret key.

use itertools::{EitherOrBoth, Itertools};
use rand::Rng;

use crate::cipher::{Ciphertext, Plaintext};
use crate::error::{Error, Result};
use crate::modulus_chain::ModulusChain;
use crate::ntt::mul_mod;
use crate::polynomial::RnsPolynomial;

/// Relative tolerance under which two scales count as equal.
const SCALE_TOLERANCE: f64 = 1e-9;

/// Holds the chain and the relinearization key.
#[derive(Clone, Debug)]
pub struct CkksAlgebra {
    chain: ModulusChain,
    /// One (b_i, a_i) pair per data prime, over data primes + special prime:
    /// b_i + a_i·s = e_i + P·[i == j]·s² in residue j.
    relin_key: Vec<(RnsPolynomial, RnsPolynomial)>,
}

impl CkksAlgebra {
    /// `secret_key` must be given over `chain.key_moduli()`.
    pub fn new<R: Rng + ?Sized>(
        chain: &ModulusChain,
        secret_key: &RnsPolynomial,
        error_std_dev: f64,
        rng: &mut R,
    ) -> Self {
        let key_moduli = chain.key_moduli();
        let degree = chain.degree();
        let special = chain.special();
        let s_squared = secret_key * secret_key;

        let relin_key = (0..chain.len())
            .map(|i| {
                let a = RnsPolynomial::random(&key_moduli, degree, rng);
                let e = RnsPolynomial::gaussian(&key_moduli, degree, error_std_dev, rng);
                let q_i = key_moduli[i];
                let p_mod = special % q_i;
                let mut gadget = RnsPolynomial::zero(&key_moduli, degree);
                gadget.residues[i] = s_squared.residues[i]
                    .iter()
                    .map(|&c| mul_mod(c, p_mod, q_i))
                    .collect();
                let b = &(&e - &(&a * secret_key)) + &gadget;
                (b, a)
            })
            .collect();

        Self {
            chain: chain.clone(),
            relin_key,
        }
    }

    /// Chain the relinearization key was generated over.
    pub fn chain(&self) -> &ModulusChain {
        &self.chain
    }

    /// Component-wise sum; equal level and scale required.
    pub fn add(&self, a: &Ciphertext, b: &Ciphertext) -> Result<Ciphertext> {
        same_level(a.level, b.level)?;
        same_scale(a.scale, b.scale)?;
        let parts = a
            .parts
            .iter()
            .zip_longest(&b.parts)
            .map(|pair| match pair {
                EitherOrBoth::Both(x, y) => x + y,
                EitherOrBoth::Left(x) | EitherOrBoth::Right(x) => x.clone(),
            })
            .collect();
        Ok(Ciphertext {
            parts,
            level: a.level,
            scale: a.scale,
        })
    }

    /// Adds the plaintext into `c0`; equal level and scale required.
    pub fn add_plain(&self, a: &Ciphertext, b: &Plaintext) -> Result<Ciphertext> {
        same_level(a.level, b.level)?;
        same_scale(a.scale, b.scale)?;
        let mut parts = a.parts.clone();
        parts[0] = &parts[0] + &b.poly;
        Ok(Ciphertext {
            parts,
            level: a.level,
            scale: a.scale,
        })
    }

    /// Negates every component.
    pub fn negate(&self, a: &Ciphertext) -> Ciphertext {
        Ciphertext {
            parts: a.parts.iter().map(|p| -p).collect(),
            level: a.level,
            scale: a.scale,
        }
    }

    /// Tensor product (d0, d1, d2); size 3 until relinearized.
    pub fn mult(&self, a: &Ciphertext, b: &Ciphertext) -> Result<Ciphertext> {
        canonical(a)?;
        canonical(b)?;
        same_level(a.level, b.level)?;
        let (a0, a1) = (&a.parts[0], &a.parts[1]);
        let (b0, b1) = (&b.parts[0], &b.parts[1]);
        let d0 = a0 * b0;
        let d1 = &(a0 * b1) + &(a1 * b0);
        let d2 = a1 * b1;
        Ok(Ciphertext {
            parts: vec![d0, d1, d2],
            level: a.level,
            scale: a.scale * b.scale,
        })
    }

    /// `mult(a, a)` with one cross product fewer.
    pub fn square(&self, a: &Ciphertext) -> Result<Ciphertext> {
        canonical(a)?;
        let (a0, a1) = (&a.parts[0], &a.parts[1]);
        Ok(Ciphertext {
            parts: vec![a0 * a0, (a0 * a1).scalar_mul(2), a1 * a1],
            level: a.level,
            scale: a.scale * a.scale,
        })
    }

    /// Multiplies every component by the plaintext; scales multiply.
    pub fn mult_plain(&self, a: &Ciphertext, b: &Plaintext) -> Result<Ciphertext> {
        same_level(a.level, b.level)?;
        Ok(Ciphertext {
            parts: a.parts.iter().map(|p| p * &b.poly).collect(),
            level: a.level,
            scale: a.scale * b.scale,
        })
    }

    /// Key-switch the s² component back onto (1, s).
    pub fn relinearize(&self, a: Ciphertext) -> Result<Ciphertext> {
        match a.size() {
            2 => return Ok(a),
            3 => {}
            n => return Err(Error::NotRelinearized(n)),
        }
        let moduli = self.chain.moduli_at(a.level)?;
        let count = moduli.len();
        // level primes plus the special prime, which sits last in the key
        let mut indices: Vec<usize> = (0..count).collect();
        indices.push(self.chain.len());
        let extended: Vec<u64> = moduli
            .iter()
            .copied()
            .chain([self.chain.special()])
            .collect();

        let degree = self.chain.degree();
        let d2 = &a.parts[2];
        let mut acc0 = RnsPolynomial::zero(&extended, degree);
        let mut acc1 = RnsPolynomial::zero(&extended, degree);
        for (i, &q_i) in moduli.iter().enumerate() {
            let digit = RnsPolynomial::lift(&d2.residues[i], q_i, &extended);
            let (b, k) = &self.relin_key[i];
            acc0 = acc0 + &(&digit * &b.select(&indices));
            acc1 = acc1 + &(&digit * &k.select(&indices));
        }

        let c0 = &a.parts[0] + &acc0.divide_round_by_last();
        let c1 = &a.parts[1] + &acc1.divide_round_by_last();
        Ok(Ciphertext {
            parts: vec![c0, c1],
            level: a.level,
            scale: a.scale,
        })
    }

    /// Divides by the last active prime and drops it.
    pub fn rescale(&self, a: Ciphertext) -> Result<Ciphertext> {
        let dropped = self.chain.dropped_prime(a.level)?;
        Ok(Ciphertext {
            parts: a.parts.iter().map(RnsPolynomial::divide_round_by_last).collect(),
            level: a.level + 1,
            scale: a.scale / dropped as f64,
        })
    }

    /// Drops primes down to `level`; value and scale unchanged.
    pub fn mod_switch(&self, a: Ciphertext, level: usize) -> Result<Ciphertext> {
        let count = self.switch_target(a.level, level)?;
        Ok(Ciphertext {
            parts: a.parts.iter().map(|p| p.truncate(count)).collect(),
            level,
            scale: a.scale,
        })
    }

    /// Plaintext counterpart of [`CkksAlgebra::mod_switch`].
    pub fn mod_switch_plain(&self, a: Plaintext, level: usize) -> Result<Plaintext> {
        let count = self.switch_target(a.level, level)?;
        Ok(Plaintext {
            poly: a.poly.truncate(count),
            level,
            scale: a.scale,
        })
    }

    fn switch_target(&self, from: usize, to: usize) -> Result<usize> {
        if to < from {
            return Err(Error::LevelRegression { from, to });
        }
        Ok(self.chain.moduli_at(to)?.len())
    }
}

fn same_level(left: usize, right: usize) -> Result<()> {
    if left != right {
        return Err(Error::LevelMismatch { left, right });
    }
    Ok(())
}

fn same_scale(left: f64, right: f64) -> Result<()> {
    if (left - right).abs() > SCALE_TOLERANCE * left.abs().max(right.abs()) {
        return Err(Error::ScaleMismatch { left, right });
    }
    Ok(())
}

fn canonical(a: &Ciphertext) -> Result<()> {
    if a.size() != 2 {
        return Err(Error::NotRelinearized(a.size()));
    }
    Ok(())
}
