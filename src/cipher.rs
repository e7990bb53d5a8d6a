//! CKKS ciphertext and plaintext containers.

use crate::polynomial::RnsPolynomial;

/// Chain position and fixed-point scale carried by every value.
pub trait Leveled {
    /// Primes dropped from the top of the chain so far.
    fn level(&self) -> usize;
    /// Fixed-point scale of the encoded values.
    fn scale(&self) -> f64;
}

/// (c₀, c₁[, c₂]) at a chain position and scale.
#[derive(Clone, Debug)]
pub struct Ciphertext {
    /// Decrypts as `Σ parts[i] · s^i`.
    pub parts: Vec<RnsPolynomial>,
    /// Chain position.
    pub level: usize,
    /// Fixed-point scale.
    pub scale: f64,
}

impl Ciphertext {
    /// 2 when canonical, 3 right after a ciphertext multiply.
    pub fn size(&self) -> usize {
        self.parts.len()
    }
}

impl Leveled for Ciphertext {
    fn level(&self) -> usize {
        self.level
    }

    fn scale(&self) -> f64 {
        self.scale
    }
}

/// Encoded vector; same level/scale bookkeeping as a ciphertext, no noise.
#[derive(Clone, Debug)]
pub struct Plaintext {
    /// Encoded message polynomial.
    pub poly: RnsPolynomial,
    /// Chain position.
    pub level: usize,
    /// Fixed-point scale.
    pub scale: f64,
}

impl Leveled for Plaintext {
    fn level(&self) -> usize {
        self.level
    }

    fn scale(&self) -> f64 {
        self.scale
    }
}
