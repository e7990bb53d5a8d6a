//! Fixed-point codec: real vectors <-> plaintext polynomials through the
//! canonical embedding.
//!
//! Slot `j` holds the evaluation of the message polynomial at `ζ^(5^j)`,
//! `ζ = exp(iπ/N)`. Only real vectors are supported, so encoding reduces to
//! `m_k = (2/N) Σ_j z_j cos(π (5^j k mod 2N) / N)`.

use std::f64::consts::PI;

use crate::cipher::Plaintext;
use crate::error::{Error, Result};
use crate::polynomial::RnsPolynomial;

/// Largest encoded coefficient accepted, well inside the i128 range used to
/// reduce into the RNS basis.
const MAX_COEFFICIENT: f64 = 1e36;

/// Precomputed cosine and rotation tables for one ring degree.
#[derive(Clone, Debug)]
pub struct Encoder {
    degree: usize,
    /// cos(π t / N) for t in 0..2N
    cosines: Vec<f64>,
    /// 5^j mod 2N for j in 0..N/2
    rotation_group: Vec<usize>,
}

impl Encoder {
    /// Tables for ring degree `degree`.
    pub fn new(degree: usize) -> Self {
        let two_n = 2 * degree;
        let cosines = (0..two_n)
            .map(|t| (PI * t as f64 / degree as f64).cos())
            .collect();
        let mut rotation_group = Vec::with_capacity(degree / 2);
        let mut g = 1usize;
        for _ in 0..degree / 2 {
            rotation_group.push(g);
            g = g * 5 % two_n;
        }
        Self {
            degree,
            cosines,
            rotation_group,
        }
    }

    /// N / 2.
    pub fn slot_count(&self) -> usize {
        self.degree / 2
    }

    /// Encode exactly `slot_count()` reals at `scale` over `moduli`.
    pub fn encode(
        &self,
        values: &[f64],
        scale: f64,
        moduli: &[u64],
        level: usize,
    ) -> Result<Plaintext> {
        if values.len() != self.slot_count() {
            return Err(Error::SlotCountMismatch {
                expected: self.slot_count(),
                got: values.len(),
            });
        }
        let two_n = 2 * self.degree;
        let norm = 2.0 / self.degree as f64;

        let coeffs = (0..self.degree)
            .map(|k| {
                let m_k: f64 = values
                    .iter()
                    .zip(&self.rotation_group)
                    .map(|(&z, &g)| z * self.cosines[g * k % two_n])
                    .sum();
                let scaled = (m_k * norm * scale).round();
                if !scaled.is_finite() || scaled.abs() > MAX_COEFFICIENT {
                    return Err(Error::EncodingOverflow(scaled));
                }
                Ok(scaled as i128)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Plaintext {
            poly: RnsPolynomial::from_signed(&coeffs, moduli),
            level,
            scale,
        })
    }

    /// Decode a plaintext back into `slot_count()` approximate reals.
    pub fn decode(&self, plain: &Plaintext) -> Vec<f64> {
        let two_n = 2 * self.degree;
        let coeffs: Vec<f64> = plain
            .poly
            .centered_coefficients()
            .into_iter()
            .map(|c| c as f64 / plain.scale)
            .collect();
        self.rotation_group
            .iter()
            .map(|&g| {
                coeffs
                    .iter()
                    .enumerate()
                    .map(|(k, &m)| m * self.cosines[g * k % two_n])
                    .sum()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 2^61 - 1 and 2^31 - 1
    const MODULI: [u64; 2] = [2_305_843_009_213_693_951, 2_147_483_647];

    fn assert_close(got: &[f64], want: &[f64], tol: f64) {
        for (i, (g, w)) in got.iter().zip(want).enumerate() {
            assert!((g - w).abs() < tol, "slot {i}: got {g}, want {w}");
        }
    }

    #[test]
    fn test_encode_decode_constant() {
        let enc = Encoder::new(16);
        let values = vec![2.0; 8];
        let pt = enc.encode(&values, 2f64.powi(30), &MODULI, 0).unwrap();
        // a constant vector is a constant polynomial
        let coeffs = pt.poly.centered_coefficients();
        assert_eq!(coeffs[0], 2 * (1 << 30));
        assert!(coeffs[1..].iter().all(|&c| c == 0));
        assert_close(&enc.decode(&pt), &values, 1e-6);
    }

    #[test]
    fn test_encode_decode_varied() {
        let enc = Encoder::new(32);
        let values: Vec<f64> = (0..16).map(|i| i as f64 * 0.75 - 3.0).collect();
        let pt = enc.encode(&values, 2f64.powi(40), &MODULI, 0).unwrap();
        assert_close(&enc.decode(&pt), &values, 1e-6);
    }

    #[test]
    fn test_slot_count_mismatch() {
        let enc = Encoder::new(16);
        let err = enc.encode(&[1.0; 3], 1e6, &MODULI, 0).unwrap_err();
        assert!(matches!(
            err,
            Error::SlotCountMismatch {
                expected: 8,
                got: 3
            }
        ));
    }

    #[test]
    fn test_encoding_overflow() {
        let enc = Encoder::new(16);
        let err = enc.encode(&[f64::INFINITY; 8], 1e6, &MODULI, 0).unwrap_err();
        assert!(matches!(err, Error::EncodingOverflow(_)));
    }
}
