//! Ring elements of Z_Q[X]/(X^N + 1) in residue number system form.

use std::ops::{Add, Mul, Neg, Sub};

use itertools::izip;
use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::ntt::{self, add_mod, mod_inv, mul_mod, reduce_signed, sub_mod};

/// `residues[j][k]` is coefficient `k` reduced modulo `moduli[j]`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RnsPolynomial {
    /// One coefficient vector per modulus.
    pub residues: Vec<Vec<u64>>,
    /// The primes, in residue order.
    pub moduli: Vec<u64>,
}

impl RnsPolynomial {
    /// Zero polynomial of ring degree `degree`.
    pub fn zero(moduli: &[u64], degree: usize) -> Self {
        assert!(degree > 0, "degree must be positive");
        Self {
            residues: vec![vec![0; degree]; moduli.len()],
            moduli: moduli.to_vec(),
        }
    }

    /// Reduce signed integer coefficients into every modulus.
    pub fn from_signed(coeffs: &[i128], moduli: &[u64]) -> Self {
        let residues = moduli
            .iter()
            .map(|&q| coeffs.iter().map(|&c| reduce_signed(c, q)).collect())
            .collect();
        Self {
            residues,
            moduli: moduli.to_vec(),
        }
    }

    /// Uniformly random element.
    pub fn random<R: Rng + ?Sized>(moduli: &[u64], degree: usize, rng: &mut R) -> Self {
        let residues = moduli
            .iter()
            .map(|&q| (0..degree).map(|_| rng.gen_range(0..q)).collect())
            .collect();
        Self {
            residues,
            moduli: moduli.to_vec(),
        }
    }

    /// Coefficients drawn uniformly from {-1, 0, 1}.
    pub fn ternary<R: Rng + ?Sized>(moduli: &[u64], degree: usize, rng: &mut R) -> Self {
        let coeffs: Vec<i128> = (0..degree).map(|_| rng.gen_range(-1..=1)).collect();
        Self::from_signed(&coeffs, moduli)
    }

    /// Rounded Gaussian coefficients with standard deviation `sigma`.
    pub fn gaussian<R: Rng + ?Sized>(
        moduli: &[u64],
        degree: usize,
        sigma: f64,
        rng: &mut R,
    ) -> Self {
        let coeffs: Vec<i128> = match Normal::new(0.0, sigma) {
            Ok(normal) => (0..degree)
                .map(|_| normal.sample(rng).round() as i128)
                .collect(),
            // sigma == 0 or NaN: noiseless
            Err(_) => vec![0; degree],
        };
        Self::from_signed(&coeffs, moduli)
    }

    /// Lift residues known modulo `source` onto `moduli`, centering them first.
    pub fn lift(values: &[u64], source: u64, moduli: &[u64]) -> Self {
        let half = source / 2;
        let coeffs: Vec<i128> = values
            .iter()
            .map(|&v| {
                if v > half {
                    v as i128 - source as i128
                } else {
                    v as i128
                }
            })
            .collect();
        Self::from_signed(&coeffs, moduli)
    }

    /// Ring degree N.
    pub fn degree(&self) -> usize {
        self.residues.first().map_or(0, Vec::len)
    }

    /// Keep only the residues at `indices`, in that order.
    pub fn select(&self, indices: &[usize]) -> Self {
        Self {
            residues: indices.iter().map(|&i| self.residues[i].clone()).collect(),
            moduli: indices.iter().map(|&i| self.moduli[i]).collect(),
        }
    }

    /// Keep the first `count` residues; the value is unchanged modulo the
    /// smaller product of primes.
    pub fn truncate(&self, count: usize) -> Self {
        assert!(count > 0 && count <= self.moduli.len(), "invalid modulus count");
        Self {
            residues: self.residues[..count].to_vec(),
            moduli: self.moduli[..count].to_vec(),
        }
    }

    /// Divide by the last modulus with rounding and drop it.
    ///
    /// Computes `(c - [c]_q) / q` where `[c]_q` is the centered residue of the
    /// last prime, which is exact integer division of a multiple of `q`.
    pub fn divide_round_by_last(&self) -> Self {
        let count = self.moduli.len();
        assert!(count > 1, "cannot drop the only modulus");
        let q_last = self.moduli[count - 1];
        let half = q_last / 2;
        let last = &self.residues[count - 1];

        let residues = self.residues[..count - 1]
            .iter()
            .zip(&self.moduli[..count - 1])
            .map(|(res, &q)| {
                let inv = mod_inv(q_last % q, q);
                res.iter()
                    .zip(last)
                    .map(|(&c, &r)| {
                        let centered = if r > half {
                            r as i128 - q_last as i128
                        } else {
                            r as i128
                        };
                        mul_mod(sub_mod(c, reduce_signed(centered, q), q), inv, q)
                    })
                    .collect()
            })
            .collect();
        Self {
            residues,
            moduli: self.moduli[..count - 1].to_vec(),
        }
    }

    /// Multiply every coefficient by a small signed constant.
    pub fn scalar_mul(&self, scalar: i128) -> Self {
        let residues = self
            .residues
            .iter()
            .zip(&self.moduli)
            .map(|(res, &q)| {
                let s = reduce_signed(scalar, q);
                res.iter().map(|&c| mul_mod(c, s, q)).collect()
            })
            .collect();
        Self {
            residues,
            moduli: self.moduli.clone(),
        }
    }

    /// Centered integer coefficients, reconstructed from at most the first two
    /// residues. Exact whenever every coefficient lies below half the product
    /// of those primes.
    pub fn centered_coefficients(&self) -> Vec<i128> {
        let q0 = self.moduli[0] as u128;
        match self.moduli.len() {
            1 => self.residues[0]
                .iter()
                .map(|&r| center(r as u128, q0))
                .collect(),
            _ => {
                let q1 = self.moduli[1];
                let q0_inv = mod_inv(self.moduli[0] % q1, q1) as u128;
                let big = q0 * q1 as u128;
                self.residues[0]
                    .iter()
                    .zip(&self.residues[1])
                    .map(|(&r0, &r1)| {
                        // Garner: x = r0 + q0 * ((r1 - r0) * q0^-1 mod q1)
                        let diff = sub_mod(r1, r0 % q1, q1) as u128;
                        let t = diff * q0_inv % q1 as u128;
                        center(r0 as u128 + q0 * t, big)
                    })
                    .collect()
            }
        }
    }

    fn assert_compatible(&self, rhs: &Self) {
        assert_eq!(self.moduli, rhs.moduli, "moduli must match");
        assert_eq!(self.degree(), rhs.degree(), "degrees must match");
    }
}

fn center(x: u128, modu: u128) -> i128 {
    if x > modu / 2 {
        x as i128 - modu as i128
    } else {
        x as i128
    }
}

impl Add for &RnsPolynomial {
    type Output = RnsPolynomial;
    fn add(self, rhs: Self) -> Self::Output {
        self.assert_compatible(rhs);
        let residues = izip!(&self.residues, &rhs.residues, &self.moduli)
            .map(|(a, b, &q)| a.iter().zip(b).map(|(&x, &y)| add_mod(x, y, q)).collect())
            .collect();
        RnsPolynomial {
            residues,
            moduli: self.moduli.clone(),
        }
    }
}

impl Add for RnsPolynomial {
    type Output = RnsPolynomial;
    fn add(self, rhs: Self) -> Self::Output {
        &self + &rhs
    }
}

impl Add<&RnsPolynomial> for RnsPolynomial {
    type Output = RnsPolynomial;
    fn add(self, rhs: &RnsPolynomial) -> Self::Output {
        &self + rhs
    }
}

impl Sub for &RnsPolynomial {
    type Output = RnsPolynomial;
    fn sub(self, rhs: Self) -> Self::Output {
        self.assert_compatible(rhs);
        let residues = izip!(&self.residues, &rhs.residues, &self.moduli)
            .map(|(a, b, &q)| a.iter().zip(b).map(|(&x, &y)| sub_mod(x, y, q)).collect())
            .collect();
        RnsPolynomial {
            residues,
            moduli: self.moduli.clone(),
        }
    }
}

impl Sub for RnsPolynomial {
    type Output = RnsPolynomial;
    fn sub(self, rhs: Self) -> Self::Output {
        &self - &rhs
    }
}

impl Sub<&RnsPolynomial> for RnsPolynomial {
    type Output = RnsPolynomial;
    fn sub(self, rhs: &RnsPolynomial) -> Self::Output {
        &self - rhs
    }
}

impl Neg for &RnsPolynomial {
    type Output = RnsPolynomial;
    fn neg(self) -> Self::Output {
        let residues = self
            .residues
            .iter()
            .zip(&self.moduli)
            .map(|(res, &q)| res.iter().map(|&x| sub_mod(0, x, q)).collect())
            .collect();
        RnsPolynomial {
            residues,
            moduli: self.moduli.clone(),
        }
    }
}

impl Neg for RnsPolynomial {
    type Output = RnsPolynomial;
    fn neg(self) -> Self::Output {
        -&self
    }
}

impl<'a, 'b> Mul<&'b RnsPolynomial> for &'a RnsPolynomial {
    type Output = RnsPolynomial;

    /// Negacyclic product, one NTT convolution per prime.
    fn mul(self, rhs: &'b RnsPolynomial) -> RnsPolynomial {
        self.assert_compatible(rhs);
        let residues = izip!(&self.residues, &rhs.residues, &self.moduli)
            .map(|(a, b, &q)| ntt::negacyclic_mul(a, b, q))
            .collect();
        RnsPolynomial {
            residues,
            moduli: self.moduli.clone(),
        }
    }
}

impl<'a> Mul<&'a RnsPolynomial> for RnsPolynomial {
    type Output = RnsPolynomial;
    fn mul(self, rhs: &'a RnsPolynomial) -> RnsPolynomial {
        (&self).mul(rhs)
    }
}

impl Mul for RnsPolynomial {
    type Output = RnsPolynomial;
    fn mul(self, rhs: RnsPolynomial) -> RnsPolynomial {
        (&self).mul(&rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const MODULI: [u64; 2] = [7681, 12289];

    #[test]
    fn test_basic_ops() {
        let p1 = RnsPolynomial::from_signed(&[1, 2, 3, 0], &MODULI);
        let p2 = RnsPolynomial::from_signed(&[4, -5, 6, 0], &MODULI);

        let sum = &p1 + &p2;
        assert_eq!(sum.centered_coefficients(), vec![5, -3, 9, 0]);

        let diff = &p1 - &p2;
        assert_eq!(diff.centered_coefficients(), vec![-3, 7, -3, 0]);

        let neg = -&p1;
        assert_eq!(neg.centered_coefficients(), vec![-1, -2, -3, 0]);
    }

    #[test]
    fn test_mul_wraps_negacyclically() {
        // (1 + X^3) * X = X + X^4 = X - 1 in degree 4
        let p1 = RnsPolynomial::from_signed(&[1, 0, 0, 1], &MODULI);
        let p2 = RnsPolynomial::from_signed(&[0, 1, 0, 0], &MODULI);
        let prod = &p1 * &p2;
        assert_eq!(prod.centered_coefficients(), vec![-1, 1, 0, 0]);
    }

    #[test]
    fn test_centered_coefficients_two_primes() {
        let big = 7681i128 * 12289 / 2 - 1;
        let p = RnsPolynomial::from_signed(&[big, -big, 0, 17], &MODULI);
        assert_eq!(p.centered_coefficients(), vec![big, -big, 0, 17]);
    }

    #[test]
    fn test_divide_round_by_last() {
        let q_last = MODULI[1] as i128;
        let p = RnsPolynomial::from_signed(
            &[5 * q_last + 3, -7 * q_last - 4, q_last / 2 + 1, 0],
            &MODULI,
        );
        let dropped = p.divide_round_by_last();
        assert_eq!(dropped.moduli, vec![MODULI[0]]);
        assert_eq!(dropped.centered_coefficients(), vec![5, -7, 1, 0]);
    }

    #[test]
    fn test_truncate_and_select() {
        let p = RnsPolynomial::from_signed(&[1, -1, 2, -2], &MODULI);
        assert_eq!(p.truncate(1).moduli, vec![MODULI[0]]);
        let swapped = p.select(&[1, 0]);
        assert_eq!(swapped.moduli, vec![MODULI[1], MODULI[0]]);
        assert_eq!(swapped.residues[0], p.residues[1]);
    }

    #[test]
    fn test_sampling_ranges() {
        let mut rng = StdRng::seed_from_u64(7);
        let t = RnsPolynomial::ternary(&MODULI, 16, &mut rng);
        assert!(t.centered_coefficients().iter().all(|c| c.abs() <= 1));

        let u = RnsPolynomial::random(&MODULI, 16, &mut rng);
        for (res, &q) in u.residues.iter().zip(&MODULI) {
            assert!(res.iter().all(|&x| x < q));
        }

        let g = RnsPolynomial::gaussian(&MODULI, 16, 3.2, &mut rng);
        assert!(g.centered_coefficients().iter().all(|c| c.abs() < 40));
    }

    #[test]
    fn test_lift_centers_values() {
        let lifted = RnsPolynomial::lift(&[1, 7680, 0, 3], 7681, &[12289]);
        assert_eq!(lifted.centered_coefficients(), vec![1, -1, 0, 3]);
    }

    #[test]
    fn test_scalar_mul() {
        let p = RnsPolynomial::from_signed(&[1, -2, 3, 0], &MODULI);
        assert_eq!(p.scalar_mul(-3).centered_coefficients(), vec![-3, 6, -9, 0]);
    }
}
