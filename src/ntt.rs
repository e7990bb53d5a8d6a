//! Modular arithmetic and negacyclic NTT over word-sized primes.
//!
//! All moduli are odd primes below 2^62 so that products fit in `u128`.
//! Twiddle tables live in [`NttPlan`]s shared per `(degree, prime)`.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

/// `a * b mod modu`.
#[inline]
pub fn mul_mod(a: u64, b: u64, modu: u64) -> u64 {
    ((a as u128 * b as u128) % modu as u128) as u64
}

/// `a + b mod modu` for reduced inputs.
#[inline]
pub fn add_mod(a: u64, b: u64, modu: u64) -> u64 {
    let s = a + b;
    if s >= modu {
        s - modu
    } else {
        s
    }
}

/// `a - b mod modu` for reduced inputs.
#[inline]
pub fn sub_mod(a: u64, b: u64, modu: u64) -> u64 {
    if a >= b {
        a - b
    } else {
        a + modu - b
    }
}

/// `base^exp mod modu` by square-and-multiply.
#[inline]
pub fn mod_pow(mut base: u64, mut exp: u64, modu: u64) -> u64 {
    let mut res = 1u64 % modu;
    base %= modu;
    while exp > 0 {
        if exp & 1 == 1 {
            res = mul_mod(res, base, modu);
        }
        base = mul_mod(base, base, modu);
        exp >>= 1;
    }
    res
}

/// Inverse modulo a prime (Fermat).
#[inline]
pub fn mod_inv(x: u64, modu: u64) -> u64 {
    mod_pow(x, modu - 2, modu)
}

/// Reduce a signed value into `[0, modu)`.
#[inline]
pub fn reduce_signed(value: i128, modu: u64) -> u64 {
    value.rem_euclid(modu as i128) as u64
}

/// Deterministic Miller-Rabin for every `u64`.
pub fn is_prime(n: u64) -> bool {
    const WITNESSES: [u64; 12] = [2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37];
    if n < 2 {
        return false;
    }
    for &p in &WITNESSES {
        if n % p == 0 {
            return n == p;
        }
    }
    let mut d = n - 1;
    let mut r = 0;
    while d % 2 == 0 {
        d /= 2;
        r += 1;
    }
    'witness: for &a in &WITNESSES {
        let mut x = mod_pow(a, d, n);
        if x == 1 || x == n - 1 {
            continue;
        }
        for _ in 1..r {
            x = mul_mod(x, x, n);
            if x == n - 1 {
                continue 'witness;
            }
        }
        return false;
    }
    true
}

/// Primitive `order`-th root of unity modulo `modu`, `order` a power of two
/// dividing `modu - 1`.
pub fn primitive_root_of_unity(order: u64, modu: u64) -> Option<u64> {
    if order < 2 || (modu - 1) % order != 0 {
        return None;
    }
    (2..modu.min(1 << 16)).find_map(|g| {
        let candidate = mod_pow(g, (modu - 1) / order, modu);
        // order is a power of two: candidate^(order/2) == -1 pins the order exactly
        (mod_pow(candidate, order / 2, modu) == modu - 1).then_some(candidate)
    })
}

fn bit_reverse(vec: &mut [u64]) {
    let n = vec.len();
    let mut j = 0usize;
    for i in 1..n {
        let mut bit = n >> 1;
        while j & bit != 0 {
            j ^= bit;
            bit >>= 1;
        }
        j ^= bit;
        if i < j {
            vec.swap(i, j);
        }
    }
}

/// Butterfly twiddles for every stage, stage `len` taking `len / 2` entries.
fn stage_twiddles(omega: u64, n: usize, modu: u64) -> Vec<u64> {
    let mut table = Vec::with_capacity(n);
    let mut len = 2;
    while len <= n {
        let w_len = mod_pow(omega, (n / len) as u64, modu);
        let mut w = 1u64;
        for _ in 0..len / 2 {
            table.push(w);
            w = mul_mod(w, w_len, modu);
        }
        len <<= 1;
    }
    table
}

/// Everything a negacyclic product modulo one prime needs, computed once.
#[derive(Debug)]
pub struct NttPlan {
    modulus: u64,
    size: usize,
    /// psi^i
    twist: Vec<u64>,
    /// n^-1 psi^-i
    untwist: Vec<u64>,
    forward: Vec<u64>,
    inverse: Vec<u64>,
}

type PlanMap = RwLock<HashMap<(usize, u64), Arc<NttPlan>>>;
static PLANS: OnceLock<PlanMap> = OnceLock::new();

impl NttPlan {
    /// Plan for `Z_modu[X]/(X^size + 1)`. `None` unless `size` is a power of
    /// two and `modu` is a prime congruent to 1 modulo `2 * size`.
    pub fn new(size: usize, modu: u64) -> Option<Self> {
        if !size.is_power_of_two() || !is_prime(modu) {
            return None;
        }
        let psi = primitive_root_of_unity(2 * size as u64, modu)?;
        let psi_inv = mod_inv(psi, modu);
        let omega = mul_mod(psi, psi, modu);
        let n_inv = mod_inv(size as u64 % modu, modu);

        let powers = |start: u64, step: u64| {
            std::iter::successors(Some(start), move |&w| Some(mul_mod(w, step, modu)))
                .take(size)
                .collect::<Vec<_>>()
        };
        Some(Self {
            modulus: modu,
            size,
            twist: powers(1, psi),
            untwist: powers(n_inv, psi_inv),
            forward: stage_twiddles(omega, size, modu),
            inverse: stage_twiddles(mod_inv(omega, modu), size, modu),
        })
    }

    /// Shared plan for `(size, modu)`, built on first use.
    pub fn get(size: usize, modu: u64) -> Option<Arc<Self>> {
        let plans = PLANS.get_or_init(|| RwLock::new(HashMap::new()));
        let cached = plans
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(size, modu))
            .cloned();
        if let Some(plan) = cached {
            return Some(plan);
        }
        let plan = Arc::new(Self::new(size, modu)?);
        let mut plans = plans.write().unwrap_or_else(PoisonError::into_inner);
        Some(plans.entry((size, modu)).or_insert(plan).clone())
    }

    /// The prime this plan reduces by.
    pub fn modulus(&self) -> u64 {
        self.modulus
    }

    /// Ring degree N.
    pub fn size(&self) -> usize {
        self.size
    }

    /// In-place cyclic transform driven by a precomputed twiddle table.
    fn transform(&self, a: &mut [u64], twiddles: &[u64]) {
        let (n, modu) = (self.size, self.modulus);
        bit_reverse(a);
        let mut offset = 0;
        let mut len = 2;
        while len <= n {
            let half = len / 2;
            let stage = &twiddles[offset..offset + half];
            for i in (0..n).step_by(len) {
                for (j, &w) in stage.iter().enumerate() {
                    let u = a[i + j];
                    let v = mul_mod(a[i + j + half], w, modu);
                    a[i + j] = add_mod(u, v, modu);
                    a[i + j + half] = sub_mod(u, v, modu);
                }
            }
            offset += half;
            len <<= 1;
        }
    }

    /// Product of `a` and `b` in `Z_modu[X]/(X^n + 1)`.
    pub fn multiply(&self, a: &[u64], b: &[u64]) -> Vec<u64> {
        assert_eq!(a.len(), self.size, "operand length differs from plan");
        assert_eq!(b.len(), self.size, "operand length differs from plan");
        let modu = self.modulus;

        // twist by psi^i so the cyclic transform computes the negacyclic product
        let twist = |x: &[u64]| -> Vec<u64> {
            x.iter()
                .zip(&self.twist)
                .map(|(&c, &w)| mul_mod(c, w, modu))
                .collect()
        };
        let mut fa = twist(a);
        let mut fb = twist(b);
        self.transform(&mut fa, &self.forward);
        self.transform(&mut fb, &self.forward);
        for (x, y) in fa.iter_mut().zip(&fb) {
            *x = mul_mod(*x, *y, modu);
        }
        self.transform(&mut fa, &self.inverse);
        for (x, &w) in fa.iter_mut().zip(&self.untwist) {
            *x = mul_mod(*x, w, modu);
        }
        fa
    }
}

/// Product of `a` and `b` in `Z_modu[X]/(X^n + 1)` through the shared plan.
///
/// Both inputs must have the same power-of-two length `n` and `modu` must be
/// a prime congruent to 1 modulo `2n`.
pub fn negacyclic_mul(a: &[u64], b: &[u64], modu: u64) -> Vec<u64> {
    let n = a.len();
    assert_eq!(n, b.len(), "operand lengths differ");
    if n == 1 {
        return vec![mul_mod(a[0], b[0], modu)];
    }
    let plan = NttPlan::get(n, modu).expect("modulus is not NTT-friendly for this ring degree");
    plan.multiply(a, b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schoolbook(a: &[u64], b: &[u64], modu: u64) -> Vec<u64> {
        let n = a.len();
        let mut out = vec![0u64; n];
        for i in 0..n {
            for j in 0..n {
                let prod = mul_mod(a[i], b[j], modu);
                let k = i + j;
                if k < n {
                    out[k] = add_mod(out[k], prod, modu);
                } else {
                    out[k - n] = sub_mod(out[k - n], prod, modu);
                }
            }
        }
        out
    }

    #[test]
    fn test_is_prime() {
        assert!(is_prime(2));
        assert!(is_prime(97));
        assert!(is_prime(7681));
        assert!(is_prime((1 << 61) - 1));
        assert!(!is_prime(1));
        assert!(!is_prime(561)); // Carmichael
        assert!(!is_prime(1 << 40));
    }

    #[test]
    fn test_root_of_unity_order() {
        let q = 97; // 96 = 2^5 * 3
        let psi = primitive_root_of_unity(32, q).unwrap();
        assert_eq!(mod_pow(psi, 32, q), 1);
        assert_eq!(mod_pow(psi, 16, q), q - 1);
        assert!(primitive_root_of_unity(64, q).is_none());
    }

    #[test]
    fn test_negacyclic_matches_schoolbook() {
        let q = 7681; // 7680 = 2^9 * 15
        let a: Vec<u64> = (0..16).map(|i| (i * 37 + 5) % q).collect();
        let b: Vec<u64> = (0..16).map(|i| (i * i * 11 + 3) % q).collect();
        assert_eq!(negacyclic_mul(&a, &b, q), schoolbook(&a, &b, q));
    }

    #[test]
    fn test_x_to_the_n_is_minus_one() {
        let q = 7681;
        // X^7 * X = X^8 = -1 in Z_q[X]/(X^8+1)
        let mut a = vec![0u64; 8];
        a[7] = 1;
        let mut b = vec![0u64; 8];
        b[1] = 1;
        let prod = negacyclic_mul(&a, &b, q);
        assert_eq!(prod[0], q - 1);
        assert!(prod[1..].iter().all(|&c| c == 0));
    }

    #[test]
    fn test_plan_is_built_once_per_prime() {
        let first = NttPlan::get(16, 7681).unwrap();
        let second = NttPlan::get(16, 7681).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!((first.size(), first.modulus()), (16, 7681));

        let other_degree = NttPlan::get(8, 7681).unwrap();
        assert!(!Arc::ptr_eq(&first, &other_degree));
    }

    #[test]
    fn test_plan_rejects_unfriendly_modulus() {
        // 97 - 1 is not divisible by 2 * 64
        assert!(NttPlan::new(64, 97).is_none());
        assert!(NttPlan::new(16, 7680).is_none());
        assert!(NttPlan::get(12, 7681).is_none());
    }

    #[test]
    fn test_plan_multiply_matches_schoolbook() {
        let q = 12289; // 12288 = 2^12 * 3
        let plan = NttPlan::new(64, q).unwrap();
        let a: Vec<u64> = (0..64).map(|i| (i * i * 101 + 7) % q).collect();
        let b: Vec<u64> = (0..64).map(|i| (q - 1 - i * 13) % q).collect();
        assert_eq!(plan.multiply(&a, &b), schoolbook(&a, &b, q));
        // a second product through the same tables
        assert_eq!(plan.multiply(&b, &b), schoolbook(&b, &b, q));
    }

    #[test]
    fn test_reduce_signed() {
        assert_eq!(reduce_signed(-1, 17), 16);
        assert_eq!(reduce_signed(35, 17), 1);
    }
}
