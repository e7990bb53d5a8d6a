//! Key generation, encryption and decryption; `Ckks` is the in-tree
//! implementation of [`LeveledScheme`].

use rand::Rng;
use tracing::debug;

use crate::algebra::CkksAlgebra;
use crate::cipher::{Ciphertext, Plaintext};
use crate::encoder::Encoder;
use crate::error::Result;
use crate::leveled::LeveledScheme;
use crate::modulus_chain::{CkksParams, ModulusChain};
use crate::polynomial::RnsPolynomial;

/// Main state object: parameters, codec, keys and evaluator.
pub struct Ckks {
    params: CkksParams,
    chain: ModulusChain,
    encoder: Encoder,
    /// Ternary secret over data primes + special prime.
    secret_key: RnsPolynomial,
    /// (b, a) with b = -a·s + e at the top of the chain.
    public_key: (RnsPolynomial, RnsPolynomial),
    algebra: CkksAlgebra,
}

impl Ckks {
    /// Chain, secret key, public key and relinearization key for `params`.
    pub fn generate_keys<R: Rng + ?Sized>(params: CkksParams, rng: &mut R) -> Result<Self> {
        let chain = ModulusChain::generate(&params)?;
        let degree = chain.degree();
        let secret_key = RnsPolynomial::ternary(&chain.key_moduli(), degree, rng);

        let top = chain.moduli_at(0)?;
        let a = RnsPolynomial::random(top, degree, rng);
        let e = RnsPolynomial::gaussian(top, degree, params.error_std_dev, rng);
        let b = &e - &(&a * &secret_key.truncate(top.len()));

        let algebra = CkksAlgebra::new(&chain, &secret_key, params.error_std_dev, rng);
        debug!(degree, "generated secret, public and relinearization keys");

        Ok(Self {
            encoder: Encoder::new(degree),
            params,
            chain,
            secret_key,
            public_key: (b, a),
            algebra,
        })
    }

    /// Parameters the keys were generated for.
    pub fn params(&self) -> &CkksParams {
        &self.params
    }

    /// Modulus chain in use.
    pub fn chain(&self) -> &ModulusChain {
        &self.chain
    }
}

impl LeveledScheme for Ckks {
    type Ciphertext = Ciphertext;
    type Plaintext = Plaintext;

    fn slot_count(&self) -> usize {
        self.encoder.slot_count()
    }

    fn chain_length(&self) -> usize {
        self.chain.len()
    }

    fn nominal_scale(&self) -> f64 {
        self.params.scale()
    }

    fn encode(&self, values: &[f64], scale: f64) -> Result<Plaintext> {
        self.encoder
            .encode(values, scale, self.chain.moduli_at(0)?, 0)
    }

    fn decode(&self, plain: &Plaintext) -> Vec<f64> {
        self.encoder.decode(plain)
    }

    /// (v·b + e₀ + m, v·a + e₁) with v ternary.
    fn encrypt<R: Rng + ?Sized>(&self, plain: &Plaintext, rng: &mut R) -> Result<Ciphertext> {
        let moduli = self.chain.moduli_at(plain.level)?;
        let count = moduli.len();
        let degree = self.chain.degree();
        let sigma = self.params.error_std_dev;

        let (b, a) = &self.public_key;
        let v = RnsPolynomial::ternary(moduli, degree, rng);
        let e0 = RnsPolynomial::gaussian(moduli, degree, sigma, rng);
        let e1 = RnsPolynomial::gaussian(moduli, degree, sigma, rng);

        let c0 = &(&(&v * &b.truncate(count)) + &e0) + &plain.poly;
        let c1 = &(&v * &a.truncate(count)) + &e1;
        Ok(Ciphertext {
            parts: vec![c0, c1],
            level: plain.level,
            scale: plain.scale,
        })
    }

    /// c₀ + c₁·s (+ c₂·s²).
    fn decrypt(&self, cipher: &Ciphertext) -> Result<Plaintext> {
        let count = self.chain.moduli_at(cipher.level)?.len();
        let s = self.secret_key.truncate(count);
        let mut acc = cipher.parts[0].clone();
        let mut power = s.clone();
        for part in &cipher.parts[1..] {
            acc = acc + &(part * &power);
            power = &power * &s;
        }
        Ok(Plaintext {
            poly: acc,
            level: cipher.level,
            scale: cipher.scale,
        })
    }

    fn add(&self, a: &Ciphertext, b: &Ciphertext) -> Result<Ciphertext> {
        self.algebra.add(a, b)
    }

    fn add_plain(&self, a: &Ciphertext, b: &Plaintext) -> Result<Ciphertext> {
        self.algebra.add_plain(a, b)
    }

    fn negate(&self, a: &Ciphertext) -> Ciphertext {
        self.algebra.negate(a)
    }

    fn multiply(&self, a: &Ciphertext, b: &Ciphertext) -> Result<Ciphertext> {
        self.algebra.mult(a, b)
    }

    fn multiply_plain(&self, a: &Ciphertext, b: &Plaintext) -> Result<Ciphertext> {
        self.algebra.mult_plain(a, b)
    }

    fn square(&self, a: &Ciphertext) -> Result<Ciphertext> {
        self.algebra.square(a)
    }

    fn relinearize(&self, a: Ciphertext) -> Result<Ciphertext> {
        self.algebra.relinearize(a)
    }

    fn rescale(&self, a: Ciphertext) -> Result<Ciphertext> {
        self.algebra.rescale(a)
    }

    fn set_scale(&self, mut a: Ciphertext, scale: f64) -> Ciphertext {
        a.scale = scale;
        a
    }

    fn mod_switch(&self, a: Ciphertext, level: usize) -> Result<Ciphertext> {
        self.algebra.mod_switch(a, level)
    }

    fn mod_switch_plain(&self, a: Plaintext, level: usize) -> Result<Plaintext> {
        self.algebra.mod_switch_plain(a, level)
    }
}
