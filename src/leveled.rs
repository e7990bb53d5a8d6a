//! Operation contract the division core consumes from a leveled scheme.
//!
//! Every fallible primitive reports level or scale violations instead of
//! coercing operands; aligning operands is the caller's job (see
//! [`crate::tracker::LevelTracker`]).

use rand::Rng;

use crate::cipher::Leveled;
use crate::error::Result;

/// Primitive operations of a leveled approximate scheme.
pub trait LeveledScheme {
    /// Encrypted vector.
    type Ciphertext: Leveled + Clone;
    /// Encoded, unencrypted vector.
    type Plaintext: Leveled + Clone;

    /// Number of values packed in one plaintext.
    fn slot_count(&self) -> usize;

    /// Number of primes in the data chain; the deepest level is
    /// `chain_length() - 1`.
    fn chain_length(&self) -> usize;

    /// Scale fresh encodings use and rescaled values are stamped back to.
    fn nominal_scale(&self) -> f64;

    /// Encode exactly `slot_count()` values at the top of the chain.
    fn encode(&self, values: &[f64], scale: f64) -> Result<Self::Plaintext>;

    /// Recover `slot_count()` approximate reals.
    fn decode(&self, plain: &Self::Plaintext) -> Vec<f64>;

    /// Public-key encryption at the plaintext's level.
    fn encrypt<R: Rng + ?Sized>(
        &self,
        plain: &Self::Plaintext,
        rng: &mut R,
    ) -> Result<Self::Ciphertext>;

    /// Secret-key decryption of a ciphertext of any size.
    fn decrypt(&self, cipher: &Self::Ciphertext) -> Result<Self::Plaintext>;

    /// Requires equal level and scale.
    fn add(&self, a: &Self::Ciphertext, b: &Self::Ciphertext) -> Result<Self::Ciphertext>;

    /// Requires equal level and scale.
    fn add_plain(&self, a: &Self::Ciphertext, b: &Self::Plaintext) -> Result<Self::Ciphertext>;

    /// Negation; level and scale unchanged.
    fn negate(&self, a: &Self::Ciphertext) -> Self::Ciphertext;

    /// Requires equal level and canonical size; the result needs relinearizing.
    fn multiply(&self, a: &Self::Ciphertext, b: &Self::Ciphertext) -> Result<Self::Ciphertext>;

    /// Requires equal level.
    fn multiply_plain(
        &self,
        a: &Self::Ciphertext,
        b: &Self::Plaintext,
    ) -> Result<Self::Ciphertext>;

    /// `multiply(a, a)`.
    fn square(&self, a: &Self::Ciphertext) -> Result<Self::Ciphertext> {
        self.multiply(a, a)
    }

    /// Bring a size-3 product back to size 2; size 2 passes through.
    fn relinearize(&self, a: Self::Ciphertext) -> Result<Self::Ciphertext>;

    /// Drop one prime: level + 1, scale divided by that prime.
    fn rescale(&self, a: Self::Ciphertext) -> Result<Self::Ciphertext>;

    /// Overwrite the recorded scale, absorbing the drift left by a rescale.
    fn set_scale(&self, a: Self::Ciphertext, scale: f64) -> Self::Ciphertext;

    /// Move to a deeper `level` without touching the scale.
    fn mod_switch(&self, a: Self::Ciphertext, level: usize) -> Result<Self::Ciphertext>;

    /// Plaintext counterpart of `mod_switch`.
    fn mod_switch_plain(&self, a: Self::Plaintext, level: usize) -> Result<Self::Plaintext>;

    /// Chain position of `a`.
    fn current_level(&self, a: &Self::Ciphertext) -> usize {
        a.level()
    }

    /// Decrypt and decode in one step.
    fn decrypt_decode(&self, cipher: &Self::Ciphertext) -> Result<Vec<f64>> {
        Ok(self.decode(&self.decrypt(cipher)?))
    }
}
