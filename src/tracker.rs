//! Level/scale glue around the raw scheme primitives.
//!
//! The primitives refuse operands at different levels; the tracker switches
//! the shallower operand down first. After every multiply it relinearizes,
//! rescales and re-stamps the nominal scale, so values leaving the tracker
//! are always canonical (size 2, nominal scale).
use std::borrow::Cow;

use tracing::debug;

use crate::cipher::Leveled;
use crate::error::Result;
use crate::leveled::LeveledScheme;

/// Borrowing helper that owns no key material.
pub struct LevelTracker<'a, S: LeveledScheme> {
    scheme: &'a S,
    scale: f64,
}

impl<'a, S: LeveledScheme> LevelTracker<'a, S> {
    /// Tracker re-stamping to `scheme.nominal_scale()`.
    pub fn new(scheme: &'a S) -> Self {
        Self {
            scheme,
            scale: scheme.nominal_scale(),
        }
    }

    /// Underlying scheme.
    pub fn scheme(&self) -> &'a S {
        self.scheme
    }

    /// Scale every product is re-stamped to.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Switch `ct` down to `level`; borrowed through when already there.
    pub fn align_ciphertext<'c>(
        &self,
        ct: &'c S::Ciphertext,
        level: usize,
    ) -> Result<Cow<'c, S::Ciphertext>> {
        if ct.level() == level {
            return Ok(Cow::Borrowed(ct));
        }
        debug!(from = ct.level(), to = level, "switching ciphertext");
        Ok(Cow::Owned(self.scheme.mod_switch(ct.clone(), level)?))
    }

    /// Plaintext counterpart of [`LevelTracker::align_ciphertext`].
    pub fn align_plaintext<'c>(
        &self,
        pt: &'c S::Plaintext,
        level: usize,
    ) -> Result<Cow<'c, S::Plaintext>> {
        if pt.level() == level {
            return Ok(Cow::Borrowed(pt));
        }
        Ok(Cow::Owned(self.scheme.mod_switch_plain(pt.clone(), level)?))
    }

    /// Align both operands to the deeper level, multiply, then restore.
    pub fn multiply(&self, a: &S::Ciphertext, b: &S::Ciphertext) -> Result<S::Ciphertext> {
        let level = a.level().max(b.level());
        let a = self.align_ciphertext(a, level)?;
        let b = self.align_ciphertext(b, level)?;
        let product = self.scheme.multiply(&a, &b)?;
        self.restore(product)
    }

    /// Square, then restore.
    pub fn square(&self, a: &S::Ciphertext) -> Result<S::Ciphertext> {
        let product = self.scheme.square(a)?;
        self.restore(product)
    }

    /// ct × pt at the deeper of the two levels, then restore.
    pub fn multiply_plain(&self, a: &S::Ciphertext, b: &S::Plaintext) -> Result<S::Ciphertext> {
        let level = a.level().max(b.level());
        let a = self.align_ciphertext(a, level)?;
        let b = self.align_plaintext(b, level)?;
        let product = self.scheme.multiply_plain(&a, &b)?;
        self.restore(product)
    }

    /// Add a plaintext, switching it to the ciphertext's level first.
    pub fn add_plain(&self, a: &S::Ciphertext, b: &S::Plaintext) -> Result<S::Ciphertext> {
        let b = self.align_plaintext(b, a.level())?;
        self.scheme.add_plain(a, &b)
    }

    /// Sum at the deeper of the two levels.
    pub fn add(&self, a: &S::Ciphertext, b: &S::Ciphertext) -> Result<S::Ciphertext> {
        let level = a.level().max(b.level());
        let a = self.align_ciphertext(a, level)?;
        let b = self.align_ciphertext(b, level)?;
        self.scheme.add(&a, &b)
    }

    /// relinearize -> rescale -> set nominal scale
    fn restore(&self, product: S::Ciphertext) -> Result<S::Ciphertext> {
        let relinearized = self.scheme.relinearize(product)?;
        let rescaled = self.scheme.rescale(relinearized)?;
        debug!(
            level = rescaled.level(),
            drift = rescaled.scale() / self.scale,
            "rescaled product"
        );
        Ok(self.scheme.set_scale(rescaled, self.scale))
    }
}
