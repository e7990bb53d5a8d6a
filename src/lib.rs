//! Approximate division over a leveled CKKS scheme (Newton-Schulz reciprocal)

#![forbid(unsafe_code)]
#![warn(clippy::pedantic, missing_docs)]

pub mod error;
pub mod ntt;
pub mod polynomial;
pub mod modulus_chain;
pub mod cipher;
pub mod encoder;
pub mod leveled;
pub mod algebra;
pub mod scheme;
pub mod tracker;
pub mod normalizer;
pub mod reciprocal;
pub mod division;
pub mod reference;
pub mod report;

pub use algebra::CkksAlgebra;
pub use cipher::{Ciphertext, Leveled, Plaintext};
pub use division::{divide, DivisionConfig, DivisionEvaluator, LevelBudget};
pub use encoder::Encoder;
pub use error::{Error, Result};
pub use leveled::LeveledScheme;
pub use modulus_chain::{CkksParams, ModulusChain};
pub use normalizer::{Bounds, Normalizer};
pub use polynomial::RnsPolynomial;
pub use reciprocal::{IterationState, ReciprocalApproximator};
pub use reference::{reference_divide, reference_reciprocal};
pub use report::{error_records, relative_error_percent, write_csv, write_csv_file, ErrorRecord};
pub use scheme::Ckks;
pub use tracker::LevelTracker;
