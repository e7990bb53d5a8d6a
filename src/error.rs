//! Error type shared by the scheme backend and the division core.

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Every fault raised by the scheme backend, the division core and the report.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Two operands of an add/multiply sit at different chain positions.
    #[error("level mismatch: left operand at level {left}, right operand at level {right}")]
    LevelMismatch {
        /// Level of the left operand.
        left: usize,
        /// Level of the right operand.
        right: usize,
    },

    /// Two operands of an addition carry different scales.
    #[error("scale mismatch: {left} vs {right}")]
    ScaleMismatch {
        /// Scale of the left operand.
        left: f64,
        /// Scale of the right operand.
        right: f64,
    },

    /// Rescale or modulus switch past the end of the chain.
    #[error("level exhausted: level {requested} requested, deepest level is {max_level}")]
    LevelExhausted {
        /// Level the operation would have produced.
        requested: usize,
        /// Deepest level of the chain.
        max_level: usize,
    },

    /// Modulus switch towards the top of the chain.
    #[error("cannot switch from level {from} back to level {to}")]
    LevelRegression {
        /// Current level.
        from: usize,
        /// Requested, shallower level.
        to: usize,
    },

    /// Multiply on a ciphertext that still carries the `s²` component.
    #[error("ciphertext of size {0} must be relinearized before multiplication")]
    NotRelinearized(usize),

    /// Input vector length differs from what the operation needs.
    #[error("vector of length {got} does not match slot count {expected}")]
    SlotCountMismatch {
        /// Slot count of the scheme, or length of the first vector.
        expected: usize,
        /// Length actually supplied.
        got: usize,
    },

    /// The chain cannot absorb the levels a division needs.
    #[error("modulus chain too shallow: {required} levels required from level {start}, deepest level is {max_level}")]
    ChainTooShallow {
        /// Levels the division consumes.
        required: usize,
        /// Level the inputs start from.
        start: usize,
        /// Deepest level of the chain.
        max_level: usize,
    },

    /// Bounds that are not finite with `0 <= min < max`.
    #[error("invalid bounds [{min}, {max}]")]
    InvalidBounds {
        /// Lower bound.
        min: f64,
        /// Upper bound.
        max: f64,
    },

    /// A dividend entry outside the configured bounds.
    #[error("operand {value} at slot {slot} lies outside [{min}, {max}]")]
    OutOfBounds {
        /// First offending slot.
        slot: usize,
        /// Its value.
        value: f64,
        /// Lower bound.
        min: f64,
        /// Upper bound.
        max: f64,
    },

    /// Degenerate or unsupported encryption parameters.
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    /// Value too large (or not finite) to encode at the requested scale.
    #[error("coefficient {0} cannot be represented at this scale")]
    EncodingOverflow(f64),

    /// Report serialization failure.
    #[error(transparent)]
    Csv(#[from] csv::Error),

    /// Report file failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
