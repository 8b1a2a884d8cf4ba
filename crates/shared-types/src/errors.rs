//! Error types for shared domain codecs.

use thiserror::Error;

/// Errors raised while decoding shared domain values.
#[derive(Debug, Error)]
pub enum SharedTypesError {
    /// A hash record was not exactly 48 bytes.
    #[error("invalid hash length: expected 48 bytes, got {got}")]
    InvalidHashLength {
        /// Length actually observed.
        got: usize,
    },

    /// A trailing-hash buffer was not a whole number of 48-byte records.
    #[error("misaligned hash buffer: {len} bytes is not a multiple of 48")]
    MisalignedHashBuffer {
        /// Buffer length actually observed.
        len: usize,
    },
}
