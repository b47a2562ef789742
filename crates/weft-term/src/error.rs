// SPDX-License-Identifier: MIT
//
// Error kinds for the rendering core.
//
// Only two things are worth an error here: a caller handing us a contract
// violation (zero-sized buffer, diffing buffers of different sizes) and the
// output stream refusing bytes. Malformed terminal input is never an error;
// the parser degrades it to literal keys instead.

use std::io;

/// Errors surfaced by buffer, renderer and output operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A buffer was created or resized with a zero dimension.
    #[error("invalid buffer dimensions {width}x{height}: both must be positive")]
    InvalidDimensions {
        /// Requested width.
        width: u16,
        /// Requested height.
        height: u16,
    },

    /// Two buffers of different sizes were compared or copied.
    #[error(
        "buffer dimension mismatch: expected {}x{}, got {}x{}",
        expected.0, expected.1, actual.0, actual.1
    )]
    DimensionMismatch {
        /// `(width, height)` of the receiving buffer.
        expected: (u16, u16),
        /// `(width, height)` of the other buffer.
        actual: (u16, u16),
    },

    /// Writing to the output stream failed (backpressure, hangup, ...).
    #[error("terminal output failed: {0}")]
    Io(#[from] io::Error),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_dimensions_message() {
        let err = Error::InvalidDimensions { width: 0, height: 5 };
        assert_eq!(
            err.to_string(),
            "invalid buffer dimensions 0x5: both must be positive"
        );
    }

    #[test]
    fn dimension_mismatch_message() {
        let err = Error::DimensionMismatch {
            expected: (80, 24),
            actual: (40, 12),
        };
        assert_eq!(
            err.to_string(),
            "buffer dimension mismatch: expected 80x24, got 40x12"
        );
    }

    #[test]
    fn io_errors_convert() {
        let io_err = io::Error::new(io::ErrorKind::BrokenPipe, "gone");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.to_string().contains("gone"));
    }
}
