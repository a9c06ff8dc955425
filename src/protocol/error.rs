//! Frame-scoped decode errors.

use thiserror::Error;

/// Errors raised while decoding a single frame.
///
/// A frame error never outlives its frame: the frame is discarded and the
/// next arrival decodes from a clean slate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FrameError {
    /// The buffer holds fewer bytes (or bits) than the format requires.
    #[error("truncated frame: expected {expected} bytes, got {actual}")]
    TruncatedFrame { expected: usize, actual: usize },

    /// A display frame arrived before any screen size was known.
    #[error("display frame has no dimensions: no state frame received yet")]
    MissingDimensions,

    /// A screen size with a zero side.
    #[error("invalid screen dimensions {width}x{height}")]
    InvalidDimensions { width: u8, height: u8 },
}
