//! # **Error Module** - *Unified error taxonomy*
//!
//! Hand-rolled error enum in the teacher crate's style (`Display` + `Error`,
//! no `thiserror`): every fallible decode/encode/build operation returns
//! `Result<T, ArrowIpcError>`. Variants mirror the taxonomy owned by the core:
//! truncated or malformed wire bytes, unsupported wire features, invalid
//! caller-supplied arguments, unsafe numeric coercions, and heterogeneous
//! type inference.

use std::error::Error;
use std::fmt;

/// Catch-all error type for this crate.
#[derive(Debug, PartialEq)]
pub enum ArrowIpcError {
    /// Truncated, misaligned, or otherwise malformed wire bytes: unknown
    /// type id, missing `ARROW1` magic, continuation marker mismatch.
    Format { message: String },
    /// A wire feature with no implementation registered: an unsupported
    /// type id, compression without a registered codec, a pre-V4 feature.
    Unsupported { message: String },
    /// A caller-supplied argument is out of the closed set this crate
    /// accepts: bad type parameters, a delta dictionary batch with no prior
    /// non-delta batch for its id, inconsistent batch boundaries across
    /// columns.
    InvalidArgument { message: String },
    /// A value cannot be safely coerced to the requested representation,
    /// e.g. a 64-bit integer or offset outside the platform's safe range.
    Range { message: String },
    /// Type inference over a heterogeneous input that has no single
    /// consistent Arrow type.
    Mixed { message: String },
    /// A dictionary id was used inconsistently: referenced before any
    /// batch defined it, or redefined with an incompatible value type.
    Dictionary { message: String },
}

impl ArrowIpcError {
    pub fn format(message: impl Into<String>) -> Self {
        ArrowIpcError::Format { message: message.into() }
    }
    pub fn unsupported(message: impl Into<String>) -> Self {
        ArrowIpcError::Unsupported { message: message.into() }
    }
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        ArrowIpcError::InvalidArgument { message: message.into() }
    }
    pub fn range(message: impl Into<String>) -> Self {
        ArrowIpcError::Range { message: message.into() }
    }
    pub fn mixed(message: impl Into<String>) -> Self {
        ArrowIpcError::Mixed { message: message.into() }
    }
    pub fn dictionary(message: impl Into<String>) -> Self {
        ArrowIpcError::Dictionary { message: message.into() }
    }
}

impl fmt::Display for ArrowIpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArrowIpcError::Format { message } => write!(f, "Format error: {message}"),
            ArrowIpcError::Unsupported { message } => write!(f, "Unsupported: {message}"),
            ArrowIpcError::InvalidArgument { message } => write!(f, "Invalid argument: {message}"),
            ArrowIpcError::Range { message } => write!(f, "Range error: {message}"),
            ArrowIpcError::Mixed { message } => write!(f, "Mixed types: {message}"),
            ArrowIpcError::Dictionary { message } => write!(f, "Dictionary error: {message}"),
        }
    }
}

impl Error for ArrowIpcError {}

pub type Result<T> = std::result::Result<T, ArrowIpcError>;
