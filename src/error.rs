//! Error types for Solid List decoding.

use thiserror::Error;

use crate::format::ChunkId;

/// Coarse classification of an [`Error`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ErrorKind {
    /// Malformed chunk nesting, size overrun or an unrecognized mandatory tag.
    Structural,
    /// A divisibility or alignment guarantee of the encoding does not hold.
    Invariant,
    /// A recognized tag or effect ID that has no decoder.
    Unsupported,
    /// The compression collaborator failed.
    Codec,
    /// Reading the input source failed.
    Io,
}

#[non_exhaustive]
#[derive(Error, Debug)]
pub enum Error {
    /// A chunk is malformed at a known position.
    #[error("malformed chunk {tag} at {offset:#X}: {reason}")]
    Structural { offset: u64, tag: ChunkId, reason: String },

    /// A leaf chunk was not recognized in a context that requires recognition.
    #[error("unrecognized chunk {tag} at {offset:#X}")]
    UnknownTag { offset: u64, tag: ChunkId },

    /// The object as a whole is malformed (e.g. a mandatory chunk is missing).
    #[error("malformed object: {0}")]
    Malformed(String),

    #[error("invariant violated: {0}")]
    Invariant(String),

    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("record decode failed: {0}")]
    BinRw(#[from] binrw::Error),

    #[error("decompression failed: {0:#}")]
    Codec(#[from] anyhow::Error),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Structural { .. } | Error::UnknownTag { .. } | Error::Malformed(_) => {
                ErrorKind::Structural
            }
            Error::Invariant(_) => ErrorKind::Invariant,
            Error::Unsupported(_) => ErrorKind::Unsupported,
            Error::Codec(_) => ErrorKind::Codec,
            Error::BinRw(e) if !e.is_eof() => ErrorKind::Structural,
            Error::BinRw(_) | Error::Io(_) => ErrorKind::Io,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Returns an [`Error::Invariant`] unless the condition holds.
#[macro_export]
macro_rules! ensure_invariant {
    ($cond:expr, $($arg:tt)+) => {
        if !$cond {
            return Err($crate::Error::Invariant(format!($($arg)+)));
        }
    };
}
