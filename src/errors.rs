//! Error types for the custody policy engine
//!
//! Every error here is a programmer or input error. None of them is
//! transient, so callers surface them instead of retrying.

use clvm_traits::{FromClvmError, ToClvmError};
use thiserror::Error;

use crate::types::Bytes32;

/// The main error type for the custody policy library
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// Program decoding and shape errors
    #[error(transparent)]
    Program(#[from] ProgramError),

    /// Policy construction and spend construction errors
    #[error(transparent)]
    Policy(#[from] PolicyError),

    /// Memo decoding errors
    #[error(transparent)]
    Memo(#[from] MemoError),
}

/// Errors raised while decoding or destructuring a program
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProgramError {
    /// Serialized input is truncated or carries an invalid length prefix
    #[error("Invalid serialized program")]
    InvalidSerialization,

    /// Serialized input continues after a complete program
    #[error("Trailing bytes after serialized program: {remaining} bytes")]
    TrailingBytes {
        /// Number of unread bytes
        remaining: usize,
    },

    /// The allocator refused to hold the program
    #[error("Program exceeds allocator limits")]
    AllocatorLimit,

    /// Hex input could not be decoded
    #[error("Invalid hex: {0}")]
    InvalidHex(String),

    /// An atom was required but a pair was found
    #[error("Expected atom, found pair")]
    ExpectedAtom,

    /// A pair was required but an atom was found
    #[error("Expected pair, found atom")]
    ExpectedPair,

    /// A list did not end in nil
    #[error("List is not nil-terminated")]
    ImproperList,

    /// An integer atom does not fit the requested type
    #[error("Integer atom out of range: {len} bytes")]
    IntegerOutOfRange {
        /// Length of the integer atom
        len: usize,
    },

    /// A hash atom has the wrong length
    #[error("Invalid hash length: expected 32 bytes, got {len}")]
    InvalidHashLength {
        /// Length of the atom
        len: usize,
    },

    /// A typed value could not be read from a program
    #[error("Decode failed: {0}")]
    Decode(String),
}

impl From<ToClvmError> for ProgramError {
    fn from(_: ToClvmError) -> Self { ProgramError::AllocatorLimit }
}

impl From<FromClvmError> for ProgramError {
    fn from(error: FromClvmError) -> Self {
        match error {
            FromClvmError::ExpectedAtom => ProgramError::ExpectedAtom,
            FromClvmError::ExpectedPair => ProgramError::ExpectedPair,
            FromClvmError::WrongAtomLength { expected: 32, found } => ProgramError::InvalidHashLength { len: found },
            other => ProgramError::Decode(other.to_string()),
        }
    }
}

/// Errors raised while building or spending a policy
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PolicyError {
    /// Threshold is zero or exceeds the number of members
    #[error("Invalid threshold: {m} of {n}")]
    InvalidThreshold {
        /// Required approvals
        m: usize,
        /// Number of members
        n: usize,
    },

    /// Two members of one MofN share the same identity
    #[error("Duplicate branch in threshold: {}", hex::encode(.identity))]
    DuplicateBranch {
        /// Identity hash shared by both members
        identity: Bytes32,
    },

    /// A placeholder node was asked for its script
    #[error("Puzzle {} is unknown and cannot be reconstructed", hex::encode(.puzzle_hash))]
    NotReconstructable {
        /// Hash of the unresolved node
        puzzle_hash: Bytes32,
    },

    /// Number of supplied solutions does not match the number of slots
    #[error("Arity mismatch: expected {expected} solutions, got {actual}")]
    ArityMismatch {
        /// Number of slots
        expected: usize,
        /// Number of solutions supplied
        actual: usize,
    },

    /// MofN solve received a number of spends other than m
    #[error("Threshold requires exactly {required} proven spends, got {provided}")]
    SpendCountMismatch {
        /// Required approvals
        required: usize,
        /// Spends supplied
        provided: usize,
    },

    /// A proven spend is keyed by a hash that is not a member branch
    #[error("Proven spend for {} does not match any member", hex::encode(.puzzle_hash))]
    UnknownBranch {
        /// Key of the stray proven spend
        puzzle_hash: Bytes32,
    },

    /// A placeholder was resolved with a capability of the other family
    #[error("Resolution for {} has the wrong variant family", hex::encode(.puzzle_hash))]
    VariantMismatch {
        /// Hash of the placeholder
        puzzle_hash: Bytes32,
    },
}

/// Errors raised while decoding a policy memo
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum MemoError {
    /// The memo does not carry this engine's namespace
    #[error("Memo does not belong to this policy namespace")]
    NotThisSpec,

    /// The memo has the right namespace but the wrong shape
    #[error("Malformed memo: {reason}")]
    Malformed {
        /// What failed to decode
        reason: String,
    },

    /// The memo nests thresholds deeper than allowed
    #[error("Memo nesting exceeds maximum depth {max_depth}")]
    TooDeep {
        /// Configured bound
        max_depth: usize,
    },
}

impl MemoError {
    pub(crate) fn malformed(context: &str, source: impl Into<ProgramError>) -> Self {
        MemoError::Malformed { reason: format!("{context}: {}", source.into()) }
    }
}

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;
