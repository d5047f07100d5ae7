#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! # Custody Policy
//!
//! Composable custody policy trees that commit to curried scripts by hash.
//! A tree's puzzle hash is the coin's lock and its memo is the on-chain
//! hint from which anyone can rebuild the tree's skeleton.

// Fixed-size aliases, opcode atoms and protocol constants
pub mod types;

// Error types
pub mod errors;

// Memo dialect configuration
pub mod config;

// Immutable program trees and their serialization
pub mod program;

// Tree hashing without materializing programs, and Merkle selection trees
pub mod hash;

// Script primitives supplied by the engine
pub mod puzzles;

// Members, restrictions and placeholder resolution
pub mod capability;

// Delegated-puzzle wrappers
pub mod wrappers;

// Spend payloads
pub mod spend;

// Threshold combinator
pub mod mofn;

// Policy trees and the memo codec
pub mod policy;

#[cfg(test)]
pub(crate) mod test_utils;

// Re-export commonly used types and functions
pub use capability::{
    Capability, CapabilityRegistry, KnownPuzzle, Member, PuzzleHint, Restriction,
    RestrictionCapability, RestrictionHint, UnknownPuzzle,
};
pub use config::{ChipV1Config, CustodyConfig};
pub use errors::{Error, MemoError, PolicyError, ProgramError, Result};
pub use hash::{curry_commitment, hash_atom, hash_atom_list, hash_int, hash_pair, hash_quoted_mod};
pub use mofn::MofN;
pub use policy::{InnerPuzzle, MofNHint, PuzzleWithRestrictions};
pub use program::Program;
pub use puzzles::{PuzzleLibrary, PuzzleMod};
pub use spend::{DelegatedPayload, ProvenSpend};
pub use types::{Bytes32, Nonce, PuzzleHash};
pub use wrappers::{Wrapper, WrapperStack};
