//! Puzzle mods and the engine's primitive library
//!
//! A [`PuzzleMod`] is an uncurried script together with its tree hash and the
//! hash of its quoted form, computed once at construction. Everything that
//! commits to a curried mod goes through these cached hashes, so no
//! process-wide table of pre-hashed mods is needed.
//!
//! The script engine's standard library defines the byte-level programs for
//! the selection combinators and wrappers. They are supplied to
//! [`PuzzleLibrary`] as data; only the restrictions layer is shipped here.

use hex_literal::hex;

use crate::errors::Result;
use crate::hash::{curry_commitment, hash_quoted_mod};
use crate::program::Program;
use crate::types::Bytes32;

/// Serialized restrictions layer: `(MEMBER_VALIDATORS DPUZ_VALIDATORS INNER_PUZZLE)`
/// curried, solved with `(member_validator_solutions dpuz_validator_solutions inner_solution)`
pub const RESTRICTIONS_PUZZLE: [u8; 204] = hex!(
    "
    ff02ffff01ff02ff04ffff04ff02ffff04ff05ffff04ff5fffff04ffff02ff17
    ffff04ff2fff82017f8080ffff04ffff02ff06ffff04ff02ffff04ff0bffff04
    ff81bfffff04ff2fff808080808080ff80808080808080ffff04ffff01ffff03
    ff80ffff02ff06ffff04ff02ffff04ff05ffff04ff0bffff04ff17ff80808080
    8080ff1780ff02ffff03ff05ffff01ff03ff80ffff02ff09ffff04ff17ff1380
    80ffff02ff06ffff04ff02ffff04ff0dffff04ff1bffff04ff17ff8080808080
    8080ff8080ff0180ff018080
    "
);

/// Tree hash of [`RESTRICTIONS_PUZZLE`]
pub const RESTRICTIONS_PUZZLE_HASH: Bytes32 =
    hex!("a28d59d39f964a93159c986b1914694f6f2f1c9901178f91e8b0ba4045980eef");

/// An uncurried mod with its cached commitments
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PuzzleMod {
    reveal: Program,
    hash: Bytes32,
    quoted_hash: Bytes32,
}

impl PuzzleMod {
    /// Wraps a mod reveal, hashing it once
    pub fn new(reveal: Program) -> Self {
        let hash = reveal.tree_hash();
        Self { reveal, hash, quoted_hash: hash_quoted_mod(&hash) }
    }

    /// Parses a serialized mod
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> { Ok(Self::new(Program::from_bytes(bytes)?)) }

    /// Parses a hex-serialized mod
    pub fn from_hex(text: &str) -> Result<Self> { Ok(Self::new(Program::from_hex(text)?)) }

    /// The restrictions layer shipped with this crate
    pub fn restrictions() -> Result<Self> { Self::from_bytes(&RESTRICTIONS_PUZZLE) }

    /// Uncurried program
    pub fn reveal(&self) -> &Program { &self.reveal }

    /// Tree hash of the uncurried program
    pub fn hash(&self) -> Bytes32 { self.hash }

    /// Tree hash of `(q . mod)`
    pub fn quoted_hash(&self) -> Bytes32 { self.quoted_hash }

    /// Materializes the mod curried with `args`
    pub fn curry(&self, args: &[Program]) -> Program { self.reveal.curry(args) }

    /// Commitment of the mod curried with arguments of the given hashes
    pub fn curry_hash(&self, arg_hashes: &[Bytes32]) -> Bytes32 {
        curry_commitment(&self.quoted_hash, arg_hashes)
    }
}

/// The script primitives a policy tree is assembled from
///
/// Every field must hold the exact program the script engine's standard
/// library defines for that role; commitments are only interoperable with
/// independently built spends when the bytes agree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PuzzleLibrary {
    /// Top-level feeder: runs the policy on the delegated puzzle hash, then the delegated puzzle
    pub delegated_puzzle_feeder: PuzzleMod,
    /// Binds a nonce to an inner puzzle
    pub index_wrapper: PuzzleMod,
    /// Runs member and delegated-puzzle validators around an inner puzzle
    pub restrictions: PuzzleMod,
    /// Selects one branch by Merkle inclusion proof
    pub one_of_n: PuzzleMod,
    /// Requires M branches revealed from one Merkle multi-proof
    pub m_of_n: PuzzleMod,
    /// Requires every branch of a committed list
    pub n_of_n: PuzzleMod,
    /// Nests a delegated puzzle inside a wrapper
    pub add_dpuz_wrapper: PuzzleMod,
    /// Checks the delegated puzzle carries a required wrapper stack
    pub enforce_dpuz_wrappers: PuzzleMod,
}

/// Serialized reveals used to build a [`PuzzleLibrary`]
#[derive(Clone, Copy, Debug)]
pub struct LibraryReveals<'a> {
    /// Hex of the delegated puzzle feeder
    pub delegated_puzzle_feeder: &'a str,
    /// Hex of the index wrapper
    pub index_wrapper: &'a str,
    /// Hex of the 1-of-N selector
    pub one_of_n: &'a str,
    /// Hex of the M-of-N selector
    pub m_of_n: &'a str,
    /// Hex of the N-of-N selector
    pub n_of_n: &'a str,
    /// Hex of the add-wrapper combinator
    pub add_dpuz_wrapper: &'a str,
    /// Hex of the wrapper-stack enforcer
    pub enforce_dpuz_wrappers: &'a str,
}

impl PuzzleLibrary {
    /// Builds a library from hex reveals, using the shipped restrictions layer
    pub fn from_hex(reveals: LibraryReveals<'_>) -> Result<Self> {
        Ok(Self {
            delegated_puzzle_feeder: PuzzleMod::from_hex(reveals.delegated_puzzle_feeder)?,
            index_wrapper: PuzzleMod::from_hex(reveals.index_wrapper)?,
            restrictions: PuzzleMod::restrictions()?,
            one_of_n: PuzzleMod::from_hex(reveals.one_of_n)?,
            m_of_n: PuzzleMod::from_hex(reveals.m_of_n)?,
            n_of_n: PuzzleMod::from_hex(reveals.n_of_n)?,
            add_dpuz_wrapper: PuzzleMod::from_hex(reveals.add_dpuz_wrapper)?,
            enforce_dpuz_wrappers: PuzzleMod::from_hex(reveals.enforce_dpuz_wrappers)?,
        })
    }
}
