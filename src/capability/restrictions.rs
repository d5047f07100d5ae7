use std::sync::Arc;

use clvm_traits::{FromClvm, ToClvm};

use super::registry::RestrictionDecoder;
use super::{Capability, RestrictionCapability};
use crate::errors::PolicyError;
use crate::hash::hash_int;
use crate::program::Program;
use crate::puzzles::PuzzleMod;
use crate::types::{Bytes32, Nonce};

#[derive(ToClvm, FromClvm)]
#[clvm(list)]
struct TimelockMemo {
    seconds: u64,
}

/// Requires the member's conditions to assert a minimum elapsed time
///
/// Curried as `MOD(seconds)`; gates the member path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TimelockRestriction {
    puzzle_mod: PuzzleMod,
    seconds: u64,
}

impl TimelockRestriction {
    /// Creates a timelock of `seconds` over the given validator mod
    pub fn new(puzzle_mod: PuzzleMod, seconds: u64) -> Self { Self { puzzle_mod, seconds } }

    /// Required relative delay
    pub fn seconds(&self) -> u64 { self.seconds }

    /// Rebuilds the restriction from its memo
    pub fn from_memo(puzzle_mod: PuzzleMod, memo: &Program) -> Option<Self> {
        let TimelockMemo { seconds } = memo.decode().ok()?;
        Some(Self::new(puzzle_mod, seconds))
    }

    /// Decoder recognizing memos produced by this restriction type
    pub fn decoder(puzzle_mod: PuzzleMod) -> impl RestrictionDecoder {
        move |member_not_dpuz: bool, memo: &Program| {
            if !member_not_dpuz {
                return None;
            }
            Self::from_memo(puzzle_mod.clone(), memo)
                .map(|r| Arc::new(r) as Arc<dyn RestrictionCapability>)
        }
    }
}

impl Capability for TimelockRestriction {
    fn memo(&self, _nonce: Nonce) -> Program { Program::list([Program::int(self.seconds.into())]) }

    fn puzzle(&self, _nonce: Nonce) -> Result<Program, PolicyError> {
        Ok(self.puzzle_mod.curry(&[Program::int(self.seconds.into())]))
    }

    fn puzzle_hash(&self, _nonce: Nonce) -> Bytes32 {
        self.puzzle_mod.curry_hash(&[hash_int(self.seconds.into())])
    }
}

impl RestrictionCapability for TimelockRestriction {
    fn member_not_dpuz(&self) -> bool { true }
}

/// Any validator mod curried with fixed arguments
///
/// The memo is the argument list itself, so the restriction can always be
/// rebuilt by whoever holds the mod.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CurriedRestriction {
    puzzle_mod: PuzzleMod,
    args: Vec<Program>,
    member_not_dpuz: bool,
}

impl CurriedRestriction {
    /// Curries `args` into `puzzle_mod`
    pub fn new(puzzle_mod: PuzzleMod, args: Vec<Program>, member_not_dpuz: bool) -> Self {
        Self { puzzle_mod, args, member_not_dpuz }
    }

    /// Curried arguments
    pub fn args(&self) -> &[Program] { &self.args }

    /// Rebuilds the restriction from its memo
    pub fn from_memo(puzzle_mod: PuzzleMod, member_not_dpuz: bool, memo: &Program) -> Option<Self> {
        Some(Self::new(puzzle_mod, memo.decode().ok()?, member_not_dpuz))
    }

    /// Decoder accepting any memo shaped as an argument list
    ///
    /// Registries verify the rebuilt hash, so a decoder for the wrong mod
    /// never resolves a placeholder.
    pub fn decoder(puzzle_mod: PuzzleMod) -> impl RestrictionDecoder {
        move |member_not_dpuz: bool, memo: &Program| {
            Self::from_memo(puzzle_mod.clone(), member_not_dpuz, memo)
                .map(|r| Arc::new(r) as Arc<dyn RestrictionCapability>)
        }
    }
}

impl Capability for CurriedRestriction {
    fn memo(&self, _nonce: Nonce) -> Program { Program::list(self.args.iter().cloned()) }

    fn puzzle(&self, _nonce: Nonce) -> Result<Program, PolicyError> {
        Ok(self.puzzle_mod.curry(&self.args))
    }

    fn puzzle_hash(&self, _nonce: Nonce) -> Bytes32 {
        let arg_hashes: Vec<Bytes32> = self.args.iter().map(Program::tree_hash).collect();
        self.puzzle_mod.curry_hash(&arg_hashes)
    }
}

impl RestrictionCapability for CurriedRestriction {
    fn member_not_dpuz(&self) -> bool { self.member_not_dpuz }
}
