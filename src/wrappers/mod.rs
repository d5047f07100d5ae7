//! Delegated-puzzle wrappers and the wrapper-stack restriction
//!
//! A [`WrapperStack`] commits to an ordered list of wrapper puzzle hashes.
//! Spending under it means nesting the delegated puzzle inside each wrapper
//! with the add-wrapper combinator, so a policy such as "only pay to this
//! address" is expressed as data instead of as a new top-level restriction.

use std::fmt;
use std::sync::Arc;

use crate::capability::{Capability, RestrictionCapability};
use crate::errors::PolicyError;
use crate::hash::{hash_atom, hash_atom_list, hash_int};
use crate::program::Program;
use crate::puzzles::{PuzzleLibrary, PuzzleMod};
use crate::spend::DelegatedPayload;
use crate::types::{Bytes32, Nonce};

/// A puzzle applied around the delegated puzzle
pub trait Wrapper: fmt::Debug + Send + Sync {
    /// Wrapper script
    fn puzzle(&self) -> Program;

    /// Commitment to [`Wrapper::puzzle`]
    fn puzzle_hash(&self) -> Bytes32;

    /// Opaque payload describing this wrapper
    fn memo(&self) -> Program;
}

/// Requires a relative height lock on the spend
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeightLockWrapper {
    puzzle_mod: PuzzleMod,
    blocks: u64,
}

impl HeightLockWrapper {
    /// Creates a lock of `blocks` over the given wrapper mod
    pub fn new(puzzle_mod: PuzzleMod, blocks: u64) -> Self { Self { puzzle_mod, blocks } }

    /// Required relative height
    pub fn blocks(&self) -> u64 { self.blocks }
}

impl Wrapper for HeightLockWrapper {
    fn puzzle(&self) -> Program { self.puzzle_mod.curry(&[Program::int(self.blocks.into())]) }

    fn puzzle_hash(&self) -> Bytes32 { self.puzzle_mod.curry_hash(&[hash_int(self.blocks.into())]) }

    fn memo(&self) -> Program { Program::list([Program::int(self.blocks.into())]) }
}

/// Restricts every created output to one destination
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FixedDestinationWrapper {
    puzzle_mod: PuzzleMod,
    destination: Bytes32,
}

impl FixedDestinationWrapper {
    /// Creates a wrapper allowing only `destination`
    pub fn new(puzzle_mod: PuzzleMod, destination: Bytes32) -> Self {
        Self { puzzle_mod, destination }
    }

    /// The only legal output puzzle hash
    pub fn destination(&self) -> Bytes32 { self.destination }
}

impl Wrapper for FixedDestinationWrapper {
    fn puzzle(&self) -> Program { self.puzzle_mod.curry(&[Program::atom(self.destination)]) }

    fn puzzle_hash(&self) -> Bytes32 { self.puzzle_mod.curry_hash(&[hash_atom(&self.destination)]) }

    fn memo(&self) -> Program { Program::list([Program::atom(self.destination)]) }
}

/// Restriction enforcing that the delegated puzzle carries a fixed wrapper stack
///
/// Curried as `ENFORCE(quoted_add_wrapper_hash, (wrapper_hash ...))` and
/// routed to the delegated-puzzle validators.
#[derive(Clone, Debug)]
pub struct WrapperStack {
    enforce: PuzzleMod,
    add_wrapper: PuzzleMod,
    wrappers: Vec<Arc<dyn Wrapper>>,
}

impl WrapperStack {
    /// Builds a stack; `wrappers[0]` ends up outermost
    pub fn new(library: &PuzzleLibrary, wrappers: Vec<Arc<dyn Wrapper>>) -> Self {
        Self {
            enforce: library.enforce_dpuz_wrappers.clone(),
            add_wrapper: library.add_dpuz_wrapper.clone(),
            wrappers,
        }
    }

    /// Required wrappers in construction order
    pub fn wrappers(&self) -> &[Arc<dyn Wrapper>] { &self.wrappers }

    fn wrapper_hashes(&self) -> Vec<Bytes32> {
        self.wrappers.iter().map(|wrapper| wrapper.puzzle_hash()).collect()
    }

    /// Nests `payload` inside every required wrapper
    ///
    /// # Arguments
    ///
    /// * `payload` - The delegated puzzle and solution to wrap
    /// * `wrapper_solutions` - One solution per wrapper, in construction order
    ///
    /// # Returns
    ///
    /// The wrapped payload, or `ArityMismatch` if the solution count differs
    /// from the number of wrappers.
    pub fn modify_delegated_puzzle_and_solution(
        &self,
        payload: &DelegatedPayload,
        wrapper_solutions: &[Program],
    ) -> Result<DelegatedPayload, PolicyError> {
        if wrapper_solutions.len() != self.wrappers.len() {
            return Err(PolicyError::ArityMismatch {
                expected: self.wrappers.len(),
                actual: wrapper_solutions.len(),
            });
        }

        let mut wrapped = payload.clone();
        for (wrapper, solution) in self.wrappers.iter().zip(wrapper_solutions).rev() {
            wrapped = DelegatedPayload {
                puzzle: self.add_wrapper.curry(&[wrapper.puzzle(), wrapped.puzzle]),
                solution: Program::list([solution.clone(), wrapped.solution]),
            };
        }
        Ok(wrapped)
    }

    /// Hash of the delegated puzzle after wrapping, from its unwrapped hash
    pub fn wrapped_delegated_puzzle_hash(&self, delegated_puzzle_hash: Bytes32) -> Bytes32 {
        self.wrappers.iter().rev().fold(delegated_puzzle_hash, |inner, wrapper| {
            self.add_wrapper.curry_hash(&[wrapper.puzzle_hash(), inner])
        })
    }
}

impl Capability for WrapperStack {
    fn memo(&self, _nonce: Nonce) -> Program {
        Program::list(self.wrappers.iter().map(|wrapper| wrapper.memo()))
    }

    fn puzzle(&self, _nonce: Nonce) -> Result<Program, PolicyError> {
        let hashes = self.wrapper_hashes();
        Ok(self.enforce.curry(&[
            Program::atom(self.add_wrapper.quoted_hash()),
            Program::list(hashes.into_iter().map(Program::atom)),
        ]))
    }

    fn puzzle_hash(&self, _nonce: Nonce) -> Bytes32 {
        self.enforce.curry_hash(&[
            hash_atom(&self.add_wrapper.quoted_hash()),
            hash_atom_list(&self.wrapper_hashes()),
        ])
    }
}

impl RestrictionCapability for WrapperStack {
    fn member_not_dpuz(&self) -> bool { false }
}
