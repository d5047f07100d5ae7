//! Spend payloads exchanged with the transaction layer

use crate::program::Program;
use crate::types::Bytes32;

/// A member branch's own reveal and solution, ready to be selected by a threshold
///
/// Keyed externally by the branch's non-top-level puzzle hash.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProvenSpend {
    /// Full puzzle of the branch
    pub puzzle_reveal: Program,
    /// Solution for that puzzle
    pub solution: Program,
}

impl ProvenSpend {
    /// Creates a proven spend
    pub fn new(puzzle_reveal: Program, solution: Program) -> Self { Self { puzzle_reveal, solution } }

    /// Encodes the spend as `(puzzle_reveal . solution)`
    pub fn to_program(&self) -> Program {
        Program::pair(self.puzzle_reveal.clone(), self.solution.clone())
    }
}

/// The spend intent that flows through the restriction stack
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DelegatedPayload {
    /// Delegated puzzle producing the spend's effects
    pub puzzle: Program,
    /// Solution for the delegated puzzle
    pub solution: Program,
}

impl DelegatedPayload {
    /// Creates a delegated payload
    pub fn new(puzzle: Program, solution: Program) -> Self { Self { puzzle, solution } }

    /// Tree hash of the delegated puzzle, the value members authorize
    pub fn puzzle_hash(&self) -> Bytes32 { self.puzzle.tree_hash() }
}
