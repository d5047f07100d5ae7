//! M-of-N threshold combinator
//!
//! An [`MofN`] commits to its member trees through their non-top-level
//! puzzle hashes. The selection primitive depends on the threshold: a
//! single-branch Merkle proof for `m == 1`, a full list for `m == n`, and a
//! Merkle multi-proof otherwise.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::errors::PolicyError;
use crate::hash::{hash_atom, hash_atom_list, hash_int, MerkleTree};
use crate::policy::PuzzleWithRestrictions;
use crate::program::Program;
use crate::puzzles::PuzzleLibrary;
use crate::spend::ProvenSpend;
use crate::types::Bytes32;

/// Selection primitive used for a threshold
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Selection {
    /// One branch chosen by Merkle inclusion proof
    OneOfN,
    /// Every branch, in member order
    NOfN,
    /// `m` branches revealed by one Merkle multi-proof
    MOfN,
}

/// Threshold over `n` member policy trees
#[derive(Clone, Debug, PartialEq)]
pub struct MofN {
    m: usize,
    members: Vec<PuzzleWithRestrictions>,
}

impl MofN {
    /// Creates a threshold requiring `m` of `members`
    ///
    /// # Arguments
    ///
    /// * `m` - Number of members that must authorize a spend
    /// * `members` - Member trees; two members locking the same puzzle are
    ///   the same branch, whatever their memos say
    ///
    /// # Returns
    ///
    /// The combinator, or `InvalidThreshold` unless `1 <= m <= n`, or
    /// `DuplicateBranch` if two members share an identity.
    pub fn new(m: usize, members: Vec<PuzzleWithRestrictions>) -> Result<Self, PolicyError> {
        let n = members.len();
        if m == 0 || m > n {
            return Err(PolicyError::InvalidThreshold { m, n });
        }

        let mut seen = BTreeSet::new();
        for member in &members {
            let identity = member.identity();
            if !seen.insert(identity) {
                return Err(PolicyError::DuplicateBranch { identity });
            }
        }

        Ok(Self { m, members })
    }

    // Members are already validated; only their content changes.
    pub(crate) fn with_members(&self, members: Vec<PuzzleWithRestrictions>) -> Self {
        Self { m: self.m, members }
    }

    /// Required number of authorizing members
    pub fn m(&self) -> usize { self.m }

    /// Total number of members
    pub fn n(&self) -> usize { self.members.len() }

    /// Member trees in construction order
    pub fn members(&self) -> &[PuzzleWithRestrictions] { &self.members }

    /// Selection primitive chosen for this threshold
    pub fn selection(&self) -> Selection {
        if self.m == 1 {
            Selection::OneOfN
        } else if self.m == self.n() {
            Selection::NOfN
        } else {
            Selection::MOfN
        }
    }

    /// Non-top-level puzzle hash of every member, in member order
    pub fn member_puzzle_hashes(&self, library: &PuzzleLibrary) -> Vec<Bytes32> {
        self.members.iter().map(|member| member.puzzle_hash(library, false)).collect()
    }

    /// Merkle tree over the member puzzle hashes
    pub fn merkle_tree(&self, library: &PuzzleLibrary) -> MerkleTree {
        MerkleTree::new(&self.member_puzzle_hashes(library))
    }

    /// Commitment to `m` and the member set
    pub fn puzzle_hash(&self, library: &PuzzleLibrary) -> Bytes32 {
        let hashes = self.member_puzzle_hashes(library);
        match self.selection() {
            Selection::OneOfN => {
                let root = MerkleTree::new(&hashes).root();
                library.one_of_n.curry_hash(&[hash_atom(&root)])
            }
            Selection::NOfN => library.n_of_n.curry_hash(&[hash_atom_list(&hashes)]),
            Selection::MOfN => {
                let root = MerkleTree::new(&hashes).root();
                library.m_of_n.curry_hash(&[hash_int(self.m as i128), hash_atom(&root)])
            }
        }
    }

    /// Threshold script
    ///
    /// Only member hashes are committed, so this never needs member reveals.
    pub fn puzzle(&self, library: &PuzzleLibrary) -> Program {
        let hashes = self.member_puzzle_hashes(library);
        match self.selection() {
            Selection::OneOfN => {
                let root = MerkleTree::new(&hashes).root();
                library.one_of_n.curry(&[Program::atom(root)])
            }
            Selection::NOfN => {
                library.n_of_n.curry(&[Program::list(hashes.into_iter().map(Program::atom))])
            }
            Selection::MOfN => {
                let root = MerkleTree::new(&hashes).root();
                library.m_of_n.curry(&[Program::int(self.m as i128), Program::atom(root)])
            }
        }
    }

    /// Builds the threshold solution from the chosen branches' spends
    ///
    /// # Arguments
    ///
    /// * `library` - Script primitives the members are hashed with
    /// * `proven_spends` - Exactly `m` spends keyed by member puzzle hash
    ///   (see [`PuzzleWithRestrictions::proven_spend`])
    ///
    /// # Returns
    ///
    /// The solution, `SpendCountMismatch` if the number of spends is not
    /// `m`, or `UnknownBranch` if a key is not a member hash.
    pub fn solve(
        &self,
        library: &PuzzleLibrary,
        proven_spends: &BTreeMap<Bytes32, ProvenSpend>,
    ) -> Result<Program, PolicyError> {
        if proven_spends.len() != self.m {
            return Err(PolicyError::SpendCountMismatch {
                required: self.m,
                provided: proven_spends.len(),
            });
        }

        let hashes = self.member_puzzle_hashes(library);
        if let Some(stray) = proven_spends.keys().find(|key| !hashes.contains(*key)) {
            return Err(PolicyError::UnknownBranch { puzzle_hash: *stray });
        }

        let selection = self.selection();
        debug!(m = self.m, n = self.n(), ?selection, "solving threshold");

        let solution = match selection {
            Selection::OneOfN => {
                let tree = MerkleTree::new(&hashes);
                let Some((leaf, spend)) = proven_spends.iter().next() else {
                    return Err(PolicyError::SpendCountMismatch { required: 1, provided: 0 });
                };
                let proof = tree.proof(leaf).ok_or(PolicyError::UnknownBranch { puzzle_hash: *leaf })?;
                Program::list([
                    proof.to_program(),
                    spend.puzzle_reveal.clone(),
                    spend.solution.clone(),
                ])
            }
            Selection::NOfN => Program::list(
                hashes
                    .iter()
                    .filter_map(|hash| proven_spends.get(hash))
                    .map(|spend| Program::list([spend.puzzle_reveal.clone(), spend.solution.clone()]))
                    .collect::<Vec<_>>(),
            ),
            Selection::MOfN => {
                let reveals: BTreeMap<Bytes32, Program> = proven_spends
                    .iter()
                    .map(|(hash, spend)| (*hash, spend.to_program()))
                    .collect();
                Program::list([MerkleTree::new(&hashes).multi_proof(&reveals)])
            }
        };
        Ok(solution)
    }
}
