//! Policy trees
//!
//! A [`PuzzleWithRestrictions`] is one node of a custody policy: a nonce,
//! an ordered list of restrictions and either a member or a nested
//! threshold. Its puzzle hash is the coin's lock; its memo is the hint that
//! lets anyone rebuild the tree's skeleton from chain data.
//!
//! Layering, from the inside out:
//!
//! 1. the member or threshold puzzle
//! 2. the restrictions layer, when any restriction is present
//! 3. the index wrapper binding the nonce
//! 4. the delegated puzzle feeder, for the top-level hash only

mod memo;

use std::collections::BTreeMap;

use tracing::debug;

use crate::capability::{
    CapabilityRegistry, KnownPuzzle, Member, Restriction, UnknownPuzzle,
};
use crate::errors::PolicyError;
use crate::hash::{hash_int, hash_list};
use crate::mofn::MofN;
use crate::program::Program;
use crate::puzzles::PuzzleLibrary;
use crate::spend::{DelegatedPayload, ProvenSpend};
use crate::types::{Bytes32, Nonce};

pub use memo::MofNHint;

/// What a policy node ultimately delegates to
#[derive(Clone, Debug, PartialEq)]
pub enum InnerPuzzle {
    /// A single authorizer
    Member(Member),
    /// A threshold over nested trees
    MofN(MofN),
}

impl From<Member> for InnerPuzzle {
    fn from(member: Member) -> Self { InnerPuzzle::Member(member) }
}

impl From<MofN> for InnerPuzzle {
    fn from(threshold: MofN) -> Self { InnerPuzzle::MofN(threshold) }
}

/// One node of a custody policy tree
#[derive(Clone, Debug, PartialEq)]
pub struct PuzzleWithRestrictions {
    /// Distinguishes otherwise identical nodes
    pub nonce: Nonce,
    /// Restrictions in declaration order
    pub restrictions: Vec<Restriction>,
    /// Member or threshold this node delegates to
    pub puzzle: InnerPuzzle,
}

impl PuzzleWithRestrictions {
    /// Creates a node
    pub fn new(nonce: Nonce, restrictions: Vec<Restriction>, puzzle: impl Into<InnerPuzzle>) -> Self {
        Self { nonce, restrictions, puzzle: puzzle.into() }
    }

    /// Whether the node delegates to a threshold
    pub fn is_branching(&self) -> bool { matches!(self.puzzle, InnerPuzzle::MofN(_)) }

    fn partitioned_restrictions(&self) -> (Vec<&Restriction>, Vec<&Restriction>) {
        self.restrictions.iter().partition(|restriction| restriction.member_not_dpuz())
    }

    /// Commitment to this node
    ///
    /// # Arguments
    ///
    /// * `library` - Script primitives the layers are built from
    /// * `top_level` - `true` for the hash exposed on chain, `false` for
    ///   the hash a threshold commits to
    pub fn puzzle_hash(&self, library: &PuzzleLibrary, top_level: bool) -> Bytes32 {
        let mut inner = match &self.puzzle {
            InnerPuzzle::Member(member) => member.puzzle_hash(self.nonce),
            InnerPuzzle::MofN(threshold) => threshold.puzzle_hash(library),
        };

        if !self.restrictions.is_empty() {
            let (member_validators, dpuz_validators) = self.partitioned_restrictions();
            let hashes = |list: Vec<&Restriction>| -> Vec<Bytes32> {
                list.into_iter().map(|r| r.puzzle_hash(self.nonce)).collect()
            };
            inner = library.restrictions.curry_hash(&[
                hash_list(&hashes(member_validators)),
                hash_list(&hashes(dpuz_validators)),
                inner,
            ]);
        }

        inner = library.index_wrapper.curry_hash(&[hash_int(self.nonce.into()), inner]);

        if top_level {
            inner = library.delegated_puzzle_feeder.curry_hash(&[inner]);
        }
        inner
    }

    /// Library-independent fingerprint of the puzzle this node locks
    ///
    /// Commits to the nonce, the routed restriction hashes, and either the
    /// member's puzzle hash or the threshold's `m` with its members'
    /// fingerprints. Memos are not part of it, so nodes that would land on
    /// the same Merkle leaf share a fingerprint.
    pub(crate) fn identity(&self) -> Bytes32 {
        let inner = match &self.puzzle {
            InnerPuzzle::Member(member) => hash_list(&[hash_int(0), member.puzzle_hash(self.nonce)]),
            InnerPuzzle::MofN(threshold) => {
                let members: Vec<Bytes32> = threshold.members().iter().map(Self::identity).collect();
                hash_list(&[hash_int(1), hash_int(threshold.m() as i128), hash_list(&members)])
            }
        };

        let (member_validators, dpuz_validators) = self.partitioned_restrictions();
        let hashes = |list: Vec<&Restriction>| -> Vec<Bytes32> {
            list.into_iter().map(|r| r.puzzle_hash(self.nonce)).collect()
        };
        hash_list(&[
            hash_int(self.nonce.into()),
            hash_list(&hashes(member_validators)),
            hash_list(&hashes(dpuz_validators)),
            inner,
        ])
    }

    /// Full script of this node
    ///
    /// Fails with `NotReconstructable` if the member or any restriction is
    /// a placeholder. Threshold members may be placeholders since only
    /// their hashes are committed.
    pub fn puzzle_reveal(&self, library: &PuzzleLibrary, top_level: bool) -> Result<Program, PolicyError> {
        let mut inner = match &self.puzzle {
            InnerPuzzle::Member(member) => member.puzzle(self.nonce)?,
            InnerPuzzle::MofN(threshold) => threshold.puzzle(library),
        };

        if !self.restrictions.is_empty() {
            let (member_validators, dpuz_validators) = self.partitioned_restrictions();
            let reveals = |list: Vec<&Restriction>| -> Result<Program, PolicyError> {
                let puzzles = list
                    .into_iter()
                    .map(|r| r.puzzle(self.nonce))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Program::list(puzzles))
            };
            inner = library.restrictions.curry(&[
                reveals(member_validators)?,
                reveals(dpuz_validators)?,
                inner,
            ]);
        }

        inner = library.index_wrapper.curry(&[Program::int(self.nonce.into()), inner]);

        if top_level {
            inner = library.delegated_puzzle_feeder.curry(&[inner]);
        }
        Ok(inner)
    }

    /// Solution for [`PuzzleWithRestrictions::puzzle_reveal`]
    ///
    /// # Arguments
    ///
    /// * `member_validator_solutions` - One per member-gating restriction
    /// * `dpuz_validator_solutions` - One per delegated-puzzle restriction
    /// * `member_solution` - Solution for the member or threshold
    /// * `delegated` - The delegated payload; `Some` produces a top-level
    ///   solution, `None` one suitable for a threshold branch
    ///
    /// # Returns
    ///
    /// The solution, `ArityMismatch` if a solution list has the wrong
    /// length, or `NotReconstructable` if a node this spend runs is a
    /// placeholder.
    pub fn solve(
        &self,
        member_validator_solutions: &[Program],
        dpuz_validator_solutions: &[Program],
        member_solution: Program,
        delegated: Option<&DelegatedPayload>,
    ) -> Result<Program, PolicyError> {
        if let InnerPuzzle::Member(Member::Unknown(hint)) = &self.puzzle {
            return Err(PolicyError::NotReconstructable { puzzle_hash: hint.puzzle_hash });
        }
        if let Some(unknown) = self.restrictions.iter().find(|r| r.is_unknown()) {
            return Err(PolicyError::NotReconstructable { puzzle_hash: unknown.puzzle_hash(self.nonce) });
        }

        let (member_validators, dpuz_validators) = self.partitioned_restrictions();
        for (expected, actual) in [
            (member_validators.len(), member_validator_solutions.len()),
            (dpuz_validators.len(), dpuz_validator_solutions.len()),
        ] {
            if expected != actual {
                return Err(PolicyError::ArityMismatch { expected, actual });
            }
        }

        let mut solution = member_solution;
        if !self.restrictions.is_empty() {
            solution = Program::list([
                Program::list(member_validator_solutions.iter().cloned()),
                Program::list(dpuz_validator_solutions.iter().cloned()),
                solution,
            ]);
        }

        if let Some(payload) = delegated {
            solution = Program::list([payload.puzzle.clone(), payload.solution.clone(), solution]);
        }
        Ok(solution)
    }

    /// Packages this node's spend for an enclosing threshold
    ///
    /// Returns the key [`MofN::solve`] expects alongside the spend.
    pub fn proven_spend(
        &self,
        library: &PuzzleLibrary,
        member_validator_solutions: &[Program],
        dpuz_validator_solutions: &[Program],
        member_solution: Program,
    ) -> Result<(Bytes32, ProvenSpend), PolicyError> {
        let solution =
            self.solve(member_validator_solutions, dpuz_validator_solutions, member_solution, None)?;
        let puzzle_reveal = self.puzzle_reveal(library, false)?;
        Ok((self.puzzle_hash(library, false), ProvenSpend::new(puzzle_reveal, solution)))
    }

    /// Every placeholder in the tree, keyed by puzzle hash
    pub fn unknown_puzzles(&self) -> BTreeMap<Bytes32, UnknownPuzzle> {
        let mut unknown = BTreeMap::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            for restriction in &node.restrictions {
                if let Restriction::Unknown(hint) = restriction {
                    unknown.insert(hint.puzzle_hash, UnknownPuzzle::Restriction(hint.clone()));
                }
            }
            match &node.puzzle {
                InnerPuzzle::Member(Member::Unknown(hint)) => {
                    unknown.insert(hint.puzzle_hash, UnknownPuzzle::Member(hint.clone()));
                }
                InnerPuzzle::Member(Member::Concrete(_)) => {}
                InnerPuzzle::MofN(threshold) => stack.extend(threshold.members()),
            }
        }
        unknown
    }

    /// Returns a copy with every placeholder found in `known` replaced
    ///
    /// Placeholders missing from `known` are kept, so resolving in several
    /// passes reaches the same tree as resolving once. Fails with
    /// `VariantMismatch` if a member placeholder is offered a restriction
    /// or the other way round.
    pub fn fill_in_unknown_puzzles(
        &self,
        known: &BTreeMap<Bytes32, KnownPuzzle>,
    ) -> Result<Self, PolicyError> {
        let filled = self.fill_in(known)?;
        debug!(
            offered = known.len(),
            remaining = filled.unknown_puzzles().len(),
            "filled in unknown puzzles"
        );
        Ok(filled)
    }

    fn fill_in(&self, known: &BTreeMap<Bytes32, KnownPuzzle>) -> Result<Self, PolicyError> {
        let restrictions = self
            .restrictions
            .iter()
            .map(|restriction| match restriction {
                Restriction::Unknown(hint) => match known.get(&hint.puzzle_hash) {
                    Some(KnownPuzzle::Restriction(capability)) => {
                        Ok(Restriction::Concrete(capability.clone()))
                    }
                    Some(KnownPuzzle::Member(_)) => {
                        Err(PolicyError::VariantMismatch { puzzle_hash: hint.puzzle_hash })
                    }
                    None => Ok(restriction.clone()),
                },
                Restriction::Concrete(_) => Ok(restriction.clone()),
            })
            .collect::<Result<Vec<_>, _>>()?;

        let puzzle = match &self.puzzle {
            InnerPuzzle::Member(Member::Unknown(hint)) => match known.get(&hint.puzzle_hash) {
                Some(KnownPuzzle::Member(capability)) => {
                    InnerPuzzle::Member(Member::Concrete(capability.clone()))
                }
                Some(KnownPuzzle::Restriction(_)) => {
                    return Err(PolicyError::VariantMismatch { puzzle_hash: hint.puzzle_hash })
                }
                None => self.puzzle.clone(),
            },
            InnerPuzzle::Member(Member::Concrete(_)) => self.puzzle.clone(),
            InnerPuzzle::MofN(threshold) => {
                let members = threshold
                    .members()
                    .iter()
                    .map(|member| member.fill_in(known))
                    .collect::<Result<Vec<_>, _>>()?;
                InnerPuzzle::MofN(threshold.with_members(members))
            }
        };

        Ok(Self { nonce: self.nonce, restrictions, puzzle })
    }

    /// Resolves placeholders with the decoders in `registry`
    ///
    /// A decoded capability is only used when it reproduces the
    /// placeholder's hash at the placeholder's nonce.
    pub fn resolve_with(&self, registry: &CapabilityRegistry) -> Result<Self, PolicyError> {
        let mut known = BTreeMap::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            for restriction in &node.restrictions {
                if let Restriction::Unknown(hint) = restriction {
                    if let Some(capability) = registry.decode_restriction(hint, node.nonce) {
                        known.insert(hint.puzzle_hash, KnownPuzzle::Restriction(capability));
                    }
                }
            }
            match &node.puzzle {
                InnerPuzzle::Member(Member::Unknown(hint)) => {
                    if let Some(capability) = registry.decode_member(hint, node.nonce) {
                        known.insert(hint.puzzle_hash, KnownPuzzle::Member(capability));
                    }
                }
                InnerPuzzle::Member(Member::Concrete(_)) => {}
                InnerPuzzle::MofN(threshold) => stack.extend(threshold.members()),
            }
        }
        self.fill_in_unknown_puzzles(&known)
    }
}
