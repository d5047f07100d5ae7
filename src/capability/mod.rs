//! Policy building blocks
//!
//! Every node of a policy tree implements [`Capability`]: it can describe
//! itself as an opaque memo, produce its script, and commit to that script.
//! Members are terminal authorizers; restrictions wrap a member and either
//! gate its conditions or gate the delegated puzzle.
//!
//! Both families are closed enums with an `Unknown` arm holding the hint
//! decoded from chain data. A placeholder can be hashed but never spent.
//! New concrete variants plug in through the `Concrete` arm and, for
//! decoding, through [`CapabilityRegistry`].

mod members;
mod registry;
mod restrictions;

use std::fmt;
use std::sync::Arc;

pub use members::{BlsMember, FixedPuzzleMember, SingletonMember};
pub use registry::{CapabilityRegistry, MemberDecoder, RestrictionDecoder};
pub use restrictions::{CurriedRestriction, TimelockRestriction};

use crate::errors::PolicyError;
use crate::program::Program;
use crate::types::{Bytes32, Nonce};

/// The contract every policy node implements
///
/// For concrete nodes `puzzle_hash(nonce)` must equal the tree hash of
/// `puzzle(nonce)`. `nonce` is the enclosing tree's nonce.
pub trait Capability: fmt::Debug + Send + Sync {
    /// Opaque payload describing this node's configuration
    fn memo(&self, nonce: Nonce) -> Program;

    /// Full script of this node
    fn puzzle(&self, nonce: Nonce) -> Result<Program, PolicyError>;

    /// Commitment to this node's script
    fn puzzle_hash(&self, nonce: Nonce) -> Bytes32;
}

/// A capability that wraps a member
pub trait RestrictionCapability: Capability {
    /// `true` when this restriction validates the member's conditions,
    /// `false` when it validates the delegated puzzle
    fn member_not_dpuz(&self) -> bool;
}

/// Hint for a member: its hash and opaque memo
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PuzzleHint {
    /// Member puzzle hash
    pub puzzle_hash: Bytes32,
    /// Type-specific memo
    pub memo: Program,
}

/// Hint for a restriction: routing flag, hash and opaque memo
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RestrictionHint {
    /// Whether the restriction gates the member path
    pub member_not_dpuz: bool,
    /// Restriction puzzle hash
    pub puzzle_hash: Bytes32,
    /// Type-specific memo
    pub memo: Program,
}

/// A terminal authorizer, or a placeholder for one
#[derive(Clone, Debug)]
pub enum Member {
    /// A member whose script is known locally
    Concrete(Arc<dyn Capability>),
    /// A member known only by its hint
    Unknown(PuzzleHint),
}

impl Member {
    /// Wraps a concrete capability
    pub fn concrete(capability: impl Capability + 'static) -> Self {
        Member::Concrete(Arc::new(capability))
    }

    /// Placeholder built from a hint
    pub fn unknown(puzzle_hash: Bytes32, memo: Program) -> Self {
        Member::Unknown(PuzzleHint { puzzle_hash, memo })
    }

    /// Opaque payload describing this member
    pub fn memo(&self, nonce: Nonce) -> Program {
        match self {
            Member::Concrete(capability) => capability.memo(nonce),
            Member::Unknown(hint) => hint.memo.clone(),
        }
    }

    /// Script of this member
    ///
    /// # Errors
    ///
    /// Returns `NotReconstructable` for a placeholder.
    pub fn puzzle(&self, nonce: Nonce) -> Result<Program, PolicyError> {
        match self {
            Member::Concrete(capability) => capability.puzzle(nonce),
            Member::Unknown(hint) => {
                Err(PolicyError::NotReconstructable { puzzle_hash: hint.puzzle_hash })
            }
        }
    }

    /// Commitment to this member
    pub fn puzzle_hash(&self, nonce: Nonce) -> Bytes32 {
        match self {
            Member::Concrete(capability) => capability.puzzle_hash(nonce),
            Member::Unknown(hint) => hint.puzzle_hash,
        }
    }

    /// Whether this is a placeholder
    pub fn is_unknown(&self) -> bool { matches!(self, Member::Unknown(_)) }
}

impl PartialEq for Member {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Member::Concrete(a), Member::Concrete(b)) => same_capability(&**a, &**b),
            (Member::Unknown(a), Member::Unknown(b)) => a == b,
            _ => false,
        }
    }
}

/// A wrapper around a member, or a placeholder for one
#[derive(Clone, Debug)]
pub enum Restriction {
    /// A restriction whose script is known locally
    Concrete(Arc<dyn RestrictionCapability>),
    /// A restriction known only by its hint
    Unknown(RestrictionHint),
}

impl Restriction {
    /// Wraps a concrete restriction
    pub fn concrete(capability: impl RestrictionCapability + 'static) -> Self {
        Restriction::Concrete(Arc::new(capability))
    }

    /// Placeholder built from a hint
    pub fn unknown(member_not_dpuz: bool, puzzle_hash: Bytes32, memo: Program) -> Self {
        Restriction::Unknown(RestrictionHint { member_not_dpuz, puzzle_hash, memo })
    }

    /// Whether this restriction gates the member path
    pub fn member_not_dpuz(&self) -> bool {
        match self {
            Restriction::Concrete(capability) => capability.member_not_dpuz(),
            Restriction::Unknown(hint) => hint.member_not_dpuz,
        }
    }

    /// Opaque payload describing this restriction
    pub fn memo(&self, nonce: Nonce) -> Program {
        match self {
            Restriction::Concrete(capability) => capability.memo(nonce),
            Restriction::Unknown(hint) => hint.memo.clone(),
        }
    }

    /// Script of this restriction
    ///
    /// # Errors
    ///
    /// Returns `NotReconstructable` for a placeholder.
    pub fn puzzle(&self, nonce: Nonce) -> Result<Program, PolicyError> {
        match self {
            Restriction::Concrete(capability) => capability.puzzle(nonce),
            Restriction::Unknown(hint) => {
                Err(PolicyError::NotReconstructable { puzzle_hash: hint.puzzle_hash })
            }
        }
    }

    /// Commitment to this restriction
    pub fn puzzle_hash(&self, nonce: Nonce) -> Bytes32 {
        match self {
            Restriction::Concrete(capability) => capability.puzzle_hash(nonce),
            Restriction::Unknown(hint) => hint.puzzle_hash,
        }
    }

    /// Hint describing this restriction
    pub fn hint(&self, nonce: Nonce) -> RestrictionHint {
        match self {
            Restriction::Concrete(capability) => RestrictionHint {
                member_not_dpuz: capability.member_not_dpuz(),
                puzzle_hash: capability.puzzle_hash(nonce),
                memo: capability.memo(nonce),
            },
            Restriction::Unknown(hint) => hint.clone(),
        }
    }

    /// Whether this is a placeholder
    pub fn is_unknown(&self) -> bool { matches!(self, Restriction::Unknown(_)) }
}

impl PartialEq for Restriction {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Restriction::Concrete(a), Restriction::Concrete(b)) => {
                a.member_not_dpuz() == b.member_not_dpuz() && same_capability(&**a, &**b)
            }
            (Restriction::Unknown(a), Restriction::Unknown(b)) => a == b,
            _ => false,
        }
    }
}

// Concrete nodes are equal when they are the same allocation or commit to
// the same script with the same memo.
fn same_capability<A, B>(a: &A, b: &B) -> bool
where
    A: Capability + ?Sized,
    B: Capability + ?Sized,
{
    std::ptr::addr_eq(a as *const A, b as *const B)
        || (a.puzzle_hash(0) == b.puzzle_hash(0) && a.memo(0) == b.memo(0))
}

/// A concrete capability offered to resolve a placeholder
#[derive(Clone, Debug)]
pub enum KnownPuzzle {
    /// Resolves a member placeholder
    Member(Arc<dyn Capability>),
    /// Resolves a restriction placeholder
    Restriction(Arc<dyn RestrictionCapability>),
}

impl KnownPuzzle {
    /// Wraps a concrete member
    pub fn member(capability: impl Capability + 'static) -> Self {
        KnownPuzzle::Member(Arc::new(capability))
    }

    /// Wraps a concrete restriction
    pub fn restriction(capability: impl RestrictionCapability + 'static) -> Self {
        KnownPuzzle::Restriction(Arc::new(capability))
    }
}

/// An unresolved placeholder found in a tree
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UnknownPuzzle {
    /// Unresolved member
    Member(PuzzleHint),
    /// Unresolved restriction
    Restriction(RestrictionHint),
}

impl UnknownPuzzle {
    /// Hash the placeholder commits to
    pub fn puzzle_hash(&self) -> Bytes32 {
        match self {
            UnknownPuzzle::Member(hint) => hint.puzzle_hash,
            UnknownPuzzle::Restriction(hint) => hint.puzzle_hash,
        }
    }

    /// Memo the placeholder carries
    pub fn memo(&self) -> &Program {
        match self {
            UnknownPuzzle::Member(hint) => &hint.memo,
            UnknownPuzzle::Restriction(hint) => &hint.memo,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_member_cannot_reconstruct() {
        let member = Member::unknown([4u8; 32], Program::int(9));
        assert_eq!(member.puzzle_hash(0), [4u8; 32]);
        assert_eq!(member.memo(7), Program::int(9));
        assert_eq!(
            member.puzzle(0),
            Err(PolicyError::NotReconstructable { puzzle_hash: [4u8; 32] })
        );
        assert!(member.is_unknown());
    }

    #[test]
    fn test_unknown_restriction_keeps_routing() {
        let restriction = Restriction::unknown(true, [5u8; 32], Program::nil());
        assert!(restriction.member_not_dpuz());
        assert_eq!(restriction.puzzle_hash(3), [5u8; 32]);
        assert_eq!(
            restriction.puzzle(3),
            Err(PolicyError::NotReconstructable { puzzle_hash: [5u8; 32] })
        );
        assert_eq!(
            restriction.hint(3),
            RestrictionHint { member_not_dpuz: true, puzzle_hash: [5u8; 32], memo: Program::nil() }
        );
    }

    #[test]
    fn test_member_equality() {
        let a = Member::unknown([1u8; 32], Program::nil());
        let b = Member::unknown([1u8; 32], Program::nil());
        let c = Member::unknown([1u8; 32], Program::int(1));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_unknown_puzzle_accessors() {
        let unknown = UnknownPuzzle::Restriction(RestrictionHint {
            member_not_dpuz: false,
            puzzle_hash: [8u8; 32],
            memo: Program::int(2),
        });
        assert_eq!(unknown.puzzle_hash(), [8u8; 32]);
        assert_eq!(unknown.memo(), &Program::int(2));
    }
}
