use std::fmt;
use std::sync::Arc;

use tracing::trace;

use super::{Capability, PuzzleHint, RestrictionCapability, RestrictionHint};
use crate::program::Program;
use crate::types::Nonce;

/// Turns a member memo back into a concrete capability
pub trait MemberDecoder: Send + Sync {
    /// Returns `None` when the memo is not recognized
    fn decode_member(&self, memo: &Program) -> Option<Arc<dyn Capability>>;
}

impl<F> MemberDecoder for F
where
    F: Fn(&Program) -> Option<Arc<dyn Capability>> + Send + Sync,
{
    fn decode_member(&self, memo: &Program) -> Option<Arc<dyn Capability>> { self(memo) }
}

/// Turns a restriction memo back into a concrete restriction
pub trait RestrictionDecoder: Send + Sync {
    /// Returns `None` when the memo is not recognized
    fn decode_restriction(
        &self,
        member_not_dpuz: bool,
        memo: &Program,
    ) -> Option<Arc<dyn RestrictionCapability>>;
}

impl<F> RestrictionDecoder for F
where
    F: Fn(bool, &Program) -> Option<Arc<dyn RestrictionCapability>> + Send + Sync,
{
    fn decode_restriction(
        &self,
        member_not_dpuz: bool,
        memo: &Program,
    ) -> Option<Arc<dyn RestrictionCapability>> {
        self(member_not_dpuz, memo)
    }
}

/// Ordered set of decoders consulted when resolving placeholders
///
/// A candidate is only accepted when it commits to the placeholder's hash,
/// so registering a decoder can never change a tree's commitment.
#[derive(Default)]
pub struct CapabilityRegistry {
    members: Vec<Box<dyn MemberDecoder>>,
    restrictions: Vec<Box<dyn RestrictionDecoder>>,
}

impl CapabilityRegistry {
    /// Empty registry
    pub fn new() -> Self { Self::default() }

    /// Adds a member decoder
    pub fn with_member(mut self, decoder: impl MemberDecoder + 'static) -> Self {
        self.members.push(Box::new(decoder));
        self
    }

    /// Adds a restriction decoder
    pub fn with_restriction(mut self, decoder: impl RestrictionDecoder + 'static) -> Self {
        self.restrictions.push(Box::new(decoder));
        self
    }

    /// First registered member matching `hint` at `nonce`
    pub fn decode_member(&self, hint: &PuzzleHint, nonce: Nonce) -> Option<Arc<dyn Capability>> {
        let found = self
            .members
            .iter()
            .filter_map(|decoder| decoder.decode_member(&hint.memo))
            .find(|candidate| candidate.puzzle_hash(nonce) == hint.puzzle_hash);
        trace!(puzzle_hash = %hex::encode(hint.puzzle_hash), found = found.is_some(), "decode member");
        found
    }

    /// First registered restriction matching `hint` at `nonce`
    pub fn decode_restriction(
        &self,
        hint: &RestrictionHint,
        nonce: Nonce,
    ) -> Option<Arc<dyn RestrictionCapability>> {
        let found = self
            .restrictions
            .iter()
            .filter_map(|decoder| decoder.decode_restriction(hint.member_not_dpuz, &hint.memo))
            .find(|candidate| {
                candidate.member_not_dpuz() == hint.member_not_dpuz
                    && candidate.puzzle_hash(nonce) == hint.puzzle_hash
            });
        trace!(puzzle_hash = %hex::encode(hint.puzzle_hash), found = found.is_some(), "decode restriction");
        found
    }
}

impl fmt::Debug for CapabilityRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapabilityRegistry")
            .field("members", &self.members.len())
            .field("restrictions", &self.restrictions.len())
            .finish()
    }
}
