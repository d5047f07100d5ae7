use std::sync::Arc;

use clvm_traits::{FromClvm, ToClvm};

use super::registry::MemberDecoder;
use super::Capability;
use crate::errors::PolicyError;
use crate::hash::hash_atom;
use crate::program::{FixedAtom, HashAtom, Program};
use crate::puzzles::PuzzleMod;
use crate::types::{Bytes32, Nonce, BLS_PUBLIC_KEY_LEN};

/// Authorizes with a BLS signature from one public key
///
/// Curried as `MOD(public_key)`; memo is `(public_key)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlsMember {
    puzzle_mod: PuzzleMod,
    public_key: [u8; BLS_PUBLIC_KEY_LEN],
}

impl BlsMember {
    /// Creates a member for `public_key` over the given signature mod
    pub fn new(puzzle_mod: PuzzleMod, public_key: [u8; BLS_PUBLIC_KEY_LEN]) -> Self {
        Self { puzzle_mod, public_key }
    }

    /// Compressed G1 public key
    pub fn public_key(&self) -> &[u8; BLS_PUBLIC_KEY_LEN] { &self.public_key }

    /// Rebuilds the member from its memo
    pub fn from_memo(puzzle_mod: PuzzleMod, memo: &Program) -> Option<Self> {
        let AtomMemo { value: FixedAtom(public_key) } = memo.decode().ok()?;
        Some(Self::new(puzzle_mod, public_key))
    }

    /// Decoder recognizing memos produced by this member type
    pub fn decoder(puzzle_mod: PuzzleMod) -> impl MemberDecoder {
        move |memo: &Program| {
            Self::from_memo(puzzle_mod.clone(), memo).map(|m| Arc::new(m) as Arc<dyn Capability>)
        }
    }
}

impl Capability for BlsMember {
    fn memo(&self, _nonce: Nonce) -> Program { Program::list([Program::atom(self.public_key)]) }

    fn puzzle(&self, _nonce: Nonce) -> Result<Program, PolicyError> {
        Ok(self.puzzle_mod.curry(&[Program::atom(self.public_key)]))
    }

    fn puzzle_hash(&self, _nonce: Nonce) -> Bytes32 {
        self.puzzle_mod.curry_hash(&[hash_atom(&self.public_key)])
    }
}

/// Authorizes when a singleton with a given launcher id approves
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SingletonMember {
    puzzle_mod: PuzzleMod,
    launcher_id: Bytes32,
}

impl SingletonMember {
    /// Creates a member for the singleton launched by `launcher_id`
    pub fn new(puzzle_mod: PuzzleMod, launcher_id: Bytes32) -> Self {
        Self { puzzle_mod, launcher_id }
    }

    /// Launcher id of the approving singleton
    pub fn launcher_id(&self) -> Bytes32 { self.launcher_id }

    /// Rebuilds the member from its memo
    pub fn from_memo(puzzle_mod: PuzzleMod, memo: &Program) -> Option<Self> {
        let AtomMemo::<HashAtom> { value: FixedAtom(launcher_id) } = memo.decode().ok()?;
        Some(Self::new(puzzle_mod, launcher_id))
    }

    /// Decoder recognizing memos produced by this member type
    pub fn decoder(puzzle_mod: PuzzleMod) -> impl MemberDecoder {
        move |memo: &Program| {
            Self::from_memo(puzzle_mod.clone(), memo).map(|m| Arc::new(m) as Arc<dyn Capability>)
        }
    }
}

impl Capability for SingletonMember {
    fn memo(&self, _nonce: Nonce) -> Program { Program::list([Program::atom(self.launcher_id)]) }

    fn puzzle(&self, _nonce: Nonce) -> Result<Program, PolicyError> {
        Ok(self.puzzle_mod.curry(&[Program::atom(self.launcher_id)]))
    }

    fn puzzle_hash(&self, _nonce: Nonce) -> Bytes32 {
        self.puzzle_mod.curry_hash(&[hash_atom(&self.launcher_id)])
    }
}

/// Authorizes by revealing a puzzle whose hash is committed in advance
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FixedPuzzleMember {
    puzzle_mod: PuzzleMod,
    fixed_puzzle_hash: Bytes32,
}

impl FixedPuzzleMember {
    /// Creates a member that accepts the puzzle hashing to `fixed_puzzle_hash`
    pub fn new(puzzle_mod: PuzzleMod, fixed_puzzle_hash: Bytes32) -> Self {
        Self { puzzle_mod, fixed_puzzle_hash }
    }

    /// Hash of the puzzle that must be revealed
    pub fn fixed_puzzle_hash(&self) -> Bytes32 { self.fixed_puzzle_hash }

    /// Rebuilds the member from its memo
    pub fn from_memo(puzzle_mod: PuzzleMod, memo: &Program) -> Option<Self> {
        let AtomMemo::<HashAtom> { value: FixedAtom(fixed_puzzle_hash) } = memo.decode().ok()?;
        Some(Self::new(puzzle_mod, fixed_puzzle_hash))
    }

    /// Decoder recognizing memos produced by this member type
    pub fn decoder(puzzle_mod: PuzzleMod) -> impl MemberDecoder {
        move |memo: &Program| {
            Self::from_memo(puzzle_mod.clone(), memo).map(|m| Arc::new(m) as Arc<dyn Capability>)
        }
    }
}

impl Capability for FixedPuzzleMember {
    fn memo(&self, _nonce: Nonce) -> Program {
        Program::list([Program::atom(self.fixed_puzzle_hash)])
    }

    fn puzzle(&self, _nonce: Nonce) -> Result<Program, PolicyError> {
        Ok(self.puzzle_mod.curry(&[Program::atom(self.fixed_puzzle_hash)]))
    }

    fn puzzle_hash(&self, _nonce: Nonce) -> Bytes32 {
        self.puzzle_mod.curry_hash(&[hash_atom(&self.fixed_puzzle_hash)])
    }
}

/// `(atom)`, shared by every single-key member
#[derive(ToClvm, FromClvm)]
#[clvm(list)]
struct AtomMemo<T> {
    value: T,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::test_library;

    #[test]
    fn test_bls_member_hash_matches_puzzle() {
        let library = test_library();
        let member = BlsMember::new(library.one_of_n.clone(), [0xab; BLS_PUBLIC_KEY_LEN]);
        let puzzle = member.puzzle(0).expect("concrete");
        assert_eq!(member.puzzle_hash(0), puzzle.tree_hash());
        assert_eq!(member.puzzle_hash(0), member.puzzle_hash(99));
    }

    #[test]
    fn test_bls_member_from_memo() {
        let library = test_library();
        let member = BlsMember::new(library.n_of_n.clone(), [7; BLS_PUBLIC_KEY_LEN]);
        let decoded = BlsMember::from_memo(library.n_of_n.clone(), &member.memo(0));
        assert_eq!(decoded, Some(member));

        let short = Program::list([Program::atom([7u8; 47])]);
        assert_eq!(BlsMember::from_memo(library.n_of_n.clone(), &short), None);
        let bare = Program::atom([7u8; BLS_PUBLIC_KEY_LEN]);
        assert_eq!(BlsMember::from_memo(library.n_of_n.clone(), &bare), None);
    }

    #[test]
    fn test_singleton_member_decoder() {
        let library = test_library();
        let member = SingletonMember::new(library.m_of_n.clone(), [3; 32]);
        let decoder = SingletonMember::decoder(library.m_of_n.clone());
        let decoded = decoder.decode_member(&member.memo(0)).expect("recognized");
        assert_eq!(decoded.puzzle_hash(0), member.puzzle_hash(0));
        assert!(decoder.decode_member(&Program::nil()).is_none());
    }

    #[test]
    fn test_fixed_puzzle_member_commits_to_hash() {
        let library = test_library();
        let a = FixedPuzzleMember::new(library.one_of_n.clone(), [1; 32]);
        let b = FixedPuzzleMember::new(library.one_of_n.clone(), [2; 32]);
        assert_ne!(a.puzzle_hash(0), b.puzzle_hash(0));
        assert_eq!(a.fixed_puzzle_hash(), [1; 32]);
        assert_eq!(a.puzzle(0).expect("concrete").tree_hash(), a.puzzle_hash(0));
    }
}
