//! Hash algebra over atom/pair trees
//!
//! These functions compute tree hashes without materializing the tree.
//! Leaves are domain separated from internal nodes (`0x01` vs `0x02`
//! prefix), and [`curry_commitment`] reproduces the exact cons shape of the
//! script engine's curry, so a policy can be committed to from member hashes
//! alone.

mod merkle;

use sha2::{Digest, Sha256};

pub use merkle::{MerkleProof, MerkleTree};

use crate::program::int_to_atom;
use crate::types::{Bytes32, APPLY_OPCODE, CONS_OPCODE, CURRY_ENV_TERMINATOR, QUOTE_OPCODE};

const ATOM_PREFIX: u8 = 0x01;
const PAIR_PREFIX: u8 = 0x02;

/// Hashes an atom: `sha256(0x01 || bytes)`
pub fn hash_atom(bytes: &[u8]) -> Bytes32 {
    let mut hasher = Sha256::new();
    hasher.update([ATOM_PREFIX]);
    hasher.update(bytes);
    hasher.finalize().into()
}

/// Hashes a pair from the hashes of its halves: `sha256(0x02 || left || right)`
pub fn hash_pair(left: &Bytes32, right: &Bytes32) -> Bytes32 {
    let mut hasher = Sha256::new();
    hasher.update([PAIR_PREFIX]);
    hasher.update(left);
    hasher.update(right);
    hasher.finalize().into()
}

/// Tree hash of a nil-terminated list of atoms
pub fn hash_atom_list<T: AsRef<[u8]>>(items: &[T]) -> Bytes32 {
    items
        .iter()
        .rev()
        .fold(hash_atom(&[]), |rest, item| hash_pair(&hash_atom(item.as_ref()), &rest))
}

/// Tree hash of a nil-terminated list whose elements are already hashed
pub fn hash_list(element_hashes: &[Bytes32]) -> Bytes32 {
    element_hashes.iter().rev().fold(hash_atom(&[]), |rest, item| hash_pair(item, &rest))
}

/// Tree hash of an integer atom in the script engine's canonical encoding
pub fn hash_int(value: i128) -> Bytes32 { hash_atom(&int_to_atom(value)) }

/// Tree hash of `(q . mod)` given the mod's tree hash
pub fn hash_quoted_mod(mod_hash: &Bytes32) -> Bytes32 {
    hash_pair(&hash_atom(QUOTE_OPCODE), mod_hash)
}

/// Tree hash of a mod curried with arguments, from hashes only
///
/// `quoted_mod_hash` is [`hash_quoted_mod`] of the mod and `hashed_args` are
/// the tree hashes of the arguments in curry order. The result equals the
/// tree hash of `(a (q . MOD) (c (q . arg1) (c (q . arg2) ... 1)))`.
pub fn curry_commitment(quoted_mod_hash: &Bytes32, hashed_args: &[Bytes32]) -> Bytes32 {
    let nil = hash_atom(&[]);
    let quote = hash_atom(QUOTE_OPCODE);
    let cons = hash_atom(CONS_OPCODE);

    let mut env = hash_atom(CURRY_ENV_TERMINATOR);
    for arg in hashed_args.iter().rev() {
        let quoted_arg = hash_pair(&quote, arg);
        env = hash_pair(&cons, &hash_pair(&quoted_arg, &hash_pair(&env, &nil)));
    }

    hash_pair(
        &hash_atom(APPLY_OPCODE),
        &hash_pair(quoted_mod_hash, &hash_pair(&env, &nil)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::Program;

    #[test]
    fn test_hash_atom_matches_tree_hash() {
        for bytes in [vec![], vec![0x42], vec![0x5a; 1000]] {
            assert_eq!(hash_atom(&bytes), Program::atom(bytes.clone()).tree_hash());
        }
    }

    #[test]
    fn test_quote_opcode_hash() {
        assert_eq!(
            hex::encode(hash_atom(QUOTE_OPCODE)),
            "9dcf97a184f32623d11a73124ceb99a5709b083721e878a16d78f596718ba7b2"
        );
    }

    #[test]
    fn test_hash_int_matches_tree_hash() {
        for value in [0, -1, 1, 0x7f, 0x80, 100_000_000, -10_000_000] {
            assert_eq!(hash_int(value), Program::int(value).tree_hash(), "int {value}");
        }
    }

    #[test]
    fn test_hash_atom_list_matches_tree_hash() {
        let cases: Vec<Vec<Vec<u8>>> = vec![
            vec![],
            vec![b"one".to_vec()],
            vec![b"one".to_vec(), b"two".to_vec()],
            vec![vec![], vec![0x01], vec![0xff; 33], b"mixed".to_vec()],
        ];
        for items in cases {
            let program = Program::list(items.iter().map(|item| Program::atom(item.clone())));
            assert_eq!(hash_atom_list(&items), program.tree_hash());
        }
    }

    #[test]
    fn test_hash_list_of_hashes() {
        let first = Program::list([Program::int(1), Program::int(2)]);
        let second = Program::atom(b"leaf".as_slice());
        let list = Program::list([first.clone(), second.clone()]);
        assert_eq!(hash_list(&[first.tree_hash(), second.tree_hash()]), list.tree_hash());
        assert_eq!(hash_list(&[]), Program::nil().tree_hash());
    }

    #[test]
    fn test_curry_commitment_matches_materialized_curry() {
        let puzzle_mod = Program::list([Program::int(2), Program::int(5), Program::int(11)]);
        let args = [Program::int(7), Program::atom([3u8; 32]), Program::list([Program::nil()])];
        let hashes: Vec<Bytes32> = args.iter().map(Program::tree_hash).collect();

        let quoted = hash_quoted_mod(&puzzle_mod.tree_hash());
        assert_eq!(curry_commitment(&quoted, &hashes), puzzle_mod.curry(&args).tree_hash());
        assert_eq!(curry_commitment(&quoted, &[]), puzzle_mod.curry(&[]).tree_hash());
    }

    #[test]
    fn test_curry_commitment_order_sensitive() {
        let quoted = hash_quoted_mod(&[1u8; 32]);
        let a = [2u8; 32];
        let b = [3u8; 32];
        assert_ne!(curry_commitment(&quoted, &[a, b]), curry_commitment(&quoted, &[b, a]));
    }
}
