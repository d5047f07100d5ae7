//! Merkle trees over member puzzle hashes
//!
//! Threshold puzzles commit to their branches through a Merkle root so that
//! a spend reveals only the branches it uses. Leaves hash as atoms and
//! internal nodes as pairs, so the root is the tree hash of a balanced
//! binary tree of the leaf atoms.

use std::collections::BTreeMap;

use super::{hash_atom, hash_pair};
use crate::program::Program;
use crate::types::Bytes32;

/// Inclusion proof for a single leaf
///
/// Bit `i` of `path` is set when the node at level `i` (counted from the
/// leaf upward) is a right child; `siblings[i]` is the hash of its sibling.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MerkleProof {
    /// Left/right directions from leaf to root
    pub path: u64,
    /// Sibling hashes from leaf to root
    pub siblings: Vec<Bytes32>,
}

impl MerkleProof {
    /// Recomputes the root implied by this proof for `leaf`
    pub fn root_for(&self, leaf: &Bytes32) -> Bytes32 {
        let mut current = hash_atom(leaf);
        for (level, sibling) in self.siblings.iter().enumerate() {
            current = if (self.path >> level) & 1 == 1 {
                hash_pair(sibling, &current)
            } else {
                hash_pair(&current, sibling)
            };
        }
        current
    }

    /// Encodes the proof as `(path . (sibling ...))`
    pub fn to_program(&self) -> Program {
        Program::pair(
            Program::int(i128::from(self.path)),
            Program::list(self.siblings.iter().map(|s| Program::atom(*s))),
        )
    }
}

#[derive(Clone, Debug)]
enum MerkleNode {
    Empty,
    Leaf { value: Bytes32, hash: Bytes32 },
    Branch { hash: Bytes32, left: Box<MerkleNode>, right: Box<MerkleNode> },
}

impl MerkleNode {
    fn hash(&self) -> Bytes32 {
        match self {
            MerkleNode::Empty => hash_atom(&[]),
            MerkleNode::Leaf { hash, .. } | MerkleNode::Branch { hash, .. } => *hash,
        }
    }
}

/// Balanced Merkle tree with precomputed inclusion proofs
#[derive(Clone, Debug)]
pub struct MerkleTree {
    node: MerkleNode,
    proofs: BTreeMap<Bytes32, MerkleProof>,
}

impl MerkleTree {
    /// Builds the tree, splitting each range at `(len + 1) / 2`
    pub fn new(leaves: &[Bytes32]) -> Self {
        if leaves.is_empty() {
            return Self { node: MerkleNode::Empty, proofs: BTreeMap::new() };
        }
        let (node, proofs) = build(leaves);
        Self { node, proofs }
    }

    /// Root commitment
    pub fn root(&self) -> Bytes32 { self.node.hash() }

    /// Inclusion proof for `leaf`, if it is in the tree
    pub fn proof(&self, leaf: &Bytes32) -> Option<&MerkleProof> { self.proofs.get(leaf) }

    /// Builds a proof revealing several leaves at once
    ///
    /// An untouched subtree collapses to the atom of its root, a revealed
    /// leaf becomes `(() . payload)` and a branch with revealed descendants
    /// becomes `(left . right)`. `reveals` maps leaf values to payloads.
    pub fn multi_proof(&self, reveals: &BTreeMap<Bytes32, Program>) -> Program {
        multi_proof_node(&self.node, reveals).0
    }

    /// Recomputes the root of a multi-proof and collects its revealed payloads
    ///
    /// `leaf_of` maps a revealed payload to the leaf value it stands for.
    /// Returns `None` when the proof is not well formed.
    pub fn verify_multi_proof<F>(proof: &Program, leaf_of: F) -> Option<(Bytes32, Vec<Program>)>
    where
        F: Fn(&Program) -> Option<Bytes32>,
    {
        enum Op<'a> {
            Visit(&'a Program),
            Combine,
        }

        let mut ops = vec![Op::Visit(proof)];
        let mut hashes: Vec<Bytes32> = Vec::new();
        let mut revealed = Vec::new();
        while let Some(op) = ops.pop() {
            match op {
                Op::Visit(node) => match node.as_pair() {
                    None => hashes.push(node.bytes32_value().ok()?),
                    Some((marker, payload)) if marker.is_nil() => {
                        hashes.push(hash_atom(&leaf_of(payload)?));
                        revealed.push(payload.clone());
                    }
                    Some((left, right)) => {
                        ops.push(Op::Combine);
                        ops.push(Op::Visit(right));
                        ops.push(Op::Visit(left));
                    }
                },
                Op::Combine => {
                    let right = hashes.pop()?;
                    let left = hashes.pop()?;
                    hashes.push(hash_pair(&left, &right));
                }
            }
        }
        Some((hashes.pop()?, revealed))
    }
}

fn build(leaves: &[Bytes32]) -> (MerkleNode, BTreeMap<Bytes32, MerkleProof>) {
    if let [value] = leaves {
        let proof = MerkleProof { path: 0, siblings: Vec::new() };
        let node = MerkleNode::Leaf { value: *value, hash: hash_atom(value) };
        return (node, BTreeMap::from([(*value, proof)]));
    }

    let midpoint = (leaves.len() + 1) / 2;
    let (left, left_proofs) = build(&leaves[..midpoint]);
    let (right, right_proofs) = build(&leaves[midpoint..]);
    let (left_hash, right_hash) = (left.hash(), right.hash());

    let mut proofs = BTreeMap::new();
    for (leaf, mut proof) in left_proofs {
        proof.siblings.push(right_hash);
        proofs.entry(leaf).or_insert(proof);
    }
    for (leaf, mut proof) in right_proofs {
        proof.path |= 1 << proof.siblings.len();
        proof.siblings.push(left_hash);
        proofs.entry(leaf).or_insert(proof);
    }

    let hash = hash_pair(&left_hash, &right_hash);
    (MerkleNode::Branch { hash, left: Box::new(left), right: Box::new(right) }, proofs)
}

fn multi_proof_node(node: &MerkleNode, reveals: &BTreeMap<Bytes32, Program>) -> (Program, bool) {
    match node {
        MerkleNode::Leaf { value, hash } => match reveals.get(value) {
            Some(payload) => (Program::pair(Program::nil(), payload.clone()), true),
            None => (Program::atom(*hash), false),
        },
        MerkleNode::Branch { hash, left, right } => {
            let (left_proof, left_touched) = multi_proof_node(left, reveals);
            let (right_proof, right_touched) = multi_proof_node(right, reveals);
            if left_touched || right_touched {
                (Program::pair(left_proof, right_proof), true)
            } else {
                (Program::atom(*hash), false)
            }
        }
        MerkleNode::Empty => (Program::atom(node.hash()), false),
    }
}
