//! Immutable program trees
//!
//! A [`Program`] is a binary tree whose leaves are byte strings (atoms) and
//! whose internal nodes are ordered pairs. Programs are shared by reference
//! count and never mutated in place, so a policy tree can be handed to many
//! threads at once.
//!
//! Serialization goes through a `clvmr` allocator and hashing through
//! `clvm-utils`, so both agree with the script engine byte for byte.
//! Conversion, hashing, equality and drop walk the tree with explicit
//! stacks. Programs decoded from chain data may be arbitrarily deep and must
//! not be able to exhaust the call stack.

mod clvm;
mod serialize;

use std::convert::Infallible;
use std::fmt;
use std::mem;
use std::sync::{Arc, LazyLock};

use clvm_utils::{tree_hash_atom, tree_hash_pair};

pub(crate) use clvm::{FixedAtom, HashAtom};

use crate::errors::ProgramError;
use crate::types::{Bytes32, APPLY_OPCODE, CONS_OPCODE, CURRY_ENV_TERMINATOR, QUOTE_OPCODE};

static NIL: LazyLock<Program> = LazyLock::new(|| Program(Arc::new(Node::Atom(Vec::new()))));

/// An immutable, cheaply cloneable atom/pair tree
#[derive(Clone)]
pub struct Program(Arc<Node>);

enum Node {
    Atom(Vec<u8>),
    Pair(Program, Program),
}

impl Drop for Node {
    fn drop(&mut self) {
        let Node::Pair(first, rest) = self else { return };
        if Arc::strong_count(&first.0) > 1 && Arc::strong_count(&rest.0) > 1 {
            return;
        }

        let mut pending = vec![mem::replace(first, Program::nil()), mem::replace(rest, Program::nil())];
        while let Some(program) = pending.pop() {
            if let Ok(mut node) = Arc::try_unwrap(program.0) {
                if let Node::Pair(first, rest) = &mut node {
                    pending.push(mem::replace(first, Program::nil()));
                    pending.push(mem::replace(rest, Program::nil()));
                }
            }
        }
    }
}

impl Program {
    /// The empty atom, which doubles as the list terminator and `false`
    pub fn nil() -> Self { NIL.clone() }

    /// Creates an atom
    pub fn atom(bytes: impl Into<Vec<u8>>) -> Self {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Self::nil();
        }
        Program(Arc::new(Node::Atom(bytes)))
    }

    /// Creates a pair `(first . rest)`
    pub fn pair(first: Program, rest: Program) -> Self { Program(Arc::new(Node::Pair(first, rest))) }

    /// Creates a nil-terminated list
    pub fn list<I>(items: I) -> Self
    where
        I: IntoIterator<Item = Program>,
        I::IntoIter: DoubleEndedIterator,
    {
        items.into_iter().rev().fold(Self::nil(), |rest, item| Self::pair(item, rest))
    }

    /// Creates an integer atom using the script engine's canonical encoding
    pub fn int(value: i128) -> Self { Self::atom(int_to_atom(value)) }

    /// Creates a boolean atom (`1` or nil)
    pub fn bool(value: bool) -> Self {
        if value {
            Self::atom([1u8])
        } else {
            Self::nil()
        }
    }

    /// Returns the atom bytes, or `None` for a pair
    pub fn as_atom(&self) -> Option<&[u8]> {
        match &*self.0 {
            Node::Atom(bytes) => Some(bytes),
            Node::Pair(..) => None,
        }
    }

    /// Returns both halves of a pair, or `None` for an atom
    pub fn as_pair(&self) -> Option<(&Program, &Program)> {
        match &*self.0 {
            Node::Atom(_) => None,
            Node::Pair(first, rest) => Some((first, rest)),
        }
    }

    /// Whether this is the empty atom
    pub fn is_nil(&self) -> bool { self.as_atom().is_some_and(<[u8]>::is_empty) }

    /// Whether this is a pair
    pub fn is_pair(&self) -> bool { self.as_pair().is_some() }

    /// First half of a pair
    pub fn first(&self) -> Result<&Program, ProgramError> {
        self.as_pair().map(|(first, _)| first).ok_or(ProgramError::ExpectedPair)
    }

    /// Second half of a pair
    pub fn rest(&self) -> Result<&Program, ProgramError> {
        self.as_pair().map(|(_, rest)| rest).ok_or(ProgramError::ExpectedPair)
    }

    /// Atom bytes, failing on a pair
    pub fn atom_value(&self) -> Result<&[u8], ProgramError> {
        self.as_atom().ok_or(ProgramError::ExpectedAtom)
    }

    /// Elements of a nil-terminated list
    pub fn list_items(&self) -> Result<Vec<Program>, ProgramError> {
        let mut items = Vec::new();
        let mut cursor = self;
        while let Some((first, rest)) = cursor.as_pair() {
            items.push(first.clone());
            cursor = rest;
        }
        if !cursor.is_nil() {
            return Err(ProgramError::ImproperList);
        }
        Ok(items)
    }

    /// Signed integer value of an atom (at most 16 bytes)
    pub fn int_value(&self) -> Result<i128, ProgramError> { atom_to_int(self.atom_value()?) }

    /// Non-negative integer value of an atom that fits in a `u64`
    pub fn u64_value(&self) -> Result<u64, ProgramError> {
        let bytes = self.atom_value()?;
        u64::try_from(atom_to_int(bytes)?)
            .map_err(|_| ProgramError::IntegerOutOfRange { len: bytes.len() })
    }

    /// Non-negative integer value of an atom that fits in a `usize`
    pub fn usize_value(&self) -> Result<usize, ProgramError> {
        let len = self.atom_value()?.len();
        usize::try_from(self.u64_value()?).map_err(|_| ProgramError::IntegerOutOfRange { len })
    }

    /// 32-byte atom value
    pub fn bytes32_value(&self) -> Result<Bytes32, ProgramError> {
        let bytes = self.atom_value()?;
        bytes.try_into().map_err(|_| ProgramError::InvalidHashLength { len: bytes.len() })
    }

    /// Truthiness of an atom: nil is false, anything else is true
    pub fn bool_value(&self) -> Result<bool, ProgramError> { Ok(!self.atom_value()?.is_empty()) }

    /// Computes the tree hash of this program
    ///
    /// Atoms hash as `sha256(0x01 || atom)` and pairs as
    /// `sha256(0x02 || first || rest)`, matching the script engine.
    pub fn tree_hash(&self) -> Bytes32 {
        let hash = self.fold(
            &mut (),
            |_, bytes| Ok::<_, Infallible>(tree_hash_atom(bytes)),
            |_, first, rest| Ok(tree_hash_pair(first, rest)),
        );
        match hash {
            Ok(hash) => hash.to_bytes(),
            Err(never) => match never {},
        }
    }

    /// Post-order fold over the tree
    ///
    /// `pair` receives the folded first and rest of every pair. No frame is
    /// popped without having been pushed, so the walk cannot underflow.
    fn fold<C, T, E>(
        &self,
        context: &mut C,
        mut atom: impl FnMut(&mut C, &[u8]) -> Result<T, E>,
        mut pair: impl FnMut(&mut C, T, T) -> Result<T, E>,
    ) -> Result<T, E> {
        enum Frame<'a, T> {
            Rest(&'a Program),
            First(T),
        }

        let mut frames = Vec::new();
        let mut node = self;
        loop {
            let mut value = loop {
                match &*node.0 {
                    Node::Pair(first, rest) => {
                        frames.push(Frame::Rest(rest));
                        node = first;
                    }
                    Node::Atom(bytes) => break atom(context, bytes)?,
                }
            };
            loop {
                match frames.pop() {
                    None => return Ok(value),
                    Some(Frame::Rest(rest)) => {
                        frames.push(Frame::First(value));
                        node = rest;
                        break;
                    }
                    Some(Frame::First(first)) => value = pair(context, first, value)?,
                }
            }
        }
    }

    /// Curries `args` into this program
    ///
    /// Produces `(a (q . self) (c (q . arg1) (c (q . arg2) ... 1)))`, the
    /// same shape as the script engine's native curry.
    pub fn curry(&self, args: &[Program]) -> Program {
        let mut env = Program::atom(CURRY_ENV_TERMINATOR);
        for arg in args.iter().rev() {
            env = Program::list([Program::atom(CONS_OPCODE), quote(arg.clone()), env]);
        }
        Program::list([Program::atom(APPLY_OPCODE), quote(self.clone()), env])
    }

    /// Splits a curried program back into its mod and arguments
    ///
    /// Returns `None` when the program does not have the exact curried shape.
    pub fn uncurry(&self) -> Option<(Program, Vec<Program>)> {
        let [apply, quoted_mod, mut env] = list3(self)?;
        if apply.as_atom()? != APPLY_OPCODE {
            return None;
        }
        let puzzle_mod = unquote(&quoted_mod)?;

        let mut args = Vec::new();
        while env.as_atom() != Some(CURRY_ENV_TERMINATOR) {
            let [cons, quoted_arg, rest] = list3(&env)?;
            if cons.as_atom()? != CONS_OPCODE {
                return None;
            }
            args.push(unquote(&quoted_arg)?);
            env = rest;
        }
        Some((puzzle_mod, args))
    }
}

fn quote(program: Program) -> Program { Program::pair(Program::atom(QUOTE_OPCODE), program) }

fn unquote(program: &Program) -> Option<Program> {
    let (op, value) = program.as_pair()?;
    (op.as_atom()? == QUOTE_OPCODE).then(|| value.clone())
}

fn list3(program: &Program) -> Option<[Program; 3]> {
    let items = program.list_items().ok()?;
    items.try_into().ok()
}

impl PartialEq for Program {
    fn eq(&self, other: &Self) -> bool {
        let mut pending = vec![(self, other)];
        while let Some((left, right)) = pending.pop() {
            if Arc::ptr_eq(&left.0, &right.0) {
                continue;
            }
            match (&*left.0, &*right.0) {
                (Node::Atom(a), Node::Atom(b)) => {
                    if a != b {
                        return false;
                    }
                }
                (Node::Pair(a_first, a_rest), Node::Pair(b_first, b_rest)) => {
                    pending.push((a_rest, b_rest));
                    pending.push((a_first, b_first));
                }
                _ => return false,
            }
        }
        true
    }
}

impl Eq for Program {}

impl fmt::Debug for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_hex() {
            Ok(hex) => write!(f, "Program({hex})"),
            Err(_) => write!(f, "Program(<oversized>)"),
        }
    }
}

impl Default for Program {
    fn default() -> Self { Self::nil() }
}

impl From<Bytes32> for Program {
    fn from(value: Bytes32) -> Self { Program::atom(value) }
}

/// Encodes an integer as the script engine's minimal signed big-endian atom
///
/// Zero is the empty atom. A leading `0x00` or `0xff` byte is kept only when
/// it is needed to preserve the sign, so `0x80` encodes as `00 80` and `-128`
/// encodes as `80`.
pub fn int_to_atom(value: i128) -> Vec<u8> {
    if value == 0 {
        return Vec::new();
    }
    let bytes = value.to_be_bytes();
    let mut start = 0;
    while start + 1 < bytes.len() {
        let (lead, next) = (bytes[start], bytes[start + 1]);
        let redundant =
            (lead == 0x00 && next & 0x80 == 0) || (lead == 0xff && next & 0x80 != 0);
        if !redundant {
            break;
        }
        start += 1;
    }
    bytes[start..].to_vec()
}

/// Decodes a signed big-endian integer atom of at most 16 bytes
pub fn atom_to_int(bytes: &[u8]) -> Result<i128, ProgramError> {
    if bytes.len() > 16 {
        return Err(ProgramError::IntegerOutOfRange { len: bytes.len() });
    }
    let negative = bytes.first().is_some_and(|lead| lead & 0x80 != 0);
    let mut value: i128 = if negative { -1 } else { 0 };
    for byte in bytes {
        value = (value << 8) | i128::from(*byte);
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::{hash_atom, hash_pair};

    #[test]
    fn test_int_encoding_boundaries() {
        assert_eq!(int_to_atom(0), Vec::<u8>::new());
        assert_eq!(int_to_atom(1), vec![0x01]);
        assert_eq!(int_to_atom(-1), vec![0xff]);
        assert_eq!(int_to_atom(0x7f), vec![0x7f]);
        assert_eq!(int_to_atom(0x80), vec![0x00, 0x80]);
        assert_eq!(int_to_atom(0xff), vec![0x00, 0xff]);
        assert_eq!(int_to_atom(-128), vec![0x80]);
        assert_eq!(int_to_atom(-129), vec![0xff, 0x7f]);
        assert_eq!(int_to_atom(100_000_000), vec![0x05, 0xf5, 0xe1, 0x00]);
        assert_eq!(int_to_atom(-10_000_000), vec![0xff, 0x67, 0x69, 0x80]);
    }

    #[test]
    fn test_int_decoding() {
        for value in [0, 1, -1, 0x7f, 0x80, -128, -129, 100_000_000, -10_000_000, i128::MAX, i128::MIN] {
            assert_eq!(atom_to_int(&int_to_atom(value)), Ok(value));
        }
        assert_eq!(atom_to_int(&[0x00, 0x00, 0x01]), Ok(1));
        assert_eq!(atom_to_int(&[0u8; 17]), Err(ProgramError::IntegerOutOfRange { len: 17 }));
    }

    #[test]
    fn test_list_items() {
        let list = Program::list([Program::int(1), Program::atom(b"two".as_slice())]);
        let items = list.list_items().expect("proper list");
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].int_value(), Ok(1));
        assert_eq!(items[1].as_atom(), Some(b"two".as_slice()));

        let improper = Program::pair(Program::int(1), Program::int(2));
        assert_eq!(improper.list_items(), Err(ProgramError::ImproperList));
    }

    #[test]
    fn test_value_accessors() {
        assert_eq!(Program::int(-1).u64_value(), Err(ProgramError::IntegerOutOfRange { len: 1 }));
        assert_eq!(Program::int(300).usize_value(), Ok(300));
        assert_eq!(Program::nil().bool_value(), Ok(false));
        assert_eq!(Program::bool(true).bool_value(), Ok(true));
        assert_eq!(
            Program::atom([1u8; 31]).bytes32_value(),
            Err(ProgramError::InvalidHashLength { len: 31 })
        );
        assert_eq!(Program::atom([7u8; 32]).bytes32_value(), Ok([7u8; 32]));
        assert_eq!(Program::list([Program::nil()]).atom_value(), Err(ProgramError::ExpectedAtom));
        assert_eq!(Program::nil().first(), Err(ProgramError::ExpectedPair));
    }

    #[test]
    fn test_nil_tree_hash() {
        #[rustfmt::skip]
        assert_eq!(
            Program::nil().tree_hash(),
            [
                0x4b, 0xf5, 0x12, 0x2f, 0x34, 0x45, 0x54, 0xc5,
                0x3b, 0xde, 0x2e, 0xbb, 0x8c, 0xd2, 0xb7, 0xe3,
                0xd1, 0x60, 0x0a, 0xd6, 0x31, 0xc3, 0x85, 0xa5,
                0xd7, 0xcc, 0xe2, 0x3c, 0x77, 0x85, 0x45, 0x9a,
            ]
        );
    }

    #[test]
    fn test_tree_hash_of_pair() {
        let program = Program::pair(Program::int(1), Program::nil());
        assert_eq!(program.tree_hash(), hash_pair(&hash_atom(&[1]), &hash_atom(&[])));
    }

    #[test]
    fn test_tree_hash_of_unbalanced_trees() {
        let left = Program::pair(Program::pair(Program::int(1), Program::int(2)), Program::int(3));
        let right = Program::list([Program::int(1), Program::int(2), Program::int(3)]);
        let leaf = |value: u8| hash_atom(&[value]);
        assert_eq!(left.tree_hash(), hash_pair(&hash_pair(&leaf(1), &leaf(2)), &leaf(3)));
        assert_eq!(
            right.tree_hash(),
            hash_pair(&leaf(1), &hash_pair(&leaf(2), &hash_pair(&leaf(3), &hash_atom(&[]))))
        );
        assert_eq!(Program::atom(b"solo".as_slice()).tree_hash(), hash_atom(b"solo"));
    }

    #[test]
    fn test_curry_uncurry() {
        let puzzle_mod = Program::list([Program::int(2), Program::int(5), Program::int(11)]);
        let args = vec![Program::int(42), Program::atom([9u8; 32]), Program::nil()];
        let curried = puzzle_mod.curry(&args);

        let (uncurried_mod, uncurried_args) = curried.uncurry().expect("curried shape");
        assert_eq!(uncurried_mod, puzzle_mod);
        assert_eq!(uncurried_args, args);

        assert!(puzzle_mod.uncurry().is_none());
        assert_eq!(puzzle_mod.curry(&[]).uncurry(), Some((puzzle_mod, vec![])));
    }

    #[test]
    fn test_equality_is_structural() {
        let a = Program::list([Program::int(1), Program::atom(b"x".as_slice())]);
        let b = Program::list([Program::int(1), Program::atom(b"x".as_slice())]);
        let c = Program::list([Program::int(1), Program::atom(b"y".as_slice())]);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(Program::nil(), Program::pair(Program::nil(), Program::nil()));
    }

    #[test]
    fn test_deep_tree_does_not_overflow() {
        let mut program = Program::nil();
        for _ in 0..200_000 {
            program = Program::pair(program, Program::nil());
        }
        let copy = program.clone();
        assert_eq!(program, copy);
        assert_ne!(program.tree_hash(), Program::nil().tree_hash());
        assert_eq!(program.tree_hash(), copy.tree_hash());
        drop(copy);
        drop(program);
    }
}
