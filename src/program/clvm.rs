//! Bridges between [`Program`] and the `clvm-traits` codecs
//!
//! `Program` encodes into any [`ClvmEncoder`] and decodes from any
//! [`ClvmDecoder`], so derived wire types can embed it as an opaque field.

use clvm_traits::{ClvmDecoder, ClvmEncoder, FromClvm, FromClvmError, ToClvm, ToClvmError};
use clvmr::{Allocator, Atom, NodePtr};

use super::Program;
use crate::errors::ProgramError;
use crate::types::Bytes32;

impl<E: ClvmEncoder> ToClvm<E> for Program {
    fn to_clvm(&self, encoder: &mut E) -> Result<E::Node, ToClvmError> {
        self.fold(
            encoder,
            |encoder, bytes| encoder.encode_atom(Atom::Borrowed(bytes)),
            |encoder, first, rest| encoder.encode_pair(first, rest),
        )
    }
}

impl<D: ClvmDecoder> FromClvm<D> for Program {
    fn from_clvm(decoder: &D, node: D::Node) -> Result<Self, FromClvmError> {
        enum Frame<N> {
            Rest(N),
            First(Program),
        }

        let mut frames = Vec::new();
        let mut node = node;
        loop {
            let mut value = loop {
                match decoder.decode_pair(&node) {
                    Ok((first, rest)) => {
                        frames.push(Frame::Rest(rest));
                        node = first;
                    }
                    Err(_) => {
                        let atom = decoder.decode_atom(&node)?;
                        let bytes: &[u8] = atom.as_ref();
                        break Program::atom(bytes);
                    }
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
                    Some(Frame::First(first)) => value = Program::pair(first, value),
                }
            }
        }
    }
}

impl Program {
    /// Copies this program into `allocator`
    pub fn to_node(&self, allocator: &mut Allocator) -> Result<NodePtr, ProgramError> {
        Ok(self.to_clvm(allocator)?)
    }

    /// Copies the tree rooted at `node` out of `allocator`
    pub fn from_node(allocator: &Allocator, node: NodePtr) -> Result<Self, ProgramError> {
        Ok(Self::from_clvm(allocator, node)?)
    }

    /// Reads a typed value out of this program
    pub fn decode<T: FromClvm<Allocator>>(&self) -> Result<T, ProgramError> {
        let mut allocator = Allocator::new();
        let node = self.to_node(&mut allocator)?;
        Ok(T::from_clvm(&allocator, node)?)
    }
}

/// A fixed-width byte string carried as a single atom
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct FixedAtom<const N: usize>(pub(crate) [u8; N]);

/// A 32-byte hash atom
pub(crate) type HashAtom = FixedAtom<32>;

impl<E: ClvmEncoder, const N: usize> ToClvm<E> for FixedAtom<N> {
    fn to_clvm(&self, encoder: &mut E) -> Result<E::Node, ToClvmError> {
        encoder.encode_atom(Atom::Borrowed(&self.0))
    }
}

impl<D: ClvmDecoder, const N: usize> FromClvm<D> for FixedAtom<N> {
    fn from_clvm(decoder: &D, node: D::Node) -> Result<Self, FromClvmError> {
        let atom = decoder.decode_atom(&node)?;
        let bytes: &[u8] = atom.as_ref();
        bytes.try_into().map(FixedAtom).map_err(|_| FromClvmError::WrongAtomLength { expected: N, found: bytes.len() })
    }
}

impl From<Bytes32> for HashAtom {
    fn from(hash: Bytes32) -> Self { FixedAtom(hash) }
}
