//! Binary serialization of programs
//!
//! The format is the script engine's canonical one: `0xff` introduces a
//! pair (first, then rest), `0x80` is nil, a single byte `<= 0x7f` is an atom
//! of itself, and any other atom carries a length prefix whose leading one
//! bits give the number of size bytes. Encoding and decoding are done by
//! `clvmr`; this module only bridges to [`Program`].

use clvmr::serde::{node_from_bytes, node_to_bytes, serialized_length_from_bytes};
use clvmr::Allocator;

use super::Program;
use crate::errors::{ProgramError, Result};

impl Program {
    /// Serializes this program
    pub fn to_bytes(&self) -> std::result::Result<Vec<u8>, ProgramError> {
        let mut allocator = Allocator::new();
        let node = self.to_node(&mut allocator)?;
        node_to_bytes(&allocator, node).map_err(|_| ProgramError::AllocatorLimit)
    }

    /// Deserializes a program, rejecting trailing bytes
    pub fn from_bytes(bytes: &[u8]) -> std::result::Result<Self, ProgramError> {
        let len = serialized_length_from_bytes(bytes).map_err(|_| ProgramError::InvalidSerialization)?;
        let len = usize::try_from(len).map_err(|_| ProgramError::InvalidSerialization)?;
        if len < bytes.len() {
            return Err(ProgramError::TrailingBytes { remaining: bytes.len() - len });
        }

        let mut allocator = Allocator::new();
        let node = node_from_bytes(&mut allocator, bytes).map_err(|_| ProgramError::InvalidSerialization)?;
        Program::from_node(&allocator, node)
    }

    /// Serializes this program as lowercase hex
    pub fn to_hex(&self) -> std::result::Result<String, ProgramError> { Ok(hex::encode(self.to_bytes()?)) }

    /// Deserializes a program from hex, ignoring ASCII whitespace
    pub fn from_hex(text: &str) -> Result<Self> {
        let compact: String = text.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        let bytes = hex::decode(compact).map_err(|e| ProgramError::InvalidHex(e.to_string()))?;
        Ok(Program::from_bytes(&bytes)?)
    }
}
