//! Core type definitions for the custody policy engine
//!
//! This module defines fundamental types and constants shared across
//! the hash algebra, the program model and the policy tree.

// ============================================================================
// Fundamental Types
// ============================================================================

/// Type alias for 32-byte arrays used across cryptographic operations
pub type Bytes32 = [u8; 32];

/// Type alias for puzzle hashes (the commitment used as a coin's lock)
pub type PuzzleHash = Bytes32;

/// Type alias for policy nonces
pub type Nonce = u64;

// ============================================================================
// Script Engine Opcodes
// ============================================================================

/// Atom of the `q` (quote) operator
pub const QUOTE_OPCODE: &[u8] = &[0x01];

/// Atom of the `a` (apply) operator
pub const APPLY_OPCODE: &[u8] = &[0x02];

/// Atom of the `c` (cons) operator
pub const CONS_OPCODE: &[u8] = &[0x04];

/// Atom terminating a curried environment (the whole solution, path 1)
pub const CURRY_ENV_TERMINATOR: &[u8] = &[0x01];

// ============================================================================
// Memo Domain
// ============================================================================

/// Namespace atom prefixing every policy memo
///
/// A memo whose leading atom differs belongs to some other hint dialect and
/// must never be interpreted as a policy skeleton.
pub const MEMO_NAMESPACE: &[u8] = b"inner_puzzle_chip?";

/// Default bound on MofN nesting accepted while decoding a memo
pub const MAX_MEMO_DEPTH: usize = 32;

/// Length of a BLS G1 public key atom
pub const BLS_PUBLIC_KEY_LEN: usize = 48;
