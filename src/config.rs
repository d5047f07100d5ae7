//! Configuration for memo encoding
//!
//! The memo namespace and the decode depth bound are protocol parameters.
//! They are expressed as a trait so that a future memo dialect can be
//! introduced without touching the codec.

use crate::types::{MAX_MEMO_DEPTH, MEMO_NAMESPACE};

/// Trait for memo codec parameters
pub trait CustodyConfig {
    /// Leading atom identifying this engine's memo dialect
    fn memo_namespace(&self) -> &[u8];

    /// Maximum MofN nesting accepted while decoding untrusted memos
    fn max_memo_depth(&self) -> usize;
}

/// Version 1 memo dialect
#[derive(Clone, Copy, Debug, Default)]
pub struct ChipV1Config;

impl CustodyConfig for ChipV1Config {
    fn memo_namespace(&self) -> &[u8] { MEMO_NAMESPACE }

    fn max_memo_depth(&self) -> usize { MAX_MEMO_DEPTH }
}

/// Default config instance (version 1 dialect)
pub(crate) const DEFAULT_CONFIG: ChipV1Config = ChipV1Config;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memo_namespace() {
        let config = ChipV1Config;
        assert_eq!(config.memo_namespace(), b"inner_puzzle_chip?");
    }

    #[test]
    fn test_max_memo_depth() {
        assert_eq!(DEFAULT_CONFIG.max_memo_depth(), 32);
    }
}
