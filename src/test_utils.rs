//! Shared fixtures for unit tests

use crate::capability::{BlsMember, Member, Restriction, TimelockRestriction};
use crate::program::Program;
use crate::puzzles::{PuzzleLibrary, PuzzleMod};
use crate::types::BLS_PUBLIC_KEY_LEN;

fn stand_in(name: &str) -> PuzzleMod {
    PuzzleMod::new(Program::list([Program::atom(name.as_bytes()), Program::int(1)]))
}

/// Library of distinct stand-in mods plus the shipped restrictions layer
pub(crate) fn test_library() -> PuzzleLibrary {
    PuzzleLibrary {
        delegated_puzzle_feeder: stand_in("delegated_puzzle_feeder"),
        index_wrapper: stand_in("index_wrapper"),
        restrictions: PuzzleMod::restrictions().expect("shipped reveal parses"),
        one_of_n: stand_in("one_of_n"),
        m_of_n: stand_in("m_of_n"),
        n_of_n: stand_in("n_of_n"),
        add_dpuz_wrapper: stand_in("add_dpuz_wrapper"),
        enforce_dpuz_wrappers: stand_in("enforce_dpuz_wrappers"),
    }
}

/// Mod used by every test BLS member
pub(crate) fn bls_mod() -> PuzzleMod { stand_in("bls_member") }

/// Mod used by every test timelock
pub(crate) fn timelock_mod() -> PuzzleMod { stand_in("timelock") }

/// Concrete BLS member whose key is filled with `seed`
pub(crate) fn bls_member(seed: u8) -> Member {
    Member::concrete(BlsMember::new(bls_mod(), [seed; BLS_PUBLIC_KEY_LEN]))
}

/// Concrete member-gating timelock
pub(crate) fn timelock(seconds: u64) -> Restriction {
    Restriction::concrete(TimelockRestriction::new(timelock_mod(), seconds))
}

/// Placeholder member
pub(crate) fn unknown_member(seed: u8) -> Member {
    Member::unknown([seed; 32], Program::list([Program::int(seed.into())]))
}
