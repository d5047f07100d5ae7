//! Fixtures shared by the integration tests
#![allow(dead_code)]

use anyhow::Result;
use custody_policy::capability::{BlsMember, TimelockRestriction};
use custody_policy::puzzles::LibraryReveals;
use custody_policy::types::BLS_PUBLIC_KEY_LEN;
use custody_policy::{Member, PuzzleLibrary, PuzzleMod, Restriction};

/// Distinct stand-in programs for every engine primitive
pub const REVEALS: LibraryReveals<'static> = LibraryReveals {
    delegated_puzzle_feeder: "ff02ffff0102ff0580",
    index_wrapper: "ff02ffff0103ff0580",
    one_of_n: "ff02ffff0104ff0580",
    m_of_n: "ff02ffff0105ff0580",
    n_of_n: "ff02ffff0106ff0580",
    add_dpuz_wrapper: "ff02ffff0107ff0580",
    enforce_dpuz_wrappers: "ff02ffff0108ff0580",
};

pub fn library() -> Result<PuzzleLibrary> { Ok(PuzzleLibrary::from_hex(REVEALS)?) }

pub fn bls_mod() -> Result<PuzzleMod> { Ok(PuzzleMod::from_hex("ff02ffff0109ff0580")?) }

pub fn timelock_mod() -> Result<PuzzleMod> { Ok(PuzzleMod::from_hex("ff02ffff010aff0580")?) }

pub fn height_lock_mod() -> Result<PuzzleMod> { Ok(PuzzleMod::from_hex("ff02ffff010bff0580")?) }

pub fn bls(seed: u8) -> Result<BlsMember> { Ok(BlsMember::new(bls_mod()?, [seed; BLS_PUBLIC_KEY_LEN])) }

pub fn bls_member(seed: u8) -> Result<Member> { Ok(Member::concrete(bls(seed)?)) }

pub fn timelock(seconds: u64) -> Result<TimelockRestriction> {
    Ok(TimelockRestriction::new(timelock_mod()?, seconds))
}

pub fn timelock_restriction(seconds: u64) -> Result<Restriction> {
    Ok(Restriction::concrete(timelock(seconds)?))
}
