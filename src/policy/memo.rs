use clvm_traits::{ClvmDecoder, FromClvm, ToClvm, ToClvmError};
use clvmr::{Allocator, NodePtr};
use tracing::{debug, warn};

use super::{InnerPuzzle, PuzzleWithRestrictions};
use crate::capability::{Member, PuzzleHint, Restriction, RestrictionHint};
use crate::config::{CustodyConfig, DEFAULT_CONFIG};
use crate::errors::{MemoError, ProgramError, Result};
use crate::mofn::MofN;
use crate::program::{HashAtom, Program};
use crate::types::Nonce;

/// Hint for a threshold: `m` and each member's full memo
#[derive(Clone, Debug, PartialEq, Eq, ToClvm, FromClvm)]
#[clvm(list)]
pub struct MofNHint<M> {
    /// Required number of members
    pub m: usize,
    /// Memos of every member, in member order
    pub member_memos: Vec<M>,
}

#[derive(ToClvm, FromClvm)]
#[clvm(list)]
struct PolicyMemo<H> {
    namespace: Program,
    nonce: Nonce,
    restrictions: Vec<RestrictionMemo>,
    branching: bool,
    hint: H,
}

#[derive(ToClvm, FromClvm)]
#[clvm(list)]
struct RestrictionMemo {
    member_not_dpuz: bool,
    puzzle_hash: HashAtom,
    memo: Program,
}

#[derive(ToClvm, FromClvm)]
#[clvm(list)]
struct MemberMemo {
    puzzle_hash: HashAtom,
    memo: Program,
}

impl From<RestrictionHint> for RestrictionMemo {
    fn from(hint: RestrictionHint) -> Self {
        Self { member_not_dpuz: hint.member_not_dpuz, puzzle_hash: hint.puzzle_hash.into(), memo: hint.memo }
    }
}

impl From<RestrictionMemo> for RestrictionHint {
    fn from(memo: RestrictionMemo) -> Self {
        Self { member_not_dpuz: memo.member_not_dpuz, puzzle_hash: memo.puzzle_hash.0, memo: memo.memo }
    }
}

impl PuzzleWithRestrictions {
    /// Memo of this tree in the default dialect
    pub fn memo(&self) -> std::result::Result<Program, ProgramError> { self.memo_with(&DEFAULT_CONFIG) }

    /// Memo of this tree
    ///
    /// Encoded as `(namespace nonce (restriction_hint ...) branching hint)`
    /// where `hint` is `(puzzle_hash memo)` for a member and an
    /// [`MofNHint`] of nested memos for a threshold.
    pub fn memo_with<C: CustodyConfig + ?Sized>(&self, config: &C) -> std::result::Result<Program, ProgramError> {
        let mut allocator = Allocator::new();
        let node = self.encode_memo(&mut allocator, config)?;
        Program::from_node(&allocator, node)
    }

    fn encode_memo<C: CustodyConfig + ?Sized>(
        &self,
        allocator: &mut Allocator,
        config: &C,
    ) -> std::result::Result<NodePtr, ToClvmError> {
        let restrictions =
            self.restrictions.iter().map(|restriction| RestrictionMemo::from(restriction.hint(self.nonce))).collect();

        let hint = match &self.puzzle {
            InnerPuzzle::Member(member) => {
                MemberMemo { puzzle_hash: member.puzzle_hash(self.nonce).into(), memo: member.memo(self.nonce) }
                    .to_clvm(allocator)?
            }
            InnerPuzzle::MofN(threshold) => {
                let member_memos = threshold
                    .members()
                    .iter()
                    .map(|member| member.encode_memo(allocator, config))
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                MofNHint { m: threshold.m(), member_memos }.to_clvm(allocator)?
            }
        };

        PolicyMemo {
            namespace: Program::atom(config.memo_namespace()),
            nonce: self.nonce,
            restrictions,
            branching: self.is_branching(),
            hint,
        }
        .to_clvm(allocator)
    }

    /// Rebuilds a tree skeleton from a memo in the default dialect
    ///
    /// Every restriction and member comes back as a placeholder; thresholds
    /// are rebuilt recursively.
    pub fn from_memo(memo: &Program) -> Result<Self> { Self::from_memo_with(memo, &DEFAULT_CONFIG) }

    /// Rebuilds a tree skeleton from a memo
    ///
    /// # Errors
    ///
    /// * `NotThisSpec` if the memo does not start with the configured namespace
    /// * `Malformed` if the envelope has the wrong shape
    /// * `TooDeep` if thresholds nest deeper than the configured bound
    /// * Threshold construction errors for invalid nested thresholds
    pub fn from_memo_with<C: CustodyConfig + ?Sized>(memo: &Program, config: &C) -> Result<Self> {
        let mut allocator = Allocator::new();
        let node = memo.to_node(&mut allocator)?;
        decode(&allocator, node, config, 0)
    }
}

fn decode<C: CustodyConfig + ?Sized>(
    allocator: &Allocator,
    memo: NodePtr,
    config: &C,
    depth: usize,
) -> Result<PuzzleWithRestrictions> {
    if depth > config.max_memo_depth() {
        warn!(depth, max_depth = config.max_memo_depth(), "memo nests too deeply");
        return Err(MemoError::TooDeep { max_depth: config.max_memo_depth() }.into());
    }

    let namespace = allocator.decode_pair(&memo).ok().and_then(|(namespace, _)| allocator.decode_atom(&namespace).ok());
    let namespace = namespace.map(|atom| {
        let bytes: &[u8] = atom.as_ref();
        bytes.to_vec()
    });
    if namespace.as_deref() != Some(config.memo_namespace()) {
        warn!(namespace = ?namespace.as_deref().map(hex::encode), "memo namespace mismatch");
        return Err(MemoError::NotThisSpec.into());
    }

    let body = PolicyMemo::<NodePtr>::from_clvm(allocator, memo).map_err(|e| MemoError::malformed("memo body", e))?;
    let restrictions: Vec<Restriction> =
        body.restrictions.into_iter().map(|memo| Restriction::Unknown(memo.into())).collect();

    let puzzle = if body.branching {
        let hint = MofNHint::<NodePtr>::from_clvm(allocator, body.hint)
            .map_err(|e| MemoError::malformed("threshold hint", e))?;
        let members = hint
            .member_memos
            .iter()
            .map(|member| decode(allocator, *member, config, depth + 1))
            .collect::<Result<Vec<_>>>()?;
        InnerPuzzle::MofN(MofN::new(hint.m, members)?)
    } else {
        let hint = MemberMemo::from_clvm(allocator, body.hint).map_err(|e| MemoError::malformed("puzzle hint", e))?;
        InnerPuzzle::Member(Member::Unknown(PuzzleHint { puzzle_hash: hint.puzzle_hash.0, memo: hint.memo }))
    };

    debug!(nonce = body.nonce, restrictions = restrictions.len(), branching = body.branching, depth, "decoded memo");
    Ok(PuzzleWithRestrictions { nonce: body.nonce, restrictions, puzzle })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{Error, PolicyError};
    use crate::test_utils::{bls_member, test_library, timelock, unknown_member};
    use crate::types::MEMO_NAMESPACE;

    struct OtherDialect;

    impl CustodyConfig for OtherDialect {
        fn memo_namespace(&self) -> &[u8] { b"other_dialect" }

        fn max_memo_depth(&self) -> usize { 1 }
    }

    fn nested(levels: usize) -> PuzzleWithRestrictions {
        let mut tree = PuzzleWithRestrictions::new(0, Vec::new(), unknown_member(1));
        for level in 0..levels {
            let sibling = PuzzleWithRestrictions::new(level as u64 + 100, Vec::new(), unknown_member(2));
            let threshold = MofN::new(1, vec![tree, sibling]).expect("valid threshold");
            tree = PuzzleWithRestrictions::new(level as u64, Vec::new(), threshold);
        }
        tree
    }

    fn envelope(body: Vec<Program>) -> Program {
        Program::pair(Program::atom(MEMO_NAMESPACE), Program::list(body))
    }

    #[test]
    fn test_memo_wire_format() {
        let tree = PuzzleWithRestrictions::new(5, vec![timelock(60)], unknown_member(9));
        let memo = tree.memo().expect("encodes");
        let (namespace, body) = memo.as_pair().expect("pair");
        assert_eq!(namespace.as_atom(), Some(MEMO_NAMESPACE));

        let items = body.list_items().expect("list");
        assert_eq!(items.len(), 4);
        assert_eq!(items[0], Program::int(5));
        assert_eq!(items[2], Program::nil());
        assert_eq!(items[3], Program::list([Program::atom([9u8; 32]), Program::list([Program::int(9)])]));

        let restriction = items[1].first().expect("one restriction");
        assert_eq!(restriction.first(), Ok(&Program::bool(true)));
        assert_eq!(restriction.list_items().map(|items| items.len()), Ok(3));
    }

    #[test]
    fn test_threshold_hint_layout() {
        let members = vec![
            PuzzleWithRestrictions::new(1, Vec::new(), unknown_member(1)),
            PuzzleWithRestrictions::new(2, Vec::new(), unknown_member(2)),
        ];
        let tree = PuzzleWithRestrictions::new(0, Vec::new(), MofN::new(1, members.clone()).expect("valid"));
        let memo = tree.memo().expect("encodes");

        let hint = memo.decode::<(Program, (Nonce, (Program, (bool, (MofNHint<Program>, ())))))>().expect("layout");
        let (_, (_, (_, (branching, (hint, ()))))) = hint;
        assert!(branching);
        assert_eq!(hint.m, 1);
        let expected: Vec<Program> = members.iter().map(|member| member.memo().expect("encodes")).collect();
        assert_eq!(hint.member_memos, expected);
    }

    #[test]
    fn test_member_memo_round_trip() {
        let library = test_library();
        let tree = PuzzleWithRestrictions::new(3, vec![timelock(10)], bls_member(4));
        let memo = tree.memo().expect("encodes");
        let skeleton = PuzzleWithRestrictions::from_memo(&memo).expect("decodes");

        assert_eq!(skeleton.nonce, 3);
        assert_eq!(skeleton.unknown_puzzles().len(), 2);
        assert_eq!(skeleton.memo(), Ok(memo));
        assert_eq!(skeleton.puzzle_hash(&library, true), tree.puzzle_hash(&library, true));
    }

    #[test]
    fn test_threshold_memo_round_trip() {
        let library = test_library();
        let members = (1..=3).map(|i| PuzzleWithRestrictions::new(i.into(), Vec::new(), bls_member(i))).collect();
        let tree = PuzzleWithRestrictions::new(0, Vec::new(), MofN::new(2, members).expect("valid"));

        let skeleton = PuzzleWithRestrictions::from_memo(&tree.memo().expect("encodes")).expect("decodes");
        let InnerPuzzle::MofN(threshold) = &skeleton.puzzle else {
            panic!("expected a threshold");
        };
        assert_eq!((threshold.m(), threshold.n()), (2, 3));
        assert!(threshold.members().iter().all(|m| matches!(m.puzzle, InnerPuzzle::Member(Member::Unknown(_)))));
        assert_eq!(skeleton.puzzle_hash(&library, true), tree.puzzle_hash(&library, true));
    }

    #[test]
    fn test_not_this_spec() {
        let atom = Program::atom(MEMO_NAMESPACE);
        assert_eq!(PuzzleWithRestrictions::from_memo(&atom), Err(Error::Memo(MemoError::NotThisSpec)));

        let nested_namespace = Program::pair(Program::list([Program::atom(MEMO_NAMESPACE)]), Program::nil());
        assert_eq!(PuzzleWithRestrictions::from_memo(&nested_namespace), Err(Error::Memo(MemoError::NotThisSpec)));

        let tree = PuzzleWithRestrictions::new(0, Vec::new(), unknown_member(1));
        let foreign = tree.memo_with(&OtherDialect).expect("encodes");
        assert_eq!(PuzzleWithRestrictions::from_memo(&foreign), Err(Error::Memo(MemoError::NotThisSpec)));
        assert_eq!(PuzzleWithRestrictions::from_memo_with(&foreign, &OtherDialect), Ok(tree));
    }

    #[test]
    fn test_malformed_body() {
        let memo = envelope(vec![Program::int(1)]);
        assert!(matches!(PuzzleWithRestrictions::from_memo(&memo), Err(Error::Memo(MemoError::Malformed { .. }))));

        let improper = Program::pair(Program::atom(MEMO_NAMESPACE), Program::int(1));
        assert!(matches!(
            PuzzleWithRestrictions::from_memo(&improper),
            Err(Error::Memo(MemoError::Malformed { .. }))
        ));
    }

    #[test]
    fn test_malformed_hints() {
        let short_hash = envelope(vec![
            Program::int(0),
            Program::nil(),
            Program::bool(false),
            Program::list([Program::atom([1u8; 31]), Program::nil()]),
        ]);
        assert_eq!(
            PuzzleWithRestrictions::from_memo(&short_hash),
            Err(Error::Memo(MemoError::Malformed {
                reason: "puzzle hint: Invalid hash length: expected 32 bytes, got 31".to_string()
            }))
        );

        let missing_memo = envelope(vec![
            Program::int(0),
            Program::nil(),
            Program::bool(false),
            Program::list([Program::atom([1u8; 32])]),
        ]);
        assert!(matches!(
            PuzzleWithRestrictions::from_memo(&missing_memo),
            Err(Error::Memo(MemoError::Malformed { .. }))
        ));

        let bad_flag = envelope(vec![
            Program::int(0),
            Program::list([Program::list([Program::int(2), Program::atom([1u8; 32]), Program::nil()])]),
            Program::bool(false),
            Program::list([Program::atom([1u8; 32]), Program::nil()]),
        ]);
        assert!(matches!(
            PuzzleWithRestrictions::from_memo(&bad_flag),
            Err(Error::Memo(MemoError::Malformed { .. }))
        ));
    }

    #[test]
    fn test_invalid_nested_threshold() {
        let member = PuzzleWithRestrictions::new(0, Vec::new(), unknown_member(1)).memo().expect("encodes");
        let memo = envelope(vec![
            Program::int(0),
            Program::nil(),
            Program::bool(true),
            Program::list([Program::int(2), Program::list([member])]),
        ]);
        assert_eq!(
            PuzzleWithRestrictions::from_memo(&memo),
            Err(Error::Policy(PolicyError::InvalidThreshold { m: 2, n: 1 }))
        );
    }

    #[test]
    fn test_duplicate_leaf_in_memo() {
        let leaf = |memo: Program| {
            envelope(vec![
                Program::int(4),
                Program::nil(),
                Program::bool(false),
                Program::list([Program::atom([7u8; 32]), memo]),
            ])
        };
        let memo = envelope(vec![
            Program::int(0),
            Program::nil(),
            Program::bool(true),
            Program::list([Program::int(1), Program::list([leaf(Program::int(1)), leaf(Program::int(2))])]),
        ]);

        let first = PuzzleWithRestrictions::new(4, Vec::new(), Member::unknown([7; 32], Program::int(1)));
        assert_eq!(
            PuzzleWithRestrictions::from_memo(&memo),
            Err(Error::Policy(PolicyError::DuplicateBranch { identity: first.identity() }))
        );
    }

    #[test]
    fn test_depth_bound() {
        let shallow = nested(1).memo_with(&OtherDialect).expect("encodes");
        assert!(PuzzleWithRestrictions::from_memo_with(&shallow, &OtherDialect).is_ok());

        let deep = nested(2);
        assert_eq!(
            PuzzleWithRestrictions::from_memo_with(&deep.memo_with(&OtherDialect).expect("encodes"), &OtherDialect),
            Err(Error::Memo(MemoError::TooDeep { max_depth: 1 }))
        );
        assert!(PuzzleWithRestrictions::from_memo(&deep.memo().expect("encodes")).is_ok());
    }
}
