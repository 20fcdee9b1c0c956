//! Model-checked operation sequences.
//!
//! Random operation sequences run against the deque and a `VecDeque`
//! reference model. After every step the live contents, every open
//! snapshot, and the capacity accounting must agree with the model. After
//! the last snapshot closes, no obsolete link and no unlinked node may be
//! left behind.

use proptest::prelude::*;
use strand_deque::DequeConfig;
use strand_test::model::ModelHarness;
use strand_test::utils::init_tracing;
use strand_test::workload::{generate, Op, WorkloadConfig};

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0_u64..1_000).prop_map(Op::Append),
        3 => (0_u64..1_000).prop_map(Op::Prepend),
        2 => Just(Op::PollFirst),
        2 => Just(Op::PollLast),
        2 => any::<usize>().prop_map(Op::UnlinkAt),
        2 => Just(Op::OpenSnapshot),
        1 => proptest::option::of(0_usize..6).prop_map(Op::OpenPollSnapshot),
        2 => any::<usize>().prop_map(Op::CloseSnapshot),
    ]
}

fn run(mut harness: ModelHarness, ops: &[Op]) -> Result<(), TestCaseError> {
    for (step, op) in ops.iter().enumerate() {
        let applied = harness.apply(*op);
        prop_assert!(applied.is_ok(), "step {} {:?}: {:?}", step, op, applied);
        let verified = harness.verify();
        prop_assert!(verified.is_ok(), "after step {} {:?}: {:?}", step, op, verified);
    }
    let finished = harness.finish();
    prop_assert!(finished.is_ok(), "{:?}", finished);
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_unbounded_matches_model(ops in proptest::collection::vec(op_strategy(), 1..120)) {
        init_tracing();
        run(ModelHarness::new(), &ops)?;
    }

    #[test]
    fn prop_bounded_matches_model(
        capacity in 1_usize..8,
        ops in proptest::collection::vec(op_strategy(), 1..120),
    ) {
        init_tracing();
        run(ModelHarness::with_config(DequeConfig::bounded(capacity)), &ops)?;
    }

    #[test]
    fn prop_small_reclaim_batches_match_model(
        batch in 1_usize..4,
        ops in proptest::collection::vec(op_strategy(), 1..120),
    ) {
        init_tracing();
        let config = DequeConfig::default().with_reclaim_batch(batch);
        run(ModelHarness::with_config(config), &ops)?;
    }
}

#[test]
fn test_seeded_workloads_match_model() {
    init_tracing();
    for seed in 0..8 {
        let config = WorkloadConfig {
            seed,
            ..WorkloadConfig::default()
        };
        let mut harness = ModelHarness::new();
        for (step, op) in generate(&config).into_iter().enumerate() {
            harness
                .apply(op)
                .unwrap_or_else(|err| panic!("seed {seed} step {step} {op:?}: {err}"));
            harness
                .verify()
                .unwrap_or_else(|err| panic!("seed {seed} after step {step} {op:?}: {err}"));
        }
        harness.finish().unwrap();
    }
}

#[test]
fn test_snapshot_heavy_workload() {
    init_tracing();
    let config = WorkloadConfig {
        ops: 2_000,
        seed: 99,
        insert_weight: 3,
        remove_weight: 3,
        snapshot_weight: 4,
    };
    let mut harness = ModelHarness::with_config(DequeConfig::bounded(32).with_reclaim_batch(4));
    for op in generate(&config) {
        harness.apply(op).unwrap();
    }
    harness.verify().unwrap();
    let stats = harness.finish().unwrap();
    assert_eq!(stats.open_snapshots, 0);
}
