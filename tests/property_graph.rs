use std::sync::Arc;

use assetpipe::dag::GraphBuilder;
use assetpipe::engine::{Orchestrator, TriggerReason};
use assetpipe::transform::{Transform, TransformContext};
use assetpipe::types::BuildMode;
use assetpipe_test_utils::{FakeTransform, InvocationLog};
use proptest::prelude::*;

fn ctx() -> TransformContext {
    TransformContext {
        root: "/project".into(),
        mode: BuildMode::Development,
    }
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

/// Leaves `leaf_0..leaf_n`, the ones in `failing` raising an error.
fn leaves(builder: &mut GraphBuilder, log: &InvocationLog, failing: &[bool]) -> Vec<assetpipe::dag::TaskId> {
    failing
        .iter()
        .enumerate()
        .map(|(i, fails)| {
            let name = format!("leaf_{i}");
            let mut fake = FakeTransform::new(&name, log.clone());
            if *fails {
                fake = fake.failing(format!("{name} broke"));
            }
            let transform: Arc<dyn Transform> = Arc::new(fake);
            builder.add_leaf(name, transform).unwrap()
        })
        .collect()
}

proptest! {
    #[test]
    fn series_never_runs_past_first_failure(failing in proptest::collection::vec(any::<bool>(), 1..8)) {
        let log = InvocationLog::default();
        let mut builder = GraphBuilder::new();
        let ids = leaves(&mut builder, &log, &failing);
        let root = builder.add_series("root", ids).unwrap();
        let orchestrator = Orchestrator::new(Arc::new(builder.freeze()), ctx());

        let report = runtime().block_on(orchestrator.run_id(root, TriggerReason::Manual));

        let expected_runs = failing.iter().position(|f| *f).map_or(failing.len(), |i| i + 1);
        let expected: Vec<String> = (0..expected_runs).map(|i| format!("leaf_{i}")).collect();
        prop_assert_eq!(log.started(), expected);

        match failing.iter().position(|f| *f) {
            Some(i) => {
                let error = report.result.error.expect("series error");
                let leaves = error.leaf_errors();
                prop_assert_eq!(leaves.len(), 1);
                let expected_task = format!("leaf_{i}");
                prop_assert_eq!(leaves[0].task(), Some(expected_task.as_str()));
            }
            None => prop_assert!(report.result.is_success()),
        }
    }

    #[test]
    fn parallel_runs_everything_and_reports_every_failure(failing in proptest::collection::vec(any::<bool>(), 1..8)) {
        let log = InvocationLog::default();
        let mut builder = GraphBuilder::new();
        let ids = leaves(&mut builder, &log, &failing);
        let root = builder.add_parallel("root", ids).unwrap();
        let orchestrator = Orchestrator::new(Arc::new(builder.freeze()), ctx());

        let report = runtime().block_on(orchestrator.run_id(root, TriggerReason::Manual));

        prop_assert_eq!(log.started().len(), failing.len());

        let expected_failures: Vec<String> = failing
            .iter()
            .enumerate()
            .filter(|(_, f)| **f)
            .map(|(i, _)| format!("leaf_{i}"))
            .collect();
        let reported: Vec<String> = report
            .result
            .error
            .as_ref()
            .map(|e| e.leaf_errors().into_iter().filter_map(|l| l.task()).map(str::to_string).collect())
            .unwrap_or_default();
        prop_assert_eq!(reported, expected_failures.clone());
        prop_assert_eq!(report.result.is_success(), expected_failures.is_empty());
    }
}
