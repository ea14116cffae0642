mod common;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use assetpipe::app::App;
use assetpipe::engine::{RunStatus, TaskError, TaskRunState};
use assetpipe::errors::PipelineError;
use assetpipe::fs::mock::MockFileSystem;
use assetpipe::fs::FileSystem;
use assetpipe::types::BuildMode;
use assetpipe_test_utils::{ConfigFileBuilder, FakeTransforms};

use crate::common::{fake_app, init_tracing, with_timeout};

const PRODUCERS: [&str; 5] = ["html", "styles", "scripts", "fonts", "images"];

#[tokio::test]
async fn build_cleans_before_any_producer_starts() {
    init_tracing();
    let fakes = FakeTransforms::new().delayed("clean", Duration::from_millis(30));
    let app = fake_app(&fakes, ConfigFileBuilder::new());

    let report = with_timeout(app.orchestrator().run("build")).await.unwrap();
    assert_eq!(report.result.status, RunStatus::Success);

    let entries = fakes.log().entries();
    assert_eq!(entries[0], "start:clean");
    assert_eq!(entries[1], "end:clean");
    let mut started = fakes.log().started();
    started.sort();
    let mut expected: Vec<String> = PRODUCERS.iter().map(|s| s.to_string()).collect();
    expected.push("clean".to_string());
    expected.sort();
    assert_eq!(started, expected);
}

#[tokio::test]
async fn producers_run_concurrently() {
    init_tracing();
    let mut fakes = FakeTransforms::new();
    for name in PRODUCERS {
        fakes = fakes.delayed(name, Duration::from_millis(50));
    }
    let app = fake_app(&fakes, ConfigFileBuilder::new());

    let report = with_timeout(app.orchestrator().run("assets")).await.unwrap();
    assert!(report.result.is_success());
    assert_eq!(fakes.log().max_concurrency(), PRODUCERS.len());
}

#[tokio::test]
async fn failed_clean_stops_the_build() {
    init_tracing();
    let fakes = FakeTransforms::new().failing("clean", "permission denied");
    let app = fake_app(&fakes, ConfigFileBuilder::new());

    let report = with_timeout(app.orchestrator().run("build")).await.unwrap();

    assert_eq!(report.result.status, RunStatus::Failure);
    assert_eq!(fakes.log().started(), vec!["clean"]);
    assert_eq!(report.state_of("clean"), Some(TaskRunState::Failed));
    assert_eq!(report.state_of("assets"), Some(TaskRunState::Pending));
    for name in PRODUCERS {
        assert_eq!(report.state_of(name), Some(TaskRunState::Pending), "{name}");
    }
    match report.result.error {
        Some(TaskError::Transform { task, message, .. }) => {
            assert_eq!(task, "clean");
            assert_eq!(message, "permission denied");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn failing_scripts_does_not_stop_siblings() {
    init_tracing();
    let fakes = FakeTransforms::new()
        .failing("scripts", "unexpected token")
        .delayed("images", Duration::from_millis(40));
    let app = fake_app(&fakes, ConfigFileBuilder::new());

    let report = with_timeout(app.orchestrator().run("build")).await.unwrap();

    assert_eq!(report.result.status, RunStatus::Failure);
    let entries = fakes.log().entries();
    for name in PRODUCERS {
        assert!(entries.contains(&format!("end:{name}")), "{name} did not finish");
    }
    assert_eq!(report.state_of("images"), Some(TaskRunState::Succeeded));
    assert_eq!(report.state_of("scripts"), Some(TaskRunState::Failed));
    assert_eq!(report.state_of("build"), Some(TaskRunState::Failed));

    let error = report.result.error.expect("build error");
    let leaves = error.leaf_errors();
    assert_eq!(leaves.len(), 1);
    assert_eq!(leaves[0].task(), Some("scripts"));
    assert_eq!(leaves[0].to_string(), "fake: unexpected token");
}

#[tokio::test]
async fn parallel_collects_every_failure() {
    init_tracing();
    let fakes = FakeTransforms::new()
        .failing("html", "a")
        .failing("fonts", "b");
    let app = fake_app(&fakes, ConfigFileBuilder::new());

    let report = with_timeout(app.orchestrator().run("assets")).await.unwrap();

    let error = report.result.error.expect("assets error");
    assert!(matches!(error, TaskError::Aggregate(_)));
    let tasks: Vec<_> = error.leaf_errors().into_iter().filter_map(|e| e.task()).collect();
    assert_eq!(tasks, vec!["html", "fonts"]);
    assert_eq!(fakes.log().started().len(), PRODUCERS.len());
}

#[tokio::test]
async fn unknown_task_fails_before_any_work() {
    init_tracing();
    let fakes = FakeTransforms::new();
    let app = fake_app(&fakes, ConfigFileBuilder::new());

    let err = app.orchestrator().run("deploy").await.unwrap_err();
    assert!(matches!(err, PipelineError::UnknownTask(name) if name == "deploy"));
    assert!(fakes.log().entries().is_empty());
}

#[tokio::test]
async fn hung_transform_times_out() {
    init_tracing();
    let fakes = FakeTransforms::new().delayed("images", Duration::from_secs(30));
    let app = fake_app(&fakes, ConfigFileBuilder::new().with_timeout("100ms"));

    let report = with_timeout(app.orchestrator().run("build")).await.unwrap();

    let error = report.result.error.as_ref().expect("timeout error");
    let leaves = error.leaf_errors();
    assert_eq!(leaves.len(), 1);
    assert_eq!(
        leaves[0],
        &TaskError::TimedOut {
            task: "images".to_string(),
            after: Duration::from_millis(100),
        }
    );
    assert_eq!(report.state_of("html"), Some(TaskRunState::Succeeded));
}

#[tokio::test]
async fn declared_composites_follow_their_kind() {
    init_tracing();
    let fakes = FakeTransforms::new();
    let builder = ConfigFileBuilder::new()
        .with_parallel("pages", &["html", "styles"])
        .with_series("release", &["clear-cache", "pages", "scripts"]);
    let app = fake_app(&fakes, builder);

    let report = with_timeout(app.orchestrator().run("release")).await.unwrap();
    assert!(report.result.is_success());

    let started = fakes.log().started();
    assert_eq!(started.first().map(String::as_str), Some("clear-cache"));
    assert_eq!(started.last().map(String::as_str), Some("scripts"));
    assert_eq!(started.len(), 4);
}

/// Every read takes `delay` of wall-clock time on the calling thread.
#[derive(Debug)]
struct SlowReads {
    inner: MockFileSystem,
    delay: Duration,
}

impl FileSystem for SlowReads {
    fn read(&self, path: &Path) -> anyhow::Result<Vec<u8>> {
        std::thread::sleep(self.delay);
        self.inner.read(path)
    }

    fn write(&self, path: &Path, contents: &[u8]) -> anyhow::Result<()> {
        self.inner.write(path, contents)
    }

    fn is_file(&self, path: &Path) -> bool {
        self.inner.is_file(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.inner.is_dir(path)
    }

    fn remove_file(&self, path: &Path) -> anyhow::Result<()> {
        self.inner.remove_file(path)
    }

    fn remove_dir_all(&self, path: &Path) -> anyhow::Result<()> {
        self.inner.remove_dir_all(path)
    }

    fn read_dir(&self, path: &Path) -> anyhow::Result<Vec<PathBuf>> {
        self.inner.read_dir(path)
    }
}

#[tokio::test]
async fn parallel_producers_overlap_file_io() {
    init_tracing();
    let inner = MockFileSystem::new();
    inner.add_file("/project/src/fonts/site.woff2", "font");
    inner.add_file("/project/src/img/logo.png", "png");
    let fs = SlowReads {
        inner: inner.clone(),
        delay: Duration::from_millis(300),
    };
    let cfg = ConfigFileBuilder::new()
        .with_mode(BuildMode::Development)
        .with_root("/project")
        .build();
    let app = App::new(cfg, Arc::new(fs)).unwrap();

    let started = Instant::now();
    let report = with_timeout(app.orchestrator().run("assets")).await.unwrap();
    let elapsed = started.elapsed();

    assert!(report.result.is_success(), "{:?}", report.result.error);
    assert!(elapsed < Duration::from_millis(550), "reads ran back to back: {elapsed:?}");
    assert_eq!(inner.read(Path::new("/project/dist/fonts/site.woff2")).unwrap(), b"font");
    assert_eq!(inner.read(Path::new("/project/dist/img/logo.png")).unwrap(), b"png");
}
