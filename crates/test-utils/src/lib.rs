//! Shared fixtures for the `assetpipe` integration tests: config builders,
//! an on-disk project directory, and a recording fake transform.

pub mod builders;
pub mod fake_transform;

use std::sync::Once;
use std::time::Duration;

use tracing_subscriber::{fmt, EnvFilter};

pub use builders::{ConfigFileBuilder, ProjectDir};
pub use fake_transform::{FakeTransform, FakeTransforms, InvocationLog};

static TRACING: Once = Once::new();

const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Captured per-test logging; `RUST_LOG=debug` raises the level.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .init();
    });
}

/// Fail the test instead of hanging when `f` never completes.
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    match tokio::time::timeout(TEST_TIMEOUT, f).await {
        Ok(value) => value,
        Err(_) => panic!("test timed out after {TEST_TIMEOUT:?}"),
    }
}
