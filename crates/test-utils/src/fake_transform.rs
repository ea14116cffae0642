use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use assetpipe::errors::Result;
use assetpipe::transform::{
    Transform, TransformContext, TransformError, TransformFuture, TransformOutput, TransformSet,
};
use assetpipe::types::Category;

/// Shared, ordered record of `"start:<name>"` / `"end:<name>"` entries.
#[derive(Debug, Clone, Default)]
pub struct InvocationLog {
    entries: Arc<Mutex<Vec<String>>>,
    running: Arc<AtomicUsize>,
    max_running: Arc<AtomicUsize>,
}

impl InvocationLog {
    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }

    /// Names of transforms that were started, in start order.
    pub fn started(&self) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter_map(|e| e.strip_prefix("start:").map(str::to_string))
            .collect()
    }

    pub fn count(&self, name: &str) -> usize {
        self.started().iter().filter(|n| *n == name).count()
    }

    /// Highest number of transforms observed running at once.
    pub fn max_concurrency(&self) -> usize {
        self.max_running.load(Ordering::SeqCst)
    }

    fn start(&self, name: &str) {
        self.entries.lock().unwrap().push(format!("start:{name}"));
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_running.fetch_max(now, Ordering::SeqCst);
    }

    fn end(&self, name: &str) {
        self.running.fetch_sub(1, Ordering::SeqCst);
        self.entries.lock().unwrap().push(format!("end:{name}"));
    }
}

/// A transform that records its invocations and optionally sleeps, fails or
/// hangs.
#[derive(Debug, Clone)]
pub struct FakeTransform {
    name: String,
    log: InvocationLog,
    delay: Option<Duration>,
    failure: Option<String>,
}

impl FakeTransform {
    pub fn new(name: impl Into<String>, log: InvocationLog) -> Self {
        Self {
            name: name.into(),
            log,
            delay: None,
            failure: None,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }
}

impl Transform for FakeTransform {
    fn describe(&self) -> String {
        format!("fake {}", self.name)
    }

    fn run<'a>(&'a self, _ctx: &'a TransformContext) -> TransformFuture<'a> {
        Box::pin(async move {
            self.log.start(&self.name);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.log.end(&self.name);
            match &self.failure {
                Some(message) => Err(TransformError::new("fake", message)),
                None => Ok(TransformOutput::default()),
            }
        })
    }
}

/// [`TransformSet`] of fakes sharing one [`InvocationLog`].
#[derive(Debug, Clone, Default)]
pub struct FakeTransforms {
    log: InvocationLog,
    overrides: HashMap<String, FakeTransform>,
}

impl FakeTransforms {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(&self) -> InvocationLog {
        self.log.clone()
    }

    /// Make the leaf named `name` fail with `message`.
    pub fn failing(mut self, name: &str, message: &str) -> Self {
        let fake = self.get(name).failing(message);
        self.overrides.insert(name.to_string(), fake);
        self
    }

    /// Make the leaf named `name` sleep before finishing.
    pub fn delayed(mut self, name: &str, delay: Duration) -> Self {
        let fake = self.get(name).with_delay(delay);
        self.overrides.insert(name.to_string(), fake);
        self
    }

    fn get(&self, name: &str) -> FakeTransform {
        self.overrides
            .get(name)
            .cloned()
            .unwrap_or_else(|| FakeTransform::new(name, self.log.clone()))
    }
}

impl TransformSet for FakeTransforms {
    fn producer(&self, category: Category) -> Result<Arc<dyn Transform>> {
        Ok(Arc::new(self.get(category.as_str())))
    }

    fn clean(&self) -> Arc<dyn Transform> {
        Arc::new(self.get("clean"))
    }

    fn clear_cache(&self) -> Arc<dyn Transform> {
        Arc::new(self.get("clear-cache"))
    }
}
