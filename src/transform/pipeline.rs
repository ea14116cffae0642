// src/transform/pipeline.rs

//! Ordered, mode-gated sub-steps folded over an asset set.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info};

use crate::config::model::PathSpec;
use crate::fs::{blocking, FileSystem};
use crate::transform::asset::{collect_sources, glob_base, Asset};
use crate::transform::{Transform, TransformContext, TransformError, TransformFuture, TransformOutput};
use crate::types::BuildMode;

pub type StepFuture<'a> = Pin<Box<dyn Future<Output = Result<Vec<Asset>>> + Send + 'a>>;

/// Shared handles a step may need.
#[derive(Debug, Clone)]
pub struct StepContext {
    pub fs: Arc<dyn FileSystem>,
    pub root: PathBuf,
}

/// One named sub-step: takes the current assets, returns the next ones.
pub trait Step: Send + Sync {
    fn name(&self) -> &str;
    fn apply<'a>(&'a self, assets: Vec<Asset>, ctx: &'a StepContext) -> StepFuture<'a>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Gate {
    Always,
    Production,
    Development,
}

impl Gate {
    fn admits(&self, mode: BuildMode) -> bool {
        match self {
            Gate::Always => true,
            Gate::Production => mode == BuildMode::Production,
            Gate::Development => mode == BuildMode::Development,
        }
    }
}

/// `read -> steps... -> write` for one category.
pub struct AssetPipeline {
    label: String,
    fs: Arc<dyn FileSystem>,
    source_pattern: String,
    dest_dir: PathBuf,
    steps: Vec<(Gate, Box<dyn Step>)>,
}

impl std::fmt::Debug for AssetPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetPipeline")
            .field("label", &self.label)
            .field("source_pattern", &self.source_pattern)
            .field("dest_dir", &self.dest_dir)
            .finish_non_exhaustive()
    }
}

impl AssetPipeline {
    pub fn new(label: impl Into<String>, fs: Arc<dyn FileSystem>, spec: &PathSpec) -> Self {
        Self {
            label: label.into(),
            fs,
            source_pattern: spec.source_pattern.clone(),
            dest_dir: spec.dest_dir.clone(),
            steps: Vec::new(),
        }
    }

    /// Step that runs in every mode.
    pub fn step(mut self, step: impl Step + 'static) -> Self {
        self.steps.push((Gate::Always, Box::new(step)));
        self
    }

    /// Step that only runs in production builds.
    pub fn production(mut self, step: impl Step + 'static) -> Self {
        self.steps.push((Gate::Production, Box::new(step)));
        self
    }

    /// Step that only runs in development builds.
    pub fn development(mut self, step: impl Step + 'static) -> Self {
        self.steps.push((Gate::Development, Box::new(step)));
        self
    }

    /// Steps selected for `mode`, in order.
    pub fn plan(&self, mode: BuildMode) -> Vec<&dyn Step> {
        self.steps
            .iter()
            .filter(|(gate, _)| gate.admits(mode))
            .map(|(_, step)| step.as_ref())
            .collect()
    }

    /// Full step list for `mode`, including the implicit `read` and `write`.
    pub fn step_names(&self, mode: BuildMode) -> Vec<String> {
        let mut names = vec!["read".to_string()];
        names.extend(self.plan(mode).iter().map(|s| s.name().to_string()));
        names.push("write".to_string());
        names
    }

    async fn execute(&self, ctx: &TransformContext) -> Result<TransformOutput, TransformError> {
        // Decided once per invocation so every file sees the same steps.
        let plan = self.plan(ctx.mode);
        let step_ctx = StepContext {
            fs: Arc::clone(&self.fs),
            root: ctx.root.clone(),
        };

        let fs = Arc::clone(&self.fs);
        let root = ctx.root.clone();
        let pattern = self.source_pattern.clone();
        let mut assets = blocking(move || read_sources(fs.as_ref(), &root, &pattern))
            .await
            .map_err(|e| TransformError::from_anyhow("read", &e))?;
        debug!(transform = %self.label, files = assets.len(), "read sources");

        for step in plan {
            assets = step
                .apply(assets, &step_ctx)
                .await
                .map_err(|e| TransformError::from_anyhow(step.name(), &e))?;
            debug!(transform = %self.label, step = step.name(), files = assets.len(), "step done");
        }

        let fs = Arc::clone(&self.fs);
        let dest = ctx.root.join(&self.dest_dir);
        let written = blocking(move || write_assets(fs.as_ref(), &dest, &assets))
            .await
            .map_err(|e| TransformError::from_anyhow("write", &e))?;
        info!(transform = %self.label, files = written.len(), mode = %ctx.mode, "wrote outputs");

        Ok(TransformOutput { written })
    }
}

fn read_sources(fs: &dyn FileSystem, root: &Path, pattern: &str) -> Result<Vec<Asset>> {
    let base = root.join(glob_base(pattern));
    let mut assets = Vec::new();
    for path in collect_sources(fs, root, pattern)? {
        let contents = fs.read(&path)?;
        let rel = path.strip_prefix(&base).unwrap_or(&path).to_path_buf();
        assets.push(Asset::new(rel, path, contents));
    }
    Ok(assets)
}

fn write_assets(fs: &dyn FileSystem, dest: &Path, assets: &[Asset]) -> Result<Vec<PathBuf>> {
    let mut written = Vec::with_capacity(assets.len());
    for asset in assets {
        let target = dest.join(&asset.rel_path);
        fs.write(&target, &asset.contents)?;
        written.push(target);
    }
    Ok(written)
}

impl Transform for AssetPipeline {
    fn describe(&self) -> String {
        self.label.clone()
    }

    fn run<'a>(&'a self, ctx: &'a TransformContext) -> TransformFuture<'a> {
        Box::pin(self.execute(ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;
    use crate::types::Category;

    struct Upper;

    impl Step for Upper {
        fn name(&self) -> &str {
            "upper"
        }

        fn apply<'a>(&'a self, mut assets: Vec<Asset>, _ctx: &'a StepContext) -> StepFuture<'a> {
            Box::pin(async move {
                for a in assets.iter_mut() {
                    a.contents = a.contents.to_ascii_uppercase();
                }
                Ok(assets)
            })
        }
    }

    struct Boom;

    impl Step for Boom {
        fn name(&self) -> &str {
            "boom"
        }

        fn apply<'a>(&'a self, _assets: Vec<Asset>, _ctx: &'a StepContext) -> StepFuture<'a> {
            Box::pin(async { Err(anyhow::anyhow!("exploded")) })
        }
    }

    fn spec() -> PathSpec {
        PathSpec {
            category: Category::Fonts,
            source_pattern: "src/f/**/*.txt".to_string(),
            dest_dir: PathBuf::from("dist/f"),
            watch_pattern: "src/f/**/*.txt".to_string(),
        }
    }

    #[tokio::test]
    async fn gated_steps_follow_mode() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/src/f/a/b.txt", "hi");
        let pipeline = AssetPipeline::new("t", Arc::new(fs.clone()), &spec()).production(Upper);

        let ctx = TransformContext {
            root: PathBuf::from("/p"),
            mode: BuildMode::Development,
        };
        pipeline.run(&ctx).await.unwrap();
        assert_eq!(fs.read(Path::new("/p/dist/f/a/b.txt")).unwrap(), b"hi");

        let ctx = TransformContext {
            mode: BuildMode::Production,
            ..ctx
        };
        pipeline.run(&ctx).await.unwrap();
        assert_eq!(fs.read(Path::new("/p/dist/f/a/b.txt")).unwrap(), b"HI");
    }

    #[tokio::test]
    async fn failing_step_short_circuits_before_write() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/src/f/x.txt", "x");
        let pipeline = AssetPipeline::new("t", Arc::new(fs.clone()), &spec())
            .step(Boom)
            .step(Upper);

        let ctx = TransformContext {
            root: PathBuf::from("/p"),
            mode: BuildMode::Development,
        };
        let err = pipeline.run(&ctx).await.unwrap_err();
        assert_eq!(err.step, "boom");
        assert!(err.message.contains("exploded"));
        assert!(fs.files_under("/p/dist").is_empty());
        assert_eq!(
            pipeline.step_names(BuildMode::Development),
            vec!["read", "boom", "upper", "write"]
        );
    }
}
