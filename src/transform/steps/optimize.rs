// src/transform/steps/optimize.rs

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, trace};

use crate::exec::pipe_through;
use crate::fs::blocking;
use crate::transform::asset::Asset;
use crate::transform::pipeline::{Step, StepContext, StepFuture};

/// Content-addressed optimisation of binary assets.
///
/// With a command configured, each asset is piped through it and the result
/// stored under `cache_dir/<blake3(command, input)>`; an unchanged input is
/// served from the cache on the next build. Without a command the bytes are
/// copied unchanged.
#[derive(Debug, Clone)]
pub struct CachedOptimizeStep {
    command: Option<String>,
    cache_dir: PathBuf,
}

impl CachedOptimizeStep {
    pub fn new(command: Option<String>, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            command,
            cache_dir: cache_dir.into(),
        }
    }

    fn cache_key(command: &str, contents: &[u8]) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(command.as_bytes());
        hasher.update(&[0]);
        hasher.update(contents);
        hasher.finalize().to_hex().to_string()
    }

    async fn optimize(&self, command: &str, asset: &mut Asset, ctx: &StepContext) -> Result<()> {
        let key = Self::cache_key(command, &asset.contents);
        let cached = self.cache_dir.join(&key);

        let fs = Arc::clone(&ctx.fs);
        let lookup = cached.clone();
        let hit = blocking(move || {
            if fs.is_file(&lookup) {
                fs.read(&lookup).map(Some)
            } else {
                Ok(None)
            }
        })
        .await?;

        if let Some(contents) = hit {
            trace!(path = %asset.rel_path.display(), key = %key, "optimizer cache hit");
            asset.contents = contents;
            return Ok(());
        }

        debug!(path = %asset.rel_path.display(), key = %key, "optimizer cache miss");
        let out = pipe_through(command, &asset.contents, &ctx.root).await?;
        let fs = Arc::clone(&ctx.fs);
        let entry = out.clone();
        blocking(move || {
            fs.write(&cached, &entry)
                .with_context(|| format!("writing optimizer cache entry {key}"))
        })
        .await?;
        asset.contents = out;
        Ok(())
    }
}

impl Step for CachedOptimizeStep {
    fn name(&self) -> &str {
        "optimize"
    }

    fn apply<'a>(&'a self, mut assets: Vec<Asset>, ctx: &'a StepContext) -> StepFuture<'a> {
        Box::pin(async move {
            let Some(command) = self.command.as_deref() else {
                return Ok(assets);
            };
            for asset in assets.iter_mut() {
                self.optimize(command, asset, ctx).await?;
            }
            Ok(assets)
        })
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Arc;

    use super::*;
    use crate::fs::mock::MockFileSystem;
    use crate::fs::FileSystem;

    #[test]
    fn key_depends_on_command_and_contents() {
        let a = CachedOptimizeStep::cache_key("opt", b"x");
        assert_eq!(a, CachedOptimizeStep::cache_key("opt", b"x"));
        assert_ne!(a, CachedOptimizeStep::cache_key("opt -9", b"x"));
        assert_ne!(a, CachedOptimizeStep::cache_key("opt", b"y"));
    }

    #[tokio::test]
    async fn cache_hit_skips_the_command() {
        let fs = MockFileSystem::new();
        let key = CachedOptimizeStep::cache_key("false", b"raw");
        fs.add_file(format!("/p/.cache/{key}"), "optimized");
        let ctx = StepContext {
            fs: Arc::new(fs.clone()),
            root: "/p".into(),
        };

        // `false` would fail if it were actually run.
        let step = CachedOptimizeStep::new(Some("false".into()), "/p/.cache");
        let asset = Asset::new("a.png".into(), "/p/src/img/a.png".into(), b"raw".to_vec());
        let out = step.apply(vec![asset], &ctx).await.unwrap();

        assert_eq!(out[0].contents, b"optimized");
        assert!(fs.is_file(Path::new(&format!("/p/.cache/{key}"))));
    }

    #[tokio::test]
    async fn no_command_copies_bytes() {
        let fs = MockFileSystem::new();
        let ctx = StepContext {
            fs: Arc::new(fs.clone()),
            root: "/p".into(),
        };
        let step = CachedOptimizeStep::new(None, "/p/.cache");
        let asset = Asset::new("a.png".into(), "/p/src/img/a.png".into(), vec![1, 2, 3]);
        let out = step.apply(vec![asset], &ctx).await.unwrap();
        assert_eq!(out[0].contents, vec![1, 2, 3]);
        assert!(fs.files().is_empty());
    }
}
