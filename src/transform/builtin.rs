// src/transform/builtin.rs

//! Transforms that remove files rather than produce them.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use crate::fs::{blocking, FileSystem};
use crate::transform::{Transform, TransformContext, TransformError, TransformFuture, TransformOutput};

/// Empties the output root, keeping the directory itself.
#[derive(Debug, Clone)]
pub struct CleanTransform {
    fs: Arc<dyn FileSystem>,
    output_root: PathBuf,
}

impl CleanTransform {
    pub fn new(fs: Arc<dyn FileSystem>, output_root: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            output_root: output_root.into(),
        }
    }

}

fn empty_dir(fs: &dyn FileSystem, target: &Path) -> Result<usize> {
    if !fs.is_dir(target) {
        return Ok(0);
    }

    let entries = fs.read_dir(target)?;
    for entry in &entries {
        if fs.is_dir(entry) {
            fs.remove_dir_all(entry)?;
        } else {
            fs.remove_file(entry)?;
        }
    }
    Ok(entries.len())
}

impl Transform for CleanTransform {
    fn describe(&self) -> String {
        format!("clean {}", self.output_root.display())
    }

    fn run<'a>(&'a self, ctx: &'a TransformContext) -> TransformFuture<'a> {
        Box::pin(async move {
            let fs = Arc::clone(&self.fs);
            let target = ctx.root.join(&self.output_root);
            let removed = blocking(move || empty_dir(fs.as_ref(), &target))
                .await
                .map_err(|e| TransformError::from_anyhow("remove", &e))?;
            info!(output_root = %self.output_root.display(), removed, "cleaned output root");
            Ok(TransformOutput::default())
        })
    }
}

/// Deletes the optimiser cache directory.
#[derive(Debug, Clone)]
pub struct ClearCacheTransform {
    fs: Arc<dyn FileSystem>,
    cache_dir: PathBuf,
}

impl ClearCacheTransform {
    pub fn new(fs: Arc<dyn FileSystem>, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            cache_dir: cache_dir.into(),
        }
    }
}

impl Transform for ClearCacheTransform {
    fn describe(&self) -> String {
        format!("clear cache {}", self.cache_dir.display())
    }

    fn run<'a>(&'a self, ctx: &'a TransformContext) -> TransformFuture<'a> {
        Box::pin(async move {
            let fs = Arc::clone(&self.fs);
            let target = ctx.root.join(&self.cache_dir);
            let removed = blocking(move || {
                if !fs.is_dir(&target) {
                    return Ok(None);
                }
                fs.remove_dir_all(&target)?;
                Ok(Some(target))
            })
            .await
            .map_err(|e| TransformError::from_anyhow("remove", &e))?;
            if let Some(dir) = removed {
                info!(cache_dir = %dir.display(), "cleared optimizer cache");
            }
            Ok(TransformOutput::default())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;
    use crate::types::BuildMode;

    fn ctx() -> TransformContext {
        TransformContext {
            root: PathBuf::from("/p"),
            mode: BuildMode::Development,
        }
    }

    #[tokio::test]
    async fn clean_keeps_root_and_sources() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/dist/css/main.css", "x");
        fs.add_file("/p/dist/stray.txt", "x");
        fs.add_file("/p/src/sass/main.scss", "y");

        CleanTransform::new(Arc::new(fs.clone()), "dist")
            .run(&ctx())
            .await
            .unwrap();

        assert_eq!(fs.files(), vec![PathBuf::from("/p/src/sass/main.scss")]);
        assert!(fs.is_dir(Path::new("/p/dist")));
    }

    #[tokio::test]
    async fn clean_of_missing_root_succeeds() {
        let fs = MockFileSystem::new();
        fs.add_dir("/p");
        let out = CleanTransform::new(Arc::new(fs), "dist").run(&ctx()).await;
        assert!(out.is_ok());
    }

    #[tokio::test]
    async fn clear_cache_removes_cache_dir() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/.assetpipe/cache/abc", "x");
        ClearCacheTransform::new(Arc::new(fs.clone()), ".assetpipe/cache")
            .run(&ctx())
            .await
            .unwrap();
        assert!(fs.files().is_empty());
    }
}
