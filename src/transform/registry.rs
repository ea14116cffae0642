// src/transform/registry.rs

use std::sync::Arc;

use crate::config::ConfigFile;
use crate::errors::Result;
use crate::fs::FileSystem;
use crate::transform::builtin::{CleanTransform, ClearCacheTransform};
use crate::transform::pipeline::AssetPipeline;
use crate::transform::steps::{
    CachedOptimizeStep, ExternalCommandStep, IncludeStep, MinifyStep, SourceMapStep, SuffixStep,
};
use crate::transform::{Transform, TransformSet};
use crate::types::Category;

/// The real per-category pipelines, assembled from a validated config.
#[derive(Debug, Clone)]
pub struct BuiltinTransforms {
    cfg: Arc<ConfigFile>,
    fs: Arc<dyn FileSystem>,
}

impl BuiltinTransforms {
    pub fn new(cfg: Arc<ConfigFile>, fs: Arc<dyn FileSystem>) -> Self {
        Self { cfg, fs }
    }

    /// Pipeline for one category, with every mode-gated step attached.
    pub fn pipeline(&self, category: Category) -> Result<AssetPipeline> {
        let spec = self.cfg.paths().get(category)?;
        let opts = self.cfg.options(category);
        let label = format!("build {category}");
        let base = AssetPipeline::new(label, Arc::clone(&self.fs), spec);

        let pipeline = match category {
            Category::Html => base.step(IncludeStep::directives()),
            Category::Scripts => base
                .step(IncludeStep::directives())
                .production(MinifyStep::js())
                .production(SuffixStep::min())
                .development(SourceMapStep::new()),
            Category::Styles => {
                let base = match opts.compiler {
                    Some(cmd) => base.step(ExternalCommandStep::new("compile", cmd).with_extension("css")),
                    None => base.step(IncludeStep::scss()),
                };
                let base = match opts.prefixer {
                    Some(cmd) => base.step(ExternalCommandStep::new("prefix", cmd)),
                    None => base,
                };
                base.production(MinifyStep::css())
                    .production(SuffixStep::min())
                    .development(SourceMapStep::new())
            }
            Category::Images => {
                base.production(CachedOptimizeStep::new(opts.optimizer, self.cfg.cache_dir()))
            }
            Category::Fonts => base,
        };
        Ok(pipeline)
    }
}

impl TransformSet for BuiltinTransforms {
    fn producer(&self, category: Category) -> Result<Arc<dyn Transform>> {
        Ok(Arc::new(self.pipeline(category)?))
    }

    fn clean(&self) -> Arc<dyn Transform> {
        Arc::new(CleanTransform::new(
            Arc::clone(&self.fs),
            self.cfg.paths().output_root(),
        ))
    }

    fn clear_cache(&self) -> Arc<dyn Transform> {
        Arc::new(ClearCacheTransform::new(Arc::clone(&self.fs), self.cfg.cache_dir()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;
    use crate::types::BuildMode;

    fn transforms() -> BuiltinTransforms {
        let cfg = ConfigFile::defaults().unwrap().with_root("/p");
        BuiltinTransforms::new(Arc::new(cfg), Arc::new(MockFileSystem::new()))
    }

    #[test]
    fn styles_steps_depend_on_mode() {
        let styles = transforms().pipeline(Category::Styles).unwrap();
        assert_eq!(
            styles.step_names(BuildMode::Production),
            vec!["read", "compile", "minify", "rename", "write"]
        );
        assert_eq!(
            styles.step_names(BuildMode::Development),
            vec!["read", "compile", "sourcemap", "write"]
        );
    }

    #[test]
    fn fonts_are_copied() {
        let fonts = transforms().pipeline(Category::Fonts).unwrap();
        assert_eq!(fonts.step_names(BuildMode::Production), vec!["read", "write"]);
    }
}
