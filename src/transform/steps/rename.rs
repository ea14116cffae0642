// src/transform/steps/rename.rs

use crate::transform::asset::Asset;
use crate::transform::pipeline::{Step, StepContext, StepFuture};

/// Insert a suffix before the extension of every asset (`main.css` -> `main.min.css`).
#[derive(Debug, Clone)]
pub struct SuffixStep {
    suffix: String,
}

impl SuffixStep {
    pub fn new(suffix: impl Into<String>) -> Self {
        Self {
            suffix: suffix.into(),
        }
    }

    pub fn min() -> Self {
        Self::new(".min")
    }
}

impl Step for SuffixStep {
    fn name(&self) -> &str {
        "rename"
    }

    fn apply<'a>(&'a self, mut assets: Vec<Asset>, _ctx: &'a StepContext) -> StepFuture<'a> {
        Box::pin(async move {
            for asset in assets.iter_mut() {
                asset.add_suffix(&self.suffix);
            }
            Ok(assets)
        })
    }
}
