// src/transform/steps/external.rs

use tracing::debug;

use crate::exec::pipe_through;
use crate::transform::asset::{Asset, LineMap};
use crate::transform::pipeline::{Step, StepContext, StepFuture};

/// Pipe every asset through a user-configured shell command.
#[derive(Debug, Clone)]
pub struct ExternalCommandStep {
    name: String,
    command: String,
    output_extension: Option<String>,
}

impl ExternalCommandStep {
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            output_extension: None,
        }
    }

    /// Rename outputs to `ext` (e.g. a stylesheet compiler producing `.css`).
    pub fn with_extension(mut self, ext: impl Into<String>) -> Self {
        self.output_extension = Some(ext.into());
        self
    }
}

impl Step for ExternalCommandStep {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply<'a>(&'a self, mut assets: Vec<Asset>, ctx: &'a StepContext) -> StepFuture<'a> {
        Box::pin(async move {
            for asset in assets.iter_mut() {
                debug!(step = %self.name, path = %asset.rel_path.display(), "running external command");
                asset.contents = pipe_through(&self.command, &asset.contents, &ctx.root).await?;
                asset.lines = LineMap::Unknown;
                if let Some(ext) = &self.output_extension {
                    asset.set_extension(ext);
                }
            }
            Ok(assets)
        })
    }
}
