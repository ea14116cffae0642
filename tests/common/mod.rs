#![allow(dead_code)]

use std::sync::Arc;

use assetpipe::app::App;
use assetpipe::config::ConfigFile;
use assetpipe::fs::RealFileSystem;
use assetpipe::types::BuildMode;
use assetpipe_test_utils::{ConfigFileBuilder, FakeTransforms, ProjectDir};

pub use assetpipe_test_utils::{init_tracing, with_timeout};

/// Default layout, rooted at a fake location, wired to fakes.
pub fn fake_app(transforms: &FakeTransforms, builder: ConfigFileBuilder) -> App {
    let cfg = builder.with_root("/project").build();
    App::with_transforms(Arc::new(cfg), transforms).expect("building app from fakes")
}

/// Real transforms over a project directory on disk.
pub fn real_app(project: &ProjectDir, mode: BuildMode) -> App {
    let cfg: ConfigFile = ConfigFileBuilder::new()
        .with_mode(mode)
        .with_root(project.path())
        .build();
    App::new(cfg, Arc::new(RealFileSystem)).expect("building app")
}
