// src/transform/steps/mod.rs

//! Concrete pipeline steps.

pub mod external;
pub mod include;
pub mod minify;
pub mod optimize;
pub mod rename;
pub mod sourcemap;

pub use external::ExternalCommandStep;
pub use include::IncludeStep;
pub use minify::MinifyStep;
pub use optimize::CachedOptimizeStep;
pub use rename::SuffixStep;
pub use sourcemap::SourceMapStep;
