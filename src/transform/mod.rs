// src/transform/mod.rs

//! Transforms: the opaque units of work behind LEAF tasks.
//!
//! - [`asset`] holds the in-memory asset type and source enumeration.
//! - [`pipeline`] folds an ordered, mode-gated list of named [`pipeline::Step`]s
//!   between an implicit `read` and `write`.
//! - [`steps`] contains the concrete steps (include, minify, sourcemap, ...).
//! - [`builtin`] has the non-producing transforms (`clean`, `clear-cache`).
//! - [`registry`] assembles the per-category transforms from config.
//!
//! The orchestrator only sees the [`Transform`] trait, which keeps test fakes
//! and real pipelines interchangeable.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;

use thiserror::Error;

use crate::errors::Result;
use crate::types::{BuildMode, Category};

pub mod asset;
pub mod builtin;
pub mod pipeline;
pub mod registry;
pub mod steps;

pub use builtin::{CleanTransform, ClearCacheTransform};
pub use pipeline::AssetPipeline;
pub use registry::BuiltinTransforms;

/// Per-invocation inputs shared by every transform.
#[derive(Debug, Clone)]
pub struct TransformContext {
    /// Project root all `PathSpec` paths are relative to.
    pub root: PathBuf,
    pub mode: BuildMode,
}

/// What a successful transform produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransformOutput {
    /// Files written, in write order.
    pub written: Vec<PathBuf>,
}

/// A failed sub-step. The first one short-circuits the transform.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{step}: {message}")]
pub struct TransformError {
    pub step: String,
    pub message: String,
}

impl TransformError {
    pub fn new(step: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self {
            step: step.into(),
            message: err.to_string(),
        }
    }

    /// Build from an `anyhow` chain, keeping every context layer.
    pub fn from_anyhow(step: impl Into<String>, err: &anyhow::Error) -> Self {
        Self {
            step: step.into(),
            message: format!("{err:#}"),
        }
    }
}

pub type TransformFuture<'a> =
    Pin<Box<dyn Future<Output = std::result::Result<TransformOutput, TransformError>> + Send + 'a>>;

/// A named, opaque unit of work converting sources into files under a
/// destination directory.
pub trait Transform: Send + Sync {
    /// Short human-readable description (e.g. "compile styles").
    fn describe(&self) -> String;

    /// Run once. Files already written before a failure are left in place.
    fn run<'a>(&'a self, ctx: &'a TransformContext) -> TransformFuture<'a>;
}

/// Source of the transforms wired into the standard task graph.
///
/// Production uses [`BuiltinTransforms`]; tests swap in fakes.
pub trait TransformSet {
    /// Fails only for a category missing from the path table.
    fn producer(&self, category: Category) -> Result<Arc<dyn Transform>>;
    fn clean(&self) -> Arc<dyn Transform>;
    fn clear_cache(&self) -> Arc<dyn Transform>;
}
