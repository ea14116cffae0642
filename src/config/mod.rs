// src/config/mod.rs

//! Configuration loading and validation for assetpipe.
//!
//! Responsibilities:
//! - Define the TOML-backed data model and the built-in path table (`model.rs`).
//! - Load an optional config file from disk (`loader.rs`).
//! - Validate invariants like destination disjointness and task acyclicity
//!   (`validate.rs`).

pub mod duration;
pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path, resolve_config};
pub use model::{
    CategoryConfig, CategoryOptions, CompositeTaskConfig, ConfigFile, ConfigSection, PathSpec,
    PathTable, RawConfigFile, ServerSection,
};
