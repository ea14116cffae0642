// src/watch/mod.rs

//! File watching.
//!
//! - [`bindings`] compiles one [`WatchBinding`] per category from config.
//! - [`event_handler`] matches changed paths against bindings and re-runs
//!   the bound task through the orchestrator, then signals reloads.
//! - [`watcher`] wires up the cross-platform `notify` watcher.
//!
//! No debouncing: every event runs each matching task once. Overlapping runs
//! of the same binding wait for each other.

pub mod bindings;
pub mod event_handler;
pub mod path_utils;
pub mod watcher;

pub use bindings::{build_bindings, WatchBinding};
pub use event_handler::WatchDispatcher;
pub use watcher::{spawn_watcher, WatcherHandle};
