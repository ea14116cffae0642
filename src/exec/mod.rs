// src/exec/mod.rs

//! External process execution.
//!
//! Steps configured with a shell command (`compiler`, `prefixer`,
//! `optimizer`) pipe asset bytes through [`pipe_through`], which runs the
//! command with `tokio::process::Command` under the platform shell.

pub mod command;

pub use command::{pipe_through, shell_command};
