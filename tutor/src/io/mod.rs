//! I/O helpers for lessons and code execution.

pub mod config;
pub mod kernel;
pub mod library;
pub mod notebook;
pub mod process;
