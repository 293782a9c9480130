//! Deterministic, pure logic shared by the lesson walker.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! lessons and return deterministic outputs suitable for tests.

pub mod export;
pub mod labels;
pub mod types;
pub mod walker;
