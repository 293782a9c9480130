//! Step-by-step notebook lessons with a persistent code environment.
//!
//! A lesson is a notebook whose non-empty cells become steps. The learner
//! walks through them one at a time and can run code steps against a single
//! interpreter namespace shared by the whole lesson. The architecture keeps
//! the same split throughout:
//!
//! - **[`core`]**: Pure, deterministic logic (lesson model, walker, labels,
//!   export). No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting operations (config, notebook files, the
//!   lessons directory, interpreter processes).
//!
//! [`session`] ties a lesson, its walker, and its [`environment`] together;
//! [`render`] turns stored outputs into presentation forms.
//!
//! Code runs unsandboxed in the host Python interpreter. See [`io::kernel`].

pub mod core;
pub mod environment;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod render;
pub mod session;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
