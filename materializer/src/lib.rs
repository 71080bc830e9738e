//! Incremental workspace materialization engine.
//!
//! A generation session streams build-plan steps out of a model backend; the
//! engine folds them into a single workspace tree, projects that tree into a
//! sandbox mount descriptor, and paces the backend when it throttles.
//!
//! - **[`core`]**: Pure, deterministic logic (integration, projection, decoding,
//!   rate limiting). No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting collaborators (HTTP backend, directory mount,
//!   config files). Isolated behind traits to enable scripted doubles in tests.
//!
//! Orchestration modules ([`session`], [`workspace`], [`builder`]) wire core
//! logic to the collaborators.

pub mod builder;
pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod session;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod tree;
pub mod workspace;
