//! Deterministic, pure logic of the materialization engine.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures and return deterministic outputs suitable for tests.

pub mod decoder;
pub mod integrator;
pub mod invariants;
pub mod path;
pub mod projector;
pub mod rate_limit;
pub mod types;
