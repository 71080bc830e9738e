//! I/O collaborators: backend transport, sandbox mounts and configuration.

pub mod backend;
pub mod config;
pub mod mount;
