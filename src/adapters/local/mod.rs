//! Local adapters for single-host deployment and tests.

pub mod fs;

pub use fs::FsAdapter;
