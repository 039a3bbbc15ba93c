//! Run log entries.

pub mod types;

pub use types::{NewRun, RunRecord, RunType, UnknownVariant};
