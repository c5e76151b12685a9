//! Testing infrastructure for runrelay integration tests.
//!
//! - `RecordingBackend`: captures the exact backend call sequence with
//!   deterministic item ids, for order-sensitive assertions
//! - `fixtures`: producer-event builders with deterministic timestamps

pub mod fixtures;
pub mod recording;

pub use recording::{BackendCall, RecordingBackend};
