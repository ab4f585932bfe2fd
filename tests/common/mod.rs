#![allow(dead_code)]

pub mod fixtures;
pub mod harness;

// Re-export commonly used test utilities
pub use fixtures::{call, text, Reply, ScriptedModel, LIGHT_THEME};
pub use harness::TestHarness;
