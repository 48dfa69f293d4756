// Common fixtures and utilities for integration tests

pub mod engine;
pub mod packages;
pub mod scripted_net;

pub use engine::*;
pub use packages::*;
pub use scripted_net::ScriptedNet;
