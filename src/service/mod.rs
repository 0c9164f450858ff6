//! Service layer: call lifecycle orchestration.

pub mod call_service;

pub use call_service::{CallService, UnregisterOutcome, run_sweep};
