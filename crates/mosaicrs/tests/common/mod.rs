//! Shared test utilities for mosaicrs integration tests.
//!
//! This module provides:
//! - `TestHarness` with a registry of instrumented test steps
//! - Builders for documents and pipeline definitions

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::TestHarness;
