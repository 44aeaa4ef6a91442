//! Testing utilities for campaign pipelines.
//!
//! This module provides:
//! - Deterministic fakes for every external collaborator
//! - Sample domain fixtures
//! - Assertions over campaign results and progress

mod assertions;
pub mod fixtures;
pub mod mocks;

pub use assertions::{
    assert_has_degradation, assert_monotonic, assert_no_degradation, assert_stage_completed,
};
pub use mocks::{
    demo_reasoning, FailingStore, FakeEnricher, FakeJobProvider, FakePeopleSearch, FakeWriter,
    ScriptedReasoning, StaticFetcher,
};
