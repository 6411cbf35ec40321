//! Integration and property tests for `harel-core`.
//!
//! Lives in its own crate, mirroring the core crate's own test-dependency
//! split, so heavier dev-dependencies (`proptest`, `tracing-subscriber`)
//! never leak into `harel-core`'s own build.

#![cfg(test)]

pub mod common;
pub mod integration;
pub mod property_tests;
