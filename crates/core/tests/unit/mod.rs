//! # Unit Components
//!
//! This module serves as the central hub for the unit tests of the
//! simulated runtime, organized by crate layer.



/// Unit tests for golden modules and tolerance comparison.
pub mod golden;

/// End-to-end tests driving the validation harness.
pub mod harness;
