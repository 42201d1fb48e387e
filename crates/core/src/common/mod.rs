//! Common types shared across the runtime.
//!
//! This module collects the vocabulary the rest of the crate is written in:
//! 1. **Roles and states:** Core roles (aicpu/aic/aiv) and the runtime lifecycle states.
//! 2. **Calling convention:** The unified kernel function signature.
//! 3. **Errors:** The crate-wide error taxonomy.
//! 4. **Constants:** Baseline launch topology and comparison tolerances.

/// Baseline launch topology and tolerance constants.
pub mod constants;
/// Error taxonomy and crate-wide `Result` alias.
pub mod error;
/// Core roles, lifecycle states, and the kernel calling convention.
pub mod types;

pub use error::{Result, RuntimeError};
pub use types::{CoreType, KernelFn, RuntimeState};
