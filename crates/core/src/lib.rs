//! NPU kernel execution and validation library.
//!
//! This crate implements a host-side harness that runs NPU compute kernels
//! on a thread-based device simulation, with the following:
//! 1. **Exec:** Executable code buffers, object-section extraction, shared
//!    libraries, and the func_id kernel registry.
//! 2. **Runtime:** Tensor argument marshaling, block dispatch policies, the
//!    aicpu scheduler, orchestration entry points, and the lifecycle handle.
//! 3. **Memory:** The tracked device allocation pool.
//! 4. **Golden:** Reference modules, deterministic input generation, and
//!    tolerance comparison.
//! 5. **Harness:** Parameterized end-to-end validation with per-output
//!    mismatch reports.
//! 6. **Toolchain:** Host compiler discovery and kernel/orchestration
//!    builds.

/// Common types and constants (core roles, runtime states, errors).
pub mod common;
/// Platform, device, launch, and kernel-manifest configuration.
pub mod config;
/// Built-in reference kernels and orchestrations.
pub mod demo;
/// Executable memory, code extraction, shared libraries, kernel registry.
pub mod exec;
/// Golden reference modules and tolerance comparison.
pub mod golden;
/// End-to-end validation harness.
pub mod harness;
/// Tracked device memory pool.
pub mod mem;
/// Argument marshaling, dispatch, scheduling, and the runtime lifecycle.
pub mod runtime;
/// Host compiler discovery and kernel builds.
pub mod toolchain;

/// Unified error type for every runtime operation.
pub use crate::common::{Result, RuntimeError};
/// Launch shape; construct with `DeviceLaunchConfig::default()` or deserialize.
pub use crate::config::{DeviceContext, DeviceLaunchConfig, Platform};
/// Func_id to loaded-kernel map; build, then share behind `Arc`.
pub use crate::exec::KernelRegistry;
/// Validation driver; pairs a golden module with a runtime spec.
pub use crate::harness::Harness;
/// Lifecycle state machine; `initialize`, `launch`, `finalize`.
pub use crate::runtime::RuntimeHandle;
