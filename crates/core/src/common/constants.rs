//! Baseline constants for the simulated device topology.
//!
//! These values define the default launch shape when the caller does not
//! override it, and the hard limits the scheduler enforces.

/// Default number of control (aicpu) threads per launch.
pub const DEFAULT_AICPU_THREAD_NUM: u32 = 3;

/// Default number of compute blocks per launch.
pub const DEFAULT_BLOCK_DIM: u32 = 3;

/// Upper bound on control threads accepted by a launch configuration.
pub const MAX_AICPU_THREADS: u32 = 4;

/// Compute vector (aiv) units per block in the emulated topology.
///
/// One block groups one aic unit and `AIV_PER_BLOCK` aiv units. The
/// scheduler itself only deals in block indices; this constant documents
/// the topology the block index stands for.
pub const AIV_PER_BLOCK: u32 = 2;

/// Default relative tolerance for golden comparison.
pub const DEFAULT_RTOL: f32 = 1e-5;

/// Default absolute tolerance for golden comparison.
pub const DEFAULT_ATOL: f32 = 1e-5;
