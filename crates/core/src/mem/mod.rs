//! Simulated device memory.

/// Tracked allocation pool standing in for device memory.
pub mod pool;

pub use pool::DevicePool;
