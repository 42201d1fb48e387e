//! Tracked device memory pool.
//!
//! In simulation, host memory stands in for device memory; copy-to-device
//! and copy-from-device degenerate to plain memcpy and are not modeled.
//! What remains worth modeling is ownership tracking: every allocation is
//! recorded so leaks are observable and double frees are rejected, and
//! everything left over is released in one sweep at teardown.
//!
//! Orchestration routines use the pool for scratch buffers, so it is
//! callable concurrently from multiple control threads.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::common::{Result, RuntimeError};

/// Thread-safe tracked allocator for simulated device buffers.
///
/// Allocations are zero-initialized, keeping repeated launches
/// deterministic.
#[derive(Default)]
pub struct DevicePool {
    blocks: Mutex<HashMap<usize, Box<[u8]>>>,
}

impl DevicePool {
    /// Creates an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the block map, recovering from a poisoned mutex.
    ///
    /// A panicking control thread can poison the lock mid-launch; the map
    /// itself stays consistent (every operation inserts or removes whole
    /// entries), so teardown and leak accounting proceed on the inner value.
    fn blocks(&self) -> MutexGuard<'_, HashMap<usize, Box<[u8]>>> {
        self.blocks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Allocates `size` zeroed bytes and tracks the block.
    ///
    /// The returned pointer stays valid until it is freed or the pool
    /// releases all blocks.
    pub fn alloc(&self, size: usize) -> Result<*mut u8> {
        if size == 0 {
            return Err(RuntimeError::DeviceMemory(
                "zero-size allocation".into(),
            ));
        }
        let mut block = vec![0u8; size].into_boxed_slice();
        let ptr = block.as_mut_ptr();
        let _ = self.blocks().insert(ptr as usize, block);
        Ok(ptr)
    }

    /// Frees a tracked block.
    ///
    /// Fails with [`RuntimeError::DeviceMemory`] if the pointer is not
    /// tracked (double free or foreign pointer).
    pub fn free(&self, ptr: *mut u8) -> Result<()> {
        match self.blocks().remove(&(ptr as usize)) {
            Some(_) => Ok(()),
            None => Err(RuntimeError::DeviceMemory(format!(
                "free of untracked pointer {ptr:p}"
            ))),
        }
    }

    /// Number of currently tracked allocations.
    pub fn allocation_count(&self) -> usize {
        self.blocks().len()
    }

    /// Releases every remaining block and returns how many there were.
    pub fn release_all(&self) -> usize {
        let mut blocks = self.blocks();
        let count = blocks.len();
        blocks.clear();
        count
    }
}

impl fmt::Debug for DevicePool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DevicePool")
            .field("allocations", &self.allocation_count())
            .finish()
    }
}
