//! Kernel registry: the func_id → code-pointer mapping.
//!
//! The registry is built once per runtime build and then frozen: every
//! registration needs `&mut self`, and the runtime handle shares the
//! finished registry behind an `Arc`, so concurrent lookup from control
//! threads needs no locking. All executable mappings are released when the
//! registry is cleared or dropped; resolved pointers must not outlive it.

use std::collections::HashMap;
use std::mem;

use crate::common::{CoreType, KernelFn, Result, RuntimeError};
use crate::exec::code_buffer::ExecBuffer;

/// Loaded image backing one registered kernel.
#[derive(Debug)]
enum KernelImage {
    /// Raw machine code in an executable mapping.
    Mapped(ExecBuffer),
    /// Host function registered directly (simulation-native path).
    Native(KernelFn),
}

/// One registered kernel.
#[derive(Debug)]
pub struct LoadedKernel {
    core_type: CoreType,
    image: KernelImage,
}

impl LoadedKernel {
    /// Role this kernel targets.
    pub fn core_type(&self) -> CoreType {
        self.core_type
    }

    /// Size of the loaded code image in bytes; zero for native kernels.
    pub fn code_len(&self) -> usize {
        match &self.image {
            KernelImage::Mapped(buf) => buf.len(),
            KernelImage::Native(_) => 0,
        }
    }

    /// Size of the backing executable mapping; `None` for native kernels.
    pub fn mapped_capacity(&self) -> Option<usize> {
        match &self.image {
            KernelImage::Mapped(buf) => Some(buf.capacity()),
            KernelImage::Native(_) => None,
        }
    }
}

/// Mapping from function id to loaded kernel, scoped to one runtime build.
#[derive(Debug, Default)]
pub struct KernelRegistry {
    kernels: HashMap<u32, LoadedKernel>,
}

impl KernelRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads raw code bytes into executable memory and registers them.
    ///
    /// Fails with [`RuntimeError::DuplicateKernel`] if `func_id` is already
    /// present, or [`RuntimeError::MemoryMap`] if the mapping fails.
    pub fn register(&mut self, func_id: u32, core_type: CoreType, code: &[u8]) -> Result<()> {
        if self.kernels.contains_key(&func_id) {
            return Err(RuntimeError::DuplicateKernel(func_id));
        }
        let buf = ExecBuffer::new(code)?;
        tracing::debug!(func_id, %core_type, len = code.len(), "registered kernel");
        let _ = self.kernels.insert(
            func_id,
            LoadedKernel {
                core_type,
                image: KernelImage::Mapped(buf),
            },
        );
        Ok(())
    }

    /// Registers a host function directly, without an executable mapping.
    ///
    /// This is the simulation-native path: the kernel already lives in the
    /// host process and only needs a dispatch slot.
    pub fn register_native(
        &mut self,
        func_id: u32,
        core_type: CoreType,
        kernel: KernelFn,
    ) -> Result<()> {
        if self.kernels.contains_key(&func_id) {
            return Err(RuntimeError::DuplicateKernel(func_id));
        }
        tracing::debug!(func_id, %core_type, "registered native kernel");
        let _ = self.kernels.insert(
            func_id,
            LoadedKernel {
                core_type,
                image: KernelImage::Native(kernel),
            },
        );
        Ok(())
    }

    /// Resolves a function id to its callable entry point.
    ///
    /// Fails with [`RuntimeError::UnknownKernel`] for unregistered ids. The
    /// returned pointer is valid only while this registry is alive.
    pub fn resolve(&self, func_id: u32) -> Result<KernelFn> {
        let kernel = self
            .kernels
            .get(&func_id)
            .ok_or(RuntimeError::UnknownKernel(func_id))?;
        match &kernel.image {
            KernelImage::Native(f) => Ok(*f),
            KernelImage::Mapped(buf) => {
                // The buffer is read+execute and lives as long as `self`.
                Ok(unsafe { mem::transmute::<*const u8, KernelFn>(buf.entry_ptr()) })
            }
        }
    }

    /// Returns the registered kernel for an id, if any.
    pub fn get(&self, func_id: u32) -> Option<&LoadedKernel> {
        self.kernels.get(&func_id)
    }

    /// Returns true if `func_id` is registered.
    pub fn contains(&self, func_id: u32) -> bool {
        self.kernels.contains_key(&func_id)
    }

    /// Number of registered kernels.
    pub fn len(&self) -> usize {
        self.kernels.len()
    }

    /// Returns true if no kernels are registered.
    pub fn is_empty(&self) -> bool {
        self.kernels.is_empty()
    }

    /// Registered function ids, in no particular order.
    pub fn func_ids(&self) -> Vec<u32> {
        self.kernels.keys().copied().collect()
    }

    /// Removes every kernel and releases all executable mappings.
    ///
    /// Required before a new build reuses the same func_id space; stale
    /// pointers resolved earlier become invalid.
    pub fn clear(&mut self) {
        self.kernels.clear();
    }
}
