//! Orchestration units and the execution context they run in.
//!
//! An orchestration unit is the routine that, running on each control
//! thread, decides which kernels run on which compute blocks. Two kinds are
//! supported:
//! 1. **Native:** a Rust function, used by the built-in demo wiring and by
//!    tests.
//! 2. **Foreign:** an entry symbol in a dlopen'd shared library compiled
//!    from orchestration source; it sees the same context through a
//!    `#[repr(C)]` environment struct with a resolve callback.

use std::ffi::c_void;

use crate::common::{KernelFn, Result, RuntimeError};
use crate::exec::library::SharedLibrary;
use crate::exec::registry::KernelRegistry;
use crate::mem::pool::DevicePool;

/// Native orchestration entry: one invocation per control thread.
pub type OrchFn = fn(&OrchCtx<'_>) -> Result<()>;

/// Foreign orchestration entry resolved from a shared library.
///
/// Receives the C environment, the flat argument words, and the word
/// count. A non-zero return fails the calling thread's launch.
pub type RawOrchEntry = unsafe extern "C" fn(*const RawOrchEnv, *const u64, usize) -> i32;

/// C-visible execution environment for foreign orchestration.
///
/// Mirrors [`OrchCtx`]; `registry` is opaque and only meaningful to the
/// `resolve` callback, which returns a null pointer (None) for unknown ids.
#[repr(C)]
#[derive(Debug)]
pub struct RawOrchEnv {
    /// Index of the calling control thread.
    pub thread_idx: u32,
    /// Total control threads in this launch.
    pub thread_num: u32,
    /// Total compute blocks in this launch.
    pub block_dim: u32,
    /// Device id from the launch configuration.
    pub device_id: u32,
    /// Block indices assigned to this thread.
    pub blocks: *const u32,
    /// Number of assigned blocks.
    pub block_count: usize,
    /// Opaque registry pointer for `resolve`.
    pub registry: *const c_void,
    /// Resolves a func_id to its kernel entry; null for unknown ids.
    pub resolve: unsafe extern "C" fn(*const RawOrchEnv, u32) -> Option<KernelFn>,
}

/// Resolve callback handed to foreign orchestration.
unsafe extern "C" fn resolve_kernel(env: *const RawOrchEnv, func_id: u32) -> Option<KernelFn> {
    if env.is_null() {
        return None;
    }
    let env = unsafe { &*env };
    if env.registry.is_null() {
        return None;
    }
    let registry = unsafe { &*(env.registry as *const KernelRegistry) };
    registry.resolve(func_id).ok()
}

/// Execution context seen by native orchestration on one control thread.
#[derive(Debug)]
pub struct OrchCtx<'a> {
    /// Index of the calling control thread.
    pub thread_idx: u32,
    /// Total control threads in this launch.
    pub thread_num: u32,
    /// Total compute blocks in this launch.
    pub block_dim: u32,
    /// Device id from the launch configuration.
    pub device_id: u32,
    /// Block indices assigned to this thread by the dispatch policy.
    pub blocks: &'a [u32],
    registry: &'a KernelRegistry,
    pool: &'a DevicePool,
    args: &'a [u64],
}

impl<'a> OrchCtx<'a> {
    /// Builds a context. Called by the scheduler, once per thread.
    pub(crate) fn new(
        thread_idx: u32,
        thread_num: u32,
        block_dim: u32,
        device_id: u32,
        blocks: &'a [u32],
        registry: &'a KernelRegistry,
        pool: &'a DevicePool,
        args: &'a [u64],
    ) -> Self {
        Self {
            thread_idx,
            thread_num,
            block_dim,
            device_id,
            blocks,
            registry,
            pool,
            args,
        }
    }

    /// The flat argument words bound at initialization.
    pub fn args(&self) -> &[u64] {
        self.args
    }

    /// Resolves a func_id through the shared registry.
    pub fn resolve(&self, func_id: u32) -> Result<KernelFn> {
        self.registry.resolve(func_id)
    }

    /// Scratch memory pool shared across this runtime's threads.
    pub fn pool(&self) -> &DevicePool {
        self.pool
    }
}

/// The bound entry point of an orchestration unit.
#[derive(Debug)]
enum OrchEntry {
    Native(OrchFn),
    Foreign(RawOrchEntry),
}

/// A loaded orchestration routine with its declared kernel dependencies.
///
/// For the foreign kind, the unit keeps the backing shared library mapped
/// for as long as it lives; the entry pointer never outlives it.
#[derive(Debug)]
pub struct OrchestrationUnit {
    entry: OrchEntry,
    required: Vec<u32>,
    _library: Option<SharedLibrary>,
}

impl OrchestrationUnit {
    /// Wraps a native orchestration function.
    ///
    /// `required_func_ids` lists every kernel id the routine dispatches;
    /// the launch validates them against the registry before spawning any
    /// thread.
    pub fn native(entry: OrchFn, required_func_ids: &[u32]) -> Self {
        Self {
            entry: OrchEntry::Native(entry),
            required: required_func_ids.to_vec(),
            _library: None,
        }
    }

    /// Loads a shared-library image and binds `entry_symbol` as the entry.
    ///
    /// Fails with [`RuntimeError::Load`] if the image cannot be loaded and
    /// [`RuntimeError::SymbolNotFound`] if the symbol is absent.
    pub fn from_shared_library(
        bytes: &[u8],
        entry_symbol: &str,
        required_func_ids: &[u32],
    ) -> Result<Self> {
        let library = SharedLibrary::load_from_bytes(bytes)?;
        let sym = library.symbol(entry_symbol)?;
        // The symbol stays valid while `library` is kept alive below.
        let entry = unsafe { std::mem::transmute::<*mut c_void, RawOrchEntry>(sym) };
        Ok(Self {
            entry: OrchEntry::Foreign(entry),
            required: required_func_ids.to_vec(),
            _library: Some(library),
        })
    }

    /// Kernel ids this unit declares it will dispatch.
    pub fn required_func_ids(&self) -> &[u32] {
        &self.required
    }

    /// Runs the entry on the calling thread.
    pub(crate) fn invoke(&self, ctx: &OrchCtx<'_>) -> Result<()> {
        match self.entry {
            OrchEntry::Native(f) => f(ctx),
            OrchEntry::Foreign(f) => {
                let env = RawOrchEnv {
                    thread_idx: ctx.thread_idx,
                    thread_num: ctx.thread_num,
                    block_dim: ctx.block_dim,
                    device_id: ctx.device_id,
                    blocks: ctx.blocks.as_ptr(),
                    block_count: ctx.blocks.len(),
                    registry: ctx.registry as *const KernelRegistry as *const c_void,
                    resolve: resolve_kernel,
                };
                let rc = unsafe { f(&env, ctx.args.as_ptr(), ctx.args.len()) };
                if rc != 0 {
                    return Err(RuntimeError::Orchestration(format!(
                        "entry returned {rc}"
                    )));
                }
                Ok(())
            }
        }
    }
}
