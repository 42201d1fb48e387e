//! Thread-based device scheduler.
//!
//! Emulates the accelerator's concurrency topology as native threads in the
//! host process: one launch spawns `aicpu_thread_num` control threads, each
//! invoking the bound orchestration entry with the stored arguments and the
//! compute blocks its dispatch policy assigned. Joining happens in
//! `finalize`; any panic or error in a spawned role is captured there and
//! re-raised with role and thread identity. One failing role fails the
//! whole launch; no partial-result recovery is attempted.
//!
//! There is no cancellation or timeout: a hung kernel hangs the join
//! indefinitely. Acceptable for a test harness; known limitation.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::common::{Result, RuntimeError};
use crate::config::DeviceLaunchConfig;
use crate::exec::registry::KernelRegistry;
use crate::mem::pool::DevicePool;
use crate::runtime::dispatch::DispatchPolicy;
use crate::runtime::orchestration::{OrchCtx, OrchestrationUnit};

/// Everything one launch shares across its control threads.
///
/// Immutable for the duration of the launch; the registry and pool are
/// frozen before any thread starts, so lookups need no locking.
#[derive(Debug)]
pub struct LaunchPlan {
    /// Bound orchestration entry.
    pub orch: OrchestrationUnit,
    /// Frozen kernel registry.
    pub registry: Arc<KernelRegistry>,
    /// Scratch memory pool.
    pub pool: Arc<DevicePool>,
    /// Flat argument words bound at initialization.
    pub args: Vec<u64>,
    /// Launch shape.
    pub config: DeviceLaunchConfig,
    /// Block-to-thread assignment policy.
    pub policy: Box<dyn DispatchPolicy>,
}

/// One spawned control role.
#[derive(Debug)]
struct Worker {
    thread_idx: u32,
    handle: JoinHandle<Result<()>>,
}

/// A set of in-flight control threads for one launch.
#[derive(Debug)]
pub struct DeviceScheduler {
    workers: Vec<Worker>,
}

impl DeviceScheduler {
    /// Validates the plan and spawns its control threads.
    ///
    /// Fails fast, before any thread exists, when the configuration is
    /// invalid or a declared required kernel id is unregistered, so a
    /// misconfigured launch can never leave threads blocking on a kernel
    /// that will never resolve.
    pub fn launch(plan: LaunchPlan) -> Result<Self> {
        plan.config.validate()?;
        for &func_id in plan.orch.required_func_ids() {
            if !plan.registry.contains(func_id) {
                return Err(RuntimeError::UnknownKernel(func_id));
            }
        }

        let thread_num = plan.config.aicpu_thread_num;
        let block_dim = plan.config.block_dim;
        let device_id = plan.config.device_id;
        let shared = Arc::new(plan);

        tracing::info!(thread_num, block_dim, device_id, "launching control threads");

        let mut workers = Vec::with_capacity(thread_num as usize);
        for thread_idx in 0..thread_num {
            let shared = Arc::clone(&shared);
            let handle = thread::Builder::new()
                .name(format!("aicpu-{thread_idx}"))
                .spawn(move || {
                    let blocks = shared.policy.assign(thread_idx, thread_num, block_dim);
                    tracing::debug!(thread_idx, ?blocks, "control thread servicing blocks");
                    let ctx = OrchCtx::new(
                        thread_idx,
                        thread_num,
                        block_dim,
                        device_id,
                        &blocks,
                        &shared.registry,
                        &shared.pool,
                        &shared.args,
                    );
                    shared.orch.invoke(&ctx)
                })
                .map_err(|e| RuntimeError::KernelExecution {
                    role: "aicpu".into(),
                    thread: thread_idx,
                    detail: format!("spawn failed: {e}"),
                })?;
            workers.push(Worker {
                thread_idx,
                handle,
            });
        }

        Ok(Self { workers })
    }

    /// Number of spawned control threads still tracked.
    pub fn thread_count(&self) -> usize {
        self.workers.len()
    }

    /// Blocks until every spawned thread has returned.
    ///
    /// All threads are joined before any error is reported; the first
    /// captured failure (error return or panic) is then re-raised as
    /// [`RuntimeError::KernelExecution`] with the role and thread identity.
    pub fn join(&mut self) -> Result<()> {
        let mut first_error = None;

        for worker in self.workers.drain(..) {
            let thread_idx = worker.thread_idx;
            let outcome = match worker.handle.join() {
                Ok(Ok(())) => None,
                Ok(Err(e)) => Some(wrap_role_error(e, thread_idx)),
                Err(panic) => Some(RuntimeError::KernelExecution {
                    role: "aicpu".into(),
                    thread: thread_idx,
                    detail: panic_message(panic.as_ref()),
                }),
            };
            if let Some(e) = outcome {
                tracing::error!(thread_idx, error = %e, "control thread failed");
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Attaches role/thread identity to an error from a control thread.
fn wrap_role_error(e: RuntimeError, thread_idx: u32) -> RuntimeError {
    match e {
        already @ RuntimeError::KernelExecution { .. } => already,
        other => RuntimeError::KernelExecution {
            role: "aicpu".into(),
            thread: thread_idx,
            detail: other.to_string(),
        },
    }
}

/// Best-effort extraction of a panic payload message.
fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("panicked: {s}")
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("panicked: {s}")
    } else {
        "panicked with non-string payload".to_string()
    }
}
