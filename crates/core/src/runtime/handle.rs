//! Runtime handle: the lifecycle state machine.
//!
//! One handle represents one instantiation of the orchestration logic bound
//! to a device context. Transitions are strictly forward:
//!
//! `Created -> Initialized -> Launched -> Finalized`
//!
//! via `initialize`, `launch`, and `finalize`. Any operation from the
//! wrong state is an [`InvalidState`] error, including a second
//! `finalize`: the state machine never re-enters a prior state, and
//! Finalized is terminal.
//!
//! [`InvalidState`]: crate::common::RuntimeError::InvalidState

use std::sync::Arc;

use crate::common::{Result, RuntimeError, RuntimeState};
use crate::config::{DeviceContext, DeviceLaunchConfig};
use crate::exec::registry::KernelRegistry;
use crate::mem::pool::DevicePool;
use crate::runtime::args::FuncArgs;
use crate::runtime::dispatch::{ContiguousBlocks, DispatchPolicy};
use crate::runtime::orchestration::OrchestrationUnit;
use crate::runtime::scheduler::{DeviceScheduler, LaunchPlan};

/// One runtime instantiation bound to a device context.
///
/// The handle owns the scratch pool for its launches and shares the frozen
/// kernel registry with the control threads it spawns.
#[derive(Debug)]
pub struct RuntimeHandle {
    state: RuntimeState,
    device: DeviceContext,
    registry: Arc<KernelRegistry>,
    pool: Arc<DevicePool>,
    orch: Option<OrchestrationUnit>,
    args: Option<FuncArgs>,
    scheduler: Option<DeviceScheduler>,
}

impl RuntimeHandle {
    /// Creates a handle in the Created state over a frozen registry.
    pub fn new(device: DeviceContext, registry: Arc<KernelRegistry>) -> Self {
        Self {
            state: RuntimeState::Created,
            device,
            registry,
            pool: Arc::new(DevicePool::new()),
            orch: None,
            args: None,
            scheduler: None,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> RuntimeState {
        self.state
    }

    /// Device context this handle is bound to.
    pub fn device(&self) -> DeviceContext {
        self.device
    }

    /// Scratch pool shared with this handle's launches.
    pub fn pool(&self) -> &Arc<DevicePool> {
        &self.pool
    }

    fn expect_state(&self, expected: RuntimeState) -> Result<()> {
        if self.state != expected {
            return Err(RuntimeError::InvalidState {
                expected,
                actual: self.state,
            });
        }
        Ok(())
    }

    /// Binds an orchestration unit and the marshaled arguments.
    ///
    /// Created → Initialized. Any other starting state is
    /// [`RuntimeError::InvalidState`].
    pub fn initialize(&mut self, orch: OrchestrationUnit, args: FuncArgs) -> Result<()> {
        self.expect_state(RuntimeState::Created)?;
        tracing::debug!(
            required = ?orch.required_func_ids(),
            argc = args.len(),
            "runtime initialized"
        );
        self.orch = Some(orch);
        self.args = Some(args);
        self.state = RuntimeState::Initialized;
        Ok(())
    }

    /// Loads a shared-library orchestration binary and initializes with it.
    ///
    /// Convenience over [`initialize`](Self::initialize): loads `bytes`,
    /// resolves `entry_symbol`, and binds the result. Fails with
    /// [`RuntimeError::Load`] or [`RuntimeError::SymbolNotFound`] without
    /// changing state.
    pub fn initialize_from_library(
        &mut self,
        bytes: &[u8],
        entry_symbol: &str,
        required_func_ids: &[u32],
        args: FuncArgs,
    ) -> Result<()> {
        self.expect_state(RuntimeState::Created)?;
        let orch = OrchestrationUnit::from_shared_library(bytes, entry_symbol, required_func_ids)?;
        self.initialize(orch, args)
    }

    /// Launches with the default contiguous dispatch policy.
    ///
    /// Initialized → Launched.
    pub fn launch(&mut self, config: &DeviceLaunchConfig) -> Result<()> {
        self.launch_with_policy(config, Box::new(ContiguousBlocks))
    }

    /// Launches with an injected dispatch policy.
    ///
    /// Initialized → Launched. Validates the configuration and the
    /// orchestration's declared kernel ids before consuming anything; a
    /// launch rejected here leaves the handle Initialized with its bound
    /// orchestration intact, so it can be retried with a corrected
    /// configuration. Once threads spawn, the orchestration is consumed.
    pub fn launch_with_policy(
        &mut self,
        config: &DeviceLaunchConfig,
        policy: Box<dyn DispatchPolicy>,
    ) -> Result<()> {
        self.expect_state(RuntimeState::Initialized)?;

        config.validate()?;
        {
            let orch = self.orch.as_ref().ok_or(RuntimeError::Orchestration(
                "no orchestration bound".into(),
            ))?;
            for &func_id in orch.required_func_ids() {
                if !self.registry.contains(func_id) {
                    return Err(RuntimeError::UnknownKernel(func_id));
                }
            }
        }

        let orch = self.orch.take().ok_or(RuntimeError::Orchestration(
            "no orchestration bound".into(),
        ))?;
        let args = self.args.take().ok_or(RuntimeError::Orchestration(
            "no arguments bound".into(),
        ))?;

        let plan = LaunchPlan {
            orch,
            registry: Arc::clone(&self.registry),
            pool: Arc::clone(&self.pool),
            args: args.into_words(),
            config: *config,
            policy,
        };

        self.scheduler = Some(DeviceScheduler::launch(plan)?);
        self.state = RuntimeState::Launched;
        Ok(())
    }

    /// Joins every spawned role and releases per-launch resources.
    ///
    /// Launched → Finalized. Blocks until all control threads have
    /// returned; the first captured failure is re-raised as
    /// [`RuntimeError::KernelExecution`]. The handle transitions to
    /// Finalized even when a role failed; the launch is over either way.
    /// Host tensor contents are well-defined for reading only after this
    /// returns.
    pub fn finalize(&mut self) -> Result<()> {
        self.expect_state(RuntimeState::Launched)?;

        let mut scheduler = self.scheduler.take().ok_or(RuntimeError::Orchestration(
            "no scheduler for launched runtime".into(),
        ))?;
        let outcome = scheduler.join();

        let leaked = self.pool.release_all();
        if leaked > 0 {
            tracing::warn!(leaked, "scratch allocations left at finalize");
        }

        self.state = RuntimeState::Finalized;
        outcome
    }
}
