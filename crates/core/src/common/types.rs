//! Core roles, lifecycle states, and the kernel calling convention.

use std::fmt;

use serde::Deserialize;

/// Unified kernel entry signature.
///
/// Every compute kernel, whether loaded from extracted machine code or
/// registered as a native host function, is invoked through this single
/// signature: a pointer to a flat array of `i64` argument words. Kernels
/// unpack their own arguments, so dispatch needs no per-kernel glue.
///
/// # Safety
///
/// Calling a `KernelFn` is unsafe: the argument array must match the layout
/// the kernel expects, and any pointers packed into it must be valid for the
/// duration of the call.
pub type KernelFn = unsafe extern "C" fn(*mut i64);

/// Processor role a binary targets in the emulated topology.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoreType {
    /// Control role: a management thread driving orchestration.
    Aicpu,
    /// Compute cube role.
    Aic,
    /// Compute vector role.
    Aiv,
}

impl CoreType {
    /// Returns true for the compute roles (aic/aiv).
    pub fn is_compute(self) -> bool {
        matches!(self, CoreType::Aic | CoreType::Aiv)
    }
}

impl fmt::Display for CoreType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoreType::Aicpu => write!(f, "aicpu"),
            CoreType::Aic => write!(f, "aic"),
            CoreType::Aiv => write!(f, "aiv"),
        }
    }
}

/// Lifecycle state of a [`RuntimeHandle`](crate::runtime::RuntimeHandle).
///
/// Transitions are strictly forward: Created → Initialized → Launched →
/// Finalized. Re-entering an earlier state is an error, and Finalized is
/// terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RuntimeState {
    /// Handle exists but no orchestration is bound.
    Created,
    /// Orchestration entry and arguments are bound.
    Initialized,
    /// Control threads are running (or have run and are not yet joined).
    Launched,
    /// All roles joined and resources released. Terminal.
    Finalized,
}

impl fmt::Display for RuntimeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeState::Created => write!(f, "Created"),
            RuntimeState::Initialized => write!(f, "Initialized"),
            RuntimeState::Launched => write!(f, "Launched"),
            RuntimeState::Finalized => write!(f, "Finalized"),
        }
    }
}
