//! Runtime lifecycle, scheduling, and argument marshaling.
//!
//! This module implements the execution side of the simulated runtime:
//! 1. **Marshaling:** Tensors and the flat argument list handed to
//!    orchestration.
//! 2. **Orchestration:** The bound entry point (native or dlopen'd) and the
//!    execution context it sees.
//! 3. **Dispatch:** The injectable policy assigning compute blocks to
//!    control threads.
//! 4. **Scheduler:** Native threads emulating the control roles.
//! 5. **Handle:** The Created → Initialized → Launched → Finalized state
//!    machine tying it all together.

/// Tensors, tensor sets, and flat argument marshaling.
pub mod args;
/// Block-to-thread dispatch policies.
pub mod dispatch;
/// Runtime handle lifecycle state machine.
pub mod handle;
/// Orchestration units and execution contexts.
pub mod orchestration;
/// Thread-based device scheduler.
pub mod scheduler;

pub use args::{DType, FuncArgs, Tensor, TensorRole, TensorSet};
pub use dispatch::{ContiguousBlocks, DispatchPolicy, RoundRobinBlocks};
pub use handle::RuntimeHandle;
pub use orchestration::{OrchCtx, OrchFn, OrchestrationUnit, RawOrchEntry, RawOrchEnv};
pub use scheduler::{DeviceScheduler, LaunchPlan};
