//! Error taxonomy for the simulated runtime.
//!
//! Every failure mode in the crate maps onto one variant of
//! [`RuntimeError`]. All variants are fatal for the operation that raised
//! them; the validation harness treats numeric mismatch as a case result
//! rather than an error, so it does not appear here.

use thiserror::Error;

use super::types::RuntimeState;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, RuntimeError>;

/// All failure modes of the simulated runtime.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// A toolchain invocation exited non-zero. Aborts the run.
    #[error("build failed in {stage}: {detail}")]
    Build {
        /// Pipeline stage that failed (e.g. "compile_incore").
        stage: String,
        /// Compiler exit status and captured stderr.
        detail: String,
    },

    /// A binary could not be loaded into the process.
    #[error("failed to load binary: {0}")]
    Load(String),

    /// The requested entry symbol is absent from a loaded library.
    #[error("symbol `{0}` not found")]
    SymbolNotFound(String),

    /// A kernel was registered twice under the same function id.
    #[error("kernel already registered for func_id {0}")]
    DuplicateKernel(u32),

    /// No kernel is registered for the requested function id.
    #[error("no kernel registered for func_id {0}")]
    UnknownKernel(u32),

    /// An executable memory mapping could not be created.
    #[error("executable mapping of {size} bytes failed: {detail}")]
    MemoryMap {
        /// Requested code size in bytes.
        size: usize,
        /// OS error text.
        detail: String,
    },

    /// A lifecycle operation was attempted from the wrong state.
    #[error("invalid runtime state: expected {expected}, found {actual}")]
    InvalidState {
        /// State the operation requires.
        expected: RuntimeState,
        /// State the handle was actually in.
        actual: RuntimeState,
    },

    /// A launch configuration failed validation.
    #[error("invalid launch config: {0}")]
    InvalidLaunchConfig(String),

    /// A spawned execution role faulted or returned an error.
    #[error("{role} thread {thread} failed: {detail}")]
    KernelExecution {
        /// Role of the failed thread (e.g. "aicpu").
        role: String,
        /// Index of the failed thread within its role.
        thread: u32,
        /// Captured failure description.
        detail: String,
    },

    /// An orchestration routine rejected its inputs or environment.
    #[error("orchestration error: {0}")]
    Orchestration(String),

    /// A name listed in `TENSOR_ORDER` has no matching tensor.
    #[error("tensor `{0}` in TENSOR_ORDER not found")]
    MissingTensor(String),

    /// An object file contains no executable code section.
    #[error("object file has no executable code section")]
    NoCodeSection,

    /// A device memory pool operation failed.
    #[error("device memory: {0}")]
    DeviceMemory(String),

    /// A golden module could not generate or evaluate a case.
    #[error("golden module error: {0}")]
    Golden(String),

    /// An underlying I/O operation failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
