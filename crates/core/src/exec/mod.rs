//! Code loading and execution machinery.
//!
//! This module turns compiled bytes into callable code:
//! 1. **Executable memory:** Page-aligned read+execute mappings holding raw
//!    kernel machine code.
//! 2. **Extraction:** Locating the executable section of a relocatable
//!    object file.
//! 3. **Shared libraries:** dlopen-based loading of orchestration binaries
//!    with symbol resolution.
//! 4. **Registry:** The frozen func_id → code-pointer mapping kernels are
//!    dispatched through.

/// Executable memory mappings for raw kernel code.
pub mod code_buffer;
/// Executable-section extraction from object files.
pub mod extract;
/// Shared-library loading and symbol resolution.
pub mod library;
/// Function-id to code-pointer registry.
pub mod registry;

pub use code_buffer::ExecBuffer;
pub use extract::extract_code_section;
pub use library::SharedLibrary;
pub use registry::KernelRegistry;
