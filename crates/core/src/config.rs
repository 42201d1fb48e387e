//! Configuration for the simulated runtime.
//!
//! This module defines the structures that parameterize a run:
//! 1. **Platform:** The closed set of supported device platforms.
//! 2. **Device context:** An owned device selection passed to every handle,
//!    so multiple simulated runtimes can coexist in one process.
//! 3. **Launch config:** Control-thread count and compute-block count for
//!    one launch, validated up front and immutable afterwards.
//! 4. **Manifest:** The JSON kernel-set description consumed by the CLI.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;

use crate::common::constants::{DEFAULT_AICPU_THREAD_NUM, DEFAULT_BLOCK_DIM, MAX_AICPU_THREADS};
use crate::common::{CoreType, Result, RuntimeError};

/// Supported device platforms.
///
/// `A2a3` names the hardware target the kernels are compiled for; `A2a3Sim`
/// is the thread-based host simulation this crate implements. The harness
/// only executes on the simulation platform, but the selector is carried
/// through so manifests and reports stay meaningful for both.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Hardware target.
    A2a3,
    /// Thread-based host simulation.
    A2a3Sim,
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::A2a3 => write!(f, "a2a3"),
            Platform::A2a3Sim => write!(f, "a2a3sim"),
        }
    }
}

impl FromStr for Platform {
    type Err = RuntimeError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "a2a3" => Ok(Platform::A2a3),
            "a2a3sim" => Ok(Platform::A2a3Sim),
            other => Err(RuntimeError::InvalidLaunchConfig(format!(
                "unknown platform `{other}` (expected a2a3 or a2a3sim)"
            ))),
        }
    }
}

/// Owned device selection.
///
/// Replaces process-global device state: the context is created once and
/// handed to every runtime handle that should run against that device.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeviceContext {
    /// Device identifier. Bookkeeping only in simulation.
    pub device_id: u32,
    /// Selected platform.
    pub platform: Platform,
}

impl DeviceContext {
    /// Selects a device on the given platform.
    pub fn select(device_id: u32, platform: Platform) -> Self {
        tracing::info!(device_id, %platform, "device selected");
        Self {
            device_id,
            platform,
        }
    }
}

/// Shape of one launch: control threads, compute blocks, device id.
///
/// Immutable for the duration of a launch. `aicpu_thread_num` control
/// threads each service a subset of `block_dim` compute blocks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub struct DeviceLaunchConfig {
    /// Number of control (aicpu) threads to spawn.
    pub aicpu_thread_num: u32,
    /// Number of logical compute blocks to dispatch over.
    pub block_dim: u32,
    /// Device identifier exposed to the orchestration context.
    pub device_id: u32,
}

impl Default for DeviceLaunchConfig {
    fn default() -> Self {
        Self {
            aicpu_thread_num: DEFAULT_AICPU_THREAD_NUM,
            block_dim: DEFAULT_BLOCK_DIM,
            device_id: 0,
        }
    }
}

impl DeviceLaunchConfig {
    /// Validates the configuration.
    ///
    /// Thread and block counts must be positive, and the thread count must
    /// not exceed [`MAX_AICPU_THREADS`].
    pub fn validate(&self) -> Result<()> {
        if self.aicpu_thread_num == 0 {
            return Err(RuntimeError::InvalidLaunchConfig(
                "aicpu_thread_num must be positive".into(),
            ));
        }
        if self.aicpu_thread_num > MAX_AICPU_THREADS {
            return Err(RuntimeError::InvalidLaunchConfig(format!(
                "aicpu_thread_num {} exceeds maximum {}",
                self.aicpu_thread_num, MAX_AICPU_THREADS
            )));
        }
        if self.block_dim == 0 {
            return Err(RuntimeError::InvalidLaunchConfig(
                "block_dim must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// One kernel entry in a kernel-set manifest.
#[derive(Clone, Debug, Deserialize)]
pub struct KernelEntry {
    /// Function id the kernel is registered under.
    pub func_id: u32,
    /// Role the kernel targets.
    pub core_type: CoreType,
    /// Source file, relative to the manifest directory.
    pub source: PathBuf,
}

/// Orchestration entry in a kernel-set manifest.
#[derive(Clone, Debug, Deserialize)]
pub struct OrchestrationEntry {
    /// Source file compiled to a shared library.
    pub source: PathBuf,
    /// Entry symbol resolved after loading.
    pub function_name: String,
    /// Function ids the orchestration dispatches; validated before launch.
    #[serde(default)]
    pub required_func_ids: Vec<u32>,
}

/// Kernel-set manifest (`kernels.json` in a kernel directory).
#[derive(Clone, Debug, Deserialize)]
pub struct KernelManifest {
    /// Compute kernels to compile and register.
    pub kernels: Vec<KernelEntry>,
    /// Orchestration routine to compile and bind.
    pub orchestration: OrchestrationEntry,
}

impl KernelManifest {
    /// Loads a manifest from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        serde_json::from_str(&text)
            .map_err(|e| RuntimeError::Load(format!("manifest {}: {e}", path.display())))
    }
}
