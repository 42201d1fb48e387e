//! Validation harness.
//!
//! Drives one or more parameterized cases end to end: generate tensors,
//! compute the golden reference in place, zero the outputs, build a fresh
//! runtime, launch it, and compare the post-launch outputs against the
//! saved reference within tolerance. Numeric mismatch is recoverable: the
//! case is reported as failed with its mismatch count and the harness
//! continues. Every other failure aborts the run.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::common::{CoreType, KernelFn, Result, RuntimeError};
use crate::config::{DeviceContext, DeviceLaunchConfig};
use crate::exec::registry::KernelRegistry;
use crate::golden::GoldenModule;
use crate::golden::compare::count_mismatches;
use crate::runtime::args::{FuncArgs, Tensor};
use crate::runtime::handle::RuntimeHandle;
use crate::runtime::orchestration::{OrchFn, OrchestrationUnit};

/// Source of one kernel to register per case.
#[derive(Clone, Debug)]
pub enum KernelSource {
    /// Raw machine code, loaded into executable memory.
    Code(Vec<u8>),
    /// Host function registered directly.
    Native(KernelFn),
}

/// One kernel the runtime spec registers.
#[derive(Clone, Debug)]
pub struct KernelSpec {
    /// Dispatch slot.
    pub func_id: u32,
    /// Targeted role.
    pub core_type: CoreType,
    /// Where the code comes from.
    pub source: KernelSource,
}

/// Source of the orchestration entry, instantiated fresh per case.
#[derive(Clone, Debug)]
pub enum OrchSource {
    /// Shared-library image plus entry symbol.
    SharedLibrary {
        /// The library image.
        bytes: Vec<u8>,
        /// Entry symbol resolved after loading.
        entry_symbol: String,
    },
    /// Native orchestration function.
    Native(OrchFn),
}

/// Everything needed to build one runtime per case.
#[derive(Clone, Debug)]
pub struct RuntimeSpec {
    /// Kernels to register.
    pub kernels: Vec<KernelSpec>,
    /// Orchestration source.
    pub orchestration: OrchSource,
    /// Kernel ids the orchestration dispatches; validated before launch.
    pub required_func_ids: Vec<u32>,
}

/// Comparison result for one output tensor.
#[derive(Clone, Debug)]
pub struct OutputCheck {
    /// Output tensor name.
    pub name: String,
    /// Elements out of tolerance.
    pub mismatches: usize,
    /// Total elements compared.
    pub elements: usize,
}

/// Result of one parameterized case.
#[derive(Clone, Debug)]
pub struct CaseReport {
    /// Parameters the case ran with.
    pub params: Value,
    /// Per-output comparison results.
    pub outputs: Vec<OutputCheck>,
}

impl CaseReport {
    /// True if every output matched within tolerance.
    pub fn passed(&self) -> bool {
        self.outputs.iter().all(|o| o.mismatches == 0)
    }
}

/// Aggregate result over all cases.
#[derive(Clone, Debug)]
pub struct RunReport {
    /// Per-case reports, in execution order.
    pub cases: Vec<CaseReport>,
}

impl RunReport {
    /// True only if every case passed.
    pub fn passed(&self) -> bool {
        self.cases.iter().all(CaseReport::passed)
    }
}

/// Drives parameterized validation cases against one runtime spec.
pub struct Harness {
    golden: Box<dyn GoldenModule>,
    spec: RuntimeSpec,
    device: DeviceContext,
    launch: DeviceLaunchConfig,
    params_override: Option<Vec<Value>>,
    tolerances_override: Option<(f32, f32)>,
}

impl Harness {
    /// Creates a harness with the default launch shape.
    pub fn new(golden: Box<dyn GoldenModule>, spec: RuntimeSpec, device: DeviceContext) -> Self {
        let launch = DeviceLaunchConfig {
            device_id: device.device_id,
            ..DeviceLaunchConfig::default()
        };
        Self {
            golden,
            spec,
            device,
            launch,
            params_override: None,
            tolerances_override: None,
        }
    }

    /// Overrides the launch shape.
    pub fn with_launch(mut self, launch: DeviceLaunchConfig) -> Self {
        self.launch = launch;
        self
    }

    /// Overrides the golden module's parameter list.
    pub fn with_params(mut self, params: Vec<Value>) -> Self {
        self.params_override = Some(params);
        self
    }

    /// Overrides the golden module's tolerances.
    pub fn with_tolerances(mut self, rtol: f32, atol: f32) -> Self {
        self.tolerances_override = Some((rtol, atol));
        self
    }

    /// Runs every case and aggregates the reports.
    ///
    /// Returns `Err` on any non-numeric failure (build, load, registry,
    /// lifecycle, execution); numeric mismatches land in the report.
    pub fn run_all(&self) -> Result<RunReport> {
        let params_list = self
            .params_override
            .clone()
            .unwrap_or_else(|| self.golden.params_list());

        let mut cases = Vec::with_capacity(params_list.len());
        for (i, params) in params_list.iter().enumerate() {
            tracing::info!(case = i + 1, total = params_list.len(), "running case");
            let report = self.run_case(params)?;
            tracing::info!(case = i + 1, passed = report.passed(), "case finished");
            cases.push(report);
        }
        Ok(RunReport { cases })
    }

    /// Runs one case.
    pub fn run_case(&self, params: &Value) -> Result<CaseReport> {
        let (rtol, atol) = self
            .tolerances_override
            .unwrap_or((self.golden.rtol(), self.golden.atol()));
        let order = self.golden.tensor_order();
        let outputs = self.golden.outputs();

        // Generate, compute the reference in place, snapshot, then reset
        // the outputs to zero so the runtime starts from a neutral state.
        let mut tensors = self.golden.generate_inputs(params)?;
        tensors.assign_roles(&outputs);
        self.golden.compute_golden(&mut tensors, params)?;

        let mut expected = Vec::with_capacity(outputs.len());
        for name in &outputs {
            let t = tensors
                .get(name)
                .ok_or_else(|| RuntimeError::MissingTensor(name.clone()))?;
            let data = t
                .as_f32()
                .ok_or_else(|| RuntimeError::Golden(format!("output `{name}` is not f32")))?
                .to_vec();
            expected.push((name.clone(), data));
        }
        for name in &outputs {
            if let Some(t) = tensors.get_mut(name) {
                t.fill_zero();
            }
        }

        // Fresh registry and runtime per case: the func_id space resets
        // with every build.
        let registry = Arc::new(self.build_registry()?);
        let args = FuncArgs::build(&order, &mut tensors)?;

        let orch = match &self.spec.orchestration {
            OrchSource::Native(f) => OrchestrationUnit::native(*f, &self.spec.required_func_ids),
            OrchSource::SharedLibrary {
                bytes,
                entry_symbol,
            } => OrchestrationUnit::from_shared_library(
                bytes,
                entry_symbol,
                &self.spec.required_func_ids,
            )?,
        };

        let mut handle = RuntimeHandle::new(self.device, registry);
        handle.initialize(orch, args)?;
        handle.launch(&self.launch)?;
        handle.finalize()?;

        // Tensor contents are defined now that finalize has returned.
        let mut checks = Vec::with_capacity(expected.len());
        for (name, reference) in &expected {
            let actual = tensors
                .get(name)
                .and_then(Tensor::as_f32)
                .ok_or_else(|| RuntimeError::MissingTensor(name.clone()))?;
            let mismatches = count_mismatches(actual, reference, rtol, atol);
            checks.push(OutputCheck {
                name: name.clone(),
                mismatches,
                elements: reference.len(),
            });
        }

        Ok(CaseReport {
            params: params.clone(),
            outputs: checks,
        })
    }

    fn build_registry(&self) -> Result<KernelRegistry> {
        let mut registry = KernelRegistry::new();
        for kernel in &self.spec.kernels {
            match &kernel.source {
                KernelSource::Code(bytes) => {
                    registry.register(kernel.func_id, kernel.core_type, bytes)?;
                }
                KernelSource::Native(f) => {
                    registry.register_native(kernel.func_id, kernel.core_type, *f)?;
                }
            }
        }
        Ok(registry)
    }
}

impl fmt::Debug for Harness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Harness")
            .field("golden", &self.golden.name())
            .field("device", &self.device)
            .field("launch", &self.launch)
            .finish()
    }
}
