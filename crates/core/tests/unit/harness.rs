//! # Harness End-to-End Tests
//!
//! Whole launches through the validation harness: generate, compute the
//! reference, run the simulated runtime, compare.

use serde_json::json;

use npusim_core::RuntimeError;
use npusim_core::config::{DeviceContext, DeviceLaunchConfig, Platform};
use npusim_core::demo::{
    self, FUNC_ID_ADD_MUL, fused_orchestration, runtime_spec_chain, runtime_spec_fused,
};
use npusim_core::golden::builtin_module;
use npusim_core::harness::{Harness, KernelSource, KernelSpec, OrchSource, RuntimeSpec};

use crate::common::{self, kernel_add_mul_wrong};

fn device() -> DeviceContext {
    common::init_tracing();
    DeviceContext::select(0, Platform::A2a3Sim)
}

fn harness(spec: RuntimeSpec) -> Harness {
    Harness::new(builtin_module("addmul").unwrap(), spec, device())
}

// ══════════════════════════════════════════════════════════
// Passing launches
// ══════════════════════════════════════════════════════════

#[test]
fn test_fused_kernel_matches_golden() {
    let report = harness(runtime_spec_fused())
        .with_params(vec![json!({ "size": 1024, "fill_a": 2.0, "fill_b": 3.0 })])
        .run_all()
        .unwrap();

    assert!(report.passed());
    assert_eq!(report.cases.len(), 1);
    let check = &report.cases[0].outputs[0];
    assert_eq!(check.name, "f");
    assert_eq!(check.mismatches, 0);
    assert_eq!(check.elements, 1024);
}

#[test]
fn test_fused_kernel_on_random_inputs() {
    let report = harness(runtime_spec_fused())
        .with_params(vec![json!({ "size": 16384, "seed": 42 })])
        .run_all()
        .unwrap();
    assert!(report.passed());
}

#[test]
fn test_chained_kernels_match_golden() {
    let report = harness(runtime_spec_chain())
        .with_params(vec![json!({ "size": 4096, "seed": 11 })])
        .run_all()
        .unwrap();
    assert!(report.passed());
}

#[test]
fn test_multiple_cases_all_reported() {
    let report = harness(runtime_spec_fused())
        .with_params(vec![
            json!({ "size": 64, "seed": 1 }),
            json!({ "size": 256, "seed": 2 }),
            json!({ "size": 1000, "seed": 3 }),
        ])
        .run_all()
        .unwrap();
    assert_eq!(report.cases.len(), 3);
    assert!(report.passed());
}

#[test]
fn test_uneven_launch_shapes() {
    // Block counts that do not divide across threads, and element counts
    // that do not divide across blocks.
    for (threads, blocks, size) in [(1, 1, 17), (2, 7, 333), (4, 3, 1023), (3, 8, 4096)] {
        let launch = DeviceLaunchConfig {
            aicpu_thread_num: threads,
            block_dim: blocks,
            device_id: 0,
        };
        let report = harness(runtime_spec_fused())
            .with_launch(launch)
            .with_params(vec![json!({ "size": size, "seed": 5 })])
            .run_all()
            .unwrap();
        assert!(
            report.passed(),
            "failed for threads={threads} blocks={blocks} size={size}"
        );
    }
}

// ══════════════════════════════════════════════════════════
// Determinism
// ══════════════════════════════════════════════════════════

#[test]
fn test_repeated_launches_produce_identical_outputs() {
    use std::sync::Arc;

    use npusim_core::exec::KernelRegistry;
    use npusim_core::runtime::{
        FuncArgs, OrchestrationUnit, RuntimeHandle, Tensor,
    };

    let golden = builtin_module("addmul").unwrap();
    let params = json!({ "size": 777, "seed": 21 });
    let order = golden.tensor_order();

    let mut registry = KernelRegistry::new();
    for spec in demo::kernel_specs() {
        match spec.source {
            KernelSource::Native(f) => {
                registry.register_native(spec.func_id, spec.core_type, f).unwrap();
            }
            KernelSource::Code(code) => {
                registry.register(spec.func_id, spec.core_type, &code).unwrap();
            }
        }
    }
    let registry = Arc::new(registry);

    let mut runs = Vec::new();
    for _ in 0..2 {
        let mut tensors = golden.generate_inputs(&params).unwrap();
        let args = FuncArgs::build(&order, &mut tensors).unwrap();

        let mut handle = RuntimeHandle::new(device(), Arc::clone(&registry));
        handle
            .initialize(
                OrchestrationUnit::native(fused_orchestration, &[FUNC_ID_ADD_MUL]),
                args,
            )
            .unwrap();
        handle.launch(&DeviceLaunchConfig::default()).unwrap();
        handle.finalize().unwrap();

        runs.push(tensors.get("f").and_then(Tensor::as_f32).unwrap().to_vec());
    }

    assert_eq!(runs[0], runs[1]);
}

// ══════════════════════════════════════════════════════════
// Missing kernels
// ══════════════════════════════════════════════════════════

#[test]
fn test_unregistered_required_kernel_aborts_run() {
    // The orchestration declares the fused kernel but nothing registers it.
    let spec = RuntimeSpec {
        kernels: vec![],
        orchestration: OrchSource::Native(fused_orchestration),
        required_func_ids: vec![FUNC_ID_ADD_MUL],
    };

    let err = harness(spec)
        .with_params(vec![json!({ "size": 64 })])
        .run_all()
        .unwrap_err();
    assert!(matches!(err, RuntimeError::UnknownKernel(id) if id == FUNC_ID_ADD_MUL));
}

// ══════════════════════════════════════════════════════════
// Numeric mismatch
// ══════════════════════════════════════════════════════════

fn wrong_kernel_spec() -> RuntimeSpec {
    let mut spec = runtime_spec_fused();
    spec.kernels = vec![KernelSpec {
        func_id: FUNC_ID_ADD_MUL,
        core_type: npusim_core::common::CoreType::Aiv,
        source: KernelSource::Native(kernel_add_mul_wrong),
    }];
    spec
}

#[test]
fn test_wrong_kernel_reports_mismatches_without_error() {
    let report = harness(wrong_kernel_spec())
        .with_params(vec![json!({ "size": 512, "seed": 9 })])
        .run_all()
        .unwrap();

    assert!(!report.passed());
    let check = &report.cases[0].outputs[0];
    // Off by a constant 1.0 everywhere, so every element misses.
    assert_eq!(check.mismatches, 512);
    assert_eq!(check.elements, 512);
}

#[test]
fn test_partial_mismatch_counts_only_touched_elements() {
    use npusim_core::common::Result;
    use npusim_core::runtime::OrchCtx;

    // Block 0 runs the wrong formula directly; the other blocks dispatch
    // the registered correct kernel. With 300 elements over 3 blocks the
    // wrong third is exactly 100 elements.
    fn orch_partially_wrong(ctx: &OrchCtx<'_>) -> Result<()> {
        let args = ctx.args();
        let total = args[6];
        let per_block = total / u64::from(ctx.block_dim);
        let kernel = ctx.resolve(FUNC_ID_ADD_MUL)?;

        for &block in ctx.blocks {
            let start = u64::from(block) * per_block;
            let off = start * 4;
            let mut kargs = [
                (args[0] + off) as i64,
                (args[1] + off) as i64,
                (args[2] + off) as i64,
                per_block as i64,
            ];
            if block == 0 {
                unsafe { kernel_add_mul_wrong(kargs.as_mut_ptr()) };
            } else {
                unsafe { kernel(kargs.as_mut_ptr()) };
            }
        }
        Ok(())
    }

    let spec = RuntimeSpec {
        kernels: demo::kernel_specs(),
        orchestration: OrchSource::Native(orch_partially_wrong),
        required_func_ids: vec![FUNC_ID_ADD_MUL],
    };

    let report = harness(spec)
        .with_params(vec![json!({ "size": 300, "seed": 6 })])
        .run_all()
        .unwrap();

    assert!(!report.passed());
    let check = &report.cases[0].outputs[0];
    assert_eq!(check.mismatches, 100);
    assert_eq!(check.elements, 300);
}

#[test]
fn test_mismatch_does_not_stop_later_cases() {
    let report = harness(wrong_kernel_spec())
        .with_params(vec![
            json!({ "size": 64, "seed": 1 }),
            json!({ "size": 64, "seed": 2 }),
        ])
        .run_all()
        .unwrap();
    assert_eq!(report.cases.len(), 2);
    assert!(report.cases.iter().all(|c| !c.passed()));
}

#[test]
fn test_tolerance_override_changes_verdict() {
    // The wrong kernel is off by exactly 1.0; a wide absolute tolerance
    // accepts it.
    let report = harness(wrong_kernel_spec())
        .with_params(vec![json!({ "size": 64, "seed": 4 })])
        .with_tolerances(0.0, 2.0)
        .run_all()
        .unwrap();
    assert!(report.passed());
}

// ══════════════════════════════════════════════════════════
// Demo wiring
// ══════════════════════════════════════════════════════════

#[test]
fn test_demo_specs_register_expected_kernels() {
    let fused = runtime_spec_fused();
    assert_eq!(fused.required_func_ids, vec![FUNC_ID_ADD_MUL]);

    let chain = runtime_spec_chain();
    assert_eq!(
        chain.required_func_ids,
        vec![demo::FUNC_ID_ADD, demo::FUNC_ID_INC_MUL]
    );
    assert_eq!(chain.kernels.len(), 3);
}
