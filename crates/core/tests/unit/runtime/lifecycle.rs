//! # Lifecycle Tests
//!
//! The strictly-forward state machine: Created, Initialized, Launched,
//! Finalized.

use std::sync::Arc;

use npusim_core::common::{Result, RuntimeError, RuntimeState};
use npusim_core::config::{DeviceContext, DeviceLaunchConfig, Platform};
use npusim_core::exec::KernelRegistry;
use npusim_core::runtime::{FuncArgs, OrchCtx, OrchestrationUnit, RuntimeHandle};

fn orch_ok(_ctx: &OrchCtx<'_>) -> Result<()> {
    Ok(())
}

fn handle() -> RuntimeHandle {
    let device = DeviceContext::select(0, Platform::A2a3Sim);
    RuntimeHandle::new(device, Arc::new(KernelRegistry::new()))
}

fn bound_handle() -> RuntimeHandle {
    let mut h = handle();
    h.initialize(
        OrchestrationUnit::native(orch_ok, &[]),
        FuncArgs::from_raw(vec![0]),
    )
    .unwrap();
    h
}

// ══════════════════════════════════════════════════════════
// Forward path
// ══════════════════════════════════════════════════════════

#[test]
fn test_full_lifecycle() {
    let mut h = bound_handle();
    assert_eq!(h.state(), RuntimeState::Initialized);

    h.launch(&DeviceLaunchConfig::default()).unwrap();
    assert_eq!(h.state(), RuntimeState::Launched);

    h.finalize().unwrap();
    assert_eq!(h.state(), RuntimeState::Finalized);
}

#[test]
fn test_new_handle_starts_created() {
    let h = handle();
    assert_eq!(h.state(), RuntimeState::Created);
    assert_eq!(h.device().platform, Platform::A2a3Sim);
}

// ══════════════════════════════════════════════════════════
// Out-of-order operations
// ══════════════════════════════════════════════════════════

#[test]
fn test_launch_before_initialize() {
    let mut h = handle();
    let err = h.launch(&DeviceLaunchConfig::default()).unwrap_err();
    assert!(matches!(
        err,
        RuntimeError::InvalidState {
            expected: RuntimeState::Initialized,
            actual: RuntimeState::Created,
        }
    ));
    assert_eq!(h.state(), RuntimeState::Created);
}

#[test]
fn test_finalize_before_launch() {
    let mut h = bound_handle();
    let err = h.finalize().unwrap_err();
    assert!(matches!(
        err,
        RuntimeError::InvalidState {
            expected: RuntimeState::Launched,
            actual: RuntimeState::Initialized,
        }
    ));
}

#[test]
fn test_double_initialize() {
    let mut h = bound_handle();
    let err = h
        .initialize(
            OrchestrationUnit::native(orch_ok, &[]),
            FuncArgs::from_raw(vec![0]),
        )
        .unwrap_err();
    assert!(matches!(err, RuntimeError::InvalidState { .. }));
}

#[test]
fn test_double_launch() {
    let mut h = bound_handle();
    h.launch(&DeviceLaunchConfig::default()).unwrap();
    let err = h.launch(&DeviceLaunchConfig::default()).unwrap_err();
    assert!(matches!(err, RuntimeError::InvalidState { .. }));
    h.finalize().unwrap();
}

#[test]
fn test_double_finalize() {
    let mut h = bound_handle();
    h.launch(&DeviceLaunchConfig::default()).unwrap();
    h.finalize().unwrap();

    let err = h.finalize().unwrap_err();
    assert!(matches!(
        err,
        RuntimeError::InvalidState {
            expected: RuntimeState::Launched,
            actual: RuntimeState::Finalized,
        }
    ));
}

#[test]
fn test_finalized_is_terminal() {
    let mut h = bound_handle();
    h.launch(&DeviceLaunchConfig::default()).unwrap();
    h.finalize().unwrap();

    let err = h
        .initialize(
            OrchestrationUnit::native(orch_ok, &[]),
            FuncArgs::from_raw(vec![0]),
        )
        .unwrap_err();
    assert!(matches!(err, RuntimeError::InvalidState { .. }));
    assert_eq!(h.state(), RuntimeState::Finalized);
}

// ══════════════════════════════════════════════════════════
// Failed launches
// ══════════════════════════════════════════════════════════

#[test]
fn test_invalid_config_rejected_before_spawn() {
    let mut h = bound_handle();
    let config = DeviceLaunchConfig {
        aicpu_thread_num: 0,
        ..DeviceLaunchConfig::default()
    };
    let err = h.launch(&config).unwrap_err();
    assert!(matches!(err, RuntimeError::InvalidLaunchConfig(_)));
    // The handle did not advance to Launched.
    assert_eq!(h.state(), RuntimeState::Initialized);
}

#[test]
fn test_rejected_launch_is_retryable() {
    let mut h = bound_handle();
    let bad = DeviceLaunchConfig {
        aicpu_thread_num: 0,
        ..DeviceLaunchConfig::default()
    };
    let err = h.launch(&bad).unwrap_err();
    assert!(matches!(err, RuntimeError::InvalidLaunchConfig(_)));
    assert_eq!(h.state(), RuntimeState::Initialized);

    // The orchestration and arguments were not consumed by the rejected
    // launch; a corrected configuration goes through.
    h.launch(&DeviceLaunchConfig::default()).unwrap();
    h.finalize().unwrap();
    assert_eq!(h.state(), RuntimeState::Finalized);
}

#[test]
fn test_unknown_required_kernel_leaves_handle_initialized() {
    let mut h = handle();
    h.initialize(
        OrchestrationUnit::native(orch_ok, &[42]),
        FuncArgs::from_raw(vec![0]),
    )
    .unwrap();

    let err = h.launch(&DeviceLaunchConfig::default()).unwrap_err();
    assert!(matches!(err, RuntimeError::UnknownKernel(42)));
    assert_eq!(h.state(), RuntimeState::Initialized);
}

#[test]
fn test_failing_role_still_finalizes() {
    fn orch_fail(_ctx: &OrchCtx<'_>) -> Result<()> {
        Err(RuntimeError::Orchestration("deliberate".into()))
    }

    let mut h = handle();
    h.initialize(
        OrchestrationUnit::native(orch_fail, &[]),
        FuncArgs::from_raw(vec![0]),
    )
    .unwrap();
    h.launch(&DeviceLaunchConfig::default()).unwrap();

    let err = h.finalize().unwrap_err();
    assert!(matches!(err, RuntimeError::KernelExecution { .. }));
    assert_eq!(h.state(), RuntimeState::Finalized);
}

#[test]
fn test_pool_swept_at_finalize() {
    let mut h = bound_handle();
    let _ = h.pool().alloc(128).unwrap();
    h.launch(&DeviceLaunchConfig::default()).unwrap();
    h.finalize().unwrap();
    assert_eq!(h.pool().allocation_count(), 0);
}

#[test]
fn test_pool_swept_after_panicking_role() {
    fn orch_alloc_then_panic(ctx: &OrchCtx<'_>) -> Result<()> {
        let _ = ctx.pool().alloc(64)?;
        panic!("scratch holder down");
    }

    let mut h = handle();
    h.initialize(
        OrchestrationUnit::native(orch_alloc_then_panic, &[]),
        FuncArgs::from_raw(vec![0]),
    )
    .unwrap();
    h.launch(&DeviceLaunchConfig::default()).unwrap();

    let err = h.finalize().unwrap_err();
    assert!(matches!(err, RuntimeError::KernelExecution { .. }));
    // The leaked scratch from the failed threads was still released.
    assert_eq!(h.pool().allocation_count(), 0);
}
