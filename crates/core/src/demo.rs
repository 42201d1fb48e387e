//! Built-in reference kernels and orchestrations.
//!
//! The simulation-native rendering of the example kernel set: elementwise
//! f32 kernels with the unified `(int64_t* args)` signature, plus
//! orchestration routines that slice the element range across compute
//! blocks and drive the kernels through the registry. Used by the CLI
//! `demo` subcommand and the integration tests; no toolchain is required.
//!
//! Both orchestrations compute `f = (a + b + 1) * (a + b + 2)` over f32
//! buffers and expect the standard seven-word argument list for tensors
//! `[a, b, f]`: three base addresses, three byte sizes, one element count.

use crate::common::{CoreType, Result, RuntimeError};
use crate::harness::{KernelSource, KernelSpec, OrchSource, RuntimeSpec};
use crate::runtime::orchestration::OrchCtx;

/// Dispatch slot of the elementwise add kernel.
pub const FUNC_ID_ADD: u32 = 1;
/// Dispatch slot of the `(x + 1) * (x + 2)` kernel.
pub const FUNC_ID_INC_MUL: u32 = 2;
/// Dispatch slot of the fused formula kernel.
pub const FUNC_ID_ADD_MUL: u32 = 3;

const F32_SIZE: u64 = 4;

/// `out[i] = src0[i] + src1[i]`. Args: `[src0, src1, out, n]`.
unsafe extern "C" fn kernel_add(args: *mut i64) {
    unsafe {
        let src0 = *args as *const f32;
        let src1 = *args.add(1) as *const f32;
        let out = *args.add(2) as *mut f32;
        let n = *args.add(3) as usize;
        for i in 0..n {
            *out.add(i) = *src0.add(i) + *src1.add(i);
        }
    }
}

/// `out[i] = (src[i] + 1) * (src[i] + 2)`. Args: `[src, out, n]`.
unsafe extern "C" fn kernel_inc_mul(args: *mut i64) {
    unsafe {
        let src = *args as *const f32;
        let out = *args.add(1) as *mut f32;
        let n = *args.add(2) as usize;
        for i in 0..n {
            let x = *src.add(i);
            *out.add(i) = (x + 1.0) * (x + 2.0);
        }
    }
}

/// `f[i] = (a[i] + b[i] + 1) * (a[i] + b[i] + 2)`. Args: `[a, b, f, n]`.
unsafe extern "C" fn kernel_add_mul(args: *mut i64) {
    unsafe {
        let a = *args as *const f32;
        let b = *args.add(1) as *const f32;
        let f = *args.add(2) as *mut f32;
        let n = *args.add(3) as usize;
        for i in 0..n {
            let s = *a.add(i) + *b.add(i);
            *f.add(i) = (s + 1.0) * (s + 2.0);
        }
    }
}

/// The native kernel set, one spec per dispatch slot.
pub fn kernel_specs() -> Vec<KernelSpec> {
    vec![
        KernelSpec {
            func_id: FUNC_ID_ADD,
            core_type: CoreType::Aiv,
            source: KernelSource::Native(kernel_add),
        },
        KernelSpec {
            func_id: FUNC_ID_INC_MUL,
            core_type: CoreType::Aiv,
            source: KernelSource::Native(kernel_inc_mul),
        },
        KernelSpec {
            func_id: FUNC_ID_ADD_MUL,
            core_type: CoreType::Aiv,
            source: KernelSource::Native(kernel_add_mul),
        },
    ]
}

/// Splits `total` elements evenly over `block_dim` blocks, remainder to the
/// low-indexed blocks. Returns `(start, len)` for `block`.
fn block_range(total: u64, block_dim: u32, block: u32) -> (u64, u64) {
    let bd = u64::from(block_dim);
    let b = u64::from(block);
    let base = total / bd;
    let extra = total % bd;
    let len = base + u64::from(b < extra);
    let start = b * base + b.min(extra);
    (start, len)
}

/// Checks the seven-word `[a, b, f]` argument shape.
fn check_args(ctx: &OrchCtx<'_>) -> Result<()> {
    if ctx.args().len() != 7 {
        return Err(RuntimeError::Orchestration(format!(
            "expected 7 argument words for [a, b, f], got {}",
            ctx.args().len()
        )));
    }
    Ok(())
}

/// Fused orchestration: one kernel call per assigned block.
pub fn fused_orchestration(ctx: &OrchCtx<'_>) -> Result<()> {
    check_args(ctx)?;
    let args = ctx.args();
    let total = args[6];
    let kernel = ctx.resolve(FUNC_ID_ADD_MUL)?;

    for &block in ctx.blocks {
        let (start, len) = block_range(total, ctx.block_dim, block);
        if len == 0 {
            continue;
        }
        let off = start * F32_SIZE;
        let mut kargs = [
            (args[0] + off) as i64,
            (args[1] + off) as i64,
            (args[2] + off) as i64,
            len as i64,
        ];
        unsafe {
            kernel(kargs.as_mut_ptr());
        }
    }
    Ok(())
}

/// Chained orchestration: stages `a + b` in pool-allocated scratch, then
/// applies the `(x + 1) * (x + 2)` kernel into the output.
pub fn chain_orchestration(ctx: &OrchCtx<'_>) -> Result<()> {
    check_args(ctx)?;
    let args = ctx.args();
    let total = args[6];
    let add = ctx.resolve(FUNC_ID_ADD)?;
    let inc_mul = ctx.resolve(FUNC_ID_INC_MUL)?;

    for &block in ctx.blocks {
        let (start, len) = block_range(total, ctx.block_dim, block);
        if len == 0 {
            continue;
        }
        let off = start * F32_SIZE;
        let scratch = ctx.pool().alloc((len * F32_SIZE) as usize)?;

        let mut add_args = [
            (args[0] + off) as i64,
            (args[1] + off) as i64,
            scratch as i64,
            len as i64,
        ];
        unsafe {
            add(add_args.as_mut_ptr());
        }

        let mut inc_args = [scratch as i64, (args[2] + off) as i64, len as i64];
        unsafe {
            inc_mul(inc_args.as_mut_ptr());
        }

        ctx.pool().free(scratch)?;
    }
    Ok(())
}

/// Runtime spec wiring the fused orchestration to the native kernel set.
pub fn runtime_spec_fused() -> RuntimeSpec {
    RuntimeSpec {
        kernels: kernel_specs(),
        orchestration: OrchSource::Native(fused_orchestration),
        required_func_ids: vec![FUNC_ID_ADD_MUL],
    }
}

/// Runtime spec wiring the chained orchestration to the native kernel set.
pub fn runtime_spec_chain() -> RuntimeSpec {
    RuntimeSpec {
        kernels: kernel_specs(),
        orchestration: OrchSource::Native(chain_orchestration),
        required_func_ids: vec![FUNC_ID_ADD, FUNC_ID_INC_MUL],
    }
}
