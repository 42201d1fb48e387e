//! Built-in golden modules.

use serde_json::Value;

use crate::common::{Result, RuntimeError};
use crate::golden::GoldenModule;
use crate::runtime::args::{Tensor, TensorRole, TensorSet};

/// Reference formula module: `f = (a + b + 1) * (a + b + 2)`.
///
/// Parameters (all optional):
/// - `size`: element count (default 16384),
/// - `seed`: seed for deterministic pseudo-random inputs in `[0, 1)`,
/// - `fill_a` / `fill_b`: constant fills overriding random generation.
///
/// With `fill_a = 2.0` and `fill_b = 3.0` every output element is `42.0`.
#[derive(Clone, Copy, Debug, Default)]
pub struct AddMulFormula;

impl GoldenModule for AddMulFormula {
    fn name(&self) -> &str {
        "addmul"
    }

    fn tensor_order(&self) -> Vec<String> {
        vec!["a".into(), "b".into(), "f".into()]
    }

    fn outputs(&self) -> Vec<String> {
        vec!["f".into()]
    }

    fn params_list(&self) -> Vec<Value> {
        vec![serde_json::json!({ "size": 16384, "seed": 42 })]
    }

    fn rtol(&self) -> f32 {
        1e-4
    }

    fn atol(&self) -> f32 {
        1e-4
    }

    fn generate_inputs(&self, params: &Value) -> Result<TensorSet> {
        let size = param_usize(params, "size").unwrap_or(16384);
        if size == 0 {
            return Err(RuntimeError::Golden("size must be positive".into()));
        }
        let seed = param_u64(params, "seed").unwrap_or(1);

        let a = match param_f32(params, "fill_a") {
            Some(v) => vec![v; size],
            None => uniform(size, seed),
        };
        let b = match param_f32(params, "fill_b") {
            Some(v) => vec![v; size],
            None => uniform(size, seed.wrapping_add(0x9e37_79b9)),
        };

        let mut set = TensorSet::new();
        set.insert(Tensor::from_f32("a", a, TensorRole::Input));
        set.insert(Tensor::from_f32("b", b, TensorRole::Input));
        set.insert(Tensor::zeros(
            "f",
            crate::runtime::args::DType::F32,
            size,
            TensorRole::Output,
        ));
        Ok(set)
    }

    fn compute_golden(&self, tensors: &mut TensorSet, _params: &Value) -> Result<()> {
        let a = tensors
            .get("a")
            .and_then(Tensor::as_f32)
            .ok_or_else(|| RuntimeError::Golden("tensor `a` missing or not f32".into()))?
            .to_vec();
        let b = tensors
            .get("b")
            .and_then(Tensor::as_f32)
            .ok_or_else(|| RuntimeError::Golden("tensor `b` missing or not f32".into()))?
            .to_vec();
        let f = tensors
            .get_mut("f")
            .and_then(Tensor::as_f32_mut)
            .ok_or_else(|| RuntimeError::Golden("tensor `f` missing or not f32".into()))?;

        if a.len() != f.len() || b.len() != f.len() {
            return Err(RuntimeError::Golden("tensor lengths disagree".into()));
        }
        for i in 0..f.len() {
            let s = a[i] + b[i];
            f[i] = (s + 1.0) * (s + 2.0);
        }
        Ok(())
    }
}

/// Deterministic uniform samples in `[0, 1)` from an xorshift64* stream.
fn uniform(count: usize, seed: u64) -> Vec<f32> {
    let mut state = seed | 1;
    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        let bits = state.wrapping_mul(0x2545_f491_4f6c_dd1d);
        out.push((bits >> 40) as f32 / (1u64 << 24) as f32);
    }
    out
}

fn param_usize(params: &Value, key: &str) -> Option<usize> {
    params.get(key)?.as_u64().map(|v| v as usize)
}

fn param_u64(params: &Value, key: &str) -> Option<u64> {
    params.get(key)?.as_u64()
}

fn param_f32(params: &Value, key: &str) -> Option<f32> {
    params.get(key)?.as_f64().map(|v| v as f32)
}
