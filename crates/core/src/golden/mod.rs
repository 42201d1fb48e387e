//! Golden computation contract.
//!
//! A golden module is the reference side of a validation run: it declares
//! the tensor order the orchestration expects, generates input tensors for
//! a parameterized case, computes the expected outputs in place, and names
//! the tolerances the comparison uses. Case parameters travel as JSON
//! values, so manifests and case files can override them without code.

/// Built-in golden modules.
pub mod builtin;
/// Elementwise tolerance comparison.
pub mod compare;

use serde_json::Value;

use crate::common::Result;
use crate::common::constants::{DEFAULT_ATOL, DEFAULT_RTOL};
use crate::runtime::args::TensorSet;

/// The golden-script contract.
///
/// Implementations must be deterministic: the same params must always
/// yield the same tensors and the same expected outputs, so repeated
/// launches are comparable.
pub trait GoldenModule: Send + Sync {
    /// Module name, used for CLI lookup and reporting.
    fn name(&self) -> &str;

    /// Tensor names in the order the orchestration signature expects.
    fn tensor_order(&self) -> Vec<String>;

    /// Names of the output tensors.
    fn outputs(&self) -> Vec<String>;

    /// Parameter sets, one per test case.
    fn params_list(&self) -> Vec<Value> {
        vec![Value::Object(serde_json::Map::new())]
    }

    /// Relative tolerance for comparison.
    fn rtol(&self) -> f32 {
        DEFAULT_RTOL
    }

    /// Absolute tolerance for comparison.
    fn atol(&self) -> f32 {
        DEFAULT_ATOL
    }

    /// Generates all tensors (inputs and zeroed outputs) for one case.
    fn generate_inputs(&self, params: &Value) -> Result<TensorSet>;

    /// Computes the expected outputs in place.
    fn compute_golden(&self, tensors: &mut TensorSet, params: &Value) -> Result<()>;
}

/// Looks up a built-in golden module by name.
pub fn builtin_module(name: &str) -> Option<Box<dyn GoldenModule>> {
    match name {
        "addmul" => Some(Box::new(builtin::AddMulFormula)),
        _ => None,
    }
}

/// Names of all built-in golden modules.
pub fn builtin_names() -> Vec<&'static str> {
    vec!["addmul"]
}
