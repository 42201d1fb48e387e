//! # Golden Module Tests
//!
//! Tolerance comparison and the built-in reference modules.

use pretty_assertions::assert_eq;
use serde_json::json;

use npusim_core::golden::compare::{count_mismatches, is_close};
use npusim_core::golden::{builtin_module, builtin_names};
use npusim_core::runtime::Tensor;

// ══════════════════════════════════════════════════════════
// Comparison
// ══════════════════════════════════════════════════════════

#[test]
fn test_exact_match_is_close() {
    assert!(is_close(1.0, 1.0, 0.0, 0.0));
}

#[test]
fn test_within_absolute_tolerance() {
    assert!(is_close(1.0005, 1.0, 0.0, 1e-3));
    assert!(!is_close(1.002, 1.0, 0.0, 1e-3));
}

#[test]
fn test_relative_tolerance_scales_with_magnitude() {
    assert!(is_close(1000.5, 1000.0, 1e-3, 0.0));
    assert!(!is_close(1.5, 1.0, 1e-3, 0.0));
}

#[test]
fn test_nan_is_never_close() {
    assert!(!is_close(f32::NAN, 1.0, 1.0, 1.0));
    assert!(!is_close(1.0, f32::NAN, 1.0, 1.0));
    assert!(!is_close(f32::NAN, f32::NAN, 1.0, 1.0));
}

#[test]
fn test_count_mismatches() {
    let actual = [1.0, 2.0, 3.0, 99.0];
    let expected = [1.0, 2.0, 3.5, 99.0];
    assert_eq!(count_mismatches(&actual, &expected, 1e-5, 1e-5), 1);
    assert_eq!(count_mismatches(&actual, &expected, 0.5, 0.0), 0);
}

#[test]
fn test_length_difference_counts_as_mismatch() {
    let actual = [1.0, 2.0];
    let expected = [1.0, 2.0, 3.0, 4.0];
    assert_eq!(count_mismatches(&actual, &expected, 1e-5, 1e-5), 2);
}

// ══════════════════════════════════════════════════════════
// Built-in modules
// ══════════════════════════════════════════════════════════

#[test]
fn test_builtin_lookup() {
    assert!(builtin_module("addmul").is_some());
    assert!(builtin_module("nonesuch").is_none());
    assert!(builtin_names().contains(&"addmul"));
}

#[test]
fn test_addmul_declares_contract() {
    let golden = builtin_module("addmul").unwrap();
    assert_eq!(golden.name(), "addmul");
    assert_eq!(golden.tensor_order(), vec!["a", "b", "f"]);
    assert_eq!(golden.outputs(), vec!["f"]);
    assert_eq!(golden.params_list().len(), 1);
}

#[test]
fn test_addmul_generation_is_deterministic() {
    let golden = builtin_module("addmul").unwrap();
    let params = json!({ "size": 128, "seed": 7 });

    let one = golden.generate_inputs(&params).unwrap();
    let two = golden.generate_inputs(&params).unwrap();
    assert_eq!(
        one.get("a").and_then(Tensor::as_f32),
        two.get("a").and_then(Tensor::as_f32)
    );
    assert_eq!(
        one.get("b").and_then(Tensor::as_f32),
        two.get("b").and_then(Tensor::as_f32)
    );
}

#[test]
fn test_addmul_seeds_diverge() {
    let golden = builtin_module("addmul").unwrap();
    let one = golden.generate_inputs(&json!({ "size": 128, "seed": 1 })).unwrap();
    let two = golden.generate_inputs(&json!({ "size": 128, "seed": 2 })).unwrap();
    assert_ne!(
        one.get("a").and_then(Tensor::as_f32),
        two.get("a").and_then(Tensor::as_f32)
    );
}

#[test]
fn test_addmul_constant_fill_formula() {
    let golden = builtin_module("addmul").unwrap();
    let params = json!({ "size": 16, "fill_a": 2.0, "fill_b": 3.0 });

    let mut tensors = golden.generate_inputs(&params).unwrap();
    golden.compute_golden(&mut tensors, &params).unwrap();

    let f = tensors.get("f").and_then(Tensor::as_f32).unwrap();
    assert!(f.iter().all(|&v| v == 42.0), "expected all 42.0, got {f:?}");
}

#[test]
fn test_addmul_inputs_land_in_unit_interval() {
    let golden = builtin_module("addmul").unwrap();
    let tensors = golden.generate_inputs(&json!({ "size": 1024, "seed": 3 })).unwrap();
    let a = tensors.get("a").and_then(Tensor::as_f32).unwrap();
    assert!(a.iter().all(|&v| (0.0..1.0).contains(&v)));
}

#[test]
fn test_addmul_rejects_zero_size() {
    let golden = builtin_module("addmul").unwrap();
    assert!(golden.generate_inputs(&json!({ "size": 0 })).is_err());
}
