//! Tensors and the flat argument-passing convention.
//!
//! Host buffers cross into orchestration as a flat `u64` list built
//! deterministically from a declared tensor order: every tensor's base
//! address in order, then every tensor's byte size in the same order, then
//! one trailing scalar, the element count of the first listed tensor.
//! The construction is pure: given the same order and tensor set it always
//! produces the same list (modulo the addresses themselves), which keeps
//! test execution reproducible.

use std::fmt;

use serde::Deserialize;

use crate::common::{Result, RuntimeError};

/// Element type of a tensor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    /// 32-bit IEEE float.
    F32,
    /// 32-bit signed integer.
    I32,
}

impl DType {
    /// Size of one element in bytes.
    pub fn size_of(self) -> usize {
        match self {
            DType::F32 | DType::I32 => 4,
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DType::F32 => write!(f, "f32"),
            DType::I32 => write!(f, "i32"),
        }
    }
}

/// Whether a tensor is produced or consumed by the kernels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TensorRole {
    /// Read by kernels; never written during a launch.
    Input,
    /// Written by kernels; compared against the golden reference.
    Output,
}

/// Typed storage backing a tensor.
#[derive(Clone, Debug, PartialEq)]
enum TensorBuf {
    F32(Vec<f32>),
    I32(Vec<i32>),
}

/// A named, typed, contiguous host buffer.
///
/// Tensors are created by the golden layer and referenced, never owned,
/// by the marshaling protocol. During the Launched state their contents are
/// mutated exclusively by kernel code; the coordinating thread must not
/// read them until `finalize()` returns.
#[derive(Clone, Debug)]
pub struct Tensor {
    name: String,
    role: TensorRole,
    buf: TensorBuf,
}

impl Tensor {
    /// Creates an f32 tensor from existing data.
    pub fn from_f32(name: impl Into<String>, data: Vec<f32>, role: TensorRole) -> Self {
        Self {
            name: name.into(),
            role,
            buf: TensorBuf::F32(data),
        }
    }

    /// Creates an i32 tensor from existing data.
    pub fn from_i32(name: impl Into<String>, data: Vec<i32>, role: TensorRole) -> Self {
        Self {
            name: name.into(),
            role,
            buf: TensorBuf::I32(data),
        }
    }

    /// Creates a zero-filled tensor.
    pub fn zeros(name: impl Into<String>, dtype: DType, elem_count: usize, role: TensorRole) -> Self {
        match dtype {
            DType::F32 => Self::from_f32(name, vec![0.0; elem_count], role),
            DType::I32 => Self::from_i32(name, vec![0; elem_count], role),
        }
    }

    /// Tensor name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Input/Output role.
    pub fn role(&self) -> TensorRole {
        self.role
    }

    /// Reassigns the role.
    pub fn set_role(&mut self, role: TensorRole) {
        self.role = role;
    }

    /// Element type.
    pub fn dtype(&self) -> DType {
        match self.buf {
            TensorBuf::F32(_) => DType::F32,
            TensorBuf::I32(_) => DType::I32,
        }
    }

    /// Number of elements.
    pub fn elem_count(&self) -> usize {
        match &self.buf {
            TensorBuf::F32(v) => v.len(),
            TensorBuf::I32(v) => v.len(),
        }
    }

    /// Buffer length in bytes.
    pub fn byte_len(&self) -> usize {
        self.elem_count() * self.dtype().size_of()
    }

    /// Base address of the buffer, for marshaling.
    ///
    /// Takes `&mut self` because the address may be handed to kernel code
    /// that writes through it.
    pub fn base_addr(&mut self) -> u64 {
        match &mut self.buf {
            TensorBuf::F32(v) => v.as_mut_ptr() as u64,
            TensorBuf::I32(v) => v.as_mut_ptr() as u64,
        }
    }

    /// f32 view of the data, if this is an f32 tensor.
    pub fn as_f32(&self) -> Option<&[f32]> {
        match &self.buf {
            TensorBuf::F32(v) => Some(v),
            TensorBuf::I32(_) => None,
        }
    }

    /// Mutable f32 view of the data, if this is an f32 tensor.
    pub fn as_f32_mut(&mut self) -> Option<&mut [f32]> {
        match &mut self.buf {
            TensorBuf::F32(v) => Some(v),
            TensorBuf::I32(_) => None,
        }
    }

    /// i32 view of the data, if this is an i32 tensor.
    pub fn as_i32(&self) -> Option<&[i32]> {
        match &self.buf {
            TensorBuf::I32(v) => Some(v),
            TensorBuf::F32(_) => None,
        }
    }

    /// Resets every element to zero (the neutral pre-launch value for
    /// output tensors).
    pub fn fill_zero(&mut self) {
        match &mut self.buf {
            TensorBuf::F32(v) => v.fill(0.0),
            TensorBuf::I32(v) => v.fill(0),
        }
    }
}

/// An ordered collection of named tensors for one test case.
#[derive(Clone, Debug, Default)]
pub struct TensorSet {
    tensors: Vec<Tensor>,
}

impl TensorSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a tensor. Names are expected to be unique; a duplicate name
    /// shadows nothing and makes later lookups ambiguous, so callers keep
    /// names distinct.
    pub fn insert(&mut self, tensor: Tensor) {
        self.tensors.push(tensor);
    }

    /// Looks up a tensor by name.
    pub fn get(&self, name: &str) -> Option<&Tensor> {
        self.tensors.iter().find(|t| t.name == name)
    }

    /// Looks up a tensor by name, mutably.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Tensor> {
        self.tensors.iter_mut().find(|t| t.name == name)
    }

    /// Iterates over the tensors in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Tensor> {
        self.tensors.iter()
    }

    /// Iterates mutably over the tensors in insertion order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Tensor> {
        self.tensors.iter_mut()
    }

    /// Number of tensors.
    pub fn len(&self) -> usize {
        self.tensors.len()
    }

    /// Returns true if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
    }

    /// Marks every tensor whose name appears in `outputs` as Output and the
    /// rest as Input.
    pub fn assign_roles(&mut self, outputs: &[String]) {
        for t in &mut self.tensors {
            let role = if outputs.iter().any(|o| o == &t.name) {
                TensorRole::Output
            } else {
                TensorRole::Input
            };
            t.set_role(role);
        }
    }
}

/// The flat argument list consumed by the orchestration entry point.
///
/// Layout for a `TENSOR_ORDER` of length `k`: `k` base addresses, `k` byte
/// sizes, then the element count of the first listed tensor: `2k + 1`
/// words total.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FuncArgs(Vec<u64>);

impl FuncArgs {
    /// Builds the argument list from `order` over `tensors`.
    ///
    /// Fails with [`RuntimeError::MissingTensor`] if any ordered name has
    /// no matching tensor, and with [`RuntimeError::Orchestration`] if the
    /// order is empty (there would be no trailing element count to take).
    pub fn build(order: &[String], tensors: &mut TensorSet) -> Result<Self> {
        if order.is_empty() {
            return Err(RuntimeError::Orchestration(
                "TENSOR_ORDER is empty".into(),
            ));
        }

        let mut words = Vec::with_capacity(2 * order.len() + 1);

        for name in order {
            let t = tensors
                .get_mut(name)
                .ok_or_else(|| RuntimeError::MissingTensor(name.clone()))?;
            words.push(t.base_addr());
        }
        for name in order {
            let t = tensors
                .get(name)
                .ok_or_else(|| RuntimeError::MissingTensor(name.clone()))?;
            words.push(t.byte_len() as u64);
        }

        let first = tensors
            .get(&order[0])
            .ok_or_else(|| RuntimeError::MissingTensor(order[0].clone()))?;
        words.push(first.elem_count() as u64);

        Ok(Self(words))
    }

    /// Wraps an already-flat argument list.
    pub fn from_raw(words: Vec<u64>) -> Self {
        Self(words)
    }

    /// The argument words.
    pub fn as_slice(&self) -> &[u64] {
        &self.0
    }

    /// Number of argument words.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the list is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Consumes the list, returning the words.
    pub fn into_words(self) -> Vec<u64> {
        self.0
    }
}
