//! One-dimensional COO sparse tensors
//!
//! Used for sparse gradients. Indices may repeat (uncoalesced); repeated
//! entries are summed when the tensor is coalesced or densified.

use crate::{Error, Result};
use ndarray::Array1;
use std::collections::BTreeMap;

/// Sparse vector in coordinate format
#[derive(Debug, Clone, PartialEq)]
pub struct SparseTensor {
    indices: Vec<usize>,
    values: Array1<f32>,
    size: usize,
}

impl SparseTensor {
    /// Create a sparse tensor of logical length `size`
    ///
    /// Fails if the index and value counts differ or any index is out of range.
    pub fn new(indices: Vec<usize>, values: Array1<f32>, size: usize) -> Result<Self> {
        if indices.len() != values.len() {
            return Err(Error::ShapeMismatch {
                expected: vec![indices.len()],
                got: vec![values.len()],
            });
        }
        if let Some(&bad) = indices.iter().find(|&&i| i >= size) {
            return Err(Error::InvalidParameter(format!(
                "sparse index {bad} out of range for size {size}"
            )));
        }
        Ok(Self {
            indices,
            values,
            size,
        })
    }

    /// Stored indices, in insertion order
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Stored values, aligned with `indices`
    pub fn values(&self) -> &Array1<f32> {
        &self.values
    }

    /// Logical (dense) length
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of stored entries, duplicates included
    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    /// True when indices are strictly increasing (no duplicates)
    pub fn is_coalesced(&self) -> bool {
        self.indices.windows(2).all(|w| w[0] < w[1])
    }

    /// Sum duplicate entries and sort by index
    ///
    /// Duplicate values are summed in insertion order, starting from zero,
    /// which is the same order `to_dense` uses.
    pub fn coalesce(&self) -> SparseTensor {
        let mut merged: BTreeMap<usize, f32> = BTreeMap::new();
        for (&i, &v) in self.indices.iter().zip(self.values.iter()) {
            *merged.entry(i).or_insert(0.0) += v;
        }
        let (indices, values): (Vec<usize>, Vec<f32>) = merged.into_iter().unzip();
        SparseTensor {
            indices,
            values: Array1::from(values),
            size: self.size,
        }
    }

    /// Scatter-add into a dense vector
    pub fn to_dense(&self) -> Array1<f32> {
        let mut dense = Array1::zeros(self.size);
        for (&i, &v) in self.indices.iter().zip(self.values.iter()) {
            dense[i] += v;
        }
        dense
    }
}
