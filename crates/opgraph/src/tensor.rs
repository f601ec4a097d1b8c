//! Dense n-dimensional tensor consumed by the graph.
//!
//! A tensor owns a contiguous column-major buffer, knows which
//! [`MemoryLocation`] the buffer belongs to, and carries the
//! [`ExecutionContext`] its kernels are dispatched on. The graph sets the
//! context of cached outputs; it never looks inside the buffer layout.

use crate::context::ExecutionContext;
use crate::error::TensorError;
use crate::location::MemoryLocation;
use crate::scalar::Scalar;
use crate::storage::Dense;

/// A dense n-dimensional tensor.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor<ElT: Scalar> {
    storage: Dense<ElT>,
    shape: Vec<usize>,
    strides: Vec<usize>,
    location: MemoryLocation,
    context: ExecutionContext,
}

impl<ElT: Scalar> Tensor<ElT> {
    /// Create a new host tensor with the given shape, zero-initialized.
    ///
    /// # Examples
    ///
    /// ```
    /// use opgraph::Tensor;
    ///
    /// let t: Tensor<f64> = Tensor::zeros(&[2, 3, 4]);
    /// assert_eq!(t.shape(), &[2, 3, 4]);
    /// assert_eq!(t.len(), 24);
    /// ```
    pub fn zeros(shape: &[usize]) -> Self {
        let len: usize = shape.iter().product();
        Self {
            storage: Dense::zeros(len.max(1)), // At least 1 for scalar (empty shape)
            shape: shape.to_vec(),
            strides: column_major_strides(shape),
            location: MemoryLocation::Host,
            context: ExecutionContext::default(),
        }
    }

    /// Create a tensor filled with ones.
    pub fn ones(shape: &[usize]) -> Self {
        Self::full(shape, ElT::one())
    }

    /// Create a tensor with every element set to `value`.
    pub fn full(shape: &[usize], value: ElT) -> Self {
        let mut t = Self::zeros(shape);
        t.fill(value);
        t
    }

    /// Create tensor from data and shape.
    ///
    /// Data is expected to be in column-major order.
    ///
    /// # Errors
    ///
    /// Returns `TensorError::ShapeMismatch` if data length doesn't match shape.
    ///
    /// # Examples
    ///
    /// ```
    /// use opgraph::Tensor;
    ///
    /// let t = Tensor::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]).unwrap();
    /// assert_eq!(t.get(&[1, 0]), Some(&2.0)); // column-major
    /// assert_eq!(t.get(&[0, 1]), Some(&3.0));
    /// ```
    pub fn from_vec(data: Vec<ElT>, shape: &[usize]) -> Result<Self, TensorError> {
        let expected_len: usize = shape.iter().product::<usize>().max(1);
        if data.len() != expected_len {
            return Err(TensorError::ShapeMismatch {
                expected: expected_len,
                actual: data.len(),
            });
        }
        Ok(Self {
            storage: Dense::from_vec(data),
            shape: shape.to_vec(),
            strides: column_major_strides(shape),
            location: MemoryLocation::Host,
            context: ExecutionContext::default(),
        })
    }

    /// Move the tensor to another memory location tag.
    pub fn with_location(mut self, location: MemoryLocation) -> Self {
        self.location = location;
        self
    }

    /// Attach an execution context.
    pub fn with_context(mut self, context: ExecutionContext) -> Self {
        self.context = context;
        self
    }

    #[inline]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    #[inline]
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Get total number of elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    #[inline]
    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    #[inline]
    pub fn data(&self) -> &[ElT] {
        self.storage.as_slice()
    }

    #[inline]
    pub fn data_mut(&mut self) -> &mut [ElT] {
        self.storage.as_mut_slice()
    }

    /// Consume the tensor and return its data.
    pub fn into_vec(self) -> Vec<ElT> {
        self.storage.into_vec()
    }

    pub fn location(&self) -> MemoryLocation {
        self.location
    }

    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }

    /// Replace the execution context in place.
    pub fn set_context(&mut self, context: ExecutionContext) {
        self.context = context;
    }

    /// Get element by cartesian indices.
    ///
    /// Returns `None` if indices are out of bounds or wrong number of indices.
    pub fn get(&self, indices: &[usize]) -> Option<&ElT> {
        if indices.len() != self.ndim() {
            return None;
        }
        if indices.iter().zip(self.shape.iter()).any(|(&i, &d)| i >= d) {
            return None;
        }
        self.storage
            .as_slice()
            .get(linear_offset(indices, &self.strides))
    }

    /// Set element by cartesian indices.
    ///
    /// # Errors
    ///
    /// Returns error if indices are out of bounds or wrong number of indices.
    pub fn set(&mut self, indices: &[usize], value: ElT) -> Result<(), TensorError> {
        if indices.len() != self.ndim() {
            return Err(TensorError::WrongNumberOfIndices {
                expected: self.ndim(),
                actual: indices.len(),
            });
        }
        for (&idx, &dim) in indices.iter().zip(self.shape.iter()) {
            if idx >= dim {
                return Err(TensorError::IndexOutOfBounds {
                    index: idx,
                    dim_size: dim,
                });
            }
        }
        let linear = linear_offset(indices, &self.strides);
        self.storage.as_mut_slice()[linear] = value;
        Ok(())
    }

    /// Fill all elements with a value.
    pub fn fill(&mut self, value: ElT) {
        self.storage.as_mut_slice().fill(value);
    }

    /// Copy another tensor's data into this one.
    ///
    /// # Errors
    ///
    /// Returns `TensorError::IncompatibleShapes` if the shapes differ.
    pub fn copy_from(&mut self, src: &Tensor<ElT>) -> Result<(), TensorError> {
        if self.shape != src.shape {
            return Err(TensorError::IncompatibleShapes {
                lhs: self.shape.clone(),
                rhs: src.shape.clone(),
            });
        }
        self.storage.as_mut_slice().copy_from_slice(src.data());
        Ok(())
    }

    /// Reinterpret the buffer with a new shape of equal size.
    ///
    /// # Errors
    ///
    /// Returns an error if the total number of elements doesn't match.
    ///
    /// # Example
    ///
    /// ```
    /// use opgraph::Tensor;
    ///
    /// let t = Tensor::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]).unwrap();
    /// let flat = t.reshape(&[6]).unwrap();
    /// assert_eq!(flat.shape(), &[6]);
    /// assert_eq!(flat.data(), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    /// ```
    pub fn reshape(mut self, new_shape: &[usize]) -> Result<Self, TensorError> {
        let new_len: usize = new_shape.iter().product::<usize>().max(1);
        if self.len() != new_len {
            return Err(TensorError::ShapeMismatch {
                expected: self.len(),
                actual: new_len,
            });
        }
        self.shape = new_shape.to_vec();
        self.strides = column_major_strides(new_shape);
        Ok(self)
    }
}

/// Column-major strides: `[1, d0, d0*d1, ...]`.
fn column_major_strides(shape: &[usize]) -> Vec<usize> {
    shape
        .iter()
        .scan(1usize, |acc, &dim| {
            let stride = *acc;
            *acc *= dim;
            Some(stride)
        })
        .collect()
}

#[inline]
fn linear_offset(indices: &[usize], strides: &[usize]) -> usize {
    indices.iter().zip(strides).map(|(i, s)| i * s).sum()
}
