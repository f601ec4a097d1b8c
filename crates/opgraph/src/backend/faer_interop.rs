//! Zero-copy views of tensors as faer matrices.
//!
//! Both opgraph and faer use column-major storage, so a 2-D tensor can be
//! viewed as a faer matrix without copying.

use faer::{MatMut, MatRef};

use crate::scalar::Scalar;
use crate::tensor::Tensor;

/// Extension trait for viewing tensors as faer matrices.
pub trait AsFaerMat<T: Scalar> {
    /// View tensor data as an immutable `rows x cols` matrix.
    ///
    /// # Panics
    ///
    /// Panics if `rows * cols != tensor.len()`.
    ///
    /// # Example
    ///
    /// ```
    /// use opgraph::Tensor;
    /// use opgraph::backend::AsFaerMat;
    ///
    /// let t = Tensor::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]).unwrap();
    /// let mat = t.as_faer_mat(2, 3);
    /// assert_eq!(mat.nrows(), 2);
    /// assert_eq!(mat[(1, 2)], 6.0);
    /// ```
    fn as_faer_mat(&self, rows: usize, cols: usize) -> MatRef<'_, T>;

    /// View tensor data as a mutable `rows x cols` matrix.
    ///
    /// # Panics
    ///
    /// Panics if `rows * cols != tensor.len()`.
    fn as_faer_mat_mut(&mut self, rows: usize, cols: usize) -> MatMut<'_, T>;
}

impl<T: Scalar> AsFaerMat<T> for Tensor<T> {
    fn as_faer_mat(&self, rows: usize, cols: usize) -> MatRef<'_, T> {
        assert_eq!(
            rows * cols,
            self.len(),
            "Matrix dimensions ({} x {}) must match tensor size ({})",
            rows,
            cols,
            self.len()
        );
        MatRef::from_column_major_slice(self.data(), rows, cols)
    }

    fn as_faer_mat_mut(&mut self, rows: usize, cols: usize) -> MatMut<'_, T> {
        assert_eq!(
            rows * cols,
            self.len(),
            "Matrix dimensions ({} x {}) must match tensor size ({})",
            rows,
            cols,
            self.len()
        );
        MatMut::from_column_major_slice_mut(self.data_mut(), rows, cols)
    }
}
