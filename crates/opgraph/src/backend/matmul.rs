//! Matrix multiplication on faer.

use faer::linalg::matmul::matmul;
use faer::{Accum, Par};

use crate::backend::AsFaerMat;
use crate::error::TensorError;
use crate::scalar::Scalar;
use crate::tensor::Tensor;

fn matrix_dims<ElT: Scalar>(t: &Tensor<ElT>) -> Result<(usize, usize), TensorError> {
    match t.shape() {
        &[rows, cols] => Ok((rows, cols)),
        shape => Err(TensorError::RankMismatch {
            expected: 2,
            actual: shape.len(),
        }),
    }
}

/// Compute `out = op(a) * op(b)` where `op` optionally transposes.
///
/// All operands are rank-2 column-major tensors. `out` must already have
/// shape `[m, n]`.
///
/// # Example
///
/// ```
/// use opgraph::Tensor;
/// use opgraph::backend::matmul_into;
///
/// // [[1, 2], [3, 4]] in column-major order
/// let a = Tensor::from_vec(vec![1.0, 3.0, 2.0, 4.0], &[2, 2]).unwrap();
/// let id = Tensor::from_vec(vec![1.0, 0.0, 0.0, 1.0], &[2, 2]).unwrap();
/// let mut c = Tensor::zeros(&[2, 2]);
/// matmul_into(&mut c, &a, false, &id, false).unwrap();
/// assert_eq!(c.data(), a.data());
/// ```
pub fn matmul_into<ElT: Scalar>(
    out: &mut Tensor<ElT>,
    a: &Tensor<ElT>,
    transpose_a: bool,
    b: &Tensor<ElT>,
    transpose_b: bool,
) -> Result<(), TensorError> {
    let (a_rows, a_cols) = matrix_dims(a)?;
    let (b_rows, b_cols) = matrix_dims(b)?;
    let (m, k) = if transpose_a {
        (a_cols, a_rows)
    } else {
        (a_rows, a_cols)
    };
    let (k_b, n) = if transpose_b {
        (b_cols, b_rows)
    } else {
        (b_rows, b_cols)
    };
    if k != k_b {
        return Err(TensorError::IncompatibleShapes {
            lhs: a.shape().to_vec(),
            rhs: b.shape().to_vec(),
        });
    }
    if out.shape() != [m, n] {
        return Err(TensorError::IncompatibleShapes {
            lhs: out.shape().to_vec(),
            rhs: vec![m, n],
        });
    }

    let a_mat = a.as_faer_mat(a_rows, a_cols);
    let b_mat = b.as_faer_mat(b_rows, b_cols);
    let lhs = if transpose_a { a_mat.transpose() } else { a_mat };
    let rhs = if transpose_b { b_mat.transpose() } else { b_mat };
    let mut c_mat = out.as_faer_mat_mut(m, n);

    // C = 1 * op(A) * op(B), previous contents of C discarded
    matmul(c_mat.as_mut(), Accum::Replace, lhs, rhs, ElT::one(), Par::Seq);
    Ok(())
}
