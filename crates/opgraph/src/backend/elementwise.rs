//! Element-wise host kernels.

use crate::error::TensorError;
use crate::scalar::Scalar;
use crate::tensor::Tensor;

fn check_same_shape<ElT: Scalar>(a: &Tensor<ElT>, b: &Tensor<ElT>) -> Result<(), TensorError> {
    if a.shape() != b.shape() {
        return Err(TensorError::IncompatibleShapes {
            lhs: a.shape().to_vec(),
            rhs: b.shape().to_vec(),
        });
    }
    Ok(())
}

/// Write `f(a[i])` into `out[i]`.
///
/// # Example
///
/// ```
/// use opgraph::Tensor;
/// use opgraph::backend::map_into;
///
/// let a = Tensor::from_vec(vec![1.0, 4.0, 9.0], &[3]).unwrap();
/// let mut out = Tensor::zeros(&[3]);
/// map_into(&mut out, &a, |x: f64| x.sqrt()).unwrap();
/// assert_eq!(out.data(), &[1.0, 2.0, 3.0]);
/// ```
pub fn map_into<ElT: Scalar, F>(
    out: &mut Tensor<ElT>,
    a: &Tensor<ElT>,
    f: F,
) -> Result<(), TensorError>
where
    F: Fn(ElT) -> ElT,
{
    check_same_shape(out, a)?;
    for (o, &x) in out.data_mut().iter_mut().zip(a.data()) {
        *o = f(x);
    }
    Ok(())
}

/// Write `f(a[i], b[i])` into `out[i]`. All three shapes must agree.
///
/// # Example
///
/// ```
/// use opgraph::Tensor;
/// use opgraph::backend::zip_into;
///
/// let a = Tensor::from_vec(vec![1.0, 2.0, 3.0], &[3]).unwrap();
/// let b = Tensor::from_vec(vec![4.0, 5.0, 6.0], &[3]).unwrap();
/// let mut out = Tensor::zeros(&[3]);
/// zip_into(&mut out, &a, &b, |x, y| x + y).unwrap();
/// assert_eq!(out.data(), &[5.0, 7.0, 9.0]);
/// ```
pub fn zip_into<ElT: Scalar, F>(
    out: &mut Tensor<ElT>,
    a: &Tensor<ElT>,
    b: &Tensor<ElT>,
    f: F,
) -> Result<(), TensorError>
where
    F: Fn(ElT, ElT) -> ElT,
{
    check_same_shape(a, b)?;
    check_same_shape(out, a)?;
    for ((o, &x), &y) in out.data_mut().iter_mut().zip(a.data()).zip(b.data()) {
        *o = f(x, y);
    }
    Ok(())
}

/// Apply a function to each element, returning a new tensor.
pub fn map<ElT: Scalar, F>(a: &Tensor<ElT>, f: F) -> Tensor<ElT>
where
    F: Fn(ElT) -> ElT,
{
    let data: Vec<ElT> = a.data().iter().map(|&x| f(x)).collect();
    rebuild_like(a, data)
}

/// Combine two tensors element-wise into a new tensor.
pub fn zip<ElT: Scalar, F>(
    a: &Tensor<ElT>,
    b: &Tensor<ElT>,
    f: F,
) -> Result<Tensor<ElT>, TensorError>
where
    F: Fn(ElT, ElT) -> ElT,
{
    check_same_shape(a, b)?;
    let data: Vec<ElT> = a
        .data()
        .iter()
        .zip(b.data())
        .map(|(&x, &y)| f(x, y))
        .collect();
    Ok(rebuild_like(a, data))
}

/// Accumulate `other` into `acc` element-wise.
pub fn add_assign<ElT: Scalar>(acc: &mut Tensor<ElT>, other: &Tensor<ElT>) -> Result<(), TensorError> {
    check_same_shape(acc, other)?;
    for (a, &b) in acc.data_mut().iter_mut().zip(other.data()) {
        *a = *a + b;
    }
    Ok(())
}

/// Multiply all elements by a scalar, returning a new tensor.
pub fn scale<ElT: Scalar>(a: &Tensor<ElT>, alpha: ElT) -> Tensor<ElT> {
    map(a, |x| x * alpha)
}

fn rebuild_like<ElT: Scalar>(like: &Tensor<ElT>, data: Vec<ElT>) -> Tensor<ElT> {
    let mut t = Tensor::zeros(like.shape())
        .with_location(like.location())
        .with_context(*like.context());
    t.data_mut().copy_from_slice(&data);
    t
}
