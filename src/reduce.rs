//! Element-wise combine primitives used by the reduction engine.
//!
//! Accumulators are byte regions; elements are decoded little-endian so that
//! region offsets never need to be aligned for the element type.

use crate::error::{NwayError, Result};
use crate::types::ReduceOp;

/// Fixed-width element that can live in a registered region.
pub trait Element: Copy + Send + Sync + 'static {
    /// Width of one element in bytes.
    const SIZE: usize;

    fn read_le(bytes: &[u8]) -> Self;
    fn write_le(self, bytes: &mut [u8]);
}

macro_rules! impl_element {
    ($($ty:ty),*) => {
        $(
            impl Element for $ty {
                const SIZE: usize = std::mem::size_of::<$ty>();

                #[inline]
                fn read_le(bytes: &[u8]) -> Self {
                    let mut raw = [0u8; std::mem::size_of::<$ty>()];
                    raw.copy_from_slice(bytes);
                    Self::from_le_bytes(raw)
                }
                #[inline]
                fn write_le(self, bytes: &mut [u8]) {
                    bytes.copy_from_slice(&self.to_le_bytes());
                }
            }
        )*
    };
}

impl_element!(i8, i16, i32, i64, u8, u16, u32, u64, f32, f64);

/// An associative, commutative combine operator over `T`.
///
/// Blocks from different children are combined in arrival order, so the
/// result is only well-defined for operators that do not depend on it.
pub trait Operator<T>: Send + Sync {
    fn combine(&self, own: T, incoming: T) -> T;
}

// Built-in ops for every element type; integer arithmetic wraps.
macro_rules! impl_reduce_op {
    (int: $($ty:ty),*) => {
        $(
            impl Operator<$ty> for ReduceOp {
                #[inline]
                fn combine(&self, own: $ty, incoming: $ty) -> $ty {
                    match self {
                        ReduceOp::Sum => own.wrapping_add(incoming),
                        ReduceOp::Prod => own.wrapping_mul(incoming),
                        ReduceOp::Min => own.min(incoming),
                        ReduceOp::Max => own.max(incoming),
                    }
                }
            }
        )*
    };
    (float: $($ty:ty),*) => {
        $(
            impl Operator<$ty> for ReduceOp {
                #[inline]
                fn combine(&self, own: $ty, incoming: $ty) -> $ty {
                    match self {
                        ReduceOp::Sum => own + incoming,
                        ReduceOp::Prod => own * incoming,
                        ReduceOp::Min => own.min(incoming),
                        ReduceOp::Max => own.max(incoming),
                    }
                }
            }
        )*
    };
}

impl_reduce_op!(int: i8, i16, i32, i64, u8, u16, u32, u64);
impl_reduce_op!(float: f32, f64);

/// Adapts a closure into an [`Operator`].
///
/// ```
/// use nway::reduce::{FnOperator, Operator};
///
/// let xor = FnOperator(|a: u32, b: u32| a ^ b);
/// let r: u32 = xor.combine(0b1100u32, 0b1010u32);
/// assert_eq!(r, 0b0110);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct FnOperator<F>(pub F);

impl<T, F> Operator<T> for FnOperator<F>
where
    F: Fn(T, T) -> T + Send + Sync,
{
    #[inline]
    fn combine(&self, own: T, incoming: T) -> T {
        (self.0)(own, incoming)
    }
}

/// In-place `dst[i] = op(dst[i], src[i])` over byte slices holding `T`s.
pub fn combine_slice<T: Element, O: Operator<T> + ?Sized>(
    dst: &mut [u8],
    src: &[u8],
    op: &O,
) -> Result<()> {
    if dst.len() != src.len() {
        return Err(NwayError::BufferSizeMismatch {
            expected: dst.len(),
            actual: src.len(),
        });
    }
    if dst.len() % T::SIZE != 0 {
        return Err(NwayError::BufferSizeMismatch {
            expected: dst.len() - dst.len() % T::SIZE,
            actual: dst.len(),
        });
    }
    for (d, s) in dst.chunks_exact_mut(T::SIZE).zip(src.chunks_exact(T::SIZE)) {
        let r = op.combine(T::read_le(d), T::read_le(s));
        r.write_le(d);
    }
    Ok(())
}

/// Encode a typed slice into its little-endian byte image.
pub fn encode_slice<T: Element>(values: &[T]) -> Vec<u8> {
    let mut buf = vec![0u8; values.len() * T::SIZE];
    for (chunk, v) in buf.chunks_exact_mut(T::SIZE).zip(values) {
        v.write_le(chunk);
    }
    buf
}

/// Decode a little-endian byte image into typed elements.
pub fn decode_slice<T: Element>(bytes: &[u8]) -> Result<Vec<T>> {
    if bytes.len() % T::SIZE != 0 {
        return Err(NwayError::BufferSizeMismatch {
            expected: bytes.len() - bytes.len() % T::SIZE,
            actual: bytes.len(),
        });
    }
    Ok(bytes.chunks_exact(T::SIZE).map(T::read_le).collect())
}
