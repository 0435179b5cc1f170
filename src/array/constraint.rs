use thiserror::Error;

/// A constraint on one dimension of an array: the elements `start`, `start + stride`, ... up to and including `stop`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct DimensionConstraint {
    start: u64,
    stride: u64,
    stop: u64,
}

/// An invalid constraint error.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ConstraintError {
    /// The constraint is invalid for a dimension.
    #[error("invalid constraint [{start}:{stride}:{stop}] for a dimension of size {size}")]
    InvalidConstraint {
        /// The start index.
        start: u64,
        /// The stride.
        stride: u64,
        /// The inclusive stop index.
        stop: u64,
        /// The dimension size.
        size: u64,
    },
    /// The number of constraints does not match the array dimensionality.
    #[error("{constraints} constraints do not match an array with {dimensionality} dimensions")]
    IncompatibleDimensionality {
        /// The number of constraints.
        constraints: usize,
        /// The array dimensionality.
        dimensionality: usize,
    },
    /// The source buffer does not hold the whole array.
    #[error("source of length {actual} does not hold the whole array")]
    InvalidSourceLength {
        /// The source length.
        actual: usize,
        /// The expected source length, or [`None`] if it exceeds [`u64::MAX`].
        expected: Option<u64>,
    },
}

impl DimensionConstraint {
    /// Create a new dimension constraint.
    ///
    /// # Errors
    /// Returns [`ConstraintError::InvalidConstraint`] if `stride` is zero, `start > stop` or `stop >= size`.
    pub fn new(start: u64, stride: u64, stop: u64, size: u64) -> Result<Self, ConstraintError> {
        if stride == 0 || start > stop || stop >= size {
            return Err(ConstraintError::InvalidConstraint {
                start,
                stride,
                stop,
                size,
            });
        }
        Ok(Self {
            start,
            stride,
            stop,
        })
    }

    /// Create a constraint selecting every element of a dimension of `size` elements.
    ///
    /// Returns [`None`] if `size` is zero.
    #[must_use]
    pub fn full(size: u64) -> Option<Self> {
        Self::new(0, 1, size.checked_sub(1)?, size).ok()
    }

    /// Return the start index.
    #[must_use]
    pub const fn start(&self) -> u64 {
        self.start
    }

    /// Return the stride.
    #[must_use]
    pub const fn stride(&self) -> u64 {
        self.stride
    }

    /// Return the inclusive stop index.
    #[must_use]
    pub const fn stop(&self) -> u64 {
        self.stop
    }

    /// Return the number of selected elements.
    #[must_use]
    pub const fn num_elements(&self) -> u64 {
        (self.stop - self.start) / self.stride + 1
    }

    /// Returns true if every element of a dimension of `size` elements is selected.
    #[must_use]
    pub const fn is_full(&self, size: u64) -> bool {
        self.start == 0 && self.stride == 1 && self.stop + 1 == size
    }

    fn indices(&self) -> impl Iterator<Item = u64> {
        (self.start..=self.stop).step_by(usize::try_from(self.stride).unwrap_or(usize::MAX))
    }
}

/// Extract the constrained elements of a row-major array.
///
/// `source` holds every element of an array of shape `shape`, each element occupying `element_len` consecutive items of `source`.
/// The result holds the selected elements in row-major order.
/// Runs of the innermost dimension with a stride of one are copied as a single slice.
///
/// # Errors
/// Returns a [`ConstraintError`] if `constraints` does not match `shape` or `source` does not hold the whole array.
pub fn extract_constrained<T: Clone>(
    source: &[T],
    shape: &[u64],
    constraints: &[DimensionConstraint],
    element_len: usize,
) -> Result<Vec<T>, ConstraintError> {
    if constraints.len() != shape.len() {
        return Err(ConstraintError::IncompatibleDimensionality {
            constraints: constraints.len(),
            dimensionality: shape.len(),
        });
    }
    let expected = shape
        .iter()
        .try_fold(element_len as u64, |acc, &size| acc.checked_mul(size));
    if expected != Some(source.len() as u64) {
        return Err(ConstraintError::InvalidSourceLength {
            actual: source.len(),
            expected,
        });
    }
    for (constraint, &size) in std::iter::zip(constraints, shape) {
        if constraint.stop >= size {
            return Err(ConstraintError::InvalidConstraint {
                start: constraint.start,
                stride: constraint.stride,
                stop: constraint.stop,
                size,
            });
        }
    }

    // Row-major element strides.
    let mut strides = vec![1u64; shape.len()];
    for i in (0..shape.len().saturating_sub(1)).rev() {
        strides[i] = strides[i + 1] * shape[i + 1];
    }

    let num_elements: u64 = constraints.iter().map(DimensionConstraint::num_elements).product();
    let mut out = Vec::with_capacity(usize::try_from(num_elements).unwrap_or(0) * element_len);
    if shape.is_empty() {
        out.extend_from_slice(source);
    } else {
        extract_dimension(source, constraints, &strides, element_len, 0, 0, &mut out);
    }
    Ok(out)
}

#[allow(clippy::cast_possible_truncation)]
fn extract_dimension<T: Clone>(
    source: &[T],
    constraints: &[DimensionConstraint],
    strides: &[u64],
    element_len: usize,
    dimension: usize,
    offset: u64,
    out: &mut Vec<T>,
) {
    let constraint = constraints[dimension];
    if dimension + 1 == constraints.len() {
        if constraint.stride == 1 {
            let start = (offset + constraint.start) as usize * element_len;
            let end = (offset + constraint.stop + 1) as usize * element_len;
            out.extend_from_slice(&source[start..end]);
        } else {
            for index in constraint.indices() {
                let start = (offset + index) as usize * element_len;
                out.extend_from_slice(&source[start..start + element_len]);
            }
        }
    } else {
        for index in constraint.indices() {
            extract_dimension(
                source,
                constraints,
                strides,
                element_len,
                dimension + 1,
                offset + index * strides[dimension],
                out,
            );
        }
    }
}
