use thiserror::Error;

use super::{ArrayIndices, ArrayShape};

/// A chunk odometer creation error.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ChunkOdometerError {
    /// The chunk shape and array shape have different dimensionality.
    #[error("chunk shape {chunk_shape:?} does not match the dimensionality of array shape {array_shape:?}")]
    IncompatibleDimensionality {
        /// The chunk shape.
        chunk_shape: ArrayShape,
        /// The array shape.
        array_shape: ArrayShape,
    },
    /// A chunk dimension is zero.
    #[error("chunk shape {0:?} has a zero sized dimension")]
    ZeroChunkDimension(ArrayShape),
    /// The number of chunks exceeds [`u64::MAX`].
    #[error("array shape {0:?} has too many chunks")]
    TooManyChunks(ArrayShape),
}

/// Enumerates the origin of every chunk of an array in row-major order.
///
/// Each position is a multiple of the chunk shape in every dimension.
/// The last dimension advances fastest, by its chunk size, and carries into the previous dimension when it reaches the array size.
///
/// For example, an odometer with chunk shape `[2, 3]` over array shape `[4, 5]` visits `[0, 0]`, `[0, 3]`, `[2, 0]`, `[2, 3]`.
#[derive(Clone, Debug)]
pub struct ChunkOdometer {
    chunk_shape: ArrayShape,
    array_shape: ArrayShape,
    indices: ArrayIndices,
    exhausted: bool,
}

impl ChunkOdometer {
    /// Create a new chunk odometer positioned at the origin.
    ///
    /// # Errors
    /// Returns [`ChunkOdometerError`] if the shapes have different dimensionality or a chunk dimension is zero.
    pub fn new(chunk_shape: ArrayShape, array_shape: ArrayShape) -> Result<Self, ChunkOdometerError> {
        if chunk_shape.len() != array_shape.len() {
            return Err(ChunkOdometerError::IncompatibleDimensionality {
                chunk_shape,
                array_shape,
            });
        }
        if chunk_shape.contains(&0) {
            return Err(ChunkOdometerError::ZeroChunkDimension(chunk_shape));
        }
        let exhausted = array_shape.contains(&0);
        Ok(Self {
            indices: vec![0; array_shape.len()],
            chunk_shape,
            array_shape,
            exhausted,
        })
    }

    /// Return the current chunk position.
    #[must_use]
    pub fn indices(&self) -> &[u64] {
        &self.indices
    }

    /// Returns true if every position has been visited.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Advance to the next chunk position.
    ///
    /// Returns false once the last position has wrapped, after which the odometer stays exhausted.
    pub fn advance(&mut self) -> bool {
        if self.exhausted {
            return false;
        }
        for ((index, chunk_size), array_size) in self
            .indices
            .iter_mut()
            .zip(&self.chunk_shape)
            .zip(&self.array_shape)
            .rev()
        {
            *index += chunk_size;
            if *index < *array_size {
                return true;
            }
            *index = 0;
        }
        self.exhausted = true;
        false
    }
}

impl Iterator for ChunkOdometer {
    type Item = ArrayIndices;

    fn next(&mut self) -> Option<Self::Item> {
        if self.exhausted {
            return None;
        }
        let indices = self.indices.clone();
        self.advance();
        Some(indices)
    }
}

impl std::iter::FusedIterator for ChunkOdometer {}

/// Return the number of chunks of shape `chunk_shape` covering an array of shape `array_shape`.
///
/// This is the product of the ceiling division of each array dimension by its chunk dimension.
///
/// # Errors
/// Returns [`ChunkOdometerError`] if the shapes have different dimensionality, a chunk dimension is zero, or the count overflows.
pub fn logical_chunk_count(chunk_shape: &[u64], array_shape: &[u64]) -> Result<u64, ChunkOdometerError> {
    if chunk_shape.len() != array_shape.len() {
        return Err(ChunkOdometerError::IncompatibleDimensionality {
            chunk_shape: chunk_shape.to_vec(),
            array_shape: array_shape.to_vec(),
        });
    }
    if chunk_shape.contains(&0) {
        return Err(ChunkOdometerError::ZeroChunkDimension(chunk_shape.to_vec()));
    }
    std::iter::zip(array_shape, chunk_shape)
        .try_fold(1u64, |acc, (a, s)| acc.checked_mul(a.div_ceil(*s)))
        .ok_or_else(|| ChunkOdometerError::TooManyChunks(array_shape.to_vec()))
}
