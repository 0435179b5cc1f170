//! Array element types and chunk layout.
//!
//! This module holds the element-level and shape-level building blocks of a DMR++ variable:
//!  - [`DataType`]: a DAP4 data type,
//!  - [`Endianness`]: the byte order of stored elements,
//!  - [`FillValue`]: the element value of chunks absent from the source file,
//!  - [`ChunkOdometer`]: enumerates chunk positions to find those absent chunks,
//!  - [`DimensionConstraint`] and [`extract_constrained`]: subsetting of inline array data.

mod chunk_odometer;
mod constraint;
pub mod data_type;
mod endianness;
mod fill_value;

pub use chunk_odometer::{logical_chunk_count, ChunkOdometer, ChunkOdometerError};
pub use constraint::{extract_constrained, ConstraintError, DimensionConstraint};
pub use data_type::{DataType, IncompatibleFillValueError, UnsupportedDataTypeError};
pub use endianness::{Endianness, InvalidEndiannessError, NATIVE_ENDIAN};
pub use fill_value::FillValue;

/// An array shape. Dimensions may be zero.
pub type ArrayShape = Vec<u64>;

/// An ND index to an element in an array or chunk.
pub type ArrayIndices = Vec<u64>;
