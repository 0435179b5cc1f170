//! Byte ranges.
//!
//! A [`ByteRange`] locates the stored bytes of a chunk (or one fragment of a linked-block chunk) within a data file.

use std::ops::Range;

/// A byte offset.
pub type ByteOffset = u64;

/// A byte length.
pub type ByteLength = u64;

/// A byte range from the start of a data file.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct ByteRange {
    offset: ByteOffset,
    length: ByteLength,
}

impl ByteRange {
    /// Create a new byte range of `length` bytes starting at `offset`.
    #[must_use]
    pub const fn new(offset: ByteOffset, length: ByteLength) -> Self {
        Self { offset, length }
    }

    /// Return the start of the byte range.
    #[must_use]
    pub const fn offset(&self) -> ByteOffset {
        self.offset
    }

    /// Return the length of the byte range.
    #[must_use]
    pub const fn length(&self) -> ByteLength {
        self.length
    }

    /// Return the exclusive end of the byte range.
    #[must_use]
    pub const fn end(&self) -> u64 {
        self.offset + self.length
    }

    /// Convert the byte range to a [`Range<u64>`].
    #[must_use]
    pub const fn to_range(&self) -> Range<u64> {
        self.offset..self.end()
    }
}

impl std::fmt::Display for ByteRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(f, "{}..{}", self.offset, self.end())
    }
}
