//! Chunk descriptors.
//!
//! A [`Chunk`] tells a reader where the stored bytes of one rectangular block of an array live and how to decode them.
//! Its [`ChunkSource`] is either a (shared) [`DataUrl`] to fetch the bytes from, or a fill value for chunks absent from the source file.

use std::sync::Arc;

use itertools::Itertools;
use thiserror::Error;

use crate::{
    array::{ArrayIndices, DataType, Endianness, FillValue},
    byte_range::{ByteLength, ByteOffset, ByteRange},
};

/// A chunk descriptor error.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ChunkError {
    /// An invalid `chunkPositionInArray` value.
    #[error("invalid chunk position in array '{0}', expected a bracketed list of indices such as '[0,2]'")]
    InvalidPosition(String),
    /// An invalid `deflateLevel` value.
    #[error("invalid deflate level list '{0}'")]
    InvalidDeflateLevel(String),
}

/// The location of a data file and whether it is trusted.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DataUrl {
    href: String,
    trusted: bool,
}

impl DataUrl {
    /// Create a new data URL.
    #[must_use]
    pub fn new(href: impl Into<String>, trusted: bool) -> Self {
        Self {
            href: href.into(),
            trusted,
        }
    }

    /// Return the href.
    #[must_use]
    pub fn href(&self) -> &str {
        &self.href
    }

    /// Returns true if the URL is trusted.
    #[must_use]
    pub fn is_trusted(&self) -> bool {
        self.trusted
    }
}

impl std::fmt::Display for DataUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.href)
    }
}

/// The source of a chunk's bytes.
#[derive(Clone, Debug, PartialEq)]
pub enum ChunkSource {
    /// The bytes are fetched from a data file.
    Url(Arc<DataUrl>),
    /// The chunk holds only fill values.
    Fill {
        /// The fill value.
        fill_value: FillValue,
        /// The element type of the fill value.
        data_type: DataType,
    },
}

/// The filters applied to the stored bytes of every chunk of a variable, in application order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FilterPipeline {
    filters: Vec<String>,
    deflate_levels: Vec<u32>,
}

impl FilterPipeline {
    /// Create a filter pipeline from the space separated `compressionType` and `deflateLevel` attribute values of a `dmrpp:chunks` element.
    ///
    /// # Errors
    /// Returns [`ChunkError::InvalidDeflateLevel`] if a deflate level is not an unsigned integer.
    pub fn from_attributes(
        compression_type: Option<&str>,
        deflate_level: Option<&str>,
    ) -> Result<Self, ChunkError> {
        let filters = compression_type
            .map(|filters| filters.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default();
        let deflate_levels = deflate_level
            .map(|levels| {
                levels
                    .split_whitespace()
                    .map(str::parse::<u32>)
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|_| ChunkError::InvalidDeflateLevel(levels.to_string()))
            })
            .transpose()?
            .unwrap_or_default();
        Ok(Self {
            filters,
            deflate_levels,
        })
    }

    /// Return the filter names.
    #[must_use]
    pub fn filters(&self) -> &[String] {
        &self.filters
    }

    /// Return the deflate levels, one per deflate pass.
    #[must_use]
    pub fn deflate_levels(&self) -> &[u32] {
        &self.deflate_levels
    }

    /// Returns true if any filter name contains `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.filters.iter().any(|filter| filter.contains(name))
    }

    /// Returns true if there are no filters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

impl std::fmt::Display for FilterPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.filters.iter().join(" "))
    }
}

/// Parse a `chunkPositionInArray` value such as `[0,2]`.
///
/// An empty value is an empty position.
///
/// # Errors
/// Returns [`ChunkError::InvalidPosition`] if the value is not a bracketed, comma separated list of unsigned integers.
pub fn parse_position_in_array(position: &str) -> Result<ArrayIndices, ChunkError> {
    let err = || ChunkError::InvalidPosition(position.to_string());
    let trimmed = position.trim();
    if trimmed.is_empty() {
        return Ok(ArrayIndices::new());
    }
    let inner = trimmed
        .strip_prefix('[')
        .and_then(|inner| inner.strip_suffix(']'))
        .ok_or_else(err)?;
    if inner.trim().is_empty() {
        return Ok(ArrayIndices::new());
    }
    inner
        .split(',')
        .map(|index| index.trim().parse::<u64>().map_err(|_| err()))
        .collect()
}

/// Format a chunk position as it appears in a `chunkPositionInArray` attribute.
#[must_use]
pub fn format_position_in_array(position: &[u64]) -> String {
    format!("[{}]", position.iter().join(","))
}

/// A chunk descriptor.
#[derive(Clone, Debug, PartialEq)]
pub struct Chunk {
    source: ChunkSource,
    byte_range: ByteRange,
    position_in_array: ArrayIndices,
    byte_order: Option<Endianness>,
    filters: FilterPipeline,
    filter_mask: Option<u32>,
    struct_offsets: Vec<u64>,
    linked_blocks: Vec<ByteRange>,
}

impl Chunk {
    /// Create a chunk stored at `byte_range` of the data file at `url`.
    #[must_use]
    pub fn new(url: Arc<DataUrl>, byte_range: ByteRange, position_in_array: ArrayIndices) -> Self {
        Self::new_with_source(ChunkSource::Url(url), byte_range, position_in_array)
    }

    fn new_with_source(
        source: ChunkSource,
        byte_range: ByteRange,
        position_in_array: ArrayIndices,
    ) -> Self {
        Self {
            source,
            byte_range,
            position_in_array,
            byte_order: None,
            filters: FilterPipeline::default(),
            filter_mask: None,
            struct_offsets: Vec::new(),
            linked_blocks: Vec::new(),
        }
    }

    /// Create a chunk stored as several linked blocks of the data file at `url`.
    ///
    /// The chunk offset is the offset of the first block and its size is the total size of the blocks.
    #[must_use]
    pub fn new_linked_blocks(
        url: Arc<DataUrl>,
        linked_blocks: Vec<ByteRange>,
        position_in_array: ArrayIndices,
    ) -> Self {
        let offset = linked_blocks.first().map_or(0, ByteRange::offset);
        let size = linked_blocks.iter().map(ByteRange::length).sum();
        let mut chunk = Self::new(url, ByteRange::new(offset, size), position_in_array);
        chunk.linked_blocks = linked_blocks;
        chunk
    }

    /// Create a chunk of `size` bytes holding only `fill_value`.
    #[must_use]
    pub fn new_fill(
        fill_value: FillValue,
        data_type: DataType,
        size: ByteLength,
        position_in_array: ArrayIndices,
    ) -> Self {
        Self::new_with_source(
            ChunkSource::Fill {
                fill_value,
                data_type,
            },
            ByteRange::new(0, size),
            position_in_array,
        )
    }

    /// Set the byte order.
    #[must_use]
    pub fn with_byte_order(mut self, byte_order: Option<Endianness>) -> Self {
        self.byte_order = byte_order;
        self
    }

    /// Set the filter pipeline.
    #[must_use]
    pub fn with_filters(mut self, filters: FilterPipeline) -> Self {
        self.filters = filters;
        self
    }

    /// Set the filter mask. A set bit `i` means filter `i` was not applied to this chunk.
    #[must_use]
    pub fn with_filter_mask(mut self, filter_mask: Option<u32>) -> Self {
        self.filter_mask = filter_mask;
        self
    }

    /// Set the byte offsets of structure members within each record.
    #[must_use]
    pub fn with_struct_offsets(mut self, struct_offsets: Vec<u64>) -> Self {
        self.struct_offsets = struct_offsets;
        self
    }

    /// Return the source of the chunk.
    #[must_use]
    pub fn source(&self) -> &ChunkSource {
        &self.source
    }

    /// Return the data URL, or [`None`] for a fill value chunk.
    #[must_use]
    pub fn url(&self) -> Option<&Arc<DataUrl>> {
        match &self.source {
            ChunkSource::Url(url) => Some(url),
            ChunkSource::Fill { .. } => None,
        }
    }

    /// Return the fill value, or [`None`] if the chunk is stored in a data file.
    #[must_use]
    pub fn fill_value(&self) -> Option<&FillValue> {
        match &self.source {
            ChunkSource::Fill { fill_value, .. } => Some(fill_value),
            ChunkSource::Url(_) => None,
        }
    }

    /// Returns true if the chunk holds only fill values.
    #[must_use]
    pub fn uses_fill_value(&self) -> bool {
        matches!(self.source, ChunkSource::Fill { .. })
    }

    /// Return the byte range of the chunk.
    #[must_use]
    pub fn byte_range(&self) -> ByteRange {
        self.byte_range
    }

    /// Return the offset of the chunk in its data file.
    #[must_use]
    pub fn offset(&self) -> ByteOffset {
        self.byte_range.offset()
    }

    /// Return the stored size of the chunk in bytes.
    #[must_use]
    pub fn size(&self) -> ByteLength {
        self.byte_range.length()
    }

    /// Return the position of the first element of the chunk in the array.
    #[must_use]
    pub fn position_in_array(&self) -> &[u64] {
        &self.position_in_array
    }

    /// Return the byte order of the stored elements.
    #[must_use]
    pub fn byte_order(&self) -> Option<Endianness> {
        self.byte_order
    }

    /// Return the filter pipeline.
    #[must_use]
    pub fn filters(&self) -> &FilterPipeline {
        &self.filters
    }

    /// Return the filter mask.
    #[must_use]
    pub fn filter_mask(&self) -> Option<u32> {
        self.filter_mask
    }

    /// Return the byte offsets of structure members within each record.
    #[must_use]
    pub fn struct_offsets(&self) -> &[u64] {
        &self.struct_offsets
    }

    /// Return the linked blocks of the chunk. Empty unless the chunk is stored as linked blocks.
    #[must_use]
    pub fn linked_blocks(&self) -> &[ByteRange] {
        &self.linked_blocks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_position_in_array() {
        assert_eq!(parse_position_in_array("[0,2]").unwrap(), [0, 2]);
        assert_eq!(parse_position_in_array(" [ 10, 0 ,3 ] ").unwrap(), [10, 0, 3]);
        assert!(parse_position_in_array("").unwrap().is_empty());
        assert!(parse_position_in_array("[]").unwrap().is_empty());
        assert!(parse_position_in_array("0,2").is_err());
        assert!(parse_position_in_array("[0,-2]").is_err());
        assert!(parse_position_in_array("[0,,2]").is_err());
        assert_eq!(format_position_in_array(&[3, 7]), "[3,7]");
    }

    #[test]
    fn chunk_filter_pipeline() {
        let filters = FilterPipeline::from_attributes(Some("shuffle deflate"), Some("5 1")).unwrap();
        assert_eq!(filters.filters(), ["shuffle", "deflate"]);
        assert_eq!(filters.deflate_levels(), [5, 1]);
        assert!(filters.contains("deflate"));
        assert!(!filters.contains("fletcher32"));
        assert_eq!(filters.to_string(), "shuffle deflate");
        assert!(FilterPipeline::from_attributes(None, None).unwrap().is_empty());
        assert_eq!(
            FilterPipeline::from_attributes(Some("deflate"), Some("high")),
            Err(ChunkError::InvalidDeflateLevel("high".to_string()))
        );
    }

    #[test]
    fn chunk_url() {
        let url = Arc::new(DataUrl::new("data/a.h5", false));
        let chunk = Chunk::new(url.clone(), ByteRange::new(128, 4), vec![])
            .with_byte_order(Some(Endianness::Little))
            .with_filter_mask(Some(1));
        assert_eq!(chunk.offset(), 128);
        assert_eq!(chunk.size(), 4);
        assert!(!chunk.uses_fill_value());
        assert!(Arc::ptr_eq(chunk.url().unwrap(), &url));
        assert_eq!(chunk.byte_order(), Some(Endianness::Little));
        assert_eq!(chunk.filter_mask(), Some(1));
        assert!(chunk.fill_value().is_none());
    }

    #[test]
    fn chunk_linked_blocks() {
        let url = Arc::new(DataUrl::new("data/a.hdf", true));
        let blocks = vec![ByteRange::new(100, 10), ByteRange::new(500, 30)];
        let chunk = Chunk::new_linked_blocks(url, blocks.clone(), vec![0]);
        assert_eq!(chunk.offset(), 100);
        assert_eq!(chunk.size(), 40);
        assert_eq!(chunk.linked_blocks(), blocks);
    }

    #[test]
    fn chunk_fill() {
        let chunk = Chunk::new_fill(FillValue::from(-1.0f32), DataType::Float32, 16, vec![2, 2]);
        assert!(chunk.uses_fill_value());
        assert!(chunk.url().is_none());
        assert_eq!(chunk.fill_value(), Some(&FillValue::from(-1.0f32)));
        assert_eq!(chunk.size(), 16);
        assert_eq!(chunk.position_in_array(), [2, 2]);
    }
}
