use crate::{
    array::Endianness,
    chunk::{Chunk, FilterPipeline},
    codec::vlsa::VLSA_ELEMENT_NAME,
    xml::{local_name, NodeId},
};

/// How the data of a variable is stored.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum StorageClass {
    /// `dmrpp:chunks`: chunks in a data file, with fill value chunks for absent positions.
    Chunked,
    /// `dmrpp:chunk`: one contiguous block of a data file.
    Contiguous,
    /// `dmrpp:compact`: base64 values inline in the document.
    Compact,
    /// `dmrpp:missingdata`: zlib compressed, base64 encoded values inline in the document.
    MissingData,
    /// `dmrpp:specialstructuredata`: packed structure records inline in the document.
    SpecialStructureData,
    /// `dmrpp:vlsa`: variable length string values inline in the document.
    Vlsa,
}

impl StorageClass {
    /// Return the local name of the element describing this storage class.
    #[must_use]
    pub fn element_name(&self) -> &'static str {
        match self {
            Self::Chunked => "chunks",
            Self::Contiguous => "chunk",
            Self::Compact => "compact",
            Self::MissingData => "missingdata",
            Self::SpecialStructureData => "specialstructuredata",
            Self::Vlsa => local_name(VLSA_ELEMENT_NAME),
        }
    }
}

/// Information a writer needs to copy the still compressed chunks of a variable.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirectIoInfo {
    filter: String,
    deflate_levels: Vec<u32>,
    chunk_dimension_sizes: Vec<u64>,
}

impl DirectIoInfo {
    /// Create new direct I/O information.
    #[must_use]
    pub fn new(filter: String, deflate_levels: Vec<u32>, chunk_dimension_sizes: Vec<u64>) -> Self {
        Self {
            filter,
            deflate_levels,
            chunk_dimension_sizes,
        }
    }

    /// Return the filters applied to each chunk, space separated.
    #[must_use]
    pub fn filter(&self) -> &str {
        &self.filter
    }

    /// Return the deflate levels.
    #[must_use]
    pub fn deflate_levels(&self) -> &[u32] {
        &self.deflate_levels
    }

    /// Return the chunk shape.
    #[must_use]
    pub fn chunk_dimension_sizes(&self) -> &[u64] {
        &self.chunk_dimension_sizes
    }
}

/// The DMR++ storage metadata carried by every variable.
///
/// Holds the back-reference to the element the variable was built from and the metadata loaded lazily from it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DmrppCommon {
    xml_node: Option<NodeId>,
    attributes_loaded: bool,
    chunks_loaded: bool,
    storage_class: Option<StorageClass>,
    filters: FilterPipeline,
    byte_order: Option<Endianness>,
    fill_value: Option<String>,
    chunk_dimension_sizes: Vec<u64>,
    struct_offsets: Vec<u64>,
    multi_linked_blocks: bool,
    direct_io_disabled: bool,
    chunks: Vec<Chunk>,
    direct_io: Option<DirectIoInfo>,
}

impl DmrppCommon {
    /// Create storage metadata for a variable built from the element `xml_node`.
    #[must_use]
    pub fn new(xml_node: NodeId) -> Self {
        Self {
            xml_node: Some(xml_node),
            ..Self::default()
        }
    }

    /// Return the element the variable was built from.
    #[must_use]
    pub fn xml_node(&self) -> Option<NodeId> {
        self.xml_node
    }

    /// Returns true if the attributes of the variable have been loaded.
    #[must_use]
    pub fn attributes_loaded(&self) -> bool {
        self.attributes_loaded
    }

    /// Returns true if the chunks of the variable have been loaded.
    #[must_use]
    pub fn chunks_loaded(&self) -> bool {
        self.chunks_loaded
    }

    /// Return the storage class, or [`None`] if not loaded or the variable has no storage element.
    #[must_use]
    pub fn storage_class(&self) -> Option<StorageClass> {
        self.storage_class
    }

    /// Return the filter pipeline.
    #[must_use]
    pub fn filters(&self) -> &FilterPipeline {
        &self.filters
    }

    /// Return the byte order.
    #[must_use]
    pub fn byte_order(&self) -> Option<Endianness> {
        self.byte_order
    }

    /// Return the fill value text from the `dmrpp:chunks` element.
    #[must_use]
    pub fn fill_value(&self) -> Option<&str> {
        self.fill_value.as_deref()
    }

    /// Return the chunk shape. Empty for unchunked storage.
    #[must_use]
    pub fn chunk_dimension_sizes(&self) -> &[u64] {
        &self.chunk_dimension_sizes
    }

    /// Return the byte offsets of structure members within each record.
    #[must_use]
    pub fn struct_offsets(&self) -> &[u64] {
        &self.struct_offsets
    }

    /// Returns true if the chunks are stored as multiple linked blocks.
    #[must_use]
    pub fn multi_linked_blocks(&self) -> bool {
        self.multi_linked_blocks
    }

    /// Returns true if direct I/O was disabled with `DIO="off"`.
    #[must_use]
    pub fn direct_io_disabled(&self) -> bool {
        self.direct_io_disabled
    }

    /// Return the chunks: explicit chunks in document order, followed by fill value chunks in row-major order.
    #[must_use]
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Returns true if any chunk holds only fill values.
    #[must_use]
    pub fn uses_fill_value(&self) -> bool {
        self.chunks.iter().any(Chunk::uses_fill_value)
    }

    /// Return the direct I/O information, or [`None`] if the variable is not eligible for direct I/O.
    #[must_use]
    pub fn direct_io(&self) -> Option<&DirectIoInfo> {
        self.direct_io.as_ref()
    }

    /// Returns true if the variable is eligible for direct I/O.
    #[must_use]
    pub fn is_direct_io(&self) -> bool {
        self.direct_io.is_some()
    }

    /// Add a chunk.
    pub fn add_chunk(&mut self, chunk: Chunk) {
        self.chunks.push(chunk);
    }

    pub(crate) fn set_attributes_loaded(&mut self) {
        self.attributes_loaded = true;
    }

    pub(crate) fn set_chunks_loaded(&mut self) {
        self.chunks_loaded = true;
    }

    pub(crate) fn set_storage_class(&mut self, storage_class: StorageClass) {
        self.storage_class = Some(storage_class);
    }

    pub(crate) fn set_filters(&mut self, filters: FilterPipeline) {
        self.filters = filters;
    }

    pub(crate) fn set_byte_order(&mut self, byte_order: Option<Endianness>) {
        self.byte_order = byte_order;
    }

    pub(crate) fn set_fill_value(&mut self, fill_value: Option<String>) {
        self.fill_value = fill_value;
    }

    pub(crate) fn set_chunk_dimension_sizes(&mut self, chunk_dimension_sizes: Vec<u64>) {
        self.chunk_dimension_sizes = chunk_dimension_sizes;
    }

    pub(crate) fn set_struct_offsets(&mut self, struct_offsets: Vec<u64>) {
        self.struct_offsets = struct_offsets;
    }

    pub(crate) fn set_multi_linked_blocks(&mut self, multi_linked_blocks: bool) {
        self.multi_linked_blocks = multi_linked_blocks;
    }

    pub(crate) fn set_direct_io_disabled(&mut self, direct_io_disabled: bool) {
        self.direct_io_disabled = direct_io_disabled;
    }

    pub(crate) fn set_direct_io(&mut self, direct_io: DirectIoInfo) {
        self.direct_io = Some(direct_io);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_class_element_name() {
        assert_eq!(StorageClass::Chunked.element_name(), "chunks");
        assert_eq!(StorageClass::Vlsa.element_name(), "vlsa");
        assert!(VLSA_ELEMENT_NAME.ends_with(StorageClass::Vlsa.element_name()));
    }
}
