//! Lazy loading of chunk descriptors and inline values.

use std::{
    collections::{HashSet, VecDeque},
    sync::Arc,
};

use crate::{
    array::{logical_chunk_count, ArrayIndices, ChunkOdometer, DataType, Endianness, FillValue},
    byte_range::ByteRange,
    chunk::{parse_position_in_array, Chunk, DataUrl, FilterPipeline},
    dap::{StorageClass, Variable},
    error::{dmz_error, DmzError},
    xml::XmlNode,
};

use super::{
    inline, is_unsupported_type, parse_u64_list, required_u64_attribute, DmzDocument,
    UNSUPPORTED_STRING,
};

/// The storage classes in the order their elements are searched for.
const STORAGE_CLASSES: [StorageClass; 6] = [
    StorageClass::Chunked,
    StorageClass::Contiguous,
    StorageClass::Compact,
    StorageClass::MissingData,
    StorageClass::SpecialStructureData,
    StorageClass::Vlsa,
];

/// A parsed `dmrpp:chunk` element.
#[derive(Clone, Debug, PartialEq)]
struct ChunkElement {
    url: Arc<DataUrl>,
    byte_range: ByteRange,
    position_in_array: ArrayIndices,
    filter_mask: Option<u32>,
    linked_block_index: Option<u64>,
}

impl ChunkElement {
    fn parse(
        node: XmlNode<'_>,
        dataset_href: Option<&Arc<DataUrl>>,
        rank: usize,
    ) -> Result<Self, DmzError> {
        let (offset, length) = parse_byte_range(node)?;

        let url = match node.attribute("href").filter(|href| !href.is_empty()) {
            Some(href) => Arc::new(DataUrl::new(href, node.attribute("trust") == Some("true"))),
            None => dataset_href.cloned().ok_or_else(|| {
                dmz_error!("A chunk has no 'href' and the dataset element does not provide one.")
            })?,
        };

        let position_in_array = node
            .attribute("chunkPositionInArray")
            .map(parse_position_in_array)
            .transpose()
            .map_err(|err| dmz_error!("{err}"))?
            .unwrap_or_default();
        if !position_in_array.is_empty() && position_in_array.len() != rank {
            return Err(dmz_error!(
                "The chunk position in array {position_in_array:?} does not match the rank {rank} of the variable."
            ));
        }

        let filter_mask = node
            .attribute("fm")
            .map(|fm| {
                fm.trim()
                    .parse::<u32>()
                    .map_err(|_| dmz_error!("Invalid chunk filter mask '{fm}'."))
            })
            .transpose()?;
        let linked_block_index = node
            .attribute("LinkedBlockIndex")
            .map(|index| {
                index
                    .trim()
                    .parse::<u64>()
                    .map_err(|_| dmz_error!("Invalid LinkedBlockIndex '{index}'."))
            })
            .transpose()?;

        Ok(Self {
            url,
            byte_range: ByteRange::new(offset, length),
            position_in_array,
            filter_mask,
            linked_block_index,
        })
    }

    fn into_chunk(self) -> Chunk {
        Chunk::new(self.url, self.byte_range, self.position_in_array)
            .with_filter_mask(self.filter_mask)
    }
}

/// Parse the required `offset` and `nBytes` attributes of a `chunk` or `block` element.
fn parse_byte_range(node: XmlNode<'_>) -> Result<(u64, u64), DmzError> {
    if node.attribute("offset").is_none() || node.attribute("nBytes").is_none() {
        return Err(dmz_error!(
            "Both size and offset are required for a {} node.",
            node.local_name()
        ));
    }
    Ok((
        required_u64_attribute(node, "offset")?,
        required_u64_attribute(node, "nBytes")?,
    ))
}

/// Collect the blocks of each multi-linked-block chunk, in document order.
///
/// A chunk element with `LinkedBlockIndex` zero starts a new chunk. Later indices append a block to it.
fn collect_linked_blocks(elements: &[ChunkElement]) -> Result<VecDeque<Vec<ByteRange>>, DmzError> {
    let mut linked_blocks: VecDeque<Vec<ByteRange>> = VecDeque::new();
    for element in elements {
        match element.linked_block_index {
            Some(0) => linked_blocks.push_back(vec![element.byte_range]),
            Some(index) => linked_blocks
                .back_mut()
                .ok_or_else(|| {
                    dmz_error!("A linked block with index {index} precedes the first block of its chunk.")
                })?
                .push(element.byte_range),
            None => {}
        }
    }
    Ok(linked_blocks)
}

/// Build the chunks of a multi-linked-block variable, attaching the blocks collected by [`collect_linked_blocks`] to the element starting each chunk.
///
/// Elements without a `LinkedBlockIndex` are ordinary chunks.
fn attach_linked_blocks(
    elements: Vec<ChunkElement>,
    mut linked_blocks: VecDeque<Vec<ByteRange>>,
) -> Result<Vec<Chunk>, DmzError> {
    let mut chunks = Vec::new();
    for element in elements {
        match element.linked_block_index {
            Some(0) => {
                let blocks = linked_blocks
                    .pop_front()
                    .ok_or_else(|| dmz_error!("Ran out of linked blocks while building chunks."))?;
                chunks.push(
                    Chunk::new_linked_blocks(element.url, blocks, element.position_in_array)
                        .with_filter_mask(element.filter_mask),
                );
            }
            Some(_) => {}
            None => chunks.push(element.into_chunk()),
        }
    }
    Ok(chunks)
}

/// Create the fill value of `variable` from the text `fill_value`.
///
/// String fill values are normalized so they are never empty.
fn variable_fill_value(variable: &Variable, fill_value: &str) -> Result<FillValue, DmzError> {
    let element_type = variable.element_type();
    let fill = element_type.fill_value_from_str(fill_value).map_err(|err| {
        dmz_error!("Invalid fill value for the variable '{}': {err}", variable.fqn())
    })?;
    Ok(if element_type.is_string() {
        fill.normalized_string()
    } else {
        fill
    })
}

/// Return the size in bytes of one element of `variable` filled with `fill_value`.
fn fill_element_size(variable: &Variable, fill_value: &FillValue) -> u64 {
    variable
        .element_size()
        .unwrap_or(fill_value.size() as u64)
}

impl DmzDocument {
    /// Load the chunk descriptors of `variable`, or decode its values if they are stored inline.
    ///
    /// Chunked variables get a fill value chunk for every chunk position absent from the document.
    /// Does nothing if the chunks are already loaded.
    ///
    /// # Errors
    /// Returns a [`DmzError`] if the element of the variable cannot be found, its storage elements are malformed or unsupported for its type,
    /// or [`require_chunks`](crate::config::Config#require-chunks) is set and it does not have exactly one storage element.
    pub fn load_chunks(&self, variable: &mut Variable) -> Result<(), DmzError> {
        if variable.dmrpp().chunks_loaded() {
            return Ok(());
        }
        let node = self.variable_node(variable)?;

        let storage: Vec<(StorageClass, XmlNode<'_>)> = STORAGE_CLASSES
            .iter()
            .filter_map(|&class| node.child(class.element_name()).map(|element| (class, element)))
            .collect();
        if self.config().require_chunks() && storage.len() != 1 {
            return Err(dmz_error!(
                "Expected exactly one storage element for the variable '{}', found {}.",
                variable.fqn(),
                storage.len()
            ));
        }

        if let Some(&(class, element)) = storage.first() {
            tracing::debug!(variable = variable.fqn(), storage = class.element_name(), "loading chunks");
            match class {
                StorageClass::Chunked => self.process_chunks(variable, node, element)?,
                StorageClass::Contiguous => {
                    let chunk = ChunkElement::parse(element, self.dataset_href(), variable.dimensions().len())?;
                    variable.dmrpp_mut().add_chunk(chunk.into_chunk());
                }
                StorageClass::Compact => inline::load_compact(variable, element)?,
                StorageClass::MissingData => inline::load_missing_data(variable, element)?,
                StorageClass::SpecialStructureData => {
                    inline::load_special_structure_data(variable, element)?;
                }
                StorageClass::Vlsa => inline::load_vlsa(variable, element)?,
            }
            variable.dmrpp_mut().set_storage_class(class);
        } else {
            tracing::debug!(variable = variable.fqn(), "variable has no storage element");
        }

        variable.dmrpp_mut().set_chunks_loaded();
        Ok(())
    }

    /// Process a `dmrpp:chunks` element.
    fn process_chunks(
        &self,
        variable: &mut Variable,
        variable_node: XmlNode<'_>,
        chunks: XmlNode<'_>,
    ) -> Result<(), DmzError> {
        let fqn = variable.fqn().to_string();
        let rank = variable.dimensions().len();

        let filters = FilterPipeline::from_attributes(
            chunks.attribute("compressionType"),
            chunks.attribute("deflateLevel"),
        )
        .map_err(|err| dmz_error!("Invalid filters for the variable '{fqn}': {err}"))?;
        let byte_order = chunks
            .attribute("byteOrder")
            .map(str::parse::<Endianness>)
            .transpose()
            .map_err(|err| dmz_error!("Invalid byte order for the variable '{fqn}': {err}"))?;

        let fill_value = match chunks.attribute("fillValue") {
            Some(_) if is_unsupported_type(variable_node) => {
                return Err(dmz_error!(
                    "The variable '{fqn}' holds a data type that is not supported."
                ));
            }
            Some(UNSUPPORTED_STRING) => String::new(),
            Some(fill_value) => fill_value.to_string(),
            None => variable.element_type().default_fill_value().to_string(),
        };
        // Constructor types have no fill value of their own.
        if !variable.element_type().is_constructor() {
            variable_fill_value(variable, &fill_value)?;
        }
        let struct_offsets = chunks
            .attribute("structOffset")
            .map(|offsets| parse_u64_list(offsets, "structure offsets"))
            .transpose()?
            .unwrap_or_default();
        let multi_linked_blocks = chunks.attribute("LBChunk") == Some("true");
        let direct_io_disabled = chunks.attribute("DIO") == Some("off");

        let chunk_dimension_sizes = chunks
            .child("chunkDimensionSizes")
            .map(|cds| parse_u64_list(cds.text(), "chunk dimension sizes"))
            .transpose()?
            .unwrap_or_default();
        if variable.is_array() && !chunk_dimension_sizes.is_empty() && chunk_dimension_sizes.len() != rank {
            return Err(dmz_error!(
                "The chunk dimension sizes {chunk_dimension_sizes:?} do not match the rank {rank} of the variable '{fqn}'."
            ));
        }

        let blocks = chunks
            .children_named("block")
            .map(parse_byte_range)
            .map(|range| range.map(|(offset, length)| ByteRange::new(offset, length)))
            .collect::<Result<Vec<_>, _>>()?;
        let elements = chunks
            .children_named("chunk")
            .map(|chunk| ChunkElement::parse(chunk, self.dataset_href(), rank))
            .collect::<Result<Vec<_>, _>>()?;

        let explicit_chunks = match blocks.len() {
            0 if multi_linked_blocks => {
                let linked_blocks = collect_linked_blocks(&elements)?;
                attach_linked_blocks(elements, linked_blocks)?
            }
            0 => elements.into_iter().map(ChunkElement::into_chunk).collect(),
            1 => {
                return Err(dmz_error!(
                    "The variable '{fqn}' has exactly one linked block, linked blocks must number zero or at least two."
                ));
            }
            _ => {
                let url = self.dataset_href().cloned().ok_or_else(|| {
                    dmz_error!("The variable '{fqn}' has linked blocks but the dataset element has no 'href'.")
                })?;
                vec![Chunk::new_linked_blocks(url, blocks, ArrayIndices::new())]
            }
        };
        let fill_chunks = fill_chunks(variable, &fill_value, &chunk_dimension_sizes, &explicit_chunks)?;

        let dmrpp = variable.dmrpp_mut();
        for chunk in explicit_chunks {
            tracing::trace!(
                offset = chunk.offset(),
                size = chunk.size(),
                position = ?chunk.position_in_array(),
                "chunk"
            );
            dmrpp.add_chunk(
                chunk
                    .with_byte_order(byte_order)
                    .with_filters(filters.clone())
                    .with_struct_offsets(struct_offsets.clone()),
            );
        }
        for chunk in fill_chunks {
            dmrpp.add_chunk(chunk);
        }
        dmrpp.set_filters(filters);
        dmrpp.set_byte_order(byte_order);
        dmrpp.set_struct_offsets(struct_offsets);
        dmrpp.set_multi_linked_blocks(multi_linked_blocks);
        dmrpp.set_direct_io_disabled(direct_io_disabled);
        dmrpp.set_chunk_dimension_sizes(chunk_dimension_sizes);
        dmrpp.set_fill_value(Some(fill_value));
        Ok(())
    }
}

/// Return the fill value chunks for the chunk positions of `variable` without an explicit chunk.
///
/// A variable without explicit chunks or a chunk shape is wholly filled, and gets a single fill value chunk.
fn fill_chunks(
    variable: &Variable,
    fill_value: &str,
    chunk_shape: &[u64],
    explicit_chunks: &[Chunk],
) -> Result<Vec<Chunk>, DmzError> {
    let too_large = || {
        dmz_error!("The fill value chunks of the variable '{}' are too large.", variable.fqn())
    };
    let shape = variable.shape();
    let data_type = variable.element_type();

    if variable.is_array() && !chunk_shape.is_empty() {
        let num_chunks = logical_chunk_count(chunk_shape, &shape).map_err(|err| dmz_error!("{err}"))?;
        if explicit_chunks.len() as u64 >= num_chunks {
            return Ok(Vec::new());
        }
        let fill = variable_fill_value(variable, fill_value)?;
        let chunk_size = chunk_shape
            .iter()
            .try_fold(fill_element_size(variable, &fill), |acc, &size| acc.checked_mul(size))
            .ok_or_else(too_large)?;
        let present: HashSet<&[u64]> = explicit_chunks
            .iter()
            .map(Chunk::position_in_array)
            .collect();
        let odometer = ChunkOdometer::new(chunk_shape.to_vec(), shape).map_err(|err| dmz_error!("{err}"))?;
        let fill_chunks: Vec<Chunk> = odometer
            .filter(|position| !present.contains(position.as_slice()))
            .map(|position| Chunk::new_fill(fill.clone(), data_type, chunk_size, position))
            .collect();
        tracing::debug!(
            variable = variable.fqn(),
            num_explicit = explicit_chunks.len(),
            num_fill = fill_chunks.len(),
            "added fill value chunks"
        );
        Ok(fill_chunks)
    } else if explicit_chunks.is_empty() && chunk_shape.is_empty() {
        if !variable.is_array() && matches!(variable.data_type(), DataType::Sequence | DataType::Url) {
            return Err(dmz_error!(
                "The {} variable '{}' cannot be wholly filled with a fill value.",
                variable.data_type(),
                variable.fqn()
            ));
        }
        let fill = variable_fill_value(variable, fill_value)?;
        let size = inline::num_elements(variable)?
            .checked_mul(fill_element_size(variable, &fill))
            .ok_or_else(too_large)?;
        let position = vec![0; variable.dimensions().len()];
        tracing::debug!(variable = variable.fqn(), size, "variable is wholly filled");
        Ok(vec![Chunk::new_fill(fill, data_type, size, position)])
    } else {
        Ok(Vec::new())
    }
}
