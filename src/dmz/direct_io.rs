//! Direct I/O eligibility.
//!
//! A chunked array is eligible for direct I/O if its chunks can be copied, still compressed, into a netCDF-4 file.
//! Eligibility is decided in two phases: a cheap scan for any variable declaring a deflate level, then a check of every numeric array.

use crate::{
    array::logical_chunk_count,
    chunk::FilterPipeline,
    dap::{DirectIoInfo, Dmr, Group, Variable},
    error::{dmz_error, DmzError},
    xml::XmlNode,
};

use super::{parse_u64_list, DmzDocument};

impl DmzDocument {
    /// Mark the variables of `dmr` eligible for direct I/O.
    ///
    /// Sets [`Dmr::direct_io_candidates`] if any chunked variable declares a deflate level.
    /// Only then is each numeric array of a group checked. An array is eligible if
    ///  - it is deflate compressed and little endian,
    ///  - direct I/O is not disabled with `DIO="off"`,
    ///  - no chunk dimension exceeds the array dimension,
    ///  - every chunk is present in the document, so no fill value chunks are needed.
    ///
    /// # Errors
    /// Returns a [`DmzError`] if the element of a variable cannot be found or its chunk attributes are malformed.
    pub fn process_direct_io(&self, dmr: &mut Dmr) -> Result<(), DmzError> {
        let candidates = self.group_has_deflate_level(dmr.root())?;
        dmr.set_direct_io_candidates(candidates);
        tracing::debug!(candidates, "direct I/O candidate scan");
        if candidates {
            self.process_group_direct_io(dmr.root_mut())?;
        }
        Ok(())
    }

    fn group_has_deflate_level(&self, group: &Group) -> Result<bool, DmzError> {
        for variable in group.variables() {
            if self.variable_has_deflate_level(variable)? {
                return Ok(true);
            }
        }
        for child in group.groups() {
            if self.group_has_deflate_level(child)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn variable_has_deflate_level(&self, variable: &Variable) -> Result<bool, DmzError> {
        let node = self.variable_node(variable)?;
        if node
            .child("chunks")
            .is_some_and(|chunks| chunks.attribute("deflateLevel").is_some())
        {
            return Ok(true);
        }
        for member in variable.members() {
            if self.variable_has_deflate_level(member)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn process_group_direct_io(&self, group: &mut Group) -> Result<(), DmzError> {
        for variable in group.variables_mut() {
            if variable.is_array() && variable.data_type().is_numeric() {
                let node = self.variable_node(variable)?;
                if let Some(direct_io) = direct_io_info(variable, node)? {
                    tracing::debug!(variable = variable.fqn(), "variable is eligible for direct I/O");
                    variable.dmrpp_mut().set_direct_io(direct_io);
                }
            }
        }
        for child in group.groups_mut() {
            self.process_group_direct_io(child)?;
        }
        Ok(())
    }
}

/// Return the direct I/O information of the array `variable` built from `node`, or [`None`] if it is not eligible.
fn direct_io_info(
    variable: &Variable,
    node: XmlNode<'_>,
) -> Result<Option<DirectIoInfo>, DmzError> {
    let Some(chunks) = node.child("chunks") else {
        return Ok(None);
    };
    let Some(compression_type) = chunks
        .attribute("compressionType")
        .filter(|filters| filters.contains("deflate"))
    else {
        return Ok(None);
    };
    if chunks.attribute("byteOrder") != Some("LE") || chunks.attribute("DIO") == Some("off") {
        return Ok(None);
    }

    let shape = variable.shape();
    let chunk_shape = chunks
        .child("chunkDimensionSizes")
        .map(|cds| parse_u64_list(cds.text(), "chunk dimension sizes"))
        .transpose()?
        .unwrap_or_default();
    if chunk_shape.len() != shape.len()
        || std::iter::zip(&chunk_shape, &shape).any(|(chunk, array)| chunk > array)
    {
        return Ok(None);
    }

    if chunks.num_children() <= 1 {
        return Ok(None);
    }
    let num_chunks = chunks.children_named("chunk").count() as u64;
    match logical_chunk_count(&chunk_shape, &shape) {
        Ok(num_logical_chunks) if num_logical_chunks == num_chunks => {}
        Ok(_) => return Ok(None),
        Err(err) => {
            tracing::debug!(variable = variable.fqn(), %err, "not eligible for direct I/O");
            return Ok(None);
        }
    }

    let filters = FilterPipeline::from_attributes(Some(compression_type), chunks.attribute("deflateLevel"))
        .map_err(|err| dmz_error!("Invalid filters for the variable '{}': {err}", variable.fqn()))?;
    Ok(Some(DirectIoInfo::new(
        compression_type.to_string(),
        filters.deflate_levels().to_vec(),
        chunk_shape,
    )))
}

#[cfg(test)]
mod tests {
    use crate::config::Config;

    use super::*;

    fn array(name: &str, chunks_attributes: &str, cds: &str, positions: &[&str]) -> String {
        let chunks: String = positions
            .iter()
            .map(|position| {
                format!(r#"<dmrpp:chunk offset="0" nBytes="8" chunkPositionInArray="{position}"/>"#)
            })
            .collect();
        format!(
            r#"<Float32 name="{name}"><Dim size="4"/><Dim size="4"/><dmrpp:chunks {chunks_attributes}><dmrpp:chunkDimensionSizes>{cds}</dmrpp:chunkDimensionSizes>{chunks}</dmrpp:chunks></Float32>"#
        )
    }

    const ALL: [&str; 4] = ["[0,0]", "[0,2]", "[2,0]", "[2,2]"];
    const DEFLATE_LE: &str = r#"compressionType="shuffle deflate" deflateLevel="5" byteOrder="LE""#;

    fn build(variables: &str, config: Config) -> Dmr {
        let xml = format!(r#"<Dataset name="d" dmrpp:href="d.h5">{variables}<Group name="g">{}</Group></Dataset>"#,
            array("nested", DEFLATE_LE, "2 2", &ALL));
        let document = DmzDocument::new_from_str_with_config(&xml, config).unwrap();
        let mut dmr = Dmr::default();
        document.build_thin_dmr(&mut dmr).unwrap();
        dmr
    }

    fn is_direct_io(dmr: &Dmr, fqn: &str) -> bool {
        dmr.root().find_variable(fqn).unwrap().dmrpp().is_direct_io()
    }

    #[test]
    fn direct_io_eligibility() {
        let variables = [
            array("eligible", DEFLATE_LE, "2 2", &ALL),
            array("big_endian", r#"compressionType="deflate" deflateLevel="5" byteOrder="BE""#, "2 2", &ALL),
            array("shuffle_only", r#"compressionType="shuffle" byteOrder="LE""#, "2 2", &ALL),
            array("disabled", r#"compressionType="deflate" byteOrder="LE" DIO="off""#, "2 2", &ALL),
            array("oversized", DEFLATE_LE, "8 2", &["[0,0]", "[0,2]"]),
            array("fill", DEFLATE_LE, "2 2", &ALL[..3]),
            array("no_chunks", DEFLATE_LE, "2 2", &[]),
        ]
        .concat();
        let dmr = build(&variables, Config::default());
        assert!(dmr.direct_io_candidates());
        assert!(is_direct_io(&dmr, "/eligible"));
        assert!(is_direct_io(&dmr, "/g/nested"));
        for fqn in ["/big_endian", "/shuffle_only", "/disabled", "/oversized", "/fill", "/no_chunks"] {
            assert!(!is_direct_io(&dmr, fqn), "{fqn}");
        }

        let info = dmr.root().find_variable("/eligible").unwrap().dmrpp().direct_io().unwrap();
        assert_eq!(info.filter(), "shuffle deflate");
        assert_eq!(info.deflate_levels(), [5]);
        assert_eq!(info.chunk_dimension_sizes(), [2, 2]);
    }

    #[test]
    fn direct_io_no_candidates() {
        let dmr = {
            let xml = format!(
                r#"<Dataset name="d" dmrpp:href="d.h5">{}</Dataset>"#,
                array("v", r#"compressionType="deflate" byteOrder="LE""#, "2 2", &ALL)
            );
            let document = DmzDocument::new_from_str(&xml).unwrap();
            let mut dmr = Dmr::default();
            document.build_thin_dmr(&mut dmr).unwrap();
            dmr
        };
        assert!(!dmr.direct_io_candidates());
        assert!(!is_direct_io(&dmr, "/v"));
    }

    #[test]
    fn direct_io_disabled_by_config() {
        let mut config = Config::default();
        config.set_direct_io(false);
        let dmr = build(&array("eligible", DEFLATE_LE, "2 2", &ALL), config);
        assert!(!dmr.direct_io_candidates());
        assert!(!is_direct_io(&dmr, "/eligible"));
    }
}
