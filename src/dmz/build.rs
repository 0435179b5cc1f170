//! Building the thin DMR.

use std::collections::{HashMap, HashSet};

use crate::{
    array::DataType,
    dap::{
        child_fqn, ArrayDimension, ArrayMap, Dimension, Dmr, EnumConst, Enumeration,
        EnumerationRef, Group, StringArray, StringPad, Variable,
    },
    error::{dmz_error, DmzError},
    xml::XmlNode,
};

use super::{is_unsupported_type, required_attribute, required_u64_attribute, DmzDocument};

/// Resolve a dimension or enumeration reference from within the group `group_fqn`.
fn resolve_reference(group_fqn: &str, reference: &str) -> String {
    if reference.starts_with('/') {
        reference.to_string()
    } else {
        child_fqn(group_fqn, reference)
    }
}

/// The definitions seen so far while walking the document.
///
/// References are resolved against earlier definitions only, as a single pass over the document would.
struct ThinDmrBuilder<'d> {
    document: &'d DmzDocument,
    dimensions: HashMap<String, u64>,
    enumerations: HashMap<String, DataType>,
    arrays: HashSet<String>,
}

impl DmzDocument {
    /// Populate `dmr` with the structure of the dataset: its groups, shared dimensions, enumerations and variables.
    ///
    /// Attributes and chunks are not loaded; see [`load_attributes`](DmzDocument::load_attributes) and [`load_chunks`](DmzDocument::load_chunks).
    /// Variables holding a type that cannot be served are dropped if [elision](crate::config::Config#elide-unsupported-types) is enabled.
    /// If [direct I/O](crate::config::Config#direct-io) is enabled, variables eligible for direct I/O are then marked with [`process_direct_io`](DmzDocument::process_direct_io).
    ///
    /// # Errors
    /// Returns a [`DmzError`] if `dmr` is not empty, a required attribute is missing, or a dimension or enumeration reference cannot be resolved.
    pub fn build_thin_dmr(&self, dmr: &mut Dmr) -> Result<(), DmzError> {
        if !dmr.root().variables().is_empty() || !dmr.root().groups().is_empty() {
            return Err(dmz_error!("A thin DMR can only be built into an empty DMR."));
        }

        let dataset = self.xml().root();
        self.process_dataset(dmr, dataset)?;

        let mut builder = ThinDmrBuilder {
            document: self,
            dimensions: HashMap::new(),
            enumerations: HashMap::new(),
            arrays: HashSet::new(),
        };
        let root = dmr.root_mut();
        root.set_xml_node(dataset.id());
        builder.process_group_children(root, dataset)?;

        if self.config().direct_io() {
            self.process_direct_io(dmr)?;
        }
        Ok(())
    }

    fn process_dataset(&self, dmr: &mut Dmr, dataset: XmlNode<'_>) -> Result<(), DmzError> {
        let name = dataset.attribute("name").filter(|name| !name.is_empty());
        let Some(name) = name else {
            return Err(dmz_error!(
                "DMR++ XML dataset element missing one or more required attributes."
            ));
        };
        let owned = |value: Option<&str>| value.map(str::to_string);
        dmr.set_name(name.to_string());
        dmr.set_dap_version(owned(dataset.attribute("dapVersion")));
        dmr.set_dmr_version(owned(dataset.attribute("dmrVersion")));
        dmr.set_xml_base(owned(dataset.attribute("base")));
        dmr.set_namespace(owned(dataset.attribute("xmlns")));
        dmr.set_href(self.dataset_href().cloned());
        dmr.set_dmrpp_version(owned(dataset.attribute("version")));
        tracing::debug!(
            name,
            xml_base = dmr.xml_base(),
            dmrpp_version = dmr.dmrpp_version(),
            "processed dataset element"
        );
        Ok(())
    }
}

impl ThinDmrBuilder<'_> {
    fn process_group_children(&mut self, group: &mut Group, node: XmlNode<'_>) -> Result<(), DmzError> {
        for child in node.children() {
            match child.local_name() {
                "Dimension" => self.process_dimension(group, child)?,
                "Enumeration" => self.process_enumeration(group, child)?,
                "Group" => self.process_group(group, child)?,
                name if DataType::from_element_name(name).is_some() => {
                    let group_fqn = group.fqn().to_string();
                    if let Some(variable) = self.process_variable(&group_fqn, &group_fqn, child)? {
                        group.add_variable(variable);
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn process_dimension(&mut self, group: &mut Group, node: XmlNode<'_>) -> Result<(), DmzError> {
        let (Some(name), Some(size)) = (
            node.attribute("name").filter(|name| !name.is_empty()),
            node.attribute("size").filter(|size| !size.is_empty()),
        ) else {
            return Err(dmz_error!(
                "The required attribute 'name' or 'size' was missing from a Dimension element."
            ));
        };
        let size = size.trim().parse::<u64>().map_err(|_| {
            dmz_error!("The size '{size}' of the Dimension '{name}' is not an unsigned integer.")
        })?;
        let fqn = child_fqn(group.fqn(), name);
        self.dimensions.insert(fqn.clone(), size);
        group.add_dimension(Dimension::new(name, fqn, size));
        Ok(())
    }

    fn process_enumeration(&mut self, group: &mut Group, node: XmlNode<'_>) -> Result<(), DmzError> {
        let name = required_attribute(node, "name")?;
        let base_type = required_attribute(node, "basetype")?;
        let base_type = DataType::from_element_name(base_type)
            .filter(DataType::is_integer)
            .ok_or_else(|| {
                dmz_error!(
                    "The Enumeration '{name}' has base type '{base_type}', which is not an integer type."
                )
            })?;

        let mut constants = Vec::new();
        for constant in node.children_named("EnumConst") {
            let (Some(label), Some(value)) = (
                constant.attribute("name").filter(|label| !label.is_empty()),
                constant.attribute("value").filter(|value| !value.is_empty()),
            ) else {
                return Err(dmz_error!(
                    "The Enumeration '{name}' has an EnumConst without a name or value."
                ));
            };
            let value = value.trim().parse::<i64>().map_err(|_| {
                dmz_error!("The EnumConst '{label}' of the Enumeration '{name}' has the non-integer value '{value}'.")
            })?;
            constants.push(EnumConst {
                name: label.to_string(),
                value,
            });
        }

        let fqn = child_fqn(group.fqn(), name);
        self.enumerations.insert(fqn.clone(), base_type);
        group.add_enumeration(Enumeration::new(name, fqn, base_type, constants));
        Ok(())
    }

    fn process_group(&mut self, parent: &mut Group, node: XmlNode<'_>) -> Result<(), DmzError> {
        let name = node
            .attribute("name")
            .filter(|name| !name.is_empty())
            .ok_or_else(|| {
                dmz_error!("The required attribute 'name' was missing from a Group element.")
            })?;
        let mut group = Group::new(name, parent.fqn(), node.id());
        self.process_group_children(&mut group, node)?;
        parent.add_group(group);
        Ok(())
    }

    /// Build the variable declared by `node`, or [`None`] if it was elided.
    ///
    /// `parent_fqn` is the enclosing group, or structure for a member.
    fn process_variable(
        &mut self,
        group_fqn: &str,
        parent_fqn: &str,
        node: XmlNode<'_>,
    ) -> Result<Option<Variable>, DmzError> {
        let data_type = DataType::from_element_name(node.local_name()).ok_or_else(|| {
            dmz_error!("'{}' does not declare a variable.", node.name())
        })?;
        let name = node
            .attribute("name")
            .filter(|name| !name.is_empty())
            .ok_or_else(|| dmz_error!("The variable 'name' attribute was missing."))?;
        let fqn = child_fqn(parent_fqn, name);

        if self.document.config().elide_unsupported_types() && is_unsupported_type(node) {
            tracing::info!(variable = %fqn, "eliding variable of an unsupported type");
            return Ok(None);
        }

        let mut variable = Variable::new(name, fqn.as_str(), data_type, node.id());

        if data_type == DataType::Enum {
            let reference = node.attribute("enum").filter(|e| !e.is_empty()).ok_or_else(|| {
                dmz_error!("The variable '{name}' lacks an 'enum' attribute.")
            })?;
            let enum_fqn = resolve_reference(group_fqn, reference);
            let base_type = self.enumerations.get(&enum_fqn).ok_or_else(|| {
                dmz_error!("Could not find the Enumeration definition '{reference}'.")
            })?;
            variable.set_enumeration(EnumerationRef::new(enum_fqn, *base_type));
        }

        for child in node.children() {
            match child.local_name() {
                "Dim" => self.process_dim(group_fqn, &mut variable, child)?,
                "Map" => self.process_map(&mut variable, child)?,
                "FixedLengthStringArray" => {
                    let length = required_u64_attribute(child, "string_length")?;
                    if length == 0 {
                        return Err(dmz_error!(
                            "The fixed length string array '{fqn}' has a string length of zero."
                        ));
                    }
                    let pad = child
                        .attribute("pad")
                        .map_or(Ok(StringPad::Null), str::parse::<StringPad>)?;
                    variable.set_string_array(StringArray::FixedLength { length, pad });
                }
                "VariableLengthStringArray" => {
                    variable.set_string_array(StringArray::VariableLength);
                }
                _ => {}
            }
        }

        if data_type.is_constructor() {
            for child in node.children() {
                if DataType::from_element_name(child.local_name()).is_some() {
                    if let Some(member) = self.process_variable(group_fqn, &fqn, child)? {
                        variable.add_member(member);
                    }
                }
            }
        }

        if variable.is_array() {
            self.arrays.insert(fqn);
        }
        Ok(Some(variable))
    }

    fn process_dim(
        &self,
        group_fqn: &str,
        variable: &mut Variable,
        node: XmlNode<'_>,
    ) -> Result<(), DmzError> {
        let name = node.attribute("name").filter(|name| !name.is_empty());
        let size = node.attribute("size").filter(|size| !size.is_empty());
        match (name, size) {
            (None, None) => Err(dmz_error!(
                "Either 'size' or 'name' must be used in a Dim element."
            )),
            (Some(_), Some(_)) => Err(dmz_error!(
                "Only one of 'size' and 'name' are allowed in a Dim element, but both were used."
            )),
            (None, Some(size)) => {
                let size = size.trim().parse::<u64>().map_err(|_| {
                    dmz_error!(
                        "The Dim size '{size}' of the variable '{}' is not an unsigned integer.",
                        variable.name()
                    )
                })?;
                tracing::debug!(size, "processing nameless Dim");
                variable.append_dimension(ArrayDimension::new(size));
                Ok(())
            }
            (Some(name), None) => {
                tracing::debug!(name, "processing Dim with named Dimension reference");
                let fqn = resolve_reference(group_fqn, name);
                let size = self.dimensions.get(&fqn).ok_or_else(|| {
                    dmz_error!(
                        "The dimension '{name}' was not found while parsing the variable '{}'.",
                        variable.name()
                    )
                })?;
                variable.append_dimension(ArrayDimension::new_named(fqn, *size));
                Ok(())
            }
        }
    }

    fn process_map(&self, variable: &mut Variable, node: XmlNode<'_>) -> Result<(), DmzError> {
        let name = required_attribute(node, "name")?;
        let source = if self.arrays.contains(name) {
            Some(name.to_string())
        } else {
            tracing::warn!(
                variable = variable.fqn(),
                map = name,
                "map source array not found, leaving the map unresolved"
            );
            None
        };
        variable.add_map(ArrayMap::new(name, source));
        Ok(())
    }
}
