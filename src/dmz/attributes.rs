//! Lazy loading of DAP attributes.

use crate::{
    dap::{Attribute, AttributeType, Attributes, Dmr, Group, Variable},
    error::{dmz_error, DmzError},
    xml::XmlNode,
};

use super::{required_attribute, DmzDocument};

impl DmzDocument {
    /// Load the attributes of `variable`, and of its members if it is a structure or sequence.
    ///
    /// Does nothing if the attributes are already loaded.
    ///
    /// # Errors
    /// Returns a [`DmzError`] if the element of the variable cannot be found, an attribute is malformed, or a structure or sequence contains a group.
    pub fn load_attributes(&self, variable: &mut Variable) -> Result<(), DmzError> {
        if variable.dmrpp().attributes_loaded() {
            return Ok(());
        }
        let node = self.variable_node(variable)?;
        tracing::debug!(variable = variable.fqn(), "loading attributes");

        if variable.data_type().is_constructor() && node.child("Group").is_some() {
            return Err(dmz_error!(
                "Found a Group inside the {} '{}', which the DAP4 data model does not allow.",
                variable.data_type(),
                variable.fqn()
            ));
        }
        let mut attributes = Attributes::new();
        process_attributes(node, &mut attributes)?;
        for member in variable.members_mut() {
            self.load_attributes(member)?;
        }

        variable.attributes_mut().extend(attributes);
        variable.dmrpp_mut().set_attributes_loaded();
        Ok(())
    }

    /// Load the attributes of `group`, then of its variables and child groups.
    ///
    /// The attributes of the root group are those of the `Dataset` element.
    /// Does nothing for a group whose attributes are already loaded, but still descends into it.
    ///
    /// # Errors
    /// Returns a [`DmzError`] if the element of a group or variable cannot be found or an attribute is malformed.
    pub fn load_group_attributes(&self, group: &mut Group) -> Result<(), DmzError> {
        if !group.attributes_loaded() {
            let node = group
                .xml_node()
                .and_then(|id| self.xml().node(id))
                .ok_or_else(|| {
                    dmz_error!(
                        "Could not find location of group '{}' in the DMR++ XML document.",
                        group.fqn()
                    )
                })?;
            let mut attributes = Attributes::new();
            process_attributes(node, &mut attributes)?;
            group.attributes_mut().extend(attributes);
            group.set_attributes_loaded();
        }
        for variable in group.variables_mut() {
            self.load_attributes(variable)?;
        }
        for child in group.groups_mut() {
            self.load_group_attributes(child)?;
        }
        Ok(())
    }

    /// Load every attribute of `dmr`.
    ///
    /// # Errors
    /// Returns a [`DmzError`] if the element of a group or variable cannot be found or an attribute is malformed.
    pub fn load_all_attributes(&self, dmr: &mut Dmr) -> Result<(), DmzError> {
        self.load_group_attributes(dmr.root_mut())
    }
}

/// Append the `Attribute` children of `node` to `attributes`.
fn process_attributes(node: XmlNode<'_>, attributes: &mut Attributes) -> Result<(), DmzError> {
    for child in node.children_named("Attribute") {
        if let Some(attribute) = process_attribute(child)? {
            attributes.push(attribute);
        }
    }
    Ok(())
}

fn process_attribute(node: XmlNode<'_>) -> Result<Option<Attribute>, DmzError> {
    let name = required_attribute(node, "name")?;
    let type_name = required_attribute(node, "type")?;
    let attribute_type = AttributeType::from_name(type_name)
        .ok_or_else(|| dmz_error!("The attribute '{name}' has the unknown type '{type_name}'."))?;

    match attribute_type {
        AttributeType::Container => {
            let mut container = Attributes::new();
            process_attributes(node, &mut container)?;
            Ok(Some(Attribute::new_container(name, container)))
        }
        AttributeType::OtherXml => {
            tracing::debug!(attribute = name, "skipping OtherXML attribute");
            Ok(None)
        }
        AttributeType::Atomic(_) => {
            let values = node
                .children_named("Value")
                .map(|value| value.text().to_string())
                .collect();
            Ok(Some(Attribute::new(name, attribute_type, values)))
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        array::DataType,
        dap::{AttributeValue, Dmr},
    };

    use super::*;

    const DATASET: &str = r#"<Dataset name="a.h5" dmrpp:href="a.h5">
    <Int32 name="x">
        <Dim size="2"/>
        <Attribute name="units" type="String"><Value>m s-1</Value></Attribute>
        <Attribute name="valid_range" type="Int32"><Value>0</Value><Value>100</Value></Attribute>
        <Attribute name="history" type="Container">
            <Attribute name="created" type="String"><Value> 2020 </Value></Attribute>
            <Attribute name="empty" type="Container"/>
        </Attribute>
        <Attribute name="xml" type="OtherXML"><Value>ignored</Value></Attribute>
    </Int32>
    <Structure name="s">
        <Float64 name="m"><Attribute name="long_name" type="String"><Value>member</Value></Attribute></Float64>
        <Attribute name="kind" type="String"><Value>record</Value></Attribute>
    </Structure>
    <Attribute name="title" type="String"><Value>Example</Value></Attribute>
    <Group name="g">
        <Attribute name="level" type="UInt8"><Value>1</Value></Attribute>
        <Byte name="b"><Attribute name="flag" type="Byte"><Value>7</Value></Attribute></Byte>
    </Group>
</Dataset>"#;

    fn build(xml: &str) -> (DmzDocument, Dmr) {
        let document = DmzDocument::new_from_str(xml).unwrap();
        let mut dmr = Dmr::default();
        document.build_thin_dmr(&mut dmr).unwrap();
        (document, dmr)
    }

    #[test]
    fn load_attributes_variable() {
        let (document, mut dmr) = build(DATASET);
        let x = dmr.root_mut().find_variable_mut("/x").unwrap();
        document.load_attributes(x).unwrap();
        assert!(x.dmrpp().attributes_loaded());

        let attributes = x.attributes();
        assert_eq!(attributes.len(), 3);
        assert_eq!(attributes.get("units").unwrap().values().unwrap(), ["m s-1"]);
        let valid_range = attributes.get("valid_range").unwrap();
        assert_eq!(valid_range.attribute_type(), AttributeType::Atomic(DataType::Int32));
        assert_eq!(valid_range.values().unwrap(), ["0", "100"]);
        assert_eq!(
            attributes.get_path("history.created").unwrap().values().unwrap(),
            [" 2020 "]
        );
        assert_eq!(
            attributes.get_path("history.empty").unwrap().value(),
            &AttributeValue::Container(Attributes::new())
        );
        assert!(attributes.get("xml").is_none());
    }

    #[test]
    fn load_attributes_idempotent() {
        let (document, mut dmr) = build(DATASET);
        let x = dmr.root_mut().find_variable_mut("/x").unwrap();
        document.load_attributes(x).unwrap();
        let loaded = x.clone();
        document.load_attributes(x).unwrap();
        assert_eq!(*x, loaded);
    }

    #[test]
    fn load_attributes_structure_members() {
        let (document, mut dmr) = build(DATASET);
        let s = dmr.root_mut().find_variable_mut("/s").unwrap();
        document.load_attributes(s).unwrap();
        assert_eq!(s.attributes().get("kind").unwrap().values().unwrap(), ["record"]);
        let m = &s.members()[0];
        assert!(m.dmrpp().attributes_loaded());
        assert_eq!(m.attributes().get("long_name").unwrap().values().unwrap(), ["member"]);
    }

    #[test]
    fn load_all_attributes() {
        let (document, mut dmr) = build(DATASET);
        document.load_all_attributes(&mut dmr).unwrap();
        let root = dmr.root();
        assert!(root.attributes_loaded());
        assert_eq!(root.attributes().get("title").unwrap().values().unwrap(), ["Example"]);
        let g = root.find_group("/g").unwrap();
        assert_eq!(g.attributes().get("level").unwrap().values().unwrap(), ["1"]);
        let b = root.find_variable("/g/b").unwrap();
        assert_eq!(b.attributes().get("flag").unwrap().values().unwrap(), ["7"]);
    }

    #[test]
    fn load_attributes_group_in_structure() {
        let (document, mut dmr) = build(
            r#"<Dataset name="a"><Structure name="s"><Int32 name="m"/><Group name="g"/></Structure></Dataset>"#,
        );
        let s = dmr.root_mut().find_variable_mut("/s").unwrap();
        let err = document.load_attributes(s).unwrap_err();
        assert!(err.message().contains("Found a Group inside the Structure '/s'"));
        assert!(!s.dmrpp().attributes_loaded());
    }

    #[test]
    fn load_attributes_failure_is_retryable() {
        let (document, mut dmr) = build(
            r#"<Dataset name="a">
    <Structure name="s">
        <Attribute name="kind" type="String"><Value>record</Value></Attribute>
        <Int32 name="m"/>
        <Group name="g"/>
    </Structure>
    <Structure name="t">
        <Attribute name="kind" type="String"><Value>record</Value></Attribute>
        <Int32 name="m"><Attribute name="bad" type="Widget"/></Int32>
    </Structure>
</Dataset>"#,
        );
        for fqn in ["/s", "/t"] {
            let variable = dmr.root_mut().find_variable_mut(fqn).unwrap();
            assert!(document.load_attributes(variable).is_err());
            assert!(document.load_attributes(variable).is_err());
            assert!(variable.attributes().is_empty(), "{fqn}");
            assert!(!variable.dmrpp().attributes_loaded());
        }
    }

    #[test]
    fn load_attributes_errors() {
        let (document, mut dmr) = build(
            r#"<Dataset name="a"><Int32 name="i"><Attribute type="String"/></Int32><Int32 name="j"><Attribute name="a" type="Widget"/></Int32></Dataset>"#,
        );
        let i = dmr.root_mut().find_variable_mut("/i").unwrap();
        assert!(document.load_attributes(i).is_err());
        let j = dmr.root_mut().find_variable_mut("/j").unwrap();
        assert!(document
            .load_attributes(j)
            .unwrap_err()
            .message()
            .contains("unknown type 'Widget'"));

        // A variable that does not belong to the document.
        let other = DmzDocument::new_from_str(r#"<Dataset name="b"><Int32 name="k"/></Dataset>"#).unwrap();
        let i = dmr.root_mut().find_variable_mut("/i").unwrap();
        assert!(other.load_attributes(i).is_err());
    }
}
