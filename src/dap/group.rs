use crate::{array::DataType, xml::NodeId};

use super::{Attributes, Variable};

/// A shared dimension defined by a `Dimension` element.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Dimension {
    name: String,
    fqn: String,
    size: u64,
}

impl Dimension {
    /// Create a new shared dimension.
    #[must_use]
    pub fn new(name: impl Into<String>, fqn: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            fqn: fqn.into(),
            size,
        }
    }

    /// Return the name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Return the fully qualified name.
    #[must_use]
    pub fn fqn(&self) -> &str {
        &self.fqn
    }

    /// Return the size.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.size
    }
}

/// A labelled value of an enumeration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnumConst {
    /// The label.
    pub name: String,
    /// The value.
    pub value: i64,
}

/// An enumeration defined by an `Enumeration` element.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Enumeration {
    name: String,
    fqn: String,
    base_type: DataType,
    constants: Vec<EnumConst>,
}

impl Enumeration {
    /// Create a new enumeration with integer base type `base_type`.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        fqn: impl Into<String>,
        base_type: DataType,
        constants: Vec<EnumConst>,
    ) -> Self {
        Self {
            name: name.into(),
            fqn: fqn.into(),
            base_type,
            constants,
        }
    }

    /// Return the name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Return the fully qualified name.
    #[must_use]
    pub fn fqn(&self) -> &str {
        &self.fqn
    }

    /// Return the base type.
    #[must_use]
    pub fn base_type(&self) -> DataType {
        self.base_type
    }

    /// Return the labelled values in document order.
    #[must_use]
    pub fn constants(&self) -> &[EnumConst] {
        &self.constants
    }
}

/// A DAP4 group: shared dimensions, enumerations, variables and child groups.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Group {
    name: String,
    fqn: String,
    dimensions: Vec<Dimension>,
    enumerations: Vec<Enumeration>,
    variables: Vec<Variable>,
    groups: Vec<Group>,
    attributes: Attributes,
    xml_node: Option<NodeId>,
    attributes_loaded: bool,
}

impl Group {
    /// Create the root group.
    #[must_use]
    pub fn new_root() -> Self {
        Self {
            name: "/".to_string(),
            fqn: "/".to_string(),
            ..Self::default()
        }
    }

    /// Create a child group named `name` of the group with fully qualified name `parent_fqn`, built from the element `xml_node`.
    #[must_use]
    pub fn new(name: impl Into<String>, parent_fqn: &str, xml_node: NodeId) -> Self {
        let name = name.into();
        Self {
            fqn: child_fqn(parent_fqn, &name),
            name,
            xml_node: Some(xml_node),
            ..Self::default()
        }
    }

    /// Return the name. The root group is named `/`.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Return the fully qualified name. The root group is `/`.
    #[must_use]
    pub fn fqn(&self) -> &str {
        &self.fqn
    }

    /// Return the element the group was built from.
    #[must_use]
    pub fn xml_node(&self) -> Option<NodeId> {
        self.xml_node
    }

    pub(crate) fn set_xml_node(&mut self, xml_node: NodeId) {
        self.xml_node = Some(xml_node);
    }

    /// Returns true if the attributes of the group have been loaded.
    #[must_use]
    pub fn attributes_loaded(&self) -> bool {
        self.attributes_loaded
    }

    pub(crate) fn set_attributes_loaded(&mut self) {
        self.attributes_loaded = true;
    }

    /// Return the shared dimensions defined in this group.
    #[must_use]
    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    /// Add a shared dimension.
    pub fn add_dimension(&mut self, dimension: Dimension) {
        self.dimensions.push(dimension);
    }

    /// Return the enumerations defined in this group.
    #[must_use]
    pub fn enumerations(&self) -> &[Enumeration] {
        &self.enumerations
    }

    /// Add an enumeration.
    pub fn add_enumeration(&mut self, enumeration: Enumeration) {
        self.enumerations.push(enumeration);
    }

    /// Return the variables of this group.
    #[must_use]
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    /// Return the variables of this group.
    #[must_use]
    pub fn variables_mut(&mut self) -> &mut [Variable] {
        &mut self.variables
    }

    /// Add a variable.
    pub fn add_variable(&mut self, variable: Variable) {
        self.variables.push(variable);
    }

    /// Return the child groups.
    #[must_use]
    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    /// Return the child groups.
    #[must_use]
    pub fn groups_mut(&mut self) -> &mut [Group] {
        &mut self.groups
    }

    /// Add a child group.
    pub fn add_group(&mut self, group: Group) {
        self.groups.push(group);
    }

    /// Return the attributes.
    #[must_use]
    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// Return the attributes.
    #[must_use]
    pub fn attributes_mut(&mut self) -> &mut Attributes {
        &mut self.attributes
    }

    fn contains_path(&self, fqn: &str) -> bool {
        self.fqn == "/" || fqn.strip_prefix(self.fqn.as_str()).is_some_and(|rest| rest.starts_with('/'))
    }

    /// Return the variable, or structure member, with fully qualified name `fqn` in this group or a descendant group.
    #[must_use]
    pub fn find_variable(&self, fqn: &str) -> Option<&Variable> {
        if !self.contains_path(fqn) {
            return None;
        }
        self.variables
            .iter()
            .find_map(|variable| variable.find(fqn))
            .or_else(|| self.groups.iter().find_map(|group| group.find_variable(fqn)))
    }

    /// Return the variable, or structure member, with fully qualified name `fqn` in this group or a descendant group.
    #[must_use]
    pub fn find_variable_mut(&mut self, fqn: &str) -> Option<&mut Variable> {
        if !self.contains_path(fqn) {
            return None;
        }
        if let Some(index) = self
            .variables
            .iter()
            .position(|variable| variable.find(fqn).is_some())
        {
            return self.variables[index].find_mut(fqn);
        }
        self.groups
            .iter_mut()
            .find_map(|group| group.find_variable_mut(fqn))
    }

    /// Return the group with fully qualified name `fqn`, which may be this group.
    #[must_use]
    pub fn find_group(&self, fqn: &str) -> Option<&Group> {
        if self.fqn == fqn {
            return Some(self);
        }
        if !self.contains_path(fqn) {
            return None;
        }
        self.groups.iter().find_map(|group| group.find_group(fqn))
    }

    /// Return the group with fully qualified name `fqn`, which may be this group.
    #[must_use]
    pub fn find_group_mut(&mut self, fqn: &str) -> Option<&mut Group> {
        if self.fqn == fqn {
            return Some(self);
        }
        if !self.contains_path(fqn) {
            return None;
        }
        self.groups
            .iter_mut()
            .find_map(|group| group.find_group_mut(fqn))
    }

    /// Return the shared dimension with fully qualified name `fqn` in this group or a descendant group.
    #[must_use]
    pub fn find_dimension(&self, fqn: &str) -> Option<&Dimension> {
        let (group, _) = fqn.rsplit_once('/')?;
        let group = if group.is_empty() { "/" } else { group };
        self.find_group(group)?
            .dimensions
            .iter()
            .find(|dimension| dimension.fqn == fqn)
    }

    /// Return the enumeration with fully qualified name `fqn` in this group or a descendant group.
    #[must_use]
    pub fn find_enumeration(&self, fqn: &str) -> Option<&Enumeration> {
        let (group, _) = fqn.rsplit_once('/')?;
        let group = if group.is_empty() { "/" } else { group };
        self.find_group(group)?
            .enumerations
            .iter()
            .find(|enumeration| enumeration.fqn == fqn)
    }
}

/// Return the fully qualified name of `name` within the group or variable `parent_fqn`.
#[must_use]
pub fn child_fqn(parent_fqn: &str, name: &str) -> String {
    if parent_fqn == "/" {
        format!("/{name}")
    } else {
        format!("{parent_fqn}/{name}")
    }
}

#[cfg(test)]
mod tests {
    use crate::xml::XmlDocument;

    use super::*;

    #[test]
    fn group_find() {
        let document = XmlDocument::parse_str("<Group/>").unwrap();
        let node = document.root().id();

        let mut root = Group::new_root();
        root.add_dimension(Dimension::new("d", "/d", 3));
        root.add_variable(Variable::new("x", "/x", DataType::Int32, node));
        let mut g = Group::new("g", root.fqn(), node);
        assert_eq!(g.fqn(), "/g");
        g.add_dimension(Dimension::new("d", "/g/d", 5));
        g.add_enumeration(Enumeration::new(
            "e",
            "/g/e",
            DataType::UInt8,
            vec![EnumConst {
                name: "a".to_string(),
                value: 1,
            }],
        ));
        let mut s = Variable::new("s", "/g/s", DataType::Structure, node);
        s.add_member(Variable::new("m", "/g/s/m", DataType::Int16, node));
        g.add_variable(s);
        let mut h = Group::new("h", g.fqn(), node);
        h.add_variable(Variable::new("y", "/g/h/y", DataType::Byte, node));
        g.add_group(h);
        root.add_group(g);

        assert_eq!(root.find_variable("/x").unwrap().name(), "x");
        assert_eq!(root.find_variable("/g/s/m").unwrap().name(), "m");
        assert_eq!(root.find_variable("/g/h/y").unwrap().name(), "y");
        assert!(root.find_variable("/g/x").is_none());
        assert!(root.find_variable_mut("/g/h/y").is_some());
        assert!(root.find_variable_mut("/g/s/m").is_some());
        assert_eq!(root.find_group("/g/h").unwrap().name(), "h");
        assert_eq!(root.find_dimension("/d").unwrap().size(), 3);
        assert_eq!(root.find_dimension("/g/d").unwrap().size(), 5);
        assert!(root.find_dimension("/g/h/d").is_none());
        assert_eq!(
            root.find_enumeration("/g/e").unwrap().base_type(),
            DataType::UInt8
        );
        assert_eq!(child_fqn("/", "a"), "/a");
        assert_eq!(child_fqn("/g", "a"), "/g/a");
    }
}
