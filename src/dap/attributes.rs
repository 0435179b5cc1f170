use crate::array::DataType;

/// The type of a DAP4 attribute.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum AttributeType {
    /// A container of nested attributes.
    Container,
    /// Arbitrary XML. Not materialized.
    OtherXml,
    /// Values of an atomic data type.
    Atomic(DataType),
}

impl AttributeType {
    /// Create an attribute type from the `type` of an `Attribute` element.
    ///
    /// Returns [`None`] if `name` is not an attribute type. Constructor and enumeration types cannot type attributes.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Container" => Some(Self::Container),
            "OtherXML" => Some(Self::OtherXml),
            _ => DataType::from_element_name(name)
                .filter(|data_type| !data_type.is_constructor() && *data_type != DataType::Enum)
                .map(Self::Atomic),
        }
    }
}

impl std::fmt::Display for AttributeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Container => f.write_str("Container"),
            Self::OtherXml => f.write_str("OtherXML"),
            Self::Atomic(data_type) => write!(f, "{data_type}"),
        }
    }
}

/// The value of a DAP4 attribute.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AttributeValue {
    /// Nested attributes.
    Container(Attributes),
    /// A list of values, as text.
    Values(Vec<String>),
}

/// A DAP4 attribute.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attribute {
    name: String,
    attribute_type: AttributeType,
    value: AttributeValue,
}

impl Attribute {
    /// Create a new attribute holding `values`.
    #[must_use]
    pub fn new(name: impl Into<String>, attribute_type: AttributeType, values: Vec<String>) -> Self {
        Self {
            name: name.into(),
            attribute_type,
            value: AttributeValue::Values(values),
        }
    }

    /// Create a new container attribute holding `attributes`.
    #[must_use]
    pub fn new_container(name: impl Into<String>, attributes: Attributes) -> Self {
        Self {
            name: name.into(),
            attribute_type: AttributeType::Container,
            value: AttributeValue::Container(attributes),
        }
    }

    /// Return the name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Return the type.
    #[must_use]
    pub fn attribute_type(&self) -> AttributeType {
        self.attribute_type
    }

    /// Return the value.
    #[must_use]
    pub fn value(&self) -> &AttributeValue {
        &self.value
    }

    /// Return the values, or [`None`] for a container.
    #[must_use]
    pub fn values(&self) -> Option<&[String]> {
        match &self.value {
            AttributeValue::Values(values) => Some(values),
            AttributeValue::Container(_) => None,
        }
    }

    /// Return the nested attributes, or [`None`] if this is not a container.
    #[must_use]
    pub fn container(&self) -> Option<&Attributes> {
        match &self.value {
            AttributeValue::Container(attributes) => Some(attributes),
            AttributeValue::Values(_) => None,
        }
    }
}

/// An ordered collection of DAP4 attributes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Attributes(Vec<Attribute>);

impl Attributes {
    /// Create an empty attribute collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an attribute.
    pub fn push(&mut self, attribute: Attribute) {
        self.0.push(attribute);
    }

    /// Return the first attribute named `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Attribute> {
        self.0.iter().find(|attribute| attribute.name == name)
    }

    /// Return the attribute at `path`, a `.` separated list of names descending through containers.
    #[must_use]
    pub fn get_path(&self, path: &str) -> Option<&Attribute> {
        let mut names = path.split('.');
        let mut attribute = self.get(names.next()?)?;
        for name in names {
            attribute = attribute.container()?.get(name)?;
        }
        Some(attribute)
    }

    /// Return an iterator over the attributes in document order.
    pub fn iter(&self) -> std::slice::Iter<'_, Attribute> {
        self.0.iter()
    }

    /// Return the number of attributes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if there are no attributes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'a> IntoIterator for &'a Attributes {
    type Item = &'a Attribute;
    type IntoIter = std::slice::Iter<'a, Attribute>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl IntoIterator for Attributes {
    type Item = Attribute;
    type IntoIter = std::vec::IntoIter<Attribute>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl Extend<Attribute> for Attributes {
    fn extend<T: IntoIterator<Item = Attribute>>(&mut self, iter: T) {
        self.0.extend(iter);
    }
}
