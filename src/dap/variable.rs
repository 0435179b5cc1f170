use crate::{
    array::{ArrayShape, DataType, DimensionConstraint},
    error::{dmz_error, DmzError},
    xml::NodeId,
};

use super::{Attributes, DmrppCommon};

/// A dimension of an array variable.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArrayDimension {
    name: Option<String>,
    size: u64,
    constraint: Option<DimensionConstraint>,
}

impl ArrayDimension {
    /// Create an anonymous dimension of `size` elements.
    #[must_use]
    pub fn new(size: u64) -> Self {
        Self {
            name: None,
            size,
            constraint: None,
        }
    }

    /// Create a dimension referencing the shared dimension `fqn` of `size` elements.
    #[must_use]
    pub fn new_named(fqn: impl Into<String>, size: u64) -> Self {
        Self {
            name: Some(fqn.into()),
            size,
            constraint: None,
        }
    }

    /// Return the fully qualified name of the shared dimension, or [`None`] for an anonymous dimension.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Return the size of the dimension.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Return the constraint on the dimension, if any.
    #[must_use]
    pub fn constraint(&self) -> Option<&DimensionConstraint> {
        self.constraint.as_ref()
    }

    /// Return the number of elements selected by the constraint, or the size if unconstrained.
    #[must_use]
    pub fn constrained_size(&self) -> u64 {
        self.constraint
            .as_ref()
            .map_or(self.size, DimensionConstraint::num_elements)
    }
}

/// A map (coordinate) of an array variable.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArrayMap {
    name: String,
    source: Option<String>,
}

impl ArrayMap {
    /// Create a map named `name`, resolved to the array `source` if it was found.
    #[must_use]
    pub fn new(name: impl Into<String>, source: Option<String>) -> Self {
        Self {
            name: name.into(),
            source,
        }
    }

    /// Return the fully qualified name of the map as written in the document.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Return the fully qualified name of the source array, or [`None`] if it was not found.
    #[must_use]
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }
}

/// The padding of a fixed length string.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum StringPad {
    /// Padded with null bytes.
    Null,
    /// Padded with spaces.
    Space,
}

impl std::str::FromStr for StringPad {
    type Err = DmzError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "null" => Ok(Self::Null),
            "space" => Ok(Self::Space),
            _ => Err(dmz_error!(
                "Invalid string pad '{s}', expected 'null' or 'space'."
            )),
        }
    }
}

/// The encoding of a string array.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum StringArray {
    /// Every string occupies `length` bytes, padded with `pad`.
    FixedLength {
        /// The length of each string in bytes.
        length: u64,
        /// The padding.
        pad: StringPad,
    },
    /// Strings have differing lengths.
    VariableLength,
}

/// The enumeration typing an `Enum` variable.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnumerationRef {
    fqn: String,
    base_type: DataType,
}

impl EnumerationRef {
    /// Create a reference to the enumeration `fqn` with integer base type `base_type`.
    #[must_use]
    pub fn new(fqn: impl Into<String>, base_type: DataType) -> Self {
        Self {
            fqn: fqn.into(),
            base_type,
        }
    }

    /// Return the fully qualified name of the enumeration.
    #[must_use]
    pub fn fqn(&self) -> &str {
        &self.fqn
    }

    /// Return the base type of the enumeration.
    #[must_use]
    pub fn base_type(&self) -> DataType {
        self.base_type
    }
}

/// Values of a variable decoded from inline storage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VariableValues {
    /// Native bytes of numeric or enumeration values.
    Bytes(Vec<u8>),
    /// String values.
    Strings(Vec<String>),
    /// Structure records, each holding the values of every member in declaration order.
    Structures(Vec<Vec<VariableValues>>),
}

/// A DAP4 variable: a scalar, or an array if it has dimensions.
///
/// Structures and sequences hold member variables.
#[derive(Clone, Debug, PartialEq)]
pub struct Variable {
    name: String,
    fqn: String,
    data_type: DataType,
    enumeration: Option<EnumerationRef>,
    dimensions: Vec<ArrayDimension>,
    maps: Vec<ArrayMap>,
    string_array: Option<StringArray>,
    members: Vec<Variable>,
    attributes: Attributes,
    dmrpp: DmrppCommon,
    values: Option<VariableValues>,
}

impl Variable {
    /// Create a new scalar variable built from the element `xml_node`.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        fqn: impl Into<String>,
        data_type: DataType,
        xml_node: NodeId,
    ) -> Self {
        Self {
            name: name.into(),
            fqn: fqn.into(),
            data_type,
            enumeration: None,
            dimensions: Vec::new(),
            maps: Vec::new(),
            string_array: None,
            members: Vec::new(),
            attributes: Attributes::new(),
            dmrpp: DmrppCommon::new(xml_node),
            values: None,
        }
    }

    /// Return the name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Return the fully qualified name, e.g. `/group/structure/member`.
    #[must_use]
    pub fn fqn(&self) -> &str {
        &self.fqn
    }

    /// Return the data type. For an array, this is the element type.
    #[must_use]
    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Return the type of each stored element: the base type of an enumeration, otherwise the data type.
    #[must_use]
    pub fn element_type(&self) -> DataType {
        self.enumeration
            .as_ref()
            .map_or(self.data_type, EnumerationRef::base_type)
    }

    /// Return the size in bytes of each stored element, or [`None`] if elements have no fixed size.
    ///
    /// The size of a fixed length string is its length.
    #[must_use]
    pub fn element_size(&self) -> Option<u64> {
        match self.string_array {
            Some(StringArray::FixedLength { length, .. }) => Some(length),
            _ => self.element_type().fixed_size().map(|size| size as u64),
        }
    }

    /// Returns true if the variable has dimensions.
    #[must_use]
    pub fn is_array(&self) -> bool {
        !self.dimensions.is_empty()
    }

    /// Return the enumeration typing an `Enum` variable.
    #[must_use]
    pub fn enumeration(&self) -> Option<&EnumerationRef> {
        self.enumeration.as_ref()
    }

    /// Set the enumeration typing an `Enum` variable.
    pub fn set_enumeration(&mut self, enumeration: EnumerationRef) {
        self.enumeration = Some(enumeration);
    }

    /// Return the dimensions.
    #[must_use]
    pub fn dimensions(&self) -> &[ArrayDimension] {
        &self.dimensions
    }

    /// Append a dimension, making the variable an array.
    pub fn append_dimension(&mut self, dimension: ArrayDimension) {
        self.dimensions.push(dimension);
    }

    /// Return the shape of the whole array. Empty for a scalar.
    #[must_use]
    pub fn shape(&self) -> ArrayShape {
        self.dimensions.iter().map(ArrayDimension::size).collect()
    }

    /// Return the shape of the constrained array.
    #[must_use]
    pub fn constrained_shape(&self) -> ArrayShape {
        self.dimensions
            .iter()
            .map(ArrayDimension::constrained_size)
            .collect()
    }

    /// Return the number of elements of the whole array. One for a scalar.
    ///
    /// Returns [`None`] if the number of elements exceeds [`u64::MAX`].
    #[must_use]
    pub fn num_elements(&self) -> Option<u64> {
        self.shape().iter().try_fold(1u64, |acc, &size| acc.checked_mul(size))
    }

    /// Return the number of elements selected by the constraint.
    ///
    /// Returns [`None`] if the number of elements exceeds [`u64::MAX`].
    #[must_use]
    pub fn constrained_num_elements(&self) -> Option<u64> {
        self.constrained_shape()
            .iter()
            .try_fold(1u64, |acc, &size| acc.checked_mul(size))
    }

    /// Returns true if any dimension constraint selects less than the whole dimension.
    #[must_use]
    pub fn is_constrained(&self) -> bool {
        self.dimensions.iter().any(|dimension| {
            dimension
                .constraint
                .is_some_and(|constraint| !constraint.is_full(dimension.size))
        })
    }

    /// Return the constraint of every dimension, selecting the whole dimension where unconstrained.
    ///
    /// Returns [`None`] if a dimension is empty.
    #[must_use]
    pub fn constraints(&self) -> Option<Vec<DimensionConstraint>> {
        self.dimensions
            .iter()
            .map(|dimension| {
                dimension
                    .constraint
                    .or_else(|| DimensionConstraint::full(dimension.size))
            })
            .collect()
    }

    /// Constrain dimension `dimension` to the elements `start`, `start + stride`, ... up to and including `stop`.
    ///
    /// # Errors
    /// Returns a [`DmzError`] if the dimension does not exist or the constraint does not fit it.
    pub fn set_constraint(
        &mut self,
        dimension: usize,
        start: u64,
        stride: u64,
        stop: u64,
    ) -> Result<(), DmzError> {
        let name = &self.name;
        let array_dimension = self.dimensions.get_mut(dimension).ok_or_else(|| {
            dmz_error!("The variable '{name}' has no dimension {dimension} to constrain.")
        })?;
        let constraint = DimensionConstraint::new(start, stride, stop, array_dimension.size)
            .map_err(|err| dmz_error!("Could not constrain the variable '{name}': {err}"))?;
        array_dimension.constraint = Some(constraint);
        Ok(())
    }

    /// Return the maps.
    #[must_use]
    pub fn maps(&self) -> &[ArrayMap] {
        &self.maps
    }

    /// Add a map.
    pub fn add_map(&mut self, map: ArrayMap) {
        self.maps.push(map);
    }

    /// Return the string array encoding, if the variable is a string array with one.
    #[must_use]
    pub fn string_array(&self) -> Option<StringArray> {
        self.string_array
    }

    /// Set the string array encoding.
    pub fn set_string_array(&mut self, string_array: StringArray) {
        self.string_array = Some(string_array);
    }

    /// Return the members of a structure or sequence.
    #[must_use]
    pub fn members(&self) -> &[Variable] {
        &self.members
    }

    /// Return the members of a structure or sequence.
    #[must_use]
    pub fn members_mut(&mut self) -> &mut [Variable] {
        &mut self.members
    }

    /// Add a member to a structure or sequence.
    pub fn add_member(&mut self, member: Variable) {
        self.members.push(member);
    }

    /// Return the variable or nested member with fully qualified name `fqn`.
    #[must_use]
    pub fn find(&self, fqn: &str) -> Option<&Variable> {
        if self.fqn == fqn {
            return Some(self);
        }
        let rest = fqn.strip_prefix(self.fqn.as_str())?;
        if !rest.starts_with('/') {
            return None;
        }
        self.members.iter().find_map(|member| member.find(fqn))
    }

    /// Return the variable or nested member with fully qualified name `fqn`.
    #[must_use]
    pub fn find_mut(&mut self, fqn: &str) -> Option<&mut Variable> {
        if self.fqn == fqn {
            return Some(self);
        }
        let rest = fqn.strip_prefix(self.fqn.as_str())?;
        if !rest.starts_with('/') {
            return None;
        }
        self.members
            .iter_mut()
            .find_map(|member| member.find_mut(fqn))
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

    /// Return the DMR++ storage metadata.
    #[must_use]
    pub fn dmrpp(&self) -> &DmrppCommon {
        &self.dmrpp
    }

    /// Return the DMR++ storage metadata.
    #[must_use]
    pub fn dmrpp_mut(&mut self) -> &mut DmrppCommon {
        &mut self.dmrpp
    }

    /// Return the values decoded from inline storage, if any.
    #[must_use]
    pub fn values(&self) -> Option<&VariableValues> {
        self.values.as_ref()
    }

    /// Set the values.
    pub fn set_values(&mut self, values: VariableValues) {
        self.values = Some(values);
    }
}

#[cfg(test)]
mod tests {
    use crate::xml::XmlDocument;

    use super::*;

    fn node() -> NodeId {
        XmlDocument::parse_str("<Float32/>").unwrap().root().id()
    }

    fn array() -> Variable {
        let mut variable = Variable::new("a", "/a", DataType::Float32, node());
        variable.append_dimension(ArrayDimension::new(4));
        variable.append_dimension(ArrayDimension::new_named("/d", 6));
        variable
    }

    #[test]
    fn variable_shape() {
        let variable = array();
        assert!(variable.is_array());
        assert_eq!(variable.shape(), [4, 6]);
        assert_eq!(variable.num_elements(), Some(24));
        assert_eq!(variable.element_size(), Some(4));
        assert_eq!(variable.dimensions()[1].name(), Some("/d"));
        assert!(!variable.is_constrained());

        let scalar = Variable::new("s", "/s", DataType::Int16, node());
        assert!(!scalar.is_array());
        assert_eq!(scalar.num_elements(), Some(1));

        let mut huge = Variable::new("h", "/h", DataType::Int32, node());
        huge.append_dimension(ArrayDimension::new(1 << 32));
        huge.append_dimension(ArrayDimension::new(1 << 32));
        assert_eq!(huge.num_elements(), None);
        assert_eq!(huge.constrained_num_elements(), None);
        assert_eq!(scalar.constraints(), Some(vec![]));
    }

    #[test]
    fn variable_set_constraint() {
        let mut variable = array();
        variable.set_constraint(1, 1, 2, 5).unwrap();
        assert!(variable.is_constrained());
        assert_eq!(variable.constrained_shape(), [4, 3]);
        assert_eq!(variable.constrained_num_elements(), Some(12));
        assert!(variable.set_constraint(2, 0, 1, 0).is_err());
        assert!(variable.set_constraint(0, 0, 1, 4).is_err());

        variable.set_constraint(1, 0, 1, 5).unwrap();
        assert!(!variable.is_constrained());
    }

    #[test]
    fn variable_element_type() {
        let mut variable = Variable::new("e", "/e", DataType::Enum, node());
        assert_eq!(variable.element_size(), None);
        variable.set_enumeration(EnumerationRef::new("/colors", DataType::UInt8));
        assert_eq!(variable.element_type(), DataType::UInt8);
        assert_eq!(variable.element_size(), Some(1));

        let mut strings = Variable::new("s", "/s", DataType::String, node());
        strings.set_string_array(StringArray::FixedLength {
            length: 8,
            pad: StringPad::Space,
        });
        assert_eq!(strings.element_size(), Some(8));
        assert_eq!("null".parse::<StringPad>().unwrap(), StringPad::Null);
        assert!("zero".parse::<StringPad>().is_err());
    }

    #[test]
    fn variable_find_member() {
        let mut structure = Variable::new("s", "/s", DataType::Structure, node());
        structure.add_member(Variable::new("x", "/s/x", DataType::Int32, node()));
        assert_eq!(structure.find("/s/x").unwrap().name(), "x");
        assert!(structure.find("/s/y").is_none());
        assert!(structure.find("/sx").is_none());
        structure.find_mut("/s/x").unwrap().set_values(VariableValues::Bytes(vec![0; 4]));
        assert!(structure.members()[0].values().is_some());
    }
}
