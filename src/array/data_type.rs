//! DAP4 data types.
//!
//! See <https://docs.opendap.org/index.php/DAP4:_Specification_Volume_1#Data_Types>.

use thiserror::Error;

use super::FillValue;

/// A DAP4 data type.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[rustfmt::skip]
pub enum DataType {
    /// `Char` 8-bit character.
    Char,
    /// `Byte` Unsigned integer in `[0, 2^8-1]`.
    Byte,
    /// `Int8` Integer in `[-2^7, 2^7-1]`.
    Int8,
    /// `UInt8` Integer in `[0, 2^8-1]`.
    UInt8,
    /// `Int16` Integer in `[-2^15, 2^15-1]`.
    Int16,
    /// `UInt16` Integer in `[0, 2^16-1]`.
    UInt16,
    /// `Int32` Integer in `[-2^31, 2^31-1]`.
    Int32,
    /// `UInt32` Integer in `[0, 2^32-1]`.
    UInt32,
    /// `Int64` Integer in `[-2^63, 2^63-1]`.
    Int64,
    /// `UInt64` Integer in `[0, 2^64-1]`.
    UInt64,
    /// `Float32` IEEE 754 single-precision floating point.
    Float32,
    /// `Float64` IEEE 754 double-precision floating point.
    Float64,
    /// `String` Variable length UTF-8 string.
    String,
    /// `URL` A string holding a URL.
    Url,
    /// `Opaque` Uninterpreted bytes.
    Opaque,
    /// `Enum` An integer with labelled values, typed by its enumeration.
    Enum,
    /// `Structure` A record of member variables.
    Structure,
    /// `Sequence` A sequence of records of member variables.
    Sequence,
}

/// An unsupported data type error.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("unsupported data type {0}")]
pub struct UnsupportedDataTypeError(String);

/// A fill value incompatibility error.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("incompatible fill value '{1}' for data type {0}")]
pub struct IncompatibleFillValueError(DataType, String);

impl IncompatibleFillValueError {
    /// Create a new incompatible fill value error.
    #[must_use]
    pub fn new(data_type: DataType, fill_value: impl Into<String>) -> Self {
        Self(data_type, fill_value.into())
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for DataType {
    type Err = UnsupportedDataTypeError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Self::from_element_name(name).ok_or_else(|| UnsupportedDataTypeError(name.to_string()))
    }
}

impl DataType {
    /// Returns the DAP4 name of the data type, which is also the name of the element declaring a variable of this type.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Char => "Char",
            Self::Byte => "Byte",
            Self::Int8 => "Int8",
            Self::UInt8 => "UInt8",
            Self::Int16 => "Int16",
            Self::UInt16 => "UInt16",
            Self::Int32 => "Int32",
            Self::UInt32 => "UInt32",
            Self::Int64 => "Int64",
            Self::UInt64 => "UInt64",
            Self::Float32 => "Float32",
            Self::Float64 => "Float64",
            Self::String => "String",
            Self::Url => "URL",
            Self::Opaque => "Opaque",
            Self::Enum => "Enum",
            Self::Structure => "Structure",
            Self::Sequence => "Sequence",
        }
    }

    /// Returns the data type declared by a variable element named `name`, or [`None`] if `name` does not declare a variable.
    #[must_use]
    pub fn from_element_name(name: &str) -> Option<Self> {
        Some(match name {
            "Char" => Self::Char,
            "Byte" => Self::Byte,
            "Int8" => Self::Int8,
            "UInt8" => Self::UInt8,
            "Int16" => Self::Int16,
            "UInt16" => Self::UInt16,
            "Int32" => Self::Int32,
            "UInt32" => Self::UInt32,
            "Int64" => Self::Int64,
            "UInt64" => Self::UInt64,
            "Float32" => Self::Float32,
            "Float64" => Self::Float64,
            "String" => Self::String,
            "URL" => Self::Url,
            "Opaque" => Self::Opaque,
            "Enum" => Self::Enum,
            "Structure" => Self::Structure,
            "Sequence" => Self::Sequence,
            _ => return None,
        })
    }

    /// Returns the size in bytes of a fixed-size data type, otherwise returns [`None`].
    ///
    /// The size of an [`Enum`](DataType::Enum) is the size of its base type.
    #[must_use]
    pub const fn fixed_size(&self) -> Option<usize> {
        match self {
            Self::Char | Self::Byte | Self::Int8 | Self::UInt8 => Some(1),
            Self::Int16 | Self::UInt16 => Some(2),
            Self::Int32 | Self::UInt32 | Self::Float32 => Some(4),
            Self::Int64 | Self::UInt64 | Self::Float64 => Some(8),
            Self::String
            | Self::Url
            | Self::Opaque
            | Self::Enum
            | Self::Structure
            | Self::Sequence => None,
        }
    }

    /// Returns true if the data type is an integer type.
    #[must_use]
    pub const fn is_integer(&self) -> bool {
        matches!(
            self,
            Self::Char
                | Self::Byte
                | Self::Int8
                | Self::UInt8
                | Self::Int16
                | Self::UInt16
                | Self::Int32
                | Self::UInt32
                | Self::Int64
                | Self::UInt64
        )
    }

    /// Returns true if the data type is a floating point type.
    #[must_use]
    pub const fn is_float(&self) -> bool {
        matches!(self, Self::Float32 | Self::Float64)
    }

    /// Returns true if the data type is an integer or floating point type.
    #[must_use]
    pub const fn is_numeric(&self) -> bool {
        self.is_integer() || self.is_float()
    }

    /// Returns true if the data type is [`String`](DataType::String) or [`Url`](DataType::Url).
    #[must_use]
    pub const fn is_string(&self) -> bool {
        matches!(self, Self::String | Self::Url)
    }

    /// Returns true if the data type is [`Structure`](DataType::Structure) or [`Sequence`](DataType::Sequence).
    #[must_use]
    pub const fn is_constructor(&self) -> bool {
        matches!(self, Self::Structure | Self::Sequence)
    }

    /// Returns true if the data type is numeric or [`String`](DataType::String).
    ///
    /// Only structures whose members are all simple can be stored as special structure data.
    #[must_use]
    pub const fn is_simple(&self) -> bool {
        self.is_numeric() || matches!(self, Self::String)
    }

    /// Returns the default fill value text for the data type, used when a `dmrpp:chunks` element has no `fillValue`.
    #[must_use]
    pub const fn default_fill_value(&self) -> &'static str {
        if self.is_string() {
            ""
        } else {
            "0"
        }
    }

    /// Create a fill value from its text in a DMR++ document.
    ///
    /// Numeric fill values are native endian.
    /// Float fill values may also be `nan`, `inf` or `-inf`.
    /// String and opaque fill values are the bytes of `fill_value`.
    ///
    /// # Errors
    ///
    /// Returns [`IncompatibleFillValueError`] if the fill value is incompatible with the data type.
    pub fn fill_value_from_str(&self, fill_value: &str) -> Result<FillValue, IncompatibleFillValueError> {
        use FillValue as FV;
        let err = |_| IncompatibleFillValueError::new(*self, fill_value);
        let text = fill_value.trim();
        match self {
            Self::Char | Self::Byte | Self::UInt8 => Ok(FV::from(text.parse::<u8>().map_err(err)?)),
            Self::Int8 => Ok(FV::from(text.parse::<i8>().map_err(err)?)),
            Self::Int16 => Ok(FV::from(text.parse::<i16>().map_err(err)?)),
            Self::UInt16 => Ok(FV::from(text.parse::<u16>().map_err(err)?)),
            Self::Int32 => Ok(FV::from(text.parse::<i32>().map_err(err)?)),
            Self::UInt32 => Ok(FV::from(text.parse::<u32>().map_err(err)?)),
            Self::Int64 => Ok(FV::from(text.parse::<i64>().map_err(err)?)),
            Self::UInt64 => Ok(FV::from(text.parse::<u64>().map_err(err)?)),
            Self::Float32 => Ok(FV::from(text.parse::<f32>().map_err(|_| {
                IncompatibleFillValueError::new(*self, fill_value)
            })?)),
            Self::Float64 => Ok(FV::from(text.parse::<f64>().map_err(|_| {
                IncompatibleFillValueError::new(*self, fill_value)
            })?)),
            Self::String | Self::Url | Self::Opaque => Ok(FV::from(fill_value)),
            Self::Enum | Self::Structure | Self::Sequence => {
                Err(IncompatibleFillValueError::new(*self, fill_value))
            }
        }
    }
}
