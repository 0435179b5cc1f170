use derive_more::Display;
use thiserror::Error;

/// The byte order of each element in an array, written `LE` or `BE` in a DMR++ document.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Display)]
pub enum Endianness {
    /// Little endian.
    #[display("LE")]
    Little,

    /// Big endian.
    #[display("BE")]
    Big,
}

/// An invalid byte order error.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("invalid byte order '{0}', expected 'LE' or 'BE'")]
pub struct InvalidEndiannessError(String);

impl Endianness {
    /// Return true if the endianness matches the endianness of the CPU.
    #[must_use]
    pub fn is_native(self) -> bool {
        self == NATIVE_ENDIAN
    }
}

impl std::str::FromStr for Endianness {
    type Err = InvalidEndiannessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LE" => Ok(Self::Little),
            "BE" => Ok(Self::Big),
            _ => Err(InvalidEndiannessError(s.to_string())),
        }
    }
}

/// The endianness of the CPU.
pub const NATIVE_ENDIAN: Endianness = if cfg!(target_endian = "big") {
    Endianness::Big
} else {
    Endianness::Little
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endianness_parse() {
        assert_eq!("LE".parse::<Endianness>().unwrap(), Endianness::Little);
        assert_eq!("BE".parse::<Endianness>().unwrap(), Endianness::Big);
        assert!("le".parse::<Endianness>().is_err());
        assert_eq!(Endianness::Little.to_string(), "LE");
        assert!(NATIVE_ENDIAN.is_native());
    }
}
