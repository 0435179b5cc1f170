//! The variable length string array (VLSA) value encoding.
//!
//! A `dmrpp:vlsa` element holds the values of a string array whose elements have differing lengths:
//! ```xml
//! <dmrpp:vlsa>
//!   <v>short value</v>
//!   <v c="3">repeated value</v>
//!   <v s="412">eJzLSM3JyVcozy/KSQEAGgQEXQ==...</v>
//! </dmrpp:vlsa>
//! ```
//! Values longer than [`VALUE_COMPRESSION_THRESHOLD`] bytes are zlib compressed and base64 encoded, with their uncompressed size recorded in the `s` attribute.
//! Consecutive repeated values are written once with a `c` (count) attribute.

use std::io::Write;

use quick_xml::{
    events::{BytesEnd, BytesStart, BytesText, Event},
    Writer,
};
use thiserror::Error;

use crate::xml::XmlNode;

use super::{
    base64::{self, Base64DecodeError},
    zlib::{self, ZlibError},
};

/// The name of the VLSA element.
pub const VLSA_ELEMENT_NAME: &str = "dmrpp:vlsa";

/// The name of a VLSA value element.
pub const VLSA_VALUE_ELEMENT_NAME: &str = "v";

/// The name of the VLSA value attribute holding the uncompressed size of an encoded value.
pub const VLSA_VALUE_SIZE_ATTR_NAME: &str = "s";

/// The name of the VLSA value attribute holding the repeat count of a value.
pub const VLSA_VALUE_COUNT_ATTR_NAME: &str = "c";

/// Values longer than this many bytes are compressed.
pub const VALUE_COMPRESSION_THRESHOLD: usize = 300;

/// A VLSA error.
#[derive(Debug, Error)]
pub enum VlsaError {
    /// A zlib error.
    #[error(transparent)]
    Zlib(#[from] ZlibError),
    /// A base64 error.
    #[error(transparent)]
    Base64(#[from] Base64DecodeError),
    /// A decoded value is not valid UTF-8.
    #[error("decoded value is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
    /// An invalid attribute on a value element.
    #[error("invalid '{attribute}' attribute value '{value}' on a VLSA value element")]
    InvalidAttribute {
        /// The attribute name.
        attribute: &'static str,
        /// The attribute value.
        value: String,
    },
    /// An XML write error.
    #[error("could not write VLSA element: {0}")]
    Write(String),
}

/// Compress `source` with zlib and base64 encode the result.
///
/// # Errors
/// Returns [`VlsaError::Zlib`] if compression fails.
pub fn encode(source: &str) -> Result<String, VlsaError> {
    let compressed = zlib::compress(source.as_bytes())?;
    tracing::trace!(
        source_size = source.len(),
        compressed_size = compressed.len(),
        "vlsa value compressed"
    );
    Ok(base64::encode(&compressed))
}

/// Base64 decode `encoded` and decompress the result, which must be `expected_size` bytes.
///
/// # Errors
/// Returns a [`VlsaError`] if `encoded` is not valid base64, does not decompress, decompresses to a size other than `expected_size`, or is not UTF-8.
pub fn decode(encoded: &str, expected_size: usize) -> Result<String, VlsaError> {
    let compressed = base64::decode(encoded)?;
    let decompressed = zlib::uncompress(&compressed, expected_size)?;
    Ok(String::from_utf8(decompressed)?)
}

fn write_err(err: impl std::fmt::Display) -> VlsaError {
    VlsaError::Write(err.to_string())
}

/// Write one VLSA value element for `value`, repeated `dup_count` times.
///
/// Values longer than [`VALUE_COMPRESSION_THRESHOLD`] bytes are [`encode`]d and carry their length in a size attribute.
/// A `dup_count` greater than one is written as a count attribute.
///
/// # Errors
/// Returns a [`VlsaError`] if the value cannot be encoded or written.
pub fn write_value<W: Write>(
    writer: &mut Writer<W>,
    value: &str,
    dup_count: u64,
) -> Result<(), VlsaError> {
    let mut start = BytesStart::new(VLSA_VALUE_ELEMENT_NAME);
    let text = if value.len() > VALUE_COMPRESSION_THRESHOLD {
        start.push_attribute((VLSA_VALUE_SIZE_ATTR_NAME, value.len().to_string().as_str()));
        encode(value)?
    } else {
        value.to_string()
    };
    if dup_count > 1 {
        start.push_attribute((VLSA_VALUE_COUNT_ATTR_NAME, dup_count.to_string().as_str()));
    }

    writer.write_event(Event::Start(start)).map_err(write_err)?;
    writer
        .write_event(Event::Text(BytesText::new(&text)))
        .map_err(write_err)?;
    writer
        .write_event(Event::End(BytesEnd::new(VLSA_VALUE_ELEMENT_NAME)))
        .map_err(write_err)?;
    Ok(())
}

/// Write a VLSA element holding `values`.
///
/// Runs of consecutive equal values are written once with their count.
///
/// # Errors
/// Returns a [`VlsaError`] if a value cannot be encoded or written.
pub fn write<W: Write, S: AsRef<str>>(writer: &mut Writer<W>, values: &[S]) -> Result<(), VlsaError> {
    writer
        .write_event(Event::Start(BytesStart::new(VLSA_ELEMENT_NAME)))
        .map_err(write_err)?;

    let mut values = values.iter().map(AsRef::as_ref).peekable();
    while let Some(value) = values.next() {
        let mut dup_count = 1;
        while values.next_if_eq(&value).is_some() {
            dup_count += 1;
        }
        write_value(writer, value, dup_count)?;
    }

    writer
        .write_event(Event::End(BytesEnd::new(VLSA_ELEMENT_NAME)))
        .map_err(write_err)?;
    Ok(())
}

/// Read the value of a VLSA value element, decoding it if it carries a size attribute.
///
/// # Errors
/// Returns a [`VlsaError`] if the size attribute is invalid or the value cannot be decoded.
pub fn read_value(node: XmlNode<'_>) -> Result<String, VlsaError> {
    match node.attribute(VLSA_VALUE_SIZE_ATTR_NAME) {
        Some(size) => {
            let size = size
                .parse::<usize>()
                .map_err(|_| VlsaError::InvalidAttribute {
                    attribute: VLSA_VALUE_SIZE_ATTR_NAME,
                    value: size.to_string(),
                })?;
            decode(node.text().trim(), size)
        }
        None => Ok(node.text().to_string()),
    }
}

/// Read every value of a VLSA element in document order, expanding repeated values by their count.
///
/// # Errors
/// Returns a [`VlsaError`] if a count or size attribute is invalid or a value cannot be decoded.
pub fn read(vlsa_element: XmlNode<'_>) -> Result<Vec<String>, VlsaError> {
    let mut values = Vec::new();
    for node in vlsa_element.children_named(VLSA_VALUE_ELEMENT_NAME) {
        let value = read_value(node)?;
        let count = match node.attribute(VLSA_VALUE_COUNT_ATTR_NAME) {
            Some(count) => count
                .parse::<usize>()
                .map_err(|_| VlsaError::InvalidAttribute {
                    attribute: VLSA_VALUE_COUNT_ATTR_NAME,
                    value: count.to_string(),
                })?,
            None => 1,
        };
        values.extend(std::iter::repeat(value).take(count));
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use crate::xml::XmlDocument;

    use super::*;

    fn write_and_read(values: &[String]) -> Vec<String> {
        let mut writer = Writer::new(Vec::new());
        write(&mut writer, values).unwrap();
        let xml = String::from_utf8(writer.into_inner()).unwrap();
        let document = XmlDocument::parse_str(&xml).unwrap();
        read(document.root()).unwrap()
    }

    fn long_value() -> String {
        "It is a truth universally acknowledged. ".repeat(20)
    }

    #[test]
    fn vlsa_encode_decode() {
        let source = long_value();
        let encoded = encode(&source).unwrap();
        assert_eq!(decode(&encoded, source.len()).unwrap(), source);
        assert!(decode(&encoded, source.len() - 1).is_err());
        assert!(decode(&encoded, source.len() + 1).is_err());
    }

    #[test]
    fn vlsa_write_value_threshold() {
        let mut writer = Writer::new(Vec::new());
        write_value(&mut writer, "short", 1).unwrap();
        let xml = String::from_utf8(writer.into_inner()).unwrap();
        assert_eq!(xml, "<v>short</v>");

        let value = long_value();
        let mut writer = Writer::new(Vec::new());
        write_value(&mut writer, &value, 2).unwrap();
        let xml = String::from_utf8(writer.into_inner()).unwrap();
        assert!(xml.starts_with(&format!(r#"<v s="{}" c="2">"#, value.len())));
        assert!(!xml.contains("truth"));
    }

    #[test]
    fn vlsa_write_read_value() {
        for value in [String::new(), "a".to_string(), "x < y & z".to_string(), long_value()] {
            let mut writer = Writer::new(Vec::new());
            write_value(&mut writer, &value, 1).unwrap();
            let xml = String::from_utf8(writer.into_inner()).unwrap();
            let document = XmlDocument::parse_str(&xml).unwrap();
            assert_eq!(read_value(document.root()).unwrap(), value);
        }
    }

    #[test]
    fn vlsa_write_read_run_length() {
        let values: Vec<String> = ["Parting", "is su", "is su", "is su", "swe", ""]
            .iter()
            .map(ToString::to_string)
            .collect();
        let mut writer = Writer::new(Vec::new());
        write(&mut writer, &values).unwrap();
        let xml = String::from_utf8(writer.into_inner()).unwrap();
        assert_eq!(xml.matches("<v").count(), 4);
        assert!(xml.contains(r#"<v c="3">is su</v>"#));
        assert_eq!(write_and_read(&values), values);
    }

    #[test]
    fn vlsa_write_read_long_runs() {
        let mut values = vec![long_value(); 5];
        values.push("end".to_string());
        values.push(long_value());
        assert_eq!(write_and_read(&values), values);
    }

    #[test]
    fn vlsa_read_invalid_count() {
        let document = XmlDocument::parse_str(r#"<dmrpp:vlsa><v c="x">a</v></dmrpp:vlsa>"#).unwrap();
        assert!(matches!(
            read(document.root()),
            Err(VlsaError::InvalidAttribute { attribute: "c", .. })
        ));
    }
}
