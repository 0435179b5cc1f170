//! The DMR++ metadata document.
//!
//! A [`DmzDocument`] owns one parsed DMR++ document. It is used in three steps:
//!  1. [`build_thin_dmr`](DmzDocument::build_thin_dmr) populates an empty [`Dmr`](crate::dap::Dmr) with groups, dimensions, enumerations and variables,
//!  2. [`load_attributes`](DmzDocument::load_attributes) attaches the DAP attributes of one variable,
//!  3. [`load_chunks`](DmzDocument::load_chunks) attaches the chunk descriptors (or inline values) of one variable.
//!
//! Steps 2 and 3 are lazy: they are only paid for variables a request touches, and are no-ops when repeated.
//!
//! Cloning a [`DmzDocument`] is cheap; clones share the parsed document and dataset URL.

mod attributes;
mod build;
mod chunks;
mod direct_io;
mod inline;

use std::{path::Path, sync::Arc};

use crate::{
    chunk::DataUrl,
    config::Config,
    dap::Variable,
    error::{dmz_error, DmzError},
    xml::{XmlDocument, XmlNode},
};

/// A fill value marking a string variable that is unsupported unless it is a scalar or a fixed length string array.
pub const UNSUPPORTED_STRING: &str = "unsupported-string";

/// Fill values marking variables of a type that cannot be served.
pub const UNSUPPORTED_TYPES: [&str; 3] = [
    "unsupported-array",
    "unsupported-compound",
    "unsupported-variable-length-string",
];

/// A parsed DMR++ document.
#[derive(Clone, Debug)]
pub struct DmzDocument {
    xml: Arc<XmlDocument>,
    dataset_href: Option<Arc<DataUrl>>,
    config: Config,
}

impl DmzDocument {
    /// Parse the DMR++ document at `path` with the default [`Config`].
    ///
    /// # Errors
    /// Returns a [`DmzError`] if the file cannot be read, is not well formed XML, or has no `Dataset` root element.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, DmzError> {
        Self::new_with_config(path, Config::default())
    }

    /// Parse the DMR++ document at `path`.
    ///
    /// # Errors
    /// Returns a [`DmzError`] if the file cannot be read, is not well formed XML, or has no `Dataset` root element.
    pub fn new_with_config(path: impl AsRef<Path>, config: Config) -> Result<Self, DmzError> {
        let path = path.as_ref();
        tracing::debug!(path = %path.display(), "parsing DMR++ document");
        let xml = XmlDocument::parse_file(path)
            .map_err(|err| dmz_error!("Could not parse the DMR++ document: {err}"))?;
        Self::from_xml(xml, config)
    }

    /// Parse a DMR++ document held in a string with the default [`Config`].
    ///
    /// # Errors
    /// Returns a [`DmzError`] if the document is not well formed XML or has no `Dataset` root element.
    pub fn new_from_str(xml: &str) -> Result<Self, DmzError> {
        Self::new_from_str_with_config(xml, Config::default())
    }

    /// Parse a DMR++ document held in a string.
    ///
    /// # Errors
    /// Returns a [`DmzError`] if the document is not well formed XML or has no `Dataset` root element.
    pub fn new_from_str_with_config(xml: &str, config: Config) -> Result<Self, DmzError> {
        let xml = XmlDocument::parse_str(xml)
            .map_err(|err| dmz_error!("Could not parse the DMR++ document: {err}"))?;
        Self::from_xml(xml, config)
    }

    fn from_xml(xml: XmlDocument, config: Config) -> Result<Self, DmzError> {
        let dataset = xml.root();
        if !dataset.is("Dataset") {
            return Err(dmz_error!(
                "No DMR++ data present, the root element is '{}' rather than 'Dataset'.",
                dataset.name()
            ));
        }
        let dataset_href = dataset.attribute("href").map(|href| {
            let trusted = dataset.attribute("trust") == Some("true");
            Arc::new(DataUrl::new(href, trusted))
        });
        Ok(Self {
            xml: Arc::new(xml),
            dataset_href,
            config,
        })
    }

    /// Return the configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Return the parsed document.
    #[must_use]
    pub fn xml(&self) -> &XmlDocument {
        &self.xml
    }

    /// Return the URL of the data file, shared by every chunk without its own `href`.
    #[must_use]
    pub fn dataset_href(&self) -> Option<&Arc<DataUrl>> {
        self.dataset_href.as_ref()
    }

    /// Return the element `variable` was built from.
    fn variable_node(&self, variable: &Variable) -> Result<XmlNode<'_>, DmzError> {
        variable
            .dmrpp()
            .xml_node()
            .and_then(|id| self.xml.node(id))
            .filter(|node| node.attribute("name") == Some(variable.name()))
            .ok_or_else(|| {
                dmz_error!(
                    "Could not find location of variable '{}' in the DMR++ XML document.",
                    variable.fqn()
                )
            })
    }
}

/// Returns true if the variable element `node` holds a type that cannot be served.
///
/// The type is flagged by the `fillValue` of its `dmrpp:chunks` element.
/// [`UNSUPPORTED_STRING`] flags a supported type when the variable is a scalar or has a `dmrpp:FixedLengthStringArray`.
pub(crate) fn is_unsupported_type(node: XmlNode<'_>) -> bool {
    match node.child("chunks").and_then(|chunks| chunks.attribute("fillValue")) {
        Some(UNSUPPORTED_STRING) => {
            node.child("Dim").is_some() && node.child("FixedLengthStringArray").is_none()
        }
        Some(fill_value) => UNSUPPORTED_TYPES.contains(&fill_value),
        None => false,
    }
}

/// Parse a whitespace separated list of unsigned integers, e.g. the text of `dmrpp:chunkDimensionSizes`.
pub(crate) fn parse_u64_list(list: &str, what: &str) -> Result<Vec<u64>, DmzError> {
    list.split_whitespace()
        .map(|value| {
            value
                .parse::<u64>()
                .map_err(|_| dmz_error!("Invalid {what} '{list}', expected unsigned integers."))
        })
        .collect()
}

/// Return the value of the required attribute `name` of `node`, which must not be empty.
pub(crate) fn required_attribute<'a>(
    node: XmlNode<'a>,
    name: &str,
) -> Result<&'a str, DmzError> {
    node.attribute(name)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| {
            dmz_error!(
                "The required attribute '{name}' was missing from a {} element.",
                node.local_name()
            )
        })
}

/// Parse the required unsigned integer attribute `name` of `node`.
pub(crate) fn required_u64_attribute(node: XmlNode<'_>, name: &str) -> Result<u64, DmzError> {
    let value = required_attribute(node, name)?;
    value.trim().parse::<u64>().map_err(|_| {
        dmz_error!(
            "The attribute '{name}' of a {} element is not an unsigned integer: '{value}'.",
            node.local_name()
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dmz_document_dataset_href() {
        let document = DmzDocument::new_from_str(
            r#"<Dataset name="a" dmrpp:href="s3://bucket/a.h5" dmrpp:trust="true"/>"#,
        )
        .unwrap();
        let href = document.dataset_href().unwrap();
        assert_eq!(href.href(), "s3://bucket/a.h5");
        assert!(href.is_trusted());

        let document = DmzDocument::new_from_str(r#"<Dataset name="a"/>"#).unwrap();
        assert!(document.dataset_href().is_none());
    }

    #[test]
    fn dmz_document_clone_shares_document() {
        let document = DmzDocument::new_from_str(r#"<Dataset name="a" dmrpp:href="a.h5"/>"#).unwrap();
        let clone = document.clone();
        assert!(Arc::ptr_eq(&document.xml, &clone.xml));
        assert!(Arc::ptr_eq(
            document.dataset_href().unwrap(),
            clone.dataset_href().unwrap()
        ));
    }

    #[test]
    fn dmz_document_errors() {
        assert!(DmzDocument::new_from_str("").is_err());
        assert!(DmzDocument::new_from_str("<Dataset name='a'>").is_err());
        let err = DmzDocument::new_from_str("<Group name='a'/>").unwrap_err();
        assert!(err.message().starts_with("No DMR++ data present"));
        assert!(DmzDocument::new("/no/such/file.dmrpp").is_err());
    }

    #[test]
    fn dmz_unsupported_type() {
        let unsupported = |xml: &str| is_unsupported_type(XmlDocument::parse_str(xml).unwrap().root());
        assert!(!unsupported(r#"<String name="s"><dmrpp:chunks fillValue="unsupported-string"/></String>"#));
        assert!(!unsupported(
            r#"<String name="s"><Dim size="2"/><dmrpp:FixedLengthStringArray string_length="4"/><dmrpp:chunks fillValue="unsupported-string"/></String>"#
        ));
        assert!(unsupported(
            r#"<String name="s"><Dim size="2"/><dmrpp:chunks fillValue="unsupported-string"/></String>"#
        ));
        assert!(unsupported(r#"<Structure name="s"><dmrpp:chunks fillValue="unsupported-compound"/></Structure>"#));
        assert!(!unsupported(r#"<Int32 name="i"><dmrpp:chunks fillValue="-1"/></Int32>"#));
        assert!(!unsupported(r#"<Int32 name="i"/>"#));
    }

    #[test]
    fn dmz_parse_u64_list() {
        assert_eq!(parse_u64_list(" 2  3\n4 ", "sizes").unwrap(), [2, 3, 4]);
        assert!(parse_u64_list("2 x", "sizes").is_err());
        assert!(parse_u64_list("", "sizes").unwrap().is_empty());
    }
}
