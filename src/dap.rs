//! The DAP4 data model decorated by a DMR++ document.
//!
//! A [`Dmr`] is a tree of [`Group`]s holding [`Variable`]s.
//! [`DmzDocument::build_thin_dmr`](crate::dmz::DmzDocument::build_thin_dmr) fills in its structure (names, types and shapes),
//! then the attributes and [`DmrppCommon`] storage metadata of each variable are loaded on demand.

mod attributes;
mod dmrpp_common;
mod group;
mod variable;

use std::sync::Arc;

pub use attributes::{Attribute, AttributeType, AttributeValue, Attributes};
pub use dmrpp_common::{DirectIoInfo, DmrppCommon, StorageClass};
pub use group::{child_fqn, Dimension, EnumConst, Enumeration, Group};
pub use variable::{
    ArrayDimension, ArrayMap, EnumerationRef, StringArray, StringPad, Variable, VariableValues,
};

use crate::chunk::DataUrl;

/// A DAP4 dataset description.
#[derive(Clone, Debug, PartialEq)]
pub struct Dmr {
    name: String,
    dap_version: Option<String>,
    dmr_version: Option<String>,
    xml_base: Option<String>,
    namespace: Option<String>,
    href: Option<Arc<DataUrl>>,
    dmrpp_version: Option<String>,
    direct_io_candidates: bool,
    root: Group,
}

impl Default for Dmr {
    fn default() -> Self {
        Self {
            name: String::new(),
            dap_version: None,
            dmr_version: None,
            xml_base: None,
            namespace: None,
            href: None,
            dmrpp_version: None,
            direct_io_candidates: false,
            root: Group::new_root(),
        }
    }
}

impl Dmr {
    /// Return the dataset name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Return the DAP version.
    #[must_use]
    pub fn dap_version(&self) -> Option<&str> {
        self.dap_version.as_deref()
    }

    /// Return the DMR version.
    #[must_use]
    pub fn dmr_version(&self) -> Option<&str> {
        self.dmr_version.as_deref()
    }

    /// Return the `xml:base` URI.
    #[must_use]
    pub fn xml_base(&self) -> Option<&str> {
        self.xml_base.as_deref()
    }

    /// Return the XML namespace.
    #[must_use]
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Return the URL of the data file described by the document.
    #[must_use]
    pub fn href(&self) -> Option<&Arc<DataUrl>> {
        self.href.as_ref()
    }

    /// Return the DMR++ format version. Documents without one were written by older builders.
    #[must_use]
    pub fn dmrpp_version(&self) -> Option<&str> {
        self.dmrpp_version.as_deref()
    }

    /// Returns true if any chunked variable declares a deflate level, so some variables may be eligible for direct I/O.
    #[must_use]
    pub fn direct_io_candidates(&self) -> bool {
        self.direct_io_candidates
    }

    /// Return the root group.
    #[must_use]
    pub fn root(&self) -> &Group {
        &self.root
    }

    /// Return the root group.
    #[must_use]
    pub fn root_mut(&mut self) -> &mut Group {
        &mut self.root
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }

    pub(crate) fn set_dap_version(&mut self, dap_version: Option<String>) {
        self.dap_version = dap_version;
    }

    pub(crate) fn set_dmr_version(&mut self, dmr_version: Option<String>) {
        self.dmr_version = dmr_version;
    }

    pub(crate) fn set_xml_base(&mut self, xml_base: Option<String>) {
        self.xml_base = xml_base;
    }

    pub(crate) fn set_namespace(&mut self, namespace: Option<String>) {
        self.namespace = namespace;
    }

    pub(crate) fn set_href(&mut self, href: Option<Arc<DataUrl>>) {
        self.href = href;
    }

    pub(crate) fn set_dmrpp_version(&mut self, dmrpp_version: Option<String>) {
        self.dmrpp_version = dmrpp_version;
    }

    pub(crate) fn set_direct_io_candidates(&mut self, direct_io_candidates: bool) {
        self.direct_io_candidates = direct_io_candidates;
    }
}
