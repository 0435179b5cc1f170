//! DMR++ configuration options.

use serde::Deserialize;

use crate::error::{dmz_error, DmzError};

/// Configuration options for a [`DmzDocument`](crate::dmz::DmzDocument).
///
/// A [`Config`] is passed to [`DmzDocument::new_with_config`](crate::dmz::DmzDocument::new_with_config) and read once at construction.
/// It can be deserialized from JSON with [`Config::from_json_str`]; omitted options take their default.
///
/// # Configuration Options
///
/// ## Elide Unsupported Types
///  > default: [`true`]
///
/// If enabled, variables whose `dmrpp:chunks` element flags a data type that cannot be served (e.g. `fillValue="unsupported-compound"`) are dropped from the thin DMR.
/// Otherwise they are built as usual, and [`load_chunks`](crate::dmz::DmzDocument::load_chunks) fails when it reaches them.
///
/// ## Require Chunks
///  > default: [`false`]
///
/// If enabled, [`load_chunks`](crate::dmz::DmzDocument::load_chunks) requires every variable to have exactly one storage element
/// (`dmrpp:chunks`, `dmrpp:chunk`, `dmrpp:compact`, `dmrpp:missingdata`, `dmrpp:specialstructuredata` or `dmrpp:vlsa`).
///
/// ## Direct I/O
///  > default: [`true`]
///
/// If enabled, [`build_thin_dmr`](crate::dmz::DmzDocument::build_thin_dmr) marks deflate compressed, little endian, chunked arrays whose chunks can be copied without decompression.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    elide_unsupported_types: bool,
    require_chunks: bool,
    direct_io: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            elide_unsupported_types: true,
            require_chunks: false,
            direct_io: true,
        }
    }
}

impl Config {
    /// Create a configuration from a JSON object, e.g. `{"elide_unsupported_types": false}`.
    ///
    /// # Errors
    /// Returns a [`DmzError`] if `json` is not a valid configuration object.
    pub fn from_json_str(json: &str) -> Result<Self, DmzError> {
        serde_json::from_str(json).map_err(|err| dmz_error!("Invalid DMR++ configuration: {err}"))
    }

    /// Get the [elide unsupported types](#elide-unsupported-types) configuration.
    #[must_use]
    pub fn elide_unsupported_types(&self) -> bool {
        self.elide_unsupported_types
    }

    /// Set the [elide unsupported types](#elide-unsupported-types) configuration.
    pub fn set_elide_unsupported_types(&mut self, elide_unsupported_types: bool) -> &mut Self {
        self.elide_unsupported_types = elide_unsupported_types;
        self
    }

    /// Get the [require chunks](#require-chunks) configuration.
    #[must_use]
    pub fn require_chunks(&self) -> bool {
        self.require_chunks
    }

    /// Set the [require chunks](#require-chunks) configuration.
    pub fn set_require_chunks(&mut self, require_chunks: bool) -> &mut Self {
        self.require_chunks = require_chunks;
        self
    }

    /// Get the [direct I/O](#direct-io) configuration.
    #[must_use]
    pub fn direct_io(&self) -> bool {
        self.direct_io
    }

    /// Set the [direct I/O](#direct-io) configuration.
    pub fn set_direct_io(&mut self, direct_io: bool) -> &mut Self {
        self.direct_io = direct_io;
        self
    }
}
