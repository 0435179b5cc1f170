//! Codecs for values stored inline in a DMR++ document.
//!
//! - [`base64`]: the standard base64 alphabet with `=` padding, used by every inline storage class.
//! - [`zlib`]: zlib `compress`/`uncompress` reporting zlib return codes.
//! - [`vlsa`]: the variable length string array value encoding (optional zlib compression, then base64).

pub mod base64;
pub mod vlsa;
pub mod zlib;
