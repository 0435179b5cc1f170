//! A rust library for [DMR++](https://docs.opendap.org/index.php/DMR%2B%2B) metadata documents.
//!
//! A DMR++ document is a DAP4 dataset description (a DMR) extended with the byte layout of every variable:
//! where its chunks live in the source file, how they are compressed, and which parts of an array hold only fill values.
//! With that information a server can fetch exactly the bytes a request needs without re-reading the source file.
//!
//! ## Getting Started
//! [`dmz::DmzDocument`] is the entry point.
//! Construct one from a file or a string, build the structure of the dataset with [`dmz::DmzDocument::build_thin_dmr`],
//! then complete individual variables on demand with [`dmz::DmzDocument::load_attributes`] and [`dmz::DmzDocument::load_chunks`].
//!
//! ## Example
//! ```rust
//! # use dmrpp::{dap::Dmr, dmz::DmzDocument};
//! let document = DmzDocument::new_from_str(r#"
//! <Dataset name="example.h5" dmrpp:href="data/example.h5">
//!   <Int32 name="x">
//!     <dmrpp:chunk offset="128" nBytes="4"/>
//!   </Int32>
//! </Dataset>"#)?;
//!
//! let mut dmr = Dmr::default();
//! document.build_thin_dmr(&mut dmr)?;
//!
//! let x = dmr.root_mut().find_variable_mut("/x").unwrap();
//! document.load_chunks(x)?;
//! assert_eq!(x.dmrpp().chunks()[0].offset(), 128);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Storage Classes
//! A variable's data can be described by exactly one of:
//!  - `dmrpp:chunks`: chunked storage, optionally compressed, with fill value chunks synthesized for missing positions,
//!  - `dmrpp:chunk`: contiguous storage,
//!  - `dmrpp:compact`: values stored inline as base64,
//!  - `dmrpp:missingdata`: a zlib compressed, base64 encoded copy of the whole array,
//!  - `dmrpp:specialstructuredata`: packed structure records stored inline,
//!  - `dmrpp:vlsa`: variable length string values stored inline.
//!
//! ## Licence
//! `dmrpp` is licensed under either of
//!  - the Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> or
//!  - the MIT license <http://opensource.org/licenses/MIT>, at your option.

#![warn(unused_variables)]
#![warn(dead_code)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![deny(clippy::missing_panics_doc)]

pub mod error;

pub mod array;
pub mod byte_range;
pub mod chunk;
pub mod codec;
pub mod config;
pub mod dap;
pub mod dmz;
pub mod xml;
