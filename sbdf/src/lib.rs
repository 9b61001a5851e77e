#![deny(missing_docs)]
//! Spotfire Binary Data Format: a streaming, column-oriented table serialization.
//!
//! This crate re-exports the component crates and adds [`convert`], which moves whole tables
//! between in-memory columns and SBDF streams.

pub use sbdf_array::*;
pub use {
    sbdf_dtype as dtype, sbdf_error as error, sbdf_file as file, sbdf_io as io,
    sbdf_metadata as metadata,
};

pub mod convert;
