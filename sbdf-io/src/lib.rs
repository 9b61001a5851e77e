#![deny(missing_docs)]

//! Primitive IO for the SBDF wire format.
//!
//! Everything on the wire is built from a handful of primitives: single bytes, little-endian
//! `i32` counts, length-prefixed UTF-8 strings and 7-bit packed lengths. [`SbdfRead`] reads
//! them from any [`std::io::Read`], and [`SbdfBufMut`] appends them to a [`bytes::BufMut`] so
//! that whole sections can be encoded in memory before being written out in one call.

pub use packed::*;
pub use read::*;
pub use write::*;

mod packed;
mod read;
mod write;
