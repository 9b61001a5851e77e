//! Table and column metadata.
//!
//! [`Metadata`] is an ordered set of named single values with optional defaults. A
//! [`TableMetadata`] pairs table-level metadata with one collection per column; each column
//! collection carries the reserved [`COLUMN_NAME`] and [`COLUMN_DATA_TYPE`] entries that give the
//! column its name and type.
//!
//! On the wire, column metadata is folded: every entry name used by any column is written once
//! with its type and default, in sorted order, followed by each column's value for every name.

pub use column::*;
pub use metadata::*;
pub use table::*;

mod column;
mod metadata;
mod table;
