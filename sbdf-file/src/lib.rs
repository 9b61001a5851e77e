#![deny(missing_docs)]
//! Read and write SBDF files, a streaming, column-oriented serialization of tables.
//!
//! A file is a sequence of sections. Each section starts with the two magic bytes followed by a
//! one byte section id. After the header and the table metadata, rows are stored in table slices,
//! each holding one column slice per column, all with the same row count. A table end section
//! closes the stream.
//!
//! ## Illustrated File Format
//! ```text
//! ┌────────────────────────────┐
//! │        File Header         │
//! │   (magic, id 1, version)   │
//! ├────────────────────────────┤
//! │       Table Metadata       │
//! │  (table entries, folded    │
//! │   column entry names and   │
//! │   per-column values)       │
//! ├────────────────────────────┤
//! │        Table Slice         │
//! │ ┌────────────────────────┐ │
//! │ │      Column Slice      │ │
//! │ │ (value array, named    │ │
//! │ │  property arrays)      │ │
//! │ ├────────────────────────┤ │
//! │ │          ...           │ │
//! │ └────────────────────────┘ │
//! ├────────────────────────────┤
//! │            ...             │
//! ├────────────────────────────┤
//! │         Table End          │
//! └────────────────────────────┘
//! ```
//!
//! # Reading
//!
//! [`SbdfReader`] reads the header and metadata on open and then yields one [`TableSlice`] at a
//! time. A [projection](SbdfReadOptions::with_projection) limits decoding to a subset of
//! columns; the remaining columns are skipped using their encoded lengths.
//!
//! # Writing
//!
//! [`SbdfWriter`] writes the header and metadata on creation, then any number of complete table
//! slices, and the end marker on [`SbdfWriter::finish`]. [`SbdfWriteOptions`] carries the slicing
//! and encoding choices used by callers that cut their own data into slices.

mod header;
mod options;
mod reader;
mod section;
mod slice;
mod writer;

pub use forever_constant::*;
pub use header::*;
pub use options::*;
pub use reader::*;
pub use section::*;
pub use slice::*;
pub use writer::*;

/// The major version of the file format written by this crate.
pub const MAJOR_VERSION: u8 = 1;
/// The minor version of the file format written by this crate.
pub const MINOR_VERSION: u8 = 0;

/// Constants that will never change (i.e., doing so would break backwards compatibility)
mod forever_constant {
    /// The extension for SBDF files
    pub const SBDF_FILE_EXTENSION: &str = "sbdf";

    /// The two bytes starting every section
    pub const MAGIC_NUMBER: [u8; 2] = [0xDF, 0x5B];

    #[cfg(test)]
    mod test {
        use super::*;
        use crate::*;

        #[test]
        fn never_change_these_constants() {
            assert_eq!(MAGIC_NUMBER, [0xDF, 0x5B]);
            assert_eq!(SBDF_FILE_EXTENSION, "sbdf");
            assert_eq!(IS_INVALID, "IsInvalid");
            assert_eq!(ERROR_CODE, "ErrorCode");
            assert_eq!(HAS_REPLACED_VALUE, "HasReplacedValue");
        }
    }
}
