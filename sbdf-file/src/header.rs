use std::io::Read;

use bytes::BufMut;
use sbdf_error::{SbdfResult, sbdf_bail};
use sbdf_io::SbdfRead;

use crate::section::{SectionId, expect_section, write_section};
use crate::{MAJOR_VERSION, MINOR_VERSION};

/// The format version recorded at the start of every file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHeader {
    /// Incompatible format changes bump the major version.
    pub major: u8,
    /// Backwards compatible additions bump the minor version.
    pub minor: u8,
}

impl Default for FileHeader {
    fn default() -> Self {
        Self {
            major: MAJOR_VERSION,
            minor: MINOR_VERSION,
        }
    }
}

impl FileHeader {
    /// Append the header section.
    pub fn write<B: BufMut>(&self, buf: &mut B) {
        write_section(buf, SectionId::FileHeader);
        buf.put_u8(self.major);
        buf.put_u8(self.minor);
    }

    /// Read the header section, rejecting versions this crate cannot read.
    pub fn read<R: Read + ?Sized>(read: &mut R) -> SbdfResult<Self> {
        expect_section(read, SectionId::FileHeader)?;
        let header = Self {
            major: read.read_u8()?,
            minor: read.read_u8()?,
        };
        if header.major != MAJOR_VERSION || header.minor > MINOR_VERSION {
            sbdf_bail!(
                UnknownVersion: "cannot read version {}.{}, the newest supported is {}.{}",
                header.major,
                header.minor,
                MAJOR_VERSION,
                MINOR_VERSION
            );
        }
        Ok(header)
    }
}
