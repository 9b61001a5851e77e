use std::fmt::{Display, Formatter};
use std::io::Read;

use bytes::BufMut;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use sbdf_error::{SbdfResult, sbdf_bail, sbdf_err};
use sbdf_io::SbdfRead;

use crate::MAGIC_NUMBER;

/// The sections of an SBDF file. The discriminant is the id written after the magic number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum SectionId {
    /// The file header
    FileHeader = 0x01,
    /// The table and column metadata
    TableMetadata = 0x02,
    /// A table slice
    TableSlice = 0x03,
    /// A column slice within a table slice
    ColumnSlice = 0x04,
    /// The end of the table
    TableEnd = 0x05,
}

impl Display for SectionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            SectionId::FileHeader => "file header",
            SectionId::TableMetadata => "table metadata",
            SectionId::TableSlice => "table slice",
            SectionId::ColumnSlice => "column slice",
            SectionId::TableEnd => "table end",
        })
    }
}

/// Append the magic number and the id of `section`.
pub fn write_section<B: BufMut>(buf: &mut B, section: SectionId) {
    buf.put_slice(&MAGIC_NUMBER);
    buf.put_u8(section.into());
}

/// Read the next section marker.
///
/// A stream that ends where a section should start is reported as `UnexpectedSectionId`, since
/// every well-formed stream ends with a table end section.
pub fn read_section<R: Read + ?Sized>(read: &mut R) -> SbdfResult<SectionId> {
    let marker = read.read_array::<3>().map_err(|e| {
        if e.is_unexpected_eof() {
            sbdf_err!(UnexpectedSectionId: "stream ended where a section was expected")
        } else {
            e
        }
    })?;
    if marker[..2] != MAGIC_NUMBER {
        sbdf_bail!(
            MagicNumberMissing: "expected magic number {:02x}{:02x}, found {:02x}{:02x}",
            MAGIC_NUMBER[0],
            MAGIC_NUMBER[1],
            marker[0],
            marker[1]
        );
    }
    SectionId::try_from(marker[2])
        .map_err(|_| sbdf_err!(UnexpectedSectionId: "unknown section id 0x{:02x}", marker[2]))
}

/// Read the next section marker, which must be `expected`.
pub fn expect_section<R: Read + ?Sized>(read: &mut R, expected: SectionId) -> SbdfResult<()> {
    let found = read_section(read)?;
    if found != expected {
        sbdf_bail!(UnexpectedSectionId: "expected {} section, found {}", expected, found);
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use std::io::Cursor;

    use bytes::BytesMut;
    use rstest::rstest;
    use sbdf_error::ErrorKind;

    use super::*;

    #[test]
    fn marker_layout() {
        let mut buf = BytesMut::new();
        write_section(&mut buf, SectionId::ColumnSlice);
        assert_eq!(buf.as_ref(), &[0xDF, 0x5B, 0x04]);
        expect_section(&mut Cursor::new(buf.freeze()), SectionId::ColumnSlice).unwrap();
    }

    #[rstest]
    #[case(&[0xDF, 0x5C, 0x01], ErrorKind::MagicNumberMissing)]
    #[case(&[0xDF, 0x5B, 0x09], ErrorKind::UnexpectedSectionId)]
    #[case(&[0xDF, 0x5B, 0x05], ErrorKind::UnexpectedSectionId)]
    #[case(&[], ErrorKind::UnexpectedSectionId)]
    #[case(&[0xDF], ErrorKind::UnexpectedSectionId)]
    fn rejects(#[case] bytes: &[u8], #[case] kind: ErrorKind) {
        let err = expect_section(&mut Cursor::new(bytes), SectionId::FileHeader).unwrap_err();
        assert_eq!(err.kind(), kind);
    }
}
