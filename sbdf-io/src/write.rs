use bytes::BufMut;
use sbdf_error::{SbdfResult, sbdf_err};

use crate::packed::encode_packed;

fn to_i32(value: usize) -> SbdfResult<i32> {
    i32::try_from(value).map_err(|_| sbdf_err!(InvalidSize: "{} does not fit in an i32", value))
}

/// Extension methods for encoding SBDF primitives into an in-memory buffer.
pub trait SbdfBufMut: BufMut {
    /// Append a count or length as a little-endian `i32`.
    fn put_count(&mut self, count: usize) -> SbdfResult<()> {
        self.put_i32_le(to_i32(count)?);
        Ok(())
    }

    /// Append an `i32` byte length followed by the bytes.
    fn put_prefixed_bytes(&mut self, bytes: &[u8]) -> SbdfResult<()> {
        self.put_count(bytes.len())?;
        self.put_slice(bytes);
        Ok(())
    }

    /// Append a string as an `i32` byte length followed by its UTF-8 bytes.
    fn put_string(&mut self, value: &str) -> SbdfResult<()> {
        self.put_prefixed_bytes(value.as_bytes())
    }

    /// Append a 7-bit packed length.
    fn put_packed_len(&mut self, len: usize) -> SbdfResult<()> {
        let len = to_i32(len)?.unsigned_abs();
        let mut packed = Vec::with_capacity(crate::MAX_PACKED_LEN);
        encode_packed(len, &mut packed);
        self.put_slice(&packed);
        Ok(())
    }
}

impl<B: BufMut + ?Sized> SbdfBufMut for B {}

#[cfg(test)]
mod test {
    use std::io::Cursor;

    use bytes::BytesMut;

    use super::*;
    use crate::SbdfRead;

    #[test]
    fn writes_what_reader_reads() {
        let mut buf = BytesMut::new();
        buf.put_u8(3);
        buf.put_count(42).unwrap();
        buf.put_string("héllo").unwrap();
        buf.put_packed_len(128).unwrap();
        buf.put_prefixed_bytes(&[9, 8]).unwrap();

        let mut cursor = Cursor::new(buf.freeze());
        assert_eq!(cursor.read_u8().unwrap(), 3);
        assert_eq!(cursor.read_count().unwrap(), 42);
        assert_eq!(cursor.read_string().unwrap(), "héllo");
        assert_eq!(cursor.read_packed_len().unwrap(), 128);
        assert_eq!(cursor.read_prefixed_bytes().unwrap().as_ref(), &[9, 8]);
    }

    #[test]
    fn oversized_count_is_rejected() {
        let mut buf = BytesMut::new();
        let err = buf.put_count(i32::MAX as usize + 1).unwrap_err();
        assert_eq!(err.kind(), sbdf_error::ErrorKind::InvalidSize);
        assert!(buf.is_empty());
    }
}
