use std::io::{self, Read};

use bytes::Bytes;
use sbdf_error::{SbdfResult, sbdf_err};

use crate::packed::decode_packed;

/// Extension methods for reading SBDF primitives from a blocking stream.
///
/// A stream that ends early surfaces as [`SbdfError::Io`](sbdf_error::SbdfError::Io) with
/// kind [`UnexpectedEof`](io::ErrorKind::UnexpectedEof).
pub trait SbdfRead: Read {
    /// Read a single byte.
    fn read_u8(&mut self) -> SbdfResult<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    /// Read exactly `N` bytes into an array.
    fn read_array<const N: usize>(&mut self) -> SbdfResult<[u8; N]> {
        let mut buf = [0u8; N];
        self.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Read a little-endian `i32`.
    fn read_i32_le(&mut self) -> SbdfResult<i32> {
        Ok(i32::from_le_bytes(self.read_array()?))
    }

    /// Read a little-endian `i32` that must be a non-negative count or length.
    fn read_count(&mut self) -> SbdfResult<usize> {
        let count = self.read_i32_le()?;
        usize::try_from(count).map_err(|_| sbdf_err!(InvalidSize: "negative count {}", count))
    }

    /// Read exactly `len` bytes.
    ///
    /// The buffer is reserved up front, so a corrupt length fails with
    /// [`OutOfMemory`](sbdf_error::SbdfError::OutOfMemory) instead of aborting.
    fn read_bytes(&mut self, len: usize) -> SbdfResult<Bytes> {
        let mut buf = Vec::new();
        buf.try_reserve_exact(len)
            .map_err(|e| sbdf_err!(OutOfMemory: "cannot allocate {} bytes: {}", len, e))?;
        let read = (&mut *self).take(len as u64).read_to_end(&mut buf)?;
        if read != len {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("expected {len} bytes, stream ended after {read}"),
            )
            .into());
        }
        Ok(Bytes::from(buf))
    }

    /// Read an `i32` byte length followed by that many bytes.
    fn read_prefixed_bytes(&mut self) -> SbdfResult<Bytes> {
        let len = self.read_count()?;
        self.read_bytes(len)
    }

    /// Read an `i32` byte length followed by that many bytes of UTF-8.
    fn read_string(&mut self) -> SbdfResult<String> {
        let bytes = self.read_prefixed_bytes()?;
        Ok(String::from_utf8(bytes.to_vec())?)
    }

    /// Read a 7-bit packed length.
    fn read_packed_len(&mut self) -> SbdfResult<usize> {
        decode_packed(|| self.read_u8())
    }

    /// Consume and discard exactly `len` bytes.
    fn skip_bytes(&mut self, len: usize) -> SbdfResult<()> {
        let skipped = io::copy(&mut (&mut *self).take(len as u64), &mut io::sink())?;
        if skipped != len as u64 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("expected to skip {len} bytes, stream ended after {skipped}"),
            )
            .into());
        }
        Ok(())
    }

    /// Skip an `i32` length-prefixed string or byte sequence.
    fn skip_prefixed_bytes(&mut self) -> SbdfResult<()> {
        let len = self.read_count()?;
        self.skip_bytes(len)
    }
}

impl<R: Read + ?Sized> SbdfRead for R {}
