use std::ops::Range;

use bytes::Bytes;
use sbdf_error::{SbdfResult, sbdf_bail, sbdf_err};

/// Contiguous little-endian elements of a single fixed width.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedWidthBuffer {
    width: usize,
    bytes: Bytes,
}

impl FixedWidthBuffer {
    /// Wrap `bytes` as elements of `width` bytes each.
    pub fn try_new(width: usize, bytes: Bytes) -> SbdfResult<Self> {
        if width == 0 {
            sbdf_bail!("fixed width buffer must have a non-zero width");
        }
        if bytes.len() % width != 0 {
            sbdf_bail!(
                InvalidSize: "{} bytes is not a multiple of the element width {}",
                bytes.len(),
                width
            );
        }
        Ok(Self { width, bytes })
    }

    /// Callers guarantee `bytes` holds whole elements.
    pub(crate) fn from_parts(width: usize, bytes: Bytes) -> Self {
        Self { width, bytes }
    }

    /// The width of one element in bytes.
    pub fn width(&self) -> usize {
        self.width
    }

    /// The number of elements.
    pub fn len(&self) -> usize {
        self.bytes.len() / self.width
    }

    /// Whether the buffer holds no elements.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// All element bytes, back to back.
    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    /// The bytes of element `index`. Panics if out of bounds.
    pub fn element(&self, index: usize) -> &[u8] {
        &self.bytes[index * self.width..(index + 1) * self.width]
    }

    /// Iterate the element bytes.
    pub fn elements(&self) -> impl Iterator<Item = &[u8]> + '_ {
        self.bytes.chunks_exact(self.width)
    }

    /// The elements in `range`, sharing the underlying allocation.
    pub fn slice(&self, range: Range<usize>) -> Self {
        Self {
            width: self.width,
            bytes: self.bytes.slice(range.start * self.width..range.end * self.width),
        }
    }
}

/// Variable-length byte sequences stored in one flat buffer plus an offsets table.
///
/// There is one more offset than elements; element `i` spans `offsets[i]..offsets[i + 1]`.
/// The first offset is always zero and the last equals the length of the data, so two buffers
/// holding the same elements compare equal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VarBinBuffer {
    bytes: Bytes,
    offsets: Vec<usize>,
}

impl Default for VarBinBuffer {
    fn default() -> Self {
        Self {
            bytes: Bytes::new(),
            offsets: vec![0],
        }
    }
}

impl VarBinBuffer {
    /// Validate and wrap a data buffer and its offsets.
    pub fn try_new(bytes: Bytes, offsets: Vec<usize>) -> SbdfResult<Self> {
        match (offsets.first(), offsets.last()) {
            (Some(0), Some(&last)) if last == bytes.len() => {}
            _ => sbdf_bail!(
                InvalidSize: "offsets must start at 0 and end at the data length {}",
                bytes.len()
            ),
        }
        if offsets.windows(2).any(|w| w[0] > w[1]) {
            sbdf_bail!(InvalidSize: "offsets must be non-decreasing");
        }
        Ok(Self { bytes, offsets })
    }

    /// Build a buffer from an iterator of byte sequences.
    pub fn from_iter_nonnull<T: AsRef<[u8]>, I: IntoIterator<Item = T>>(iter: I) -> Self {
        let iter = iter.into_iter();
        let mut builder = VarBinBuilder::with_capacity(iter.size_hint().0);
        for value in iter {
            builder.append_value(value.as_ref());
        }
        builder.finish()
    }

    /// The number of elements.
    pub fn len(&self) -> usize {
        self.offsets.len() - 1
    }

    /// Whether the buffer holds no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The concatenated element bytes.
    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    /// The offsets table, one longer than the element count.
    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    /// The bytes of element `index`. Panics if out of bounds.
    pub fn bytes_at(&self, index: usize) -> &[u8] {
        &self.bytes[self.offsets[index]..self.offsets[index + 1]]
    }

    /// Iterate the element bytes.
    pub fn iter(&self) -> impl Iterator<Item = &[u8]> + '_ {
        self.offsets
            .windows(2)
            .map(|w| &self.bytes[w[0]..w[1]])
    }

    /// The elements in `range`, sharing the data allocation.
    pub fn slice(&self, range: Range<usize>) -> Self {
        let start = self.offsets[range.start];
        let end = self.offsets[range.end];
        Self {
            bytes: self.bytes.slice(start..end),
            offsets: self.offsets[range.start..=range.end]
                .iter()
                .map(|o| o - start)
                .collect(),
        }
    }
}

/// Incrementally builds a [`VarBinBuffer`].
#[derive(Debug)]
pub struct VarBinBuilder {
    bytes: Vec<u8>,
    offsets: Vec<usize>,
}

impl Default for VarBinBuilder {
    fn default() -> Self {
        Self::with_capacity(0)
    }
}

impl VarBinBuilder {
    /// A builder with room for `len` elements.
    pub fn with_capacity(len: usize) -> Self {
        let mut offsets = Vec::with_capacity(len + 1);
        offsets.push(0);
        Self {
            bytes: Vec::new(),
            offsets,
        }
    }

    /// Reserve room for `additional` elements holding `additional_bytes` bytes in total,
    /// failing with `OutOfMemory` when the allocation cannot be made.
    pub fn try_reserve(&mut self, additional: usize, additional_bytes: usize) -> SbdfResult<()> {
        self.offsets
            .try_reserve(additional)
            .map_err(|e| sbdf_err!(OutOfMemory: "cannot reserve {} offsets: {}", additional, e))?;
        self.bytes.try_reserve(additional_bytes).map_err(
            |e| sbdf_err!(OutOfMemory: "cannot reserve {} bytes: {}", additional_bytes, e),
        )?;
        Ok(())
    }

    /// Append one element.
    #[inline]
    pub fn append_value(&mut self, value: &[u8]) {
        self.bytes.extend_from_slice(value);
        self.offsets.push(self.bytes.len());
    }

    /// The number of elements appended so far.
    pub fn len(&self) -> usize {
        self.offsets.len() - 1
    }

    /// Whether nothing has been appended.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Finish into an immutable buffer.
    pub fn finish(self) -> VarBinBuffer {
        VarBinBuffer {
            bytes: Bytes::from(self.bytes),
            offsets: self.offsets,
        }
    }
}
