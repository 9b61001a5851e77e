use bytes::Bytes;
use sbdf_error::{SbdfResult, sbdf_bail};

/// Booleans packed one per bit, most significant bit first, with the final byte zero padded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitArray {
    len: usize,
    bits: Bytes,
}

impl BitArray {
    /// Wrap `len` packed bits.
    pub fn try_new(len: usize, bits: Bytes) -> SbdfResult<Self> {
        if bits.len() != packed_len(len) {
            sbdf_bail!(
                InvalidSize: "{} bits need {} bytes, got {}",
                len,
                packed_len(len),
                bits.len()
            );
        }
        Ok(Self { len, bits })
    }

    /// Pack a slice of booleans.
    pub fn from_bools(values: &[bool]) -> Self {
        let mut bits = vec![0u8; packed_len(values.len())];
        for (idx, _) in values.iter().enumerate().filter(|(_, v)| **v) {
            bits[idx / 8] |= 0x80 >> (idx % 8);
        }
        Self {
            len: values.len(),
            bits: Bytes::from(bits),
        }
    }

    /// Unpack into one boolean per bit.
    pub fn to_bools(&self) -> Vec<bool> {
        (0..self.len).map(|idx| self.value(idx)).collect()
    }

    /// Bit `idx`. Panics if out of bounds.
    #[inline]
    pub fn value(&self, idx: usize) -> bool {
        self.bits[idx / 8] & (0x80 >> (idx % 8)) != 0
    }

    /// The number of bits.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether there are no bits.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The packed bytes.
    pub fn bits(&self) -> &Bytes {
        &self.bits
    }
}

/// The number of bytes needed to pack `len` bits.
pub const fn packed_len(len: usize) -> usize {
    len.div_ceil(8)
}
