use sbdf_error::{SbdfResult, sbdf_bail, sbdf_err};

/// The most bytes a 7-bit packed `i32` can occupy.
pub const MAX_PACKED_LEN: usize = 5;

const PAYLOAD_MASK: u8 = 0x7F;
const CONTINUATION: u8 = 0x80;

/// The number of bytes [`encode_packed`] emits for `value`.
pub const fn packed_size(value: u32) -> usize {
    if value < 1 << 7 {
        1
    } else if value < 1 << 14 {
        2
    } else if value < 1 << 21 {
        3
    } else if value < 1 << 28 {
        4
    } else {
        MAX_PACKED_LEN
    }
}

/// Encode `value` seven bits at a time, least significant group first. Every byte except the
/// last has its high bit set.
pub fn encode_packed(mut value: u32, out: &mut Vec<u8>) {
    while value > u32::from(PAYLOAD_MASK) {
        out.push((value.to_le_bytes()[0] & PAYLOAD_MASK) | CONTINUATION);
        value >>= 7;
    }
    out.push(value.to_le_bytes()[0]);
}

/// Decode a packed length from successive bytes supplied by `next_byte`.
pub(crate) fn decode_packed(
    mut next_byte: impl FnMut() -> SbdfResult<u8>,
) -> SbdfResult<usize> {
    let mut value = 0u64;
    for group in 0..MAX_PACKED_LEN {
        let byte = next_byte()?;
        value |= u64::from(byte & PAYLOAD_MASK) << (7 * group);
        if byte & CONTINUATION == 0 {
            return i32::try_from(value)
                .ok()
                .and_then(|v| usize::try_from(v).ok())
                .ok_or_else(|| sbdf_err!(InvalidSize: "packed length {} exceeds i32::MAX", value));
        }
    }
    sbdf_bail!(InvalidSize: "packed length longer than {} bytes", MAX_PACKED_LEN)
}

#[cfg(test)]
mod test {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(0, &[0x00])]
    #[case(0x7F, &[0x7F])]
    #[case(0x80, &[0x80, 0x01])]
    #[case(300, &[0xAC, 0x02])]
    #[case(1 << 21, &[0x80, 0x80, 0x80, 0x01])]
    #[case(i32::MAX as u32, &[0xFF, 0xFF, 0xFF, 0xFF, 0x07])]
    fn packed_layout(#[case] value: u32, #[case] expected: &[u8]) {
        let mut out = Vec::new();
        encode_packed(value, &mut out);
        assert_eq!(out, expected);
        assert_eq!(packed_size(value), expected.len());

        let mut bytes = expected.iter().copied();
        let decoded = decode_packed(|| Ok(bytes.next().unwrap())).unwrap();
        assert_eq!(decoded, value as usize);
    }

    #[test]
    fn overlong_packed_length_is_invalid() {
        let mut bytes = [0x80u8; 6].into_iter();
        let err = decode_packed(|| Ok(bytes.next().unwrap())).unwrap_err();
        assert_eq!(err.kind(), sbdf_error::ErrorKind::InvalidSize);
    }
}
