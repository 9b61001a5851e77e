//! The wire form of value arrays and single values.
//!
//! ```text
//! value array   := u8 encoding, u8 type id, body
//! plain         := packed array
//! run length    := i32 row count, packed array of run bytes, packed array of values
//! bit array     := i32 bit count, ceil(bit count / 8) bytes
//! packed array  := i32 count, then
//!                  fixed width:    count * width bytes
//!                  variable width: i32 byte size, (7-bit packed length, bytes)*
//! single value  := fixed width bytes | i32 length, bytes
//! optional      := u8 present, [single value]
//! ```

use std::io::Read;

use bytes::{BufMut, Bytes};
use sbdf_dtype::ValueType;
use sbdf_error::{SbdfResult, sbdf_bail, sbdf_err};
use sbdf_io::{SbdfBufMut, SbdfRead, packed_size};

use crate::array::{ValueArray, ValueArrayEncoding};
use crate::bitarray::{BitArray, packed_len};
use crate::builder::ValuesBuilder;
use crate::runlength::RunLengthArray;
use crate::value::Value;
use crate::values::{Storage, Values};

fn packed_element_size(len: usize) -> SbdfResult<usize> {
    let len32 = u32::try_from(len)
        .map_err(|_| sbdf_err!(InvalidSize: "element of {} bytes is too large", len))?;
    Ok(packed_size(len32) + len)
}

fn fixed_byte_len(value_type: ValueType, width: usize, count: usize) -> SbdfResult<usize> {
    count
        .checked_mul(width)
        .ok_or_else(|| sbdf_err!(InvalidSize: "{} {} elements overflow", count, value_type))
}

/// Append `values` as a packed array.
pub fn write_packed_values<B: BufMut>(buf: &mut B, values: &Values) -> SbdfResult<()> {
    buf.put_count(values.len())?;
    match values.storage() {
        Storage::Fixed(buffer) => buf.put_slice(buffer.bytes()),
        Storage::Variable(buffer) => {
            let mut byte_size = 0usize;
            for element in buffer.iter() {
                byte_size += packed_element_size(element.len())?;
            }
            buf.put_count(byte_size)?;
            for element in buffer.iter() {
                buf.put_packed_len(element.len())?;
                buf.put_slice(element);
            }
        }
    }
    Ok(())
}

/// Read a packed array of `value_type`.
pub fn read_packed_values<R: Read + ?Sized>(read: &mut R, value_type: ValueType) -> SbdfResult<Values> {
    let count = read.read_count()?;
    match value_type.fixed_width() {
        Some(width) => {
            let bytes = read.read_bytes(fixed_byte_len(value_type, width, count)?)?;
            Values::try_new(value_type, count, bytes)
        }
        None => {
            let byte_size = read.read_count()?;
            let data = read.read_bytes(byte_size)?;
            let mut builder = ValuesBuilder::new(value_type);
            // the count may be corrupt, every element takes at least one length byte
            builder.try_reserve(count.min(byte_size), byte_size)?;
            let mut cursor: &[u8] = &data;
            for idx in 0..count {
                let len = cursor.read_packed_len()?;
                if len > cursor.len() {
                    sbdf_bail!(
                        InvalidSize: "element {} of {} bytes overruns the array byte size {}",
                        idx,
                        len,
                        byte_size
                    );
                }
                let (element, rest) = cursor.split_at(len);
                builder.append_element_bytes(element, 1)?;
                cursor = rest;
            }
            if !cursor.is_empty() {
                sbdf_bail!(
                    InvalidSize: "{} trailing bytes after {} elements",
                    cursor.len(),
                    count
                );
            }
            Ok(builder.finish())
        }
    }
}

/// Skip a packed array of `value_type` using only its lengths.
pub fn skip_packed_values<R: Read + ?Sized>(read: &mut R, value_type: ValueType) -> SbdfResult<()> {
    let count = read.read_count()?;
    let len = match value_type.fixed_width() {
        Some(width) => fixed_byte_len(value_type, width, count)?,
        None => read.read_count()?,
    };
    read.skip_bytes(len)
}

fn packed_values_len(values: &Values) -> SbdfResult<usize> {
    Ok(4 + match values.storage() {
        Storage::Fixed(buffer) => buffer.bytes().len(),
        Storage::Variable(buffer) => {
            let mut byte_size = 4;
            for element in buffer.iter() {
                byte_size += packed_element_size(element.len())?;
            }
            byte_size
        }
    })
}

impl ValueArray {
    /// Append the wire form of this array.
    pub fn write<B: BufMut>(&self, buf: &mut B) -> SbdfResult<()> {
        buf.put_u8(self.encoding().id());
        buf.put_u8(self.value_type().id());
        match self {
            ValueArray::Plain(values) => write_packed_values(buf, values),
            ValueArray::RunLength(array) => {
                buf.put_count(array.row_count())?;
                buf.put_count(array.runs().len())?;
                buf.put_slice(array.runs());
                write_packed_values(buf, array.values())
            }
            ValueArray::BitArray(bits) => {
                buf.put_count(bits.len())?;
                buf.put_slice(bits.bits());
                Ok(())
            }
        }
    }

    /// The number of bytes [`ValueArray::write`] produces.
    pub fn encoded_len(&self) -> SbdfResult<usize> {
        Ok(2 + match self {
            ValueArray::Plain(values) => packed_values_len(values)?,
            ValueArray::RunLength(array) => {
                4 + 4 + array.runs().len() + packed_values_len(array.values())?
            }
            ValueArray::BitArray(bits) => 4 + bits.bits().len(),
        })
    }

    fn read_header<R: Read + ?Sized>(read: &mut R) -> SbdfResult<(ValueArrayEncoding, ValueType)> {
        let encoding = ValueArrayEncoding::from_id(read.read_u8()?)?;
        let value_type = ValueType::from_id(read.read_u8()?)?;
        if !encoding.supports(value_type) {
            sbdf_bail!(
                ValueTypesMustBeEqual: "{} encoding cannot hold {} values",
                encoding,
                value_type
            );
        }
        Ok((encoding, value_type))
    }

    /// Read an array from its wire form.
    pub fn read<R: Read + ?Sized>(read: &mut R) -> SbdfResult<Self> {
        let (encoding, value_type) = Self::read_header(read)?;
        Ok(match encoding {
            ValueArrayEncoding::Plain => ValueArray::Plain(read_packed_values(read, value_type)?),
            ValueArrayEncoding::RunLength => {
                let row_count = read.read_count()?;
                let run_count = read.read_count()?;
                let runs = read.read_bytes(run_count)?;
                let values = read_packed_values(read, value_type)?;
                ValueArray::RunLength(RunLengthArray::try_new(row_count, runs, values)?)
            }
            ValueArrayEncoding::BitArray => {
                let len = read.read_count()?;
                let bits = read.read_bytes(packed_len(len))?;
                ValueArray::BitArray(BitArray::try_new(len, bits)?)
            }
        })
    }

    /// Skip an array using only its lengths.
    pub fn skip<R: Read + ?Sized>(read: &mut R) -> SbdfResult<()> {
        let (encoding, value_type) = Self::read_header(read)?;
        match encoding {
            ValueArrayEncoding::Plain => skip_packed_values(read, value_type),
            ValueArrayEncoding::RunLength => {
                read.read_count()?;
                let run_count = read.read_count()?;
                read.skip_bytes(run_count)?;
                skip_packed_values(read, value_type)
            }
            ValueArrayEncoding::BitArray => {
                let len = read.read_count()?;
                read.skip_bytes(packed_len(len))
            }
        }
    }
}

impl Value {
    /// Append this value in single-value form.
    pub fn write<B: BufMut>(&self, buf: &mut B) -> SbdfResult<()> {
        let mut element = Vec::new();
        self.write_element(&mut element);
        if self.value_type().is_variable() {
            buf.put_prefixed_bytes(&element)
        } else {
            buf.put_slice(&element);
            Ok(())
        }
    }

    /// Read a single value of `value_type`.
    pub fn read<R: Read + ?Sized>(read: &mut R, value_type: ValueType) -> SbdfResult<Self> {
        let bytes: Bytes = match value_type.fixed_width() {
            Some(width) => read.read_bytes(width)?,
            None => read.read_prefixed_bytes()?,
        };
        Value::from_element(value_type, &bytes)
    }

    /// Skip a single value of `value_type`.
    pub fn skip<R: Read + ?Sized>(read: &mut R, value_type: ValueType) -> SbdfResult<()> {
        match value_type.fixed_width() {
            Some(width) => read.skip_bytes(width),
            None => read.skip_prefixed_bytes(),
        }
    }
}

/// Append a presence flag followed by the value, if any.
pub fn write_optional_value<B: BufMut>(buf: &mut B, value: Option<&Value>) -> SbdfResult<()> {
    match value {
        None => {
            buf.put_u8(0);
            Ok(())
        }
        Some(value) => {
            buf.put_u8(1);
            value.write(buf)
        }
    }
}

/// Read a presence flag followed by the value, if present. Any non-zero flag means present.
pub fn read_optional_value<R: Read + ?Sized>(
    read: &mut R,
    value_type: ValueType,
) -> SbdfResult<Option<Value>> {
    if read.read_u8()? == 0 {
        return Ok(None);
    }
    Value::read(read, value_type).map(Some)
}

#[cfg(test)]
mod test {
    use std::io::Cursor;

    use bytes::BytesMut;
    use rstest::rstest;
    use sbdf_dtype::Decimal;
    use sbdf_error::ErrorKind;

    use super::*;

    fn encode(array: &ValueArray) -> Bytes {
        let mut buf = BytesMut::new();
        array.write(&mut buf).unwrap();
        assert_eq!(buf.len(), array.encoded_len().unwrap());
        buf.freeze()
    }

    #[test]
    fn plain_int_layout() {
        let bytes = encode(&ValueArray::Plain(Values::from_i32s(&[1, -1])));
        assert_eq!(
            bytes.as_ref(),
            &[0x01, 0x02, 2, 0, 0, 0, 1, 0, 0, 0, 0xFF, 0xFF, 0xFF, 0xFF]
        );
    }

    #[test]
    fn plain_string_layout() {
        let bytes = encode(&ValueArray::Plain(Values::from_strs(["ab", ""])));
        assert_eq!(
            bytes.as_ref(),
            &[0x01, 0x0A, 2, 0, 0, 0, 4, 0, 0, 0, 2, b'a', b'b', 0]
        );
    }

    #[test]
    fn bit_array_layout() {
        let bytes = encode(&ValueArray::from_bools(&[true, false, true]));
        assert_eq!(bytes.as_ref(), &[0x03, 0x01, 3, 0, 0, 0, 0b1010_0000]);
    }

    #[test]
    fn run_length_layout() {
        let array = ValueArray::encode(&Values::from_bools(&[true, true, false]), ValueArrayEncoding::RunLength)
            .unwrap();
        let bytes = encode(&array);
        assert_eq!(
            bytes.as_ref(),
            &[0x02, 0x01, 3, 0, 0, 0, 2, 0, 0, 0, 1, 0, 2, 0, 0, 0, 1, 0]
        );
    }

    #[rstest]
    #[case(Values::from_bools(&[true, false, true, true, true, false, false, false, false, true, true]))]
    #[case(Values::from_i64s(&[5, 5, 5, 5, 6]))]
    #[case(Values::from_f64s(&[1.5; 40]))]
    #[case(Values::from_strs(["repeat"; 30].into_iter().chain(["other"])))]
    #[case(Values::from_binaries([b"\x01\x02".as_slice(); 3]))]
    #[case(Values::from_decimals(&["1.25".parse::<Decimal>().unwrap(); 8]))]
    fn read_inverts_write(#[case] values: Values) {
        for encoding in [
            ValueArrayEncoding::Plain,
            ValueArrayEncoding::RunLength,
            ValueArrayEncoding::BitArray,
        ] {
            let Ok(array) = ValueArray::encode(&values, encoding) else {
                continue;
            };
            let bytes = encode(&array);
            let decoded = ValueArray::read(&mut Cursor::new(bytes.clone())).unwrap();
            assert_eq!(decoded, array);
            assert_eq!(decoded.decode().unwrap(), values);

            let mut cursor = Cursor::new(bytes.clone());
            ValueArray::skip(&mut cursor).unwrap();
            assert_eq!(cursor.position(), bytes.len() as u64);
        }
    }

    // row count and run byte count, each an i32
    const RUN_LENGTH_OVERHEAD: usize = 8;

    #[rstest]
    #[case(Values::from_i32s(&[3, 3, 3, 3, 3, 3, 3, 3]))]
    #[case(Values::from_strs(["aaaa", "aaaa"]))]
    #[case(Values::from_strs(["aaaaaaaaaaaa", "aaaaaaaaaaaa", "b"]))]
    #[case(Values::from_decimals(&[Decimal::ZERO, Decimal::ZERO]))]
    #[case(Values::from_bools(&[true, true, false]))]
    fn run_length_costs_header_and_run_bytes(#[case] values: Values) {
        let rle = ValueArray::encode(&values, ValueArrayEncoding::RunLength).unwrap();
        let ValueArray::RunLength(runs) = &rle else {
            unreachable!()
        };
        let distinct = ValueArray::Plain(runs.values().clone());
        assert_eq!(
            rle.encoded_len().unwrap(),
            distinct.encoded_len().unwrap() + RUN_LENGTH_OVERHEAD + runs.runs().len()
        );

        let plain = ValueArray::Plain(values);
        let saved = plain.encoded_len().unwrap() - distinct.encoded_len().unwrap();
        assert_eq!(
            rle.encoded_len().unwrap() <= plain.encoded_len().unwrap(),
            saved >= RUN_LENGTH_OVERHEAD + runs.runs().len()
        );
    }

    #[rstest]
    #[case(Values::from_i32s(&[3, 3, 3, 3, 3, 3, 3, 3]), true)]
    #[case(Values::from_decimals(&[Decimal::ZERO, Decimal::ZERO]), true)]
    #[case(Values::from_strs(["aaaa", "aaaa"]), false)]
    #[case(Values::from_i32s(&[3, 3]), false)]
    fn run_length_pays_off_only_past_its_header(#[case] values: Values, #[case] smaller: bool) {
        let plain = ValueArray::encode(&values, ValueArrayEncoding::Plain).unwrap();
        let rle = ValueArray::encode(&values, ValueArrayEncoding::RunLength).unwrap();
        assert_eq!(rle.encoded_len().unwrap() <= plain.encoded_len().unwrap(), smaller);
        assert_eq!(rle.decode().unwrap(), values);
    }

    #[test]
    fn plain_bools_read_as_zero_or_one() {
        let bytes = [0x01u8, 0x01, 4, 0, 0, 0, 0, 1, 2, 0xFF];
        let values = ValueArray::read(&mut Cursor::new(&bytes[..]))
            .unwrap()
            .decode()
            .unwrap();
        assert_eq!(values, Values::from_bools(&[false, true, true, true]));

        let bits = ValueArray::encode(&values, ValueArrayEncoding::BitArray).unwrap();
        assert_eq!(bits.decode().unwrap(), values);
        let rle = ValueArray::encode(&values, ValueArrayEncoding::RunLength).unwrap();
        assert_eq!(rle.decode().unwrap(), values);
        let ValueArray::RunLength(runs) = rle else {
            unreachable!()
        };
        assert_eq!(runs.runs().as_ref(), &[0, 2]);
    }

    #[rstest]
    #[case(&[0x07, 0x01], ErrorKind::UnknownValueArrayEncoding)]
    #[case(&[0x01, 0x0B], ErrorKind::UnknownTypeId)]
    #[case(&[0x03, 0x02, 0, 0, 0, 0], ErrorKind::ValueTypesMustBeEqual)]
    #[case(&[0x01, 0x02, 0xFF, 0xFF, 0xFF, 0xFF], ErrorKind::InvalidSize)]
    #[case(&[0x01, 0x0A, 1, 0, 0, 0, 1, 0, 0, 0, 5, b'a'], ErrorKind::InvalidSize)]
    fn rejects_malformed(#[case] bytes: &[u8], #[case] kind: ErrorKind) {
        let err = ValueArray::read(&mut Cursor::new(bytes)).unwrap_err();
        assert_eq!(err.kind(), kind);
    }

    #[test]
    fn truncated_array_is_eof() {
        let err = ValueArray::read(&mut Cursor::new(&[0x01u8, 0x02, 2, 0, 0, 0, 1, 0][..])).unwrap_err();
        assert!(err.is_unexpected_eof());
    }

    #[rstest]
    #[case(None)]
    #[case(Some(Value::from("name")))]
    #[case(Some(Value::Int32(42)))]
    #[case(Some(Value::Binary(Bytes::from_static(&[0x05]))))]
    fn optional_values(#[case] value: Option<Value>) {
        let mut buf = BytesMut::new();
        write_optional_value(&mut buf, value.as_ref()).unwrap();
        let value_type = value.as_ref().map_or(ValueType::Int32, Value::value_type);
        let read = read_optional_value(&mut Cursor::new(buf.freeze()), value_type).unwrap();
        assert_eq!(read, value);
    }

    #[test]
    fn single_string_layout() {
        let mut buf = BytesMut::new();
        Value::from("ab").write(&mut buf).unwrap();
        assert_eq!(buf.as_ref(), &[2, 0, 0, 0, b'a', b'b']);
        let mut cursor = Cursor::new(buf.freeze());
        Value::skip(&mut cursor, ValueType::String).unwrap();
        assert_eq!(cursor.position(), 6);
    }
}
