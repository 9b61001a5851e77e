use bytes::Bytes;
use sbdf_dtype::ValueType;
use sbdf_error::{SbdfResult, sbdf_bail, sbdf_err};

use crate::buffer::{FixedWidthBuffer, VarBinBuilder};
use crate::value::{Value, type_mismatch};
use crate::values::{Storage, Values};

#[derive(Debug)]
enum BuilderStorage {
    Fixed { width: usize, bytes: Vec<u8> },
    Variable(VarBinBuilder),
}

/// Accumulates elements of one [`ValueType`] into a [`Values`].
#[derive(Debug)]
pub struct ValuesBuilder {
    value_type: ValueType,
    storage: BuilderStorage,
    len: usize,
}

impl ValuesBuilder {
    /// An empty builder.
    pub fn new(value_type: ValueType) -> Self {
        let storage = match value_type.fixed_width() {
            Some(width) => BuilderStorage::Fixed {
                width,
                bytes: Vec::new(),
            },
            None => BuilderStorage::Variable(VarBinBuilder::default()),
        };
        Self {
            value_type,
            storage,
            len: 0,
        }
    }

    /// An empty builder with room for `capacity` elements.
    ///
    /// `capacity` is usually a count read from a stream, so a failed allocation is reported as
    /// `OutOfMemory` rather than aborting.
    pub fn try_with_capacity(value_type: ValueType, capacity: usize) -> SbdfResult<Self> {
        let mut builder = Self::new(value_type);
        builder.try_reserve(capacity, 0)?;
        Ok(builder)
    }

    /// Reserve room for `additional` more elements. For variable-width types
    /// `additional_bytes` is the total payload expected.
    pub fn try_reserve(&mut self, additional: usize, additional_bytes: usize) -> SbdfResult<()> {
        match &mut self.storage {
            BuilderStorage::Fixed { width, bytes } => {
                let needed = additional.checked_mul(*width).ok_or_else(
                    || sbdf_err!(OutOfMemory: "{} elements of width {} overflow", additional, width),
                )?;
                bytes
                    .try_reserve(needed)
                    .map_err(|e| sbdf_err!(OutOfMemory: "cannot reserve {} bytes: {}", needed, e))
            }
            BuilderStorage::Variable(builder) => builder.try_reserve(additional, additional_bytes),
        }
    }

    /// The type of the elements being built.
    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    /// The number of elements appended so far.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether nothing has been appended.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Append a single element.
    pub fn append_value(&mut self, value: &Value) -> SbdfResult<()> {
        if value.value_type() != self.value_type {
            return Err(type_mismatch(self.value_type, value));
        }
        match &mut self.storage {
            BuilderStorage::Fixed { bytes, .. } => value.write_element(bytes),
            BuilderStorage::Variable(builder) => {
                let mut element = Vec::new();
                value.write_element(&mut element);
                builder.append_value(&element);
            }
        }
        self.len += 1;
        Ok(())
    }

    /// Append every element of `values`.
    pub fn append_values(&mut self, values: &Values) -> SbdfResult<()> {
        if values.value_type() != self.value_type {
            sbdf_bail!(
                ValueTypesMustBeEqual: "cannot append {} values to a {} builder",
                values.value_type(),
                self.value_type
            );
        }
        match (&mut self.storage, values.storage()) {
            (BuilderStorage::Fixed { bytes, .. }, Storage::Fixed(buffer)) => {
                bytes.extend_from_slice(buffer.bytes());
            }
            (BuilderStorage::Variable(builder), Storage::Variable(buffer)) => {
                for element in buffer.iter() {
                    builder.append_value(element);
                }
            }
            _ => sbdf_bail!("storage does not match value type {}", self.value_type),
        }
        self.len += values.len();
        Ok(())
    }

    /// Append the raw wire bytes of one element, repeated `times` times.
    ///
    /// Fixed-width elements must be exactly the type's width and String elements valid UTF-8.
    /// Any non-zero Bool byte is stored as `1`.
    pub fn append_element_bytes(&mut self, element: &[u8], times: usize) -> SbdfResult<()> {
        match &mut self.storage {
            BuilderStorage::Fixed { width, bytes } => {
                if element.len() != *width {
                    sbdf_bail!(
                        InvalidSize: "{} element must be {} bytes, got {}",
                        self.value_type,
                        width,
                        element.len()
                    );
                }
                if self.value_type == ValueType::Bool {
                    let byte = u8::from(element.iter().any(|&b| b != 0));
                    bytes.resize(bytes.len() + times, byte);
                } else {
                    for _ in 0..times {
                        bytes.extend_from_slice(element);
                    }
                }
            }
            BuilderStorage::Variable(builder) => {
                if self.value_type == ValueType::String {
                    std::str::from_utf8(element)
                        .map_err(|e| sbdf_err!("string element is not valid UTF-8: {}", e))?;
                }
                for _ in 0..times {
                    builder.append_value(element);
                }
            }
        }
        self.len += times;
        Ok(())
    }

    /// Append `count` missing-value placeholders.
    pub fn append_missing(&mut self, count: usize) {
        match &mut self.storage {
            // every placeholder is all zero bytes
            BuilderStorage::Fixed { width, bytes } => bytes.resize(bytes.len() + count * *width, 0),
            BuilderStorage::Variable(builder) => {
                for _ in 0..count {
                    builder.append_value(&[]);
                }
            }
        }
        self.len += count;
    }

    /// Finish into an immutable [`Values`].
    pub fn finish(self) -> Values {
        let storage = match self.storage {
            BuilderStorage::Fixed { width, bytes } => {
                Storage::Fixed(FixedWidthBuffer::from_parts(width, Bytes::from(bytes)))
            }
            BuilderStorage::Variable(builder) => Storage::Variable(builder.finish()),
        };
        Values::from_storage(self.value_type, storage)
    }
}

#[cfg(test)]
mod test {
    use sbdf_error::ErrorKind;

    use super::*;

    #[test]
    fn bool_elements_are_zero_or_one() {
        let mut builder = ValuesBuilder::new(ValueType::Bool);
        builder.append_element_bytes(&[0x02], 2).unwrap();
        builder.append_element_bytes(&[0x00], 1).unwrap();
        assert_eq!(builder.finish(), Values::from_bools(&[true, true, false]));
    }

    #[test]
    fn appends_values_and_elements() {
        let mut builder = ValuesBuilder::try_with_capacity(ValueType::Int32, 4).unwrap();
        builder.append_values(&Values::from_i32s(&[1, 2])).unwrap();
        builder.append_value(&Value::Int32(3)).unwrap();
        builder.append_element_bytes(&4i32.to_le_bytes(), 2).unwrap();
        builder.append_missing(1);
        assert_eq!(builder.len(), 6);
        assert_eq!(builder.finish().as_i32s().unwrap(), vec![1, 2, 3, 4, 4, 0]);
    }

    #[test]
    fn rejects_other_types() {
        let mut builder = ValuesBuilder::new(ValueType::String);
        assert_eq!(
            builder
                .append_values(&Values::from_bools(&[true]))
                .unwrap_err()
                .kind(),
            ErrorKind::ValueTypesMustBeEqual
        );
        assert_eq!(
            builder.append_value(&Value::Bool(true)).unwrap_err().kind(),
            ErrorKind::ValueTypesMustBeEqual
        );
        builder.append_values(&Values::from_strs(["a", "b"])).unwrap();
        builder.append_element_bytes(b"c", 1).unwrap();
        assert_eq!(builder.finish(), Values::from_strs(["a", "b", "c"]));
    }

    #[test]
    fn huge_reservation_is_out_of_memory() {
        let err = ValuesBuilder::try_with_capacity(ValueType::Decimal, usize::MAX / 2).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OutOfMemory);
    }
}
