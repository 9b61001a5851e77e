use std::ops::Range;

use bytes::Bytes;
use sbdf_dtype::{DECIMAL_WIDTH, Decimal, ValueType};
use sbdf_error::{SbdfResult, sbdf_bail, sbdf_err};

use crate::buffer::{FixedWidthBuffer, VarBinBuffer, VarBinBuilder};
use crate::builder::ValuesBuilder;
use crate::value::{Value, array, element_value};

/// The physical layout of a [`Values`] sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Storage {
    /// Elements of the type's fixed width, back to back.
    Fixed(FixedWidthBuffer),
    /// Length-delimited elements for String and Binary.
    Variable(VarBinBuffer),
}

/// A sequence of elements that all share one [`ValueType`].
///
/// Equality compares element bytes, so floats are compared bitwise and a NaN equals itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Values {
    value_type: ValueType,
    storage: Storage,
}

impl Values {
    /// Wrap `count` little-endian elements of a fixed-width type.
    ///
    /// Any non-zero Bool byte is stored as `1`.
    pub fn try_new(value_type: ValueType, count: usize, bytes: impl Into<Bytes>) -> SbdfResult<Self> {
        let Some(width) = value_type.fixed_width() else {
            sbdf_bail!("{} is variable width, use Values::try_new_variable", value_type);
        };
        let bytes: Bytes = bytes.into();
        let expected = count
            .checked_mul(width)
            .ok_or_else(|| sbdf_err!(InvalidSize: "{} {} elements overflow", count, value_type))?;
        if bytes.len() != expected {
            sbdf_bail!(
                InvalidSize: "{} {} elements need {} bytes, got {}",
                count,
                value_type,
                expected,
                bytes.len()
            );
        }
        let bytes = if value_type == ValueType::Bool && bytes.iter().any(|&b| b > 1) {
            normalize_bools(&bytes)
        } else {
            bytes
        };
        Ok(Self {
            value_type,
            storage: Storage::Fixed(FixedWidthBuffer::try_new(width, bytes)?),
        })
    }

    /// Wrap variable-length String or Binary elements. String elements must be valid UTF-8.
    pub fn try_new_variable(value_type: ValueType, buffer: VarBinBuffer) -> SbdfResult<Self> {
        if !value_type.is_variable() {
            sbdf_bail!("{} is fixed width, use Values::try_new", value_type);
        }
        if value_type == ValueType::String {
            if let Some(idx) = buffer.iter().position(|b| std::str::from_utf8(b).is_err()) {
                sbdf_bail!("string element {} is not valid UTF-8", idx);
            }
        }
        Ok(Self {
            value_type,
            storage: Storage::Variable(buffer),
        })
    }

    /// An empty sequence of `value_type`.
    pub fn empty(value_type: ValueType) -> Self {
        ValuesBuilder::new(value_type).finish()
    }

    /// `count` copies of the missing-value placeholder of `value_type`.
    pub fn missing(value_type: ValueType, count: usize) -> Self {
        let mut builder = ValuesBuilder::new(value_type);
        builder.append_missing(count);
        builder.finish()
    }

    fn from_fixed<T, const N: usize>(
        value_type: ValueType,
        items: impl IntoIterator<Item = T>,
        to_bytes: impl Fn(T) -> [u8; N],
    ) -> Self {
        let bytes: Vec<u8> = items.into_iter().flat_map(to_bytes).collect();
        Self {
            value_type,
            storage: Storage::Fixed(FixedWidthBuffer::from_parts(N, Bytes::from(bytes))),
        }
    }

    /// Booleans, one byte each.
    pub fn from_bools(values: &[bool]) -> Self {
        Self::from_fixed(ValueType::Bool, values.iter().copied(), |v| [u8::from(v)])
    }

    /// 32-bit integers.
    pub fn from_i32s(values: &[i32]) -> Self {
        Self::from_fixed(ValueType::Int32, values.iter().copied(), i32::to_le_bytes)
    }

    /// 64-bit integers.
    pub fn from_i64s(values: &[i64]) -> Self {
        Self::from_fixed(ValueType::Int64, values.iter().copied(), i64::to_le_bytes)
    }

    /// 32-bit floats.
    pub fn from_f32s(values: &[f32]) -> Self {
        Self::from_fixed(ValueType::Float32, values.iter().copied(), f32::to_le_bytes)
    }

    /// 64-bit floats.
    pub fn from_f64s(values: &[f64]) -> Self {
        Self::from_fixed(ValueType::Float64, values.iter().copied(), f64::to_le_bytes)
    }

    /// Raw millisecond counts of one of the temporal types.
    pub fn from_millis(value_type: ValueType, values: &[i64]) -> SbdfResult<Self> {
        if !value_type.is_temporal() {
            sbdf_bail!(ValueTypesMustBeEqual: "{} is not a temporal type", value_type);
        }
        Ok(Self::from_fixed(value_type, values.iter().copied(), i64::to_le_bytes))
    }

    /// DateTime millisecond counts.
    pub fn from_datetimes(values: &[i64]) -> Self {
        Self::from_fixed(ValueType::DateTime, values.iter().copied(), i64::to_le_bytes)
    }

    /// Date millisecond counts.
    pub fn from_dates(values: &[i64]) -> Self {
        Self::from_fixed(ValueType::Date, values.iter().copied(), i64::to_le_bytes)
    }

    /// Time millisecond counts.
    pub fn from_times(values: &[i64]) -> Self {
        Self::from_fixed(ValueType::Time, values.iter().copied(), i64::to_le_bytes)
    }

    /// TimeSpan millisecond counts.
    pub fn from_timespans(values: &[i64]) -> Self {
        Self::from_fixed(ValueType::TimeSpan, values.iter().copied(), i64::to_le_bytes)
    }

    /// Decimals.
    pub fn from_decimals(values: &[Decimal]) -> Self {
        Self::from_fixed(ValueType::Decimal, values.iter(), Decimal::to_le_bytes)
    }

    /// Strings.
    pub fn from_strs<T: AsRef<str>>(values: impl IntoIterator<Item = T>) -> Self {
        let values = values.into_iter();
        let mut builder = VarBinBuilder::with_capacity(values.size_hint().0);
        for value in values {
            builder.append_value(value.as_ref().as_bytes());
        }
        Self {
            value_type: ValueType::String,
            storage: Storage::Variable(builder.finish()),
        }
    }

    /// Binary blobs.
    pub fn from_binaries<T: AsRef<[u8]>>(values: impl IntoIterator<Item = T>) -> Self {
        Self {
            value_type: ValueType::Binary,
            storage: Storage::Variable(VarBinBuffer::from_iter_nonnull(values)),
        }
    }

    /// Collect single elements, all of which must be of `value_type`.
    pub fn from_values<'a>(
        value_type: ValueType,
        values: impl IntoIterator<Item = &'a Value>,
    ) -> SbdfResult<Self> {
        let mut builder = ValuesBuilder::new(value_type);
        for value in values {
            builder.append_value(value)?;
        }
        Ok(builder.finish())
    }

    pub(crate) fn from_storage(value_type: ValueType, storage: Storage) -> Self {
        Self {
            value_type,
            storage,
        }
    }

    /// The type shared by every element.
    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    /// The physical layout.
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// The number of elements.
    pub fn len(&self) -> usize {
        match &self.storage {
            Storage::Fixed(buffer) => buffer.len(),
            Storage::Variable(buffer) => buffer.len(),
        }
    }

    /// Whether there are no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The wire bytes of element `index`.
    pub fn element_bytes(&self, index: usize) -> SbdfResult<&[u8]> {
        self.check_index(index)?;
        Ok(self.element_unchecked(index))
    }

    fn element_unchecked(&self, index: usize) -> &[u8] {
        match &self.storage {
            Storage::Fixed(buffer) => buffer.element(index),
            Storage::Variable(buffer) => buffer.bytes_at(index),
        }
    }

    fn check_index(&self, index: usize) -> SbdfResult<()> {
        if index >= self.len() {
            sbdf_bail!("index {} out of bounds for {} elements", index, self.len());
        }
        Ok(())
    }

    /// Element `index` as a [`Value`].
    pub fn value(&self, index: usize) -> SbdfResult<Value> {
        self.check_index(index)?;
        Ok(element_value(self.value_type, self.element_unchecked(index)))
    }

    /// Iterate the elements as [`Value`]s.
    pub fn iter(&self) -> impl Iterator<Item = Value> + '_ {
        (0..self.len()).map(|i| element_value(self.value_type, self.element_unchecked(i)))
    }

    /// Iterate the wire bytes of each element.
    pub fn iter_elements(&self) -> Box<dyn Iterator<Item = &[u8]> + '_> {
        match &self.storage {
            Storage::Fixed(buffer) => Box::new(buffer.elements()),
            Storage::Variable(buffer) => Box::new(buffer.iter()),
        }
    }

    fn fixed_as<const N: usize, T>(
        &self,
        expected: &[ValueType],
        from: impl Fn([u8; N]) -> T,
    ) -> SbdfResult<Vec<T>> {
        if !expected.contains(&self.value_type) {
            sbdf_bail!(
                ValueTypesMustBeEqual: "cannot read {} values as {}",
                self.value_type,
                expected[0]
            );
        }
        Ok(self.iter_elements().map(|e| from(array(e))).collect())
    }

    /// The elements of a Bool sequence.
    pub fn as_bools(&self) -> SbdfResult<Vec<bool>> {
        self.fixed_as(&[ValueType::Bool], |[b]: [u8; 1]| b != 0)
    }

    /// The elements of an Int32 sequence.
    pub fn as_i32s(&self) -> SbdfResult<Vec<i32>> {
        self.fixed_as(&[ValueType::Int32], i32::from_le_bytes)
    }

    /// The elements of an Int64 sequence.
    pub fn as_i64s(&self) -> SbdfResult<Vec<i64>> {
        self.fixed_as(&[ValueType::Int64], i64::from_le_bytes)
    }

    /// The elements of a Float32 sequence.
    pub fn as_f32s(&self) -> SbdfResult<Vec<f32>> {
        self.fixed_as(&[ValueType::Float32], f32::from_le_bytes)
    }

    /// The elements of a Float64 sequence.
    pub fn as_f64s(&self) -> SbdfResult<Vec<f64>> {
        self.fixed_as(&[ValueType::Float64], f64::from_le_bytes)
    }

    /// The millisecond counts of a DateTime, Date, Time or TimeSpan sequence.
    pub fn as_millis(&self) -> SbdfResult<Vec<i64>> {
        self.fixed_as(
            &[
                ValueType::DateTime,
                ValueType::Date,
                ValueType::Time,
                ValueType::TimeSpan,
            ],
            i64::from_le_bytes,
        )
    }

    /// The elements of a Decimal sequence.
    pub fn as_decimals(&self) -> SbdfResult<Vec<Decimal>> {
        self.fixed_as::<DECIMAL_WIDTH, _>(&[ValueType::Decimal], Decimal::from_le_bytes)
    }

    /// String element `index`.
    pub fn str_at(&self, index: usize) -> SbdfResult<&str> {
        if self.value_type != ValueType::String {
            sbdf_bail!(ValueTypesMustBeEqual: "cannot read {} values as String", self.value_type);
        }
        std::str::from_utf8(self.element_bytes(index)?)
            .map_err(|e| sbdf_err!("string element {} is not valid UTF-8: {}", index, e))
    }

    /// The elements in `range`.
    pub fn slice(&self, range: Range<usize>) -> SbdfResult<Self> {
        if range.start > range.end || range.end > self.len() {
            sbdf_bail!(
                "slice {}..{} out of bounds for {} elements",
                range.start,
                range.end,
                self.len()
            );
        }
        let storage = match &self.storage {
            Storage::Fixed(buffer) => Storage::Fixed(buffer.slice(range)),
            Storage::Variable(buffer) => Storage::Variable(buffer.slice(range)),
        };
        Ok(Self {
            value_type: self.value_type,
            storage,
        })
    }
}

fn normalize_bools(bytes: &[u8]) -> Bytes {
    bytes.iter().map(|&b| u8::from(b != 0)).collect()
}
