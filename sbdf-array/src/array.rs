use std::fmt::{Display, Formatter};

use num_enum::{IntoPrimitive, TryFromPrimitive};
use sbdf_dtype::ValueType;
use sbdf_error::{SbdfResult, sbdf_bail, sbdf_err};

use crate::bitarray::BitArray;
use crate::runlength::RunLengthArray;
use crate::values::Values;

/// The encodings a [`ValueArray`] can be stored in. The discriminant is the wire id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum ValueArrayEncoding {
    /// Every element stored as is.
    Plain = 0x01,
    /// Runs of equal elements stored once with a repeat count.
    RunLength = 0x02,
    /// Booleans packed one per bit. Only legal for [`ValueType::Bool`].
    BitArray = 0x03,
}

impl ValueArrayEncoding {
    /// The id of this encoding on the wire.
    pub fn id(self) -> u8 {
        self.into()
    }

    /// Parse a wire id, failing with `UnknownValueArrayEncoding` for unknown ids.
    pub fn from_id(id: u8) -> SbdfResult<Self> {
        Self::try_from(id)
            .map_err(|_| sbdf_err!(UnknownValueArrayEncoding: "unknown value array encoding 0x{:02x}", id))
    }

    /// Whether values of `value_type` may be stored in this encoding.
    pub fn supports(self, value_type: ValueType) -> bool {
        match self {
            ValueArrayEncoding::Plain | ValueArrayEncoding::RunLength => true,
            ValueArrayEncoding::BitArray => value_type == ValueType::Bool,
        }
    }
}

impl Display for ValueArrayEncoding {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ValueArrayEncoding::Plain => "plain",
            ValueArrayEncoding::RunLength => "run-length",
            ValueArrayEncoding::BitArray => "bit-array",
        })
    }
}

/// An encoded sequence of values, as stored in a column slice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueArray {
    /// Every element stored as is.
    Plain(Values),
    /// Runs of equal elements.
    RunLength(RunLengthArray),
    /// Packed booleans.
    BitArray(BitArray),
}

impl ValueArray {
    /// Encode `values` with `encoding`.
    ///
    /// Fails with `ValueTypesMustBeEqual` when the encoding does not support the value type.
    pub fn encode(values: &Values, encoding: ValueArrayEncoding) -> SbdfResult<Self> {
        if !encoding.supports(values.value_type()) {
            sbdf_bail!(
                ValueTypesMustBeEqual: "{} encoding cannot hold {} values",
                encoding,
                values.value_type()
            );
        }
        Ok(match encoding {
            ValueArrayEncoding::Plain => ValueArray::Plain(values.clone()),
            ValueArrayEncoding::RunLength => ValueArray::RunLength(RunLengthArray::encode(values)?),
            ValueArrayEncoding::BitArray => ValueArray::BitArray(BitArray::from_bools(&values.as_bools()?)),
        })
    }

    /// Encode with the default encoding for the type: bit-packed for Bool, plain otherwise.
    pub fn create_default(values: &Values) -> Self {
        match values.as_bools() {
            Ok(bools) => ValueArray::BitArray(BitArray::from_bools(&bools)),
            Err(_) => ValueArray::Plain(values.clone()),
        }
    }

    /// A bit-packed array of booleans, the usual shape of an invalid-row mask.
    pub fn from_bools(values: &[bool]) -> Self {
        ValueArray::BitArray(BitArray::from_bools(values))
    }

    /// Expand into one element per row.
    pub fn decode(&self) -> SbdfResult<Values> {
        match self {
            ValueArray::Plain(values) => Ok(values.clone()),
            ValueArray::RunLength(array) => array.decode(),
            ValueArray::BitArray(bits) => Ok(Values::from_bools(&bits.to_bools())),
        }
    }

    /// The number of rows, without decoding.
    pub fn row_count(&self) -> usize {
        match self {
            ValueArray::Plain(values) => values.len(),
            ValueArray::RunLength(array) => array.row_count(),
            ValueArray::BitArray(bits) => bits.len(),
        }
    }

    /// The type of the encoded elements.
    pub fn value_type(&self) -> ValueType {
        match self {
            ValueArray::Plain(values) => values.value_type(),
            ValueArray::RunLength(array) => array.values().value_type(),
            ValueArray::BitArray(_) => ValueType::Bool,
        }
    }

    /// The encoding of this array.
    pub fn encoding(&self) -> ValueArrayEncoding {
        match self {
            ValueArray::Plain(_) => ValueArrayEncoding::Plain,
            ValueArray::RunLength(_) => ValueArrayEncoding::RunLength,
            ValueArray::BitArray(_) => ValueArrayEncoding::BitArray,
        }
    }
}
