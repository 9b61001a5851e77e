use std::fmt::{Display, Formatter};

use num_enum::{IntoPrimitive, TryFromPrimitive};
use sbdf_error::{SbdfError, sbdf_err};

/// The primitive value types of SBDF.
///
/// The discriminant of each variant is the type id written to the wire. Id `0x0B` is unused
/// by the format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, IntoPrimitive, TryFromPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum ValueType {
    /// A boolean, one byte on the wire
    Bool = 0x01,
    /// A signed 32-bit integer
    Int32 = 0x02,
    /// A signed 64-bit integer
    Int64 = 0x03,
    /// A 32-bit IEEE float
    Float32 = 0x04,
    /// A 64-bit IEEE float
    Float64 = 0x05,
    /// Milliseconds since `0001-01-01T00:00:00`
    DateTime = 0x06,
    /// Milliseconds since `0001-01-01T00:00:00`, truncated to whole days
    Date = 0x07,
    /// Milliseconds since midnight
    Time = 0x08,
    /// A duration in milliseconds
    TimeSpan = 0x09,
    /// UTF-8 text
    String = 0x0A,
    /// Opaque bytes
    Binary = 0x0C,
    /// A decimal128 value, see [`Decimal`](crate::Decimal)
    Decimal = 0x0D,
}

impl ValueType {
    /// All value types, in id order.
    pub const ALL: [ValueType; 12] = [
        ValueType::Bool,
        ValueType::Int32,
        ValueType::Int64,
        ValueType::Float32,
        ValueType::Float64,
        ValueType::DateTime,
        ValueType::Date,
        ValueType::Time,
        ValueType::TimeSpan,
        ValueType::String,
        ValueType::Binary,
        ValueType::Decimal,
    ];

    /// The id of this type on the wire.
    pub fn id(self) -> u8 {
        self.into()
    }

    /// The width of a single element in bytes, or `None` for variable-width types.
    pub const fn fixed_width(self) -> Option<usize> {
        match self {
            ValueType::Bool => Some(1),
            ValueType::Int32 | ValueType::Float32 => Some(4),
            ValueType::Int64
            | ValueType::Float64
            | ValueType::DateTime
            | ValueType::Date
            | ValueType::Time
            | ValueType::TimeSpan => Some(8),
            ValueType::Decimal => Some(16),
            ValueType::String | ValueType::Binary => None,
        }
    }

    /// Whether elements of this type are length-prefixed byte sequences.
    pub const fn is_variable(self) -> bool {
        matches!(self, ValueType::String | ValueType::Binary)
    }

    /// Whether this type is one of the millisecond-based temporal types.
    pub const fn is_temporal(self) -> bool {
        matches!(
            self,
            ValueType::DateTime | ValueType::Date | ValueType::Time | ValueType::TimeSpan
        )
    }

    /// The name Spotfire uses for this type.
    pub const fn type_name(self) -> &'static str {
        match self {
            ValueType::Bool => "Boolean",
            ValueType::Int32 => "Integer",
            ValueType::Int64 => "LongInteger",
            ValueType::Float32 => "SingleReal",
            ValueType::Float64 => "Real",
            ValueType::DateTime => "DateTime",
            ValueType::Date => "Date",
            ValueType::Time => "Time",
            ValueType::TimeSpan => "TimeSpan",
            ValueType::String => "String",
            ValueType::Binary => "Binary",
            ValueType::Decimal => "Currency",
        }
    }

    /// Parse a wire id, failing with [`SbdfError::UnknownTypeId`] for unknown ids.
    pub fn from_id(id: u8) -> Result<Self, SbdfError> {
        Self::try_from(id).map_err(|_| sbdf_err!(UnknownTypeId: "unknown value type id 0x{:02x}", id))
    }
}

impl Display for ValueType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.type_name())
    }
}

#[cfg(test)]
mod test {
    use rstest::rstest;
    use sbdf_error::ErrorKind;

    use super::*;

    #[test]
    fn ids_round_trip() {
        for value_type in ValueType::ALL {
            assert_eq!(ValueType::from_id(value_type.id()).unwrap(), value_type);
        }
    }

    #[rstest]
    #[case(0x00)]
    #[case(0x0B)]
    #[case(0x0E)]
    #[case(0xFE)]
    fn unknown_ids(#[case] id: u8) {
        assert_eq!(
            ValueType::from_id(id).unwrap_err().kind(),
            ErrorKind::UnknownTypeId
        );
    }

    #[rstest]
    #[case(ValueType::Bool, Some(1))]
    #[case(ValueType::Int32, Some(4))]
    #[case(ValueType::Float64, Some(8))]
    #[case(ValueType::TimeSpan, Some(8))]
    #[case(ValueType::Decimal, Some(16))]
    #[case(ValueType::String, None)]
    #[case(ValueType::Binary, None)]
    fn widths(#[case] value_type: ValueType, #[case] width: Option<usize>) {
        assert_eq!(value_type.fixed_width(), width);
        assert_eq!(value_type.is_variable(), width.is_none());
    }

    #[test]
    fn display_uses_spotfire_names() {
        assert_eq!(ValueType::Int64.to_string(), "LongInteger");
        assert_eq!(ValueType::Decimal.to_string(), "Currency");
    }
}
