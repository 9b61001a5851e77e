use std::fmt::{Display, Formatter};

use bytes::Bytes;
use jiff::SignedDuration;
use jiff::civil::{Date, DateTime, Time};
use sbdf_dtype::temporal::{
    date_to_millis, datetime_to_millis, millis_to_date, millis_to_datetime, millis_to_time,
    millis_to_timespan, time_to_millis, timespan_to_millis,
};
use sbdf_dtype::{DECIMAL_WIDTH, Decimal, ValueType};
use sbdf_error::{SbdfResult, sbdf_err};

/// A single element of one of the SBDF value types.
///
/// Temporal variants hold the raw millisecond count that is stored on the wire; use the
/// [`Value::datetime`] family of constructors and [`Value::as_datetime`] family of accessors to
/// move between those counts and civil values.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    DateTime(i64),
    Date(i64),
    Time(i64),
    TimeSpan(i64),
    String(String),
    Binary(Bytes),
    Decimal(Decimal),
}

impl Value {
    /// The value type of this element.
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Bool(_) => ValueType::Bool,
            Value::Int32(_) => ValueType::Int32,
            Value::Int64(_) => ValueType::Int64,
            Value::Float32(_) => ValueType::Float32,
            Value::Float64(_) => ValueType::Float64,
            Value::DateTime(_) => ValueType::DateTime,
            Value::Date(_) => ValueType::Date,
            Value::Time(_) => ValueType::Time,
            Value::TimeSpan(_) => ValueType::TimeSpan,
            Value::String(_) => ValueType::String,
            Value::Binary(_) => ValueType::Binary,
            Value::Decimal(_) => ValueType::Decimal,
        }
    }

    /// The placeholder stored in rows that are flagged invalid.
    pub fn missing(value_type: ValueType) -> Self {
        match value_type {
            ValueType::Bool => Value::Bool(false),
            ValueType::Int32 => Value::Int32(0),
            ValueType::Int64 => Value::Int64(0),
            ValueType::Float32 => Value::Float32(0.0),
            ValueType::Float64 => Value::Float64(0.0),
            ValueType::DateTime => Value::DateTime(0),
            ValueType::Date => Value::Date(0),
            ValueType::Time => Value::Time(0),
            ValueType::TimeSpan => Value::TimeSpan(0),
            ValueType::String => Value::String(String::new()),
            ValueType::Binary => Value::Binary(Bytes::new()),
            ValueType::Decimal => Value::Decimal(Decimal::ZERO),
        }
    }

    /// A datetime, truncated to millisecond precision.
    pub fn datetime(datetime: DateTime) -> Self {
        Value::DateTime(datetime_to_millis(datetime))
    }

    /// A date.
    pub fn date(date: Date) -> Self {
        Value::Date(date_to_millis(date))
    }

    /// A time of day, truncated to millisecond precision.
    pub fn time(time: Time) -> Self {
        Value::Time(time_to_millis(time))
    }

    /// A duration, truncated to millisecond precision.
    pub fn timespan(span: SignedDuration) -> Self {
        Value::TimeSpan(timespan_to_millis(span))
    }

    /// The civil datetime of a [`Value::DateTime`].
    pub fn as_datetime(&self) -> SbdfResult<DateTime> {
        match self {
            Value::DateTime(millis) => millis_to_datetime(*millis),
            other => Err(type_mismatch(ValueType::DateTime, other)),
        }
    }

    /// The civil date of a [`Value::Date`].
    pub fn as_date(&self) -> SbdfResult<Date> {
        match self {
            Value::Date(millis) => millis_to_date(*millis),
            other => Err(type_mismatch(ValueType::Date, other)),
        }
    }

    /// The time of day of a [`Value::Time`].
    pub fn as_time(&self) -> SbdfResult<Time> {
        match self {
            Value::Time(millis) => millis_to_time(*millis),
            other => Err(type_mismatch(ValueType::Time, other)),
        }
    }

    /// The duration of a [`Value::TimeSpan`].
    pub fn as_timespan(&self) -> SbdfResult<SignedDuration> {
        match self {
            Value::TimeSpan(millis) => Ok(millis_to_timespan(*millis)),
            other => Err(type_mismatch(ValueType::TimeSpan, other)),
        }
    }

    /// The text of a [`Value::String`].
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Append the wire bytes of this element: little-endian for fixed-width types, the raw
    /// bytes for String and Binary.
    pub fn write_element(&self, out: &mut Vec<u8>) {
        match self {
            Value::Bool(v) => out.push(u8::from(*v)),
            Value::Int32(v) => out.extend_from_slice(&v.to_le_bytes()),
            Value::Float32(v) => out.extend_from_slice(&v.to_le_bytes()),
            Value::Float64(v) => out.extend_from_slice(&v.to_le_bytes()),
            Value::Int64(v)
            | Value::DateTime(v)
            | Value::Date(v)
            | Value::Time(v)
            | Value::TimeSpan(v) => out.extend_from_slice(&v.to_le_bytes()),
            Value::String(v) => out.extend_from_slice(v.as_bytes()),
            Value::Binary(v) => out.extend_from_slice(v),
            Value::Decimal(v) => out.extend_from_slice(&v.to_le_bytes()),
        }
    }

    /// Parse the wire bytes of one element of `value_type`.
    pub fn from_element(value_type: ValueType, bytes: &[u8]) -> SbdfResult<Self> {
        if let Some(width) = value_type.fixed_width() {
            if bytes.len() != width {
                return Err(sbdf_err!(
                    InvalidSize: "{} element must be {} bytes, got {}",
                    value_type,
                    width,
                    bytes.len()
                ));
            }
        }
        Ok(match value_type {
            ValueType::String => Value::String(String::from_utf8(bytes.to_vec())?),
            _ => element_value(value_type, bytes),
        })
    }
}

/// Decode an element whose length has already been checked against the type width and whose
/// UTF-8 has already been validated.
pub(crate) fn element_value(value_type: ValueType, bytes: &[u8]) -> Value {
    match value_type {
        ValueType::Bool => Value::Bool(bytes[0] != 0),
        ValueType::Int32 => Value::Int32(i32::from_le_bytes(array(bytes))),
        ValueType::Int64 => Value::Int64(i64::from_le_bytes(array(bytes))),
        ValueType::Float32 => Value::Float32(f32::from_le_bytes(array(bytes))),
        ValueType::Float64 => Value::Float64(f64::from_le_bytes(array(bytes))),
        ValueType::DateTime => Value::DateTime(i64::from_le_bytes(array(bytes))),
        ValueType::Date => Value::Date(i64::from_le_bytes(array(bytes))),
        ValueType::Time => Value::Time(i64::from_le_bytes(array(bytes))),
        ValueType::TimeSpan => Value::TimeSpan(i64::from_le_bytes(array(bytes))),
        ValueType::String => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueType::Binary => Value::Binary(Bytes::copy_from_slice(bytes)),
        ValueType::Decimal => Value::Decimal(Decimal::from_le_bytes(array::<DECIMAL_WIDTH>(bytes))),
    }
}

#[inline]
pub(crate) fn array<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes[..N]);
    out
}

pub(crate) fn type_mismatch(expected: ValueType, value: &Value) -> sbdf_error::SbdfError {
    sbdf_err!(
        ValueTypesMustBeEqual: "expected a {} value, got {}",
        expected,
        value.value_type()
    )
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "{v}"),
            Value::Int32(v) => write!(f, "{v}"),
            Value::Int64(v) => write!(f, "{v}"),
            Value::Float32(v) => write!(f, "{v}"),
            Value::Float64(v) => write!(f, "{v}"),
            Value::DateTime(_) | Value::Date(_) | Value::Time(_) => {
                let rendered = match self {
                    Value::Date(_) => self.as_date().map(|d| d.to_string()),
                    Value::Time(_) => self.as_time().map(|t| t.to_string()),
                    _ => self.as_datetime().map(|d| d.to_string()),
                };
                match rendered {
                    Ok(text) => f.write_str(&text),
                    Err(_) => write!(f, "{} ms", self.raw_millis().unwrap_or_default()),
                }
            }
            Value::TimeSpan(v) => write!(f, "{v} ms"),
            Value::String(v) => f.write_str(v),
            Value::Binary(v) => {
                for byte in v.iter() {
                    write!(f, "{byte:02x}")?;
                }
                Ok(())
            }
            Value::Decimal(v) => write!(f, "{v}"),
        }
    }
}

impl Value {
    /// The millisecond count of a temporal value.
    pub fn raw_millis(&self) -> Option<i64> {
        match self {
            Value::DateTime(v) | Value::Date(v) | Value::Time(v) | Value::TimeSpan(v) => Some(*v),
            _ => None,
        }
    }
}

macro_rules! value_from {
    ($T:ty, $variant:ident) => {
        impl From<$T> for Value {
            fn from(value: $T) -> Self {
                Value::$variant(value)
            }
        }
    };
}

value_from!(bool, Bool);
value_from!(i32, Int32);
value_from!(i64, Int64);
value_from!(f32, Float32);
value_from!(f64, Float64);
value_from!(String, String);
value_from!(Bytes, Binary);
value_from!(Decimal, Decimal);

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<DateTime> for Value {
    fn from(value: DateTime) -> Self {
        Value::datetime(value)
    }
}

impl From<Date> for Value {
    fn from(value: Date) -> Self {
        Value::date(value)
    }
}

impl From<Time> for Value {
    fn from(value: Time) -> Self {
        Value::time(value)
    }
}

impl From<SignedDuration> for Value {
    fn from(value: SignedDuration) -> Self {
        Value::timespan(value)
    }
}
