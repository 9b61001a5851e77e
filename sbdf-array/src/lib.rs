//! Values and value arrays.
//!
//! A [`Values`] is a run of elements sharing one [`ValueType`](sbdf_dtype::ValueType), held
//! either as fixed-width little-endian bytes or as a [`VarBinBuffer`]. A [`ValueArray`] is the
//! encoded form that appears in a column slice: [`Plain`](ValueArray::Plain),
//! [`RunLength`](ValueArray::RunLength) or [`BitArray`](ValueArray::BitArray).
//! [`ValueArray::write`] and [`ValueArray::read`] move arrays to and from the wire.

pub use array::*;
pub use bitarray::{BitArray, packed_len};
pub use buffer::*;
pub use builder::*;
pub use codec::{
    read_optional_value, read_packed_values, skip_packed_values, write_optional_value,
    write_packed_values,
};
pub use runlength::*;
pub use value::Value;
pub use values::*;

mod array;
mod bitarray;
mod buffer;
mod builder;
mod codec;
mod runlength;
mod value;
mod values;
