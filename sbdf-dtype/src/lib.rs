#![cfg_attr(not(test), warn(missing_docs))]

//! The value types of SBDF and the scalar representations behind them.
//!
//! [`ValueType`] enumerates the twelve primitive types a column can hold. Decimals and the
//! temporal types have wire representations that need conversion helpers, found in
//! [`Decimal`] and the [`temporal`] module respectively.

pub use decimal::*;
pub use value_type::*;

mod decimal;
pub mod temporal;
mod value_type;
