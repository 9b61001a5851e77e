#![deny(missing_docs)]
#![feature(error_generic_member_access)]

//! Error handling for the SBDF codec.
//!
//! Every failure the codec can report is a variant of [`SbdfError`]. Variants carry a
//! human-readable message (the operation and the offending name or index) plus a captured
//! [`Backtrace`]. Errors are constructed with the [`sbdf_err`] and [`sbdf_bail`] macros, which
//! take the variant name as a prefix:
//!
//! ```
//! use sbdf_error::{sbdf_bail, SbdfResult};
//!
//! fn check(rows: usize, expected: usize) -> SbdfResult<()> {
//!     if rows != expected {
//!         sbdf_bail!(RowCountMismatch: "expected {} rows, got {}", expected, rows);
//!     }
//!     Ok(())
//! }
//! ```

use std::backtrace::Backtrace;
use std::borrow::Cow;
use std::fmt::{Debug, Display, Formatter};
use std::ops::Deref;
use std::{env, fmt, io};

pub use kind::ErrorKind;

mod kind;

/// A string that can be used as an error message.
#[derive(Debug)]
pub struct ErrString(Cow<'static, str>);

impl<T> From<T> for ErrString
where
    T: Into<Cow<'static, str>>,
{
    #[allow(clippy::panic)]
    fn from(msg: T) -> Self {
        if env::var("SBDF_PANIC_ON_ERR").as_deref().unwrap_or("") == "1" {
            panic!("{}\nBacktrace:\n{}", msg.into(), Backtrace::capture());
        } else {
            Self(msg.into())
        }
    }
}

impl AsRef<str> for ErrString {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Deref for ErrString {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Display for ErrString {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

/// The top-level error type for SBDF.
#[derive(thiserror::Error)]
#[non_exhaustive]
pub enum SbdfError {
    /// A required argument was missing.
    #[error("{0}\nBacktrace:\n{1}")]
    ArgumentNull(ErrString, Backtrace),
    /// An argument was malformed or out of range.
    #[error("{0}\nBacktrace:\n{1}")]
    ArgumentInvalid(ErrString, Backtrace),
    /// An allocation sized from caller or stream input could not be satisfied.
    #[error("{0}\nBacktrace:\n{1}")]
    OutOfMemory(ErrString, Backtrace),
    /// The underlying stream failed, or ended early.
    #[error("{0}\nBacktrace:\n{1}")]
    Io(#[from] io::Error, Backtrace),
    /// A string in the stream was not valid UTF-8.
    #[error("{0}\nBacktrace:\n{1}")]
    Utf8(#[from] std::string::FromUtf8Error, Backtrace),
    /// A value type id outside the known set.
    #[error("{0}\nBacktrace:\n{1}")]
    UnknownTypeId(ErrString, Backtrace),
    /// A value array encoding id outside the known set.
    #[error("{0}\nBacktrace:\n{1}")]
    UnknownValueArrayEncoding(ErrString, Backtrace),
    /// A metadata value was not a single element.
    #[error("{0}\nBacktrace:\n{1}")]
    ArrayLengthMustBe1(ErrString, Backtrace),
    /// The section marker bytes were not found.
    #[error("{0}\nBacktrace:\n{1}")]
    MagicNumberMissing(ErrString, Backtrace),
    /// The file was written with an unsupported format version.
    #[error("{0}\nBacktrace:\n{1}")]
    UnknownVersion(ErrString, Backtrace),
    /// A section appeared where another one was expected.
    #[error("{0}\nBacktrace:\n{1}")]
    UnexpectedSectionId(ErrString, Backtrace),
    /// A length or count in the stream was negative or inconsistent.
    #[error("{0}\nBacktrace:\n{1}")]
    InvalidSize(ErrString, Backtrace),
    /// A metadata entry does not exist.
    #[error("{0}\nBacktrace:\n{1}")]
    MetadataNotFound(ErrString, Backtrace),
    /// A metadata entry with the same name already exists.
    #[error("{0}\nBacktrace:\n{1}")]
    MetadataAlreadyExists(ErrString, Backtrace),
    /// A metadata entry is malformed or inconsistent.
    #[error("{0}\nBacktrace:\n{1}")]
    IncorrectMetadata(ErrString, Backtrace),
    /// The metadata collection is locked.
    #[error("{0}\nBacktrace:\n{1}")]
    MetadataReadOnly(ErrString, Backtrace),
    /// Arrays that must share a row count do not.
    #[error("{0}\nBacktrace:\n{1}")]
    RowCountMismatch(ErrString, Backtrace),
    /// A table slice has a different number of columns than its table.
    #[error("{0}\nBacktrace:\n{1}")]
    ColumnCountMismatch(ErrString, Backtrace),
    /// Two values that must share a value type do not.
    #[error("{0}\nBacktrace:\n{1}")]
    ValueTypesMustBeEqual(ErrString, Backtrace),
    /// A column slice disagrees with the column metadata of its table.
    #[error("{0}\nBacktrace:\n{1}")]
    IncorrectColumnMetadata(ErrString, Backtrace),
    /// A column slice property with the same name already exists.
    #[error("{0}\nBacktrace:\n{1}")]
    PropertyAlreadyExists(ErrString, Backtrace),
    /// A column slice property does not exist.
    #[error("{0}\nBacktrace:\n{1}")]
    PropertyNotFound(ErrString, Backtrace),
    /// An error annotated with the operation that produced it.
    #[error("{0}: {1}")]
    Context(ErrString, Box<SbdfError>),
}

impl SbdfError {
    /// Adds additional context to an error.
    pub fn with_context<T: Into<ErrString>>(self, msg: T) -> Self {
        SbdfError::Context(msg.into(), Box::new(self))
    }

    /// The kind of this error, looking through any context wrappers.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SbdfError::ArgumentNull(..) => ErrorKind::ArgumentNull,
            SbdfError::ArgumentInvalid(..) => ErrorKind::ArgumentInvalid,
            SbdfError::OutOfMemory(..) => ErrorKind::OutOfMemory,
            SbdfError::Io(..) => ErrorKind::Io,
            SbdfError::Utf8(..) => ErrorKind::Utf8,
            SbdfError::UnknownTypeId(..) => ErrorKind::UnknownTypeId,
            SbdfError::UnknownValueArrayEncoding(..) => ErrorKind::UnknownValueArrayEncoding,
            SbdfError::ArrayLengthMustBe1(..) => ErrorKind::ArrayLengthMustBe1,
            SbdfError::MagicNumberMissing(..) => ErrorKind::MagicNumberMissing,
            SbdfError::UnknownVersion(..) => ErrorKind::UnknownVersion,
            SbdfError::UnexpectedSectionId(..) => ErrorKind::UnexpectedSectionId,
            SbdfError::InvalidSize(..) => ErrorKind::InvalidSize,
            SbdfError::MetadataNotFound(..) => ErrorKind::MetadataNotFound,
            SbdfError::MetadataAlreadyExists(..) => ErrorKind::MetadataAlreadyExists,
            SbdfError::IncorrectMetadata(..) => ErrorKind::IncorrectMetadata,
            SbdfError::MetadataReadOnly(..) => ErrorKind::MetadataReadOnly,
            SbdfError::RowCountMismatch(..) => ErrorKind::RowCountMismatch,
            SbdfError::ColumnCountMismatch(..) => ErrorKind::ColumnCountMismatch,
            SbdfError::ValueTypesMustBeEqual(..) => ErrorKind::ValueTypesMustBeEqual,
            SbdfError::IncorrectColumnMetadata(..) => ErrorKind::IncorrectColumnMetadata,
            SbdfError::PropertyAlreadyExists(..) => ErrorKind::PropertyAlreadyExists,
            SbdfError::PropertyNotFound(..) => ErrorKind::PropertyNotFound,
            SbdfError::Context(_, inner) => inner.kind(),
        }
    }

    /// Whether the underlying stream ended before the requested bytes were available.
    pub fn is_unexpected_eof(&self) -> bool {
        match self {
            SbdfError::Io(err, _) => err.kind() == io::ErrorKind::UnexpectedEof,
            SbdfError::Context(_, inner) => inner.is_unexpected_eof(),
            _ => false,
        }
    }
}

impl Debug for SbdfError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(self, f)
    }
}

/// A type alias for Results that return [`SbdfError`]s as their error type.
pub type SbdfResult<T> = Result<T, SbdfError>;

/// A trait for unwrapping an [`SbdfResult`] or `Option` with an explanatory message.
pub trait SbdfExpect {
    /// The type of the value being unwrapped.
    type Output;

    /// Returns the value, or panics with the given message.
    fn sbdf_expect(self, msg: &str) -> Self::Output;
}

impl<T> SbdfExpect for SbdfResult<T> {
    type Output = T;

    #[inline(always)]
    fn sbdf_expect(self, msg: &str) -> Self::Output {
        self.unwrap_or_else(|e| sbdf_panic!(e.with_context(msg.to_string())))
    }
}

impl<T> SbdfExpect for Option<T> {
    type Output = T;

    #[inline(always)]
    fn sbdf_expect(self, msg: &str) -> Self::Output {
        self.unwrap_or_else(|| {
            let err = SbdfError::ArgumentInvalid(msg.to_string().into(), Backtrace::capture());
            sbdf_panic!(err)
        })
    }
}

/// Construct an [`SbdfError`] of the named kind.
///
/// Without a kind prefix the error is [`SbdfError::ArgumentInvalid`].
#[macro_export]
macro_rules! sbdf_err {
    ($variant:ident: $fmt:literal $(, $arg:expr)* $(,)?) => {{
        use std::backtrace::Backtrace;
        $crate::__private::must_use(
            $crate::SbdfError::$variant(format!($fmt, $($arg),*).into(), Backtrace::capture())
        )
    }};
    ($fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::sbdf_err!(ArgumentInvalid: $fmt, $($arg),*)
    };
}

/// Return early with an [`SbdfError`] of the named kind.
#[macro_export]
macro_rules! sbdf_bail {
    ($($tt:tt)+) => {
        return Err($crate::sbdf_err!($($tt)+))
    };
}

/// Panic with an [`SbdfError`], either constructed in place or passed as an expression.
#[macro_export]
macro_rules! sbdf_panic {
    ($variant:ident: $fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::sbdf_panic!($crate::sbdf_err!($variant: $fmt, $($arg),*))
    };
    ($fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::sbdf_panic!($crate::sbdf_err!($fmt, $($arg),*))
    };
    ($err:expr) => {{
        #[allow(clippy::panic)]
        {
            let err: $crate::SbdfError = $err;
            panic!("{}", err)
        }
    }};
}

#[cfg(feature = "jiff")]
impl From<jiff::Error> for SbdfError {
    fn from(value: jiff::Error) -> Self {
        SbdfError::ArgumentInvalid(value.to_string().into(), Backtrace::capture())
    }
}

#[doc(hidden)]
pub mod __private {
    #[doc(hidden)]
    #[inline]
    #[must_use]
    pub const fn must_use(error: crate::SbdfError) -> crate::SbdfError {
        error
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn fails() -> SbdfResult<()> {
        sbdf_bail!(RowCountMismatch: "expected {} rows, got {}", 10, 5)
    }

    #[test]
    fn bail_builds_named_variant() {
        let err = fails().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RowCountMismatch);
        assert!(err.to_string().starts_with("expected 10 rows, got 5"));
    }

    #[test]
    fn default_variant_is_argument_invalid() {
        let err = sbdf_err!("bad {}", "input");
        assert_eq!(err.kind(), ErrorKind::ArgumentInvalid);
    }

    #[test]
    fn context_keeps_kind() {
        let err = sbdf_err!(PropertyNotFound: "IsInvalid").with_context("reading column 2");
        assert_eq!(err.kind(), ErrorKind::PropertyNotFound);
        assert!(err.to_string().starts_with("reading column 2: IsInvalid"));
    }

    #[test]
    fn io_eof_is_detected() {
        let err = SbdfError::from(io::Error::from(io::ErrorKind::UnexpectedEof));
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(err.is_unexpected_eof());
        assert!(err.with_context("header").is_unexpected_eof());
    }
}
