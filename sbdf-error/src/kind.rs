use std::fmt::{Display, Formatter};

/// The kind of an [`SbdfError`](crate::SbdfError), without its message or backtrace.
///
/// Useful for matching on failures, and as the static lookup table from error kind to a
/// short description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// See [`SbdfError::ArgumentNull`](crate::SbdfError::ArgumentNull).
    ArgumentNull,
    /// See [`SbdfError::ArgumentInvalid`](crate::SbdfError::ArgumentInvalid).
    ArgumentInvalid,
    /// See [`SbdfError::OutOfMemory`](crate::SbdfError::OutOfMemory).
    OutOfMemory,
    /// See [`SbdfError::Io`](crate::SbdfError::Io).
    Io,
    /// See [`SbdfError::Utf8`](crate::SbdfError::Utf8).
    Utf8,
    /// See [`SbdfError::UnknownTypeId`](crate::SbdfError::UnknownTypeId).
    UnknownTypeId,
    /// See [`SbdfError::UnknownValueArrayEncoding`](crate::SbdfError::UnknownValueArrayEncoding).
    UnknownValueArrayEncoding,
    /// See [`SbdfError::ArrayLengthMustBe1`](crate::SbdfError::ArrayLengthMustBe1).
    ArrayLengthMustBe1,
    /// See [`SbdfError::MagicNumberMissing`](crate::SbdfError::MagicNumberMissing).
    MagicNumberMissing,
    /// See [`SbdfError::UnknownVersion`](crate::SbdfError::UnknownVersion).
    UnknownVersion,
    /// See [`SbdfError::UnexpectedSectionId`](crate::SbdfError::UnexpectedSectionId).
    UnexpectedSectionId,
    /// See [`SbdfError::InvalidSize`](crate::SbdfError::InvalidSize).
    InvalidSize,
    /// See [`SbdfError::MetadataNotFound`](crate::SbdfError::MetadataNotFound).
    MetadataNotFound,
    /// See [`SbdfError::MetadataAlreadyExists`](crate::SbdfError::MetadataAlreadyExists).
    MetadataAlreadyExists,
    /// See [`SbdfError::IncorrectMetadata`](crate::SbdfError::IncorrectMetadata).
    IncorrectMetadata,
    /// See [`SbdfError::MetadataReadOnly`](crate::SbdfError::MetadataReadOnly).
    MetadataReadOnly,
    /// See [`SbdfError::RowCountMismatch`](crate::SbdfError::RowCountMismatch).
    RowCountMismatch,
    /// See [`SbdfError::ColumnCountMismatch`](crate::SbdfError::ColumnCountMismatch).
    ColumnCountMismatch,
    /// See [`SbdfError::ValueTypesMustBeEqual`](crate::SbdfError::ValueTypesMustBeEqual).
    ValueTypesMustBeEqual,
    /// See [`SbdfError::IncorrectColumnMetadata`](crate::SbdfError::IncorrectColumnMetadata).
    IncorrectColumnMetadata,
    /// See [`SbdfError::PropertyAlreadyExists`](crate::SbdfError::PropertyAlreadyExists).
    PropertyAlreadyExists,
    /// See [`SbdfError::PropertyNotFound`](crate::SbdfError::PropertyNotFound).
    PropertyNotFound,
}

impl ErrorKind {
    /// A short, fixed description of the failure.
    pub const fn description(&self) -> &'static str {
        match self {
            ErrorKind::ArgumentNull => "a required argument is missing",
            ErrorKind::ArgumentInvalid => "an argument is invalid",
            ErrorKind::OutOfMemory => "out of memory",
            ErrorKind::Io => "i/o error",
            ErrorKind::Utf8 => "a string is not valid utf-8",
            ErrorKind::UnknownTypeId => "unknown value type id",
            ErrorKind::UnknownValueArrayEncoding => "unknown value array encoding",
            ErrorKind::ArrayLengthMustBe1 => "the array length must be one",
            ErrorKind::MagicNumberMissing => "the SBDF magic number wasn't found",
            ErrorKind::UnknownVersion => "the SBDF version is not supported",
            ErrorKind::UnexpectedSectionId => "unexpected section id",
            ErrorKind::InvalidSize => "the number of elements is incorrect",
            ErrorKind::MetadataNotFound => "the metadata with the given name was not found",
            ErrorKind::MetadataAlreadyExists => "the metadata with the given name already exists",
            ErrorKind::IncorrectMetadata => "the metadata is incorrect",
            ErrorKind::MetadataReadOnly => "the metadata is readonly and may not be modified",
            ErrorKind::RowCountMismatch => "the row counts do not match",
            ErrorKind::ColumnCountMismatch => "the column counts do not match",
            ErrorKind::ValueTypesMustBeEqual => "the value types must be equal",
            ErrorKind::IncorrectColumnMetadata => "the column metadata is incorrect",
            ErrorKind::PropertyAlreadyExists => "the property with the given name already exists",
            ErrorKind::PropertyNotFound => "the property with the given name was not found",
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.description())
    }
}
