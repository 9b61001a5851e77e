use bytes::Bytes;
use sbdf_array::Value;
use sbdf_dtype::ValueType;
use sbdf_error::{SbdfResult, sbdf_err};

use crate::Metadata;

/// The reserved column metadata entry holding the column name, a String.
pub const COLUMN_NAME: &str = "Name";

/// The reserved column metadata entry holding the column type, a one byte Binary type id.
pub const COLUMN_DATA_TYPE: &str = "DataType";

/// Whether `name` is one of the reserved column metadata entries.
pub fn is_reserved(name: &str) -> bool {
    name == COLUMN_NAME || name == COLUMN_DATA_TYPE
}

/// Column metadata holding only the reserved name and type entries.
pub fn column_metadata(name: &str, value_type: ValueType) -> SbdfResult<Metadata> {
    let mut metadata = Metadata::new();
    set_column_identity(&mut metadata, name, value_type)?;
    Ok(metadata)
}

/// Add the reserved name and type entries to `metadata`.
pub fn set_column_identity(
    metadata: &mut Metadata,
    name: &str,
    value_type: ValueType,
) -> SbdfResult<()> {
    metadata.add_str(COLUMN_NAME, name, None)?;
    metadata.add_value(
        COLUMN_DATA_TYPE,
        Value::Binary(Bytes::copy_from_slice(&[value_type.id()])),
        None,
    )
}

/// The name stored in column metadata.
pub fn column_name(metadata: &Metadata) -> SbdfResult<&str> {
    match metadata.get(COLUMN_NAME)? {
        Value::String(name) => Ok(name),
        other => Err(sbdf_err!(
            IncorrectMetadata: "column {} entry must be String, got {}",
            COLUMN_NAME,
            other.value_type()
        )),
    }
}

/// The value type stored in column metadata.
pub fn column_type(metadata: &Metadata) -> SbdfResult<ValueType> {
    match metadata.get(COLUMN_DATA_TYPE)? {
        Value::Binary(bytes) if bytes.len() == 1 => ValueType::from_id(bytes[0]).map_err(|e| {
            sbdf_err!(IncorrectMetadata: "column {} entry: {}", COLUMN_DATA_TYPE, e)
        }),
        other => Err(sbdf_err!(
            IncorrectMetadata: "column {} entry must be a single byte Binary, got {} {}",
            COLUMN_DATA_TYPE,
            other.value_type(),
            other
        )),
    }
}

#[cfg(test)]
mod test {
    use sbdf_error::ErrorKind;

    use super::*;

    #[test]
    fn identity_round_trip() {
        let metadata = column_metadata("Price", ValueType::Decimal).unwrap();
        assert_eq!(column_name(&metadata).unwrap(), "Price");
        assert_eq!(column_type(&metadata).unwrap(), ValueType::Decimal);
        assert_eq!(
            metadata.get(COLUMN_DATA_TYPE).unwrap(),
            &Value::Binary(Bytes::from_static(&[0x0D]))
        );
    }

    #[test]
    fn malformed_identity() {
        let mut metadata = Metadata::new();
        assert_eq!(column_name(&metadata).unwrap_err().kind(), ErrorKind::MetadataNotFound);

        metadata.add_i32(COLUMN_NAME, 1, None).unwrap();
        metadata
            .add_value(COLUMN_DATA_TYPE, Value::Binary(Bytes::from_static(&[0x0B])), None)
            .unwrap();
        assert_eq!(column_name(&metadata).unwrap_err().kind(), ErrorKind::IncorrectMetadata);
        assert_eq!(column_type(&metadata).unwrap_err().kind(), ErrorKind::IncorrectMetadata);
    }
}
