//! Conversion between in-memory columns and SBDF streams.
//!
//! Columns enter through [`ColumnSource`], which yields typed values and an invalid-row mask for
//! any row range, so a table is written one slice at a time without materializing every column
//! in its encoded form. [`import_table`] reads a whole stream back into a [`Table`].

use std::io::{Read, Write};
use std::ops::Range;
use std::sync::Arc;

use itertools::Itertools;
use sbdf_array::{Value, Values, ValuesBuilder};
use sbdf_dtype::ValueType;
use sbdf_error::{SbdfResult, sbdf_bail, sbdf_err};
use sbdf_file::{ColumnSlice, SbdfWriteOptions, TableSlice, open_for_read, open_for_write};
use sbdf_metadata::{Metadata, TableMetadata, TableMetadataBuilder};

/// A column of a table being exported.
pub trait ColumnSource {
    /// The column name.
    fn name(&self) -> &str;

    /// The value type of every row.
    fn value_type(&self) -> ValueType;

    /// The number of rows.
    fn len(&self) -> usize;

    /// Whether the column has no rows.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Column metadata other than the reserved name and type entries.
    fn metadata(&self) -> Metadata {
        Metadata::new()
    }

    /// The values of the rows in `range`, in row order, together with a mask that is `true` for
    /// invalid rows. Invalid rows hold a placeholder value.
    fn chunk(&self, range: Range<usize>) -> SbdfResult<(Values, Vec<bool>)>;
}

/// The type shared by every present value.
///
/// Fails with `ValueTypesMustBeEqual` when present values disagree and with `ArgumentInvalid`
/// when every value is missing.
pub fn infer_value_type(values: &[Option<Value>]) -> SbdfResult<ValueType> {
    let mut present = values.iter().flatten();
    let first = present
        .next()
        .ok_or_else(|| sbdf_err!("cannot infer a value type, all values are missing"))?;
    let value_type = first.value_type();
    if let Some(other) = present.find(|v| v.value_type() != value_type) {
        sbdf_bail!(
            ValueTypesMustBeEqual: "values of types {} and {} cannot share a column",
            value_type,
            other.value_type()
        );
    }
    Ok(value_type)
}

/// A column held in memory as optional values, `None` marking a missing row.
#[derive(Debug, Clone, PartialEq)]
pub struct InMemoryColumn {
    name: String,
    value_type: ValueType,
    values: Vec<Option<Value>>,
    metadata: Metadata,
}

impl InMemoryColumn {
    /// A column whose type is inferred from its values.
    pub fn try_new(name: impl Into<String>, values: Vec<Option<Value>>) -> SbdfResult<Self> {
        let name = name.into();
        let value_type =
            infer_value_type(&values).map_err(|e| e.with_context(format!("column {name}")))?;
        Ok(Self {
            name,
            value_type,
            values,
            metadata: Metadata::new(),
        })
    }

    /// A column of a declared type, which every present value must have.
    pub fn try_with_type(
        name: impl Into<String>,
        value_type: ValueType,
        values: Vec<Option<Value>>,
    ) -> SbdfResult<Self> {
        let name = name.into();
        if let Some(other) = values
            .iter()
            .flatten()
            .find(|v| v.value_type() != value_type)
        {
            sbdf_bail!(
                ValueTypesMustBeEqual: "column {} is {} but holds a {} value",
                name,
                value_type,
                other.value_type()
            );
        }
        Ok(Self {
            name,
            value_type,
            values,
            metadata: Metadata::new(),
        })
    }

    /// Attach column metadata.
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }
}

impl ColumnSource for InMemoryColumn {
    fn name(&self) -> &str {
        &self.name
    }

    fn value_type(&self) -> ValueType {
        self.value_type
    }

    fn len(&self) -> usize {
        self.values.len()
    }

    fn metadata(&self) -> Metadata {
        self.metadata.clone()
    }

    fn chunk(&self, range: Range<usize>) -> SbdfResult<(Values, Vec<bool>)> {
        let rows = self.values.get(range.clone()).ok_or_else(|| {
            sbdf_err!(
                "rows {}..{} out of bounds for column {} of {} rows",
                range.start,
                range.end,
                self.name,
                self.values.len()
            )
        })?;
        let mut builder = ValuesBuilder::try_with_capacity(self.value_type, rows.len())?;
        let mut invalid = Vec::with_capacity(rows.len());
        for row in rows {
            match row {
                Some(value) => builder.append_value(value)?,
                None => builder.append_missing(1),
            }
            invalid.push(row.is_none());
        }
        Ok((builder.finish(), invalid))
    }
}

/// A fully read column: its values and a mask that is `true` for invalid rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    values: Values,
    invalid: Vec<bool>,
}

impl Column {
    /// The value of row `idx`, `None` when the row is invalid or out of bounds.
    pub fn get(&self, idx: usize) -> Option<Value> {
        if self.invalid.get(idx).copied().unwrap_or(true) {
            return None;
        }
        self.values.value(idx).ok()
    }

    /// Whether row `idx` holds a valid value.
    pub fn is_valid(&self, idx: usize) -> bool {
        self.invalid.get(idx).is_some_and(|invalid| !invalid)
    }

    /// Every value, with placeholders in invalid rows.
    pub fn values(&self) -> &Values {
        &self.values
    }

    /// The invalid-row mask.
    pub fn invalid_mask(&self) -> &[bool] {
        &self.invalid
    }

    /// The value type.
    pub fn value_type(&self) -> ValueType {
        self.values.value_type()
    }

    /// The number of rows.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the column has no rows.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate the rows, `None` for invalid rows.
    pub fn iter(&self) -> impl Iterator<Item = Option<Value>> + '_ {
        (0..self.len()).map(|idx| self.get(idx))
    }
}

/// A table read from an SBDF stream.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    metadata: Arc<TableMetadata>,
    columns: Vec<Column>,
}

impl Table {
    /// The table and column metadata.
    pub fn metadata(&self) -> &Arc<TableMetadata> {
        &self.metadata
    }

    /// The columns, in file order.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Column `idx`.
    pub fn column(&self, idx: usize) -> SbdfResult<&Column> {
        self.columns.get(idx).ok_or_else(|| {
            sbdf_err!(
                "column {} out of bounds for a table of {} columns",
                idx,
                self.columns.len()
            )
        })
    }

    /// The column named `name`.
    pub fn column_by_name(&self, name: &str) -> SbdfResult<&Column> {
        let idx = (0..self.metadata.column_count())
            .find(|&idx| self.metadata.column_name(idx).is_ok_and(|n| n == name))
            .ok_or_else(|| sbdf_err!("table has no column {}", name))?;
        self.column(idx)
    }

    /// The number of rows.
    pub fn row_count(&self) -> usize {
        self.columns.first().map_or(0, Column::len)
    }
}

/// Write `columns` as one table to `write`, in slices of at most
/// [`rows_per_slice`](SbdfWriteOptions::rows_per_slice) rows, and give back the stream.
pub fn export_table<W: Write>(
    write: W,
    table_metadata: Metadata,
    columns: &[&dyn ColumnSource],
    options: &SbdfWriteOptions,
) -> SbdfResult<W> {
    let row_count = match columns.iter().map(|c| c.len()).all_equal_value() {
        Ok(rows) => rows,
        Err(None) => 0,
        Err(Some((first, other))) => sbdf_bail!(
            RowCountMismatch: "columns must have equal lengths, found {} and {}",
            first,
            other
        ),
    };

    let rows_per_slice = options.rows_per_slice();
    if rows_per_slice == 0 {
        sbdf_bail!("rows per slice must be positive");
    }

    let mut builder = TableMetadataBuilder::with_table_metadata(table_metadata);
    for column in columns {
        builder.add_column_with_metadata(column.name(), column.value_type(), column.metadata())?;
    }
    let metadata = Arc::new(builder.build()?);
    let mut writer = open_for_write(write, TableMetadata::clone(&metadata))?;

    for start in (0..row_count).step_by(rows_per_slice) {
        let range = start..row_count.min(start + rows_per_slice);
        let mut slice = TableSlice::new(metadata.clone());
        for column in columns {
            let (values, invalid) = column.chunk(range.clone())?;
            if values.len() != range.len() || invalid.len() != range.len() {
                sbdf_bail!(
                    RowCountMismatch: "column {} produced {} values and {} mask rows for {} rows",
                    column.name(),
                    values.len(),
                    invalid.len(),
                    range.len()
                );
            }
            let array = options.encoding().encode(&values)?;
            slice.add(ColumnSlice::with_invalid_mask(array, &invalid)?)?;
        }
        writer.write(&slice)?;
    }

    log::debug!(
        "Exported {} rows of {} columns",
        row_count,
        metadata.column_count()
    );
    writer.finish()
}

/// Read every slice of the stream into a [`Table`].
///
/// Any error discards the rows read so far.
pub fn import_table<R: Read>(read: R) -> SbdfResult<Table> {
    let (metadata, reader) = open_for_read(read)?;
    let mut builders = (0..metadata.column_count())
        .map(|idx| Ok((ValuesBuilder::new(metadata.column_type(idx)?), Vec::new())))
        .collect::<SbdfResult<Vec<(ValuesBuilder, Vec<bool>)>>>()?;

    for slice in reader {
        let slice = slice?;
        for (column, (values, invalid)) in slice.columns().iter().zip(builders.iter_mut()) {
            values.append_values(&column.values().decode()?)?;
            match column.invalid_mask()? {
                Some(mask) => invalid.extend(mask),
                None => invalid.resize(invalid.len() + column.row_count(), false),
            }
        }
    }

    let columns = builders
        .into_iter()
        .map(|(values, invalid)| Column {
            values: values.finish(),
            invalid,
        })
        .collect_vec();
    log::debug!(
        "Imported {} rows of {} columns",
        columns.first().map_or(0, Column::len),
        columns.len()
    );
    Ok(Table { metadata, columns })
}

#[cfg(test)]
mod test {
    use std::io::Cursor;

    use jiff::civil::date;
    use rstest::rstest;
    use sbdf_dtype::Decimal;
    use sbdf_error::ErrorKind;
    use sbdf_file::{EncodingStrategy, SbdfReader};

    use super::*;

    fn decimal(s: &str) -> Value {
        Value::Decimal(s.parse::<Decimal>().unwrap())
    }

    #[rstest]
    #[case(vec![Some(Value::from(1)), None, Some(Value::from(2))], ValueType::Int32)]
    #[case(vec![None, Some(Value::from("a"))], ValueType::String)]
    #[case(vec![Some(Value::from(date(2005, 9, 1)))], ValueType::Date)]
    #[case(vec![Some(decimal("1.5"))], ValueType::Decimal)]
    fn infers(#[case] values: Vec<Option<Value>>, #[case] expected: ValueType) {
        assert_eq!(infer_value_type(&values).unwrap(), expected);
    }

    #[rstest]
    #[case(vec![], ErrorKind::ArgumentInvalid)]
    #[case(vec![None, None], ErrorKind::ArgumentInvalid)]
    #[case(vec![Some(Value::from(1)), Some(Value::from(1i64))], ErrorKind::ValueTypesMustBeEqual)]
    fn cannot_infer(#[case] values: Vec<Option<Value>>, #[case] kind: ErrorKind) {
        assert_eq!(infer_value_type(&values).unwrap_err().kind(), kind);
    }

    #[test]
    fn chunks_fill_placeholders() {
        let column = InMemoryColumn::try_new(
            "x",
            vec![Some(Value::from("a")), None, Some(Value::from("c"))],
        )
        .unwrap();
        let (values, invalid) = column.chunk(1..3).unwrap();
        assert_eq!(values, Values::from_strs(["", "c"]));
        assert_eq!(invalid, vec![true, false]);
        assert_eq!(
            column.chunk(2..4).unwrap_err().kind(),
            ErrorKind::ArgumentInvalid
        );
    }

    #[test]
    fn declared_type_must_match() {
        let err = InMemoryColumn::try_with_type("x", ValueType::Int64, vec![Some(Value::from(1))])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValueTypesMustBeEqual);
        let empty = InMemoryColumn::try_with_type("x", ValueType::Int64, vec![None, None]).unwrap();
        assert_eq!(empty.value_type(), ValueType::Int64);
    }

    fn sample_columns() -> Vec<InMemoryColumn> {
        let active = (0..25).map(|i| Some(Value::from(i % 2 == 0))).collect_vec();
        let labels = (0..25)
            .map(|i| (i != 13).then(|| Value::from(format!("label {i}"))))
            .collect_vec();
        let prices = (0..25)
            .map(|i| Some(decimal(&format!("{i}.25"))))
            .collect_vec();

        let mut unit = Metadata::new();
        unit.add_str("Unit", "EUR", Some("")).unwrap();
        vec![
            InMemoryColumn::try_new("Active", active).unwrap(),
            InMemoryColumn::try_new("Label", labels).unwrap(),
            InMemoryColumn::try_new("Price", prices)
                .unwrap()
                .with_metadata(unit),
        ]
    }

    fn export(columns: &[InMemoryColumn], options: &SbdfWriteOptions) -> Vec<u8> {
        let mut table = Metadata::new();
        table.add_str("Source", "convert test", None).unwrap();
        let sources = columns.iter().map(|c| c as &dyn ColumnSource).collect_vec();
        export_table(Vec::new(), table, &sources, options).unwrap()
    }

    #[test]
    fn three_columns_in_slices_of_ten() {
        let columns = sample_columns();
        let options = SbdfWriteOptions::default().with_rows_per_slice(10).unwrap();
        let bytes = export(&columns, &options);

        let reader = SbdfReader::open(Cursor::new(bytes.clone())).unwrap();
        let rows = reader
            .map(|slice| slice.map(|s| s.row_count()))
            .collect::<SbdfResult<Vec<_>>>()
            .unwrap();
        assert_eq!(rows, vec![10, 10, 5]);

        let table = import_table(Cursor::new(bytes)).unwrap();
        assert_eq!(table.row_count(), 25);
        let metadata = table.metadata();
        assert_eq!(
            (0..3)
                .map(|idx| metadata.column_name(idx).unwrap())
                .collect_vec(),
            vec!["Active", "Label", "Price"]
        );
        assert_eq!(
            metadata.table().get("Source").unwrap(),
            &Value::from("convert test")
        );
        assert_eq!(
            metadata.column(2).unwrap().get("Unit").unwrap(),
            &Value::from("EUR")
        );

        let labels = table.column_by_name("Label").unwrap();
        assert_eq!(labels.value_type(), ValueType::String);
        assert!(!labels.is_valid(13));
        assert_eq!(labels.get(13), None);
        assert_eq!(labels.get(12), Some(Value::from("label 12")));
        assert_eq!(labels.invalid_mask().iter().filter(|&&i| i).count(), 1);

        for (source, column) in columns.iter().zip(table.columns()) {
            assert_eq!(column.iter().collect_vec(), source.values);
        }
    }

    #[rstest]
    #[case(EncodingStrategy::Default)]
    #[case(EncodingStrategy::Plain)]
    #[case(EncodingStrategy::RunLengthWhenSmaller)]
    fn encodings_import_identically(#[case] encoding: EncodingStrategy) {
        let columns = sample_columns();
        let options = SbdfWriteOptions::default().with_encoding(encoding);
        let table = import_table(Cursor::new(export(&columns, &options))).unwrap();
        for (source, column) in columns.iter().zip(table.columns()) {
            assert_eq!(column.iter().collect_vec(), source.values);
        }
    }

    #[test]
    fn empty_table() {
        let bytes = export(&[], &SbdfWriteOptions::default());
        let table = import_table(Cursor::new(bytes)).unwrap();
        assert_eq!(table.row_count(), 0);
        assert!(table.columns().is_empty());
    }

    #[test]
    fn unequal_columns() {
        let short = InMemoryColumn::try_new("a", vec![Some(Value::from(1))]).unwrap();
        let long = InMemoryColumn::try_new("b", vec![Some(Value::from(1)), None]).unwrap();
        let err = export_table(
            Vec::new(),
            Metadata::new(),
            &[&short, &long],
            &SbdfWriteOptions::default(),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RowCountMismatch);
    }

    #[test]
    fn truncated_stream_is_rejected() {
        let mut bytes = export(&sample_columns(), &SbdfWriteOptions::default());
        bytes.truncate(bytes.len() - 1);
        let err = import_table(Cursor::new(bytes)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnexpectedSectionId);
    }

    #[test]
    fn file_round_trip() {
        let columns = sample_columns();
        let file = tempfile::NamedTempFile::new().unwrap();
        let sources = columns.iter().map(|c| c as &dyn ColumnSource).collect_vec();
        export_table(
            file.reopen().unwrap(),
            Metadata::new(),
            &sources,
            &SbdfWriteOptions::default(),
        )
        .unwrap();
        let table = import_table(std::fs::File::open(file.path()).unwrap()).unwrap();
        assert_eq!(table.row_count(), 25);
        assert_eq!(table.column(0).unwrap().get(0), Some(Value::from(true)));
    }
}
