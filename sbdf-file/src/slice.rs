use std::io::Read;
use std::sync::Arc;

use bytes::BufMut;
use sbdf_array::ValueArray;
use sbdf_dtype::ValueType;
use sbdf_error::{SbdfResult, sbdf_bail, sbdf_err};
use sbdf_io::{SbdfBufMut, SbdfRead};
use sbdf_metadata::TableMetadata;

use crate::section::{SectionId, expect_section, write_section};

/// The property marking rows whose value is missing. A Bool array, `true` for invalid rows.
pub const IS_INVALID: &str = "IsInvalid";
/// The property holding per-row error codes.
pub const ERROR_CODE: &str = "ErrorCode";
/// The property marking rows whose value was replaced.
pub const HAS_REPLACED_VALUE: &str = "HasReplacedValue";

/// One column's rows within a table slice: a value array plus named per-row properties.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSlice {
    values: ValueArray,
    properties: Vec<(String, ValueArray)>,
}

impl ColumnSlice {
    /// A column slice without properties.
    pub fn new(values: ValueArray) -> Self {
        Self {
            values,
            properties: Vec::new(),
        }
    }

    /// A column slice with an [`IS_INVALID`] property built from `mask`. The property is only
    /// added when at least one row is invalid.
    pub fn with_invalid_mask(values: ValueArray, mask: &[bool]) -> SbdfResult<Self> {
        let mut slice = Self::new(values);
        if mask.iter().any(|&invalid| invalid) {
            slice.add_property(IS_INVALID, ValueArray::from_bools(mask))?;
        }
        Ok(slice)
    }

    /// Attach a property covering the same rows as the values.
    pub fn add_property(&mut self, name: &str, values: ValueArray) -> SbdfResult<()> {
        check_property(
            name,
            values.row_count(),
            self.values.row_count(),
            self.properties.iter().any(|(n, _)| n == name),
        )?;
        self.properties.push((name.to_string(), values));
        Ok(())
    }

    /// The property named `name`.
    pub fn property(&self, name: &str) -> SbdfResult<&ValueArray> {
        self.properties
            .iter()
            .find_map(|(n, v)| (n == name).then_some(v))
            .ok_or_else(|| sbdf_err!(PropertyNotFound: "column slice has no property {}", name))
    }

    /// The properties in insertion order.
    pub fn properties(&self) -> impl Iterator<Item = (&str, &ValueArray)> + '_ {
        self.properties.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// The primary values.
    pub fn values(&self) -> &ValueArray {
        &self.values
    }

    /// The number of rows.
    pub fn row_count(&self) -> usize {
        self.values.row_count()
    }

    /// The type of the primary values.
    pub fn value_type(&self) -> ValueType {
        self.values.value_type()
    }

    /// The decoded [`IS_INVALID`] property, or `None` when every row is valid.
    pub fn invalid_mask(&self) -> SbdfResult<Option<Vec<bool>>> {
        self.as_view().invalid_mask()
    }

    /// Borrow as a view.
    pub fn as_view(&self) -> ColumnSliceView<'_> {
        ColumnSliceView {
            values: &self.values,
            properties: self
                .properties
                .iter()
                .map(|(n, v)| (n.as_str(), v))
                .collect(),
        }
    }

    /// Append the column slice section.
    pub fn write<B: BufMut>(&self, buf: &mut B) -> SbdfResult<()> {
        self.as_view().write(buf)
    }

    /// Read a column slice section.
    pub fn read<R: Read + ?Sized>(read: &mut R) -> SbdfResult<Self> {
        expect_section(read, SectionId::ColumnSlice)?;
        let mut slice = Self::new(ValueArray::read(read)?);
        let property_count = read.read_count()?;
        for _ in 0..property_count {
            let name = read.read_string()?;
            let values = ValueArray::read(read)?;
            slice.add_property(&name, values)?;
        }
        Ok(slice)
    }

    /// Skip a column slice section using only its lengths.
    pub fn skip<R: Read + ?Sized>(read: &mut R) -> SbdfResult<()> {
        expect_section(read, SectionId::ColumnSlice)?;
        ValueArray::skip(read)?;
        let property_count = read.read_count()?;
        for _ in 0..property_count {
            read.skip_prefixed_bytes()?;
            ValueArray::skip(read)?;
        }
        Ok(())
    }
}

fn check_property(name: &str, rows: usize, expected: usize, exists: bool) -> SbdfResult<()> {
    if exists {
        sbdf_bail!(PropertyAlreadyExists: "column slice already has property {}", name);
    }
    if rows != expected {
        sbdf_bail!(
            RowCountMismatch: "property {} has {} rows, the column slice has {}",
            name,
            rows,
            expected
        );
    }
    Ok(())
}

/// A column slice borrowing its arrays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSliceView<'a> {
    values: &'a ValueArray,
    properties: Vec<(&'a str, &'a ValueArray)>,
}

impl<'a> ColumnSliceView<'a> {
    /// A view without properties.
    pub fn new(values: &'a ValueArray) -> Self {
        Self {
            values,
            properties: Vec::new(),
        }
    }

    /// Attach a borrowed property covering the same rows as the values.
    pub fn add_property(&mut self, name: &'a str, values: &'a ValueArray) -> SbdfResult<()> {
        check_property(
            name,
            values.row_count(),
            self.values.row_count(),
            self.properties.iter().any(|(n, _)| *n == name),
        )?;
        self.properties.push((name, values));
        Ok(())
    }

    /// The property named `name`.
    pub fn property(&self, name: &str) -> SbdfResult<&'a ValueArray> {
        self.properties
            .iter()
            .find_map(|&(n, v)| (n == name).then_some(v))
            .ok_or_else(|| sbdf_err!(PropertyNotFound: "column slice has no property {}", name))
    }

    /// The properties in insertion order.
    pub fn properties(&self) -> impl Iterator<Item = (&'a str, &'a ValueArray)> + '_ {
        self.properties.iter().copied()
    }

    /// The primary values.
    pub fn values(&self) -> &'a ValueArray {
        self.values
    }

    /// The number of rows.
    pub fn row_count(&self) -> usize {
        self.values.row_count()
    }

    /// The type of the primary values.
    pub fn value_type(&self) -> ValueType {
        self.values.value_type()
    }

    /// The decoded [`IS_INVALID`] property, or `None` when every row is valid.
    pub fn invalid_mask(&self) -> SbdfResult<Option<Vec<bool>>> {
        match self.properties.iter().find(|(n, _)| *n == IS_INVALID) {
            None => Ok(None),
            Some((_, mask)) => mask.decode()?.as_bools().map(Some),
        }
    }

    /// Copy into an owning column slice.
    pub fn to_column_slice(&self) -> ColumnSlice {
        ColumnSlice {
            values: self.values.clone(),
            properties: self
                .properties
                .iter()
                .map(|&(n, v)| (n.to_string(), v.clone()))
                .collect(),
        }
    }

    /// Append the column slice section.
    pub fn write<B: BufMut>(&self, buf: &mut B) -> SbdfResult<()> {
        write_section(buf, SectionId::ColumnSlice);
        self.values.write(buf)?;
        buf.put_count(self.properties.len())?;
        for (name, values) in &self.properties {
            buf.put_string(name)?;
            values.write(buf)?;
        }
        Ok(())
    }
}

fn check_column(
    metadata: &TableMetadata,
    idx: usize,
    value_type: ValueType,
    row_count: usize,
    first_row_count: Option<usize>,
) -> SbdfResult<()> {
    if idx >= metadata.column_count() {
        sbdf_bail!(
            ColumnCountMismatch: "table slice already holds all {} columns",
            metadata.column_count()
        );
    }
    let declared = metadata.column_type(idx)?;
    if value_type != declared {
        sbdf_bail!(
            IncorrectColumnMetadata: "column {} ({}) is declared {} but the slice holds {}",
            idx,
            metadata.column_name(idx)?,
            declared,
            value_type
        );
    }
    if let Some(expected) = first_row_count {
        if row_count != expected {
            sbdf_bail!(
                RowCountMismatch: "column {} has {} rows, earlier columns have {}",
                idx,
                row_count,
                expected
            );
        }
    }
    Ok(())
}

/// A batch of rows: one [`ColumnSlice`] per column of its table, all with the same row count.
#[derive(Debug, Clone, PartialEq)]
pub struct TableSlice {
    metadata: Arc<TableMetadata>,
    columns: Vec<ColumnSlice>,
}

impl TableSlice {
    /// An empty slice of the table described by `metadata`.
    pub fn new(metadata: Arc<TableMetadata>) -> Self {
        let columns = Vec::with_capacity(metadata.column_count());
        Self { metadata, columns }
    }

    /// Append the next column.
    pub fn add(&mut self, column: ColumnSlice) -> SbdfResult<()> {
        check_column(
            &self.metadata,
            self.columns.len(),
            column.value_type(),
            column.row_count(),
            self.columns.first().map(ColumnSlice::row_count),
        )?;
        self.columns.push(column);
        Ok(())
    }

    /// The table this slice belongs to.
    pub fn metadata(&self) -> &Arc<TableMetadata> {
        &self.metadata
    }

    /// The number of rows, zero before any column is added.
    pub fn row_count(&self) -> usize {
        self.columns.first().map_or(0, ColumnSlice::row_count)
    }

    /// Column `idx`.
    pub fn column(&self, idx: usize) -> SbdfResult<&ColumnSlice> {
        self.columns
            .get(idx)
            .ok_or_else(|| sbdf_err!("column {} out of bounds for {} columns", idx, self.columns.len()))
    }

    /// The columns added so far.
    pub fn columns(&self) -> &[ColumnSlice] {
        &self.columns
    }

    /// Whether every column of the table has been added.
    pub fn is_complete(&self) -> bool {
        self.columns.len() == self.metadata.column_count()
    }

    /// Take the columns.
    pub fn into_columns(self) -> Vec<ColumnSlice> {
        self.columns
    }

    /// Borrow as a view.
    pub fn as_view(&self) -> TableSliceView<'_> {
        TableSliceView {
            metadata: &self.metadata,
            columns: self.columns.iter().map(ColumnSlice::as_view).collect(),
        }
    }
}

/// A table slice borrowing its metadata and column arrays.
#[derive(Debug, Clone, PartialEq)]
pub struct TableSliceView<'a> {
    metadata: &'a TableMetadata,
    columns: Vec<ColumnSliceView<'a>>,
}

impl<'a> TableSliceView<'a> {
    /// An empty view of the table described by `metadata`.
    pub fn new(metadata: &'a TableMetadata) -> Self {
        Self {
            metadata,
            columns: Vec::with_capacity(metadata.column_count()),
        }
    }

    /// Append the next column.
    pub fn add(&mut self, column: ColumnSliceView<'a>) -> SbdfResult<()> {
        check_column(
            self.metadata,
            self.columns.len(),
            column.value_type(),
            column.row_count(),
            self.columns.first().map(ColumnSliceView::row_count),
        )?;
        self.columns.push(column);
        Ok(())
    }

    /// The table this view belongs to.
    pub fn metadata(&self) -> &'a TableMetadata {
        self.metadata
    }

    /// The number of rows, zero before any column is added.
    pub fn row_count(&self) -> usize {
        self.columns.first().map_or(0, ColumnSliceView::row_count)
    }

    /// Column `idx`.
    pub fn column(&self, idx: usize) -> SbdfResult<&ColumnSliceView<'a>> {
        self.columns
            .get(idx)
            .ok_or_else(|| sbdf_err!("column {} out of bounds for {} columns", idx, self.columns.len()))
    }

    /// The columns added so far.
    pub fn columns(&self) -> &[ColumnSliceView<'a>] {
        &self.columns
    }

    /// Whether every column of the table has been added.
    pub fn is_complete(&self) -> bool {
        self.columns.len() == self.metadata.column_count()
    }

    /// Append the table slice section and its column slices.
    pub fn write<B: BufMut>(&self, buf: &mut B) -> SbdfResult<()> {
        if !self.is_complete() {
            sbdf_bail!(
                ColumnCountMismatch: "table slice holds {} of {} columns",
                self.columns.len(),
                self.metadata.column_count()
            );
        }
        write_section(buf, SectionId::TableSlice);
        buf.put_count(self.columns.len())?;
        for column in &self.columns {
            column.write(buf)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use std::io::Cursor;

    use bytes::BytesMut;
    use sbdf_array::Values;
    use sbdf_error::ErrorKind;
    use sbdf_metadata::TableMetadataBuilder;

    use super::*;

    fn table() -> Arc<TableMetadata> {
        let mut builder = TableMetadataBuilder::new();
        builder.add_column("id", ValueType::Int32).unwrap();
        builder.add_column("name", ValueType::String).unwrap();
        Arc::new(builder.build().unwrap())
    }

    fn ints(values: &[i32]) -> ValueArray {
        ValueArray::create_default(&Values::from_i32s(values))
    }

    #[test]
    fn properties() {
        let mut column = ColumnSlice::new(ints(&[1, 2, 3]));
        column.add_property(ERROR_CODE, ints(&[0, 0, 7])).unwrap();
        assert_eq!(
            column.add_property(ERROR_CODE, ints(&[0, 0, 0])).unwrap_err().kind(),
            ErrorKind::PropertyAlreadyExists
        );
        assert_eq!(
            column.add_property(HAS_REPLACED_VALUE, ints(&[0])).unwrap_err().kind(),
            ErrorKind::RowCountMismatch
        );
        assert_eq!(column.property(ERROR_CODE).unwrap(), &ints(&[0, 0, 7]));
        assert_eq!(
            column.property(IS_INVALID).unwrap_err().kind(),
            ErrorKind::PropertyNotFound
        );
        assert_eq!(column.invalid_mask().unwrap(), None);
    }

    #[test]
    fn invalid_mask_only_when_needed() {
        let valid = ColumnSlice::with_invalid_mask(ints(&[1, 2]), &[false, false]).unwrap();
        assert_eq!(valid.properties().count(), 0);

        let invalid = ColumnSlice::with_invalid_mask(ints(&[1, 0]), &[false, true]).unwrap();
        assert_eq!(invalid.invalid_mask().unwrap(), Some(vec![false, true]));
    }

    #[test]
    fn table_slice_checks_columns() {
        let mut slice = TableSlice::new(table());
        assert_eq!(
            slice
                .add(ColumnSlice::new(ValueArray::create_default(&Values::from_strs(["a"]))))
                .unwrap_err()
                .kind(),
            ErrorKind::IncorrectColumnMetadata
        );
        slice.add(ColumnSlice::new(ints(&[1, 2]))).unwrap();
        assert!(!slice.is_complete());
        assert_eq!(
            slice
                .add(ColumnSlice::new(ValueArray::create_default(&Values::from_strs(["a"]))))
                .unwrap_err()
                .kind(),
            ErrorKind::RowCountMismatch
        );
        slice
            .add(ColumnSlice::new(ValueArray::create_default(&Values::from_strs(["a", "b"]))))
            .unwrap();
        assert!(slice.is_complete());
        assert_eq!(slice.row_count(), 2);
        assert_eq!(
            slice.add(ColumnSlice::new(ints(&[1, 2]))).unwrap_err().kind(),
            ErrorKind::ColumnCountMismatch
        );
    }

    #[test]
    fn views_mirror_owned_slices() {
        let metadata = table();
        let ids = ints(&[4, 5]);
        let names = ValueArray::create_default(&Values::from_strs(["x", "y"]));
        let mask = ValueArray::from_bools(&[true, false]);

        let mut name_view = ColumnSliceView::new(&names);
        name_view.add_property(IS_INVALID, &mask).unwrap();
        let mut view = TableSliceView::new(&metadata);
        view.add(ColumnSliceView::new(&ids)).unwrap();
        view.add(name_view.clone()).unwrap();

        let mut owned = TableSlice::new(metadata.clone());
        owned.add(ColumnSlice::new(ids.clone())).unwrap();
        owned.add(name_view.to_column_slice()).unwrap();
        assert_eq!(owned.as_view(), view);

        let mut from_view = BytesMut::new();
        view.write(&mut from_view).unwrap();
        let mut from_owned = BytesMut::new();
        owned.as_view().write(&mut from_owned).unwrap();
        assert_eq!(from_view, from_owned);
    }

    #[test]
    fn column_slice_wire() {
        let mut column = ColumnSlice::with_invalid_mask(ints(&[1, 0, 3]), &[false, true, false])
            .unwrap();
        column.add_property(ERROR_CODE, ints(&[0, 1, 0])).unwrap();
        let mut buf = BytesMut::new();
        column.write(&mut buf).unwrap();
        let bytes = buf.freeze();

        assert_eq!(ColumnSlice::read(&mut Cursor::new(bytes.clone())).unwrap(), column);
        let mut cursor = Cursor::new(bytes.clone());
        ColumnSlice::skip(&mut cursor).unwrap();
        assert_eq!(cursor.position(), bytes.len() as u64);
    }

    #[test]
    fn incomplete_view_cannot_be_written() {
        let metadata = table();
        let ids = ints(&[1]);
        let mut view = TableSliceView::new(&metadata);
        view.add(ColumnSliceView::new(&ids)).unwrap();
        let err = view.write(&mut BytesMut::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ColumnCountMismatch);
    }
}
