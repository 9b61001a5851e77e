use std::collections::BTreeMap;
use std::io::Read;

use bytes::BufMut;
use itertools::Itertools;
use sbdf_array::{Value, read_optional_value, write_optional_value};
use sbdf_dtype::ValueType;
use sbdf_error::{SbdfResult, sbdf_bail, sbdf_err};
use sbdf_io::{SbdfBufMut, SbdfRead};

use crate::column::{column_name, column_type, is_reserved, set_column_identity};
use crate::metadata::{Metadata, MetadataEntry};

/// Table-level metadata plus one metadata collection per column.
///
/// Every collection is locked on construction, and every column is guaranteed to carry the
/// reserved `Name` and `DataType` entries.
#[derive(Debug, Clone, PartialEq)]
pub struct TableMetadata {
    table: Metadata,
    columns: Vec<Metadata>,
}

impl TableMetadata {
    /// Validate the reserved column entries and lock every collection.
    pub fn try_new(table: Metadata, columns: Vec<Metadata>) -> SbdfResult<Self> {
        for (idx, column) in columns.iter().enumerate() {
            column_name(column).map_err(|e| e.with_context(format!("column {idx}")))?;
            column_type(column).map_err(|e| e.with_context(format!("column {idx}")))?;
        }
        Ok(Self {
            table: table.lock(),
            columns: columns.into_iter().map(Metadata::lock).collect(),
        })
    }

    /// The table-level metadata.
    pub fn table(&self) -> &Metadata {
        &self.table
    }

    /// All column metadata, in column order.
    pub fn columns(&self) -> &[Metadata] {
        &self.columns
    }

    /// The number of columns.
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// The metadata of column `idx`.
    pub fn column(&self, idx: usize) -> SbdfResult<&Metadata> {
        self.columns.get(idx).ok_or_else(|| {
            sbdf_err!(
                "column {} out of bounds for a table of {} columns",
                idx,
                self.columns.len()
            )
        })
    }

    /// The name of column `idx`.
    pub fn column_name(&self, idx: usize) -> SbdfResult<&str> {
        column_name(self.column(idx)?)
    }

    /// The value type of column `idx`.
    pub fn column_type(&self, idx: usize) -> SbdfResult<ValueType> {
        column_type(self.column(idx)?)
    }

    /// The entries of column `idx` other than the reserved name and type.
    pub fn user_column_metadata(
        &self,
        idx: usize,
    ) -> SbdfResult<impl Iterator<Item = &MetadataEntry> + '_> {
        Ok(self.column(idx)?.iter().filter(|e| !is_reserved(e.name())))
    }

    /// A table with only the columns at `indices`, in that order.
    pub fn project(&self, indices: &[usize]) -> SbdfResult<Self> {
        let columns = indices
            .iter()
            .map(|&idx| self.column(idx).cloned())
            .try_collect()?;
        Ok(Self {
            table: self.table.clone(),
            columns,
        })
    }

    /// Append the metadata block, without its section marker.
    pub fn write<B: BufMut>(&self, buf: &mut B) -> SbdfResult<()> {
        buf.put_count(self.table.len())?;
        for entry in self.table.iter() {
            buf.put_string(entry.name())?;
            buf.put_u8(entry.value_type().id());
            write_optional_value(buf, entry.value())?;
            write_optional_value(buf, entry.default_value())?;
        }

        buf.put_count(self.columns.len())?;
        let folded = self.fold_column_entries()?;
        buf.put_count(folded.len())?;
        for (name, (value_type, default)) in &folded {
            buf.put_string(name)?;
            buf.put_u8(value_type.id());
            write_optional_value(buf, *default)?;
        }
        for column in &self.columns {
            for name in folded.keys() {
                let value = column.entry(name).ok().and_then(MetadataEntry::value);
                write_optional_value(buf, value)?;
            }
        }
        Ok(())
    }

    /// Collect every column entry name, sorted, with the type and default every column must
    /// agree on.
    fn fold_column_entries(&self) -> SbdfResult<BTreeMap<&str, (ValueType, Option<&Value>)>> {
        let mut folded: BTreeMap<&str, (ValueType, Option<&Value>)> = BTreeMap::new();
        for entry in self.columns.iter().flat_map(Metadata::iter) {
            let current = (entry.value_type(), entry.default_value());
            match folded.get(entry.name()) {
                Some(previous) if *previous != current => sbdf_bail!(
                    IncorrectMetadata: "column metadata {} differs in type or default between columns",
                    entry.name()
                ),
                Some(_) => {}
                None => {
                    folded.insert(entry.name(), current);
                }
            }
        }
        Ok(folded)
    }

    /// Read a metadata block whose section marker has already been consumed.
    pub fn read<R: Read + ?Sized>(read: &mut R) -> SbdfResult<Self> {
        let entry_count = read.read_count()?;
        let mut table = Metadata::new();
        for _ in 0..entry_count {
            let name = read.read_string()?;
            let value_type = ValueType::from_id(read.read_u8()?)?;
            let value = read_optional_value(read, value_type)?;
            let default = read_optional_value(read, value_type)?;
            table.push_entry(MetadataEntry::new(name, value_type, value, default))?;
        }

        let column_count = read.read_count()?;
        let name_count = read.read_count()?;
        let mut names = Vec::new();
        names
            .try_reserve(name_count)
            .map_err(|e| sbdf_err!(OutOfMemory: "cannot reserve {} names: {}", name_count, e))?;
        for _ in 0..name_count {
            let name = read.read_string()?;
            let value_type = ValueType::from_id(read.read_u8()?)?;
            let default = read_optional_value(read, value_type)?;
            names.push((name, value_type, default));
        }

        let mut columns = Vec::new();
        columns
            .try_reserve(column_count)
            .map_err(|e| sbdf_err!(OutOfMemory: "cannot reserve {} columns: {}", column_count, e))?;
        for _ in 0..column_count {
            let mut column = Metadata::new();
            for (name, value_type, default) in &names {
                if let Some(value) = read_optional_value(read, *value_type)? {
                    column.push_entry(MetadataEntry::new(
                        name.clone(),
                        *value_type,
                        Some(value),
                        default.clone(),
                    ))?;
                }
            }
            columns.push(column);
        }

        Self::try_new(table, columns)
    }
}

/// Builds a [`TableMetadata`] column by column.
#[derive(Debug, Default)]
pub struct TableMetadataBuilder {
    table: Metadata,
    columns: Vec<Metadata>,
}

impl TableMetadataBuilder {
    /// A builder with empty table metadata and no columns.
    pub fn new() -> Self {
        Self::default()
    }

    /// A builder starting from existing table-level metadata.
    pub fn with_table_metadata(table: Metadata) -> Self {
        Self {
            table,
            columns: Vec::new(),
        }
    }

    /// The table-level metadata, for adding entries.
    pub fn table_mut(&mut self) -> &mut Metadata {
        &mut self.table
    }

    /// Add a column with no user metadata.
    pub fn add_column(&mut self, name: &str, value_type: ValueType) -> SbdfResult<&mut Self> {
        self.add_column_with_metadata(name, value_type, Metadata::new())
    }

    /// Add a column carrying `metadata`, which must not already hold the reserved entries.
    pub fn add_column_with_metadata(
        &mut self,
        name: &str,
        value_type: ValueType,
        mut metadata: Metadata,
    ) -> SbdfResult<&mut Self> {
        set_column_identity(&mut metadata, name, value_type)?;
        self.columns.push(metadata);
        Ok(self)
    }

    /// Validate and lock.
    pub fn build(self) -> SbdfResult<TableMetadata> {
        TableMetadata::try_new(self.table, self.columns)
    }
}
