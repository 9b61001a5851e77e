use std::io::Read;
use std::sync::Arc;

use sbdf_error::{SbdfResult, sbdf_bail, sbdf_err};
use sbdf_io::SbdfRead;
use sbdf_metadata::TableMetadata;

use crate::header::FileHeader;
use crate::options::SbdfReadOptions;
use crate::section::{SectionId, expect_section, read_section};
use crate::slice::{ColumnSlice, TableSlice};

/// Open `read` with default options, returning the table metadata and a reader positioned at
/// the first table slice.
pub fn open_for_read<R: Read>(read: R) -> SbdfResult<(Arc<TableMetadata>, SbdfReader<R>)> {
    let reader = SbdfReader::open(read)?;
    Ok((reader.metadata().clone(), reader))
}

/// A forward-only reader of the table slices of an SBDF stream.
///
/// The reader is also an [`Iterator`] over table slices. Iteration stops after the end of the
/// table, or after the first error.
pub struct SbdfReader<R> {
    read: R,
    header: FileHeader,
    file_metadata: Arc<TableMetadata>,
    metadata: Arc<TableMetadata>,
    projection: Option<Vec<usize>>,
    finished: bool,
    slices_read: usize,
    rows_read: usize,
}

impl<R: Read> SbdfReader<R> {
    /// Read the header and the table metadata.
    pub fn open(read: R) -> SbdfResult<Self> {
        Self::open_with_options(read, SbdfReadOptions::default())
    }

    /// Read the header and the table metadata, materializing only the projected columns.
    pub fn open_with_options(mut read: R, options: SbdfReadOptions) -> SbdfResult<Self> {
        let header = FileHeader::read(&mut read)?;
        expect_section(&mut read, SectionId::TableMetadata)?;
        let file_metadata = Arc::new(TableMetadata::read(&mut read)?);

        let projection = options.projection().map(<[usize]>::to_vec);
        let metadata = match &projection {
            None => file_metadata.clone(),
            Some(indices) => Arc::new(
                file_metadata
                    .project(indices)
                    .map_err(|e| e.with_context("invalid projection"))?,
            ),
        };

        log::debug!(
            "Opened SBDF {}.{} stream with {} columns, reading {}",
            header.major,
            header.minor,
            file_metadata.column_count(),
            metadata.column_count()
        );

        Ok(Self {
            read,
            header,
            file_metadata,
            metadata,
            projection,
            finished: false,
            slices_read: 0,
            rows_read: 0,
        })
    }

    /// The header of the stream.
    pub fn header(&self) -> FileHeader {
        self.header
    }

    /// The metadata of the table slices this reader produces, with projection applied.
    pub fn metadata(&self) -> &Arc<TableMetadata> {
        &self.metadata
    }

    /// The metadata as stored in the stream.
    pub fn file_metadata(&self) -> &Arc<TableMetadata> {
        &self.file_metadata
    }

    /// Read the next table slice, or `None` once the end of the table is reached.
    pub fn next_slice(&mut self) -> SbdfResult<Option<TableSlice>> {
        if !self.begin_slice()? {
            return Ok(None);
        }

        let column_count = self.file_metadata.column_count();
        let mut columns: Vec<Option<ColumnSlice>> = vec![None; column_count];
        for (idx, column) in columns.iter_mut().enumerate() {
            if self.is_projected(idx) {
                *column = Some(
                    ColumnSlice::read(&mut self.read)
                        .map_err(|e| e.with_context(format!("reading column {idx}")))?,
                );
            } else {
                ColumnSlice::skip(&mut self.read)?;
            }
        }

        let mut slice = TableSlice::new(self.metadata.clone());
        match &self.projection {
            None => {
                for column in columns.into_iter().flatten() {
                    slice.add(column)?;
                }
            }
            Some(indices) => {
                for &idx in indices {
                    let column = columns
                        .get_mut(idx)
                        .and_then(Option::take)
                        .ok_or_else(|| sbdf_err!("column {} was not read", idx))?;
                    slice.add(column)?;
                }
            }
        }

        self.slices_read += 1;
        self.rows_read += slice.row_count();
        log::trace!(
            "Read table slice {} with {} rows",
            self.slices_read,
            slice.row_count()
        );
        Ok(Some(slice))
    }

    /// Skip the next table slice without decoding it. Returns `false` at the end of the table.
    pub fn skip_slice(&mut self) -> SbdfResult<bool> {
        if !self.begin_slice()? {
            return Ok(false);
        }
        for _ in 0..self.file_metadata.column_count() {
            ColumnSlice::skip(&mut self.read)?;
        }
        self.slices_read += 1;
        log::trace!("Skipped table slice {}", self.slices_read);
        Ok(true)
    }

    /// Give back the underlying stream.
    pub fn into_inner(self) -> R {
        self.read
    }

    fn is_projected(&self, idx: usize) -> bool {
        self.projection
            .as_ref()
            .is_none_or(|indices| indices.contains(&idx))
    }

    /// Consume a table slice header, or the end section. Returns whether a slice follows.
    fn begin_slice(&mut self) -> SbdfResult<bool> {
        if self.finished {
            return Ok(false);
        }
        match read_section(&mut self.read)? {
            SectionId::TableEnd => {
                self.finished = true;
                log::debug!(
                    "Finished SBDF stream after {} slices, {} rows",
                    self.slices_read,
                    self.rows_read
                );
                Ok(false)
            }
            SectionId::TableSlice => {
                let column_count = self.read.read_count()?;
                if column_count != self.file_metadata.column_count() {
                    sbdf_bail!(
                        ColumnCountMismatch: "table slice has {} columns, the table has {}",
                        column_count,
                        self.file_metadata.column_count()
                    );
                }
                Ok(true)
            }
            other => sbdf_bail!(
                UnexpectedSectionId: "expected table slice or table end section, found {}",
                other
            ),
        }
    }
}

impl<R: Read> Iterator for SbdfReader<R> {
    type Item = SbdfResult<TableSlice>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_slice() {
            Ok(slice) => slice.map(Ok),
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}
