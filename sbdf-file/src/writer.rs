use std::io::Write;

use bytes::BytesMut;
use sbdf_error::{SbdfResult, sbdf_bail};
use sbdf_metadata::TableMetadata;

use crate::header::FileHeader;
use crate::section::{SectionId, write_section};
use crate::slice::{TableSlice, TableSliceView};

/// Create a writer for a table described by `metadata`, writing the header and metadata.
pub fn open_for_write<W: Write>(write: W, metadata: TableMetadata) -> SbdfResult<SbdfWriter<W>> {
    SbdfWriter::try_new(write, metadata)
}

/// A forward-only writer of SBDF streams.
///
/// Once writing to the stream fails the writer refuses further slices and [`finish`](Self::finish) fails, so an
/// aborted stream never carries an end marker.
pub struct SbdfWriter<W> {
    write: W,
    metadata: TableMetadata,
    buffer: BytesMut,
    poisoned: bool,
    slices_written: usize,
    rows_written: usize,
}

impl<W: Write> SbdfWriter<W> {
    /// Write the file header and table metadata sections.
    pub fn try_new(mut write: W, metadata: TableMetadata) -> SbdfResult<Self> {
        let mut buffer = BytesMut::new();
        FileHeader::default().write(&mut buffer);
        write_section(&mut buffer, SectionId::TableMetadata);
        metadata.write(&mut buffer)?;
        write.write_all(&buffer)?;
        buffer.clear();

        log::debug!(
            "Started SBDF stream with {} columns",
            metadata.column_count()
        );

        Ok(Self {
            write,
            metadata,
            buffer,
            poisoned: false,
            slices_written: 0,
            rows_written: 0,
        })
    }

    /// The metadata every written slice must belong to.
    pub fn metadata(&self) -> &TableMetadata {
        &self.metadata
    }

    /// Write a complete table slice.
    pub fn write(&mut self, slice: &TableSlice) -> SbdfResult<()> {
        self.write_view(&slice.as_view())
    }

    /// Write a complete table slice borrowing its arrays.
    pub fn write_view(&mut self, slice: &TableSliceView<'_>) -> SbdfResult<()> {
        if self.poisoned {
            sbdf_bail!("writer failed earlier and cannot accept further slices");
        }
        if slice.metadata() != &self.metadata {
            sbdf_bail!(IncorrectColumnMetadata: "table slice belongs to a different table");
        }

        // nothing reaches the stream until the whole slice is encoded
        self.buffer.clear();
        slice.write(&mut self.buffer)?;
        if let Err(e) = self.write.write_all(&self.buffer) {
            self.poisoned = true;
            return Err(e.into());
        }

        self.slices_written += 1;
        self.rows_written += slice.row_count();
        log::trace!(
            "Wrote table slice {} with {} rows in {} bytes",
            self.slices_written,
            slice.row_count(),
            self.buffer.len()
        );
        Ok(())
    }

    /// Write the table end section, flush, and give back the underlying stream.
    pub fn finish(mut self) -> SbdfResult<W> {
        if self.poisoned {
            sbdf_bail!("writer failed earlier, refusing to end the table");
        }
        self.buffer.clear();
        write_section(&mut self.buffer, SectionId::TableEnd);
        self.write.write_all(&self.buffer)?;
        self.write.flush()?;

        log::debug!(
            "Finished SBDF stream after {} slices, {} rows",
            self.slices_written,
            self.rows_written
        );
        Ok(self.write)
    }
}
