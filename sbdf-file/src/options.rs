use itertools::Itertools;
use sbdf_array::{ValueArray, ValueArrayEncoding, Values};
use sbdf_error::{SbdfResult, sbdf_bail};

/// How column values are encoded into value arrays before they are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EncodingStrategy {
    /// Bit arrays for booleans, plain arrays for everything else.
    #[default]
    Default,
    /// Run-length encode whenever that is strictly smaller than the default encoding.
    ///
    /// A run-length array spends eight bytes on its row and run counts plus one byte per run,
    /// so short columns keep the default encoding even when every element repeats.
    RunLengthWhenSmaller,
    /// Plain arrays for every type.
    Plain,
}

impl EncodingStrategy {
    /// Encode `values` according to this strategy.
    pub fn encode(self, values: &Values) -> SbdfResult<ValueArray> {
        match self {
            EncodingStrategy::Default => Ok(ValueArray::create_default(values)),
            EncodingStrategy::Plain => ValueArray::encode(values, ValueArrayEncoding::Plain),
            EncodingStrategy::RunLengthWhenSmaller => {
                let default = ValueArray::create_default(values);
                let run_length = ValueArray::encode(values, ValueArrayEncoding::RunLength)?;
                if run_length.encoded_len()? < default.encoded_len()? {
                    Ok(run_length)
                } else {
                    Ok(default)
                }
            }
        }
    }
}

/// Options for writing tables in row slices.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SbdfWriteOptions {
    rows_per_slice: usize,
    encoding: EncodingStrategy,
}

impl Default for SbdfWriteOptions {
    fn default() -> Self {
        Self {
            rows_per_slice: Self::DEFAULT_ROWS_PER_SLICE,
            encoding: EncodingStrategy::default(),
        }
    }
}

impl SbdfWriteOptions {
    /// The number of rows per slice unless configured otherwise.
    pub const DEFAULT_ROWS_PER_SLICE: usize = 50_000;

    /// Set the maximum number of rows in each table slice.
    pub fn with_rows_per_slice(mut self, rows_per_slice: usize) -> SbdfResult<Self> {
        if rows_per_slice == 0 {
            sbdf_bail!("rows per slice must be positive");
        }
        self.rows_per_slice = rows_per_slice;
        Ok(self)
    }

    /// Set the encoding strategy for column values.
    pub fn with_encoding(mut self, encoding: EncodingStrategy) -> Self {
        self.encoding = encoding;
        self
    }

    /// The maximum number of rows in each table slice.
    pub fn rows_per_slice(&self) -> usize {
        self.rows_per_slice
    }

    /// The encoding strategy for column values.
    pub fn encoding(&self) -> EncodingStrategy {
        self.encoding
    }
}

/// Options for reading a file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SbdfReadOptions {
    projection: Option<Vec<usize>>,
}

impl SbdfReadOptions {
    /// Only materialize the columns at `indices`, in that order.
    pub fn with_projection(mut self, indices: impl IntoIterator<Item = usize>) -> SbdfResult<Self> {
        let indices = indices.into_iter().collect::<Vec<_>>();
        if let Some(duplicate) = indices.iter().duplicates().next() {
            sbdf_bail!("column {} is projected more than once", duplicate);
        }
        self.projection = Some(indices);
        Ok(self)
    }

    /// The projected column indices, `None` when every column is read.
    pub fn projection(&self) -> Option<&[usize]> {
        self.projection.as_deref()
    }
}

#[cfg(test)]
mod test {
    use rstest::rstest;
    use sbdf_error::ErrorKind;

    use super::*;

    #[rstest]
    #[case(EncodingStrategy::Default, &[1, 1, 1, 1, 1, 1], ValueArrayEncoding::Plain)]
    #[case(EncodingStrategy::Plain, &[1, 1, 1, 1, 1, 1], ValueArrayEncoding::Plain)]
    #[case(EncodingStrategy::RunLengthWhenSmaller, &[1, 1, 1, 1, 1, 1], ValueArrayEncoding::RunLength)]
    #[case(EncodingStrategy::RunLengthWhenSmaller, &[1, 2, 3, 4, 5, 6], ValueArrayEncoding::Plain)]
    fn strategies(
        #[case] strategy: EncodingStrategy,
        #[case] ints: &[i32],
        #[case] expected: ValueArrayEncoding,
    ) {
        let values = Values::from_i32s(ints);
        let array = strategy.encode(&values).unwrap();
        assert_eq!(array.encoding(), expected);
        assert_eq!(array.decode().unwrap(), values);
    }

    #[rstest]
    #[case(&["aaaa", "aaaa"], ValueArrayEncoding::Plain)]
    #[case(&["aaaa"; 12], ValueArrayEncoding::RunLength)]
    fn run_length_only_when_smaller_for_strings(
        #[case] strs: &[&str],
        #[case] expected: ValueArrayEncoding,
    ) {
        let values = Values::from_strs(strs);
        let array = EncodingStrategy::RunLengthWhenSmaller.encode(&values).unwrap();
        assert_eq!(array.encoding(), expected);
        assert!(
            array.encoded_len().unwrap()
                <= ValueArray::create_default(&values).encoded_len().unwrap()
        );
        assert_eq!(array.decode().unwrap(), values);
    }

    #[test]
    fn default_strategy_packs_bools() {
        let array = EncodingStrategy::Default
            .encode(&Values::from_bools(&[true, false]))
            .unwrap();
        assert_eq!(array.encoding(), ValueArrayEncoding::BitArray);
    }

    #[test]
    fn write_options() {
        let options = SbdfWriteOptions::default();
        assert_eq!(options.rows_per_slice(), 50_000);
        assert_eq!(options.encoding(), EncodingStrategy::Default);

        let options = options
            .with_rows_per_slice(10)
            .unwrap()
            .with_encoding(EncodingStrategy::Plain);
        assert_eq!(options.rows_per_slice(), 10);
        assert_eq!(options.encoding(), EncodingStrategy::Plain);

        assert_eq!(
            SbdfWriteOptions::default()
                .with_rows_per_slice(0)
                .unwrap_err()
                .kind(),
            ErrorKind::ArgumentInvalid
        );
    }

    #[test]
    fn read_options() {
        assert_eq!(SbdfReadOptions::default().projection(), None);
        let options = SbdfReadOptions::default().with_projection([2, 0]).unwrap();
        assert_eq!(options.projection(), Some([2, 0].as_slice()));
        assert_eq!(
            SbdfReadOptions::default()
                .with_projection([1, 1])
                .unwrap_err()
                .kind(),
            ErrorKind::ArgumentInvalid
        );
    }
}
