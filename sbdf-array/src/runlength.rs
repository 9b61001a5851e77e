use bytes::Bytes;
use itertools::Itertools;
use sbdf_error::{SbdfResult, sbdf_bail, sbdf_err};

use crate::builder::ValuesBuilder;
use crate::values::Values;

/// The longest run a single run byte can describe.
pub const MAX_RUN_LENGTH: usize = 256;

/// Consecutive equal elements collapsed into one value plus a repeat count.
///
/// `runs[i]` holds `repeat - 1` for `values[i]`, so a run covers between 1 and
/// [`MAX_RUN_LENGTH`] rows. Longer runs are split.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunLengthArray {
    row_count: usize,
    runs: Bytes,
    values: Values,
}

impl RunLengthArray {
    /// Validate and wrap decoded run-length parts.
    pub fn try_new(row_count: usize, runs: Bytes, values: Values) -> SbdfResult<Self> {
        if runs.len() != values.len() {
            sbdf_bail!(
                RowCountMismatch: "{} run lengths for {} run values",
                runs.len(),
                values.len()
            );
        }
        let covered: usize = runs.iter().map(|&r| usize::from(r) + 1).sum();
        if covered != row_count {
            sbdf_bail!(
                RowCountMismatch: "runs cover {} rows but the array declares {}",
                covered,
                row_count
            );
        }
        Ok(Self {
            row_count,
            runs,
            values,
        })
    }

    /// Collapse runs of byte-equal consecutive elements.
    pub fn encode(values: &Values) -> SbdfResult<Self> {
        let mut runs = Vec::new();
        let mut run_values = ValuesBuilder::new(values.value_type());
        for (repeat, element) in values.iter_elements().dedup_with_count() {
            let mut remaining = repeat;
            while remaining > 0 {
                let run = remaining.min(MAX_RUN_LENGTH);
                runs.push(
                    u8::try_from(run - 1)
                        .map_err(|_| sbdf_err!("run of {} does not fit a run byte", run))?,
                );
                run_values.append_element_bytes(element, 1)?;
                remaining -= run;
            }
        }
        Ok(Self {
            row_count: values.len(),
            runs: Bytes::from(runs),
            values: run_values.finish(),
        })
    }

    /// Expand back into one element per row.
    pub fn decode(&self) -> SbdfResult<Values> {
        let mut builder = ValuesBuilder::try_with_capacity(self.values.value_type(), self.row_count)?;
        for (&run, element) in self.runs.iter().zip(self.values.iter_elements()) {
            builder.append_element_bytes(element, usize::from(run) + 1)?;
        }
        Ok(builder.finish())
    }

    /// The number of rows the runs expand to.
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// One `repeat - 1` byte per run.
    pub fn runs(&self) -> &Bytes {
        &self.runs
    }

    /// One value per run.
    pub fn values(&self) -> &Values {
        &self.values
    }
}

#[cfg(test)]
mod test {
    use rstest::rstest;
    use sbdf_error::ErrorKind;

    use super::*;

    #[test]
    fn collapses_runs() {
        let values = Values::from_i32s(&[7, 7, 7, 1, 2, 2]);
        let encoded = RunLengthArray::encode(&values).unwrap();
        assert_eq!(encoded.row_count(), 6);
        assert_eq!(encoded.runs().as_ref(), &[2, 0, 1]);
        assert_eq!(encoded.values().as_i32s().unwrap(), vec![7, 1, 2]);
        assert_eq!(encoded.decode().unwrap(), values);
    }

    #[rstest]
    #[case(256, &[255])]
    #[case(257, &[255, 0])]
    #[case(600, &[255, 255, 87])]
    fn splits_long_runs(#[case] len: usize, #[case] runs: &[u8]) {
        let values = Values::from_strs(std::iter::repeat_n("x", len));
        let encoded = RunLengthArray::encode(&values).unwrap();
        assert_eq!(encoded.runs().as_ref(), runs);
        assert_eq!(encoded.decode().unwrap(), values);
    }

    #[test]
    fn empty_input() {
        let values = Values::empty(sbdf_dtype::ValueType::Decimal);
        let encoded = RunLengthArray::encode(&values).unwrap();
        assert_eq!(encoded.row_count(), 0);
        assert!(encoded.runs().is_empty());
        assert_eq!(encoded.decode().unwrap(), values);
    }

    #[test]
    fn inconsistent_parts() {
        let values = Values::from_bools(&[true, false]);
        let err = RunLengthArray::try_new(4, Bytes::from_static(&[1]), values.clone()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RowCountMismatch);
        let err = RunLengthArray::try_new(5, Bytes::from_static(&[1, 1]), values.clone()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RowCountMismatch);
        assert!(RunLengthArray::try_new(4, Bytes::from_static(&[1, 1]), values).is_ok());
    }
}
