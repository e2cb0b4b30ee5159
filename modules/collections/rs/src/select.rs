//! Order statistics over run-length encoded data.
//!
//! Quickselect runs on the parallel arrays of run values and run lengths. A [`RealIndex`] maps
//! run indices to the logical positions they cover, which makes the same partitioning loop work
//! for dense arrays (every run has length one) and for compressed runs.

use std::cmp::Ordering;
use std::ops::Range;

use ::impl_tools::autoimpl;
use eyre::Result;
use rand::Rng;

use rlevec_core_rs::{is_nvp, RleError, Value};

use crate::rle_vec::RleVec;

/// Number of logical positions covered by a range of runs.
#[autoimpl(for <R: trait + ?Sized> &R, Box<R>)]
pub trait RealIndex {
    fn span(&self, lengths: &[u64], runs: Range<usize>) -> u64;
}

/// Every run covers exactly one position.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub struct Dense;

impl RealIndex for Dense {
    #[inline(always)]
    fn span(&self, _: &[u64], runs: Range<usize>) -> u64 {
        runs.len() as u64
    }
}

/// Runs cover as many positions as their lengths say.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub struct Compressed;

impl RealIndex for Compressed {
    #[inline(always)]
    fn span(&self, lengths: &[u64], runs: Range<usize>) -> u64 {
        lengths.get(runs).map_or(0, |x| x.iter().sum())
    }
}

/// Three-way partition of `values[left..=right]` around `values[pivot]`, moving `lengths` in
/// lock-step when present. Returns the half-open range of elements equal to the pivot.
fn partition(
    values: &mut [f64],
    lengths: &mut [u64],
    left: usize,
    right: usize,
    pivot: usize,
) -> Range<usize> {
    let mut swap = |a: usize, b: usize, values: &mut [f64]| {
        values.swap(a, b);
        if !lengths.is_empty() {
            lengths.swap(a, b);
        }
    };

    let pivot = values[pivot];
    let (mut lt, mut cursor, mut gt) = (left, left, right + 1);
    while cursor < gt {
        match values[cursor].total_cmp(&pivot) {
            Ordering::Less => {
                swap(lt, cursor, values);
                lt += 1;
                cursor += 1;
            }
            Ordering::Greater => {
                gt -= 1;
                swap(cursor, gt, values);
            }
            Ordering::Equal => cursor += 1,
        }
    }
    lt..gt
}

/// Index of the run holding the element of 0-based logical rank `k`.
///
/// `values` and `lengths` are reordered. `lengths` may be empty when `real_index` doesn't read it.
/// Fails with `OutOfRange` unless `k` is below the total span of all runs.
pub fn partition_select<R: Rng + ?Sized>(
    values: &mut [f64],
    lengths: &mut [u64],
    k: u64,
    real_index: impl RealIndex,
    rng: &mut R,
) -> Result<usize> {
    if !lengths.is_empty() && lengths.len() != values.len() {
        return Err(RleError::malformed(format!(
            "{} run lengths for {} values",
            lengths.len(),
            values.len()
        ))
        .into());
    }
    let total = real_index.span(lengths, 0..values.len());
    if values.is_empty() || k >= total {
        return Err(RleError::OutOfRange {
            index: k,
            length: total,
        }
        .into());
    }

    let (mut left, mut right) = (0, values.len() - 1);
    // Logical positions covered by runs before `left`
    let mut offset = 0;
    let mut iterations = 0;
    loop {
        iterations += 1;

        let pivot = rng.gen_range(left..=right);
        let equal = partition(values, lengths, left, right, pivot);

        let start = offset + real_index.span(lengths, left..equal.start);
        let end = start + real_index.span(lengths, equal.clone());
        if k < start {
            right = equal.start - 1;
        } else if k >= end {
            offset = end;
            left = equal.end;
        } else {
            log::debug!(
                "Selected rank {} among {} runs after {} iterations",
                k,
                values.len(),
                iterations
            );
            return Ok(equal.start);
        }
    }
}

/// The element of 0-based rank `k` in `values`, which are reordered.
pub fn select_dense<R: Rng + ?Sized>(values: &mut [f64], k: usize, rng: &mut R) -> Result<f64> {
    if k >= values.len() {
        return Err(RleError::OutOfRange {
            index: k as u64,
            length: values.len() as u64,
        }
        .into());
    }
    let index = partition_select(values, &mut [], k as u64, Dense, rng)?;
    Ok(values[index])
}

impl RleVec {
    /// Element of 0-based rank `k` in ascending order, `None` if the vector has missing elements.
    pub fn order_statistic<R: Rng + ?Sized>(&self, k: u64, rng: &mut R) -> Result<Value> {
        let runs = self.runs::<f64>()?;
        if k >= self.logical_length {
            return Err(RleError::OutOfRange {
                index: k,
                length: self.logical_length,
            }
            .into());
        }

        let mut values = Vec::with_capacity(self.run_count);
        let mut lengths = Vec::with_capacity(self.run_count);
        for (value, length) in runs {
            if is_nvp(value) {
                return Ok(None);
            }
            values.push(value);
            lengths.push(length);
        }

        let index = if self.is_uncompressed() {
            partition_select(&mut values, &mut [], k, Dense, rng)?
        } else {
            partition_select(&mut values, &mut lengths, k, Compressed, rng)?
        };
        Ok(Some(values[index]))
    }

    /// Lower median, the element of rank `(dimension - 1) / 2`.
    pub fn median<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Value> {
        if self.logical_length == 0 {
            return Err(RleError::OutOfRange {
                index: 0,
                length: 0,
            }
            .into());
        }
        self.order_statistic((self.logical_length - 1) / 2, rng)
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    #[test]
    fn test_select_dense() -> Result<()> {
        let mut rng = StdRng::seed_from_u64(42);
        let values = [5.0, -1.0, 3.0, 3.0, 0.0, 9.0, 3.0];
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        for k in 0..values.len() {
            let mut scratch = values.to_vec();
            assert_eq!(select_dense(&mut scratch, k, &mut rng)?, sorted[k], "rank {k}");
        }
        assert!(select_dense(&mut values.to_vec(), 7, &mut rng).is_err());
        assert!(select_dense(&mut [], 0, &mut rng).is_err());
        Ok(())
    }

    #[test]
    fn test_partition_select_bounds() -> Result<()> {
        let mut rng = StdRng::seed_from_u64(11);
        let mut values = vec![2.0, 1.0];
        let mut lengths = vec![3, 1];
        let index = partition_select(&mut values, &mut lengths, 3, Compressed, &mut rng)?;
        assert_eq!(values[index], 2.0);

        for (mut values, mut lengths, k, dense) in [
            (vec![], vec![], 0, true),
            (vec![], vec![], 0, false),
            (vec![2.0, 1.0], vec![3, 1], 4, false),
            (vec![2.0, 1.0], vec![], 2, true),
            (vec![2.0, 1.0], vec![], 0, false),
        ] {
            let selected = if dense {
                partition_select(&mut values, &mut lengths, k, Dense, &mut rng)
            } else {
                partition_select(&mut values, &mut lengths, k, Compressed, &mut rng)
            };
            let err = selected.unwrap_err();
            assert!(
                matches!(err.downcast_ref::<RleError>(), Some(RleError::OutOfRange { .. })),
                "{err}"
            );
        }

        let err = partition_select(&mut [1.0, 2.0], &mut [1], 0, Compressed, &mut rng).unwrap_err();
        assert!(matches!(err.downcast_ref::<RleError>(), Some(RleError::Malformed { .. })));
        Ok(())
    }

    #[test]
    fn test_select_many_duplicates() -> Result<()> {
        let mut rng = StdRng::seed_from_u64(7);
        let mut values = vec![0.0; 10_000];
        values[1234] = 1.0;
        assert_eq!(select_dense(&mut values.clone(), 9_998, &mut rng)?, 0.0);
        assert_eq!(select_dense(&mut values, 9_999, &mut rng)?, 1.0);
        Ok(())
    }

    #[test]
    fn test_order_statistic_compressed() -> Result<()> {
        let mut rng = StdRng::seed_from_u64(0);
        let rle = RleVec::from_runs(&[4.0, -2.0, 7.0, 0.0], &[3, 1, 2, 1000])?;
        let mut dense = rle.to_dense::<f64>()?;
        dense.sort_by(f64::total_cmp);

        for k in [0, 1, 500, 1000, 1001, 1003, 1005] {
            assert_eq!(rle.order_statistic(k, &mut rng)?, Some(dense[k as usize]), "rank {k}");
        }
        assert_eq!(rle.median(&mut rng)?, Some(0.0));

        let err = rle.order_statistic(1006, &mut rng).unwrap_err();
        assert_eq!(
            err.downcast_ref::<RleError>(),
            Some(&RleError::OutOfRange {
                index: 1006,
                length: 1006
            })
        );
        Ok(())
    }

    #[test]
    fn test_median() -> Result<()> {
        let mut rng = StdRng::seed_from_u64(3);
        for (values, expected) in [
            (vec![Some(1.0)], Some(1.0)),
            (vec![Some(3.0), Some(1.0), Some(2.0)], Some(2.0)),
            (vec![Some(4.0), Some(1.0), Some(3.0), Some(2.0)], Some(2.0)),
            (vec![Some(4.0), None, Some(3.0)], None),
        ] {
            assert_eq!(RleVec::from_values(&values).median(&mut rng)?, expected);
        }

        let uncompressed = RleVec::uncompressed(&[9.0, 1.0, 5.0]);
        assert_eq!(uncompressed.median(&mut rng)?, Some(5.0));

        assert!(RleVec::default().median(&mut rng).is_err());
        assert!(RleVec::from_dense(&[1i32]).median(&mut rng).is_err());
        Ok(())
    }
}
