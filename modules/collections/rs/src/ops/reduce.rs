use std::cmp::Ordering;

use eyre::Result;

use rlevec_core_rs::{value_from_raw, ElementType, RleError, Value};

use super::{BinaryOp, ScalarSide};
use crate::rle_vec::RleVec;

impl RleVec {
    /// `Σ transform(value) × length` over runs. `None` if any element is missing.
    pub fn accumulate(&self, mut transform: impl FnMut(f64) -> f64) -> Result<Value> {
        let mut total = 0.0;
        for (value, length) in self.value_runs()? {
            match value {
                None => return Ok(None),
                Some(value) => total += transform(value) * length as f64,
            }
        }
        Ok(Some(total))
    }

    pub fn sum(&self) -> Result<Value> {
        self.accumulate(|x| x)
    }

    pub fn l1_norm(&self) -> Result<Value> {
        self.accumulate(f64::abs)
    }

    pub fn l2_norm(&self) -> Result<Value> {
        Ok(self.accumulate(|x| x * x)?.map(f64::sqrt))
    }

    pub fn dot(&self, other: &RleVec) -> Result<Value> {
        self.binary(BinaryOp::Mul, other)?.sum()
    }

    pub fn l1_distance(&self, other: &RleVec) -> Result<Value> {
        self.binary(BinaryOp::Sub, other)?.l1_norm()
    }

    pub fn l2_distance(&self, other: &RleVec) -> Result<Value> {
        self.binary(BinaryOp::Sub, other)?.l2_norm()
    }

    /// Angle between two vectors in radians.
    pub fn angle(&self, other: &RleVec) -> Result<Value> {
        let dot = self.dot(other)?;
        let (first, second) = (self.l2_norm()?, other.l2_norm()?);
        Ok(match (dot, first, second) {
            (Some(dot), Some(first), Some(second)) => {
                Some((dot / (first * second)).clamp(-1.0, 1.0).acos())
            }
            _ => None,
        })
    }

    pub fn tanimoto_distance(&self, other: &RleVec) -> Result<Value> {
        let dot = self.dot(other)?;
        let (first, second) = (self.l2_norm()?, other.l2_norm()?);
        Ok(match (dot, first, second) {
            (Some(dot), Some(first), Some(second)) => {
                let similarity = dot / (first * first + second * second - dot);
                Some(1.0 - similarity.clamp(0.0, 1.0))
            }
            _ => None,
        })
    }

    /// The vector scaled to unit l2 norm.
    pub fn normalize(&self) -> Result<RleVec> {
        let norm = self.l2_norm()?;
        self.scalar_op(BinaryOp::Div, norm, Default::default())
    }

    /// Order two vectors by their l2 norms.
    pub fn l2_cmp(&self, other: &RleVec) -> Result<Option<Ordering>> {
        Ok(match (self.l2_norm()?, other.l2_norm()?) {
            (Some(first), Some(second)) => first.partial_cmp(&second),
            _ => None,
        })
    }

    /// Add one to every counter whose element in `values` is present and non-zero.
    pub fn count_nonzero(&self, values: &RleVec) -> Result<RleVec> {
        let mut indicator = values.clone();
        indicator.map_raw_inplace(|raw| match value_from_raw(raw) {
            Some(x) if x != 0.0 => 1.0,
            _ => 0.0,
        })?;
        self.binary(BinaryOp::Add, &indicator)
    }
}

/// Elementwise mean of float vectors sharing one dimension, accumulated one vector at a time.
///
/// Partial means built over disjoint inputs combine with [`Mean::merge`].
#[derive(Clone, Debug, Default)]
pub struct Mean {
    total: Option<RleVec>,
    count: u64,
}

impl Mean {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of vectors accumulated so far.
    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn push(&mut self, rle: &RleVec) -> Result<()> {
        let total = match &self.total {
            None => {
                rle.dtype.ensure(ElementType::Float8)?;
                rle.clone()
            }
            Some(total) => total.binary(BinaryOp::Add, rle)?,
        };
        self.total = Some(total);
        self.count += 1;
        Ok(())
    }

    pub fn merge(&mut self, other: Mean) -> Result<()> {
        let Some(other_total) = other.total else {
            return Ok(());
        };
        let total = match &self.total {
            None => other_total,
            Some(total) => total.binary(BinaryOp::Add, &other_total)?,
        };
        self.total = Some(total);
        self.count += other.count;
        Ok(())
    }

    /// The mean vector. Fails with `OutOfRange` when nothing was accumulated.
    pub fn finish(self) -> Result<RleVec> {
        let mut total = self.total.ok_or(RleError::OutOfRange {
            index: 0,
            length: 0,
        })?;
        total.scalar_op_inplace(BinaryOp::Div, Some(self.count as f64), ScalarSide::Right)?;
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-12;

    #[test]
    fn test_reductions() -> Result<()> {
        let rle = RleVec::from_runs(&[1.0, -2.0, 0.5], &[4, 2, 16])?;
        assert_eq!(rle.sum()?, Some(8.0));
        assert_eq!(rle.l1_norm()?, Some(16.0));
        assert_eq!(rle.l2_norm()?, Some(4.0));

        let empty = RleVec::default();
        assert_eq!(empty.sum()?, Some(0.0));

        let missing = RleVec::from_values(&[Some(1.0), None]);
        assert_eq!(missing.sum()?, None);
        assert_eq!(missing.l2_norm()?, None);

        assert!(RleVec::from_dense(&[1i32]).sum().is_err());
        Ok(())
    }

    #[test]
    fn test_pairwise_measures() -> Result<()> {
        let first = RleVec::from_dense(&[1.0, 0.0, 0.0]);
        let second = RleVec::from_dense(&[0.0, 2.0, 0.0]);

        assert_eq!(first.dot(&second)?, Some(0.0));
        assert_eq!(first.l1_distance(&second)?, Some(3.0));
        assert_eq!(first.l2_distance(&second)?, Some(5f64.sqrt()));

        let angle = first.angle(&second)?.unwrap();
        assert!((angle - std::f64::consts::FRAC_PI_2).abs() < EPS);
        assert!(first.angle(&first)?.unwrap().abs() < 1e-6);

        assert_eq!(first.tanimoto_distance(&second)?, Some(1.0));
        assert_eq!(first.tanimoto_distance(&first)?, Some(0.0));

        assert_eq!(first.l2_cmp(&second)?, Some(Ordering::Less));
        assert_eq!(second.l2_cmp(&first)?, Some(Ordering::Greater));
        Ok(())
    }

    #[test]
    fn test_normalize() -> Result<()> {
        let rle = RleVec::from_runs(&[3.0, 4.0], &[1, 1])?;
        assert_eq!(rle.normalize()?.to_dense::<f64>()?, vec![0.6, 0.8]);

        let missing = RleVec::from_values(&[Some(3.0), None]);
        assert_eq!(missing.normalize()?.to_values()?, vec![None, None]);
        Ok(())
    }

    #[test]
    fn test_count_nonzero() -> Result<()> {
        let mut counter = RleVec::filled(0.0, 4)?;
        for row in [
            RleVec::from_values(&[Some(1.0), Some(0.0), None, Some(-3.0)]),
            RleVec::from_values(&[Some(0.0), Some(0.0), Some(2.0), Some(5.0)]),
        ] {
            counter = counter.count_nonzero(&row)?;
        }
        assert_eq!(counter.to_dense::<f64>()?, vec![1.0, 0.0, 1.0, 2.0]);
        assert!(counter.count_nonzero(&RleVec::filled(1.0, 3)?).is_err());
        Ok(())
    }

    #[test]
    fn test_mean() -> Result<()> {
        let mut mean = Mean::new();
        for dense in [[1.0, 2.0, 3.0], [3.0, 2.0, 1.0], [2.0, 2.0, 8.0]] {
            mean.push(&RleVec::from_dense(&dense))?;
        }
        assert_eq!(mean.count(), 3);
        let result = mean.finish()?;
        assert_eq!(result.runs::<f64>()?.collect::<Vec<_>>(), vec![(2.0, 2), (4.0, 1)]);

        let missing = RleVec::from_values(&[None, Some(1.0)]);
        let mut mean = Mean::new();
        mean.push(&missing)?;
        mean.push(&RleVec::from_dense(&[1.0, 3.0]))?;
        assert_eq!(mean.finish()?.to_values()?, vec![None, Some(2.0)]);
        Ok(())
    }

    #[test]
    fn test_mean_merge() -> Result<()> {
        let mut first = Mean::new();
        first.push(&RleVec::from_dense(&[1.0, 1.0]))?;

        let mut second = Mean::new();
        for dense in [[3.0, 3.0], [5.0, 5.0]] {
            second.push(&RleVec::from_dense(&dense))?;
        }

        first.merge(Mean::new())?;
        first.merge(second)?;
        assert_eq!(first.count(), 3);

        let mut empty = Mean::new();
        empty.merge(first)?;
        assert_eq!(empty.finish()?.to_dense::<f64>()?, vec![3.0, 3.0]);
        Ok(())
    }

    #[test]
    fn test_mean_errors() -> Result<()> {
        let mut mean = Mean::new();
        mean.push(&RleVec::from_dense(&[1.0, 2.0]))?;
        let err = mean.push(&RleVec::from_dense(&[1.0, 2.0, 3.0])).unwrap_err();
        assert_eq!(
            err.downcast_ref::<RleError>(),
            Some(&RleError::DimensionMismatch { left: 2, right: 3 })
        );
        assert_eq!(mean.count(), 1);

        let mut other = Mean::new();
        other.push(&RleVec::from_dense(&[1.0]))?;
        assert!(mean.merge(other).is_err());

        assert!(Mean::new().push(&RleVec::from_dense(&[1i32])).is_err());
        assert!(Mean::new().finish().is_err());
        Ok(())
    }
}
