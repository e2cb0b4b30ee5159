use derive_more::Display;
use eyre::Result;

use rlevec_core_rs::{num, value_from_raw, value_to_raw, Element, ElementType, Value};

use crate::rle_vec::{merge2, Merge2Fn, RleVec};

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Display)]
pub enum BinaryOp {
    #[display("+")]
    Add,
    #[display("-")]
    Sub,
    #[display("*")]
    Mul,
    #[display("/")]
    Div,
}

impl BinaryOp {
    #[inline(always)]
    pub fn apply(&self, first: f64, second: f64) -> f64 {
        match self {
            BinaryOp::Add => first + second,
            BinaryOp::Sub => first - second,
            BinaryOp::Mul => first * second,
            BinaryOp::Div => first / second,
        }
    }

    /// Missing operands produce a missing result.
    #[inline(always)]
    pub fn apply_values(&self, first: Value, second: Value) -> Value {
        Some(self.apply(first?, second?))
    }

    #[inline(always)]
    fn apply_raw(&self, first: f64, second: f64) -> f64 {
        value_to_raw(self.apply_values(value_from_raw(first), value_from_raw(second)))
    }
}

/// Position of the scalar operand in a broadcast operation.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub enum ScalarSide {
    /// `value OP scalar`
    #[default]
    Right,
    /// `scalar OP value`
    Left,
}

impl RleVec {
    /// Elementwise `self OP other` over vectors of equal dimension.
    pub fn binary(&self, op: BinaryOp, other: &RleVec) -> Result<RleVec> {
        merge2::<f64, _>(self, other)
            .with_merge2(Merge2Fn::new(|first: &f64, second: &f64| {
                op.apply_raw(*first, *second)
            }))
            .run()
    }

    /// Apply `f` once per run to the stored floats, keeping run lengths intact.
    pub(crate) fn map_raw_inplace(&mut self, mut f: impl FnMut(f64) -> f64) -> Result<()> {
        self.dtype.ensure(ElementType::Float8)?;
        for chunk in self.values.chunks_exact_mut(8) {
            let value = f(f64::read_le(chunk));
            chunk.copy_from_slice(&value.to_le_bytes());
        }
        Ok(())
    }

    /// Broadcast `scalar` over every element in place. A missing scalar makes every element missing.
    pub fn scalar_op_inplace(&mut self, op: BinaryOp, scalar: Value, side: ScalarSide) -> Result<()> {
        let scalar = value_to_raw(scalar);
        match side {
            ScalarSide::Right => self.map_raw_inplace(|value| op.apply_raw(value, scalar)),
            ScalarSide::Left => self.map_raw_inplace(|value| op.apply_raw(scalar, value)),
        }
    }

    pub fn scalar_op(&self, op: BinaryOp, scalar: Value, side: ScalarSide) -> Result<RleVec> {
        let mut result = self.clone();
        result.scalar_op_inplace(op, scalar, side)?;
        Ok(result)
    }

    /// Transform every present value with `f`. Missing values stay missing.
    pub fn map(&self, mut f: impl FnMut(f64) -> f64) -> Result<RleVec> {
        let mut result = self.clone();
        result.map_raw_inplace(|raw| value_to_raw(value_from_raw(raw).map(&mut f)))?;
        Ok(result)
    }

    pub fn pow(&self, exponent: f64) -> Result<RleVec> {
        self.map(|value| num::pow(value, exponent))
    }

    /// Natural logarithm of every element.
    pub fn log(&self) -> Result<RleVec> {
        self.map(f64::ln)
    }
}

#[cfg(test)]
mod tests {
    use rlevec_core_rs::RleError;

    use super::*;

    fn dense(rle: &RleVec) -> Vec<Value> {
        rle.to_values().unwrap()
    }

    #[test]
    fn test_binary_ops() -> Result<()> {
        let first = RleVec::from_dense(&[0.0, 0.0, 0.0, 33.0, 0.0, 0.0, 12.0, 22.0]);
        let second = RleVec::from_runs(&[1.0, 2.0], &[4, 4])?;

        for (op, expected) in [
            (BinaryOp::Add, vec![1.0, 1.0, 1.0, 34.0, 2.0, 2.0, 14.0, 24.0]),
            (BinaryOp::Sub, vec![-1.0, -1.0, -1.0, 32.0, -2.0, -2.0, 10.0, 20.0]),
            (BinaryOp::Mul, vec![0.0, 0.0, 0.0, 33.0, 0.0, 0.0, 24.0, 44.0]),
            (BinaryOp::Div, vec![0.0, 0.0, 0.0, 33.0, 0.0, 0.0, 6.0, 11.0]),
        ] {
            let result = first.binary(op, &second)?;
            assert_eq!(result.to_dense::<f64>()?, expected, "{op}");
        }

        // Equal neighbours are merged into a single run
        let product = first.binary(BinaryOp::Mul, &second)?;
        assert_eq!(product.run_count(), 5);
        Ok(())
    }

    #[test]
    fn test_binary_ops_propagate_nvp() -> Result<()> {
        let first = RleVec::from_values(&[Some(1.0), None, Some(3.0)]);
        let second = RleVec::from_values(&[None, Some(2.0), Some(3.0)]);
        let sum = first.binary(BinaryOp::Add, &second)?;
        assert_eq!(dense(&sum), vec![None, None, Some(6.0)]);
        assert_eq!(sum.run_count(), 2);
        Ok(())
    }

    #[test]
    fn test_binary_ops_errors() {
        let floats = RleVec::from_dense(&[1.0, 2.0]);
        let longer = RleVec::from_dense(&[1.0, 2.0, 3.0]);
        let ints = RleVec::from_dense(&[1i32, 2]);

        let err = floats.binary(BinaryOp::Add, &longer).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RleError>(),
            Some(RleError::DimensionMismatch { left: 2, right: 3 })
        ));

        let err = floats.binary(BinaryOp::Add, &ints).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RleError>(),
            Some(RleError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_scalar_ops() -> Result<()> {
        let rle = RleVec::from_values(&[Some(2.0), Some(2.0), None, Some(8.0)]);
        for (op, side, expected) in [
            (BinaryOp::Add, ScalarSide::Right, vec![Some(3.0), Some(3.0), None, Some(9.0)]),
            (BinaryOp::Sub, ScalarSide::Right, vec![Some(1.0), Some(1.0), None, Some(7.0)]),
            (BinaryOp::Sub, ScalarSide::Left, vec![Some(-1.0), Some(-1.0), None, Some(-7.0)]),
            (BinaryOp::Div, ScalarSide::Left, vec![Some(0.5), Some(0.5), None, Some(0.125)]),
        ] {
            let result = rle.scalar_op(op, Some(1.0), side)?;
            assert_eq!(dense(&result), expected);
            assert_eq!(result.run_count(), rle.run_count());
        }

        let mut inplace = rle.clone();
        inplace.scalar_op_inplace(BinaryOp::Mul, None, ScalarSide::Right)?;
        assert_eq!(dense(&inplace), vec![None; 4]);

        let mut ints = RleVec::from_dense(&[1i64]);
        assert!(ints
            .scalar_op_inplace(BinaryOp::Add, Some(1.0), ScalarSide::Right)
            .is_err());
        Ok(())
    }

    #[test]
    fn test_map_pow_log() -> Result<()> {
        let rle = RleVec::from_values(&[Some(3.0), None, Some(1.0), Some(1.0)]);
        assert_eq!(
            dense(&rle.pow(2.0)?),
            vec![Some(9.0), None, Some(1.0), Some(1.0)]
        );
        assert_eq!(
            dense(&rle.pow(3.0)?),
            vec![Some(27.0), None, Some(1.0), Some(1.0)]
        );
        assert_eq!(
            dense(&rle.log()?),
            vec![Some(3f64.ln()), None, Some(0.0), Some(0.0)]
        );
        assert_eq!(
            dense(&rle.map(|x| -x)?),
            vec![Some(-3.0), None, Some(-1.0), Some(-1.0)]
        );
        Ok(())
    }
}
