use std::hash::{Hash, Hasher};

use eyre::Result;

use rlevec_core_rs::Value;

use crate::rle_vec::{overlaps, RleVec};

fn same_bits(first: &Value, second: &Value) -> bool {
    match (first, second) {
        (Some(first), Some(second)) => first.to_bits() == second.to_bits(),
        (None, None) => true,
        _ => false,
    }
}

fn is_zero(value: &Value) -> bool {
    matches!(value, Some(x) if *x == 0.0)
}

impl RleVec {
    /// Element-by-element byte equality. Segmentation doesn't matter, element types and
    /// dimensions must agree.
    pub fn equals(&self, other: &RleVec) -> bool {
        self.dtype == other.dtype
            && self.logical_length == other.logical_length
            && overlaps(self.raw_runs(), other.raw_runs()).all(|(first, second, _)| first == second)
    }

    /// Walk both float vectors with the shorter one padded by zeros.
    fn padded_all(
        &self,
        other: &RleVec,
        mut predicate: impl FnMut(&Value, &Value) -> bool,
    ) -> Result<bool> {
        let pad = |rle: &RleVec| {
            let length = self.logical_length.max(other.logical_length) - rle.logical_length;
            (length > 0).then_some((Some(0.0), length))
        };
        let first = self.value_runs()?.chain(pad(self));
        let second = other.value_runs()?.chain(pad(other));
        Ok(overlaps(first, second).all(|(first, second, _)| predicate(&first, &second)))
    }

    /// Equality where a zero on either side matches anything.
    pub fn eq_zero_is_wildcard(&self, other: &RleVec) -> Result<bool> {
        self.padded_all(other, |first, second| {
            same_bits(first, second) || is_zero(first) || is_zero(second)
        })
    }

    /// True when every non-zero element of `other` equals the element of `self` at the same
    /// position.
    pub fn contains(&self, other: &RleVec) -> Result<bool> {
        self.padded_all(other, |first, second| {
            same_bits(first, second) || is_zero(second)
        })
    }
}

impl PartialEq for RleVec {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other)
    }
}

impl Eq for RleVec {}

/// Hashes maximal runs of equal elements, so vectors that are [`RleVec::equals`] hash the same
/// however their runs are split.
impl Hash for RleVec {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.dtype.hash(state);
        self.logical_length.hash(state);

        let mut runs = self.raw_runs();
        let Some((mut current, mut length)) = runs.next() else {
            return;
        };
        for (value, next) in runs {
            if value == current {
                length += next;
            } else {
                current.hash(state);
                length.hash(state);
                current = value;
                length = next;
            }
        }
        current.hash(state);
        length.hash(state);
    }
}
