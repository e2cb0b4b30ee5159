use derive_more::{Display, Error};

use crate::ElementType;

/// Failure kinds reported by the RLE engine.
///
/// Operations return `eyre::Result`, callers recover the kind with `report.downcast_ref::<RleError>()`.
#[derive(Clone, PartialEq, Eq, Debug, Display, Error)]
pub enum RleError {
    /// Binary operation on vectors of unequal logical length.
    #[display("Dimensions of vectors must be the same, got {left} and {right}")]
    DimensionMismatch { left: u64, right: u64 },
    /// 1-based index (or count) outside of the valid range.
    #[display("Index {index} is out of bounds for a vector of length {length}")]
    OutOfRange { index: u64, length: u64 },
    /// Operation requires a different element type.
    #[display("Expected {expected} elements, got {actual}")]
    TypeMismatch {
        expected: ElementType,
        actual: ElementType,
    },
    /// Stored run lengths disagree with the stored logical length.
    #[display("Decoded {decoded} elements while the vector declares {expected}")]
    DecodeConsistency { decoded: u64, expected: u64 },
    /// Backing buffer growth failed.
    #[display("Failed to reserve {requested} additional bytes")]
    AllocationFailure { requested: usize },
    /// Byte layout or text form that can't be interpreted.
    #[display("Malformed input: {reason}")]
    Malformed { reason: String },
}

impl RleError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::Malformed {
            reason: reason.into(),
        }
    }
}
