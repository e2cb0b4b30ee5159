pub use identical::{Bitwise, Identical};
pub use merge2::{merge2, Merge2, Merge2Fn, Merge2Setup};
pub use overlap::{overlaps, Overlaps};
pub use rle_vec::{RleVec, RleVecBuilder, RunLengths};

mod identical;
mod merge2;
mod overlap;
#[allow(clippy::module_inception)]
mod rle_vec;
