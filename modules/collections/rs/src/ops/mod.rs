pub use arith::{BinaryOp, ScalarSide};
pub use reduce::Mean;

mod arith;
mod range;
mod reduce;
