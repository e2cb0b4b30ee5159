pub use appender::{Appender, Config as AppenderConfig};
pub use ops::{BinaryOp, Mean, ScalarSide};
pub use rle_vec::{RleVec, RleVecBuilder};

pub mod appender;
pub mod layout;
mod ops;
mod predicates;
pub mod rle_vec;
pub mod select;
mod text;
pub mod varint;
