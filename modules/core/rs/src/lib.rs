pub use element::{Element, ElementType};
pub use error::RleError;
pub use nvp::{is_nvp, value_from_raw, value_to_raw, Value, NVP, NVP_BITS};

mod element;
mod error;
pub mod num;
mod nvp;
