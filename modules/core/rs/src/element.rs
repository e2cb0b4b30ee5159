use std::fmt::{Debug, Display};

#[cfg(feature = "bitcode")]
use bitcode::{Decode, Encode};
use derive_more::Display;
use eyre::Result;

use crate::RleError;

/// Scalar type tag of the values stored in an RLE vector.
#[cfg_attr(feature = "bitcode", derive(Encode, Decode))]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Display)]
#[repr(u8)]
pub enum ElementType {
    /// Signed 8-bit integer.
    Char = 1,
    /// Signed 16-bit integer.
    Int2 = 2,
    /// Signed 32-bit integer.
    Int4 = 3,
    /// Signed 64-bit integer.
    Int8 = 4,
    /// 32-bit IEEE float.
    Float4 = 5,
    /// 64-bit IEEE float, the only type arithmetic is defined for.
    Float8 = 6,
}

impl ElementType {
    /// Number of bytes occupied by a single value of this type.
    pub fn width(&self) -> usize {
        match self {
            Self::Char => 1,
            Self::Int2 => 2,
            Self::Int4 | Self::Float4 => 4,
            Self::Int8 | Self::Float8 => 8,
        }
    }

    /// Tag written to the persisted layout.
    pub fn tag(&self) -> u8 {
        *self as u8
    }

    /// Fail with `TypeMismatch` unless the type equals `expected`.
    pub fn ensure(&self, expected: ElementType) -> Result<()> {
        if *self != expected {
            return Err(RleError::TypeMismatch {
                expected,
                actual: *self,
            }
            .into());
        }
        Ok(())
    }
}

impl Default for ElementType {
    fn default() -> Self {
        Self::Float8
    }
}

impl TryFrom<u8> for ElementType {
    type Error = RleError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Char),
            2 => Ok(Self::Int2),
            3 => Ok(Self::Int4),
            4 => Ok(Self::Int8),
            5 => Ok(Self::Float4),
            6 => Ok(Self::Float8),
            _ => Err(RleError::malformed(format!("unknown element type tag {value}"))),
        }
    }
}

/// Fixed-width scalar that can be stored in the values stream of an RLE vector.
/// Values are always serialized in little-endian byte order.
pub trait Element: Copy + PartialEq + Debug + Display + 'static {
    const TYPE: ElementType;

    fn write_le(self, out: &mut Vec<u8>);

    /// Read a value from the first `TYPE.width()` bytes of `bytes`.
    fn read_le(bytes: &[u8]) -> Self;

    /// Byte-for-byte equality. Unlike `==`, NaNs with the same payload are equal and `-0.0 != 0.0`.
    fn bits_eq(&self, other: &Self) -> bool;
}

macro_rules! impl_element {
    ($($ty:ty => $tag:ident),* $(,)?) => {
        $(
            impl Element for $ty {
                const TYPE: ElementType = ElementType::$tag;

                #[inline(always)]
                fn write_le(self, out: &mut Vec<u8>) {
                    out.extend_from_slice(&self.to_le_bytes());
                }

                #[inline(always)]
                fn read_le(bytes: &[u8]) -> Self {
                    let mut buffer = [0u8; std::mem::size_of::<$ty>()];
                    buffer.copy_from_slice(&bytes[..std::mem::size_of::<$ty>()]);
                    <$ty>::from_le_bytes(buffer)
                }

                #[inline(always)]
                fn bits_eq(&self, other: &Self) -> bool {
                    self.to_le_bytes() == other.to_le_bytes()
                }
            }
        )*
    };
}

impl_element!(
    i8 => Char,
    i16 => Int2,
    i32 => Int4,
    i64 => Int8,
    f32 => Float4,
    f64 => Float8,
);
