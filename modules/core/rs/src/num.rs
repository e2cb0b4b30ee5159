use std::fmt::Debug;

/// T values are float numbers
pub trait Float: ::num::Float + Debug + Default {}

impl<T: ::num::Float + Debug + Default> Float for T {}

/// Raise `base` to `exponent`. Exponents 2, 3 and 4 are computed with plain multiplications.
#[inline]
pub fn pow<T: Float>(base: T, exponent: T) -> T {
    let two = T::one() + T::one();
    if exponent == two {
        base * base
    } else if exponent == two + T::one() {
        base * base * base
    } else if exponent == two * two {
        let square = base * base;
        square * square
    } else {
        base.powf(exponent)
    }
}
