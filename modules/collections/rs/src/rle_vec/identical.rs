use rlevec_core_rs::Element;

/// Decides whether two neighbouring output values belong to the same run.
pub trait Identical<T> {
    /// No guarantees are made about which of the two values is kept in the run.
    fn identical(&self, first: &T, second: &T) -> bool;
}

impl<T, F> Identical<T> for F
where
    F: Fn(&T, &T) -> bool,
{
    #[inline]
    fn identical(&self, first: &T, second: &T) -> bool {
        self(first, second)
    }
}

/// Byte-for-byte identity, the rule used by every encoder in this crate.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub struct Bitwise;

impl<T: Element> Identical<T> for Bitwise {
    #[inline(always)]
    fn identical(&self, first: &T, second: &T) -> bool {
        first.bits_eq(second)
    }
}

#[cfg(test)]
mod tests {
    use rlevec_core_rs::NVP;

    use super::*;

    #[test]
    fn test_bitwise_identity() {
        assert!(Bitwise.identical(&NVP, &NVP));
        assert!(!Bitwise.identical(&0.0, &-0.0));
        assert!(Bitwise.identical(&3i8, &3i8));

        let numeric = |a: &f64, b: &f64| a == b;
        assert!(numeric.identical(&0.0, &-0.0));
        assert!(!numeric.identical(&NVP, &NVP));
    }
}
