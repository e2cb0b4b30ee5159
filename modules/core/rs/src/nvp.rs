/// Bit pattern reserved to mark a missing element ("no value present") inside a float stream.
///
/// It is a quiet NaN with a payload no arithmetic instruction produces, so it never collides with
/// NaNs coming out of regular computations.
pub const NVP_BITS: u64 = 0x7FF8_0000_0000_4E56;

/// The no-value sentinel as a float.
pub const NVP: f64 = f64::from_bits(NVP_BITS);

/// A float element with an explicit missing state. `None` is stored as [`NVP`] in byte streams.
pub type Value = Option<f64>;

#[inline(always)]
pub fn is_nvp(raw: f64) -> bool {
    raw.to_bits() == NVP_BITS
}

/// Translate a raw stored float into a value, mapping the sentinel to `None`.
#[inline(always)]
pub fn value_from_raw(raw: f64) -> Value {
    if is_nvp(raw) {
        None
    } else {
        Some(raw)
    }
}

/// Translate a value into the raw float written to byte streams.
#[inline(always)]
pub fn value_to_raw(value: Value) -> f64 {
    value.unwrap_or(NVP)
}
