//! Variable-width encoding of run lengths.
//!
//! A count below 128 is a single byte holding its negation. Larger counts are a tag byte with the
//! payload width (2, 4 or 8) followed by the little-endian payload.

use eyre::Result;

use rlevec_core_rs::RleError;

/// Largest possible entry: the tag byte plus an 8-byte payload.
pub const MAX_WIDTH: usize = 9;

/// Entry that encodes a count of one.
pub const ONE: u8 = 0xFF;

/// Largest count an entry can hold.
pub const MAX_COUNT: u64 = i64::MAX as u64;

/// `total + count`, failing with `OutOfRange` when the sum doesn't fit an entry.
#[inline]
pub fn checked_add(total: u64, count: u64) -> Result<u64> {
    match total.checked_add(count) {
        Some(sum) if sum <= MAX_COUNT => Ok(sum),
        _ => Err(RleError::OutOfRange {
            index: total.saturating_add(count),
            length: MAX_COUNT,
        }
        .into()),
    }
}

/// Total number of bytes occupied by the entry that starts with `tag`.
#[inline(always)]
pub fn width(tag: u8) -> usize {
    let tag = tag as i8;
    if tag < 0 {
        1
    } else {
        1 + tag as usize
    }
}

/// Number of bytes [`encode`] will emit for `count`.
#[inline]
pub fn encoded_width(count: u64) -> usize {
    if count < 128 {
        1
    } else if count <= i16::MAX as u64 {
        3
    } else if count <= i32::MAX as u64 {
        5
    } else {
        9
    }
}

/// Write the entry for `count` into the head of `entry`, returning the number of bytes used.
#[inline]
pub fn encode_into(count: u64, entry: &mut [u8; MAX_WIDTH]) -> usize {
    debug_assert!(count <= MAX_COUNT);
    let width = encoded_width(count);
    match width {
        1 => entry[0] = (-(count as i8)) as u8,
        3 => {
            entry[0] = 2;
            entry[1..3].copy_from_slice(&(count as i16).to_le_bytes());
        }
        5 => {
            entry[0] = 4;
            entry[1..5].copy_from_slice(&(count as i32).to_le_bytes());
        }
        _ => {
            entry[0] = 8;
            entry[1..9].copy_from_slice(&(count as i64).to_le_bytes());
        }
    }
    width
}

/// Append the entry for `count` to `out`.
#[inline]
pub fn encode(count: u64, out: &mut Vec<u8>) {
    let mut entry = [0u8; MAX_WIDTH];
    let width = encode_into(count, &mut entry);
    out.extend_from_slice(&entry[..width]);
}

/// Read a well-formed entry from the head of `bytes`, returning the count and the entry width.
///
/// Streams owned by an `RleVec` are always well-formed. Use [`decode`] for untrusted input.
#[inline]
pub(crate) fn read(bytes: &[u8]) -> (u64, usize) {
    let tag = bytes[0];
    match width(tag) {
        1 => ((-(tag as i8 as i64)) as u64, 1),
        3 => (i16::from_le_bytes([bytes[1], bytes[2]]) as u64, 3),
        5 => {
            let mut payload = [0u8; 4];
            payload.copy_from_slice(&bytes[1..5]);
            (i32::from_le_bytes(payload) as u64, 5)
        }
        width => {
            let mut payload = [0u8; 8];
            payload.copy_from_slice(&bytes[1..9]);
            (i64::from_le_bytes(payload) as u64, width)
        }
    }
}

/// Checked version of [`read`].
pub fn decode(bytes: &[u8]) -> Result<(u64, usize)> {
    let tag = *bytes
        .first()
        .ok_or_else(|| RleError::malformed("run length stream ended early"))?;
    let width = width(tag);
    if !matches!(width, 1 | 3 | 5 | 9) {
        return Err(RleError::malformed(format!("invalid run length tag {tag}")).into());
    }
    if bytes.len() < width {
        return Err(RleError::malformed(format!(
            "truncated run length entry: need {width} bytes, got {}",
            bytes.len()
        ))
        .into());
    }

    let (count, width) = read(bytes);
    if count > MAX_COUNT {
        return Err(RleError::malformed("negative run length").into());
    }
    Ok((count, width))
}
