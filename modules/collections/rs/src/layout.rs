//! Persisted byte layout of an RLE vector.
//!
//! All integers are little-endian:
//!
//! | field            | size                |
//! |------------------|---------------------|
//! | element type tag | u8                  |
//! | run count        | u32                 |
//! | logical length   | u32                 |
//! | values length    | u32                 |
//! | runs length      | u32                 |
//! | values           | values length bytes |
//! | runs             | runs length bytes   |
//!
//! An empty runs region with a non-zero run count stands for runs of length one.
//!
//! With the `bitcode` feature vectors also travel as a bitcode [`Record`]. Both forms are
//! validated on the way in.

#[cfg(feature = "bitcode")]
use bitcode::{Decode, Encode};
use eyre::Result;

use rlevec_core_rs::{ElementType, RleError};

use crate::rle_vec::RleVec;
use crate::varint;

pub const HEADER_SIZE: usize = 1 + 4 * 4;

fn to_u32(value: u64, field: &str) -> Result<u32> {
    u32::try_from(value).map_err(|_| {
        eyre::Report::from(RleError::OutOfRange {
            index: value,
            length: u32::MAX as u64,
        })
        .wrap_err(format!("{field} doesn't fit the persisted layout"))
    })
}

pub fn to_bytes(rle: &RleVec) -> Result<Vec<u8>> {
    let runs = rle.runs_bytes().unwrap_or_default();

    let mut bytes = Vec::with_capacity(HEADER_SIZE + rle.values_bytes().len() + runs.len());
    bytes.push(rle.dtype().tag());
    for (value, field) in [
        (rle.run_count() as u64, "run count"),
        (rle.dimension(), "logical length"),
        (rle.values_bytes().len() as u64, "values length"),
        (runs.len() as u64, "runs length"),
    ] {
        bytes.extend_from_slice(&to_u32(value, field)?.to_le_bytes());
    }
    bytes.extend_from_slice(rle.values_bytes());
    bytes.extend_from_slice(runs);
    Ok(bytes)
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    let mut buffer = [0u8; 4];
    buffer.copy_from_slice(&bytes[offset..offset + 4]);
    u32::from_le_bytes(buffer)
}

pub fn from_bytes(bytes: &[u8]) -> Result<RleVec> {
    if bytes.len() < HEADER_SIZE {
        return Err(RleError::malformed(format!(
            "expected at least {HEADER_SIZE} header bytes, got {}",
            bytes.len()
        ))
        .into());
    }

    let dtype = ElementType::try_from(bytes[0])?;
    let run_count = read_u32(bytes, 1) as usize;
    let logical_length = read_u32(bytes, 5) as u64;
    let values_len = read_u32(bytes, 9) as usize;
    let runs_len = read_u32(bytes, 13) as usize;

    if HEADER_SIZE + values_len + runs_len != bytes.len() {
        return Err(RleError::malformed(format!(
            "regions of {values_len} and {runs_len} bytes don't match a body of {} bytes",
            bytes.len() - HEADER_SIZE
        ))
        .into());
    }
    let values = bytes[HEADER_SIZE..HEADER_SIZE + values_len].to_vec();
    let runs = &bytes[HEADER_SIZE + values_len..];
    let runs = if runs.is_empty() && run_count > 0 {
        None
    } else {
        Some(runs.to_vec())
    };
    validate(dtype, run_count, logical_length, values, runs)
}

/// Assemble a vector from untrusted fields. `None` runs stand for runs of length one.
fn validate(
    dtype: ElementType,
    run_count: usize,
    logical_length: u64,
    values: Vec<u8>,
    runs: Option<Vec<u8>>,
) -> Result<RleVec> {
    if logical_length > varint::MAX_COUNT {
        return Err(RleError::malformed(format!(
            "logical length {logical_length} exceeds {}",
            varint::MAX_COUNT
        ))
        .into());
    }
    if run_count.checked_mul(dtype.width()) != Some(values.len()) {
        return Err(RleError::malformed(format!(
            "{run_count} runs of {dtype} don't match {} value bytes",
            values.len()
        ))
        .into());
    }

    match &runs {
        None => check_total(run_count as u64, logical_length)?,
        Some(runs) => {
            let mut total: u64 = 0;
            let mut offset = 0;
            for _ in 0..run_count {
                let (length, width) = varint::decode(&runs[offset..])?;
                if length == 0 {
                    return Err(RleError::malformed("zero run length").into());
                }
                total = total.saturating_add(length);
                offset += width;
            }
            if offset != runs.len() {
                return Err(RleError::malformed(format!(
                    "{} trailing bytes after {run_count} run lengths",
                    runs.len() - offset
                ))
                .into());
            }
            check_total(total, logical_length)?;
        }
    }

    Ok(RleVec {
        dtype,
        run_count,
        logical_length,
        values,
        runs,
    })
}

fn check_total(decoded: u64, expected: u64) -> Result<()> {
    if decoded != expected {
        log::error!(
            "Run lengths sum up to {} while the header declares {}",
            decoded,
            expected
        );
        return Err(RleError::DecodeConsistency { decoded, expected }.into());
    }
    Ok(())
}

/// Fields of a vector as exchanged through bitcode.
#[cfg(feature = "bitcode")]
#[derive(Clone, PartialEq, Eq, Debug, Encode, Decode)]
pub struct Record {
    pub dtype: ElementType,
    pub run_count: u64,
    pub logical_length: u64,
    pub values: Vec<u8>,
    pub runs: Option<Vec<u8>>,
}

#[cfg(feature = "bitcode")]
impl From<&RleVec> for Record {
    fn from(rle: &RleVec) -> Self {
        Self {
            dtype: rle.dtype,
            run_count: rle.run_count as u64,
            logical_length: rle.logical_length,
            values: rle.values.clone(),
            runs: rle.runs.clone(),
        }
    }
}

#[cfg(feature = "bitcode")]
impl TryFrom<Record> for RleVec {
    type Error = eyre::Report;

    fn try_from(record: Record) -> Result<Self> {
        let run_count = usize::try_from(record.run_count)
            .map_err(|_| RleError::malformed(format!("run count {} is too large", record.run_count)))?;
        validate(
            record.dtype,
            run_count,
            record.logical_length,
            record.values,
            record.runs,
        )
    }
}

#[cfg(feature = "bitcode")]
pub fn to_bitcode(rle: &RleVec) -> Vec<u8> {
    bitcode::encode(&Record::from(rle))
}

#[cfg(feature = "bitcode")]
pub fn from_bitcode(bytes: &[u8]) -> Result<RleVec> {
    let record = bitcode::decode::<Record>(bytes)
        .map_err(|err| RleError::malformed(format!("invalid bitcode record: {err}")))?;
    RleVec::try_from(record)
}
