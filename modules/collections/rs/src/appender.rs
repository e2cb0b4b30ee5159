use derive_getters::{Dissolve, Getters};
use derive_more::Constructor;
use eyre::Result;

use rlevec_core_rs::{value_to_raw, Element, ElementType, RleError, Value};

use crate::rle_vec::RleVec;
use crate::varint;

/// Initial buffer sizes of an [`Appender`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Constructor, Dissolve, Getters)]
pub struct Config {
    /// In elements.
    values_capacity: usize,
    /// In bytes.
    runs_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            values_capacity: 16,
            runs_capacity: 16,
        }
    }
}

/// Builds an RLE vector one element at a time.
///
/// Appending a value equal to the last run extends that run in place, so the cost per element is
/// amortized O(1) regardless of the varint width of the run length.
#[derive(Debug, Clone)]
pub struct Appender {
    dtype: ElementType,
    run_count: usize,
    logical_length: u64,
    values: Vec<u8>,
    runs: Vec<u8>,
    // Byte offset of the last run's entry in `runs`
    last_run: Option<usize>,
}

impl Appender {
    pub fn new(dtype: ElementType) -> Self {
        Self::with_config(dtype, Config::default())
    }

    pub fn with_config(dtype: ElementType, config: Config) -> Self {
        Self {
            dtype,
            run_count: 0,
            logical_length: 0,
            values: Vec::with_capacity(config.values_capacity * dtype.width()),
            runs: Vec::with_capacity(config.runs_capacity),
            last_run: None,
        }
    }

    /// Continue appending to an existing vector.
    pub fn resume(rle: RleVec) -> Self {
        let runs = match rle.runs_bytes() {
            Some(_) => None,
            None => Some(rle.materialized_runs().into_owned()),
        };
        let (dtype, run_count, logical_length, values, explicit) = rle.dissolve();
        let runs = runs.or(explicit).unwrap_or_default();

        let mut last_run = None;
        let mut offset = 0;
        for _ in 0..run_count {
            last_run = Some(offset);
            offset += varint::width(runs[offset]);
        }

        Self {
            dtype,
            run_count,
            logical_length,
            values,
            runs,
            last_run,
        }
    }

    pub fn dimension(&self) -> u64 {
        self.logical_length
    }

    pub fn run_count(&self) -> usize {
        self.run_count
    }

    pub fn push<T: Element>(&mut self, value: T) -> Result<()> {
        self.push_run(value, 1)
    }

    /// Append a float, storing `None` as the no-value sentinel.
    pub fn push_value(&mut self, value: Value) -> Result<()> {
        self.push(value_to_raw(value))
    }

    /// Append `count` copies of `value`.
    pub fn push_run<T: Element>(&mut self, value: T, count: u64) -> Result<()> {
        T::TYPE.ensure(self.dtype)?;
        if count == 0 {
            return Ok(());
        }
        // Bounds the extended run as well, no run is longer than the vector
        let logical_length = varint::checked_add(self.logical_length, count)?;

        let width = self.dtype.width();
        match self.last_run {
            Some(offset) if T::read_le(&self.values[self.values.len() - width..]).bits_eq(&value) => {
                let (current, _) = varint::read(&self.runs[offset..]);

                let mut entry = [0u8; varint::MAX_WIDTH];
                let entry_width = varint::encode_into(current + count, &mut entry);
                let required = (offset + entry_width).saturating_sub(self.runs.len());
                reserve(&mut self.runs, required)?;

                self.runs.truncate(offset);
                self.runs.extend_from_slice(&entry[..entry_width]);
            }
            _ => {
                reserve(&mut self.values, width)?;
                reserve(&mut self.runs, varint::encoded_width(count))?;

                self.last_run = Some(self.runs.len());
                value.write_le(&mut self.values);
                varint::encode(count, &mut self.runs);
                self.run_count += 1;
            }
        }
        self.logical_length = logical_length;
        Ok(())
    }

    pub fn finish(self) -> RleVec {
        RleVec {
            dtype: self.dtype,
            run_count: self.run_count,
            logical_length: self.logical_length,
            values: self.values,
            runs: Some(self.runs),
        }
    }
}

/// Make room for `additional` bytes, at least doubling the capacity when the buffer is full.
fn reserve(buffer: &mut Vec<u8>, additional: usize) -> Result<()> {
    if buffer.capacity() - buffer.len() >= additional {
        return Ok(());
    }

    let requested = buffer.capacity().max(additional);
    buffer
        .try_reserve_exact(requested)
        .map_err(|_| RleError::AllocationFailure { requested })?;
    log::trace!("Appender buffer grew to {} bytes", buffer.capacity());
    Ok(())
}
