use eyre::Result;

use rlevec_core_rs::{value_from_raw, Element, RleError, Value};

use crate::rle_vec::RleVec;
use crate::varint;

impl RleVec {
    fn out_of_range(&self, index: u64) -> eyre::Report {
        RleError::OutOfRange {
            index,
            length: self.logical_length,
        }
        .into()
    }

    /// Bytes of the element at the 1-based `index`.
    pub fn proj_bytes(&self, index: u64) -> Result<&[u8]> {
        if index == 0 || index > self.logical_length {
            return Err(self.out_of_range(index));
        }

        let mut total = 0;
        for (value, length) in self.raw_runs() {
            total += length;
            if total >= index {
                return Ok(value);
            }
        }
        Err(RleError::DecodeConsistency {
            decoded: total,
            expected: self.logical_length,
        }
        .into())
    }

    /// Element at the 1-based `index`.
    pub fn proj<T: Element>(&self, index: u64) -> Result<T> {
        self.dtype.ensure(T::TYPE)?;
        Ok(T::read_le(self.proj_bytes(index)?))
    }

    /// Float element at the 1-based `index`, `None` if it is missing.
    pub fn value_at(&self, index: u64) -> Result<Value> {
        Ok(value_from_raw(self.proj::<f64>(index)?))
    }

    /// Elements `start..=end` (1-based). `start > end` yields the reversed range.
    pub fn subarr(&self, start: u64, end: u64) -> Result<RleVec> {
        if start > end {
            return Ok(self.subarr(end, start)?.reverse());
        }
        for index in [start, end] {
            if index == 0 || index > self.logical_length {
                return Err(self.out_of_range(index));
            }
        }

        let mut builder = RleVec::builder(self.dtype);
        let mut covered = 0;
        for (value, length) in self.raw_runs() {
            let (run_start, run_end) = (covered + 1, covered + length);
            covered = run_end;
            if run_end < start {
                continue;
            }

            builder.push_raw(value, run_end.min(end) - run_start.max(start) + 1)?;
            if run_end >= end {
                break;
            }
        }
        Ok(builder.build())
    }

    /// Elements in reverse order. Runs keep their lengths.
    pub fn reverse(&self) -> RleVec {
        let width = self.dtype.width();
        let values = self.values.chunks_exact(width).rev().flatten().copied().collect();

        let runs = self.runs.as_ref().map(|_| {
            let lengths = self.run_lengths().collect::<Vec<_>>();
            let mut runs = Vec::with_capacity(self.runs.as_ref().map_or(0, |x| x.len()));
            for length in lengths.into_iter().rev() {
                varint::encode(length, &mut runs);
            }
            runs
        });

        RleVec {
            dtype: self.dtype,
            run_count: self.run_count,
            logical_length: self.logical_length,
            values,
            runs,
        }
    }

    /// Append `other` to `self`. Equal runs at the junction are kept separate.
    pub fn concat(&self, other: &RleVec) -> Result<RleVec> {
        other.dtype.ensure(self.dtype)?;

        let width = self.dtype.width();
        if self.run_count > 0 && other.run_count > 0 {
            let last = &self.values[self.values.len() - width..];
            let first = &other.values[..width];
            if last == first {
                log::trace!(
                    "Concatenation keeps equal boundary runs apart ({} + {} runs)",
                    self.run_count,
                    other.run_count
                );
            }
        }

        let mut values = Vec::with_capacity(self.values.len() + other.values.len());
        values.extend_from_slice(&self.values);
        values.extend_from_slice(&other.values);

        let logical_length = varint::checked_add(self.logical_length, other.logical_length)?;
        let runs = match (&self.runs, &other.runs) {
            (None, None) => None,
            _ => Some([self.materialized_runs(), other.materialized_runs()].concat()),
        };

        Ok(RleVec {
            dtype: self.dtype,
            run_count: self.run_count + other.run_count,
            logical_length,
            values,
            runs,
        })
    }

    /// The vector repeated `times` times.
    pub fn concat_replicate(&self, times: u64) -> Result<RleVec> {
        if times == 0 {
            return Err(RleError::OutOfRange {
                index: 0,
                length: self.logical_length,
            }
            .into());
        }

        let logical_length = self
            .logical_length
            .checked_mul(times)
            .filter(|x| *x <= varint::MAX_COUNT)
            .ok_or(RleError::OutOfRange {
                index: times,
                length: varint::MAX_COUNT / self.logical_length.max(1),
            })?;
        let copies = usize::try_from(times).map_err(|_| RleError::OutOfRange {
            index: times,
            length: usize::MAX as u64,
        })?;
        let run_count = self
            .run_count
            .checked_mul(copies)
            .ok_or(RleError::OutOfRange {
                index: times,
                length: (usize::MAX / self.run_count.max(1)) as u64,
            })?;

        let runs = match &self.runs {
            Some(runs) => Some(replicate(runs, copies)?),
            None => None,
        };
        Ok(RleVec {
            dtype: self.dtype,
            run_count,
            logical_length,
            values: replicate(&self.values, copies)?,
            runs,
        })
    }

    /// Copy of the vector with the elements starting at the 1-based `index` replaced by
    /// `replacement`.
    pub fn change(&self, index: u64, replacement: &RleVec) -> Result<RleVec> {
        replacement.dtype.ensure(self.dtype)?;
        if index == 0 || index > self.logical_length {
            return Err(self.out_of_range(index));
        }
        let last = index - 1 + replacement.logical_length;
        if last > self.logical_length {
            return Err(self.out_of_range(last));
        }

        let mut result = match index {
            1 => RleVec::new(self.dtype),
            _ => self.subarr(1, index - 1)?,
        };
        result = result.concat(replacement)?;
        if last < self.logical_length {
            result = result.concat(&self.subarr(last + 1, self.logical_length)?)?;
        }
        Ok(result)
    }

    /// 1-based positions of the elements that differ from `base`.
    pub fn nonbase_positions<T: Element>(&self, base: T) -> Result<Vec<u64>> {
        let mut positions = Vec::new();
        let mut covered = 0;
        for (value, length) in self.runs::<T>()? {
            if !value.bits_eq(&base) {
                positions.extend(covered + 1..=covered + length);
            }
            covered += length;
        }
        Ok(positions)
    }

    /// Elements that differ from `base`, in order.
    pub fn nonbase_values<T: Element>(&self, base: T) -> Result<Vec<T>> {
        let mut values = Vec::new();
        for (value, length) in self.runs::<T>()? {
            if !value.bits_eq(&base) {
                values.extend(std::iter::repeat_n(value, length as usize));
            }
        }
        Ok(values)
    }
}

/// `bytes` repeated `copies` times, failing instead of aborting when the result can't be allocated.
fn replicate(bytes: &[u8], copies: usize) -> Result<Vec<u8>> {
    if bytes.is_empty() {
        return Ok(Vec::new());
    }
    let requested = bytes.len().checked_mul(copies).ok_or(RleError::AllocationFailure {
        requested: usize::MAX,
    })?;
    let mut result = Vec::new();
    result
        .try_reserve_exact(requested)
        .map_err(|_| RleError::AllocationFailure { requested })?;
    for _ in 0..copies {
        result.extend_from_slice(bytes);
    }
    Ok(result)
}
