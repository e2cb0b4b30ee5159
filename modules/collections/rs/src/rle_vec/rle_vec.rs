use std::borrow::Cow;

use derive_getters::Dissolve;
use eyre::Result;
use itertools::Itertools;

use rlevec_core_rs::{value_from_raw, value_to_raw, Element, ElementType, RleError, Value};

use crate::appender::{Appender, Config as AppenderConfig};
use crate::varint;

pub struct RleVecBuilder {
    dtype: ElementType,
    run_count: usize,
    logical_length: u64,
    values: Vec<u8>,
    runs: Vec<u8>,
}

impl RleVecBuilder {
    pub fn new(dtype: ElementType) -> Self {
        Self {
            dtype,
            run_count: 0,
            logical_length: 0,
            values: Vec::new(),
            runs: Vec::new(),
        }
    }

    pub fn with_capacity(mut self, runs: usize) -> Self {
        self.values.reserve(runs * self.dtype.width());
        self.runs.reserve(runs);
        self
    }

    pub fn with_buffers(mut self, mut values: Vec<u8>, mut runs: Vec<u8>) -> Self {
        values.clear();
        runs.clear();

        self.values = values;
        self.runs = runs;
        self
    }

    /// Encode a dense array. Neighbours are compared byte-for-byte, so NaN payloads (and the
    /// no-value sentinel) form runs with themselves.
    pub fn with_dense_values<T: Element>(mut self, dense: &[T]) -> Result<Self> {
        self.dtype.ensure(T::TYPE)?;
        self.extend_dense(dense);
        Ok(self)
    }

    fn extend_dense<T: Element>(&mut self, dense: &[T]) {
        let mut iter = dense.iter();
        let mut current_value = match iter.next() {
            None => return,
            Some(x) => *x,
        };
        let mut current_length = 1;

        for value in iter {
            if current_value.bits_eq(value) {
                current_length += 1;
            } else {
                self.push_bounded(current_value, current_length);
                current_value = *value;
                current_length = 1;
            }
        }
        self.push_bounded(current_value, current_length);
    }

    /// Append a run without merging it into the previous one. Empty runs are dropped.
    pub fn push_run<T: Element>(&mut self, value: T, length: u64) -> Result<()> {
        T::TYPE.ensure(self.dtype)?;
        if length == 0 {
            return Ok(());
        }
        self.logical_length = varint::checked_add(self.logical_length, length)?;
        value.write_le(&mut self.values);
        self.push_length(length);
        Ok(())
    }

    pub(crate) fn push_raw(&mut self, value: &[u8], length: u64) -> Result<()> {
        debug_assert_eq!(value.len(), self.dtype.width());
        if length == 0 {
            return Ok(());
        }
        self.logical_length = varint::checked_add(self.logical_length, length)?;
        self.values.extend_from_slice(value);
        self.push_length(length);
        Ok(())
    }

    // Run of a dense slice, its length always fits an entry
    fn push_bounded<T: Element>(&mut self, value: T, length: u64) {
        value.write_le(&mut self.values);
        self.push_length(length);
        self.logical_length += length;
    }

    fn push_length(&mut self, length: u64) {
        varint::encode(length, &mut self.runs);
        self.run_count += 1;
    }

    pub fn build(self) -> RleVec {
        RleVec {
            dtype: self.dtype,
            run_count: self.run_count,
            logical_length: self.logical_length,
            values: self.values,
            runs: Some(self.runs),
        }
    }
}

/// Run-length encoded vector of fixed-width scalars.
///
/// Values are a flat little-endian byte stream with one element per run, run lengths are a stream
/// of varint entries. A missing runs stream means every run has length one.
///
/// Fields are only ever set through validated paths, see `layout` for the byte exchange forms.
#[derive(Debug, Clone, Dissolve)]
pub struct RleVec {
    pub(crate) dtype: ElementType,
    pub(crate) run_count: usize,
    pub(crate) logical_length: u64,
    pub(crate) values: Vec<u8>,
    pub(crate) runs: Option<Vec<u8>>,
}

impl Default for RleVec {
    fn default() -> Self {
        RleVec::new(ElementType::Float8)
    }
}

impl RleVec {
    pub fn builder(dtype: ElementType) -> RleVecBuilder {
        RleVecBuilder::new(dtype)
    }

    /// Reuse the buffers of this vector for a new one.
    pub fn rebuild(self) -> RleVecBuilder {
        RleVecBuilder::new(self.dtype).with_buffers(self.values, self.runs.unwrap_or_default())
    }

    pub fn new(dtype: ElementType) -> Self {
        RleVecBuilder::new(dtype).build()
    }

    pub fn from_dense<T: Element>(dense: &[T]) -> Self {
        let mut builder = RleVec::builder(T::TYPE);
        builder.extend_dense(dense);
        builder.build()
    }

    /// Encode float values, storing `None` as the no-value sentinel.
    pub fn from_values(values: &[Value]) -> Self {
        let raw = values.iter().map(|x| value_to_raw(*x)).collect::<Vec<_>>();
        RleVec::from_dense(&raw)
    }

    /// Wrap a dense array without compressing it: one run per element and no runs stream.
    pub fn uncompressed<T: Element>(dense: &[T]) -> Self {
        let mut values = Vec::with_capacity(dense.len() * T::TYPE.width());
        for x in dense {
            x.write_le(&mut values);
        }
        RleVec {
            dtype: T::TYPE,
            run_count: dense.len(),
            logical_length: dense.len() as u64,
            values,
            runs: None,
        }
    }

    /// A single run of `value` repeated `dimension` times.
    pub fn filled<T: Element>(value: T, dimension: u64) -> Result<Self> {
        if dimension == 0 {
            return Err(RleError::OutOfRange {
                index: 0,
                length: 0,
            }
            .into());
        }
        let mut builder = RleVec::builder(T::TYPE).with_capacity(1);
        builder.push_run(value, dimension)?;
        Ok(builder.build())
    }

    pub fn from_runs<T: Element>(values: &[T], lengths: &[u64]) -> Result<Self> {
        if values.len() != lengths.len() {
            return Err(RleError::malformed(format!(
                "Values and lengths must have the same length, got {} and {}",
                values.len(),
                lengths.len()
            ))
            .into());
        }

        let mut builder = RleVec::builder(T::TYPE).with_capacity(values.len());
        for (value, length) in values.iter().zip(lengths) {
            if *length == 0 || *length > varint::MAX_COUNT {
                return Err(RleError::malformed(format!("invalid run length {length}")).into());
            }
            builder.push_run(*value, *length)?;
        }
        Ok(builder.build())
    }

    /// A vector of length `end` holding `base` everywhere except at the given 1-based `positions`.
    /// Positions must be strictly increasing.
    pub fn from_positions<T: Element>(
        values: &[T],
        positions: &[u64],
        end: u64,
        base: T,
    ) -> Result<Self> {
        if values.len() != positions.len() {
            return Err(RleError::malformed(format!(
                "Values and positions must have the same length, got {} and {}",
                values.len(),
                positions.len()
            ))
            .into());
        }

        let mut builder = RleVec::builder(T::TYPE).with_capacity(2 * values.len() + 1);
        let mut covered = 0;
        for (value, position) in values.iter().zip(positions) {
            if *position == 0 || *position > end {
                return Err(RleError::OutOfRange {
                    index: *position,
                    length: end,
                }
                .into());
            }
            if *position <= covered {
                return Err(RleError::malformed(format!(
                    "positions must be strictly increasing, got {position} after {covered}"
                ))
                .into());
            }
            builder.push_run(base, *position - covered - 1)?;
            builder.push_run(*value, 1)?;
            covered = *position;
        }
        builder.push_run(base, end - covered)?;
        Ok(builder.build())
    }

    /// Float vector of length `dimension` holding the sum of `counts` at each 0-based term index.
    /// Indices may come in any order and repeat, terms without counts are zero.
    pub fn from_histogram(indices: &[u64], counts: &[f64], dimension: u64) -> Result<Self> {
        if indices.len() != counts.len() {
            return Err(RleError::malformed(format!(
                "Indices and counts must have the same length, got {} and {}",
                indices.len(),
                counts.len()
            ))
            .into());
        }
        if indices.is_empty() || dimension == 0 {
            return Err(RleError::malformed(format!(
                "histogram needs terms and a positive dimension, got {} terms and dimension {dimension}",
                indices.len()
            ))
            .into());
        }
        if let Some(index) = indices.iter().find(|x| **x >= dimension) {
            return Err(RleError::OutOfRange {
                index: *index,
                length: dimension,
            }
            .into());
        }

        // Stable, so duplicates are summed in their input order
        let mut terms = indices.iter().copied().zip(counts.iter().copied()).collect::<Vec<_>>();
        terms.sort_by_key(|(index, _)| *index);

        let config = AppenderConfig::new(2 * terms.len() + 1, 2 * terms.len() + 1);
        let mut appender = Appender::with_config(ElementType::Float8, config);
        let mut covered = 0;
        for (index, group) in &terms.into_iter().chunk_by(|(index, _)| *index) {
            let total = group.fold(0.0, |total, (_, count)| total + count);
            appender.push_run(0.0, index - covered)?;
            appender.push_run(total, 1)?;
            covered = index + 1;
        }
        appender.push_run(0.0, dimension - covered)?;
        Ok(appender.finish())
    }

    pub fn dtype(&self) -> ElementType {
        self.dtype
    }

    /// Logical number of elements.
    pub fn dimension(&self) -> u64 {
        self.logical_length
    }

    pub fn run_count(&self) -> usize {
        self.run_count
    }

    pub fn is_empty(&self) -> bool {
        self.logical_length == 0
    }

    /// True when the runs stream is absent and every run has length one.
    pub fn is_uncompressed(&self) -> bool {
        self.runs.is_none()
    }

    pub fn values_bytes(&self) -> &[u8] {
        &self.values
    }

    pub fn runs_bytes(&self) -> Option<&[u8]> {
        self.runs.as_deref()
    }

    /// The runs stream with the all-ones sentinel expanded into explicit entries.
    pub fn materialized_runs(&self) -> Cow<'_, [u8]> {
        match &self.runs {
            Some(runs) => Cow::Borrowed(runs),
            None => Cow::Owned(vec![varint::ONE; self.run_count]),
        }
    }

    pub fn run_lengths(&self) -> RunLengths<'_> {
        RunLengths {
            runs: self.runs.as_deref(),
            remaining: self.run_count,
        }
    }

    /// Raw `(value bytes, length)` pairs.
    pub fn raw_runs(&self) -> impl Iterator<Item = (&[u8], u64)> {
        self.values
            .chunks_exact(self.dtype.width())
            .zip(self.run_lengths())
    }

    pub fn runs<T: Element>(&self) -> Result<impl Iterator<Item = (T, u64)> + '_> {
        self.dtype.ensure(T::TYPE)?;
        Ok(self.raw_runs().map(|(value, length)| (T::read_le(value), length)))
    }

    /// Float runs with the no-value sentinel translated to `None`.
    pub fn value_runs(&self) -> Result<impl Iterator<Item = (Value, u64)> + '_> {
        Ok(self
            .runs::<f64>()?
            .map(|(value, length)| (value_from_raw(value), length)))
    }

    fn dense_buffer<T>(&self) -> Result<Vec<T>> {
        let length = usize::try_from(self.logical_length).unwrap_or(usize::MAX);
        let mut dense = Vec::new();
        dense.try_reserve_exact(length).map_err(|_| RleError::AllocationFailure {
            requested: length.saturating_mul(std::mem::size_of::<T>()),
        })?;
        Ok(dense)
    }

    pub fn to_dense<T: Element>(&self) -> Result<Vec<T>> {
        self.dtype.ensure(T::TYPE)?;
        let mut dense = self.dense_buffer()?;
        for (value, length) in self.runs::<T>()? {
            dense.extend(std::iter::repeat_n(value, length as usize));
        }
        self.ensure_decoded(dense.len() as u64)?;
        Ok(dense)
    }

    pub fn to_values(&self) -> Result<Vec<Value>> {
        self.dtype.ensure(ElementType::Float8)?;
        let mut dense = self.dense_buffer()?;
        for (value, length) in self.value_runs()? {
            dense.extend(std::iter::repeat_n(value, length as usize));
        }
        self.ensure_decoded(dense.len() as u64)?;
        Ok(dense)
    }

    fn ensure_decoded(&self, decoded: u64) -> Result<()> {
        if decoded != self.logical_length {
            log::error!(
                "Decoded {} elements from a vector declaring {} ({} runs)",
                decoded,
                self.logical_length,
                self.run_count
            );
            return Err(RleError::DecodeConsistency {
                decoded,
                expected: self.logical_length,
            }
            .into());
        }
        Ok(())
    }
}

/// Iterator over the run lengths of a vector.
#[derive(Clone, Debug)]
pub struct RunLengths<'a> {
    runs: Option<&'a [u8]>,
    remaining: usize,
}

impl Iterator for RunLengths<'_> {
    type Item = u64;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        match self.runs {
            None => Some(1),
            Some(bytes) => {
                let (length, width) = varint::read(bytes);
                self.runs = Some(&bytes[width..]);
                Some(length)
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for RunLengths<'_> {}
