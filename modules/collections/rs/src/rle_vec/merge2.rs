use std::marker::PhantomData;

use ::impl_tools::autoimpl;
use eyre::{eyre, Result};

use rlevec_core_rs::{Element, RleError};

use super::identical::Bitwise;
use super::overlap::overlaps;
use super::{Identical, RleVec};

/// Elementwise kernel of a two-way merge.
#[autoimpl(for <M: trait + ?Sized> &mut M, Box<M>)]
pub trait Merge2<T> {
    fn two(&mut self, first: &T, second: &T) -> T;
}

pub struct Merge2Fn<T, Two>
where
    Two: FnMut(&T, &T) -> T,
{
    two_fn: Two,
    _phantom: PhantomData<T>,
}

impl<T, Two> Merge2Fn<T, Two>
where
    Two: FnMut(&T, &T) -> T,
{
    pub fn new(two_fn: Two) -> Self {
        Self {
            two_fn,
            _phantom: Default::default(),
        }
    }
}

impl<T, Two> Merge2<T> for Merge2Fn<T, Two>
where
    Two: FnMut(&T, &T) -> T,
{
    #[inline(always)]
    fn two(&mut self, first: &T, second: &T) -> T {
        (self.two_fn)(first, second)
    }
}

/// Combine two vectors of equal dimension elementwise without decoding them.
///
/// ```ignore
/// let sum = merge2::<f64, _>(&first, &second)
///     .with_merge2(Merge2Fn::new(|a: &f64, b: &f64| a + b))
///     .run()?;
/// ```
pub fn merge2<'a, T, M>(first: &'a RleVec, second: &'a RleVec) -> Merge2Setup<'a, T, M, Bitwise>
where
    T: Element,
    M: Merge2<T>,
{
    Merge2Setup {
        first,
        second,
        write_to: None,
        identical: Bitwise,
        merge: None,
        _phantom: PhantomData,
    }
}

pub struct Merge2Setup<'a, T: Element, M: Merge2<T>, I: Identical<T>> {
    first: &'a RleVec,
    second: &'a RleVec,
    write_to: Option<(Vec<u8>, Vec<u8>)>,
    identical: I,
    merge: Option<M>,
    _phantom: PhantomData<T>,
}

impl<'a, T: Element, M: Merge2<T>, I: Identical<T>> Merge2Setup<'a, T, M, I> {
    /// Reuse `(values, runs)` buffers for the output.
    pub fn save_to(mut self, buffers: impl Into<(Vec<u8>, Vec<u8>)>) -> Self {
        self.write_to = Some(buffers.into());
        self
    }

    pub fn with_identical<NewI: Identical<T>>(self, identical: NewI) -> Merge2Setup<'a, T, M, NewI> {
        Merge2Setup {
            first: self.first,
            second: self.second,
            write_to: self.write_to,
            identical,
            merge: self.merge,
            _phantom: PhantomData,
        }
    }

    pub fn with_merge2(mut self, merge: M) -> Self {
        self.merge = Some(merge);
        self
    }

    pub fn run(mut self) -> Result<RleVec> {
        let merge_fn = self
            .merge
            .take()
            .ok_or_else(|| eyre!("Merge function is unspecified in rle_vec::merge2."))?;

        if self.first.dimension() != self.second.dimension() {
            return Err(RleError::DimensionMismatch {
                left: self.first.dimension(),
                right: self.second.dimension(),
            }
            .into());
        }

        let (values, runs) = self.write_to.take().unwrap_or_default();
        let capacity = self.first.run_count().max(self.second.run_count());
        let mut builder = RleVec::builder(T::TYPE)
            .with_buffers(values, runs)
            .with_capacity(capacity);

        let mut segments = overlaps(self.first.runs::<T>()?, self.second.runs::<T>()?);
        let (first, second, span) = match segments.next() {
            None => return Ok(builder.build()),
            Some(x) => x,
        };

        let mut merge = merge_fn;
        let mut current_value = merge.two(&first, &second);
        let mut current_length = span;

        for (first, second, span) in segments {
            let new_value = merge.two(&first, &second);

            // Save only if it differs from the current value
            if self.identical.identical(&current_value, &new_value) {
                current_length += span;
            } else {
                builder.push_run(current_value, current_length)?;

                current_value = new_value;
                current_length = span;
            }
        }
        builder.push_run(current_value, current_length)?;

        Ok(builder.build())
    }
}

impl From<RleVec> for (Vec<u8>, Vec<u8>) {
    fn from(value: RleVec) -> Self {
        (value.values, value.runs.unwrap_or_default())
    }
}
