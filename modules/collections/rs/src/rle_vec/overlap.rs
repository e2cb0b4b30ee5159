/// Walks two run streams in lock-step and yields `(left, right, span)` for every maximal segment
/// where both sides are constant.
///
/// Run boundaries of the two sides don't need to agree. Iteration stops as soon as either side
/// is exhausted, callers check that both cover the same number of elements.
pub struct Overlaps<L, R, A, B>
where
    A: Iterator<Item = (L, u64)>,
    B: Iterator<Item = (R, u64)>,
{
    left: A,
    right: B,
    left_run: Option<(L, u64)>,
    right_run: Option<(R, u64)>,
    position: u64,
}

impl<L, R, A, B> Overlaps<L, R, A, B>
where
    A: Iterator<Item = (L, u64)>,
    B: Iterator<Item = (R, u64)>,
{
    pub fn new(mut left: A, mut right: B) -> Self {
        let left_run = left.next();
        let right_run = right.next();
        Self {
            left,
            right,
            left_run,
            right_run,
            position: 0,
        }
    }
}

impl<L, R, A, B> Iterator for Overlaps<L, R, A, B>
where
    L: Clone,
    R: Clone,
    A: Iterator<Item = (L, u64)>,
    B: Iterator<Item = (R, u64)>,
{
    type Item = (L, R, u64);

    fn next(&mut self) -> Option<Self::Item> {
        // Run ends are stored as absolute positions
        let (left_value, left_end) = self.left_run.as_ref()?;
        let (right_value, right_end) = self.right_run.as_ref()?;
        let (left_end, right_end) = (*left_end, *right_end);

        let boundary = left_end.min(right_end);
        let item = (left_value.clone(), right_value.clone(), boundary - self.position);
        self.position = boundary;

        if left_end == boundary {
            self.left_run = self.left.next().map(|(v, l)| (v, boundary + l));
        }
        if right_end == boundary {
            self.right_run = self.right.next().map(|(v, l)| (v, boundary + l));
        }
        Some(item)
    }
}

/// See [`Overlaps`].
pub fn overlaps<L, R, A, B>(left: A, right: B) -> Overlaps<L, R, A::IntoIter, B::IntoIter>
where
    A: IntoIterator<Item = (L, u64)>,
    B: IntoIterator<Item = (R, u64)>,
{
    Overlaps::new(left.into_iter(), right.into_iter())
}
