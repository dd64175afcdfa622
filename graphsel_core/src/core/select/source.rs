use crate::core::{cancel::CancellationToken, element::Element, error::{Result, SelectError}};

use super::predicate::EntryPredicate;

/// Typed, read-only view of a compressed input matrix.
#[derive(Clone, Copy)]
pub struct EntrySource<'a, T: Element> {
    pub row_ptr: &'a [usize],
    pub col_index: &'a [usize],
    pub values: &'a [T],
    pub iso: bool,
}

impl<'a, T: Element> EntrySource<'a, T> {
    #[inline(always)]
    pub fn value(&self, p: usize) -> T {
        if self.iso { self.values[0] } else { self.values[p] }
    }

    /// Entries of `row` that fall inside the task range `[start, end)`.
    #[inline(always)]
    pub fn clipped_row(&self, row: usize, start: usize, end: usize) -> std::ops::Range<usize> {
        self.row_ptr[row].max(start)..self.row_ptr[row + 1].min(end)
    }

    #[inline(always)]
    pub fn keeps<P: EntryPredicate<T>>(&self, predicate: &P, row: usize, p: usize) -> bool {
        let value = if P::READS_VALUE { self.value(p) } else { T::zero() };
        predicate.keep(row, self.col_index[p], value)
    }
}

#[inline(always)]
pub(crate) fn check_cancelled(cancel: Option<&CancellationToken>) -> Result<()> {
    match cancel {
        Some(token) if token.is_cancelled() => Err(SelectError::Cancelled),
        _ => Ok(()),
    }
}
