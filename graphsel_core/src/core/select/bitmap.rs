use crate::core::{
    cancel::CancellationToken,
    element::Element,
    error::Result,
    runner::TaskRunner,
};

use super::{partition::Task, predicate::EntryPredicate, source::check_cancelled};

/// Typed view of the bitmap being filtered.
///
/// `presence` is `None` for an in-place pass, where the flags are read from
/// the output slice itself before being overwritten.
#[derive(Clone, Copy)]
pub struct SlotSource<'a, T: Element> {
    pub ncols: usize,
    pub presence: Option<&'a [bool]>,
    pub values: &'a [T],
    pub iso: bool,
}

impl<'a, T: Element> SlotSource<'a, T> {
    #[inline(always)]
    fn value(&self, slot: usize) -> T {
        if self.iso { self.values[0] } else { self.values[slot] }
    }
}

/// Fused bitmap selection: evaluates and writes in a single pass.
///
/// Each task owns the slots `[start, end)` of `presence_out` (and of
/// `values_out` when present). Returns the number of survivors, summed from
/// the per-task counts after the join.
pub fn select_slots<T, P, R>(
    runner: &R,
    source: SlotSource<'_, T>,
    predicate: P,
    tasks: &[Task],
    presence_out: &mut [bool],
    values_out: Option<&mut [T]>,
    cancel: Option<&CancellationToken>,
) -> Result<usize>
where
    T: Element,
    P: EntryPredicate<T>,
    R: TaskRunner,
{
    let mut work = Vec::with_capacity(tasks.len());
    let mut presence_rest: &mut [bool] = presence_out;
    let mut values_rest = values_out;

    for task in tasks {
        let (presence, tail) = std::mem::take(&mut presence_rest).split_at_mut(task.len());
        presence_rest = tail;

        let values = match values_rest.take() {
            Some(rest) => {
                let (head, tail) = rest.split_at_mut(task.len());
                values_rest = Some(tail);
                Some(head)
            }
            None => None,
        };

        work.push((*task, presence, values));
    }

    let ncols = source.ncols;

    runner
        .map(work, |(task, presence, mut values)| {
            let mut kept = 0usize;

            for row in task.first_row..=task.last_row {
                check_cancelled(cancel)?;

                let row_start = row * ncols;
                let from = row_start.max(task.start);
                let to = (row_start + ncols).min(task.end);

                for slot in from..to {
                    let local = slot - task.start;
                    let present = match source.presence {
                        Some(input) => input[slot],
                        None => presence[local],
                    };

                    let keep = present && {
                        let value = if P::READS_VALUE { source.value(slot) } else { T::zero() };
                        predicate.keep(row, slot - row_start, value)
                    };

                    presence[local] = keep;
                    if keep {
                        kept += 1;
                        if let Some(values) = values.as_deref_mut() {
                            values[local] = source.value(slot);
                        }
                    }
                }
            }

            Ok(kept)
        })
        .into_iter()
        .sum()
}
