use crate::core::{
    cancel::CancellationToken,
    element::Element,
    error::Result,
    runner::TaskRunner,
};

use super::{
    partition::Task,
    predicate::EntryPredicate,
    source::{EntrySource, check_cancelled},
};

/// Survivors a task found in its first and last row. Those rows may be shared
/// with a neighbouring task, so they are staged here instead of in `Zp`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BoundaryCounts {
    pub first_count: usize,
    pub last_count: usize,
}

/// Phase 1: counts survivors per row.
///
/// `zp` must be zeroed and hold at least `nrows` slots. Each task writes the
/// counts of its interior rows straight into its own sub-slice of `zp`; rows
/// no task touches stay zero.
pub fn count_survivors<T, P, R>(
    runner: &R,
    source: EntrySource<'_, T>,
    predicate: P,
    tasks: &[Task],
    zp: &mut [usize],
    cancel: Option<&CancellationToken>,
) -> Result<Vec<BoundaryCounts>>
where
    T: Element,
    P: EntryPredicate<T>,
    R: TaskRunner,
{
    let mut work = Vec::with_capacity(tasks.len());
    let mut rest: &mut [usize] = zp;
    let mut consumed = 0;

    for task in tasks {
        let interior_start = task.first_row + 1;
        let interior_end = task.last_row.max(interior_start);

        let (_, tail) = std::mem::take(&mut rest).split_at_mut(interior_start - consumed);
        let (interior, tail) = tail.split_at_mut(interior_end - interior_start);
        rest = tail;
        consumed = interior_end;

        work.push((*task, interior));
    }

    runner
        .map(work, |(task, interior)| {
            let mut counts = BoundaryCounts::default();

            for row in task.first_row..=task.last_row {
                check_cancelled(cancel)?;

                let survivors = source
                    .clipped_row(row, task.start, task.end)
                    .filter(|p| source.keeps(&predicate, row, *p))
                    .count();

                if row == task.first_row {
                    counts.first_count = survivors;
                } else if row == task.last_row {
                    counts.last_count = survivors;
                } else {
                    interior[row - task.first_row - 1] = survivors;
                }
            }

            Ok(counts)
        })
        .into_iter()
        .collect()
}
