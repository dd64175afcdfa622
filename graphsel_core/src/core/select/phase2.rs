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

/// Phase 2: writes each task's survivors into its own output region.
///
/// `task_offsets` comes from the offset reducer; task `t` owns
/// `[task_offsets[t], task_offsets[t + 1])` of `col_out` and `values_out`.
/// `values_out` is `None` when the result is iso and no values are stored.
pub fn compact<T, P, R>(
    runner: &R,
    source: EntrySource<'_, T>,
    predicate: P,
    tasks: &[Task],
    task_offsets: &[usize],
    col_out: &mut [usize],
    values_out: Option<&mut [T]>,
    cancel: Option<&CancellationToken>,
) -> Result<()>
where
    T: Element,
    P: EntryPredicate<T>,
    R: TaskRunner,
{
    debug_assert_eq!(task_offsets.len(), tasks.len() + 1);
    debug_assert_eq!(task_offsets.first().copied(), Some(0));

    let mut work = Vec::with_capacity(tasks.len());
    let mut cols_rest: &mut [usize] = col_out;
    let mut values_rest = values_out;

    for (index, task) in tasks.iter().enumerate() {
        let len = task_offsets[index + 1] - task_offsets[index];

        let (cols, tail) = std::mem::take(&mut cols_rest).split_at_mut(len);
        cols_rest = tail;

        let values = match values_rest.take() {
            Some(rest) => {
                let (head, tail) = rest.split_at_mut(len);
                values_rest = Some(tail);
                Some(head)
            }
            None => None,
        };

        work.push((*task, cols, values));
    }

    runner
        .map(work, |(task, cols, mut values)| {
            let mut cursor = 0;

            for row in task.first_row..=task.last_row {
                check_cancelled(cancel)?;

                for p in source.clipped_row(row, task.start, task.end) {
                    if !source.keeps(&predicate, row, p) {
                        continue;
                    }

                    cols[cursor] = source.col_index[p];
                    if let Some(values) = values.as_deref_mut() {
                        values[cursor] = source.value(p);
                    }
                    cursor += 1;
                }
            }

            debug_assert_eq!(cursor, cols.len(), "task {} wrote a different count than it counted", task.id);
            Ok(())
        })
        .into_iter()
        .collect()
}
