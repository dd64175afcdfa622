use smallvec::SmallVec;

use crate::configuration::Configuration;

/// A contiguous range of entries (compressed) or slots (bitmap) owned by one
/// worker. `first_row` and `last_row` are the rows holding the first and last
/// item of the range; both may be shared with the neighbouring tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Task {
    pub id: usize,
    pub start: usize,
    pub end: usize,
    pub first_row: usize,
    pub last_row: usize,
}

impl Task {
    #[inline]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }
}

pub type TaskList = SmallVec<[Task; 64]>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    pub nthreads: usize,
    pub tasks: TaskList,
}

impl Partition {
    pub fn empty() -> Self {
        Self {
            nthreads: 1,
            tasks: TaskList::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

/// Threads worth spending on `work` items: never more than the hint, never
/// more than one per `chunk` items, never zero.
pub fn plan_threads(work: usize, hint: usize, chunk: usize) -> usize {
    let useful = work.div_ceil(chunk.max(1)).max(1);
    hint.clamp(1, useful)
}

/// A single thread gets a single task; otherwise oversubscribe so that dense
/// stretches of the matrix do not pin one worker.
pub fn plan_tasks(work: usize, nthreads: usize, tasks_per_thread: usize) -> usize {
    if work == 0 {
        0
    } else if nthreads == 1 {
        1
    } else {
        nthreads.saturating_mul(tasks_per_thread.max(1)).min(work)
    }
}

#[inline]
fn split_point(task: usize, ntasks: usize, work: usize) -> usize {
    ((task as u128 * work as u128) / ntasks as u128) as usize
}

/// Row owning entry `p`: the last row whose offset is `<= p`.
#[inline]
pub fn row_of_entry(row_ptr: &[usize], p: usize) -> usize {
    row_ptr.partition_point(|offset| *offset <= p) - 1
}

/// Splits the entries of a compressed matrix into tasks holding equal entry
/// counts. Rows may be cut anywhere, including in the middle.
pub fn partition_entries(row_ptr: &[usize], thread_hint: usize, config: &Configuration) -> Partition {
    let nnz = row_ptr.last().copied().unwrap_or(0);
    if nnz == 0 {
        return Partition::empty();
    }

    let nthreads = plan_threads(nnz, thread_hint, config.chunk_size());
    let ntasks = plan_tasks(nnz, nthreads, config.tasks_per_thread());

    let tasks = (0..ntasks)
        .map(|id| {
            let start = split_point(id, ntasks, nnz);
            let end = split_point(id + 1, ntasks, nnz);
            Task {
                id,
                start,
                end,
                first_row: row_of_entry(row_ptr, start),
                last_row: row_of_entry(row_ptr, end - 1),
            }
        })
        .collect();

    Partition { nthreads, tasks }
}

/// Splits the `nrows * ncols` slots of a bitmap into equal flat ranges.
pub fn partition_slots(nrows: usize, ncols: usize, thread_hint: usize, config: &Configuration) -> Partition {
    let slots = nrows.saturating_mul(ncols);
    if slots == 0 {
        return Partition::empty();
    }

    let nthreads = plan_threads(slots, thread_hint, config.chunk_size());
    let ntasks = plan_tasks(slots, nthreads, config.tasks_per_thread());

    let tasks = (0..ntasks)
        .map(|id| {
            let start = split_point(id, ntasks, slots);
            let end = split_point(id + 1, ntasks, slots);
            Task {
                id,
                start,
                end,
                first_row: start / ncols,
                last_row: (end - 1) / ncols,
            }
        })
        .collect();

    Partition { nthreads, tasks }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(chunk: usize, per_thread: usize) -> Configuration {
        Configuration {
            chunk_size: Some(chunk),
            tasks_per_thread: Some(per_thread),
            ..Default::default()
        }
    }

    fn assert_covers(partition: &Partition, work: usize) {
        let mut expected_start = 0;
        for (index, task) in partition.tasks.iter().enumerate() {
            assert_eq!(task.id, index);
            assert_eq!(task.start, expected_start);
            assert!(!task.is_empty());
            assert!(task.first_row <= task.last_row);
            expected_start = task.end;
        }
        assert_eq!(expected_start, work);
    }

    #[test]
    fn test_empty_matrix_has_no_tasks() {
        let partition = partition_entries(&[0, 0, 0], 8, &Configuration::default());
        assert!(partition.is_empty());
        assert!(partition_slots(0, 10, 8, &Configuration::default()).is_empty());
    }

    #[test]
    fn test_single_thread_single_task() {
        let row_ptr = vec![0, 3, 3, 10];
        let partition = partition_entries(&row_ptr, 1, &config(1, 8));
        assert_eq!(partition.nthreads, 1);
        assert_eq!(partition.tasks.len(), 1);
        assert_eq!(partition.tasks[0].first_row, 0);
        assert_eq!(partition.tasks[0].last_row, 2);
        assert_covers(&partition, 10);
    }

    #[test]
    fn test_threads_clamped_to_chunks() {
        assert_eq!(plan_threads(100, 16, 64), 2);
        assert_eq!(plan_threads(100, 0, 64), 1);
        assert_eq!(plan_threads(1 << 20, 4, 64), 4);
        assert_eq!(plan_tasks(5, 4, 8), 5);
        assert_eq!(plan_tasks(0, 4, 8), 0);
    }

    #[test]
    fn test_entries_balanced_not_rows() {
        // One dense row followed by many single-entry rows.
        let mut row_ptr = vec![0, 90];
        for _ in 0..10 {
            let last = *row_ptr.last().unwrap();
            row_ptr.push(last + 1);
        }
        let partition = partition_entries(&row_ptr, 2, &config(1, 1));
        assert_eq!(partition.tasks.len(), 2);
        assert_eq!(partition.tasks[0].len(), 50);
        assert_eq!(partition.tasks[1].len(), 50);
        assert_eq!(partition.tasks[0].first_row, 0);
        assert_eq!(partition.tasks[0].last_row, 0);
        assert_eq!(partition.tasks[1].first_row, 0);
        assert_eq!(partition.tasks[1].last_row, 10);
        assert_covers(&partition, 100);
    }

    #[test]
    fn test_empty_rows_are_skipped_by_boundaries() {
        let row_ptr = vec![0, 2, 2, 2, 4];
        assert_eq!(row_of_entry(&row_ptr, 0), 0);
        assert_eq!(row_of_entry(&row_ptr, 1), 0);
        assert_eq!(row_of_entry(&row_ptr, 2), 3);
        assert_eq!(row_of_entry(&row_ptr, 3), 3);

        let partition = partition_entries(&row_ptr, 2, &config(1, 1));
        assert_eq!(partition.tasks[0].last_row, 0);
        assert_eq!(partition.tasks[1].first_row, 3);
    }

    #[test]
    fn test_slots_partition_rows() {
        let partition = partition_slots(4, 5, 3, &config(1, 1));
        assert_eq!(partition.tasks.len(), 3);
        assert_covers(&partition, 20);
        assert_eq!(partition.tasks[0].first_row, 0);
        assert_eq!(partition.tasks[2].last_row, 3);
    }
}
