use super::{partition::Task, phase1::BoundaryCounts};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Offsets {
    /// Row pointers of the output matrix, `nrows + 1` long.
    pub row_ptr: Vec<usize>,
    /// Output position of each task's first survivor, plus the total at the end.
    pub task_offsets: Vec<usize>,
    pub nnz: usize,
}

/// Folds the staged boundary counts into `zp` and turns it into row pointers.
///
/// `zp` must be `nrows + 1` long with the last slot zero; the exclusive
/// prefix sum is done in place so the total lands in that last slot. This is
/// the only synchronization point between phase 1 and phase 2.
pub fn reduce_offsets(mut zp: Vec<usize>, tasks: &[Task], boundaries: &[BoundaryCounts]) -> Offsets {
    debug_assert_eq!(tasks.len(), boundaries.len());

    for (task, counts) in tasks.iter().zip(boundaries) {
        zp[task.first_row] += counts.first_count;
        if task.last_row > task.first_row {
            zp[task.last_row] += counts.last_count;
        }
    }

    let mut running = 0;
    for slot in zp.iter_mut() {
        let count = *slot;
        *slot = running;
        running += count;
    }
    let row_ptr = zp;
    let nnz = running;

    // A task's output begins where its first row begins, pushed forward by
    // whatever earlier tasks already placed in that row.
    let mut task_offsets = Vec::with_capacity(tasks.len() + 1);
    let mut open_row: Option<usize> = None;
    let mut open_fill = 0;

    for (task, counts) in tasks.iter().zip(boundaries) {
        let already = if open_row == Some(task.first_row) { open_fill } else { 0 };
        task_offsets.push(row_ptr[task.first_row] + already);

        open_fill = if task.last_row == task.first_row {
            already + counts.first_count
        } else {
            counts.last_count
        };
        open_row = Some(task.last_row);
    }
    task_offsets.push(nnz);

    debug_assert!(task_offsets.windows(2).all(|pair| pair[0] <= pair[1]));

    Offsets { row_ptr, task_offsets, nnz }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: usize, start: usize, end: usize, first_row: usize, last_row: usize) -> Task {
        Task { id, start, end, first_row, last_row }
    }

    #[test]
    fn test_prefix_sum_without_shared_rows() {
        let tasks = [task(0, 0, 6, 0, 2)];
        let boundaries = [BoundaryCounts { first_count: 1, last_count: 3 }];
        let offsets = reduce_offsets(vec![0, 2, 0, 0], &tasks, &boundaries);
        assert_eq!(offsets.row_ptr, vec![0, 1, 3, 6]);
        assert_eq!(offsets.task_offsets, vec![0, 6]);
        assert_eq!(offsets.nnz, 6);
    }

    #[test]
    fn test_shared_row_counted_once_per_task() {
        // Row 0 is split between tasks 0 and 1; row 1 between tasks 1 and 2.
        let tasks = [task(0, 0, 3, 0, 0), task(1, 3, 7, 0, 1), task(2, 7, 9, 1, 2)];
        let boundaries = [
            BoundaryCounts { first_count: 2, last_count: 0 },
            BoundaryCounts { first_count: 1, last_count: 2 },
            BoundaryCounts { first_count: 1, last_count: 1 },
        ];
        let offsets = reduce_offsets(vec![0; 4], &tasks, &boundaries);
        assert_eq!(offsets.row_ptr, vec![0, 3, 6, 7]);
        assert_eq!(offsets.task_offsets, vec![0, 2, 5, 7]);
        assert_eq!(offsets.nnz, 7);
    }

    #[test]
    fn test_task_inside_a_single_shared_row() {
        let tasks = [task(0, 0, 2, 0, 0), task(1, 2, 4, 0, 0), task(2, 4, 6, 0, 0)];
        let boundaries = [
            BoundaryCounts { first_count: 1, last_count: 0 },
            BoundaryCounts { first_count: 0, last_count: 0 },
            BoundaryCounts { first_count: 2, last_count: 0 },
        ];
        let offsets = reduce_offsets(vec![0; 2], &tasks, &boundaries);
        assert_eq!(offsets.row_ptr, vec![0, 3]);
        assert_eq!(offsets.task_offsets, vec![0, 1, 1, 3]);
    }
}
