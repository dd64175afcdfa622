use std::sync::{Arc, OnceLock};

use log::{debug, trace};
use stopwatch::Stopwatch;

use crate::configuration::Configuration;

use super::{
    cancel::CancellationToken,
    element::{Element, ElementType, Scalar, Values, with_element_type},
    error::{Result, SelectError},
    matrix::{BitmapStorage, CompressedStorage, MatrixFormat, SparseMatrix, Storage, try_filled},
    runner::{RayonRunner, SequentialRunner, TaskRunner},
    statistics::SelectionStatistics,
};

pub mod async_select;
pub mod bitmap;
pub mod iso;
pub mod offsets;
pub mod operator;
pub mod partition;
pub mod phase1;
pub mod phase2;
pub mod predicate;
pub mod source;

pub use async_select::{AsyncSelector, select_async};
pub use iso::{IsoDecision, detect_iso};
pub use operator::{SelectOp, SelectOpKind};

use bitmap::{SlotSource, select_slots};
use offsets::reduce_offsets;
use partition::{Partition, Task, partition_entries, partition_slots};
use phase1::count_survivors;
use phase2::compact;
use predicate::*;
use source::EntrySource;

static GLOBAL_SELECTOR: OnceLock<Arc<Selector>> = OnceLock::new();

/// Selection engine bound to one worker pool and configuration.
pub struct Selector {
    config: Configuration,
    runner: RayonRunner,
}

/// Shared per-call parameters handed down to the typed kernels.
struct Plan<'a> {
    nrows: usize,
    ncols: usize,
    input_iso: bool,
    iso: IsoDecision,
    tasks: &'a [Task],
    cancel: Option<&'a CancellationToken>,
}

enum Job<'m> {
    Compressed(&'m CompressedStorage),
    Bitmap(&'m BitmapStorage),
    BitmapInPlace(&'m mut BitmapStorage),
}

enum Outcome {
    Replaced(Storage),
    Filtered,
}

/// Runs on the pool only when more than one thread was planned.
enum ActiveRunner<'a> {
    Sequential(SequentialRunner),
    Pool(&'a RayonRunner),
}

impl TaskRunner for ActiveRunner<'_> {
    fn threads(&self) -> usize {
        match self {
            ActiveRunner::Sequential(runner) => runner.threads(),
            ActiveRunner::Pool(runner) => runner.threads(),
        }
    }

    fn map<I, R, F>(&self, items: Vec<I>, f: F) -> Vec<R>
    where
        I: Send,
        R: Send,
        F: Fn(I) -> R + Sync + Send,
    {
        match self {
            ActiveRunner::Sequential(runner) => runner.map(items, f),
            ActiveRunner::Pool(runner) => runner.map(items, f),
        }
    }
}

impl Selector {
    pub fn new(config: Configuration) -> Result<Self> {
        let runner = RayonRunner::new(config.threads())?;
        debug!("Selector created with {} worker threads", runner.threads());
        Ok(Self { config, runner })
    }

    pub fn configuration(&self) -> &Configuration {
        &self.config
    }

    pub fn threads(&self) -> usize {
        self.runner.threads()
    }

    /// Returns a new matrix holding the entries of `matrix` that satisfy `op`.
    /// A `thread_count` of zero uses every worker of the pool.
    pub fn select(&self, matrix: &SparseMatrix, op: &SelectOp, thunk: &Scalar, thread_count: usize) -> Result<SparseMatrix> {
        self.run(matrix, op, thunk, thread_count, None).map(|(output, _)| output)
    }

    pub fn select_with_stats(
        &self,
        matrix: &SparseMatrix,
        op: &SelectOp,
        thunk: &Scalar,
        thread_count: usize,
    ) -> Result<(SparseMatrix, SelectionStatistics)> {
        self.run(matrix, op, thunk, thread_count, None)
    }

    /// Like `select`, but gives up with `SelectError::Cancelled` once `cancel`
    /// fires. No partial output is returned.
    pub fn select_cancellable(
        &self,
        matrix: &SparseMatrix,
        op: &SelectOp,
        thunk: &Scalar,
        thread_count: usize,
        cancel: &CancellationToken,
    ) -> Result<SparseMatrix> {
        self.run(matrix, op, thunk, thread_count, Some(cancel)).map(|(output, _)| output)
    }

    /// Drops the entries of a bitmap matrix that fail `op` by clearing their
    /// presence flags. Compressed matrices are rejected.
    pub fn select_in_place(
        &self,
        matrix: &mut SparseMatrix,
        op: &SelectOp,
        thunk: &Scalar,
        thread_count: usize,
    ) -> Result<SelectionStatistics> {
        let stopwatch = Stopwatch::start_new();

        if matrix.format() != MatrixFormat::Bitmap {
            return Err(SelectError::InvalidArgument(
                "in-place selection requires a bitmap matrix".to_string(),
            ));
        }

        op.check(matrix.element_type(), thunk)?;
        debug_assert!(matrix.validate().is_ok());

        let entries_in = matrix.nnz();
        let iso = detect_iso(op.kind, thunk, matrix);
        let partition = self.partition(matrix, thread_count);

        if entries_in > 0 {
            let plan = Plan {
                nrows: matrix.nrows(),
                ncols: matrix.ncols(),
                input_iso: matrix.is_iso(),
                iso,
                tasks: &partition.tasks,
                cancel: None,
            };
            let element_type = matrix.element_type();
            let runner = self.runner_for(&partition);

            if let Storage::Bitmap(bitmap) = matrix.storage_mut() {
                dispatch(&runner, element_type, Job::BitmapInPlace(bitmap), op.kind, thunk, &plan)?;
            }
        }

        if let IsoDecision::Iso(scalar) = iso {
            if !matrix.is_iso() {
                matrix.mark_iso(scalar);
            }
        }

        let statistics = self.statistics(entries_in, matrix, &partition, iso, &stopwatch);
        debug!(
            "In-place {} kept {} of {} entries",
            op.kind, statistics.entries_kept, statistics.entries_in
        );
        Ok(statistics)
    }

    fn run(
        &self,
        matrix: &SparseMatrix,
        op: &SelectOp,
        thunk: &Scalar,
        thread_count: usize,
        cancel: Option<&CancellationToken>,
    ) -> Result<(SparseMatrix, SelectionStatistics)> {
        let stopwatch = Stopwatch::start_new();

        op.check(matrix.element_type(), thunk)?;
        debug_assert!(matrix.validate().is_ok());

        let iso = detect_iso(op.kind, thunk, matrix);
        trace!("Iso decision for {} on {}: {:?}", op.kind, op.element_type, iso);

        if matrix.is_empty() {
            let output = empty_like(matrix, iso)?;
            let statistics = self.statistics(0, &output, &Partition::empty(), iso, &stopwatch);
            return Ok((output, statistics));
        }

        let partition = self.partition(matrix, thread_count);
        debug!(
            "Selecting {} over {} entries with {} tasks on {} threads",
            op.kind,
            matrix.nnz(),
            partition.tasks.len(),
            partition.nthreads
        );

        let plan = Plan {
            nrows: matrix.nrows(),
            ncols: matrix.ncols(),
            input_iso: matrix.is_iso(),
            iso,
            tasks: &partition.tasks,
            cancel,
        };

        let job = match matrix.storage() {
            Storage::Compressed(compressed) => Job::Compressed(compressed),
            Storage::Bitmap(bitmap) => Job::Bitmap(bitmap),
        };

        let runner = self.runner_for(&partition);
        let Outcome::Replaced(storage) = dispatch(&runner, matrix.element_type(), job, op.kind, thunk, &plan)? else {
            return Err(SelectError::InvalidArgument(
                "selection into a new matrix produced no storage".to_string(),
            ));
        };

        let output = SparseMatrix::from_parts_unchecked(
            matrix.nrows(),
            matrix.ncols(),
            matrix.element_type(),
            storage,
            iso.is_iso(),
        );

        let statistics = self.statistics(matrix.nnz(), &output, &partition, iso, &stopwatch);
        debug!(
            "Selection {} kept {} of {} entries",
            op.kind, statistics.entries_kept, statistics.entries_in
        );

        Ok((output, statistics))
    }

    fn partition(&self, matrix: &SparseMatrix, thread_count: usize) -> Partition {
        let pool = self.runner.threads();
        let hint = if thread_count == 0 { pool } else { thread_count.min(pool) };

        match matrix.storage() {
            Storage::Compressed(compressed) => partition_entries(&compressed.row_ptr, hint, &self.config),
            Storage::Bitmap(_) => partition_slots(matrix.nrows(), matrix.ncols(), hint, &self.config),
        }
    }

    fn runner_for(&self, partition: &Partition) -> ActiveRunner<'_> {
        if cfg!(feature = "enable_parallelism") && partition.nthreads > 1 {
            ActiveRunner::Pool(&self.runner)
        } else {
            ActiveRunner::Sequential(SequentialRunner)
        }
    }

    fn statistics(
        &self,
        entries_in: usize,
        output: &SparseMatrix,
        partition: &Partition,
        iso: IsoDecision,
        stopwatch: &Stopwatch,
    ) -> SelectionStatistics {
        SelectionStatistics {
            tasks: partition.tasks.len(),
            threads: partition.nthreads,
            iso: iso.is_iso(),
            execution_time_ms: stopwatch.elapsed().as_secs_f64() * 1000.0,
            ..SelectionStatistics::new(entries_in, output.nnz())
        }
    }
}

/// Empty result in the input's format, tagged iso when the decision says so.
fn empty_like(matrix: &SparseMatrix, iso: IsoDecision) -> Result<SparseMatrix> {
    let mut output = match matrix.format() {
        MatrixFormat::Compressed => SparseMatrix::empty_compressed(matrix.nrows(), matrix.ncols(), matrix.element_type())?,
        MatrixFormat::Bitmap => SparseMatrix::empty_bitmap(matrix.nrows(), matrix.ncols(), matrix.element_type())?,
    };

    if let IsoDecision::Iso(scalar) = iso {
        output.mark_iso(scalar);
    }

    Ok(output)
}

fn dispatch<R: TaskRunner>(
    runner: &R,
    element_type: ElementType,
    job: Job<'_>,
    kind: SelectOpKind,
    thunk: &Scalar,
    plan: &Plan<'_>,
) -> Result<Outcome> {
    with_element_type!(element_type, T => dispatch_kind::<T, R>(runner, job, kind, thunk, plan))
}

fn dispatch_kind<T: Element, R: TaskRunner>(
    runner: &R,
    job: Job<'_>,
    kind: SelectOpKind,
    thunk: &Scalar,
    plan: &Plan<'_>,
) -> Result<Outcome> {
    let k = || match thunk {
        Scalar::I64(k) => Ok(*k),
        other => Err(SelectError::TypeMismatch {
            expected: ElementType::I64,
            found: other.element_type(),
        }),
    };
    let value = || {
        T::from_scalar(thunk).ok_or(SelectError::TypeMismatch {
            expected: T::ELEMENT_TYPE,
            found: thunk.element_type(),
        })
    };

    match kind {
        SelectOpKind::Tril => run_job::<T, _, R>(runner, job, Tril { k: k()? }, plan),
        SelectOpKind::Triu => run_job::<T, _, R>(runner, job, Triu { k: k()? }, plan),
        SelectOpKind::Diag => run_job::<T, _, R>(runner, job, Diag { k: k()? }, plan),
        SelectOpKind::OffDiag => run_job::<T, _, R>(runner, job, OffDiag { k: k()? }, plan),
        SelectOpKind::RowLe => run_job::<T, _, R>(runner, job, RowLe { k: k()? }, plan),
        SelectOpKind::RowGt => run_job::<T, _, R>(runner, job, RowGt { k: k()? }, plan),
        SelectOpKind::ColLe => run_job::<T, _, R>(runner, job, ColLe { k: k()? }, plan),
        SelectOpKind::ColGt => run_job::<T, _, R>(runner, job, ColGt { k: k()? }, plan),
        SelectOpKind::NonZero => run_job::<T, _, R>(runner, job, NonZero, plan),
        SelectOpKind::EqZero => run_job::<T, _, R>(runner, job, EqZero, plan),
        SelectOpKind::GtZero => run_job::<T, _, R>(runner, job, GtZero, plan),
        SelectOpKind::GeZero => run_job::<T, _, R>(runner, job, GeZero, plan),
        SelectOpKind::LtZero => run_job::<T, _, R>(runner, job, LtZero, plan),
        SelectOpKind::LeZero => run_job::<T, _, R>(runner, job, LeZero, plan),
        SelectOpKind::EqThunk => run_job::<T, _, R>(runner, job, EqThunk { thunk: value()? }, plan),
        SelectOpKind::NeThunk => run_job::<T, _, R>(runner, job, NeThunk { thunk: value()? }, plan),
        SelectOpKind::GtThunk => run_job::<T, _, R>(runner, job, GtThunk { thunk: value()? }, plan),
        SelectOpKind::GeThunk => run_job::<T, _, R>(runner, job, GeThunk { thunk: value()? }, plan),
        SelectOpKind::LtThunk => run_job::<T, _, R>(runner, job, LtThunk { thunk: value()? }, plan),
        SelectOpKind::LeThunk => run_job::<T, _, R>(runner, job, LeThunk { thunk: value()? }, plan),
    }
}

fn typed_values<T: Element>(values: &Values) -> Result<&[T]> {
    T::slice(values).ok_or(SelectError::TypeMismatch {
        expected: T::ELEMENT_TYPE,
        found: values.element_type(),
    })
}

fn run_job<T, P, R>(runner: &R, job: Job<'_>, predicate: P, plan: &Plan<'_>) -> Result<Outcome>
where
    T: Element,
    P: EntryPredicate<T>,
    R: TaskRunner,
{
    match job {
        Job::Compressed(input) => {
            select_compressed::<T, P, R>(runner, input, predicate, plan).map(|storage| Outcome::Replaced(Storage::Compressed(storage)))
        }
        Job::Bitmap(input) => {
            select_bitmap::<T, P, R>(runner, input, predicate, plan).map(|storage| Outcome::Replaced(Storage::Bitmap(storage)))
        }
        Job::BitmapInPlace(storage) => {
            let BitmapStorage { presence, values, valid_count } = storage;
            let source = SlotSource {
                ncols: plan.ncols,
                presence: None,
                values: typed_values::<T>(values)?,
                iso: plan.input_iso,
            };
            *valid_count = select_slots(runner, source, predicate, plan.tasks, presence, None, plan.cancel)?;
            Ok(Outcome::Filtered)
        }
    }
}

fn select_compressed<T, P, R>(runner: &R, input: &CompressedStorage, predicate: P, plan: &Plan<'_>) -> Result<CompressedStorage>
where
    T: Element,
    P: EntryPredicate<T>,
    R: TaskRunner,
{
    let source = EntrySource {
        row_ptr: &input.row_ptr,
        col_index: &input.col_index,
        values: typed_values::<T>(&input.values)?,
        iso: plan.input_iso,
    };

    let mut zp = try_filled(plan.nrows + 1, 0usize)?;
    let boundaries = count_survivors(runner, source, predicate, plan.tasks, &mut zp, plan.cancel)?;

    let offsets = reduce_offsets(zp, plan.tasks, &boundaries);
    trace!("Phase 1 counted {} survivors", offsets.nnz);

    let mut col_index = try_filled(offsets.nnz, 0usize)?;

    let values = match plan.iso {
        IsoDecision::Iso(scalar) => {
            compact(runner, source, predicate, plan.tasks, &offsets.task_offsets, &mut col_index, None, plan.cancel)?;
            Values::iso(scalar)
        }
        IsoDecision::NotIso => {
            let mut values = try_filled(offsets.nnz, T::zero())?;
            compact(
                runner,
                source,
                predicate,
                plan.tasks,
                &offsets.task_offsets,
                &mut col_index,
                Some(&mut values),
                plan.cancel,
            )?;
            T::wrap(values)
        }
    };

    Ok(CompressedStorage {
        row_ptr: offsets.row_ptr,
        col_index,
        values,
    })
}

fn select_bitmap<T, P, R>(runner: &R, input: &BitmapStorage, predicate: P, plan: &Plan<'_>) -> Result<BitmapStorage>
where
    T: Element,
    P: EntryPredicate<T>,
    R: TaskRunner,
{
    let source = SlotSource {
        ncols: plan.ncols,
        presence: Some(&input.presence),
        values: typed_values::<T>(&input.values)?,
        iso: plan.input_iso,
    };

    let mut presence = try_filled(input.presence.len(), false)?;

    let (values, valid_count) = match plan.iso {
        IsoDecision::Iso(scalar) => {
            let kept = select_slots(runner, source, predicate, plan.tasks, &mut presence, None, plan.cancel)?;
            (Values::iso(scalar), kept)
        }
        IsoDecision::NotIso => {
            let mut values = try_filled(input.presence.len(), T::zero())?;
            let kept = select_slots(runner, source, predicate, plan.tasks, &mut presence, Some(&mut values), plan.cancel)?;
            (T::wrap(values), kept)
        }
    };

    Ok(BitmapStorage {
        presence,
        values,
        valid_count,
    })
}

/// Process-wide selector, built on first use from the default configuration.
pub fn global_selector() -> Result<Arc<Selector>> {
    if let Some(selector) = GLOBAL_SELECTOR.get() {
        return Ok(Arc::clone(selector));
    }

    let selector = Arc::new(Selector::new(Configuration::default())?);
    Ok(Arc::clone(GLOBAL_SELECTOR.get_or_init(|| selector)))
}

/// Selects the entries of `matrix` that satisfy `op` against `thunk`, using at
/// most `thread_count` threads of the process-wide pool.
pub fn select(matrix: &SparseMatrix, op: &SelectOp, thunk: &Scalar, thread_count: usize) -> Result<SparseMatrix> {
    global_selector()?.select(matrix, op, thunk, thread_count)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selector(threads: usize) -> Selector {
        Selector::new(Configuration {
            concurrent_threads: Some(threads),
            chunk_size: Some(1),
            tasks_per_thread: Some(4),
            ..Default::default()
        })
        .unwrap()
    }

    fn sample() -> SparseMatrix {
        SparseMatrix::from_triplets(
            3,
            3,
            &[(0, 0, 4i64), (0, 2, -1), (1, 1, 0), (2, 0, 4), (2, 1, 9), (2, 2, 4)],
        )
        .unwrap()
    }

    #[test]
    fn test_select_gt_thunk() {
        let op = SelectOp::new(SelectOpKind::GtThunk, ElementType::I64);
        let output = selector(2).select(&sample(), &op, &Scalar::I64(3), 2).unwrap();
        assert_eq!(
            output.iter_entries().collect::<Vec<_>>(),
            vec![
                (0, 0, Scalar::I64(4)),
                (2, 0, Scalar::I64(4)),
                (2, 1, Scalar::I64(9)),
                (2, 2, Scalar::I64(4)),
            ]
        );
        assert!(!output.is_iso());
    }

    #[test]
    fn test_eq_thunk_output_is_iso() {
        let op = SelectOp::new(SelectOpKind::EqThunk, ElementType::I64);
        let output = selector(3).select(&sample(), &op, &Scalar::I64(4), 3).unwrap();
        assert!(output.is_iso());
        assert_eq!(output.iso_value(), Some(Scalar::I64(4)));
        assert_eq!(output.nnz(), 3);
        assert_eq!(output.values().len(), 1);
    }

    #[test]
    fn test_type_mismatch_rejected() {
        let op = SelectOp::new(SelectOpKind::GtThunk, ElementType::I32);
        let result = selector(1).select(&sample(), &op, &Scalar::I32(0), 1);
        assert_eq!(
            result,
            Err(SelectError::TypeMismatch {
                expected: ElementType::I32,
                found: ElementType::I64
            })
        );
    }

    #[test]
    fn test_in_place_requires_bitmap() {
        let mut matrix = sample();
        let op = SelectOp::new(SelectOpKind::NonZero, ElementType::I64);
        let result = selector(1).select_in_place(&mut matrix, &op, &Scalar::I64(0), 1);
        assert!(matches!(result, Err(SelectError::InvalidArgument(_))));
    }

    #[test]
    fn test_in_place_bitmap_marks_iso() {
        let mut matrix = sample().to_bitmap().unwrap();
        let op = SelectOp::new(SelectOpKind::EqThunk, ElementType::I64);
        let stats = selector(2).select_in_place(&mut matrix, &op, &Scalar::I64(4), 2).unwrap();

        assert_eq!(stats.entries_in, 6);
        assert_eq!(stats.entries_kept, 3);
        assert!(matrix.is_iso());
        assert!(matrix.validate().is_ok());
        assert_eq!(matrix.get(2, 2), Some(Scalar::I64(4)));
        assert_eq!(matrix.get(2, 1), None);
    }

    #[test]
    fn test_thread_count_zero_uses_pool() {
        let op = SelectOp::new(SelectOpKind::NonZero, ElementType::I64);
        let (output, stats) = selector(2).select_with_stats(&sample(), &op, &Scalar::I64(0), 0).unwrap();
        assert_eq!(output.nnz(), 5);
        assert_eq!(stats.threads, 2);
        assert_eq!(stats.entries_removed, 1);
    }

    #[test]
    fn test_global_select() {
        let op = SelectOp::new(SelectOpKind::Diag, ElementType::I64);
        let output = select(&sample(), &op, &Scalar::I64(0), 4).unwrap();
        assert_eq!(output.nnz(), 3);
        assert_eq!(output.format(), MatrixFormat::Compressed);
    }
}
