use std::sync::{Arc, OnceLock};

use log::trace;
use tokio::{sync::Semaphore, task};

use crate::{
    configuration::Configuration,
    core::{
        cancel::CancellationToken,
        element::Scalar,
        error::{Result, SelectError},
        matrix::SparseMatrix,
        statistics::SelectionStatistics,
    },
};

use super::{SelectOp, Selector, global_selector};

static GLOBAL_ASYNC_SELECTOR: OnceLock<AsyncSelector> = OnceLock::new();

/// Offloads selections to tokio's blocking pool. At most
/// `max_concurrent_selections` run at once; the rest wait for a permit.
#[derive(Clone)]
pub struct AsyncSelector {
    selector: Arc<Selector>,
    permits: Arc<Semaphore>,
}

impl AsyncSelector {
    pub fn new(config: Configuration) -> Result<Self> {
        let permits = config.max_concurrent_selections();
        Ok(Self::with_selector(Arc::new(Selector::new(config)?), permits))
    }

    pub fn with_selector(selector: Arc<Selector>, max_concurrent_selections: usize) -> Self {
        Self {
            selector,
            permits: Arc::new(Semaphore::new(max_concurrent_selections.max(1))),
        }
    }

    pub fn selector(&self) -> &Arc<Selector> {
        &self.selector
    }

    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }

    pub async fn select(
        &self,
        matrix: Arc<SparseMatrix>,
        op: SelectOp,
        thunk: Scalar,
        thread_count: usize,
    ) -> Result<SparseMatrix> {
        self.select_with_stats(matrix, op, thunk, thread_count, None)
            .await
            .map(|(output, _)| output)
    }

    pub async fn select_with_stats(
        &self,
        matrix: Arc<SparseMatrix>,
        op: SelectOp,
        thunk: Scalar,
        thread_count: usize,
        cancel: Option<CancellationToken>,
    ) -> Result<(SparseMatrix, SelectionStatistics)> {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|error| SelectError::ThreadPool(error.to_string()))?;

        trace!("Async selection {} acquired a permit", op.kind);

        let selector = Arc::clone(&self.selector);
        let handle = task::spawn_blocking(move || {
            let result = selector.run(&matrix, &op, &thunk, thread_count, cancel.as_ref());
            drop(permit); // Release the permit when the selection finishes
            result
        });

        handle
            .await
            .map_err(|error| SelectError::ThreadPool(error.to_string()))?
    }
}

fn global_async_selector() -> Result<&'static AsyncSelector> {
    if let Some(selector) = GLOBAL_ASYNC_SELECTOR.get() {
        return Ok(selector);
    }

    let selector = global_selector()?;
    let permits = selector.configuration().max_concurrent_selections();
    Ok(GLOBAL_ASYNC_SELECTOR.get_or_init(|| AsyncSelector::with_selector(selector, permits)))
}

/// Async counterpart of `select` running on the process-wide selector.
pub async fn select_async(
    matrix: Arc<SparseMatrix>,
    op: SelectOp,
    thunk: Scalar,
    thread_count: usize,
) -> Result<SparseMatrix> {
    global_async_selector()?.select(matrix, op, thunk, thread_count).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{element::ElementType, select::SelectOpKind};

    fn matrix() -> Arc<SparseMatrix> {
        let triplets: Vec<(usize, usize, u32)> = (0..20).map(|i| (i, (i * 7) % 20, i as u32)).collect();
        Arc::new(SparseMatrix::from_triplets(20, 20, &triplets).unwrap())
    }

    #[tokio::test]
    async fn test_async_matches_sync() {
        let op = SelectOp::new(SelectOpKind::GeThunk, ElementType::U32);
        let input = matrix();

        let expected = crate::core::select::select(&input, &op, &Scalar::U32(10), 2).unwrap();
        let output = select_async(Arc::clone(&input), op, Scalar::U32(10), 2).await.unwrap();

        assert_eq!(output, expected);
        assert_eq!(output.nnz(), 10);
    }

    #[tokio::test]
    async fn test_permits_are_returned() {
        let selector = AsyncSelector::new(Configuration {
            concurrent_threads: Some(2),
            max_concurrent_selections: Some(2),
            ..Default::default()
        })
        .unwrap();
        let op = SelectOp::new(SelectOpKind::NonZero, ElementType::U32);

        let handles: Vec<_> = (0..6)
            .map(|_| {
                let selector = selector.clone();
                let input = matrix();
                tokio::spawn(async move { selector.select(input, op, Scalar::U32(0), 2).await })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap().nnz(), 19);
        }
        assert_eq!(selector.available_permits(), 2);
    }

    #[tokio::test]
    async fn test_cancelled_async_selection() {
        let selector = AsyncSelector::new(Configuration::default()).unwrap();
        let op = SelectOp::new(SelectOpKind::NonZero, ElementType::U32);
        let token = CancellationToken::new();
        token.cancel();

        let result = selector
            .select_with_stats(matrix(), op, Scalar::U32(0), 1, Some(token))
            .await;
        assert_eq!(result.map(|(output, _)| output), Err(SelectError::Cancelled));
    }
}
