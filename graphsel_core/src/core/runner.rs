use std::sync::Arc;

use rayon::{ThreadPool, ThreadPoolBuilder, prelude::*};

use super::error::Result;

/// Fork-join facility the selection phases are scheduled on. Every call
/// returns only after all submitted items have been processed.
pub trait TaskRunner: Sync {
    fn threads(&self) -> usize;

    /// Runs `f` over `items`, returning results in submission order.
    fn map<I, R, F>(&self, items: Vec<I>, f: F) -> Vec<R>
    where
        I: Send,
        R: Send,
        F: Fn(I) -> R + Sync + Send;

    fn for_each<I, F>(&self, items: Vec<I>, f: F)
    where
        I: Send,
        F: Fn(I) + Sync + Send,
    {
        self.map(items, f);
    }
}

/// Runs every item inline on the calling thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct SequentialRunner;

impl TaskRunner for SequentialRunner {
    fn threads(&self) -> usize {
        1
    }

    fn map<I, R, F>(&self, items: Vec<I>, f: F) -> Vec<R>
    where
        I: Send,
        R: Send,
        F: Fn(I) -> R + Sync + Send,
    {
        items.into_iter().map(f).collect()
    }
}

#[derive(Clone)]
pub struct RayonRunner {
    pool: Arc<ThreadPool>,
}

impl RayonRunner {
    pub fn new(threads: usize) -> Result<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads.max(1))
            .thread_name(|index| format!("graphsel-worker-{}", index))
            .build()?;

        Ok(Self { pool: Arc::new(pool) })
    }
}

impl TaskRunner for RayonRunner {
    fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    fn map<I, R, F>(&self, items: Vec<I>, f: F) -> Vec<R>
    where
        I: Send,
        R: Send,
        F: Fn(I) -> R + Sync + Send,
    {
        if items.len() <= 1 {
            return items.into_iter().map(f).collect();
        }

        self.pool.install(|| items.into_par_iter().map(f).collect())
    }
}
