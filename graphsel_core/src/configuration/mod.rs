use crate::{
    DEFAULT_CHUNK_SIZE, DEFAULT_MAX_CONCURRENT_SELECTIONS, DEFAULT_TASKS_PER_THREAD,
    MAX_PERMITS_THREADS,
};

#[derive(Clone, Debug, Default)]
pub struct Configuration {
    pub concurrent_threads: Option<usize>,
    pub chunk_size: Option<usize>,
    pub tasks_per_thread: Option<usize>,
    pub max_concurrent_selections: Option<usize>,
}

impl Configuration {
    /// Number of worker threads, falling back to the process-wide setting and
    /// finally to the available parallelism of the host.
    pub fn threads(&self) -> usize {
        self.concurrent_threads
            .or_else(|| MAX_PERMITS_THREADS.get().copied())
            .unwrap_or_else(|| {
                std::thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(1)
            })
            .max(1)
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size.unwrap_or(DEFAULT_CHUNK_SIZE).max(1)
    }

    pub fn tasks_per_thread(&self) -> usize {
        self.tasks_per_thread.unwrap_or(DEFAULT_TASKS_PER_THREAD).max(1)
    }

    pub fn max_concurrent_selections(&self) -> usize {
        self.max_concurrent_selections
            .unwrap_or(DEFAULT_MAX_CONCURRENT_SELECTIONS)
            .max(1)
    }
}
