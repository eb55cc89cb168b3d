//! Data-parallel stepping of batch slots.
use anyhow::Result;
use log::info;
use rayon::{prelude::*, ThreadPool, ThreadPoolBuilder};

/// Fixed-size pool of workers mapping a function over batch slots.
///
/// [`WorkerPool::map`] blocks until the results of all items are available,
/// and the `i`-th result always corresponds to the `i`-th item. A single item
/// is processed on the calling thread.
pub struct WorkerPool {
    pool: ThreadPool,
}

impl WorkerPool {
    /// Constructs a pool of `n_workers` threads.
    ///
    /// With `None`, the number of workers is the available parallelism.
    pub fn new(n_workers: Option<usize>) -> Result<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(n_workers.unwrap_or(0))
            .thread_name(|i| format!("dagppo-worker-{}", i))
            .build()?;
        info!("Worker pool with {} threads", pool.current_num_threads());
        Ok(Self { pool })
    }

    /// Number of worker threads.
    pub fn n_workers(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Applies `f` to every item.
    ///
    /// The first error returned by `f` aborts the map.
    pub fn map<T, R, F>(&self, items: &[T], f: F) -> Result<Vec<R>>
    where
        T: Sync,
        R: Send,
        F: Fn(&T) -> Result<R> + Send + Sync,
    {
        if items.len() <= 1 {
            return items.iter().map(f).collect();
        }
        self.pool
            .install(|| items.par_iter().map(|item| f(item)).collect())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use anyhow::bail;
    use std::{thread, time::Duration};

    #[test]
    fn test_results_keep_item_order() -> Result<()> {
        let pool = WorkerPool::new(Some(4))?;
        let items: Vec<u64> = (0..32).collect();
        let out = pool.map(&items, |x| {
            // Later items finish first.
            thread::sleep(Duration::from_millis(32 - *x));
            Ok(x * 10)
        })?;

        assert_eq!(out, items.iter().map(|x| x * 10).collect::<Vec<_>>());
        Ok(())
    }

    #[test]
    fn test_single_item_runs_on_caller() -> Result<()> {
        let pool = WorkerPool::new(Some(2))?;
        let caller = thread::current().id();
        let out = pool.map(&[1u8], |_| Ok(thread::current().id()))?;

        assert_eq!(out, vec![caller]);
        Ok(())
    }

    #[test]
    fn test_error_propagates() -> Result<()> {
        let pool = WorkerPool::new(Some(2))?;
        let res = pool.map(&[0, 1, 2, 3], |x| {
            if *x == 2 {
                bail!("step failed on {}", x);
            }
            Ok(*x)
        });

        assert!(res.is_err());
        assert!(res.unwrap_err().to_string().contains("step failed"));
        Ok(())
    }
}
