#[cfg(test)]
mod tests {
    use multithreaded_downloader::{
        errors::TaskError,
        pool::{Config, ThreadPool},
        queue::BlockingQueue,
    };
    use std::{
        collections::HashSet,
        sync::Arc,
        thread,
        time::{Duration, Instant},
    };

    fn measure<F, T>(name: &str, f: F) -> T
    where
        F: FnOnce() -> T,
    {
        let start = Instant::now();
        let result = f();
        println!("✓ {}: {:?}", name, start.elapsed());
        result
    }

    #[test]
    fn load_test_1_small_fast_tasks() {
        println!("\n=== LOAD TEST 1: 10k fast tasks ===");
        let pool = ThreadPool::with_config(Config::cpu_bound()).unwrap();

        let results = measure("10k tasks", || {
            let handles: Vec<_> = (0..10_000u64)
                .map(|x| pool.enqueue(move || x * 2).unwrap())
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap())
                .collect::<Vec<_>>()
        });

        assert_eq!(results.len(), 10_000);
        assert_eq!(results.iter().sum::<u64>(), (0..10_000u64).map(|x| x * 2).sum());

        pool.join_all();
        let metrics = pool.metrics();
        assert_eq!(metrics.completed_tasks, 10_000);
        assert_eq!(metrics.pending(), 0);
        println!("  completed: {}/{}", metrics.completed_tasks, results.len());
    }

    #[test]
    fn load_test_2_io_like_tasks() {
        println!("\n=== LOAD TEST 2: 400 sleeping tasks (2ms each) ===");
        let pool = ThreadPool::new(16).unwrap();

        let results = measure("400 tasks @ 2ms on 16 workers", || {
            let handles: Vec<_> = (0..400usize)
                .map(|i| {
                    pool.enqueue(move || {
                        thread::sleep(Duration::from_millis(2));
                        i
                    })
                    .unwrap()
                })
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap())
                .collect::<HashSet<_>>()
        });

        assert_eq!(results.len(), 400);
    }

    #[test]
    fn load_test_3_mixed_failures() {
        println!("\n=== LOAD TEST 3: every 10th task fails ===");
        let pool = ThreadPool::new(4).unwrap();

        let handles: Vec<_> = (0..1_000u32)
            .map(|i| {
                pool.try_enqueue(move || {
                    if i % 10 == 0 {
                        Err(format!("segment {} failed", i))
                    } else {
                        Ok(i)
                    }
                })
                .unwrap()
            })
            .collect();

        let mut ok = 0;
        let mut failed = 0;
        for handle in handles {
            match handle.join() {
                Ok(_) => ok += 1,
                Err(TaskError::TaskFailed(_)) => failed += 1,
                Err(e) => panic!("unexpected error: {:?}", e),
            }
        }
        assert_eq!((ok, failed), (900, 100));

        pool.join_all();
        let metrics = pool.metrics();
        assert_eq!(metrics.failed_tasks, 100);
        println!("  success rate: {:.1}%", metrics.success_rate() * 100.0);
    }

    #[test]
    fn load_test_4_queue_pipeline() {
        println!("\n=== LOAD TEST 4: workers feeding a BlockingQueue ===");
        let pool = ThreadPool::new(8).unwrap();
        let queue = Arc::new(BlockingQueue::new());

        for i in 0..5_000u32 {
            let queue = queue.clone();
            pool.enqueue(move || queue.push(i)).unwrap();
        }

        let received = measure("drain 5k items", || {
            (0..5_000).map(|_| queue.pop()).collect::<HashSet<_>>()
        });

        assert_eq!(received.len(), 5_000);
        assert!(queue.is_empty());
    }

    #[test]
    fn load_test_5_repeated_pool_lifecycle() {
        println!("\n=== LOAD TEST 5: 200 pool create/drop cycles ===");
        measure("200 lifecycles", || {
            for round in 0..200usize {
                let pool = ThreadPool::new(1 + round % 4).unwrap();
                let handles: Vec<_> = (0..10).map(|i| pool.enqueue(move || i + round).unwrap()).collect();
                drop(pool);
                for (i, handle) in handles.into_iter().enumerate() {
                    assert_eq!(handle.try_get().unwrap().unwrap(), i + round);
                }
            }
        });
    }
}
