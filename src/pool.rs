use super::{
    errors::{Error, TaskError},
    handle::{self, Task, TaskHandle},
    model::{PoolMetrics, PoolState, TaskStatus},
    result::{Result, SpawnResult},
};
use parking_lot::{Condvar, Mutex};
use std::{
    collections::VecDeque,
    error::Error as StdError,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};
use tracing::{debug, error, info, trace, warn};


/// Конфигурация пула потоков
#[derive(Debug, Clone)]
pub struct Config {
    pub num_threads: usize,
    pub thread_name_prefix: String,
    pub stack_size: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            num_threads: num_cpus::get(),
            thread_name_prefix: "pool-worker".to_string(),
            stack_size: None,
        }
    }
}

impl Config {
    pub fn cpu_bound() -> Self {
        Self {
            num_threads: num_cpus::get(),
            ..Default::default()
        }
    }

    /// Воркеров вдвое больше, чем CPU, для задач, которые в основном ждут.
    pub fn io_bound() -> Self {
        Self {
            num_threads: num_cpus::get() * 2,
            ..Default::default()
        }
    }

    pub fn num_threads(mut self, n: usize) -> Self {
        self.num_threads = n;
        self
    }

    pub fn thread_name_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }

    pub fn stack_size(mut self, size: usize) -> Self {
        self.stack_size = Some(size);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_threads == 0 {
            return Err(Error::invalid_argument("num_threads must be > 0"));
        }
        if self.thread_name_prefix.contains('\0') {
            return Err(Error::invalid_argument("thread_name_prefix must not contain NUL bytes"));
        }
        if self.stack_size == Some(0) {
            return Err(Error::invalid_argument("stack_size must be > 0"));
        }
        Ok(())
    }
}


struct Inner {
    tasks: VecDeque<Task>,
    state: PoolState,
    /// Принятые и еще не завершенные задачи, в очереди или в работе.
    unfinished: usize,
}

/// Общее состояние пула, его воркеров и всех [`Spawner`].
struct Shared {
    inner: Mutex<Inner>,
    work_available: Condvar,
    drained: Condvar,
    all_done: Condvar,
    num_workers: usize,
    active_tasks: AtomicUsize,
    idle_workers: AtomicUsize,
    total_submitted: AtomicUsize,
    completed_tasks: AtomicUsize,
    failed_tasks: AtomicUsize,
}

impl Shared {
    fn new(num_workers: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                tasks: VecDeque::new(),
                state: PoolState::Running,
                unfinished: 0,
            }),
            work_available: Condvar::new(),
            drained: Condvar::new(),
            all_done: Condvar::new(),
            num_workers,
            active_tasks: AtomicUsize::new(0),
            idle_workers: AtomicUsize::new(0),
            total_submitted: AtomicUsize::new(0),
            completed_tasks: AtomicUsize::new(0),
            failed_tasks: AtomicUsize::new(0),
        }
    }

    fn push_task(&self, task: Task) -> Result<()> {
        {
            let mut inner = self.inner.lock();
            if !inner.state.accepts_tasks() {
                warn!(state = %inner.state, "rejected task submission");
                return Err(Error::PoolClosed);
            }
            inner.tasks.push_back(task);
            inner.unfinished += 1;
            self.total_submitted.fetch_add(1, Ordering::Relaxed);
        }
        self.work_available.notify_one();
        Ok(())
    }

    /// Ждет задачу; `None`, когда пул останавливается и очередь пуста.
    fn next_task(&self) -> Option<Task> {
        let mut inner = self.inner.lock();
        loop {
            if let Some(task) = inner.tasks.pop_front() {
                if inner.tasks.is_empty() {
                    self.drained.notify_all();
                }
                self.active_tasks.fetch_add(1, Ordering::Relaxed);
                return Some(task);
            }
            if inner.state >= PoolState::Stopping {
                return None;
            }

            self.idle_workers.fetch_add(1, Ordering::Relaxed);
            self.work_available.wait(&mut inner);
            self.idle_workers.fetch_sub(1, Ordering::Relaxed);
        }
    }

    fn finish_task(&self, status: TaskStatus) {
        if status.is_success() {
            self.completed_tasks.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed_tasks.fetch_add(1, Ordering::Relaxed);
        }
        self.active_tasks.fetch_sub(1, Ordering::Relaxed);

        let mut inner = self.inner.lock();
        inner.unfinished -= 1;
        if inner.unfinished == 0 {
            self.all_done.notify_all();
        }
    }

    fn state(&self) -> PoolState {
        self.inner.lock().state
    }

    fn metrics(&self) -> PoolMetrics {
        PoolMetrics {
            num_workers: self.num_workers,
            active_tasks: self.active_tasks.load(Ordering::Relaxed),
            idle_workers: self.idle_workers.load(Ordering::Relaxed),
            queued_tasks: self.inner.lock().tasks.len(),
            total_submitted: self.total_submitted.load(Ordering::Relaxed),
            completed_tasks: self.completed_tasks.load(Ordering::Relaxed),
            failed_tasks: self.failed_tasks.load(Ordering::Relaxed),
        }
    }
}

fn worker_loop(shared: Arc<Shared>, index: usize) {
    debug!(worker = index, "worker started");
    while let Some(task) = shared.next_task() {
        trace!(worker = index, "running task");
        let status = task();
        shared.finish_task(status);
    }
    debug!(worker = index, "worker exiting");
}


/// Клонируемая точка постановки задач в [`ThreadPool`].
///
/// Не держит воркеры. Как только пул начал останавливаться, любая
/// постановка возвращает [`Error::PoolClosed`].
#[derive(Clone)]
pub struct Spawner {
    shared: Arc<Shared>,
}

impl Spawner {
    /// Ставит `f` в очередь и возвращает handle на ее результат.
    ///
    /// Паника внутри `f` приходит как [`TaskError::Panicked`].
    pub fn enqueue<T, F>(&self, f: F) -> Result<TaskHandle<T>>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        self.submit(move || Ok(f()))
    }

    /// Ставит `f`, которая может вернуть ошибку; `Err` придет как [`TaskError::TaskFailed`].
    pub fn try_enqueue<T, E, F>(&self, f: F) -> Result<TaskHandle<T>>
    where
        T: Send + 'static,
        E: Into<Box<dyn StdError + Send + Sync>>,
        F: FnOnce() -> std::result::Result<T, E> + Send + 'static,
    {
        self.submit(move || f().map_err(TaskError::failed))
    }

    /// Привязывает `args` к `f` и ставит вызов в очередь.
    pub fn enqueue_with<A, T, F>(&self, f: F, args: A) -> Result<TaskHandle<T>>
    where
        A: Send + 'static,
        T: Send + 'static,
        F: FnOnce(A) -> T + Send + 'static,
    {
        self.enqueue(move || f(args))
    }

    #[inline]
    fn submit<T, F>(&self, f: F) -> Result<TaskHandle<T>>
    where
        T: Send + 'static,
        F: FnOnce() -> SpawnResult<T> + Send + 'static,
    {
        let (task, handle) = handle::package(f);
        self.shared.push_task(task)?;
        Ok(handle)
    }

    #[inline]
    pub fn state(&self) -> PoolState {
        self.shared.state()
    }

    #[inline]
    pub fn metrics(&self) -> PoolMetrics {
        self.shared.metrics()
    }
}


/// Пул рабочих потоков фиксированного размера.
///
/// Drop закрывает пул для новых задач, ждет выполнения всех принятых
/// и джойнит воркеры.
pub struct ThreadPool {
    spawner: Spawner,
    workers: Vec<JoinHandle<()>>,
    config: Config,
}

impl ThreadPool {
    /// Запускает пул на `num_threads` воркеров, ноль отклоняется.
    pub fn new(num_threads: usize) -> Result<Self> {
        Self::with_config(Config::default().num_threads(num_threads))
    }

    pub fn with_config(config: Config) -> Result<Self> {
        config.validate()?;

        let shared = Arc::new(Shared::new(config.num_threads));
        let mut pool = ThreadPool {
            spawner: Spawner { shared: shared.clone() },
            workers: Vec::with_capacity(config.num_threads),
            config,
        };

        for index in 0..pool.config.num_threads {
            let mut builder = thread::Builder::new()
                .name(format!("{}-{}", pool.config.thread_name_prefix, index));
            if let Some(size) = pool.config.stack_size {
                builder = builder.stack_size(size);
            }

            let shared = shared.clone();
            // При ошибке `pool` дропается и джойнит уже запущенные воркеры
            let worker = builder.spawn(move || worker_loop(shared, index))?;
            pool.workers.push(worker);
        }

        info!(workers = pool.config.num_threads, "thread pool started");
        Ok(pool)
    }

    pub fn cpu_bound() -> Result<Self> {
        Self::with_config(Config::cpu_bound())
    }

    pub fn io_bound() -> Result<Self> {
        Self::with_config(Config::io_bound())
    }

    /// See [`Spawner::enqueue`].
    #[inline]
    pub fn enqueue<T, F>(&self, f: F) -> Result<TaskHandle<T>>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        self.spawner.enqueue(f)
    }

    /// See [`Spawner::try_enqueue`].
    #[inline]
    pub fn try_enqueue<T, E, F>(&self, f: F) -> Result<TaskHandle<T>>
    where
        T: Send + 'static,
        E: Into<Box<dyn StdError + Send + Sync>>,
        F: FnOnce() -> std::result::Result<T, E> + Send + 'static,
    {
        self.spawner.try_enqueue(f)
    }

    /// See [`Spawner::enqueue_with`].
    #[inline]
    pub fn enqueue_with<A, T, F>(&self, f: F, args: A) -> Result<TaskHandle<T>>
    where
        A: Send + 'static,
        T: Send + 'static,
        F: FnOnce(A) -> T + Send + 'static,
    {
        self.spawner.enqueue_with(f, args)
    }

    #[inline]
    pub fn spawner(&self) -> Spawner {
        self.spawner.clone()
    }

    #[inline]
    pub fn num_workers(&self) -> usize {
        self.config.num_threads
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[inline]
    pub fn state(&self) -> PoolState {
        self.spawner.state()
    }

    #[inline]
    pub fn metrics(&self) -> PoolMetrics {
        self.spawner.metrics()
    }

    /// Ждет завершения всех принятых задач, пул остается открытым.
    ///
    /// Нельзя вызывать из задачи этого же пула.
    pub fn join_all(&self) {
        let shared = &self.spawner.shared;
        let mut inner = shared.inner.lock();
        while inner.unfinished > 0 {
            shared.all_done.wait(&mut inner);
        }
    }

    /// Как [`join_all`](Self::join_all), но `false`, если `timeout` истек раньше.
    pub fn join_all_timeout(&self, timeout: Duration) -> bool {
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            self.join_all();
            return true;
        };
        let shared = &self.spawner.shared;
        let mut inner = shared.inner.lock();
        while inner.unfinished > 0 {
            if shared.all_done.wait_until(&mut inner, deadline).timed_out() {
                return inner.unfinished == 0;
            }
        }
        true
    }

    /// То же, что drop пула, только явно.
    pub fn shutdown(mut self) {
        self.shutdown_workers();
    }

    fn shutdown_workers(&mut self) {
        let shared = self.spawner.shared.clone();
        {
            let mut inner = shared.inner.lock();
            if inner.state == PoolState::Stopped {
                return;
            }

            inner.state = PoolState::Draining;
            debug!(queued = inner.tasks.len(), "thread pool draining");
            while !inner.tasks.is_empty() {
                shared.drained.wait(&mut inner);
            }

            inner.state = PoolState::Stopping;
            debug!("thread pool stopping");
        }
        shared.work_available.notify_all();

        for worker in self.workers.drain(..) {
            let name = worker.thread().name().map(str::to_owned);
            if worker.join().is_err() {
                error!(worker = ?name, "worker thread panicked");
            }
        }

        shared.inner.lock().state = PoolState::Stopped;
        info!("thread pool stopped");
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        self.shutdown_workers();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_validation() {
        assert!(Config::default().num_threads(4).validate().is_ok());
        assert!(matches!(
            Config::default().num_threads(0).validate(),
            Err(Error::InvalidArgument(_))
        ));
        assert!(Config::default().num_threads(1).stack_size(0).validate().is_err());
        assert!(matches!(
            Config::default().num_threads(1).thread_name_prefix("seg\0ment").validate(),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_nul_in_thread_name_rejected_before_spawn() {
        let result = ThreadPool::with_config(
            Config::default().num_threads(1).thread_name_prefix("a\0b"),
        );
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_worker_spawn_failure_returns_error() {
        // Стек в 1 EiB не выделит ни одна ОС
        let start = Instant::now();
        let result = ThreadPool::with_config(Config::default().num_threads(2).stack_size(1 << 60));
        assert!(matches!(result, Err(Error::WorkerSpawn(_))));
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_config_presets() {
        assert_eq!(Config::cpu_bound().num_threads, num_cpus::get());
        assert_eq!(Config::io_bound().num_threads, num_cpus::get() * 2);
        assert_eq!(Config::default().thread_name_prefix("dl").thread_name_prefix, "dl");
    }

    #[test]
    fn test_workers_are_named() {
        let pool = ThreadPool::with_config(
            Config::default().num_threads(1).thread_name_prefix("segment"),
        )
        .unwrap();
        let name = pool
            .enqueue(|| thread::current().name().map(str::to_owned))
            .unwrap()
            .join()
            .unwrap();
        assert_eq!(name.as_deref(), Some("segment-0"));
    }

    #[test]
    fn test_state_transitions_to_stopped() {
        let pool = ThreadPool::new(2).unwrap();
        let spawner = pool.spawner();
        assert_eq!(pool.state(), PoolState::Running);

        pool.shutdown();
        assert_eq!(spawner.state(), PoolState::Stopped);
        assert!(matches!(spawner.enqueue(|| ()), Err(Error::PoolClosed)));
    }

    #[test]
    fn test_join_all_timeout_with_max_duration() {
        let pool = ThreadPool::new(1).unwrap();
        assert!(pool.join_all_timeout(Duration::MAX));

        pool.enqueue(|| thread::sleep(Duration::from_millis(10))).unwrap();
        assert!(pool.join_all_timeout(Duration::MAX));
        assert_eq!(pool.metrics().completed_tasks, 1);
    }

    #[test]
    fn test_join_all_waits_for_running_tasks() {
        let pool = ThreadPool::new(2).unwrap();
        for _ in 0..4 {
            pool.enqueue(|| thread::sleep(Duration::from_millis(20))).unwrap();
        }
        assert!(!pool.join_all_timeout(Duration::from_millis(1)));
        pool.join_all();

        let metrics = pool.metrics();
        assert_eq!(metrics.completed_tasks, 4);
        assert_eq!(metrics.active_tasks, 0);
        assert_eq!(metrics.queued_tasks, 0);
        assert_eq!(metrics.pending(), 0);
    }
}
