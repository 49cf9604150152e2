use std::fmt;

#[derive(Debug, Clone)]
pub struct PoolMetrics {
    pub num_workers: usize,
    pub active_tasks: usize,
    pub idle_workers: usize,
    pub queued_tasks: usize,
    pub total_submitted: usize,
    pub completed_tasks: usize,
    pub failed_tasks: usize,
}

impl PoolMetrics {
    pub fn utilization(&self) -> f64 {
        if self.num_workers == 0 {
            return 0.0;
        }
        self.active_tasks as f64 / self.num_workers as f64
    }

    pub fn queue_pressure(&self) -> f64 {
        if self.num_workers == 0 {
            return self.queued_tasks as f64;
        }
        self.queued_tasks as f64 / self.num_workers as f64
    }

    pub fn success_rate(&self) -> f64 {
        let total = self.completed_tasks + self.failed_tasks;
        if total == 0 {
            return 1.0;
        }
        self.completed_tasks as f64 / total as f64
    }

    /// Принятые, но еще не завершенные задачи (в очереди или в работе).
    pub fn pending(&self) -> usize {
        self.total_submitted
            .saturating_sub(self.completed_tasks + self.failed_tasks)
    }
}

/// Жизненный цикл [`ThreadPool`](crate::pool::ThreadPool).
///
/// `Running -> Draining -> Stopping -> Stopped`, только вперед.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PoolState {
    Running,
    /// Новые задачи отклоняются, очередь дорабатывается.
    Draining,
    /// Очередь пуста, воркерам сказано завершиться.
    Stopping,
    Stopped,
}

impl PoolState {
    #[inline]
    pub fn accepts_tasks(self) -> bool {
        self == PoolState::Running
    }
}

impl fmt::Display for PoolState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PoolState::Running => "running",
            PoolState::Draining => "draining",
            PoolState::Stopping => "stopping",
            PoolState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Чем закончилась задача с точки зрения воркера.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Completed,
    Failed,
    Panicked,
}

impl TaskStatus {
    #[inline]
    pub fn is_success(self) -> bool {
        self == TaskStatus::Completed
    }
}
