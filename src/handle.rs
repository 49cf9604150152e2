use super::{
    errors::TaskError,
    model::TaskStatus,
    result::SpawnResult,
};
use crossbeam::channel::{self, Receiver, RecvTimeoutError, TryRecvError};
use parking_lot::Mutex;
use std::{
    any::Any,
    fmt,
    panic::{self, AssertUnwindSafe},
    sync::OnceLock,
    time::{Duration, Instant},
};
use tracing::{error, warn};


/// Задача в очереди пула со стертым типом.
///
/// Выполняет пользовательскую функцию, отправляет результат в связанный
/// [`TaskHandle`] и сообщает, чем все закончилось.
pub(crate) type Task = Box<dyn FnOnce() -> TaskStatus + Send + 'static>;

#[derive(Clone, Copy)]
enum Wait {
    Forever,
    Until(Instant),
    Never,
}


/// Одноразовый handle на результат поставленной задачи.
///
/// Значение доставляется ровно один раз, после этого каждое чтение
/// возвращает одно и то же.
pub struct TaskHandle<T> {
    receiver: Receiver<SpawnResult<T>>,
    outcome: OnceLock<SpawnResult<T>>,
    recv_lock: Mutex<()>,
}

impl<T> TaskHandle<T> {

    pub(crate) fn new(receiver: Receiver<SpawnResult<T>>) -> Self {
        Self {
            receiver,
            outcome: OnceLock::new(),
            recv_lock: Mutex::new(()),
        }
    }

    /// Блокируется до завершения задачи и возвращает результат.
    pub fn get(&self) -> SpawnResult<T>
    where
        T: Clone,
    {
        match self.fetch(Wait::Forever) {
            Some(outcome) => outcome.clone(),
            None => Err(TaskError::ChannelClosed),
        }
    }

    /// Ждет не дольше `timeout`. После [`TaskError::Timeout`] handle можно читать дальше.
    pub fn get_timeout(&self, timeout: Duration) -> SpawnResult<T>
    where
        T: Clone,
    {
        let wait = match Instant::now().checked_add(timeout) {
            Some(deadline) => Wait::Until(deadline),
            None => Wait::Forever,
        };
        match self.fetch(wait) {
            Some(outcome) => outcome.clone(),
            None => Err(TaskError::Timeout),
        }
    }

    /// Неблокирующее чтение, `None` пока задача не завершилась.
    pub fn try_get(&self) -> Option<SpawnResult<T>>
    where
        T: Clone,
    {
        self.fetch(Wait::Never).cloned()
    }

    #[inline]
    pub fn is_finished(&self) -> bool {
        self.fetch(Wait::Never).is_some()
    }

    /// Забирает handle и блокируется до получения результата.
    pub fn join(self) -> SpawnResult<T> {
        let Self { receiver, outcome, .. } = self;
        match outcome.into_inner() {
            Some(outcome) => outcome,
            None => receiver.recv().unwrap_or(Err(TaskError::ChannelClosed)),
        }
    }

    fn fetch(&self, wait: Wait) -> Option<&SpawnResult<T>> {
        if let Some(outcome) = self.outcome.get() {
            return Some(outcome);
        }

        // Из канала читает только один, остальные берут закешированное значение
        let _guard = match wait {
            Wait::Forever => self.recv_lock.lock(),
            Wait::Until(deadline) => self.recv_lock.try_lock_until(deadline)?,
            Wait::Never => self.recv_lock.try_lock()?,
        };
        if let Some(outcome) = self.outcome.get() {
            return Some(outcome);
        }

        let received = match wait {
            Wait::Forever => self.receiver.recv().unwrap_or(Err(TaskError::ChannelClosed)),
            Wait::Until(deadline) => match self.receiver.recv_deadline(deadline) {
                Ok(result) => result,
                Err(RecvTimeoutError::Timeout) => return None,
                Err(RecvTimeoutError::Disconnected) => Err(TaskError::ChannelClosed),
            },
            Wait::Never => match self.receiver.try_recv() {
                Ok(result) => result,
                Err(TryRecvError::Empty) => return None,
                Err(TryRecvError::Disconnected) => Err(TaskError::ChannelClosed),
            },
        };
        Some(self.outcome.get_or_init(|| received))
    }
}

impl<T> fmt::Debug for TaskHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("finished", &self.outcome.get().is_some())
            .finish()
    }
}


/// Упаковывает `f` в [`Task`] для очереди и handle, куда придет результат.
pub(crate) fn package<T, F>(f: F) -> (Task, TaskHandle<T>)
where
    T: Send + 'static,
    F: FnOnce() -> SpawnResult<T> + Send + 'static,
{
    let (tx, rx) = channel::bounded::<SpawnResult<T>>(1);

    let task: Task = Box::new(move || {
        let result = panic::catch_unwind(AssertUnwindSafe(f))
            .unwrap_or_else(|payload| Err(TaskError::Panicked(panic_message(payload.as_ref()))));

        let status = match &result {
            Ok(_) => TaskStatus::Completed,
            Err(TaskError::Panicked(msg)) => {
                error!(panic = %msg, "task panicked");
                TaskStatus::Panicked
            }
            Err(err) => {
                warn!(error = %err, "task returned an error");
                TaskStatus::Failed
            }
        };

        // Handle мог быть уже дропнут
        let _ = tx.send(result);
        status
    });

    (task, TaskHandle::new(rx))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
