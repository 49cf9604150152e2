use std::{error::Error as StdError, sync::Arc};

/// Ошибки, возвращаемые синхронно в месте вызова.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("thread pool is closed")]
    PoolClosed,

    #[error("failed to spawn worker thread: {0}")]
    WorkerSpawn(#[from] std::io::Error),
}

impl Error {
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        Error::InvalidArgument(msg.into())
    }
}

/// Результат задачи, которая не вернула значение.
///
/// Доставляется через [`TaskHandle`](crate::handle::TaskHandle), а не
/// возвращается из вызова постановки задачи.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TaskError {
    #[error("task failed: {0}")]
    TaskFailed(Arc<dyn StdError + Send + Sync>),

    #[error("task panicked: {0}")]
    Panicked(String),

    #[error("result channel closed")]
    ChannelClosed,

    #[error("timed out waiting for task result")]
    Timeout,
}

impl TaskError {
    pub(crate) fn failed<E>(err: E) -> Self
    where
        E: Into<Box<dyn StdError + Send + Sync>>,
    {
        TaskError::TaskFailed(Arc::from(err.into()))
    }

    /// Ошибка, которую вернуло тело задачи, если задача упала из-за нее.
    pub fn source_error(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        match self {
            TaskError::TaskFailed(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}
