use super::errors::{Error, TaskError};

pub type Result<T> = std::result::Result<T, Error>;

/// То, что в итоге отдает [`TaskHandle`](crate::handle::TaskHandle).
pub type SpawnResult<T> = std::result::Result<T, TaskError>;
