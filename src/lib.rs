//! Пул потоков фиксированного размера для задач многопоточной загрузки
//!
//! # Features
//! - Задачи ставят любые потоки-производители, выполняет фиксированный набор воркеров
//! - Каждая постановка возвращает одноразовый `TaskHandle` с блокирующим повторяемым `get`
//! - Ошибки и паники задач доставляются через handle, воркеры продолжают работу
//! - Drop пула закрывает прием задач, дорабатывает очередь и джойнит воркеры
//! - Обобщенная `BlockingQueue` для передачи данных между потоками
//! - Метрики пула и состояние жизненного цикла

pub mod args;
pub mod errors;
pub mod handle;
pub mod model;
pub mod pool;
pub mod queue;
pub mod result;

pub use args::{parse_arguments, DownloadOptions};
pub use errors::{Error, TaskError};
pub use handle::TaskHandle;
pub use model::{PoolMetrics, PoolState};
pub use pool::{Config, Spawner, ThreadPool};
pub use queue::BlockingQueue;
pub use result::{Result, SpawnResult};
