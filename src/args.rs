//! Стартовая конфигурация из аргументов командной строки.

use super::{errors::Error, result::Result};
use clap::Parser;
use std::{ffi::OsString, path::PathBuf};

/// Ключевое слово, включающее докачку, если передано четвертым позиционным аргументом.
pub const RESUMABLE: &str = "Resumable";

/// Загрузка файла, разбитая между фиксированным пулом рабочих потоков.
#[derive(Parser, Debug)]
#[command(name = "multithreaded_downloader")]
#[command(author, version, about)]
pub struct Args {
    /// URL файла для загрузки
    pub url: String,

    /// Куда записывается загруженный файл
    pub file_path: PathBuf,

    /// Количество рабочих потоков (не меньше 1)
    #[arg(value_parser = clap::value_parser!(u32).range(1..))]
    pub num_threads: u32,

    /// `Resumable` продолжает ранее прерванную загрузку
    pub mode: Option<String>,

    /// Подробность логов (-v для debug, -vv для trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Выводить только ошибки
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    pub fn options(&self) -> DownloadOptions {
        DownloadOptions {
            url: self.url.clone(),
            file_path: self.file_path.clone(),
            num_threads: self.num_threads as usize,
            resumable: self.mode.as_deref() == Some(RESUMABLE),
        }
    }
}

/// Параметры, с которыми запускается пул.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOptions {
    pub url: String,
    pub file_path: PathBuf,
    pub num_threads: usize,
    pub resumable: bool,
}

/// Разбирает `<URL> <TargetFilePath> <NumThreads> [Resumable]`.
///
/// `argv` начинается с имени программы. Нехватка позиционных аргументов или
/// число потоков, не являющееся положительным целым, дают [`Error::InvalidArgument`].
pub fn parse_arguments<I, T>(argv: I) -> Result<DownloadOptions>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    Args::try_parse_from(argv)
        .map(|args| args.options())
        .map_err(invalid_argument)
}

pub fn invalid_argument(err: clap::Error) -> Error {
    Error::invalid_argument(err.to_string().trim_end())
}
