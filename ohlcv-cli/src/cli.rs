use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};

use crate::config;

/// ohlcv - потоковый разбор OHLCV CSV (Date,Open,High,Low,Close,Volume).
///
/// Файл читается чанками, битые строки пропускаются и пишутся в лог.
#[derive(Parser, Debug, Clone)]
#[command(name = "ohlcv", version, about)]
pub(crate) struct Args {
    /// CSV-файл. Без флага читается stdin
    #[arg(long, short)]
    pub(crate) input: Option<PathBuf>,

    /// Размер чанка чтения в байтах
    #[arg(long, default_value_t = config::CHUNK_SIZE)]
    pub(crate) chunk_size: usize,

    /// Формат вывода свечей
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub(crate) format: OutputFormat,

    /// Завершиться с ошибкой, если была пропущена хотя бы одна строка
    #[arg(long)]
    pub(crate) fail_on_skip: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OutputFormat {
    /// TS|OPEN|HIGH|LOW|CLOSE|VOLUME
    Text,
    /// одна JSON-свеча на строку
    Json,
}

impl Args {
    /// Валидация аргументов (файл существует, размер чанка в пределах)
    pub(crate) fn validate(&self) -> Result<()> {
        if !(config::MIN_CHUNK_SIZE..=config::MAX_CHUNK_SIZE).contains(&self.chunk_size) {
            bail!(
                "--chunk-size must be within {}..={} (got: {})",
                config::MIN_CHUNK_SIZE,
                config::MAX_CHUNK_SIZE,
                self.chunk_size
            );
        }

        if let Some(path) = &self.input {
            let md = std::fs::metadata(path)
                .with_context(|| format!("input file not found: {:?}", path))?;
            if !md.is_file() {
                bail!("--input must point to a file: {:?}", path);
            }
        }

        Ok(())
    }

    pub(crate) fn input_name(&self) -> String {
        match &self.input {
            Some(path) => path.display().to_string(),
            None => "<stdin>".to_string(),
        }
    }
}
