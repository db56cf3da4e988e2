//! Точка входа `ohlcv`.
//!
//! Жизненный цикл:
//! - парсинг CLI и открытие источника (файл или stdin)
//! - чтение чанками через `ChunkFeeder`, свечи сразу пишутся в stdout
//! - пропущенные строки уходят в лог (`RUST_LOG=warn` и выше)
//! - корректная остановка по `Ctrl+C` между чанками

mod cli;
mod config;
mod input;
mod output;

use std::io;
use std::sync::{Arc, atomic::AtomicBool, atomic::Ordering};

use anyhow::bail;
use clap::Parser;
use log::{info, warn};
use ohlcv_core::{BarParser, ChunkError, ChunkFeeder};

fn main() -> anyhow::Result<()> {
    // Логи через RUST_LOG=info/debug
    env_logger::init();

    let shutdown = Arc::new(AtomicBool::new(false));

    // Ctrl+C => ставим shutdown=true
    {
        let shutdown = shutdown.clone();
        ctrlc::set_handler(move || {
            shutdown.store(true, Ordering::Relaxed);
            info!("shutting down...");
        })?;
    }

    let args = cli::Args::parse();
    args.validate()?;

    info!(
        "Starting ohlcv: input={}, chunk_size={}, format={:?}",
        args.input_name(),
        args.chunk_size,
        args.format
    );

    let reader = input::open_input(&args)?;
    let stdout = io::stdout();
    let mut writer = output::BarWriter::new(stdout.lock(), args.format);
    let mut write_error = None;

    let result = {
        let stop = shutdown.clone();
        let parser = BarParser::new(|bar| {
            if write_error.is_some() {
                return;
            }
            if let Err(e) = writer.write_bar(&bar) {
                // stdout закрыт (например, `| head`): дальше читать незачем
                write_error = Some(e);
                stop.store(true, Ordering::Relaxed);
            }
        })
        .with_skip_handler(|e| warn!("skipped {e}"));

        ChunkFeeder::new(parser)
            .with_chunk_size(args.chunk_size)
            .with_cancel_flag(shutdown.clone())
            .read_from(reader)
    };

    if let Some(e) = write_error {
        return Err(e.into());
    }

    let stats = match result {
        Ok(stats) => stats,
        Err(ChunkError::Cancelled) => {
            writer.finish()?;
            bail!("interrupted");
        }
        Err(e) => return Err(e.into()),
    };

    let written = writer.finish()?;
    info!("done: {stats}, written={written}");

    if args.fail_on_skip && stats.skipped > 0 {
        bail!("{} line(s) skipped in {}", stats.skipped, args.input_name());
    }

    Ok(())
}
