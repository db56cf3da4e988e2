use std::io::{self, Write};

use ohlcv_core::Bar;
use thiserror::Error;

use crate::cli::OutputFormat;

#[derive(Debug, Error)]
pub(crate) enum OutputError {
    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),

    #[error("failed to encode bar as json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Пишет свечи по одной на строку
pub(crate) struct BarWriter<W: Write> {
    writer: W,
    format: OutputFormat,
    written: u64,
}

impl<W: Write> BarWriter<W> {
    pub(crate) fn new(writer: W, format: OutputFormat) -> Self {
        Self {
            writer,
            format,
            written: 0,
        }
    }

    pub(crate) fn write_bar(&mut self, bar: &Bar) -> Result<(), OutputError> {
        match self.format {
            OutputFormat::Text => writeln!(self.writer, "{bar}")?,
            OutputFormat::Json => {
                serde_json::to_writer(&mut self.writer, bar)?;
                self.writer.write_all(b"\n")?;
            }
        }
        self.written += 1;
        Ok(())
    }

    pub(crate) fn finish(mut self) -> Result<u64, OutputError> {
        self.writer.flush()?;
        Ok(self.written)
    }
}
