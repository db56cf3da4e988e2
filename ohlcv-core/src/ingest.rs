use std::io::Read;

use tokio::io::AsyncRead;

use crate::chunk::ChunkFeeder;
use crate::error::{ChunkError, ParseError};
use crate::parser::{BarParser, ParseStats};
use crate::types::Bar;

/// Результат разбора целого текста
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParseReport {
    /// Валидные свечи, в порядке строк
    pub bars: Vec<Bar>,
    /// Уведомления о пропущенных строках, в порядке строк
    pub errors: Vec<ParseError>,
    /// Итоговые счётчики
    pub stats: ParseStats,
}

/// Разбирает весь текст сразу, возвращает только валидные свечи
pub fn parse_text(text: &str) -> Vec<Bar> {
    let mut bars = Vec::new();
    {
        let mut parser = BarParser::new(|bar| bars.push(bar));
        parser.process_chunk(text);
        parser.finalize();
    }
    bars
}

/// Как [`parse_text`], но вместе с пропущенными строками
pub fn parse_text_report(text: &str) -> ParseReport {
    let mut bars = Vec::new();
    let mut errors = Vec::new();
    let stats = {
        let mut parser = BarParser::new(|bar| bars.push(bar))
            .with_skip_handler(|e: &ParseError| errors.push(e.clone()));
        parser.process_chunk(text);
        parser.finalize()
    };
    ParseReport {
        bars,
        errors,
        stats,
    }
}

/// Потоковый разбор async-источника. Возвращает число выданных свечей.
pub async fn parse_stream<R>(reader: R, on_row: impl FnMut(Bar)) -> Result<u64, ChunkError>
where
    R: AsyncRead + Unpin,
{
    let stats = ChunkFeeder::new(BarParser::new(on_row))
        .read_from_async(reader)
        .await?;
    Ok(stats.rows)
}

/// Потоковый разбор async-источника с уведомлениями о пропущенных строках
pub async fn parse_stream_with_skips<R>(
    reader: R,
    on_row: impl FnMut(Bar),
    on_skip: impl FnMut(&ParseError),
) -> Result<u64, ChunkError>
where
    R: AsyncRead + Unpin,
{
    let parser = BarParser::new(on_row).with_skip_handler(on_skip);
    let stats = ChunkFeeder::new(parser).read_from_async(reader).await?;
    Ok(stats.rows)
}

/// Потоковый разбор блокирующего источника (файл, stdin)
pub fn parse_reader<R: Read>(
    reader: R,
    on_row: impl FnMut(Bar),
    on_skip: impl FnMut(&ParseError),
) -> Result<ParseStats, ChunkError> {
    let parser = BarParser::new(on_row).with_skip_handler(on_skip);
    ChunkFeeder::new(parser).read_from(reader)
}
