//! # ohlcv-core
//!
//! Потоковый разбор OHLCV-файлов вида
//! `Date,Open,High,Low,Close,Volume` без буферизации всего входа.
//!
//! Этот крейт содержит:
//!
//! - [`parser`] — посимвольный автомат: заголовок, строки данных, пропуск битых строк
//! - [`chunk`] — адаптер байтовых чанков (UTF-8 с переносом через границу чанка)
//! - [`date`] — перевод `YYYY-MM-DD` в секунды от эпохи
//! - [`types`] — доменные типы (свеча, колонка)
//! - [`error`] — виды отказов и ошибки источника
//!
//! ## Быстрый пример: весь текст сразу
//!
//! ```rust
//! use ohlcv_core::parse_text;
//!
//! let bars = parse_text("Date,Open,High,Low,Close,Volume\n2023-01-01,100.50,102.75,99.25,101.80,1500000\n");
//! assert_eq!(bars.len(), 1);
//! assert_eq!(bars[0].timestamp, 1_672_531_200);
//! assert_eq!(bars[0].volume, 1_500_000);
//! ```
//!
//! ## Пример: куски с пропуском битых строк
//!
//! ```rust
//! use ohlcv_core::{BarParser, ParseErrorKind};
//!
//! let mut bars = Vec::new();
//! let mut skipped = Vec::new();
//! {
//!     let mut parser = BarParser::new(|bar| bars.push(bar))
//!         .with_skip_handler(|e| skipped.push((e.line_number(), e.kind())));
//!     parser.process_chunk("Date,Open,High,Low,Close,Volume\n2023-01-01,1,2,");
//!     parser.process_chunk("1,1.5,10\n2023-01-02,abc,1,1,1,1\n");
//!     parser.finalize();
//! }
//! assert_eq!(bars.len(), 1);
//! assert_eq!(skipped, vec![(3, ParseErrorKind::InvalidFieldValue)]);
//! ```
//!
//! ## Дизайн
//!
//! Парсер однопоточный и синхронный: единственная точка ожидания — чтение
//! следующего чанка в [`chunk::ChunkFeeder`]. Каждая сессия разбора владеет
//! своим [`BarParser`], общего изменяемого состояния нет.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Адаптер байтовых чанков.
pub mod chunk;

/// Нормализация дат.
pub mod date;

/// Ошибки `ohlcv-core`.
pub mod error;

/// Точки входа: весь текст, блокирующий и async-источник.
pub mod ingest;

/// Потоковый автомат разбора.
pub mod parser;

/// Доменные типы (свеча, колонка).
pub mod types;

/// Общие константы
mod constants;
pub use constants::{DEFAULT_CHUNK_SIZE, EPOCH_YEAR, FIELD_COUNT, FIELD_DELIMITER, HEADER_MARKER};

// --- Re-exports (публичный фасад API) ---

pub use crate::chunk::{ChunkFeeder, Utf8Decoder};
pub use crate::date::to_unix_seconds;
pub use crate::error::{ChunkError, DateError, OhlcvCoreError, ParseError, ParseErrorKind};
pub use crate::ingest::{
    ParseReport, parse_reader, parse_stream, parse_stream_with_skips, parse_text,
    parse_text_report,
};
pub use crate::parser::{BarParser, ParseStats};
pub use crate::types::{Bar, Field};
