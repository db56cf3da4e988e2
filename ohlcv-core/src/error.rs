use std::fmt;

use thiserror::Error;

use crate::types::Field;

/// Верхнеуровневый тип ошибок крейта
#[derive(Debug, Error)]
pub enum OhlcvCoreError {
    /// Ошибки нормализации даты
    #[error(transparent)]
    Date(#[from] DateError),

    /// Ошибки источника байтов
    #[error(transparent)]
    Chunk(#[from] ChunkError),
}

/// Ошибки нормализации даты `YYYY-MM-DD`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DateError {
    /// Строка не совпадает с шаблоном или дата не существует в календаре
    #[error("invalid date format: {0:?}")]
    InvalidFormat(String),

    /// Год раньше начала эпохи
    #[error("date before epoch: {0:?}")]
    BeforeEpoch(String),
}

impl DateError {
    /// Вид ошибки разбора, соответствующий этой ошибке даты
    pub fn kind(&self) -> ParseErrorKind {
        match self {
            DateError::InvalidFormat(_) => ParseErrorKind::InvalidDateFormat,
            DateError::BeforeEpoch(_) => ParseErrorKind::DateBeforeEpoch,
        }
    }
}

/// Ошибки адаптера чанков. Ошибки содержимого сюда не попадают:
/// они уходят в skip-callback, а поток продолжается.
#[derive(Debug, Error)]
pub enum ChunkError {
    /// Источник вернул ошибку чтения
    #[error("failed to read input: {0}")]
    Io(#[from] std::io::Error),

    /// Чтение прервано флагом отмены
    #[error("parsing cancelled")]
    Cancelled,
}

/// Вид отказа для одной строки
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParseErrorKind {
    /// Неверное число полей, строка из нулей или некорректный заголовок
    MalformedLineShape,
    /// Дата не в формате `YYYY-MM-DD` или не существует
    InvalidDateFormat,
    /// Дата раньше 1970-01-01
    DateBeforeEpoch,
    /// Числовое поле не разбирается
    InvalidFieldValue,
    /// Седьмое и последующие поля
    TooManyFields,
    /// Поток закончился посреди пропускаемой строки
    IncompleteLineAtEof,
}

impl ParseErrorKind {
    /// Стабильный код вида, например `invalid-field-value`
    pub fn code(self) -> &'static str {
        match self {
            ParseErrorKind::MalformedLineShape => "malformed-line-shape",
            ParseErrorKind::InvalidDateFormat => "invalid-date-format",
            ParseErrorKind::DateBeforeEpoch => "date-before-epoch",
            ParseErrorKind::InvalidFieldValue => "invalid-field-value",
            ParseErrorKind::TooManyFields => "too-many-fields",
            ParseErrorKind::IncompleteLineAtEof => "incomplete-line-at-eof",
        }
    }
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Уведомление о пропущенной строке.
///
/// Значение живёт только на время вызова skip-callback: парсер собирает его
/// в конце строки и сразу отдаёт вызывающему.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    kind: ParseErrorKind,
    line_number: u64,
    line: String,
    field: Option<Field>,
    reason: String,
}

impl ParseError {
    pub(crate) fn new(
        kind: ParseErrorKind,
        line_number: u64,
        line: impl Into<String>,
        field: Option<Field>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            line_number,
            line: line.into(),
            field,
            reason: reason.into(),
        }
    }

    /// Вид отказа
    pub fn kind(&self) -> ParseErrorKind {
        self.kind
    }

    /// Номер строки, начиная с 1
    pub fn line_number(&self) -> u64 {
        self.line_number
    }

    /// Исходный текст строки без перевода строки
    pub fn line(&self) -> &str {
        &self.line
    }

    /// Поле, на котором строка была отброшена (если отказ относится к полю)
    pub fn field(&self) -> Option<Field> {
        self.field
    }

    /// Человекочитаемая причина
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line_number, self.kind)?;
        if let Some(field) = self.field {
            write!(f, " [{field}]")?;
        }
        write!(f, ": {} ({:?})", self.reason, self.line)
    }
}

impl std::error::Error for ParseError {}
