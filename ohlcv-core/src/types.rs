use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::FIELD_COUNT;
use crate::date::to_unix_seconds;
use crate::error::ParseErrorKind;

/// Одна OHLCV-свеча
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    /// Секунды с 1970-01-01T00:00:00Z (полночь UTC даты из файла)
    pub timestamp: i64,
    /// Цена открытия
    pub open: f64,
    /// Максимум
    pub high: f64,
    /// Минимум
    pub low: f64,
    /// Цена закрытия
    pub close: f64,
    /// Объём
    pub volume: u64,
}

impl Bar {
    /// Все значения нулевые.
    ///
    /// Такие строки поставщики данных используют как заглушку для пропущенного
    /// дня, поэтому парсер их отбрасывает. Это эвристика, а не проверка
    /// корректности: настоящая свеча с нулями тоже будет отброшена.
    pub fn is_all_zero(&self) -> bool {
        self.open == 0.0
            && self.high == 0.0
            && self.low == 0.0
            && self.close == 0.0
            && self.volume == 0
    }
}

impl fmt::Display for Bar {
    /// Текстовый формат: TS|OPEN|HIGH|LOW|CLOSE|VOLUME
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}|{}|{}|{}|{}|{}",
            self.timestamp, self.open, self.high, self.low, self.close, self.volume
        )
    }
}

/// Колонка строки данных, в порядке следования в файле
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    /// Дата `YYYY-MM-DD`
    Timestamp,
    /// Открытие
    Open,
    /// Максимум
    High,
    /// Минимум
    Low,
    /// Закрытие
    Close,
    /// Объём
    Volume,
}

impl Field {
    /// Все колонки в порядке файла
    pub const ALL: [Field; FIELD_COUNT] = [
        Field::Timestamp,
        Field::Open,
        Field::High,
        Field::Low,
        Field::Close,
        Field::Volume,
    ];

    /// Колонка по позиции; `None` для седьмой и дальше
    pub fn from_index(index: usize) -> Option<Field> {
        Self::ALL.get(index).copied()
    }

    /// Имя колонки в нижнем регистре, например `open`
    pub fn name(self) -> &'static str {
        match self {
            Field::Timestamp => "timestamp",
            Field::Open => "open",
            Field::High => "high",
            Field::Low => "low",
            Field::Close => "close",
            Field::Volume => "volume",
        }
    }

    /// Вид ошибки, которым отмечается неразборчивое значение этой колонки
    pub(crate) fn invalid_kind(self) -> ParseErrorKind {
        match self {
            Field::Timestamp => ParseErrorKind::InvalidDateFormat,
            _ => ParseErrorKind::InvalidFieldValue,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Отказ конвертации одного значения
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct FieldError {
    pub(crate) kind: ParseErrorKind,
    pub(crate) reason: String,
}

/// Свеча, собираемая по одному полю. Принадлежит одному парсеру,
/// между сессиями не переиспользуется без `clear()`.
#[derive(Debug, Default, Clone)]
pub(crate) struct BarBuilder {
    timestamp: Option<i64>,
    open: Option<f64>,
    high: Option<f64>,
    low: Option<f64>,
    close: Option<f64>,
    volume: Option<u64>,
}

impl BarBuilder {
    /// Конвертирует уже обрезанный текст и кладёт значение в колонку
    pub(crate) fn set(&mut self, field: Field, text: &str) -> Result<(), FieldError> {
        match field {
            Field::Timestamp => {
                let ts = to_unix_seconds(text).map_err(|e| FieldError {
                    kind: e.kind(),
                    reason: e.to_string(),
                })?;
                self.timestamp = Some(ts);
            }
            Field::Open => self.open = Some(parse_real(field, text)?),
            Field::High => self.high = Some(parse_real(field, text)?),
            Field::Low => self.low = Some(parse_real(field, text)?),
            Field::Close => self.close = Some(parse_real(field, text)?),
            Field::Volume => {
                let volume = text.parse::<u64>().map_err(|_| FieldError {
                    kind: field.invalid_kind(),
                    reason: format!("{text:?} is not a non-negative integer"),
                })?;
                self.volume = Some(volume);
            }
        }
        Ok(())
    }

    /// Готовая свеча, если заполнены все шесть колонок
    pub(crate) fn build(&self) -> Option<Bar> {
        Some(Bar {
            timestamp: self.timestamp?,
            open: self.open?,
            high: self.high?,
            low: self.low?,
            close: self.close?,
            volume: self.volume?,
        })
    }

    pub(crate) fn clear(&mut self) {
        *self = Self::default();
    }
}

fn parse_real(field: Field, text: &str) -> Result<f64, FieldError> {
    match text.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(FieldError {
            kind: field.invalid_kind(),
            reason: format!("{text:?} is not a number"),
        }),
    }
}
