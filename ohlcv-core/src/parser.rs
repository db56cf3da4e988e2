//! Посимвольный потоковый парсер OHLCV.
//!
//! Текст подаётся кусками произвольной длины через [`BarParser::process_chunk`];
//! граница куска может приходиться на середину поля или строки. После
//! последнего куска вызывается [`BarParser::finalize`], чтобы дочитать строку
//! без завершающего `\n`.
//!
//! Ошибка в строке никогда не прерывает разбор: строка пропускается целиком,
//! о ней сообщается через skip-callback в момент, когда строка закончилась
//! (так в уведомление попадает весь её текст).

use std::fmt;

use log::{debug, trace};

use crate::constants::{FIELD_COUNT, FIELD_DELIMITER, HEADER_MARKER};
use crate::error::{ParseError, ParseErrorKind};
use crate::types::{Bar, BarBuilder, Field, FieldError};

type RowCallback<'a> = Box<dyn FnMut(Bar) + 'a>;
type SkipCallback<'a> = Box<dyn FnMut(&ParseError) + 'a>;

/// Состояние автомата
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    AwaitingHeaderStart,
    InHeaderField,
    AwaitingDataRowStart,
    InDataField,
    SkippingErroredLine,
}

/// Счётчики одной сессии разбора
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseStats {
    /// Выданные свечи
    pub rows: u64,
    /// Пропущенные строки
    pub skipped: u64,
}

impl fmt::Display for ParseStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rows={} skipped={}", self.rows, self.skipped)
    }
}

/// Первый отказ в текущей строке; отдаётся наружу, когда строка закончится
#[derive(Debug)]
struct PendingError {
    kind: ParseErrorKind,
    field: Option<Field>,
    reason: String,
}

/// Потоковый парсер. Одна сессия разбора = один экземпляр.
pub struct BarParser<'a> {
    state: State,
    /// Текст текущего поля
    field: String,
    /// Сырой текст текущей строки, для уведомлений
    line: String,
    line_number: u64,
    /// Сколько полей строки уже закрыто
    field_index: usize,
    builder: BarBuilder,
    /// В строке встретилось хотя бы одно непустое поле
    has_value: bool,
    /// Позиция первого пустого поля, пока непустых не было
    leading_empty: Option<usize>,
    /// Строка начиналась как заголовок без колонки даты
    header_recovered: bool,
    pending: Option<PendingError>,
    stats: ParseStats,
    on_row: RowCallback<'a>,
    on_skip: Option<SkipCallback<'a>>,
}

impl<'a> BarParser<'a> {
    /// Парсер в начале сессии; `on_row` вызывается для каждой валидной свечи
    pub fn new(on_row: impl FnMut(Bar) + 'a) -> Self {
        Self {
            state: State::AwaitingHeaderStart,
            field: String::new(),
            line: String::new(),
            line_number: 1,
            field_index: 0,
            builder: BarBuilder::default(),
            has_value: false,
            leading_empty: None,
            header_recovered: false,
            pending: None,
            stats: ParseStats::default(),
            on_row: Box::new(on_row),
            on_skip: None,
        }
    }

    /// Подписка на уведомления о пропущенных строках
    pub fn with_skip_handler(mut self, on_skip: impl FnMut(&ParseError) + 'a) -> Self {
        self.on_skip = Some(Box::new(on_skip));
        self
    }

    /// Счётчики на текущий момент
    pub fn stats(&self) -> ParseStats {
        self.stats
    }

    /// Номер строки, которую парсер читает сейчас (с 1)
    pub fn line_number(&self) -> u64 {
        self.line_number
    }

    /// Возвращает парсер в начальное состояние для новой сессии.
    /// Callbacks сохраняются, счётчики обнуляются.
    pub fn reset(&mut self) {
        self.reset_row(State::AwaitingHeaderStart);
        self.line_number = 1;
        self.stats = ParseStats::default();
    }

    /// Обрабатывает очередной кусок текста
    pub fn process_chunk(&mut self, chunk: &str) {
        trace!("processing chunk of {} bytes", chunk.len());
        for c in chunk.chars() {
            self.process_char(c);
        }
    }

    /// Завершает поток: дочитывает последнюю строку так, как будто после неё
    /// стоял `\n`. Если поток оборвался посреди пропускаемой строки,
    /// сообщает `incomplete-line-at-eof`.
    pub fn finalize(&mut self) -> ParseStats {
        match self.state {
            State::InHeaderField | State::InDataField => {
                debug!("line {} has no trailing newline; flushing", self.line_number);
                self.end_field();
                self.end_row();
            }
            State::SkippingErroredLine => {
                if let Some(pending) = self.pending.take() {
                    let reason = format!("input ended inside a skipped line: {}", pending.reason);
                    self.report(PendingError {
                        kind: ParseErrorKind::IncompleteLineAtEof,
                        field: pending.field,
                        reason,
                    });
                }
                self.reset_row(State::AwaitingDataRowStart);
            }
            State::AwaitingHeaderStart | State::AwaitingDataRowStart => {}
        }
        self.stats
    }

    fn process_char(&mut self, c: char) {
        match self.state {
            State::AwaitingHeaderStart | State::AwaitingDataRowStart => match c {
                '\n' => self.line_number += 1,
                '\r' => {}
                _ => {
                    self.state = if self.state == State::AwaitingHeaderStart {
                        State::InHeaderField
                    } else {
                        State::InDataField
                    };
                    // символ начинает поле, разделитель тоже разбирается уже в поле
                    self.process_char(c);
                }
            },
            State::InHeaderField | State::InDataField => match c {
                FIELD_DELIMITER => {
                    self.line.push(c);
                    self.end_field();
                }
                '\n' => {
                    self.end_field();
                    self.end_row();
                    self.line_number += 1;
                }
                '\r' => {}
                _ => {
                    self.line.push(c);
                    self.field.push(c);
                }
            },
            State::SkippingErroredLine => match c {
                '\n' => {
                    self.end_row();
                    self.line_number += 1;
                }
                '\r' => {}
                _ => self.line.push(c),
            },
        }
    }

    fn end_field(&mut self) {
        let raw = std::mem::take(&mut self.field);
        let text = raw.trim();

        match self.state {
            State::SkippingErroredLine => self.field_index += 1,
            State::InHeaderField => {
                if self.field_index == 0 && !text.to_lowercase().contains(HEADER_MARKER) {
                    debug!(
                        "line {}: first column {:?} is not a date header; reading line as data",
                        self.line_number, text
                    );
                    self.header_recovered = true;
                    self.state = State::InDataField;
                    self.accept_data_field(text);
                } else {
                    self.field_index += 1;
                }
            }
            State::InDataField => self.accept_data_field(text),
            State::AwaitingHeaderStart | State::AwaitingDataRowStart => {}
        }

        // буфер возвращается на место, чтобы не терять ёмкость
        self.field = raw;
        self.field.clear();
    }

    fn accept_data_field(&mut self, text: &str) {
        let index = self.field_index;
        self.field_index += 1;

        if text.is_empty() && !self.has_value {
            // пока неизвестно: пустая строка из запятых или пропущенное значение
            self.leading_empty.get_or_insert(index);
            return;
        }

        if let Some(first_empty) = self.leading_empty.take() {
            self.fail(rejected_field(first_empty));
            return;
        }

        self.has_value = true;
        let Some(field) = Field::from_index(index) else {
            self.fail(rejected_field(index));
            return;
        };

        match self.builder.set(field, text) {
            Ok(()) if field == Field::Timestamp => {
                // первая колонка оказалась датой: это строка данных, а не заголовок
                self.header_recovered = false;
            }
            Ok(()) => {}
            Err(FieldError { kind, reason }) => self.fail(PendingError {
                kind,
                field: Some(field),
                reason,
            }),
        }
    }

    fn end_row(&mut self) {
        match self.state {
            State::SkippingErroredLine => {
                if let Some(pending) = self.pending.take() {
                    self.report(pending);
                }
            }
            State::InHeaderField => {
                debug!("line {}: header row", self.line_number);
            }
            State::InDataField => {
                if !self.has_value {
                    if self.header_recovered {
                        // заголовка ещё не было
                        self.reset_row(State::AwaitingHeaderStart);
                        return;
                    }
                } else if self.field_index != FIELD_COUNT {
                    let reason = format!(
                        "expected {FIELD_COUNT} fields, found {}",
                        self.field_index
                    );
                    self.report(PendingError {
                        kind: ParseErrorKind::MalformedLineShape,
                        field: None,
                        reason,
                    });
                } else {
                    match self.builder.build() {
                        Some(bar) if bar.is_all_zero() => self.report(PendingError {
                            kind: ParseErrorKind::MalformedLineShape,
                            field: None,
                            reason: "all-zero values".to_string(),
                        }),
                        Some(bar) => {
                            self.stats.rows += 1;
                            (self.on_row)(bar);
                        }
                        None => self.report(PendingError {
                            kind: ParseErrorKind::MalformedLineShape,
                            field: None,
                            reason: "incomplete record".to_string(),
                        }),
                    }
                }
            }
            State::AwaitingHeaderStart | State::AwaitingDataRowStart => return,
        }
        self.reset_row(State::AwaitingDataRowStart);
    }

    fn fail(&mut self, error: PendingError) {
        self.pending = Some(error);
        self.state = State::SkippingErroredLine;
    }

    fn report(&mut self, pending: PendingError) {
        // у конца потока свой вид, заголовок лишь уточняет причину
        let pending = if self.header_recovered
            && pending.kind != ParseErrorKind::IncompleteLineAtEof
        {
            PendingError {
                kind: ParseErrorKind::MalformedLineShape,
                field: Some(Field::Timestamp),
                reason: format!(
                    "header row has no {HEADER_MARKER:?} column and does not parse as data: {}",
                    pending.reason
                ),
            }
        } else {
            pending
        };

        self.stats.skipped += 1;
        let error = ParseError::new(
            pending.kind,
            self.line_number,
            self.line.as_str(),
            pending.field,
            pending.reason,
        );
        debug!("skipping {error}");
        if let Some(on_skip) = self.on_skip.as_mut() {
            on_skip(&error);
        }
    }

    fn reset_row(&mut self, next: State) {
        self.state = next;
        self.field.clear();
        self.line.clear();
        self.field_index = 0;
        self.builder.clear();
        self.has_value = false;
        self.leading_empty = None;
        self.header_recovered = false;
        self.pending = None;
    }
}

impl fmt::Debug for BarParser<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BarParser")
            .field("state", &self.state)
            .field("line_number", &self.line_number)
            .field("field_index", &self.field_index)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

// Пустое значение в колонке `index` либо лишняя колонка
fn rejected_field(index: usize) -> PendingError {
    match Field::from_index(index) {
        Some(field) => PendingError {
            kind: field.invalid_kind(),
            field: Some(field),
            reason: "empty value".to_string(),
        },
        None => PendingError {
            kind: ParseErrorKind::TooManyFields,
            field: None,
            reason: format!("more than {FIELD_COUNT} fields"),
        },
    }
}
