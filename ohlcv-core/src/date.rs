use time::{Date, Month};

use crate::constants::EPOCH_YEAR;
use crate::error::DateError;

/// Переводит дату `YYYY-MM-DD` в секунды от начала эпохи (полночь UTC).
///
/// Порядок проверок: шаблон, год не раньше 1970, диапазоны месяца и дня,
/// затем дата собирается заново и должна совпасть с исходной
/// (так отсекается, например, `2023-02-30`).
pub fn to_unix_seconds(input: &str) -> Result<i64, DateError> {
    let invalid = || DateError::InvalidFormat(input.to_string());

    let bytes = input.as_bytes();
    if !matches_pattern(bytes) {
        return Err(invalid());
    }

    let year = digits(&bytes[0..4]) as i32;
    let month = digits(&bytes[5..7]) as u8;
    let day = digits(&bytes[8..10]) as u8;

    if year < EPOCH_YEAR {
        return Err(DateError::BeforeEpoch(input.to_string()));
    }
    if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
        return Err(invalid());
    }

    let month = Month::try_from(month).map_err(|_| invalid())?;
    let date = Date::from_calendar_date(year, month, day).map_err(|_| invalid())?;
    if date.year() != year || date.month() != month || date.day() != day {
        return Err(invalid());
    }

    Ok(date.midnight().assume_utc().unix_timestamp())
}

// DDDD-DD-DD, только ASCII-цифры
fn matches_pattern(bytes: &[u8]) -> bool {
    bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        })
}

fn digits(bytes: &[u8]) -> u32 {
    bytes
        .iter()
        .fold(0, |acc, b| acc * 10 + u32::from(b - b'0'))
}
