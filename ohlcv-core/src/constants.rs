/// Количество полей в строке данных: timestamp, open, high, low, close, volume
pub const FIELD_COUNT: usize = 6;

/// Год начала эпохи; даты раньше него не принимаются
pub const EPOCH_YEAR: i32 = 1970;

/// Разделитель полей
pub const FIELD_DELIMITER: char = ',';

/// Подстрока, по которой первая колонка опознаётся как заголовок (без учёта регистра)
pub const HEADER_MARKER: &str = "date";

/// Размер буфера чтения в адаптере чанков
pub const DEFAULT_CHUNK_SIZE: usize = 8 * 1024;
