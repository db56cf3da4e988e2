//! Адаптер байтовых чанков.
//!
//! Декодирует UTF-8 с переносом незаконченного символа в следующий чанк,
//! подаёт текст в [`BarParser`] и по концу источника вызывает `finalize()`.
//! Источник принимается по значению: он закрывается при любом выходе
//! (успех, ошибка чтения, отмена, drop future).

use std::io::{self, Read};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, trace};
use tokio::io::AsyncRead;

use crate::constants::DEFAULT_CHUNK_SIZE;
use crate::error::ChunkError;
use crate::parser::{BarParser, ParseStats};

/// Потоковый декодер UTF-8.
///
/// Незаконченная последовательность в конце чанка ждёт продолжения,
/// битые байты заменяются на U+FFFD.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    carry: Vec<u8>,
}

impl Utf8Decoder {
    /// Декодер без перенесённых байтов
    pub fn new() -> Self {
        Self::default()
    }

    /// Декодирует `input` и дописывает текст в `out`
    pub fn decode(&mut self, input: &[u8], out: &mut String) {
        let joined;
        let mut bytes = if self.carry.is_empty() {
            input
        } else {
            self.carry.extend_from_slice(input);
            joined = std::mem::take(&mut self.carry);
            joined.as_slice()
        };

        loop {
            match std::str::from_utf8(bytes) {
                Ok(text) => {
                    out.push_str(text);
                    return;
                }
                Err(e) => {
                    let (valid, rest) = bytes.split_at(e.valid_up_to());
                    if let Ok(text) = std::str::from_utf8(valid) {
                        out.push_str(text);
                    }
                    match e.error_len() {
                        Some(bad) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            bytes = &rest[bad..];
                        }
                        None => {
                            // символ продолжится в следующем чанке
                            self.carry.extend_from_slice(rest);
                            return;
                        }
                    }
                }
            }
        }
    }

    /// Конец потока: оборванный символ превращается в U+FFFD
    pub fn finish(&mut self, out: &mut String) {
        if !self.carry.is_empty() {
            self.carry.clear();
            out.push(char::REPLACEMENT_CHARACTER);
        }
    }

    /// Байты, ожидающие продолжения символа
    pub fn pending(&self) -> usize {
        self.carry.len()
    }
}

/// Связка декодера и парсера для одной сессии разбора
#[derive(Debug)]
pub struct ChunkFeeder<'a> {
    parser: BarParser<'a>,
    decoder: Utf8Decoder,
    text: String,
    chunk_size: usize,
    cancel: Option<Arc<AtomicBool>>,
}

impl<'a> ChunkFeeder<'a> {
    /// Адаптер с чанком по умолчанию и без флага отмены
    pub fn new(parser: BarParser<'a>) -> Self {
        Self {
            parser,
            decoder: Utf8Decoder::new(),
            text: String::new(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            cancel: None,
        }
    }

    /// Размер буфера чтения (минимум 1 байт)
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Флаг отмены; проверяется перед каждым чтением
    pub fn with_cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Подаёт очередной чанк байтов
    pub fn push_bytes(&mut self, bytes: &[u8]) {
        trace!("received chunk of {} bytes", bytes.len());
        self.decoder.decode(bytes, &mut self.text);
        self.parser.process_chunk(&self.text);
        self.text.clear();
    }

    /// Конец источника: остаток декодера и `finalize()` парсера
    pub fn finish(mut self) -> ParseStats {
        self.decoder.finish(&mut self.text);
        self.parser.process_chunk(&self.text);
        let stats = self.parser.finalize();
        debug!("input exhausted: {stats}");
        stats
    }

    /// Читает блокирующий источник до конца
    pub fn read_from<R: Read>(mut self, mut reader: R) -> Result<ParseStats, ChunkError> {
        let mut buf = vec![0u8; self.chunk_size];
        loop {
            self.check_cancelled()?;
            let n = match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            self.push_bytes(&buf[..n]);
        }
        Ok(self.finish())
    }

    /// Читает async-источник до конца
    pub async fn read_from_async<R>(mut self, mut reader: R) -> Result<ParseStats, ChunkError>
    where
        R: AsyncRead + Unpin,
    {
        use tokio::io::AsyncReadExt;

        let mut buf = vec![0u8; self.chunk_size];
        loop {
            self.check_cancelled()?;
            let n = reader.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            self.push_bytes(&buf[..n]);
        }
        Ok(self.finish())
    }

    fn check_cancelled(&self) -> Result<(), ChunkError> {
        match &self.cancel {
            Some(flag) if flag.load(Ordering::Relaxed) => {
                debug!("cancelled at line {}", self.parser.line_number());
                Err(ChunkError::Cancelled)
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    use tokio::io::ReadBuf;

    use crate::types::Bar;

    const INPUT: &str = "Date,Open,High,Low,Close,Volume\n\
2023-01-01,100.50,102.75,99.25,101.80,1500000\n\
2023-01-02,bad,1,1,1,1\n\
2023-01-03,1,2,1,1.5,10";

    fn decode_all(chunks: &[&[u8]]) -> String {
        let mut decoder = Utf8Decoder::new();
        let mut out = String::new();
        for chunk in chunks {
            decoder.decode(chunk, &mut out);
        }
        decoder.finish(&mut out);
        out
    }

    #[test]
    fn decoder_carries_split_multibyte_char() {
        let text = "цена,€,𝄞";
        let bytes = text.as_bytes();
        for split in 0..=bytes.len() {
            let (a, b) = bytes.split_at(split);
            assert_eq!(decode_all(&[a, b]), text, "split at {split}");
        }
    }

    #[test]
    fn decoder_byte_by_byte() {
        let text = "Дата,€\n";
        let chunks: Vec<&[u8]> = text.as_bytes().chunks(1).collect();
        assert_eq!(decode_all(&chunks), text);
    }

    #[test]
    fn decoder_replaces_invalid_bytes_and_truncated_tail() {
        assert_eq!(decode_all(&[&b"a\xffb"[..]]), "a\u{FFFD}b");
        assert_eq!(decode_all(&[&b"a\xe2\x82"[..]]), "a\u{FFFD}");

        let mut decoder = Utf8Decoder::new();
        let mut out = String::new();
        decoder.decode(b"x\xe2\x82", &mut out);
        assert_eq!(out, "x");
        assert_eq!(decoder.pending(), 2);
    }

    fn feed_sync(chunk_size: usize) -> (Vec<Bar>, usize, ParseStats) {
        let mut bars = Vec::new();
        let mut skipped = 0;
        let stats = {
            let parser = BarParser::new(|b| bars.push(b)).with_skip_handler(|_| skipped += 1);
            ChunkFeeder::new(parser)
                .with_chunk_size(chunk_size)
                .read_from(Cursor::new(INPUT.as_bytes()))
                .unwrap()
        };
        (bars, skipped, stats)
    }

    #[test]
    fn sync_reader_result_does_not_depend_on_chunk_size() {
        let (expected, skipped, stats) = feed_sync(DEFAULT_CHUNK_SIZE);
        assert_eq!(expected.len(), 2);
        assert_eq!(skipped, 1);
        assert_eq!(stats, ParseStats { rows: 2, skipped: 1 });

        for size in [1, 2, 3, 5, 13, 64] {
            let (bars, skipped, _) = feed_sync(size);
            assert_eq!(bars, expected, "chunk size {size}");
            assert_eq!(skipped, 1, "chunk size {size}");
        }
    }

    #[test]
    fn push_bytes_splits_inside_utf8_header() {
        let input = "Дата,Откр,Макс,Мин,Закр,Объём\n2023-01-01,1,2,1,1,10\n";
        let mut bars = Vec::new();
        let mut errors = Vec::new();
        {
            let parser = BarParser::new(|b| bars.push(b))
                .with_skip_handler(|e: &crate::ParseError| errors.push(e.clone()));
            let mut feeder = ChunkFeeder::new(parser);
            for chunk in input.as_bytes().chunks(3) {
                feeder.push_bytes(chunk);
            }
            feeder.finish();
        }
        // "Дата" не содержит "date": строка уходит в данные и отбрасывается
        assert_eq!(bars.len(), 1);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].line(), "Дата,Откр,Макс,Мин,Закр,Объём");
    }

    /// Читатель, который отдаёт данные, затем ошибку, и отмечает своё закрытие
    struct FlakyReader {
        data: Cursor<Vec<u8>>,
        fail_after: usize,
        read_total: usize,
        dropped: Arc<AtomicBool>,
    }

    impl FlakyReader {
        fn new(data: &str, fail_after: usize, dropped: Arc<AtomicBool>) -> Self {
            Self {
                data: Cursor::new(data.as_bytes().to_vec()),
                fail_after,
                read_total: 0,
                dropped,
            }
        }
    }

    impl Drop for FlakyReader {
        fn drop(&mut self) {
            self.dropped.store(true, Ordering::SeqCst);
        }
    }

    impl Read for FlakyReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.read_total >= self.fail_after {
                return Err(io::Error::other("boom"));
            }
            let to_read = buf.len().min(self.fail_after - self.read_total);
            let n = Read::read(&mut self.data, &mut buf[..to_read])?;
            self.read_total += n;
            Ok(n)
        }
    }

    impl AsyncRead for FlakyReader {
        fn poll_read(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            let this = self.get_mut();
            let n = Read::read(this, buf.initialize_unfilled())?;
            buf.advance(n);
            Poll::Ready(Ok(()))
        }
    }

    #[test]
    fn read_error_is_returned_and_reader_released() {
        let dropped = Arc::new(AtomicBool::new(false));
        let reader = FlakyReader::new(INPUT, 40, dropped.clone());

        let err = ChunkFeeder::new(BarParser::new(|_| {}))
            .with_chunk_size(16)
            .read_from(reader)
            .unwrap_err();

        assert!(matches!(err, ChunkError::Io(ref e) if e.to_string() == "boom"));
        assert!(dropped.load(Ordering::SeqCst));
    }

    #[test]
    fn cancel_flag_stops_reading() {
        let dropped = Arc::new(AtomicBool::new(false));
        let reader = FlakyReader::new(INPUT, usize::MAX, dropped.clone());
        let cancel = Arc::new(AtomicBool::new(true));

        let err = ChunkFeeder::new(BarParser::new(|_| {}))
            .with_cancel_flag(cancel)
            .read_from(reader)
            .unwrap_err();

        assert!(matches!(err, ChunkError::Cancelled));
        assert!(dropped.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn async_reader_matches_sync_result() {
        let (expected, _, _) = feed_sync(DEFAULT_CHUNK_SIZE);

        for size in [1, 4, 7, 1024] {
            let mut bars = Vec::new();
            let stats = ChunkFeeder::new(BarParser::new(|b| bars.push(b)))
                .with_chunk_size(size)
                .read_from_async(INPUT.as_bytes())
                .await
                .unwrap();
            assert_eq!(stats.rows, 2);
            assert_eq!(bars, expected, "chunk size {size}");
        }
    }

    #[tokio::test]
    async fn async_read_error_releases_reader() {
        let dropped = Arc::new(AtomicBool::new(false));
        let reader = FlakyReader::new(INPUT, 10, dropped.clone());

        let result = ChunkFeeder::new(BarParser::new(|_| {}))
            .with_chunk_size(4)
            .read_from_async(reader)
            .await;

        assert!(matches!(result, Err(ChunkError::Io(_))));
        assert!(dropped.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn dropping_the_future_releases_reader() {
        let dropped = Arc::new(AtomicBool::new(false));
        let (_tx, rx) = tokio::io::duplex(64);
        let guard = DropFlag(dropped.clone(), rx);

        {
            let fut = ChunkFeeder::new(BarParser::new(|_| {})).read_from_async(guard);
            // источник молчит: future никогда не завершится сам
            let res = tokio::time::timeout(std::time::Duration::from_millis(20), fut).await;
            assert!(res.is_err());
        }
        assert!(dropped.load(Ordering::SeqCst));
    }

    struct DropFlag(Arc<AtomicBool>, tokio::io::DuplexStream);

    impl Drop for DropFlag {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    impl AsyncRead for DropFlag {
        fn poll_read(
            self: Pin<&mut Self>,
            cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            Pin::new(&mut self.get_mut().1).poll_read(cx, buf)
        }
    }
}
