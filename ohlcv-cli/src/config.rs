pub(crate) const CHUNK_SIZE: usize = ohlcv_core::DEFAULT_CHUNK_SIZE;

pub(crate) const MIN_CHUNK_SIZE: usize = 1;
pub(crate) const MAX_CHUNK_SIZE: usize = 16 * 1024 * 1024;
