//! Row encoding for cache storage.

use crate::db::Row;
use crate::error::CacheError;

pub fn encode_row(row: &Row) -> Result<Vec<u8>, CacheError> {
    serde_json::to_vec(row).map_err(CacheError::Encoding)
}

pub fn decode_row(bytes: &[u8]) -> Result<Row, CacheError> {
    serde_json::from_slice(bytes).map_err(CacheError::Decoding)
}
