use tera_core::FormatError;

/// Compress a serialized array payload using LZ4 with a prepended size.
pub fn compress_payload(payload: &[u8]) -> Vec<u8> {
    lz4_flex::compress_prepend_size(payload)
}

/// Decompress a payload produced by [`compress_payload`].
pub fn decompress_payload(compressed: &[u8]) -> Result<Vec<u8>, FormatError> {
    lz4_flex::decompress_size_prepended(compressed)
        .map_err(|e| FormatError::Decompress(e.to_string()))
}
