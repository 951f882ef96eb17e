use thiserror::Error;

use crate::types::ChunkDims;

/// Errors returned by array construction and access.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TeraError {
    #[error("coordinate ({x}, {y}, {z}) is outside an array of size {dims}")]
    OutOfBounds { x: u32, y: u32, z: u32, dims: ChunkDims },

    #[error("value {value} does not fit in {bits} bits")]
    ValueOutOfRange { value: u8, bits: u8 },

    #[error("invalid array dimensions {x}x{y}x{z} (every side must be at least 1)")]
    InvalidDimensions { x: u16, y: u16, z: u16 },

    #[error("unsupported bit width {0} (expected 1, 2, 4 or 8)")]
    UnsupportedBitWidth(u8),

    #[error("buffer length mismatch: expected {expected} bytes, got {actual}")]
    BufferLength { expected: usize, actual: usize },

    #[error("malformed payload: {0}")]
    Format(#[from] FormatError),
}

/// Reasons a serialized array payload is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("truncated payload: expected at least {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    #[error("trailing bytes: expected {expected} bytes, got {actual}")]
    TrailingBytes { expected: usize, actual: usize },

    #[error("unknown representation tag {0}")]
    UnknownTag(u8),

    #[error("unsupported bit width {0}")]
    UnsupportedBitWidth(u8),

    #[error("invalid dimensions {x}x{y}x{z}")]
    InvalidDimensions { x: u16, y: u16, z: u16 },

    #[error("value {value} does not fit in {bits} bits")]
    ValueOutOfRange { value: u8, bits: u8 },

    #[error("paletted payload has an empty palette")]
    EmptyPalette,

    #[error("palette contains {0} more than once")]
    DuplicatePaletteEntry(u8),

    #[error("{bits}-bit index cannot address a palette of {palette_len} entries")]
    IndexWidthTooNarrow { palette_len: usize, bits: u8 },

    #[error("palette index {index} out of range for palette of {palette_len} entries")]
    PaletteIndexOutOfRange { index: u8, palette_len: usize },

    #[error("LZ4 decompression failed: {0}")]
    Decompress(String),
}
