//! Single source of truth for shared constants.

/// Default chunk width in blocks.
pub const CHUNK_SIZE_X: u16 = 16;

/// Default chunk height in blocks.
pub const CHUNK_SIZE_Y: u16 = 256;

/// Default chunk depth in blocks.
pub const CHUNK_SIZE_Z: u16 = 16;

/// Fixed per-array overhead added to every memory estimate (representation metadata).
pub const ARRAY_OVERHEAD_BYTES: usize = 16;

/// Default maximum number of distinct values a paletted array holds before
/// it is promoted to a dense array.
pub const DEFAULT_PALETTE_CEILING: u16 = 16;

/// Smallest palette ceiling that still allows a second value.
pub const MIN_PALETTE_CEILING: u16 = 2;

/// Largest palette ceiling. Palette length is stored as a single byte.
pub const MAX_PALETTE_CEILING: u16 = 255;
