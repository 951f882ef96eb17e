use std::fmt;

use glam::UVec3;
use serde::{Deserialize, Serialize};

use crate::constants::{CHUNK_SIZE_X, CHUNK_SIZE_Y, CHUNK_SIZE_Z};
use crate::error::TeraError;

/// Fixed extent of one voxel array, in cells per axis.
///
/// Cells are laid out y-layer by y-layer: the linear index of `(x, y, z)` is
/// `(y * size_z + z) * size_x + x`, so each horizontal layer is one contiguous
/// run of `size_x * size_z` elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "[u16; 3]", into = "[u16; 3]")]
pub struct ChunkDims {
    x: u16,
    y: u16,
    z: u16,
}

impl ChunkDims {
    /// Standard chunk extent (16 x 256 x 16).
    pub const CHUNK: ChunkDims = ChunkDims {
        x: CHUNK_SIZE_X,
        y: CHUNK_SIZE_Y,
        z: CHUNK_SIZE_Z,
    };

    /// Create dimensions. Every side must be non-zero.
    pub fn new(x: u16, y: u16, z: u16) -> Result<Self, TeraError> {
        if x == 0 || y == 0 || z == 0 {
            return Err(TeraError::InvalidDimensions { x, y, z });
        }
        Ok(Self { x, y, z })
    }

    pub fn size_x(&self) -> u16 {
        self.x
    }

    pub fn size_y(&self) -> u16 {
        self.y
    }

    pub fn size_z(&self) -> u16 {
        self.z
    }

    /// Number of cells in one horizontal layer.
    pub fn size_xz(&self) -> usize {
        self.x as usize * self.z as usize
    }

    /// Total number of cells.
    pub fn volume(&self) -> usize {
        self.size_xz() * self.y as usize
    }

    /// Whether the coordinate lies inside the array.
    #[inline]
    pub fn contains(&self, x: u32, y: u32, z: u32) -> bool {
        x < self.x as u32 && y < self.y as u32 && z < self.z as u32
    }

    /// Linear cell index of `(x, y, z)`, or None if out of range.
    #[inline]
    pub fn index_of(&self, x: u32, y: u32, z: u32) -> Option<usize> {
        if !self.contains(x, y, z) {
            return None;
        }
        Some((y as usize * self.z as usize + z as usize) * self.x as usize + x as usize)
    }

    /// Linear cell index, or an `OutOfBounds` error naming the coordinate.
    #[inline]
    pub fn checked_index(&self, x: u32, y: u32, z: u32) -> Result<usize, TeraError> {
        self.index_of(x, y, z).ok_or(TeraError::OutOfBounds {
            x,
            y,
            z,
            dims: *self,
        })
    }

    /// Inverse of [`ChunkDims::index_of`]. `index` must be below `volume()`.
    pub fn coords_of(&self, index: usize) -> (u32, u32, u32) {
        let sx = self.x as usize;
        let sz = self.z as usize;
        let x = index % sx;
        let z = (index / sx) % sz;
        let y = index / (sx * sz);
        (x as u32, y as u32, z as u32)
    }

    pub fn as_uvec3(&self) -> UVec3 {
        UVec3::new(self.x as u32, self.y as u32, self.z as u32)
    }
}

impl Default for ChunkDims {
    fn default() -> Self {
        Self::CHUNK
    }
}

impl fmt::Display for ChunkDims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{}", self.x, self.y, self.z)
    }
}

impl TryFrom<[u16; 3]> for ChunkDims {
    type Error = TeraError;

    fn try_from(value: [u16; 3]) -> Result<Self, Self::Error> {
        Self::new(value[0], value[1], value[2])
    }
}

impl From<ChunkDims> for [u16; 3] {
    fn from(value: ChunkDims) -> Self {
        [value.x, value.y, value.z]
    }
}

/// Number of bits used to encode one packed element.
///
/// Only widths that divide a byte evenly are supported, so an element never
/// straddles a byte boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum BitWidth {
    One = 1,
    Two = 2,
    Four = 4,
    Eight = 8,
}

impl BitWidth {
    /// Every supported width, narrowest first.
    pub const ALL: [BitWidth; 4] = [BitWidth::One, BitWidth::Two, BitWidth::Four, BitWidth::Eight];

    pub fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            1 => Some(Self::One),
            2 => Some(Self::Two),
            4 => Some(Self::Four),
            8 => Some(Self::Eight),
            _ => None,
        }
    }

    #[inline]
    pub const fn bits(self) -> u8 {
        self as u8
    }

    /// Largest value representable at this width.
    #[inline]
    pub const fn max_value(self) -> u8 {
        ((1u16 << self.bits()) - 1) as u8
    }

    /// Number of distinct values representable at this width.
    pub const fn capacity(self) -> usize {
        1usize << self.bits()
    }

    #[inline]
    pub const fn fits(self, value: u8) -> bool {
        value <= self.max_value()
    }

    /// Bytes needed to pack `count` elements at this width.
    pub const fn packed_len(self, count: usize) -> usize {
        (count * self.bits() as usize).div_ceil(8)
    }

    /// Narrowest width whose range covers `len` palette slots, or None if
    /// `len` exceeds 256.
    pub fn for_palette_len(len: usize) -> Option<Self> {
        Self::ALL.into_iter().find(|w| w.capacity() >= len)
    }
}

impl fmt::Display for BitWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-bit", self.bits())
    }
}

impl TryFrom<u8> for BitWidth {
    type Error = TeraError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_bits(value).ok_or(TeraError::UnsupportedBitWidth(value))
    }
}

impl From<BitWidth> for u8 {
    fn from(value: BitWidth) -> Self {
        value.bits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dims_reject_zero_sides() {
        assert!(ChunkDims::new(0, 1, 1).is_err());
        assert!(ChunkDims::new(1, 0, 1).is_err());
        assert!(matches!(
            ChunkDims::new(1, 1, 0),
            Err(TeraError::InvalidDimensions { x: 1, y: 1, z: 0 })
        ));
        assert!(ChunkDims::new(1, 1, 1).is_ok());
    }

    #[test]
    fn test_index_is_injective_and_total() {
        let dims = ChunkDims::new(3, 4, 5).expect("valid dims");
        let mut seen = vec![false; dims.volume()];
        for y in 0..4 {
            for z in 0..5 {
                for x in 0..3 {
                    let idx = dims.index_of(x, y, z).expect("in range");
                    assert!(!seen[idx], "index {idx} produced twice");
                    seen[idx] = true;
                    assert_eq!(dims.coords_of(idx), (x, y, z));
                }
            }
        }
        assert!(seen.iter().all(|s| *s));
    }

    #[test]
    fn test_index_layout_is_y_major() {
        let dims = ChunkDims::new(4, 2, 3).expect("valid dims");
        assert_eq!(dims.index_of(1, 0, 0), Some(1));
        assert_eq!(dims.index_of(0, 0, 1), Some(4));
        assert_eq!(dims.index_of(0, 1, 0), Some(12));
    }

    #[test]
    fn test_checked_index_out_of_bounds() {
        let dims = ChunkDims::new(2, 2, 2).expect("valid dims");
        assert_eq!(dims.index_of(2, 0, 0), None);
        let err = dims.checked_index(0, 5, 0).unwrap_err();
        assert!(matches!(err, TeraError::OutOfBounds { y: 5, .. }));
        assert!(err.to_string().contains("2x2x2"));
    }

    #[test]
    fn test_default_chunk_volume() {
        assert_eq!(ChunkDims::default().volume(), 16 * 256 * 16);
    }

    #[test]
    fn test_bit_width_ranges() {
        assert_eq!(BitWidth::One.max_value(), 1);
        assert_eq!(BitWidth::Two.max_value(), 3);
        assert_eq!(BitWidth::Four.max_value(), 15);
        assert_eq!(BitWidth::Eight.max_value(), 255);
        assert!(BitWidth::Four.fits(15));
        assert!(!BitWidth::Four.fits(16));
        assert_eq!(BitWidth::from_bits(3), None);
    }

    #[test]
    fn test_packed_len_rounds_up() {
        assert_eq!(BitWidth::Four.packed_len(8), 4);
        assert_eq!(BitWidth::Four.packed_len(7), 4);
        assert_eq!(BitWidth::One.packed_len(9), 2);
        assert_eq!(BitWidth::Eight.packed_len(64), 64);
    }

    #[test]
    fn test_width_for_palette_len() {
        assert_eq!(BitWidth::for_palette_len(1), Some(BitWidth::One));
        assert_eq!(BitWidth::for_palette_len(2), Some(BitWidth::One));
        assert_eq!(BitWidth::for_palette_len(3), Some(BitWidth::Two));
        assert_eq!(BitWidth::for_palette_len(16), Some(BitWidth::Four));
        assert_eq!(BitWidth::for_palette_len(17), Some(BitWidth::Eight));
        assert_eq!(BitWidth::for_palette_len(256), Some(BitWidth::Eight));
        assert_eq!(BitWidth::for_palette_len(257), None);
    }

    #[test]
    fn test_serde_validates_dims_and_width() {
        let dims: ChunkDims = serde_json::from_str("[4, 4, 4]").expect("valid dims");
        assert_eq!(dims.volume(), 64);
        assert!(serde_json::from_str::<ChunkDims>("[0, 4, 4]").is_err());
        let width: BitWidth = serde_json::from_str("4").expect("valid width");
        assert_eq!(width, BitWidth::Four);
        assert!(serde_json::from_str::<BitWidth>("3").is_err());
        assert_eq!(serde_json::to_string(&dims).expect("serialize"), "[4,4,4]");
    }
}
