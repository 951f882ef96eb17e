use tera_core::{BitWidth, ChunkDims, FormatError};

use crate::array::RepresentationKind;

/// Representation tag for a dense payload.
pub const TAG_DENSE: u8 = 0;

/// Representation tag for a uniform payload.
pub const TAG_UNIFORM: u8 = 1;

/// Representation tag for a paletted payload.
pub const TAG_PALETTED: u8 = 2;

/// Size of the common payload header in bytes.
pub const HEADER_SIZE: usize = 8;

/// Common header at the start of every array payload.
///
/// 8 bytes, repr(C) with byte-array fields so there is no padding.
/// Multi-byte fields are little-endian.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ArrayHeader {
    pub tag: u8,
    pub size_x: [u8; 2],
    pub size_y: [u8; 2],
    pub size_z: [u8; 2],
    pub bit_width: u8,
}

impl ArrayHeader {
    pub fn new(kind: RepresentationKind, dims: ChunkDims, width: BitWidth) -> Self {
        Self {
            tag: kind.tag(),
            size_x: dims.size_x().to_le_bytes(),
            size_y: dims.size_y().to_le_bytes(),
            size_z: dims.size_z().to_le_bytes(),
            bit_width: width.bits(),
        }
    }

    pub fn kind(&self) -> Result<RepresentationKind, FormatError> {
        RepresentationKind::from_tag(self.tag).ok_or(FormatError::UnknownTag(self.tag))
    }

    pub fn dims(&self) -> Result<ChunkDims, FormatError> {
        let x = u16::from_le_bytes(self.size_x);
        let y = u16::from_le_bytes(self.size_y);
        let z = u16::from_le_bytes(self.size_z);
        ChunkDims::new(x, y, z).map_err(|_| FormatError::InvalidDimensions { x, y, z })
    }

    pub fn bit_width(&self) -> Result<BitWidth, FormatError> {
        BitWidth::from_bits(self.bit_width).ok_or(FormatError::UnsupportedBitWidth(self.bit_width))
    }
}
