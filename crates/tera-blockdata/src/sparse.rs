//! Sparse representations for low-cardinality chunks.
//!
//! Neither type ever widens its own value range: a write they cannot hold
//! returns [`WriteError::CapacityExceeded`] and the owning
//! [`TeraArray`](crate::TeraArray) swaps in a richer representation before
//! retrying.

use tera_core::constants::{ARRAY_OVERHEAD_BYTES, MAX_PALETTE_CEILING};
use tera_core::{BitWidth, ChunkDims, TeraError};

use crate::codec;
use crate::dense::DenseArray;

/// Outcome of a sparse write that did not complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum WriteError {
    /// The representation cannot hold the value; promote and retry.
    CapacityExceeded,
    Rejected(TeraError),
}

impl From<TeraError> for WriteError {
    fn from(err: TeraError) -> Self {
        WriteError::Rejected(err)
    }
}

/// Every cell holds the same value. No per-cell storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformArray {
    dims: ChunkDims,
    width: BitWidth,
    fill: u8,
}

impl UniformArray {
    pub fn new(dims: ChunkDims, width: BitWidth, fill: u8) -> Result<Self, TeraError> {
        if !width.fits(fill) {
            return Err(TeraError::ValueOutOfRange {
                value: fill,
                bits: width.bits(),
            });
        }
        Ok(Self { dims, width, fill })
    }

    pub fn dims(&self) -> ChunkDims {
        self.dims
    }

    pub fn bit_width(&self) -> BitWidth {
        self.width
    }

    pub fn fill_value(&self) -> u8 {
        self.fill
    }

    pub(crate) fn set_index(&mut self, _index: usize, value: u8) -> Result<u8, WriteError> {
        if value == self.fill {
            Ok(self.fill)
        } else {
            Err(WriteError::CapacityExceeded)
        }
    }

    pub fn estimated_memory_bytes(&self) -> usize {
        ARRAY_OVERHEAD_BYTES
    }

    pub fn to_dense(&self) -> DenseArray {
        DenseArray::filled(self.dims, self.width, self.fill)
            .expect("uniform fill was range-checked on construction")
    }

    /// A one-entry paletted array holding the same contents.
    pub fn to_paletted(&self) -> PalettedArray {
        PalettedArray {
            dims: self.dims,
            width: self.width,
            palette: vec![self.fill],
            index_width: BitWidth::One,
            indices: vec![0u8; BitWidth::One.packed_len(self.dims.volume())],
        }
    }
}

/// A deflated value table plus one packed palette index per cell.
///
/// The index width is the narrowest [`BitWidth`] that addresses every palette
/// slot; it widens as the palette grows. Palette entries stay in insertion
/// order and are only dropped by an explicit compaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PalettedArray {
    dims: ChunkDims,
    width: BitWidth,
    palette: Vec<u8>,
    index_width: BitWidth,
    indices: Vec<u8>,
}

impl PalettedArray {
    /// Deflate per-cell values (in linear index order) into a palette and
    /// index buffer. Returns None if more than 255 distinct values appear or
    /// a value does not fit `width`.
    pub(crate) fn deflate(
        dims: ChunkDims,
        width: BitWidth,
        values: impl IntoIterator<Item = u8>,
    ) -> Option<Self> {
        let volume = dims.volume();
        let mut slots = [None::<u8>; 256];
        let mut palette = Vec::new();
        let mut cell_slots = Vec::with_capacity(volume);

        for value in values.into_iter().take(volume) {
            if !width.fits(value) {
                return None;
            }
            let slot = match slots[value as usize] {
                Some(slot) => slot,
                None => {
                    if palette.len() >= MAX_PALETTE_CEILING as usize {
                        return None;
                    }
                    let slot = palette.len() as u8;
                    palette.push(value);
                    slots[value as usize] = Some(slot);
                    slot
                }
            };
            cell_slots.push(slot);
        }
        if palette.is_empty() || cell_slots.len() != volume {
            return None;
        }

        let index_width = BitWidth::for_palette_len(palette.len())?;
        let mut indices = vec![0u8; index_width.packed_len(volume)];
        for (index, slot) in cell_slots.into_iter().enumerate() {
            codec::write_element(&mut indices, index, index_width, slot).ok()?;
        }

        Some(Self {
            dims,
            width,
            palette,
            index_width,
            indices,
        })
    }

    /// Deflate one value per cell, given in linear index order. Returns None
    /// on a length mismatch, an out-of-range value, or more than 255 distinct
    /// values.
    pub fn from_values(dims: ChunkDims, width: BitWidth, values: &[u8]) -> Option<Self> {
        if values.len() != dims.volume() {
            return None;
        }
        Self::deflate(dims, width, values.iter().copied())
    }

    /// Assemble from already-validated parts.
    pub(crate) fn from_parts(
        dims: ChunkDims,
        width: BitWidth,
        palette: Vec<u8>,
        index_width: BitWidth,
        indices: Vec<u8>,
    ) -> Self {
        Self {
            dims,
            width,
            palette,
            index_width,
            indices,
        }
    }

    pub fn dims(&self) -> ChunkDims {
        self.dims
    }

    pub fn bit_width(&self) -> BitWidth {
        self.width
    }

    /// The deflated value table.
    pub fn palette(&self) -> &[u8] {
        &self.palette
    }

    pub fn index_width(&self) -> BitWidth {
        self.index_width
    }

    /// The packed per-cell palette indices.
    pub fn indices(&self) -> &[u8] {
        &self.indices
    }

    #[inline]
    pub(crate) fn get_index(&self, index: usize) -> u8 {
        let slot = codec::read_element(&self.indices, index, self.index_width);
        self.palette[slot as usize]
    }

    /// Write `value` at `index`, appending it to the palette if it is new.
    /// A full palette first reuses a slot no other cell references; only when
    /// every slot is live does the write fail with `CapacityExceeded`.
    pub(crate) fn set_index(
        &mut self,
        index: usize,
        value: u8,
        ceiling: usize,
    ) -> Result<u8, WriteError> {
        let previous = self.get_index(index);
        if previous == value {
            return Ok(previous);
        }

        let slot = match self.palette.iter().position(|v| *v == value) {
            Some(slot) => slot,
            None => {
                if self.palette.len() >= ceiling {
                    let slot = self
                        .unreferenced_slot(index)
                        .ok_or(WriteError::CapacityExceeded)?;
                    log::trace!(
                        "reusing stale palette slot {} ({} -> {})",
                        slot,
                        self.palette[slot],
                        value
                    );
                    self.palette[slot] = value;
                    slot
                } else {
                    self.palette.push(value);
                    self.widen_if_needed()?;
                    self.palette.len() - 1
                }
            }
        };

        codec::write_element(&mut self.indices, index, self.index_width, slot as u8)?;
        Ok(previous)
    }

    /// First palette slot referenced by no cell other than `skip`.
    fn unreferenced_slot(&self, skip: usize) -> Option<usize> {
        let mut live = [false; 256];
        codec::elements(&self.indices, self.dims.volume(), self.index_width)
            .enumerate()
            .filter(|(index, _)| *index != skip)
            .for_each(|(_, slot)| live[slot as usize] = true);
        (0..self.palette.len()).find(|slot| !live[*slot])
    }

    fn widen_if_needed(&mut self) -> Result<(), WriteError> {
        let needed =
            BitWidth::for_palette_len(self.palette.len()).ok_or(WriteError::CapacityExceeded)?;
        if needed > self.index_width {
            log::trace!(
                "widening palette index {} -> {} ({} entries)",
                self.index_width,
                needed,
                self.palette.len()
            );
            self.indices = codec::repack(
                &self.indices,
                self.dims.volume(),
                self.index_width,
                needed,
            )?;
            self.index_width = needed;
        }
        Ok(())
    }

    pub fn estimated_memory_bytes(&self) -> usize {
        ARRAY_OVERHEAD_BYTES + self.palette.len() + self.indices.len()
    }

    /// Expand every cell back to its raw value in a dense buffer.
    pub fn inflate(&self) -> DenseArray {
        let mut dense = DenseArray::new(self.dims, self.width);
        for index in 0..self.dims.volume() {
            dense
                .set_index(index, self.get_index(index))
                .expect("palette values were range-checked on insert");
        }
        dense
    }

    /// Every cell value in linear index order.
    pub fn values(&self) -> impl Iterator<Item = u8> + '_ {
        (0..self.dims.volume()).map(move |index| self.get_index(index))
    }
}
