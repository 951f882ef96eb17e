use tera_core::constants::ARRAY_OVERHEAD_BYTES;
use tera_core::{BitWidth, ChunkDims, TeraError};

use crate::codec;

/// One packed element per cell in a single owned buffer.
///
/// The buffer length is always `bit_width.packed_len(dims.volume())`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DenseArray {
    dims: ChunkDims,
    width: BitWidth,
    data: Vec<u8>,
}

impl DenseArray {
    /// Create a dense array with every cell set to 0.
    pub fn new(dims: ChunkDims, width: BitWidth) -> Self {
        Self {
            dims,
            width,
            data: vec![0u8; width.packed_len(dims.volume())],
        }
    }

    /// Create a dense array with every cell set to `value`.
    pub fn filled(dims: ChunkDims, width: BitWidth, value: u8) -> Result<Self, TeraError> {
        let data = codec::filled_buffer(dims.volume(), width, value)?;
        Ok(Self { dims, width, data })
    }

    /// Wrap an existing packed buffer. Rejects a buffer of the wrong length.
    pub fn from_raw(dims: ChunkDims, width: BitWidth, data: Vec<u8>) -> Result<Self, TeraError> {
        let expected = width.packed_len(dims.volume());
        if data.len() != expected {
            return Err(TeraError::BufferLength {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { dims, width, data })
    }

    /// Wrap a buffer whose length the caller has already matched to `dims` and `width`.
    pub(crate) fn from_parts(dims: ChunkDims, width: BitWidth, data: Vec<u8>) -> Self {
        debug_assert_eq!(data.len(), width.packed_len(dims.volume()));
        Self { dims, width, data }
    }

    /// Pack one value per cell, given in linear index order.
    pub fn from_values(dims: ChunkDims, width: BitWidth, values: &[u8]) -> Result<Self, TeraError> {
        if values.len() != dims.volume() {
            return Err(TeraError::BufferLength {
                expected: dims.volume(),
                actual: values.len(),
            });
        }
        let mut array = Self::new(dims, width);
        for (index, value) in values.iter().enumerate() {
            codec::write_element(&mut array.data, index, width, *value)?;
        }
        Ok(array)
    }

    pub fn dims(&self) -> ChunkDims {
        self.dims
    }

    pub fn bit_width(&self) -> BitWidth {
        self.width
    }

    /// The raw packed buffer.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }

    /// Length of the packed buffer in bytes.
    pub fn data_size(&self) -> usize {
        self.data.len()
    }

    /// Whether the last byte carries unused bits past the final element.
    pub(crate) fn has_padding(&self) -> bool {
        (self.dims.volume() * self.width.bits() as usize) % 8 != 0
    }

    #[inline]
    pub(crate) fn get_index(&self, index: usize) -> u8 {
        codec::read_element(&self.data, index, self.width)
    }

    #[inline]
    pub(crate) fn set_index(&mut self, index: usize, value: u8) -> Result<u8, TeraError> {
        codec::replace_element(&mut self.data, index, self.width, value)
    }

    /// Read the cell at `(x, y, z)`.
    ///
    /// # Panics
    ///
    /// Panics if the coordinate is outside the array.
    #[inline]
    pub fn get(&self, x: u32, y: u32, z: u32) -> u8 {
        match self.dims.checked_index(x, y, z) {
            Ok(index) => self.get_index(index),
            Err(err) => panic!("{err}"),
        }
    }

    /// Write the cell at `(x, y, z)` and return the value it held before.
    pub fn set(&mut self, x: u32, y: u32, z: u32, value: u8) -> Result<u8, TeraError> {
        let index = self.dims.checked_index(x, y, z)?;
        self.set_index(index, value)
    }

    /// Deep copy; the result shares no storage with `self`.
    pub fn copy(&self) -> Self {
        self.clone()
    }

    pub fn estimated_memory_bytes(&self) -> usize {
        ARRAY_OVERHEAD_BYTES + self.data_size()
    }

    /// Every cell value in linear index order.
    pub fn values(&self) -> impl Iterator<Item = u8> + '_ {
        codec::elements(&self.data, self.dims.volume(), self.width)
    }
}
