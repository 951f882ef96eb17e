use glam::UVec3;
use serde::{Deserialize, Serialize};
use tera_core::{BitWidth, ChunkDims, FormatError, TeraError};

use crate::dense::DenseArray;
use crate::format::{TAG_DENSE, TAG_PALETTED, TAG_UNIFORM};
use crate::policy::CompactionPolicy;
use crate::sparse::{PalettedArray, UniformArray, WriteError};
use crate::{compress, serialize};

/// Which concrete storage backs a [`TeraArray`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RepresentationKind {
    Dense,
    Uniform,
    Paletted,
}

impl RepresentationKind {
    /// Wire tag written as the first payload byte.
    pub const fn tag(self) -> u8 {
        match self {
            RepresentationKind::Dense => TAG_DENSE,
            RepresentationKind::Uniform => TAG_UNIFORM,
            RepresentationKind::Paletted => TAG_PALETTED,
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            TAG_DENSE => Some(RepresentationKind::Dense),
            TAG_UNIFORM => Some(RepresentationKind::Uniform),
            TAG_PALETTED => Some(RepresentationKind::Paletted),
            _ => None,
        }
    }
}

/// The closed set of storage layouts.
#[derive(Debug, Clone)]
pub enum Representation {
    Dense(DenseArray),
    Uniform(UniformArray),
    Paletted(PalettedArray),
}

impl Representation {
    pub fn kind(&self) -> RepresentationKind {
        match self {
            Representation::Dense(_) => RepresentationKind::Dense,
            Representation::Uniform(_) => RepresentationKind::Uniform,
            Representation::Paletted(_) => RepresentationKind::Paletted,
        }
    }

    pub fn dims(&self) -> ChunkDims {
        match self {
            Representation::Dense(a) => a.dims(),
            Representation::Uniform(a) => a.dims(),
            Representation::Paletted(a) => a.dims(),
        }
    }

    pub fn bit_width(&self) -> BitWidth {
        match self {
            Representation::Dense(a) => a.bit_width(),
            Representation::Uniform(a) => a.bit_width(),
            Representation::Paletted(a) => a.bit_width(),
        }
    }

    pub fn estimated_memory_bytes(&self) -> usize {
        match self {
            Representation::Dense(a) => a.estimated_memory_bytes(),
            Representation::Uniform(a) => a.estimated_memory_bytes(),
            Representation::Paletted(a) => a.estimated_memory_bytes(),
        }
    }

    #[inline]
    fn get_index(&self, index: usize) -> u8 {
        match self {
            Representation::Dense(a) => a.get_index(index),
            Representation::Uniform(a) => a.fill_value(),
            Representation::Paletted(a) => a.get_index(index),
        }
    }

    /// Expand into a dense array with identical contents.
    pub fn to_dense(&self) -> DenseArray {
        match self {
            Representation::Dense(a) => a.copy(),
            Representation::Uniform(a) => a.to_dense(),
            Representation::Paletted(a) => a.inflate(),
        }
    }
}

/// Per-chunk voxel metadata with a representation that adapts to its contents.
///
/// Reads and writes behave identically whatever the current representation.
/// Writes promote sparse storage automatically when it cannot hold a new
/// value; going back to sparse storage only happens through
/// [`TeraArray::compact`].
///
/// The array holds no locks. Concurrent reads are fine; a `set`, `compact`,
/// or `inflate` needs exclusive access, which `&mut self` already enforces.
#[derive(Debug, Clone)]
pub struct TeraArray {
    repr: Representation,
    policy: CompactionPolicy,
}

impl TeraArray {
    /// A dense array with every cell set to 0.
    pub fn new_dense(dims: ChunkDims, width: BitWidth) -> Self {
        Self::from_representation(Representation::Dense(DenseArray::new(dims, width)))
    }

    /// A uniform array with every cell set to `value`.
    pub fn filled(dims: ChunkDims, width: BitWidth, value: u8) -> Result<Self, TeraError> {
        let uniform = UniformArray::new(dims, width, value)?;
        Ok(Self::from_representation(Representation::Uniform(uniform)))
    }

    /// A dense array over an existing packed buffer.
    pub fn from_raw(dims: ChunkDims, width: BitWidth, data: Vec<u8>) -> Result<Self, TeraError> {
        let dense = DenseArray::from_raw(dims, width, data)?;
        Ok(Self::from_representation(Representation::Dense(dense)))
    }

    /// A dense array from one value per cell, in linear index order.
    pub fn from_values(dims: ChunkDims, width: BitWidth, values: &[u8]) -> Result<Self, TeraError> {
        let dense = DenseArray::from_values(dims, width, values)?;
        Ok(Self::from_representation(Representation::Dense(dense)))
    }

    pub fn from_representation(repr: Representation) -> Self {
        Self {
            repr,
            policy: CompactionPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: CompactionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn set_policy(&mut self, policy: CompactionPolicy) {
        self.policy = policy;
    }

    pub fn policy(&self) -> &CompactionPolicy {
        &self.policy
    }

    pub fn representation(&self) -> &Representation {
        &self.repr
    }

    pub fn into_representation(self) -> Representation {
        self.repr
    }

    pub fn kind(&self) -> RepresentationKind {
        self.repr.kind()
    }

    pub fn dims(&self) -> ChunkDims {
        self.repr.dims()
    }

    pub fn bit_width(&self) -> BitWidth {
        self.repr.bit_width()
    }

    /// Total number of cells.
    pub fn volume(&self) -> usize {
        self.dims().volume()
    }

    /// Read the cell at `(x, y, z)`.
    ///
    /// # Panics
    ///
    /// Panics if the coordinate is outside the array. Use [`TeraArray::try_get`]
    /// for untrusted coordinates.
    #[inline]
    pub fn get(&self, x: u32, y: u32, z: u32) -> u8 {
        match self.try_get(x, y, z) {
            Ok(value) => value,
            Err(err) => panic!("{err}"),
        }
    }

    #[inline]
    pub fn try_get(&self, x: u32, y: u32, z: u32) -> Result<u8, TeraError> {
        let index = self.dims().checked_index(x, y, z)?;
        Ok(self.repr.get_index(index))
    }

    pub fn get_at(&self, pos: UVec3) -> u8 {
        self.get(pos.x, pos.y, pos.z)
    }

    /// Write the cell at `(x, y, z)` and return the value it held before.
    ///
    /// An out-of-range coordinate or a value wider than the array's bit width
    /// is rejected and the array is left unchanged. If the current sparse
    /// representation cannot hold `value` it is promoted first; the promotion
    /// and the write complete together.
    pub fn set(&mut self, x: u32, y: u32, z: u32, value: u8) -> Result<u8, TeraError> {
        let index = self.dims().checked_index(x, y, z)?;
        let width = self.bit_width();
        if !width.fits(value) {
            return Err(TeraError::ValueOutOfRange {
                value,
                bits: width.bits(),
            });
        }

        let ceiling = self.policy.palette_ceiling();
        loop {
            let outcome = match &mut self.repr {
                Representation::Dense(dense) => return dense.set_index(index, value),
                Representation::Uniform(uniform) => uniform.set_index(index, value),
                Representation::Paletted(paletted) => paletted.set_index(index, value, ceiling),
            };
            match outcome {
                Ok(previous) => return Ok(previous),
                Err(WriteError::Rejected(err)) => return Err(err),
                Err(WriteError::CapacityExceeded) => self.promote(),
            }
        }
    }

    pub fn set_at(&mut self, pos: UVec3, value: u8) -> Result<u8, TeraError> {
        self.set(pos.x, pos.y, pos.z, value)
    }

    /// Replace the current representation with the next richer one.
    fn promote(&mut self) {
        let promoted = match &self.repr {
            Representation::Uniform(uniform) => self.policy.promote_uniform(uniform),
            Representation::Paletted(paletted) => Representation::Dense(paletted.inflate()),
            Representation::Dense(_) => return,
        };
        log::trace!(
            "promoting {} array {:?} -> {:?}",
            self.dims(),
            self.repr.kind(),
            promoted.kind()
        );
        self.repr = promoted;
    }

    /// Overwrite every cell with `value`, leaving a uniform array.
    pub fn fill(&mut self, value: u8) -> Result<(), TeraError> {
        let uniform = UniformArray::new(self.dims(), self.bit_width(), value)?;
        self.repr = Representation::Uniform(uniform);
        Ok(())
    }

    /// Deep copy preserving the representation. Shares no storage with `self`.
    pub fn copy(&self) -> Self {
        self.clone()
    }

    pub fn estimated_memory_bytes(&self) -> usize {
        self.repr.estimated_memory_bytes()
    }

    /// Switch to the cheapest representation the policy allows.
    ///
    /// Dense arrays become uniform or paletted when their contents allow it.
    /// Paletted arrays are re-deflated, dropping palette entries no cell uses
    /// any more. Uniform arrays are left alone. Returns the resulting kind.
    pub fn compact(&mut self) -> RepresentationKind {
        let compacted = match &self.repr {
            Representation::Dense(dense) => self.policy.compact_dense(dense),
            Representation::Paletted(paletted) => {
                let dense = paletted.inflate();
                match self.policy.compact_dense(&dense) {
                    Some(repr) => Some(repr),
                    None => Some(Representation::Dense(dense)),
                }
            }
            Representation::Uniform(_) => None,
        };

        if let Some(next) = compacted {
            log::debug!(
                "compacted {} array {:?} ({} B) -> {:?} ({} B)",
                self.dims(),
                self.repr.kind(),
                self.repr.estimated_memory_bytes(),
                next.kind(),
                next.estimated_memory_bytes()
            );
            self.repr = next;
        }
        self.kind()
    }

    /// Force dense storage.
    pub fn inflate(&mut self) {
        if let Representation::Dense(_) = self.repr {
            return;
        }
        self.repr = Representation::Dense(self.repr.to_dense());
    }

    /// Every cell value in linear index order.
    pub fn to_values(&self) -> Vec<u8> {
        (0..self.volume()).map(|i| self.repr.get_index(i)).collect()
    }

    /// The distinct values present, ascending.
    pub fn distinct_values(&self) -> Vec<u8> {
        let mut seen = [false; 256];
        match &self.repr {
            Representation::Uniform(uniform) => seen[uniform.fill_value() as usize] = true,
            Representation::Dense(dense) => dense.values().for_each(|v| seen[v as usize] = true),
            Representation::Paletted(paletted) => {
                paletted.values().for_each(|v| seen[v as usize] = true)
            }
        }
        (0..=255u8).filter(|v| seen[*v as usize]).collect()
    }

    /// Encode into the binary payload layout.
    pub fn serialize(&self) -> Vec<u8> {
        serialize::serialize(self)
    }

    /// Decode a payload produced by [`TeraArray::serialize`] using the default policy.
    pub fn deserialize(bytes: &[u8]) -> Result<Self, FormatError> {
        serialize::deserialize(bytes)
    }

    /// Serialized payload, LZ4-compressed.
    pub fn to_compressed_bytes(&self) -> Vec<u8> {
        compress::compress_payload(&self.serialize())
    }

    pub fn from_compressed_bytes(bytes: &[u8]) -> Result<Self, FormatError> {
        let payload = compress::decompress_payload(bytes)?;
        Self::deserialize(&payload)
    }
}

impl PartialEq for TeraArray {
    /// Arrays are equal when their dimensions, bit width and every cell value
    /// match, whatever their representation or policy.
    fn eq(&self, other: &Self) -> bool {
        if self.dims() != other.dims() || self.bit_width() != other.bit_width() {
            return false;
        }
        match (&self.repr, &other.repr) {
            (Representation::Uniform(a), Representation::Uniform(b)) => {
                a.fill_value() == b.fill_value()
            }
            (Representation::Dense(a), Representation::Dense(b)) if !a.has_padding() => {
                a.data() == b.data()
            }
            _ => (0..self.volume()).all(|i| self.repr.get_index(i) == other.repr.get_index(i)),
        }
    }
}

impl Eq for TeraArray {}
