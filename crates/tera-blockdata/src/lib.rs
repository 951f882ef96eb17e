//! Adaptive per-chunk voxel data storage.
//!
//! A [`TeraArray`] stores one small unsigned value per cell of a fixed 3D
//! grid. It starts out dense, uniform or paletted and switches between those
//! layouts as its contents change:
//! - writes promote sparse storage when it cannot hold a new value
//! - [`TeraArray::compact`] shrinks dense storage when the owner asks for it
//!
//! All bit packing goes through [`codec`].

pub mod array;
pub mod codec;
pub mod compress;
pub mod config;
pub mod dense;
pub mod format;
pub mod policy;
pub mod serialize;
pub mod sparse;

pub use array::{Representation, RepresentationKind, TeraArray};
pub use config::{load_policy_from_str, ConfigError};
pub use dense::DenseArray;
pub use policy::{CompactionPolicy, PromotionTarget};
pub use serialize::{deserialize, deserialize_with_policy, serialize};
pub use sparse::{PalettedArray, UniformArray};
pub use tera_core::{BitWidth, ChunkDims, FormatError, TeraError};
