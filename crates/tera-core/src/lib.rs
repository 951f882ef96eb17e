pub mod constants;
pub mod error;
pub mod types;

pub use error::{FormatError, TeraError};
pub use types::{BitWidth, ChunkDims};
