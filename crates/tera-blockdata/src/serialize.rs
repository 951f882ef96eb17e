use tera_core::{BitWidth, ChunkDims, FormatError};

use crate::array::{Representation, RepresentationKind, TeraArray};
use crate::codec;
use crate::dense::DenseArray;
use crate::format::{ArrayHeader, HEADER_SIZE};
use crate::policy::CompactionPolicy;
use crate::sparse::{PalettedArray, UniformArray};

/// Encode an array into its binary payload.
///
/// Layout: header (8B) followed by the representation body:
/// - Dense: packed buffer, `ceil(volume * bit_width / 8)` bytes
/// - Uniform: fill value (1B)
/// - Paletted: palette length (1B), palette values, index width (1B),
///   packed index buffer
pub fn serialize(array: &TeraArray) -> Vec<u8> {
    let repr = array.representation();
    let header = ArrayHeader::new(repr.kind(), repr.dims(), repr.bit_width());

    let mut output = Vec::with_capacity(serialized_len(array));
    output.extend_from_slice(bytemuck::bytes_of(&header));

    match repr {
        Representation::Dense(dense) => output.extend_from_slice(dense.data()),
        Representation::Uniform(uniform) => output.push(uniform.fill_value()),
        Representation::Paletted(paletted) => {
            output.push(paletted.palette().len() as u8);
            output.extend_from_slice(paletted.palette());
            output.push(paletted.index_width().bits());
            output.extend_from_slice(paletted.indices());
        }
    }

    output
}

/// Exact length of [`serialize`]'s output.
pub fn serialized_len(array: &TeraArray) -> usize {
    HEADER_SIZE
        + match array.representation() {
            Representation::Dense(dense) => dense.data_size(),
            Representation::Uniform(_) => 1,
            Representation::Paletted(paletted) => {
                2 + paletted.palette().len() + paletted.indices().len()
            }
        }
}

/// Decode a payload with the default compaction policy.
pub fn deserialize(bytes: &[u8]) -> Result<TeraArray, FormatError> {
    deserialize_with_policy(bytes, CompactionPolicy::default())
}

/// Decode a payload. Nothing is constructed unless the whole payload is valid.
pub fn deserialize_with_policy(
    bytes: &[u8],
    policy: CompactionPolicy,
) -> Result<TeraArray, FormatError> {
    match decode(bytes) {
        Ok(repr) => Ok(TeraArray::from_representation(repr).with_policy(policy)),
        Err(err) => {
            log::warn!("Rejected {}-byte array payload: {}", bytes.len(), err);
            Err(err)
        }
    }
}

fn decode(bytes: &[u8]) -> Result<Representation, FormatError> {
    let mut reader = Reader::new(bytes);
    let header: ArrayHeader = *bytemuck::from_bytes(reader.take(HEADER_SIZE)?);
    let kind = header.kind()?;
    let dims = header.dims()?;
    let width = header.bit_width()?;

    let repr = match kind {
        RepresentationKind::Dense => {
            let data = reader.take(width.packed_len(dims.volume()))?.to_vec();
            Representation::Dense(DenseArray::from_parts(dims, width, data))
        }
        RepresentationKind::Uniform => {
            let fill = reader.byte()?;
            let uniform = UniformArray::new(dims, width, fill).map_err(|_| {
                FormatError::ValueOutOfRange {
                    value: fill,
                    bits: width.bits(),
                }
            })?;
            Representation::Uniform(uniform)
        }
        RepresentationKind::Paletted => decode_paletted(&mut reader, dims, width)?,
    };

    reader.finish()?;
    Ok(repr)
}

fn decode_paletted(
    reader: &mut Reader<'_>,
    dims: ChunkDims,
    width: BitWidth,
) -> Result<Representation, FormatError> {
    let palette_len = reader.byte()? as usize;
    if palette_len == 0 {
        return Err(FormatError::EmptyPalette);
    }

    let palette = reader.take(palette_len)?.to_vec();
    let mut seen = [false; 256];
    for value in &palette {
        check_value(*value, width)?;
        if seen[*value as usize] {
            return Err(FormatError::DuplicatePaletteEntry(*value));
        }
        seen[*value as usize] = true;
    }

    let index_bits = reader.byte()?;
    let index_width =
        BitWidth::from_bits(index_bits).ok_or(FormatError::UnsupportedBitWidth(index_bits))?;
    if index_width.capacity() < palette_len {
        return Err(FormatError::IndexWidthTooNarrow {
            palette_len,
            bits: index_bits,
        });
    }

    let volume = dims.volume();
    let indices = reader.take(index_width.packed_len(volume))?.to_vec();
    if let Some(index) = codec::elements(&indices, volume, index_width)
        .find(|slot| *slot as usize >= palette_len)
    {
        return Err(FormatError::PaletteIndexOutOfRange { index, palette_len });
    }

    Ok(Representation::Paletted(PalettedArray::from_parts(
        dims,
        width,
        palette,
        index_width,
        indices,
    )))
}

fn check_value(value: u8, width: BitWidth) -> Result<(), FormatError> {
    if width.fits(value) {
        Ok(())
    } else {
        Err(FormatError::ValueOutOfRange {
            value,
            bits: width.bits(),
        })
    }
}

/// Forward-only cursor over a payload.
struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], FormatError> {
        let end = self.pos + len;
        if end > self.bytes.len() {
            return Err(FormatError::Truncated {
                expected: end,
                actual: self.bytes.len(),
            });
        }
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn byte(&mut self) -> Result<u8, FormatError> {
        Ok(self.take(1)?[0])
    }

    fn finish(&self) -> Result<(), FormatError> {
        if self.pos != self.bytes.len() {
            return Err(FormatError::TrailingBytes {
                expected: self.pos,
                actual: self.bytes.len(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tera_core::TeraError;

    fn dims(x: u16, y: u16, z: u16) -> ChunkDims {
        ChunkDims::new(x, y, z).expect("valid dims")
    }

    fn assert_same_cells(a: &TeraArray, b: &TeraArray) {
        assert_eq!(a.dims(), b.dims());
        for index in 0..a.volume() {
            let (x, y, z) = a.dims().coords_of(index);
            assert_eq!(a.get(x, y, z), b.get(x, y, z), "cell ({x}, {y}, {z})");
        }
    }

    #[test]
    fn test_dense_cycling_values_roundtrip() {
        let d = dims(4, 4, 4);
        let values: Vec<u8> = (0..64).collect();
        let array = TeraArray::from_values(d, BitWidth::Eight, &values).expect("fits");

        let bytes = array.serialize();
        assert_eq!(bytes.len(), HEADER_SIZE + 64);
        assert_eq!(bytes.len(), serialized_len(&array));

        let restored = deserialize(&bytes).expect("valid payload");
        assert_eq!(restored.kind(), RepresentationKind::Dense);
        assert_same_cells(&array, &restored);
        assert_eq!(restored, array);
    }

    #[test]
    fn test_dense_byte_layout() {
        let d = dims(2, 1, 1);
        let mut array = TeraArray::new_dense(d, BitWidth::Four);
        array.set(0, 0, 0, 0x3).expect("valid write");
        array.set(1, 0, 0, 0xC).expect("valid write");
        assert_eq!(array.serialize(), vec![0, 2, 0, 1, 0, 1, 0, 4, 0xC3]);
    }

    #[test]
    fn test_uniform_roundtrip() {
        let array = TeraArray::filled(dims(16, 256, 16), BitWidth::Four, 9).expect("fits");
        let bytes = array.serialize();
        assert_eq!(bytes.len(), HEADER_SIZE + 1);
        assert_eq!(bytes[0], 1);
        assert_eq!(bytes[HEADER_SIZE], 9);

        let restored = deserialize(&bytes).expect("valid payload");
        assert_eq!(restored.kind(), RepresentationKind::Uniform);
        assert_eq!(restored.get(15, 255, 15), 9);
    }

    #[test]
    fn test_paletted_roundtrip_after_promotion() {
        let d = dims(2, 2, 2);
        let mut array = TeraArray::filled(d, BitWidth::Four, 3).expect("fits");
        array.set(1, 0, 1, 5).expect("valid write");
        assert_eq!(array.kind(), RepresentationKind::Paletted);

        let bytes = array.serialize();
        // header + palette len + 2 palette values + index width + 1 byte of 1-bit indices
        assert_eq!(bytes.len(), HEADER_SIZE + 1 + 2 + 1 + 1);
        assert_eq!(&bytes[HEADER_SIZE..HEADER_SIZE + 4], &[2, 3, 5, 1]);

        let restored = deserialize(&bytes).expect("valid payload");
        assert_eq!(restored.kind(), RepresentationKind::Paletted);
        assert_same_cells(&array, &restored);
        assert_eq!(restored.get(1, 0, 1), 5);
        assert_eq!(restored.get(0, 0, 0), 3);
    }

    #[test]
    fn test_roundtrip_after_forced_transitions() {
        let d = dims(5, 4, 3);
        let mut array = TeraArray::filled(d, BitWidth::Eight, 0).expect("fits");
        for index in 0..d.volume() {
            let (x, y, z) = d.coords_of(index);
            array.set(x, y, z, (index * 7 % 30) as u8).expect("valid write");
        }
        assert_eq!(array.kind(), RepresentationKind::Dense);
        let restored = deserialize(&array.serialize()).expect("valid payload");
        assert_eq!(restored, array);

        array.fill(2).expect("fits");
        array.set(4, 3, 2, 8).expect("valid write");
        let restored = deserialize(&array.serialize()).expect("valid payload");
        assert_eq!(restored.kind(), RepresentationKind::Paletted);
        assert_eq!(restored, array);
    }

    #[test]
    fn test_deserialize_uses_given_policy() {
        let array = TeraArray::filled(dims(2, 2, 2), BitWidth::Eight, 0).expect("fits");
        let policy = CompactionPolicy {
            palette_ceiling: 2,
            ..Default::default()
        };
        let mut restored =
            deserialize_with_policy(&array.serialize(), policy).expect("valid payload");
        assert_eq!(restored.policy(), &policy);
        restored.set(0, 0, 0, 1).expect("valid write");
        restored.set(1, 0, 0, 2).expect("valid write");
        assert_eq!(restored.kind(), RepresentationKind::Dense);
    }

    #[test]
    fn test_dense_length_mismatch_rejected() {
        let array = TeraArray::new_dense(dims(4, 4, 4), BitWidth::Eight);
        let mut bytes = array.serialize();

        bytes.push(0);
        assert!(matches!(
            deserialize(&bytes),
            Err(FormatError::TrailingBytes {
                expected: 72,
                actual: 73
            })
        ));

        bytes.truncate(70);
        assert!(matches!(
            deserialize(&bytes),
            Err(FormatError::Truncated {
                expected: 72,
                actual: 70
            })
        ));
    }

    #[test]
    fn test_malformed_headers_rejected() {
        assert!(matches!(
            deserialize(&[0, 1, 0]),
            Err(FormatError::Truncated { expected: 8, .. })
        ));
        assert_eq!(
            deserialize(&[9, 1, 0, 1, 0, 1, 0, 8, 0]).unwrap_err(),
            FormatError::UnknownTag(9)
        );
        assert_eq!(
            deserialize(&[1, 1, 0, 1, 0, 1, 0, 3, 0]).unwrap_err(),
            FormatError::UnsupportedBitWidth(3)
        );
        assert!(matches!(
            deserialize(&[1, 0, 0, 1, 0, 1, 0, 8, 0]),
            Err(FormatError::InvalidDimensions { x: 0, .. })
        ));
    }

    #[test]
    fn test_uniform_fill_out_of_range_rejected() {
        assert_eq!(
            deserialize(&[1, 1, 0, 1, 0, 1, 0, 4, 16]).unwrap_err(),
            FormatError::ValueOutOfRange { value: 16, bits: 4 }
        );
    }

    #[test]
    fn test_malformed_palettes_rejected() {
        // 2x1x1, 8-bit
        let header = [2u8, 2, 0, 1, 0, 1, 0, 8];
        let payload = |body: &[u8]| [header.as_slice(), body].concat();

        assert_eq!(
            deserialize(&payload(&[0, 1, 0])).unwrap_err(),
            FormatError::EmptyPalette
        );
        assert_eq!(
            deserialize(&payload(&[2, 7, 7, 1, 0b10])).unwrap_err(),
            FormatError::DuplicatePaletteEntry(7)
        );
        assert_eq!(
            deserialize(&payload(&[3, 1, 2, 3, 1, 0])).unwrap_err(),
            FormatError::IndexWidthTooNarrow {
                palette_len: 3,
                bits: 1
            }
        );
        assert_eq!(
            deserialize(&payload(&[2, 1, 2, 2, 0b0011])).unwrap_err(),
            FormatError::PaletteIndexOutOfRange {
                index: 3,
                palette_len: 2
            }
        );
        assert!(deserialize(&payload(&[2, 1, 2, 1, 0b10])).is_ok());
    }

    #[test]
    fn test_format_error_converts_into_tera_error() {
        let err: TeraError = deserialize(&[]).unwrap_err().into();
        assert!(matches!(err, TeraError::Format(FormatError::Truncated { .. })));
    }
}
