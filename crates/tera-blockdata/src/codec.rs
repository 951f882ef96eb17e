//! Fixed-width sub-byte element packing.
//!
//! Element `i` at width `w` lives in byte `(i * w) / 8`, starting at bit
//! `(i * w) % 8`, least-significant bits first. At 4 bits an even index is the
//! low nibble and an odd index the high nibble. Index bounds are the caller's
//! responsibility; values wider than `w` are rejected and leave the buffer
//! untouched.

use tera_core::{BitWidth, TeraError};

/// Decode element `index` from `buffer`.
#[inline]
pub fn read_element(buffer: &[u8], index: usize, width: BitWidth) -> u8 {
    match width {
        BitWidth::Eight => buffer[index],
        _ => {
            let bit = index * width.bits() as usize;
            (buffer[bit >> 3] >> (bit & 7)) & width.max_value()
        }
    }
}

/// Encode `value` as element `index` of `buffer` without disturbing its
/// neighbours in the same byte.
#[inline]
pub fn write_element(
    buffer: &mut [u8],
    index: usize,
    width: BitWidth,
    value: u8,
) -> Result<(), TeraError> {
    if !width.fits(value) {
        return Err(TeraError::ValueOutOfRange {
            value,
            bits: width.bits(),
        });
    }
    match width {
        BitWidth::Eight => buffer[index] = value,
        _ => {
            let bit = index * width.bits() as usize;
            let shift = bit & 7;
            let mask = width.max_value() << shift;
            let byte = &mut buffer[bit >> 3];
            *byte = (*byte & !mask) | (value << shift);
        }
    }
    Ok(())
}

/// Write `value` at `index` and return the element it replaced.
#[inline]
pub fn replace_element(
    buffer: &mut [u8],
    index: usize,
    width: BitWidth,
    value: u8,
) -> Result<u8, TeraError> {
    let previous = read_element(buffer, index, width);
    write_element(buffer, index, width, value)?;
    Ok(previous)
}

/// Allocate a buffer of `count` elements, all set to `value`.
///
/// Padding bits past the last element stay zero.
pub fn filled_buffer(count: usize, width: BitWidth, value: u8) -> Result<Vec<u8>, TeraError> {
    if !width.fits(value) {
        return Err(TeraError::ValueOutOfRange {
            value,
            bits: width.bits(),
        });
    }
    let bits = width.bits() as usize;
    let mut pattern = 0u8;
    for slot in 0..(8 / bits) {
        pattern |= value << (slot * bits);
    }
    let mut buffer = vec![pattern; width.packed_len(count)];
    let used_bits = (count * bits) % 8;
    if used_bits != 0 {
        if let Some(last) = buffer.last_mut() {
            *last &= (1u8 << used_bits) - 1;
        }
    }
    Ok(buffer)
}

/// Re-encode `count` elements from `from` width into a new buffer at `to` width.
///
/// Narrowing is only valid when every element fits the target width.
pub fn repack(
    buffer: &[u8],
    count: usize,
    from: BitWidth,
    to: BitWidth,
) -> Result<Vec<u8>, TeraError> {
    let mut repacked = vec![0u8; to.packed_len(count)];
    for index in 0..count {
        write_element(&mut repacked, index, to, read_element(buffer, index, from))?;
    }
    Ok(repacked)
}

/// Iterate the first `count` elements of `buffer`.
pub fn elements(buffer: &[u8], count: usize, width: BitWidth) -> impl Iterator<Item = u8> + '_ {
    (0..count).map(move |index| read_element(buffer, index, width))
}
