use serde::{Deserialize, Serialize};
use tera_core::constants::{DEFAULT_PALETTE_CEILING, MAX_PALETTE_CEILING, MIN_PALETTE_CEILING};

use crate::array::Representation;
use crate::config::ConfigError;
use crate::dense::DenseArray;
use crate::sparse::{PalettedArray, UniformArray};

/// Representation a uniform array turns into on its first divergent write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PromotionTarget {
    #[default]
    Paletted,
    Dense,
}

/// Rules for choosing between dense and sparse storage.
///
/// Compaction is never implicit: it runs only when the owner calls
/// [`TeraArray::compact`](crate::TeraArray::compact). Promotion on write is
/// automatic and always lossless.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompactionPolicy {
    /// Maximum palette length before a paletted array is promoted to dense.
    pub palette_ceiling: u16,
    pub uniform_promotion: PromotionTarget,
    /// Only compact to a palette when it is strictly smaller than dense storage.
    pub require_savings: bool,
}

impl Default for CompactionPolicy {
    fn default() -> Self {
        Self {
            palette_ceiling: DEFAULT_PALETTE_CEILING,
            uniform_promotion: PromotionTarget::default(),
            require_savings: false,
        }
    }
}

impl CompactionPolicy {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_PALETTE_CEILING..=MAX_PALETTE_CEILING).contains(&self.palette_ceiling) {
            return Err(ConfigError::Invalid(format!(
                "palette_ceiling must be within {}..={} (got {})",
                MIN_PALETTE_CEILING, MAX_PALETTE_CEILING, self.palette_ceiling
            )));
        }
        Ok(())
    }

    /// Effective palette ceiling, clamped to the supported range.
    pub fn palette_ceiling(&self) -> usize {
        self.palette_ceiling
            .clamp(MIN_PALETTE_CEILING, MAX_PALETTE_CEILING) as usize
    }

    /// Pick the cheapest representation for a dense array's contents.
    /// Returns None when the array should stay dense.
    pub fn compact_dense(&self, dense: &DenseArray) -> Option<Representation> {
        let ceiling = self.palette_ceiling();
        let mut seen = [false; 256];
        let mut distinct = 0usize;
        for value in dense.values() {
            if !seen[value as usize] {
                seen[value as usize] = true;
                distinct += 1;
                if distinct > ceiling {
                    return None;
                }
            }
        }

        if distinct == 1 {
            let fill = dense.get_index(0);
            let uniform = UniformArray::new(dense.dims(), dense.bit_width(), fill).ok()?;
            return Some(Representation::Uniform(uniform));
        }

        let paletted = PalettedArray::deflate(dense.dims(), dense.bit_width(), dense.values())?;
        if self.require_savings && paletted.estimated_memory_bytes() >= dense.estimated_memory_bytes()
        {
            return None;
        }
        Some(Representation::Paletted(paletted))
    }

    /// The representation a uniform array becomes when it must hold a second value.
    pub fn promote_uniform(&self, uniform: &UniformArray) -> Representation {
        match self.uniform_promotion {
            PromotionTarget::Paletted => Representation::Paletted(uniform.to_paletted()),
            PromotionTarget::Dense => Representation::Dense(uniform.to_dense()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tera_core::{BitWidth, ChunkDims};

    fn dims(x: u16, y: u16, z: u16) -> ChunkDims {
        ChunkDims::new(x, y, z).expect("valid dims")
    }

    #[test]
    fn test_uniform_dense_compacts_to_uniform() {
        let dense = DenseArray::filled(dims(4, 4, 4), BitWidth::Four, 6).expect("fits");
        let compacted = CompactionPolicy::default().compact_dense(&dense);
        match compacted {
            Some(Representation::Uniform(uniform)) => assert_eq!(uniform.fill_value(), 6),
            other => panic!("expected uniform, got {other:?}"),
        }
    }

    #[test]
    fn test_low_cardinality_compacts_to_paletted() {
        let values: Vec<u8> = (0..64).map(|i| (i % 3) as u8).collect();
        let dense = DenseArray::from_values(dims(4, 4, 4), BitWidth::Eight, &values).expect("fits");
        match CompactionPolicy::default().compact_dense(&dense) {
            Some(Representation::Paletted(paletted)) => {
                assert_eq!(paletted.palette(), &[0, 1, 2]);
                assert_eq!(paletted.values().collect::<Vec<_>>(), values);
            }
            other => panic!("expected paletted, got {other:?}"),
        }
    }

    #[test]
    fn test_high_cardinality_stays_dense() {
        let values: Vec<u8> = (0..64).collect();
        let dense = DenseArray::from_values(dims(4, 4, 4), BitWidth::Eight, &values).expect("fits");
        assert!(CompactionPolicy::default().compact_dense(&dense).is_none());

        let wide = CompactionPolicy {
            palette_ceiling: 64,
            ..Default::default()
        };
        assert!(matches!(
            wide.compact_dense(&dense),
            Some(Representation::Paletted(_))
        ));
    }

    #[test]
    fn test_require_savings_keeps_dense_when_palette_is_larger() {
        // 16 distinct 4-bit values: a 4-bit index is no smaller than the data
        let values: Vec<u8> = (0..64).map(|i| (i % 16) as u8).collect();
        let dense = DenseArray::from_values(dims(4, 4, 4), BitWidth::Four, &values).expect("fits");
        let strict = CompactionPolicy {
            require_savings: true,
            ..Default::default()
        };
        assert!(strict.compact_dense(&dense).is_none());
        assert!(CompactionPolicy::default().compact_dense(&dense).is_some());
    }

    #[test]
    fn test_promote_uniform_target() {
        let uniform = UniformArray::new(dims(2, 2, 2), BitWidth::Four, 1).expect("fits");
        assert!(matches!(
            CompactionPolicy::default().promote_uniform(&uniform),
            Representation::Paletted(_)
        ));
        let dense_first = CompactionPolicy {
            uniform_promotion: PromotionTarget::Dense,
            ..Default::default()
        };
        assert!(matches!(
            dense_first.promote_uniform(&uniform),
            Representation::Dense(_)
        ));
    }

    #[test]
    fn test_validate_ceiling_range() {
        assert!(CompactionPolicy::default().validate().is_ok());
        let too_small = CompactionPolicy {
            palette_ceiling: 1,
            ..Default::default()
        };
        assert!(matches!(too_small.validate(), Err(ConfigError::Invalid(_))));
        assert_eq!(too_small.palette_ceiling(), 2);
        let too_large = CompactionPolicy {
            palette_ceiling: 300,
            ..Default::default()
        };
        assert!(too_large.validate().is_err());
        assert_eq!(too_large.palette_ceiling(), 255);
    }
}
