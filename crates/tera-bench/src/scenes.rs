use glam::UVec3;
use tera_blockdata::TeraArray;
use tera_core::{BitWidth, ChunkDims};

/// Block ids used by the synthetic scenes.
const AIR: u8 = 0;
const BEDROCK: u8 = 1;
const STONE: u8 = 2;
const DIRT: u8 = 3;
const GRASS: u8 = 4;
const COAL: u8 = 5;
const IRON: u8 = 6;
const WATER: u8 = 7;

/// Height of the terrain surface in the layered scenes.
const SURFACE_Y: u32 = 64;

/// How cell values are generated for a scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenePattern {
    /// Every cell empty.
    Air,
    /// Every cell the same solid block.
    Stone,
    /// Flat horizontal layers of a handful of block types.
    Strata,
    /// Layers with scattered cave pockets, ores and water.
    Caves,
    /// 4-bit light levels falling off below the surface.
    Light,
    /// Every value of the 8-bit range, no structure.
    Noise,
}

/// Configuration for a single benchmark scene.
pub struct SceneConfig {
    pub name: &'static str,
    pub pattern: ScenePattern,
    pub dims: ChunkDims,
    pub bit_width: BitWidth,
}

/// Return the standard suite of benchmark scenes, from trivially uniform to
/// incompressible.
pub fn standard_scenes() -> Vec<SceneConfig> {
    let chunk = ChunkDims::CHUNK;
    vec![
        SceneConfig {
            name: "air",
            pattern: ScenePattern::Air,
            dims: chunk,
            bit_width: BitWidth::Eight,
        },
        SceneConfig {
            name: "stone",
            pattern: ScenePattern::Stone,
            dims: chunk,
            bit_width: BitWidth::Eight,
        },
        SceneConfig {
            name: "strata",
            pattern: ScenePattern::Strata,
            dims: chunk,
            bit_width: BitWidth::Eight,
        },
        SceneConfig {
            name: "caves",
            pattern: ScenePattern::Caves,
            dims: chunk,
            bit_width: BitWidth::Eight,
        },
        SceneConfig {
            name: "light",
            pattern: ScenePattern::Light,
            dims: chunk,
            bit_width: BitWidth::Four,
        },
        SceneConfig {
            name: "noise",
            pattern: ScenePattern::Noise,
            dims: chunk,
            bit_width: BitWidth::Eight,
        },
    ]
}

/// Deterministic per-cell hash; callers reduce it to the range they need.
fn cell_hash(pos: UVec3) -> u32 {
    let h = pos.x.wrapping_mul(73_856_093) ^ pos.y.wrapping_mul(19_349_663) ^ pos.z.wrapping_mul(83_492_791);
    h.wrapping_mul(2_654_435_761) >> 7
}

fn strata_block(y: u32) -> u8 {
    match y {
        0..=3 => BEDROCK,
        4..=59 => STONE,
        60..=62 => DIRT,
        63 => GRASS,
        _ => AIR,
    }
}

/// Value of one cell for the given pattern.
pub fn scene_value(pattern: ScenePattern, pos: UVec3) -> u8 {
    match pattern {
        ScenePattern::Air => AIR,
        ScenePattern::Stone => STONE,
        ScenePattern::Strata => strata_block(pos.y),
        ScenePattern::Caves => {
            let base = strata_block(pos.y);
            if base != STONE {
                return base;
            }
            match cell_hash(pos) % 100 {
                0..=11 => AIR,
                12..=14 => COAL,
                15 => IRON,
                16..=17 => WATER,
                _ => STONE,
            }
        }
        ScenePattern::Light => {
            if pos.y >= SURFACE_Y {
                15
            } else {
                15u32.saturating_sub((SURFACE_Y - pos.y) / 2) as u8
            }
        }
        ScenePattern::Noise => (cell_hash(pos) & 0xFF) as u8,
    }
}

/// Build the scene as a dense array, written cell by cell.
pub fn generate_scene(config: &SceneConfig) -> TeraArray {
    let mut array = TeraArray::new_dense(config.dims, config.bit_width);
    let size = config.dims.as_uvec3();
    for y in 0..size.y {
        for z in 0..size.z {
            for x in 0..size.x {
                let pos = UVec3::new(x, y, z);
                array
                    .set_at(pos, scene_value(config.pattern, pos))
                    .expect("scene values fit the bit width");
            }
        }
    }
    array
}
