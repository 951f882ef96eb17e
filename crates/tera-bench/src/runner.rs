use std::hint::black_box;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tera_blockdata::{CompactionPolicy, RepresentationKind, TeraArray};

use crate::scenes::{self, SceneConfig};

/// Timing statistics over a series of iterations, in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingSeries {
    pub mean_ms: f64,
    pub median_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
}

/// Result of a single scene benchmark.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkResult {
    pub scene_name: String,
    pub dims: [u16; 3],
    pub bit_width: u8,
    pub representation: RepresentationKind,
    pub dense_bytes: usize,
    pub compacted_bytes: usize,
    pub serialized_bytes: usize,
    pub compressed_bytes: usize,
    /// Full read sweep over the compacted array.
    pub get_sweep: TimingSeries,
    /// Full write sweep starting from the compacted array.
    pub set_sweep: TimingSeries,
    pub compact: TimingSeries,
    /// Serialize followed by deserialize.
    pub roundtrip: TimingSeries,
    /// Whether every stage preserved the scene's cell values.
    pub verified: bool,
}

impl BenchmarkResult {
    /// Compacted size as a fraction of dense size.
    pub fn compaction_ratio(&self) -> f64 {
        if self.dense_bytes == 0 {
            return 1.0;
        }
        self.compacted_bytes as f64 / self.dense_bytes as f64
    }
}

/// Runs the storage benchmarks on the CPU.
pub struct BenchmarkRunner {
    iterations: u32,
    policy: CompactionPolicy,
}

impl BenchmarkRunner {
    pub fn new(iterations: u32, policy: CompactionPolicy) -> Self {
        Self {
            iterations: iterations.max(1),
            policy,
        }
    }

    /// Run a single benchmark scene and return sizes and timings.
    pub fn run_scene(&self, config: &SceneConfig) -> BenchmarkResult {
        log::info!(
            "Running scene '{}' ({}, {})...",
            config.name,
            config.dims,
            config.bit_width
        );

        let dense = scenes::generate_scene(config).with_policy(self.policy);
        let expected = dense.to_values();
        let dense_bytes = dense.estimated_memory_bytes();

        let mut compacted = dense.copy();
        let representation = compacted.compact();
        let compacted_bytes = compacted.estimated_memory_bytes();
        log::info!(
            "  {:?}: {} -> {} bytes",
            representation,
            dense_bytes,
            compacted_bytes
        );

        let payload = compacted.serialize();
        let compressed = compacted.to_compressed_bytes();

        let mut verified = compacted.to_values() == expected;
        match TeraArray::deserialize(&payload) {
            Ok(decoded) => verified &= decoded == dense,
            Err(err) => {
                log::error!("  Scene '{}' failed to decode: {err}", config.name);
                verified = false;
            }
        }
        match TeraArray::from_compressed_bytes(&compressed) {
            Ok(decoded) => verified &= decoded == dense,
            Err(err) => {
                log::error!("  Scene '{}' failed to decompress: {err}", config.name);
                verified = false;
            }
        }
        if !verified {
            log::error!("  Scene '{}' did not round-trip its values", config.name);
        }

        let get_sweep = self.time(|| {
            let size = compacted.dims().as_uvec3();
            let mut acc = 0u32;
            for y in 0..size.y {
                for z in 0..size.z {
                    for x in 0..size.x {
                        acc = acc.wrapping_add(compacted.get(x, y, z) as u32);
                    }
                }
            }
            black_box(acc);
        });

        let max_value = config.bit_width.max_value();
        let set_sweep = self.time(|| {
            let mut array = compacted.copy();
            let size = array.dims().as_uvec3();
            for y in 0..size.y {
                for z in 0..size.z {
                    for x in 0..size.x {
                        let value = ((x ^ y ^ z) as u8) & max_value;
                        let _ = black_box(array.set(x, y, z, value));
                    }
                }
            }
            black_box(array);
        });

        let compact = self.time(|| {
            let mut array = dense.copy();
            black_box(array.compact());
        });

        let roundtrip = self.time(|| {
            let bytes = compacted.serialize();
            let _ = black_box(TeraArray::deserialize(&bytes));
        });

        log::info!(
            "  Done: get={:.3}ms, set={:.3}ms, compact={:.3}ms, roundtrip={:.3}ms",
            get_sweep.mean_ms,
            set_sweep.mean_ms,
            compact.mean_ms,
            roundtrip.mean_ms
        );

        BenchmarkResult {
            scene_name: config.name.to_string(),
            dims: config.dims.into(),
            bit_width: config.bit_width.bits(),
            representation,
            dense_bytes,
            compacted_bytes,
            serialized_bytes: payload.len(),
            compressed_bytes: compressed.len(),
            get_sweep,
            set_sweep,
            compact,
            roundtrip,
            verified,
        }
    }

    fn time(&self, mut f: impl FnMut()) -> TimingSeries {
        let mut times = Vec::with_capacity(self.iterations as usize);
        for _ in 0..self.iterations {
            let start = Instant::now();
            f();
            times.push(start.elapsed().as_secs_f64() * 1000.0);
        }
        compute_timings(&times)
    }
}

/// Compute timing statistics from a list of run times in milliseconds.
pub fn compute_timings(times: &[f64]) -> TimingSeries {
    if times.is_empty() {
        return TimingSeries {
            mean_ms: 0.0,
            median_ms: 0.0,
            p95_ms: 0.0,
            p99_ms: 0.0,
            min_ms: 0.0,
            max_ms: 0.0,
        };
    }

    let mut sorted = times.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let n = sorted.len();
    let mean = sorted.iter().sum::<f64>() / n as f64;
    let median = if n % 2 == 0 {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    } else {
        sorted[n / 2]
    };
    let p95_idx = ((n as f64) * 0.95).ceil() as usize;
    let p99_idx = ((n as f64) * 0.99).ceil() as usize;

    TimingSeries {
        mean_ms: mean,
        median_ms: median,
        p95_ms: sorted[p95_idx.min(n - 1)],
        p99_ms: sorted[p99_idx.min(n - 1)],
        min_ms: sorted[0],
        max_ms: sorted[n - 1],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenes::ScenePattern;
    use tera_blockdata::{BitWidth, ChunkDims};

    #[test]
    fn test_compute_timings_empty() {
        let t = compute_timings(&[]);
        assert_eq!(t.mean_ms, 0.0);
        assert_eq!(t.max_ms, 0.0);
    }

    #[test]
    fn test_compute_timings_stats() {
        let t = compute_timings(&[4.0, 1.0, 3.0, 2.0]);
        assert_eq!(t.min_ms, 1.0);
        assert_eq!(t.max_ms, 4.0);
        assert_eq!(t.mean_ms, 2.5);
        assert_eq!(t.median_ms, 2.5);
        assert_eq!(t.p95_ms, 4.0);
    }

    #[test]
    fn test_run_scene_reports_sizes() {
        let runner = BenchmarkRunner::new(2, CompactionPolicy::default());
        let config = SceneConfig {
            name: "strata",
            pattern: ScenePattern::Strata,
            dims: ChunkDims::new(4, 128, 4).expect("valid dims"),
            bit_width: BitWidth::Eight,
        };
        let result = runner.run_scene(&config);
        assert!(result.verified);
        assert_eq!(result.representation, RepresentationKind::Paletted);
        assert_eq!(result.dims, [4, 128, 4]);
        // five strata under a 4-bit index
        assert_eq!(result.serialized_bytes, tera_blockdata::format::HEADER_SIZE + 1 + 5 + 1 + 1024);
        assert!(result.compacted_bytes < result.dense_bytes);
        assert!(result.compaction_ratio() < 1.0);
    }
}
