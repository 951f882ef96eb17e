use std::path::Path;

use crate::runner::BenchmarkResult;

/// A complete baseline containing results from all scenes.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Baseline {
    pub timestamp: String,
    pub results: Vec<BenchmarkResult>,
}

/// Load a baseline from a JSON file. Returns None if the file is missing or unreadable.
pub fn load_baseline(path: &Path) -> Option<Baseline> {
    let contents = std::fs::read_to_string(path).ok()?;
    serde_json::from_str(&contents).ok()
}

pub fn save_baseline(path: &Path, baseline: &Baseline) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(baseline).map_err(std::io::Error::other)?;
    std::fs::write(path, json)
}

/// A scene that got slower or bigger than its baseline.
#[derive(Debug, Clone, PartialEq)]
pub struct Regression {
    pub scene_name: String,
    pub metric: &'static str,
    pub pct_change: f64,
}

fn pct_change(current: f64, base: f64) -> Option<f64> {
    if base <= 0.0 {
        return None;
    }
    Some((current - base) / base * 100.0)
}

/// Compare current results against a baseline. Read-sweep time and
/// compacted size are checked against `threshold_pct`.
pub fn compare(
    current: &[BenchmarkResult],
    baseline: &Baseline,
    threshold_pct: f64,
) -> Vec<Regression> {
    let mut regressions = Vec::new();

    for result in current {
        let Some(base) = baseline
            .results
            .iter()
            .find(|b| b.scene_name == result.scene_name)
        else {
            continue;
        };

        let metrics = [
            ("get", result.get_sweep.mean_ms, base.get_sweep.mean_ms),
            (
                "memory",
                result.compacted_bytes as f64,
                base.compacted_bytes as f64,
            ),
        ];
        for (metric, now, before) in metrics {
            if let Some(pct) = pct_change(now, before) {
                if pct > threshold_pct {
                    regressions.push(Regression {
                        scene_name: result.scene_name.clone(),
                        metric,
                        pct_change: pct,
                    });
                }
            }
        }
    }

    regressions
}

/// Format results as a markdown summary table.
pub fn format_markdown(results: &[BenchmarkResult]) -> String {
    let mut out = String::new();
    out.push_str("| Scene | Repr | Dense (B) | Compact (B) | Ratio | Wire (B) | LZ4 (B) | Get (ms) | Set (ms) | Compact (ms) | Round-trip (ms) | OK |\n");
    out.push_str("|-------|------|-----------|-------------|-------|----------|---------|----------|----------|--------------|-----------------|----|\n");

    for r in results {
        out.push_str(&format!(
            "| {} | {:?} | {} | {} | {:.3} | {} | {} | {:.3} | {:.3} | {:.3} | {:.3} | {} |\n",
            r.scene_name,
            r.representation,
            r.dense_bytes,
            r.compacted_bytes,
            r.compaction_ratio(),
            r.serialized_bytes,
            r.compressed_bytes,
            r.get_sweep.mean_ms,
            r.set_sweep.mean_ms,
            r.compact.mean_ms,
            r.roundtrip.mean_ms,
            if r.verified { "yes" } else { "NO" },
        ));
    }

    out
}

/// Format a comparison report showing regressions.
pub fn format_comparison(regressions: &[Regression], threshold_pct: f64) -> String {
    if regressions.is_empty() {
        return format!(
            "All scenes within {:.0}% threshold. No regressions detected.\n",
            threshold_pct
        );
    }

    let mut out = String::new();
    out.push_str(&format!(
        "REGRESSIONS DETECTED (>{:.0}% threshold):\n",
        threshold_pct
    ));
    for r in regressions {
        out.push_str(&format!("  - {} [{}]: +{:.1}%\n", r.scene_name, r.metric, r.pct_change));
    }
    out
}
