use std::path::{Path, PathBuf};
use std::process;

use tera_bench::report;
use tera_bench::runner::BenchmarkRunner;
use tera_bench::scenes;
use tera_blockdata::CompactionPolicy;

fn usage() {
    eprintln!("Usage: bench-runner [OPTIONS]");
    eprintln!("  --baseline <path>              Load baseline JSON for comparison");
    eprintln!("  --output <path>                Save current results as JSON baseline");
    eprintln!("  --regression-threshold <pct>   Regression threshold percentage (default: 10)");
    eprintln!("  --iterations <n>               Iterations per measurement (default: 20)");
    eprintln!("  --policy <path>                Compaction policy RON file");
}

/// Value following a flag, or exit with an error.
fn flag_value<'a>(args: &'a [String], i: usize, flag: &str) -> &'a str {
    match args.get(i) {
        Some(value) => value.as_str(),
        None => {
            eprintln!("Missing value for {flag}");
            process::exit(1);
        }
    }
}

fn parse_or_exit<T: std::str::FromStr>(value: &str, flag: &str) -> T {
    value.parse().unwrap_or_else(|_| {
        eprintln!("Invalid {flag} value: {value}");
        process::exit(1);
    })
}

fn load_policy(path: &Path) -> CompactionPolicy {
    let contents = std::fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("Failed to read policy {}: {e}", path.display());
        process::exit(1);
    });
    tera_blockdata::load_policy_from_str(&contents).unwrap_or_else(|e| {
        eprintln!("Failed to load policy {}: {e}", path.display());
        process::exit(1);
    })
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();

    let mut baseline_path: Option<PathBuf> = None;
    let mut output_path: Option<PathBuf> = None;
    let mut regression_threshold = 10.0f64;
    let mut iterations = 20u32;
    let mut policy = CompactionPolicy::default();

    let mut i = 1;
    while i < args.len() {
        let flag = args[i].as_str();
        match flag {
            "--baseline" => {
                i += 1;
                baseline_path = Some(PathBuf::from(flag_value(&args, i, flag)));
            }
            "--output" => {
                i += 1;
                output_path = Some(PathBuf::from(flag_value(&args, i, flag)));
            }
            "--regression-threshold" => {
                i += 1;
                regression_threshold = parse_or_exit(flag_value(&args, i, flag), flag);
            }
            "--iterations" => {
                i += 1;
                iterations = parse_or_exit(flag_value(&args, i, flag), flag);
            }
            "--policy" => {
                i += 1;
                policy = load_policy(Path::new(flag_value(&args, i, flag)));
            }
            "--help" | "-h" => {
                usage();
                process::exit(0);
            }
            other => {
                eprintln!("Unknown argument: {}", other);
                process::exit(1);
            }
        }
        i += 1;
    }

    log::info!(
        "Benchmarking with palette ceiling {} and {} iterations",
        policy.palette_ceiling(),
        iterations
    );
    let runner = BenchmarkRunner::new(iterations, policy);

    let results: Vec<_> = scenes::standard_scenes()
        .iter()
        .map(|config| runner.run_scene(config))
        .collect();

    println!("\n## Benchmark Results\n");
    println!("{}", report::format_markdown(&results));

    if let Some(ref path) = output_path {
        let baseline = report::Baseline {
            timestamp: run_timestamp(),
            results: results.clone(),
        };
        match report::save_baseline(path, &baseline) {
            Ok(()) => log::info!("Saved baseline to {}", path.display()),
            Err(e) => {
                eprintln!("Failed to save baseline {}: {e}", path.display());
                process::exit(1);
            }
        }
    }

    if let Some(ref path) = baseline_path {
        if let Some(baseline) = report::load_baseline(path) {
            let regressions = report::compare(&results, &baseline, regression_threshold);
            println!(
                "{}",
                report::format_comparison(&regressions, regression_threshold)
            );
            if !regressions.is_empty() {
                eprintln!(
                    "ERROR: {} regressions detected, exiting with code 1",
                    regressions.len()
                );
                process::exit(1);
            }
        } else {
            log::warn!("Baseline file not found: {}", path.display());
        }
    }

    if results.iter().any(|r| !r.verified) {
        eprintln!("ERROR: one or more scenes failed value verification");
        process::exit(1);
    }

    log::info!("Benchmark complete.");
}

/// Seconds since the Unix epoch, prefixed for readability.
fn run_timestamp() -> String {
    let secs = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    format!("bench-{secs}")
}
