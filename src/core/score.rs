use crate::core::result::{BenchmarkResult, SpeedupReport};

/// Numerator of the score formula, in milliseconds.
const SCORE_BASE_MS: i64 = 1_000_000;

/// Multiplier applied after the integer division.
const SCORE_SCALE: i64 = 100;

/// Converts elapsed wall-clock milliseconds into a score.
///
/// Faster runs score higher. Non-positive times score zero.
pub fn calculate_score(time_taken_ms: i64) -> u64 {
    if time_taken_ms <= 0 {
        return 0;
    }
    ((SCORE_BASE_MS / time_taken_ms) * SCORE_SCALE) as u64
}

/// Ideal speedup with no serial fraction: the worker count itself.
pub fn theoretical_speedup(worker_count: usize) -> f64 {
    worker_count as f64
}

/// Ratio of multi-thread time to single-thread time.
///
/// Values below 1.0 mean the multi-thread run finished faster.
pub fn actual_speedup(single: &BenchmarkResult, multi: &BenchmarkResult) -> f64 {
    if single.time_taken_ms == 0 {
        return 0.0;
    }
    multi.time_taken_ms as f64 / single.time_taken_ms as f64
}

/// Builds the comparison shown after both modes have run.
pub fn compare(single: BenchmarkResult, multi: BenchmarkResult) -> SpeedupReport {
    let theoretical = theoretical_speedup(multi.workers_used);
    let actual = actual_speedup(&single, &multi);
    let multiplier = if actual > 0.0 { 1.0 / actual } else { 0.0 };
    let efficiency = if theoretical > 0.0 { multiplier / theoretical } else { 0.0 };

    SpeedupReport {
        single,
        multi,
        theoretical_speedup: theoretical,
        actual_speedup: actual,
        speedup_multiplier: multiplier,
        efficiency,
    }
}
