// Rollup stages: snapshots -> hourly rows -> daily rows -> profit windows on the profile.
// Each stage has a pure builder (tested directly) and a `run_*` wrapper that reads and
// writes through StatsRepo.

pub mod daily;
pub mod hourly;
pub mod profit;

pub use daily::{aggregate_daily, run_daily_rollup};
pub use hourly::{build_hourly_records, run_hourly_rollup};
pub use profit::{ProfitWindows, WindowSums, merge_window_sums, run_profit_rollup};

fn mean_f64(v: &[f64]) -> f64 {
    if v.is_empty() {
        return 0.0;
    }
    v.iter().sum::<f64>() / (v.len() as f64)
}

/// max - min of a cumulative counter over a window. Order-independent; 0 for < 2 samples.
fn counter_delta(v: &[f64]) -> f64 {
    if v.is_empty() {
        return 0.0;
    }
    let min = v.iter().copied().fold(f64::INFINITY, f64::min);
    let max = v.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    max - min
}
