use super::MetricsSnapshot;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub name: String,
    pub ticks: u64,
    pub final_score: u64,
    pub completions: u64,
    pub collisions: u64,
    pub latency_reduction_pct: f64,
    pub load_reduction_pct: f64,
    pub score_per_tick: f64,
}

/// Summarises a run from its snapshot history, first snapshot as baseline.
pub fn analyze(snapshots: &[MetricsSnapshot], name: &str) -> RunReport {
    let (Some(first), Some(last)) = (snapshots.first(), snapshots.last()) else {
        return RunReport {
            name: name.to_string(),
            ticks: 0,
            final_score: 0,
            completions: 0,
            collisions: 0,
            latency_reduction_pct: 0.0,
            load_reduction_pct: 0.0,
            score_per_tick: 0.0,
        };
    };

    RunReport {
        name: name.to_string(),
        ticks: last.tick,
        final_score: last.total_score,
        completions: last.completions,
        collisions: last.collisions,
        latency_reduction_pct: reduction_pct(first.average_latency, last.average_latency),
        load_reduction_pct: reduction_pct(first.average_load, last.average_load),
        score_per_tick: if last.tick > 0 {
            last.total_score as f64 / last.tick as f64
        } else {
            0.0
        },
    }
}

fn reduction_pct(before: f64, after: f64) -> f64 {
    if before <= 0.0 {
        return 0.0;
    }
    (before - after) / before * 100.0
}
