pub mod analyzer;
pub mod logger;

use crate::agent::AgentKind;
use crate::simulation::TickReport;
use crate::snapshot::StatusSnapshot;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub tick: u64,
    pub elapsed_s: f64,
    pub total_score: u64,
    pub completions: u64,
    pub collisions: u64,
    pub average_latency: f64,
    pub average_load: f64,
    pub healthy_regions: usize,
}

/// Cheap to clone; every clone shares the same history.
#[derive(Debug, Clone)]
pub struct MetricsCollector {
    inner: Arc<RwLock<MetricsInner>>,
}

#[derive(Debug)]
struct MetricsInner {
    started: Instant,
    ticks: u64,
    completions: u64,
    collisions: u64,
    points_by_kind: HashMap<AgentKind, u64>,
    snapshots: Vec<MetricsSnapshot>,
}

impl MetricsInner {
    fn new() -> Self {
        Self {
            started: Instant::now(),
            ticks: 0,
            completions: 0,
            collisions: 0,
            points_by_kind: HashMap::new(),
            snapshots: Vec::new(),
        }
    }
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(MetricsInner::new())),
        }
    }

    pub fn record_tick(&self, report: &TickReport) {
        let mut inner = self.inner.write();
        inner.ticks = inner.ticks.max(report.tick);
        inner.collisions += report.collisions as u64;
        inner.completions += report.completions.len() as u64;
        for event in &report.completions {
            let points = inner.points_by_kind.entry(event.agent_kind).or_insert(0);
            *points = points.saturating_add(event.points);
        }
    }

    pub fn snapshot_of(&self, status: &StatusSnapshot) -> MetricsSnapshot {
        let inner = self.inner.read();
        MetricsSnapshot {
            tick: status.tick,
            elapsed_s: inner.started.elapsed().as_secs_f64(),
            total_score: status.total_score,
            completions: inner.completions,
            collisions: inner.collisions,
            average_latency: status.average_latency,
            average_load: status.average_load,
            healthy_regions: status.healthy_regions,
        }
    }

    pub fn save_snapshot(&self, status: &StatusSnapshot) {
        let snapshot = self.snapshot_of(status);
        self.inner.write().snapshots.push(snapshot);
    }

    pub fn get_snapshots(&self) -> Vec<MetricsSnapshot> {
        self.inner.read().snapshots.clone()
    }

    pub fn ticks(&self) -> u64 {
        self.inner.read().ticks
    }

    pub fn completions(&self) -> u64 {
        self.inner.read().completions
    }

    pub fn points_by_kind(&self) -> HashMap<AgentKind, u64> {
        self.inner.read().points_by_kind.clone()
    }

    pub fn reset(&self) {
        *self.inner.write() = MetricsInner::new();
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}
