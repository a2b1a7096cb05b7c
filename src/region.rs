// Regions are the fixed points of interest agents travel between

use crate::agent::AgentKind;
use crate::error::{SimError, SimResult};
use crate::grid::Position;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

/// Latency and load never decay below this, so scoring keeps a signal.
pub const METRIC_FLOOR: f64 = 1.0;

pub const NEIGHBOR_COUNT: usize = 3;

/// Lowers `current` to `target` without crossing the floor. Values already at
/// or below the floor are left where they are.
pub fn reduce(current: f64, target: f64) -> f64 {
    if current <= METRIC_FLOOR { current } else { target.max(METRIC_FLOOR) }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RegionId(String);

impl RegionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegionStatus {
    Active,
    Degraded,
    Offline,
}

impl Default for RegionStatus {
    fn default() -> Self {
        Self::Active
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Region {
    pub id: RegionId,
    pub display_name: String,
    pub position: Position,
    pub latency: f64,
    pub load: f64,
    pub status: RegionStatus,
    pub neighbor_ids: Vec<RegionId>,
}

impl Region {
    pub fn new(
        id: RegionId,
        display_name: impl Into<String>,
        position: Position,
        latency: f64,
        load: f64,
    ) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            position,
            latency,
            load,
            status: RegionStatus::Active,
            neighbor_ids: Vec::new(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == RegionStatus::Active
    }

    pub fn apply_optimization(&mut self, kind: AgentKind) {
        let (latency_factor, load_factor) = match kind {
            AgentKind::Routing => (0.90, 1.0),
            AgentKind::Processing => (1.0, 0.80),
            AgentKind::Storage => (0.95, 1.0),
            // Continuous intelligence gathering: a little off both
            AgentKind::Analytics => (0.98, 0.98),
        };
        self.latency = reduce(self.latency, self.latency * latency_factor);
        self.load = reduce(self.load, self.load * load_factor);
    }
}

/// Regions in configuration order, indexed by id.
#[derive(Debug, Clone, Default)]
pub struct RegionRegistry {
    regions: Vec<Region>,
    index: HashMap<RegionId, usize>,
}

impl RegionRegistry {
    pub fn new(regions: Vec<Region>) -> Self {
        let index = regions
            .iter()
            .enumerate()
            .map(|(i, r)| (r.id.clone(), i))
            .collect();
        let mut registry = Self { regions, index };
        registry.compute_neighbors(NEIGHBOR_COUNT);
        registry
    }

    /// One-time precomputation of the `k` nearest regions for every region.
    pub fn compute_neighbors(&mut self, k: usize) {
        let positions: Vec<(RegionId, Position)> = self
            .regions
            .iter()
            .map(|r| (r.id.clone(), r.position))
            .collect();

        for (i, region) in self.regions.iter_mut().enumerate() {
            let mut others: Vec<(f64, &RegionId)> = positions
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .map(|(_, (id, pos))| (region.position.distance(pos), id))
                .collect();
            // Stable sort keeps registry order on ties
            others.sort_by(|a, b| a.0.total_cmp(&b.0));
            region.neighbor_ids = others.into_iter().take(k).map(|(_, id)| id.clone()).collect();
        }
    }

    pub fn get(&self, id: &RegionId) -> SimResult<&Region> {
        self.index
            .get(id)
            .map(|&i| &self.regions[i])
            .ok_or_else(|| SimError::UnknownRegion { id: id.to_string() })
    }

    pub fn get_mut(&mut self, id: &RegionId) -> SimResult<&mut Region> {
        match self.index.get(id) {
            Some(&i) => Ok(&mut self.regions[i]),
            None => Err(SimError::UnknownRegion { id: id.to_string() }),
        }
    }

    pub fn apply_optimization(&mut self, id: &RegionId, kind: AgentKind) -> SimResult<()> {
        let region = self.get_mut(id)?;
        let before = (region.latency, region.load);
        region.apply_optimization(kind);
        debug!(
            "Region {} optimized by {:?}: latency {:.2} -> {:.2}, load {:.2} -> {:.2}",
            id, kind, before.0, region.latency, before.1, region.load
        );
        Ok(())
    }

    pub fn set_status(&mut self, id: &RegionId, status: RegionStatus) -> SimResult<()> {
        self.get_mut(id)?.status = status;
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Region> {
        self.regions.iter()
    }

    pub fn within(&self, center: Position, radius: f64) -> Vec<RegionId> {
        self.regions
            .iter()
            .filter(|r| r.position.distance(&center) <= radius)
            .map(|r| r.id.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(id: &str, x: i32, y: i32, latency: f64, load: f64) -> Region {
        Region::new(RegionId::new(id), id, Position::new(x, y), latency, load)
    }

    #[test]
    fn neighbors_are_nearest_three() {
        let registry = RegionRegistry::new(vec![
            region("a", 0, 0, 10.0, 10.0),
            region("b", 1, 0, 10.0, 10.0),
            region("c", 5, 0, 10.0, 10.0),
            region("d", 0, 2, 10.0, 10.0),
            region("e", 15, 15, 10.0, 10.0),
        ]);
        let a = registry.get(&RegionId::new("a")).unwrap();
        let ids: Vec<&str> = a.neighbor_ids.iter().map(|id| id.as_str()).collect();
        assert_eq!(ids, vec!["b", "d", "c"]);
    }

    #[test]
    fn optimization_effects_per_kind() {
        let mut r = region("x", 0, 0, 200.0, 80.0);
        r.apply_optimization(AgentKind::Routing);
        assert!((r.latency - 180.0).abs() < 1e-9);
        r.apply_optimization(AgentKind::Processing);
        assert!((r.load - 64.0).abs() < 1e-9);
        r.apply_optimization(AgentKind::Storage);
        assert!((r.latency - 171.0).abs() < 1e-9);
        r.apply_optimization(AgentKind::Analytics);
        assert!((r.latency - 167.58).abs() < 1e-9);
        assert!((r.load - 62.72).abs() < 1e-9);
    }

    #[test]
    fn optimization_floors_above_zero() {
        let mut r = region("x", 0, 0, 1.05, 1.1);
        for _ in 0..50 {
            r.apply_optimization(AgentKind::Routing);
            r.apply_optimization(AgentKind::Processing);
        }
        assert_eq!(r.latency, METRIC_FLOOR);
        assert_eq!(r.load, METRIC_FLOOR);
    }

    #[test]
    fn values_below_floor_are_never_raised() {
        let mut r = region("x", 0, 0, 0.0, 0.5);
        r.apply_optimization(AgentKind::Analytics);
        assert_eq!(r.latency, 0.0);
        assert_eq!(r.load, 0.5);
    }

    #[test]
    fn unknown_region_is_an_error() {
        let mut registry = RegionRegistry::new(vec![region("a", 0, 0, 10.0, 10.0)]);
        let err = registry
            .apply_optimization(&RegionId::new("nope"), AgentKind::Routing)
            .unwrap_err();
        assert_eq!(err, SimError::UnknownRegion { id: "nope".into() });
    }
}
