use crate::agent::{Agent, AgentKind};
use crate::error::{SimError, SimResult};
use crate::grid::{Heading, Position, MAX_GRID_SIZE, MIN_GRID_SIZE};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionSpec {
    pub id: String,
    pub display_name: String,
    pub x: i32,
    pub y: i32,
    pub latency: f64,
    #[serde(default = "default_load")]
    pub load: f64,
}

fn default_load() -> f64 {
    50.0
}

impl RegionSpec {
    pub fn new(id: &str, display_name: &str, x: i32, y: i32, latency: f64, load: f64) -> Self {
        Self {
            id: id.to_string(),
            display_name: display_name.to_string(),
            x,
            y,
            latency,
            load,
        }
    }

    pub fn position(&self) -> Position {
        Position::new(self.x, self.y)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSpec {
    pub kind: AgentKind,
    pub x: i32,
    pub y: i32,
    pub heading: Heading,
    #[serde(default = "default_speed_tier")]
    pub speed_tier: u32,
}

fn default_speed_tier() -> u32 {
    1
}

impl AgentSpec {
    pub fn new(kind: AgentKind, x: i32, y: i32, heading: Heading) -> Self {
        Self { kind, x, y, heading, speed_tier: 1 }
    }

    pub fn position(&self) -> Position {
        Position::new(self.x, self.y)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub name: String,
    pub grid_size: u32,
    pub tick_period_ms: u64,
    pub regions: Vec<RegionSpec>,
    pub agents: Vec<AgentSpec>,
    pub coverage_interval: u64,
    pub coverage_radius: f64,
    pub rebalance_interval: u64,
    pub rebalance_radius: f64,
    pub event_capacity: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            name: "default_sim".to_string(),
            grid_size: 20,
            tick_period_ms: 150,
            regions: vec![
                RegionSpec::new("us-east", "US East (Virginia)", 4, 4, 45.0, 60.0),
                RegionSpec::new("us-west", "US West (Oregon)", 2, 10, 80.0, 40.0),
                RegionSpec::new("eu-west", "EU West (Ireland)", 9, 3, 110.0, 55.0),
                RegionSpec::new("eu-central", "EU Central (Frankfurt)", 12, 6, 95.0, 70.0),
                RegionSpec::new("ap-south", "Asia Pacific (Mumbai)", 15, 12, 175.0, 75.0),
                RegionSpec::new("ap-northeast", "Asia Pacific (Tokyo)", 17, 4, 160.0, 50.0),
                RegionSpec::new("sa-east", "South America (Sao Paulo)", 6, 16, 210.0, 45.0),
                RegionSpec::new("edge-1", "Edge PoP 1", 10, 10, 30.0, 50.0),
            ],
            agents: vec![
                AgentSpec::new(AgentKind::Routing, 2, 2, Heading::East),
                AgentSpec::new(AgentKind::Processing, 2, 17, Heading::East),
                AgentSpec::new(AgentKind::Storage, 17, 2, Heading::West),
                AgentSpec::new(AgentKind::Analytics, 17, 17, Heading::West),
            ],
            coverage_interval: 5,
            coverage_radius: 4.0,
            rebalance_interval: 10,
            rebalance_radius: 6.0,
            event_capacity: 256,
        }
    }
}

impl SimConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: SimConfig = serde_json::from_str(&content)
            .with_context(|| format!("parsing config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_period_ms)
    }

    pub fn with_grid_size(mut self, size: u32) -> Self {
        self.grid_size = size;
        self
    }

    pub fn with_tick_period(mut self, period: Duration) -> Self {
        self.tick_period_ms = period.as_millis() as u64;
        self
    }

    pub fn with_regions(mut self, regions: Vec<RegionSpec>) -> Self {
        self.regions = regions;
        self
    }

    pub fn with_agents(mut self, agents: Vec<AgentSpec>) -> Self {
        self.agents = agents;
        self
    }

    pub fn validate(&self) -> SimResult<()> {
        if self.grid_size < MIN_GRID_SIZE {
            return Err(SimError::invalid(format!(
                "grid size {} is below {}",
                self.grid_size, MIN_GRID_SIZE
            )));
        }
        if self.grid_size > MAX_GRID_SIZE {
            return Err(SimError::invalid(format!(
                "grid size {} exceeds {}",
                self.grid_size, MAX_GRID_SIZE
            )));
        }
        if self.tick_period_ms == 0 {
            return Err(SimError::invalid("tick period must be non-zero"));
        }
        if self.event_capacity == 0 {
            return Err(SimError::invalid("event capacity must be non-zero"));
        }

        let size = self.grid_size as i32;
        let in_bounds = |p: Position| p.x >= 0 && p.y >= 0 && p.x < size && p.y < size;

        let mut ids = HashSet::new();
        let mut cells = HashSet::new();
        for region in &self.regions {
            if region.id.trim().is_empty() {
                return Err(SimError::invalid("region id must not be empty"));
            }
            if !ids.insert(region.id.as_str()) {
                return Err(SimError::invalid(format!("duplicate region id {}", region.id)));
            }
            if !in_bounds(region.position()) {
                return Err(SimError::invalid(format!(
                    "region {} at ({}, {}) is outside the grid",
                    region.id, region.x, region.y
                )));
            }
            if !cells.insert(region.position()) {
                return Err(SimError::invalid(format!(
                    "region {} shares cell ({}, {}) with another region",
                    region.id, region.x, region.y
                )));
            }
            if !region.latency.is_finite() || region.latency < 0.0 {
                return Err(SimError::invalid(format!(
                    "region {} has invalid latency {}",
                    region.id, region.latency
                )));
            }
            if !(0.0..=100.0).contains(&region.load) {
                return Err(SimError::invalid(format!(
                    "region {} has load {} outside [0, 100]",
                    region.id, region.load
                )));
            }
        }

        if self.agents.is_empty() {
            return Err(SimError::invalid("at least one agent is required"));
        }
        for (i, agent) in self.agents.iter().enumerate() {
            if agent.speed_tier == 0 {
                return Err(SimError::invalid(format!("agent {} has speed tier 0", i)));
            }
            let trail = Agent::initial_trail(agent.position(), agent.heading);
            if let Some(bad) = trail.iter().find(|p| !in_bounds(**p)) {
                return Err(SimError::invalid(format!(
                    "agent {} ({:?}) initial trail leaves the grid at ({}, {})",
                    i, agent.kind, bad.x, bad.y
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_invalid(config: SimConfig) {
        assert!(matches!(config.validate(), Err(SimError::InvalidConfiguration { .. })));
    }

    #[test]
    fn default_config_is_valid() {
        SimConfig::default().validate().unwrap();
    }

    #[test]
    fn rejects_malformed_regions() {
        let base = SimConfig::default();
        let mut dup = base.clone();
        dup.regions.push(RegionSpec::new("us-east", "again", 0, 19, 10.0, 10.0));
        assert_invalid(dup);

        assert_invalid(base.clone().with_regions(vec![RegionSpec::new("x", "x", 20, 0, 10.0, 10.0)]));
        assert_invalid(base.clone().with_regions(vec![RegionSpec::new("x", "x", 1, 1, -1.0, 10.0)]));
        assert_invalid(base.clone().with_regions(vec![RegionSpec::new("x", "x", 1, 1, 10.0, 101.0)]));
        assert_invalid(base.with_regions(vec![
            RegionSpec::new("a", "a", 1, 1, 10.0, 10.0),
            RegionSpec::new("b", "b", 1, 1, 10.0, 10.0),
        ]));
    }

    #[test]
    fn rejects_agents_whose_trail_leaves_the_grid() {
        let config = SimConfig::default()
            .with_agents(vec![AgentSpec::new(AgentKind::Routing, 1, 5, Heading::East)]);
        assert_invalid(config);
    }

    #[test]
    fn rejects_oversized_grid() {
        assert_invalid(SimConfig::default().with_grid_size(MAX_GRID_SIZE + 1));
        assert_invalid(SimConfig::default().with_grid_size(50_000));
        assert_invalid(SimConfig::default().with_grid_size(u32::MAX));
        SimConfig::default().with_grid_size(MAX_GRID_SIZE).validate().unwrap();
    }

    #[test]
    fn rejects_empty_agent_list_and_tiny_grid() {
        assert_invalid(SimConfig::default().with_agents(Vec::new()));
        assert_invalid(
            SimConfig::default()
                .with_grid_size(2)
                .with_regions(Vec::new())
                .with_agents(vec![AgentSpec::new(AgentKind::Routing, 0, 0, Heading::West)]),
        );
    }

    #[test]
    fn load_defaults_when_omitted_from_json() {
        let json = r#"{
            "name": "tiny",
            "grid_size": 10,
            "regions": [{"id": "r", "display_name": "R", "x": 3, "y": 3, "latency": 12.0}],
            "agents": [{"kind": "Storage", "x": 5, "y": 5, "heading": "North"}]
        }"#;
        let config: SimConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.regions[0].load, 50.0);
        assert_eq!(config.agents[0].speed_tier, 1);
        assert_eq!(config.tick_period_ms, 150);
        config.validate().unwrap();
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sim.json");
        std::fs::write(&path, serde_json::to_string(&SimConfig::default()).unwrap()).unwrap();
        let config = SimConfig::from_json_file(&path).unwrap();
        assert_eq!(config.regions.len(), 8);
    }
}
