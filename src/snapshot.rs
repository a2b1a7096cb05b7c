//! Owned, serializable views of engine state handed out to callers.

use crate::agent::{Agent, AgentId, AgentKind};
use crate::grid::{Heading, Position};
use crate::region::{Region, RegionId, RegionStatus};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSummary {
    pub id: AgentId,
    pub kind: AgentKind,
    pub head: Position,
    pub trail: Vec<Position>,
    pub heading: Heading,
    pub current_objective: Option<RegionId>,
    pub score: u64,
    pub speed_tier: u32,
    pub coverage: Vec<RegionId>,
}

impl From<&Agent> for AgentSummary {
    fn from(agent: &Agent) -> Self {
        Self {
            id: agent.id,
            kind: agent.kind,
            head: agent.head(),
            trail: agent.trail().map(|s| s.position).collect(),
            heading: agent.heading,
            current_objective: agent.current_objective.clone(),
            score: agent.score,
            speed_tier: agent.speed_tier,
            coverage: agent.coverage.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionSummary {
    pub id: RegionId,
    pub display_name: String,
    pub position: Position,
    pub latency: f64,
    pub load: f64,
    pub status: RegionStatus,
    pub neighbor_ids: Vec<RegionId>,
}

impl From<&Region> for RegionSummary {
    fn from(region: &Region) -> Self {
        Self {
            id: region.id.clone(),
            display_name: region.display_name.clone(),
            position: region.position,
            latency: region.latency,
            load: region.load,
            status: region.status,
            neighbor_ids: region.neighbor_ids.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub tick: u64,
    pub running: bool,
    pub total_score: u64,
    pub active_agents: usize,
    pub healthy_regions: usize,
    pub average_latency: f64,
    pub average_load: f64,
    /// `grid[y][x]`, cell values 0/1/2.
    pub grid: Vec<Vec<u8>>,
    pub agents: Vec<AgentSummary>,
    pub regions: Vec<RegionSummary>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RouteQuality {
    Excellent,
    Good,
    Moderate,
    UseFallback,
}

impl RouteQuality {
    pub fn from_latency(latency: f64) -> Self {
        if latency < 50.0 {
            Self::Excellent
        } else if latency < 100.0 {
            Self::Good
        } else if latency < 200.0 {
            Self::Moderate
        } else {
            Self::UseFallback
        }
    }
}

impl fmt::Display for RouteQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Excellent => "excellent",
            Self::Good => "good",
            Self::Moderate => "moderate",
            Self::UseFallback => "use fallback",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteRecommendation {
    pub request_kind: String,
    pub primary: RegionSummary,
    pub fallbacks: Vec<RegionSummary>,
    pub quality: RouteQuality,
    pub recommendation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetPlacement {
    pub kind: String,
    pub region_id: RegionId,
    pub position: Position,
}
