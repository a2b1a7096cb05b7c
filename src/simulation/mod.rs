pub mod config;
pub mod runner;

pub use config::{AgentSpec, RegionSpec, SimConfig};
pub use runner::Navigator;

use crate::agent::{self, Agent, AgentId, AgentKind, MoveOutcome, REACH_DISTANCE};
use crate::error::{SimError, SimResult};
use crate::events::{CompletionEvent, EventBus};
use crate::grid::{Cell, Grid, Position};
use crate::region::{reduce, Region, RegionId, RegionRegistry, RegionStatus};
use crate::snapshot::{
    AgentSummary, RegionSummary, RouteQuality, RouteRecommendation, StatusSnapshot, TargetPlacement,
};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Coverage only trims latency above this baseline, so repeated passes flatten out.
const COVERAGE_BASELINE_LATENCY: f64 = 50.0;
const COVERAGE_DECAY: f64 = 0.02;
/// Regions more than 20% above the local mean get pulled halfway back to it.
const REBALANCE_TOLERANCE: f64 = 0.20;
const REBALANCE_PULL: f64 = 0.5;
const ROUTE_CANDIDATES: usize = 3;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TickReport {
    pub tick: u64,
    pub completions: Vec<CompletionEvent>,
    pub collisions: u32,
}

/// Owns the grid, the regions and every agent. Nothing outside holds a
/// reference into it; queries hand back owned snapshots.
pub struct Engine {
    config: SimConfig,
    grid: Grid,
    regions: RegionRegistry,
    agents: Vec<Agent>,
    tick: u64,
    running: bool,
    events: EventBus,
}

impl Engine {
    pub fn new(config: SimConfig) -> SimResult<Self> {
        config.validate()?;
        let (grid, regions, agents) = build_world(&config)?;
        info!(
            "Engine '{}' ready: {}x{} grid, {} regions, {} agents",
            config.name,
            config.grid_size,
            config.grid_size,
            regions.len(),
            agents.len()
        );

        Ok(Self {
            events: EventBus::new(config.event_capacity),
            config,
            grid,
            regions,
            agents,
            tick: 0,
            running: false,
        })
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CompletionEvent> {
        self.events.subscribe()
    }

    /// Returns false if the engine was already running.
    pub fn start(&mut self) -> bool {
        if self.running {
            return false;
        }
        self.running = true;
        info!("Engine '{}' started at tick {}", self.config.name, self.tick);
        true
    }

    pub fn stop(&mut self) -> bool {
        if !self.running {
            return false;
        }
        self.running = false;
        info!("Engine '{}' stopped at tick {}", self.config.name, self.tick);
        true
    }

    /// Rebuilds the world from the configuration. Subscribers and the running
    /// flag survive; score and tick count do not.
    pub fn restart(&mut self) -> SimResult<()> {
        let (grid, regions, agents) = build_world(&self.config)?;
        self.grid = grid;
        self.regions = regions;
        self.agents = agents;
        self.tick = 0;
        info!("Engine '{}' restarted", self.config.name);
        Ok(())
    }

    /// Advances every agent by one step. A stopped engine does nothing.
    pub fn tick(&mut self) -> TickReport {
        if !self.running {
            return TickReport { tick: self.tick, ..Default::default() };
        }

        self.tick += 1;
        let mut report = TickReport { tick: self.tick, ..Default::default() };

        for idx in 0..self.agents.len() {
            self.step_agent(idx, &mut report);
        }

        if every(self.tick, self.config.coverage_interval) {
            self.coverage_pass();
        }
        if every(self.tick, self.config.rebalance_interval) {
            self.rebalance_pass();
        }

        for agent in &mut self.agents {
            agent.finish_tick();
        }

        for event in &report.completions {
            self.events.publish(event.clone());
        }
        report
    }

    fn step_agent(&mut self, idx: usize, report: &mut TickReport) {
        let tick = self.tick;
        let agent = &mut self.agents[idx];

        if let Some(id) = &agent.current_objective {
            let still_active = self.regions.get(id).map(Region::is_active).unwrap_or(false);
            if !still_active {
                debug!("Agent {} dropping objective {}: no longer active", agent.id, id);
                agent.current_objective = None;
            }
        }

        if agent.current_objective.is_none() {
            agent.current_objective =
                agent::select_target(agent.head(), agent.kind, &self.regions, &self.grid);
            if let Some(id) = &agent.current_objective {
                debug!("Agent {} ({}) now targeting {}", agent.id, agent.kind.name(), id);
            }
        }

        let target = agent
            .current_objective
            .as_ref()
            .and_then(|id| self.regions.get(id).ok())
            .map(|r| r.position);

        match agent.advance(&self.grid, target, tick) {
            MoveOutcome::SelfCollision => {
                report.collisions += 1;
                debug!("Agent {} self-collision at tick {}, heading {:?}", agent.id, tick, agent.heading);
            }
            MoveOutcome::Deflected => {
                debug!("Agent {} deflected off the wall, heading {:?}", agent.id, agent.heading);
            }
            MoveOutcome::Moved => {}
        }

        let Some(id) = agent.current_objective.clone() else {
            return;
        };
        let Ok(region) = self.regions.get(&id) else {
            return;
        };
        if agent.head().distance(&region.position) >= REACH_DISTANCE {
            return;
        }

        let points = agent::completion_points(region, agent.kind);
        let position = region.position;
        agent.score = agent.score.saturating_add(points);
        agent.current_objective = None;

        if let Err(e) = self.regions.apply_optimization(&id, agent.kind) {
            warn!("Optimization of {} failed: {}", id, e);
        }
        if self.grid.get(position) == Cell::SpecialTarget {
            if let Err(e) = self.grid.set(position, Cell::Infrastructure) {
                warn!("Could not clear special target at {}: {}", id, e);
            }
        }

        debug!("Agent {} reached {} for {} points (score {})", agent.id, id, points, agent.score);
        report.completions.push(CompletionEvent {
            agent_id: agent.id,
            agent_kind: agent.kind,
            region_id: id,
            points,
            tick,
        });
    }

    fn coverage_pass(&mut self) {
        let radius = self.config.coverage_radius;
        for agent in self.agents.iter_mut().filter(|a| a.kind == AgentKind::Routing) {
            let covered: Vec<RegionId> = self
                .regions
                .within(agent.head(), radius)
                .into_iter()
                .filter(|id| {
                    self.regions
                        .get(id)
                        .map(|r| r.status != RegionStatus::Offline)
                        .unwrap_or(false)
                })
                .collect();

            for id in &covered {
                if let Ok(region) = self.regions.get_mut(id) {
                    let excess = region.latency - COVERAGE_BASELINE_LATENCY;
                    if excess > 0.0 {
                        region.latency = reduce(region.latency, region.latency - excess * COVERAGE_DECAY);
                    }
                }
            }
            agent.coverage = covered;
        }
    }

    fn rebalance_pass(&mut self) {
        let radius = self.config.rebalance_radius;
        for agent in self.agents.iter().filter(|a| a.kind == AgentKind::Processing) {
            let nearby = self.regions.within(agent.head(), radius);
            if nearby.len() < 2 {
                continue;
            }

            let loads: Vec<f64> = nearby
                .iter()
                .filter_map(|id| self.regions.get(id).ok().map(|r| r.load))
                .collect();
            let mean = loads.iter().sum::<f64>() / loads.len() as f64;
            let threshold = mean * (1.0 + REBALANCE_TOLERANCE);

            for id in &nearby {
                if let Ok(region) = self.regions.get_mut(id) {
                    if region.load > threshold {
                        let pulled = region.load - (region.load - mean) * REBALANCE_PULL;
                        debug!("Rebalancing {}: load {:.1} -> {:.1} (mean {:.1})", id, region.load, pulled, mean);
                        region.load = reduce(region.load, pulled);
                    }
                }
            }
        }
    }

    pub fn status(&self) -> StatusSnapshot {
        let regions: Vec<RegionSummary> = self.regions.iter().map(RegionSummary::from).collect();
        let agents: Vec<AgentSummary> = self.agents.iter().map(AgentSummary::from).collect();

        let (average_latency, average_load) = if regions.is_empty() {
            (0.0, 0.0)
        } else {
            let n = regions.len() as f64;
            (
                regions.iter().map(|r| r.latency).sum::<f64>() / n,
                regions.iter().map(|r| r.load).sum::<f64>() / n,
            )
        };

        StatusSnapshot {
            tick: self.tick,
            running: self.running,
            total_score: agents.iter().fold(0u64, |total, a| total.saturating_add(a.score)),
            active_agents: if self.running { agents.len() } else { 0 },
            healthy_regions: regions.iter().filter(|r| r.status == RegionStatus::Active).count(),
            average_latency,
            average_load,
            grid: self.grid.to_matrix(),
            agents,
            regions,
        }
    }

    pub fn agent(&self, id: AgentId) -> SimResult<AgentSummary> {
        self.find_agent(id).map(AgentSummary::from)
    }

    pub fn region(&self, id: &RegionId) -> SimResult<RegionSummary> {
        self.regions.get(id).map(RegionSummary::from)
    }

    pub fn cell(&self, position: Position) -> Cell {
        self.grid.get(position)
    }

    /// Pure evaluation of target selection from the agent's current head.
    pub fn find_optimal_target(&self, id: AgentId) -> SimResult<Option<RegionId>> {
        let agent = self.find_agent(id)?;
        Ok(agent::select_target(agent.head(), agent.kind, &self.regions, &self.grid))
    }

    pub fn optimal_route(
        &self,
        request_kind: &str,
        user_location: Option<Position>,
    ) -> SimResult<RouteRecommendation> {
        let mut candidates: Vec<&Region> = self.regions.iter().filter(|r| r.is_active()).collect();
        match user_location {
            Some(loc) => candidates.sort_by(|a, b| {
                a.position.distance(&loc).total_cmp(&b.position.distance(&loc))
            }),
            None => candidates.sort_by(|a, b| a.latency.total_cmp(&b.latency)),
        }

        let mut ranked = candidates.into_iter().take(ROUTE_CANDIDATES).map(RegionSummary::from);
        let primary = ranked.next().ok_or(SimError::NoAvailableRegion)?;
        let fallbacks: Vec<RegionSummary> = ranked.collect();

        let quality = RouteQuality::from_latency(primary.latency);
        let recommendation = match quality {
            RouteQuality::UseFallback => match fallbacks.first() {
                Some(next) => format!(
                    "{} is at {:.0} ms; use fallback {} ({:.0} ms)",
                    primary.display_name, primary.latency, next.display_name, next.latency
                ),
                None => format!(
                    "{} is at {:.0} ms and no fallback is available",
                    primary.display_name, primary.latency
                ),
            },
            _ => format!(
                "Route {} traffic via {} ({:.0} ms): {} performance expected",
                request_kind, primary.display_name, primary.latency, quality
            ),
        };

        Ok(RouteRecommendation {
            request_kind: request_kind.to_string(),
            primary,
            fallbacks,
            quality,
            recommendation,
        })
    }

    /// Marks a region's cell as a special target. Without an explicit region the
    /// one with the highest load + latency is chosen.
    pub fn add_target(&mut self, kind: &str, region_id: Option<&RegionId>) -> SimResult<TargetPlacement> {
        let region = match region_id {
            Some(id) => self.regions.get(id)?,
            None => {
                let mut busiest: Option<&Region> = None;
                for region in self.regions.iter() {
                    let pressure = region.load + region.latency;
                    match busiest {
                        Some(top) if pressure <= top.load + top.latency => {}
                        _ => busiest = Some(region),
                    }
                }
                busiest.ok_or(SimError::NoAvailableRegion)?
            }
        };

        let placement = TargetPlacement {
            kind: kind.to_string(),
            region_id: region.id.clone(),
            position: region.position,
        };
        self.grid.set(placement.position, Cell::SpecialTarget)?;
        info!(
            "Placed {} target at {} ({}, {})",
            kind, placement.region_id, placement.position.x, placement.position.y
        );
        Ok(placement)
    }

    pub fn set_region_status(&mut self, id: &RegionId, status: RegionStatus) -> SimResult<()> {
        self.regions.set_status(id, status)?;
        info!("Region {} set to {:?}", id, status);
        Ok(())
    }

    fn find_agent(&self, id: AgentId) -> SimResult<&Agent> {
        self.agents
            .iter()
            .find(|a| a.id == id)
            .ok_or(SimError::UnknownAgent { id: id.get() })
    }
}

fn every(tick: u64, interval: u64) -> bool {
    interval > 0 && tick % interval == 0
}

fn build_world(config: &SimConfig) -> SimResult<(Grid, RegionRegistry, Vec<Agent>)> {
    let mut grid = Grid::new(config.grid_size)?;
    let mut regions = Vec::with_capacity(config.regions.len());
    for spec in &config.regions {
        grid.set(spec.position(), Cell::Infrastructure)?;
        regions.push(Region::new(
            RegionId::new(spec.id.as_str()),
            spec.display_name.as_str(),
            spec.position(),
            spec.latency,
            spec.load,
        ));
    }

    let agents = config
        .agents
        .iter()
        .enumerate()
        .map(|(i, spec)| {
            Agent::new(AgentId::new(i as u32), spec.kind, spec.position(), spec.heading, spec.speed_tier)
        })
        .collect();

    Ok((grid, RegionRegistry::new(regions), agents))
}
