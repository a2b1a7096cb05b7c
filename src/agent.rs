// Agents move one cell per tick, leaving a trail whose length tracks their score

use crate::grid::{Cell, Grid, Heading, Position};
use crate::region::{Region, RegionId, RegionRegistry};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

pub const MIN_TRAIL_LEN: usize = 3;
pub const SELF_OPTIMIZATION_BONUS: u64 = 50;
pub const REACH_DISTANCE: f64 = 1.5;
pub const SPECIAL_TARGET_PRIORITY: f64 = 2.0;
/// Keeps a single completion from swamping the score of a long run.
pub const MAX_COMPLETION_POINTS: u64 = 1 << 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(u32);

impl AgentId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn get(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentKind {
    Routing,
    Processing,
    Storage,
    Analytics,
}

impl AgentKind {
    pub const ALL: [AgentKind; 4] = [
        AgentKind::Routing,
        AgentKind::Processing,
        AgentKind::Storage,
        AgentKind::Analytics,
    ];

    pub fn affinity(self) -> f64 {
        match self {
            AgentKind::Routing => 1.2,
            AgentKind::Analytics => 1.1,
            AgentKind::Processing => 1.0,
            AgentKind::Storage => 0.8,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            AgentKind::Routing => "routing",
            AgentKind::Processing => "processing",
            AgentKind::Storage => "storage",
            AgentKind::Analytics => "analytics",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub position: Position,
    pub created_at: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    Moved,
    /// The wall was in the way and a perpendicular (or reversed) heading was taken.
    Deflected,
    SelfCollision,
}

#[derive(Debug, Clone)]
pub struct Agent {
    pub id: AgentId,
    pub kind: AgentKind,
    /// Head first, oldest segment last.
    trail: VecDeque<Segment>,
    pub heading: Heading,
    pub current_objective: Option<RegionId>,
    pub score: u64,
    pub speed_tier: u32,
    pub coverage: Vec<RegionId>,
}

impl Agent {
    /// Lays the initial trail behind `head`, opposite to `heading`. The trail
    /// must fit the grid; `SimConfig::validate` checks this.
    pub fn new(id: AgentId, kind: AgentKind, head: Position, heading: Heading, speed_tier: u32) -> Self {
        let trail = Self::initial_trail(head, heading)
            .into_iter()
            .map(|position| Segment { position, created_at: 0 })
            .collect();

        Self {
            id,
            kind,
            trail,
            heading,
            current_objective: None,
            score: 0,
            speed_tier,
            coverage: Vec::new(),
        }
    }

    pub fn initial_trail(head: Position, heading: Heading) -> Vec<Position> {
        let back = heading.reverse();
        let mut positions = Vec::with_capacity(MIN_TRAIL_LEN);
        let mut pos = head;
        for _ in 0..MIN_TRAIL_LEN {
            positions.push(pos);
            pos = pos.step(back);
        }
        positions
    }

    pub fn head(&self) -> Position {
        // The trail never drops below MIN_TRAIL_LEN
        self.trail[0].position
    }

    pub fn trail(&self) -> impl Iterator<Item = &Segment> {
        self.trail.iter()
    }

    pub fn trail_len(&self) -> usize {
        self.trail.len()
    }

    pub fn trail_cap(&self) -> usize {
        MIN_TRAIL_LEN.saturating_add(usize::try_from(self.score / 100).unwrap_or(usize::MAX))
    }

    pub fn occupies(&self, pos: Position) -> bool {
        self.trail.iter().any(|s| s.position == pos)
    }

    /// Moves one cell, steering toward `target` when there is one. Wall and
    /// self-collisions are recovered here; the agent always ends up somewhere
    /// inside the grid.
    pub fn advance(&mut self, grid: &Grid, target: Option<Position>, tick: u64) -> MoveOutcome {
        let head = self.head();
        if let Some(target) = target {
            self.heading = heading_toward(head, target, self.heading);
        }

        let mut outcome = MoveOutcome::Moved;
        if !grid.contains(head.step(self.heading)) {
            self.heading = self.wall_heading(grid);
            outcome = MoveOutcome::Deflected;
        }

        let mut next = grid.clamp(head.step(self.heading));
        if self.occupies(next) {
            self.score = self.score.saturating_add(SELF_OPTIMIZATION_BONUS);
            let keep = self.trail.len().saturating_sub(2).max(MIN_TRAIL_LEN);
            self.trail.truncate(keep);
            self.heading = self.recovery_heading(grid);
            next = grid.clamp(head.step(self.heading));
            outcome = MoveOutcome::SelfCollision;
        }

        self.trail.push_front(Segment { position: next, created_at: tick });
        outcome
    }

    /// Passive accrual, then the score-dependent length cap.
    pub fn finish_tick(&mut self) {
        self.score = self.score.saturating_add(1);
        let cap = self.trail_cap();
        while self.trail.len() > cap {
            self.trail.pop_back();
        }
    }

    fn wall_heading(&self, grid: &Grid) -> Heading {
        let head = self.head();
        self.heading
            .perpendicular()
            .into_iter()
            .find(|h| grid.contains(head.step(*h)))
            .unwrap_or_else(|| self.heading.reverse())
    }

    fn recovery_heading(&self, grid: &Grid) -> Heading {
        let head = self.head();
        Heading::ALL
            .into_iter()
            .find(|h| {
                let next = head.step(*h);
                grid.contains(next) && !self.occupies(next)
            })
            .or_else(|| Heading::ALL.into_iter().find(|h| grid.contains(head.step(*h))))
            .unwrap_or(self.heading)
    }
}

/// Axis-dominant steering: larger |delta| wins, ties go to x.
pub fn heading_toward(from: Position, to: Position, current: Heading) -> Heading {
    let dx = to.x - from.x;
    let dy = to.y - from.y;
    if dx == 0 && dy == 0 {
        return current;
    }
    if dx.abs() >= dy.abs() {
        if dx > 0 { Heading::East } else { Heading::West }
    } else if dy > 0 {
        Heading::South
    } else {
        Heading::North
    }
}

pub fn target_score(head: Position, kind: AgentKind, region: &Region, special: bool) -> f64 {
    let load_factor = (100.0 - region.load) / 100.0;
    let latency_factor = ((500.0 - region.latency) / 500.0).max(0.0);
    let distance = head.distance(&region.position);
    let score = (load_factor * 0.4 + latency_factor * 0.3 + kind.affinity() * 0.3) / (1.0 + distance * 0.1);
    if special { score * SPECIAL_TARGET_PRIORITY } else { score }
}

/// Best Active region for an agent at `head`. Strictly-greater comparison keeps
/// the first region in registry order on ties.
pub fn select_target(
    head: Position,
    kind: AgentKind,
    regions: &RegionRegistry,
    grid: &Grid,
) -> Option<RegionId> {
    let mut best: Option<(f64, &RegionId)> = None;
    for region in regions.iter().filter(|r| r.is_active()) {
        let special = grid.get(region.position) == Cell::SpecialTarget;
        let score = target_score(head, kind, region, special);
        match best {
            Some((top, _)) if score <= top => {}
            _ => best = Some((score, &region.id)),
        }
    }
    best.map(|(_, id)| id.clone())
}

/// Whole points for a completion, clamped to `MAX_COMPLETION_POINTS`.
pub fn completion_points(region: &Region, kind: AgentKind) -> u64 {
    let raw = 100.0 + (region.load - 50.0).max(0.0) + (region.latency - 100.0).max(0.0);
    let points = (raw * kind.affinity()).floor();
    if points >= MAX_COMPLETION_POINTS as f64 { MAX_COMPLETION_POINTS } else { points as u64 }
}
