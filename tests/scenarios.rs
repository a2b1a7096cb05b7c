use infranav::agent::MAX_COMPLETION_POINTS;
use infranav::prelude::*;
use std::time::Duration;

fn edge_config() -> SimConfig {
    SimConfig::default()
        .with_grid_size(20)
        .with_regions(vec![RegionSpec::new("edge-1", "Edge PoP 1", 10, 5, 30.0, 50.0)])
        .with_agents(vec![AgentSpec::new(AgentKind::Routing, 2, 2, Heading::East)])
}

fn started(config: SimConfig) -> Engine {
    let mut engine = Engine::new(config).unwrap();
    assert!(engine.start());
    engine
}

#[test]
fn routing_agent_reaches_edge_and_optimizes_it() {
    let mut engine = started(edge_config());
    let agent = AgentId::new(0);
    let edge = RegionId::new("edge-1");

    engine.tick();
    assert_eq!(engine.agent(agent).unwrap().current_objective, Some(edge.clone()));

    let mut completed = None;
    for _ in 0..50 {
        let before = engine.agent(agent).unwrap().score;
        let report = engine.tick();
        if let Some(event) = report.completions.first() {
            completed = Some((before, event.clone()));
            break;
        }
    }

    let (before, event) = completed.expect("agent never reached edge-1");
    assert_eq!(event.region_id, edge);
    assert_eq!(event.points, 120);
    assert!(event.tick <= 12);

    let after = engine.agent(agent).unwrap();
    assert!(after.score - before > 100);
    assert_eq!(after.current_objective, None);
    assert!(after.head.distance(&Position::new(10, 5)) < 1.5);

    let region = engine.region(&edge).unwrap();
    assert!((region.latency - 27.0).abs() < 1e-9);
    assert_eq!(region.load, 50.0);
}

#[test]
fn completion_is_published_to_subscribers() {
    let mut engine = started(edge_config());
    let mut rx = engine.subscribe();
    for _ in 0..20 {
        engine.tick();
    }
    let event = rx.try_recv().unwrap();
    assert_eq!(event.agent_id, AgentId::new(0));
    assert_eq!(event.agent_kind, AgentKind::Routing);
    assert_eq!(event.region_id, RegionId::new("edge-1"));
    assert_eq!(event.points, 120);
}

#[test]
fn agent_at_west_wall_turns_north_or_south() {
    let config = SimConfig::default()
        .with_regions(Vec::new())
        .with_agents(vec![AgentSpec::new(AgentKind::Storage, 3, 10, Heading::West)]);
    let mut engine = started(config);
    let agent = AgentId::new(0);

    for _ in 0..3 {
        engine.tick();
    }
    let at_wall = engine.agent(agent).unwrap();
    assert_eq!(at_wall.head, Position::new(0, 10));
    assert_eq!(at_wall.heading, Heading::West);

    engine.tick();
    let turned = engine.agent(agent).unwrap();
    assert!(turned.head.x >= 0);
    assert!(matches!(turned.heading, Heading::North | Heading::South));
    assert_eq!(turned.head, Position::new(0, 9));
}

#[test]
fn add_target_picks_busiest_region() {
    let mut engine = Engine::new(SimConfig::default()).unwrap();
    let placement = engine.add_target("optimization", None).unwrap();

    let status = engine.status();
    let busiest = status
        .regions
        .iter()
        .max_by(|a, b| (a.load + a.latency).total_cmp(&(b.load + b.latency)))
        .unwrap();
    assert_eq!(placement.region_id, busiest.id);
    assert_eq!(placement.region_id, RegionId::new("sa-east"));
    assert_eq!(placement.kind, "optimization");

    let p = placement.position;
    assert_eq!(status.grid[p.y as usize][p.x as usize], Cell::SpecialTarget as u8);
    assert_eq!(engine.cell(p), Cell::SpecialTarget);
}

#[test]
fn restart_resets_scores_and_regions() {
    let mut engine = started(SimConfig::default());
    let initial = engine.status();

    engine.add_target("optimization", None).unwrap();
    for _ in 0..120 {
        engine.tick();
    }
    let played = engine.status();
    assert!(played.total_score > 0);
    assert_ne!(played.regions, initial.regions);

    engine.restart().unwrap();
    let reset = engine.status();
    assert_eq!(reset.tick, 0);
    assert!(reset.agents.iter().all(|a| a.score == 0));
    assert_eq!(reset.regions, initial.regions);
    assert_eq!(reset.grid, initial.grid);
    assert_eq!(reset.agents, initial.agents);
    assert!(reset.running);
}

#[test]
fn stopped_engine_snapshot_is_frozen() {
    let mut engine = started(SimConfig::default());
    for _ in 0..15 {
        engine.tick();
    }
    assert!(engine.stop());

    let first = engine.status();
    for _ in 0..5 {
        engine.tick();
        assert_eq!(engine.status(), first);
    }
    assert!(!first.running);
    assert_eq!(first.active_agents, 0);
    assert_eq!(first.tick, 15);
}

#[test]
fn status_aggregates_match_summaries() {
    let mut engine = started(SimConfig::default());
    for _ in 0..30 {
        engine.tick();
    }
    engine
        .set_region_status(&RegionId::new("us-west"), RegionStatus::Degraded)
        .unwrap();

    let status = engine.status();
    assert_eq!(status.total_score, status.agents.iter().map(|a| a.score).sum::<u64>());
    assert_eq!(status.active_agents, 4);
    assert_eq!(status.healthy_regions, 7);
    let mean_latency = status.regions.iter().map(|r| r.latency).sum::<f64>() / 8.0;
    assert!((status.average_latency - mean_latency).abs() < 1e-9);
    assert_eq!(status.grid.len(), 20);
    assert!(status.grid.iter().all(|row| row.len() == 20));
}

#[test]
fn extreme_latency_region_saturates_scores() {
    let config = SimConfig::default()
        .with_grid_size(20)
        .with_regions(vec![RegionSpec::new("hot", "Hot spot", 4, 2, 1e20, 50.0)])
        .with_agents(vec![AgentSpec::new(AgentKind::Routing, 2, 2, Heading::East)]);
    let mut engine = started(config);

    let mut completions = 0;
    for _ in 0..10 {
        completions += engine.tick().completions.len();
    }

    assert_eq!(engine.tick_count(), 10);
    assert!(completions > 0);
    let agent = engine.agent(AgentId::new(0)).unwrap();
    assert!(agent.score >= MAX_COMPLETION_POINTS);
    assert!(engine.region(&RegionId::new("hot")).unwrap().latency < 1e20);
}

#[test]
fn oversized_grid_is_a_configuration_error() {
    let result = Engine::new(SimConfig::default().with_grid_size(50_000));
    assert!(matches!(result, Err(SimError::InvalidConfiguration { .. })));
}

#[tokio::test]
async fn restart_never_leaves_stale_tick_metrics() {
    let config = SimConfig::default().with_tick_period(Duration::from_millis(1));
    let mut navigator = Navigator::new(config).unwrap();
    let metrics = navigator.metrics();

    navigator.start();
    for _ in 0..20 {
        tokio::time::sleep(Duration::from_millis(3)).await;
        navigator.restart().unwrap();
        let recorded = metrics.ticks();
        assert!(recorded <= navigator.status().tick);
    }
    navigator.stop().await;
}

#[tokio::test]
async fn navigator_ticks_on_its_clock_and_stops_cleanly() {
    let config = SimConfig::default().with_tick_period(Duration::from_millis(5));
    let mut navigator = Navigator::new(config).unwrap();

    assert!(navigator.start());
    assert!(!navigator.start());
    tokio::time::sleep(Duration::from_millis(120)).await;
    navigator.stop().await;

    let first = navigator.status();
    assert!(first.tick > 0);
    assert!(!first.running);
    assert!(navigator.metrics().ticks() > 0);

    tokio::time::sleep(Duration::from_millis(40)).await;
    assert_eq!(navigator.status(), first);

    navigator.restart().unwrap();
    assert_eq!(navigator.status().tick, 0);
    assert_eq!(navigator.metrics().ticks(), 0);
}

#[tokio::test]
async fn navigator_queries_delegate_to_engine() {
    let navigator = Navigator::new(SimConfig::default()).unwrap();
    let route = navigator.optimal_route("video", Some(Position::new(10, 9))).unwrap();
    assert_eq!(route.primary.id, RegionId::new("edge-1"));
    assert_eq!(route.quality, RouteQuality::Excellent);

    let placement = navigator.add_target("optimization", Some(&RegionId::new("us-west"))).unwrap();
    assert_eq!(placement.position, Position::new(2, 10));

    assert!(matches!(
        navigator.set_region_status(&RegionId::new("nowhere"), RegionStatus::Offline),
        Err(SimError::UnknownRegion { .. })
    ));
    assert!(navigator.find_optimal_target(AgentId::new(0)).unwrap().is_some());
}
