// Drives an Engine off a fixed-period clock on the tokio runtime

use super::{Engine, SimConfig};
use crate::agent::AgentId;
use crate::error::SimResult;
use crate::events::CompletionEvent;
use crate::grid::Position;
use crate::metrics::MetricsCollector;
use crate::region::{RegionId, RegionStatus};
use crate::snapshot::{RouteRecommendation, StatusSnapshot, TargetPlacement};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Host for a running simulation. Ticks and queries share one mutex, so a
/// query always sees the state between two whole ticks.
pub struct Navigator {
    engine: Arc<Mutex<Engine>>,
    metrics: MetricsCollector,
    period: Duration,
    cancel: Option<CancellationToken>,
    handle: Option<JoinHandle<()>>,
}

impl Navigator {
    pub fn new(config: SimConfig) -> SimResult<Self> {
        let period = config.tick_period();
        let engine = Engine::new(config)?;
        Ok(Self {
            engine: Arc::new(Mutex::new(engine)),
            metrics: MetricsCollector::new(),
            period,
            cancel: None,
            handle: None,
        })
    }

    pub fn metrics(&self) -> MetricsCollector {
        self.metrics.clone()
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Spawns the clock task. Must be called from within a tokio runtime.
    /// Returns false if already running.
    pub fn start(&mut self) -> bool {
        if self.handle.is_some() {
            return false;
        }

        self.engine.lock().start();
        let cancel = CancellationToken::new();
        let engine = self.engine.clone();
        let metrics = self.metrics.clone();
        let period = self.period;
        let token = cancel.clone();

        let handle = tokio::spawn(async move {
            let mut clock = interval(period);
            // A late tick is skipped, never queued up behind the previous one
            clock.set_missed_tick_behavior(MissedTickBehavior::Skip);
            clock.tick().await;

            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = clock.tick() => {
                        // Recorded under the engine lock so a restart cannot interleave
                        let mut engine = engine.lock();
                        let report = engine.tick();
                        metrics.record_tick(&report);
                    }
                }
            }
        });

        info!("Navigator clock started with period {:?}", self.period);
        self.cancel = Some(cancel);
        self.handle = Some(handle);
        true
    }

    /// Cancels the clock and waits for the task, so no tick runs after this returns.
    pub async fn stop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }
        if let Err(e) = handle.await {
            warn!("Navigator clock task ended abnormally: {}", e);
        }
        self.engine.lock().stop();
        info!("Navigator clock stopped");
    }

    pub fn restart(&self) -> SimResult<()> {
        let mut engine = self.engine.lock();
        engine.restart()?;
        self.metrics.reset();
        Ok(())
    }

    pub fn status(&self) -> StatusSnapshot {
        self.engine.lock().status()
    }

    /// Captures a status snapshot into the metrics history.
    pub fn save_snapshot(&self) -> StatusSnapshot {
        let status = self.status();
        self.metrics.save_snapshot(&status);
        status
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CompletionEvent> {
        self.engine.lock().subscribe()
    }

    pub fn optimal_route(
        &self,
        request_kind: &str,
        user_location: Option<Position>,
    ) -> SimResult<RouteRecommendation> {
        self.engine.lock().optimal_route(request_kind, user_location)
    }

    pub fn add_target(&self, kind: &str, region_id: Option<&RegionId>) -> SimResult<TargetPlacement> {
        self.engine.lock().add_target(kind, region_id)
    }

    pub fn set_region_status(&self, id: &RegionId, status: RegionStatus) -> SimResult<()> {
        self.engine.lock().set_region_status(id, status)
    }

    pub fn find_optimal_target(&self, id: AgentId) -> SimResult<Option<RegionId>> {
        self.engine.lock().find_optimal_target(id)
    }
}

impl Drop for Navigator {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }
    }
}
