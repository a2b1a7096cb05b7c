pub mod agent;
pub mod error;
pub mod events;
pub mod grid;
pub mod metrics;
pub mod region;
pub mod simulation;
pub mod snapshot;

pub use agent::{Agent, AgentId, AgentKind};
pub use error::{SimError, SimResult};
pub use events::CompletionEvent;
pub use grid::{Cell, Grid, Heading, Position};
pub use metrics::MetricsCollector;
pub use region::{Region, RegionId, RegionRegistry, RegionStatus};
pub use simulation::{Engine, Navigator, SimConfig};

pub mod prelude {
    pub use crate::agent::{AgentId, AgentKind};
    pub use crate::error::{SimError, SimResult};
    pub use crate::events::CompletionEvent;
    pub use crate::grid::{Cell, Heading, Position};
    pub use crate::metrics::MetricsSnapshot;
    pub use crate::region::{RegionId, RegionStatus};
    pub use crate::simulation::{AgentSpec, Engine, Navigator, RegionSpec, SimConfig, TickReport};
    pub use crate::snapshot::{
        AgentSummary, RegionSummary, RouteQuality, RouteRecommendation, StatusSnapshot, TargetPlacement,
    };
}
