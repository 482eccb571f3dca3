pub mod config;
pub mod error;
pub mod geometry;
pub mod types;

pub use config::TacticsConfig;
pub use error::{Result, TacticsError};
pub use geometry::FieldOfView;
pub use types::{AgentId, DeathState, FactionId, Tick, ZoneId};
