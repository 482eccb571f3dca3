pub mod agent;
pub mod faction;

pub use agent::{AgentArchetype, AgentSpawn, EngagementProfile, NavigationState};
pub use faction::{FactionTable, Relationship};
