//! Skirmish Tactics - perception, target selection and combat posture for
//! real-time agent simulations

pub mod combat;
pub mod core;
pub mod ecs;
pub mod entity;
pub mod simulation;
pub mod spatial;
pub mod world;
