pub mod world;

pub use world::TacticsWorld;
