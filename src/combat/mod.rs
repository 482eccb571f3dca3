pub mod fire;
pub mod movement;
pub mod state;

pub use fire::{should_fire, WeaponState};
pub use movement::{directive_point, CombatMovement, MovementInput, MovementState, MovementWeights};
pub use state::{CombatBrain, CombatState};
