pub mod detection;
pub mod events;
pub mod perception;
pub mod targeting;
pub mod tick;

pub use detection::{DetectionState, DetectionTracker, DetectionTransition};
pub use events::{EventBus, SubscriptionId, TacticsEvent, TacticsObserver};
pub use perception::{is_detectable, perceive, DetectedCandidate, Perception, Viewer};
pub use targeting::{select_target, CurrentTarget, TrackedTarget, TrackedTargets};
pub use tick::run_tactics_tick;
