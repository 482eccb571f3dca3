//! Tactics configuration with documented constants
//!
//! All tuning values live here, grouped by the phase that reads them.
//! Every section has sensible defaults, so a TOML file only needs to list
//! the values it overrides.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::error::{Result, TacticsError};
use crate::core::types::FactionId;

/// Spatial hash grid layout
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpatialConfig {
    /// Edge length of a grid cell (world units)
    ///
    /// The 3x3 neighborhood queried by perception spans between one and two
    /// cells in every direction, so this bounds the effective view distance.
    pub cell_size: f32,

    /// Multiplier folding the z cell coordinate into the key
    ///
    /// Must exceed the number of cells along x for any realistic world
    /// extent, otherwise distinct cells share a key.
    pub y_mult: i64,
}

impl Default for SpatialConfig {
    fn default() -> Self {
        Self {
            cell_size: 20.0,
            y_mult: 1000,
        }
    }
}

/// Field-of-view and line-of-sight settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PerceptionConfig {
    /// Anything closer than this is detected regardless of angle or cover
    pub close_range: f32,

    /// Collision layer bit used for vision-blocking raycasts
    ///
    /// `None` (or a layer outside 0..32) leaves every agent blind.
    pub vision_layer: Option<u32>,
}

impl Default for PerceptionConfig {
    fn default() -> Self {
        Self {
            close_range: 3.5,
            vision_layer: Some(0),
        }
    }
}

/// Detection tracker timers (seconds)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Grace period after losing sight before the agent starts searching
    pub regain_timeout: f32,
    /// How long an agent searches before giving the contact up as lost
    pub search_timeout: f32,
    /// Minimum time between invasion alerts for the same zone
    pub invasion_cooldown: f32,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            regain_timeout: 3.0,
            search_timeout: 10.0,
            invasion_cooldown: 5.0,
        }
    }
}

/// Target prioritizer memory and score weights
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetingConfig {
    /// Countdown a tracked candidate is reset to while visible
    pub tracking_memory: f32,
    /// Fraction of a tick length removed from the countdown while unseen
    pub tracking_decay: f32,
    /// Points every enemy candidate starts with
    pub base_score: f32,
    /// Bonus for being the closest candidate so far in the scan
    pub closest_bonus: f32,
    /// Extra closest bonus per distance rank
    pub closest_rank_step: f32,
    /// Bonus when the observer sees the candidate
    pub visible_bonus: f32,
    /// Bonus when the candidate sees the observer
    pub reciprocal_bonus: f32,
    /// Bonus when the candidate is targeting the observer
    pub targeted_by_bonus: f32,
    /// Maximum bonus for a mid-swing attacker, scaled by attack phase
    pub attack_phase_bonus: f32,
    /// Distance under which mutual targeting counts as close range
    pub mutual_close_range: f32,
}

impl Default for TargetingConfig {
    fn default() -> Self {
        Self {
            tracking_memory: 23.0,
            tracking_decay: 0.9,
            base_score: 2.0,
            closest_bonus: 6.0,
            closest_rank_step: 2.0,
            visible_bonus: 6.0,
            reciprocal_bonus: 6.0,
            targeted_by_bonus: 6.0,
            attack_phase_bonus: 12.0,
            mutual_close_range: 5.0,
        }
    }
}

/// Combat state machine timers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    /// How long an externally alerted agent stays alerted without detection
    pub alert_duration: f32,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            alert_duration: 10.0,
        }
    }
}

/// Movement decision policy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementConfig {
    /// Minimum engagement distance for ranged agents
    pub ranged_keep_distance: f32,
    /// Lower bound of the randomized keep-distance multiplier
    pub mult_min: f32,
    /// Upper bound of the randomized keep-distance multiplier
    pub mult_max: f32,
    /// Shortest time a chosen movement type is kept
    pub hysteresis_min: f32,
    /// Longest time a chosen movement type is kept
    pub hysteresis_max: f32,
    /// Lock applied when a fall back is forced
    pub fallback_lock: f32,
    /// Rotation around the target used for flanking points (degrees)
    pub flank_angle: f32,
    /// Directive point drift that triggers a new directive
    pub repath_distance: f32,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            ranged_keep_distance: 8.0,
            mult_min: 1.5,
            mult_max: 2.5,
            hysteresis_min: 2.0,
            hysteresis_max: 4.0,
            fallback_lock: 0.5,
            flank_angle: 30.0,
            repath_distance: 1.0,
        }
    }
}

/// One faction's relationship setup
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FactionSetup {
    pub id: FactionId,
    pub allies: Vec<FactionId>,
    pub enemies: Vec<FactionId>,
}

/// Complete tactics configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TacticsConfig {
    /// Fixed simulation step (seconds)
    pub tick_seconds: f32,

    /// Minimum living agent count before per-agent phases run on rayon
    ///
    /// Below this threshold, thread overhead exceeds benefits.
    pub parallel_threshold: usize,

    pub spatial: SpatialConfig,
    pub perception: PerceptionConfig,
    pub detection: DetectionConfig,
    pub targeting: TargetingConfig,
    pub combat: CombatConfig,
    pub movement: MovementConfig,
    pub factions: Vec<FactionSetup>,
}

impl Default for TacticsConfig {
    fn default() -> Self {
        Self {
            tick_seconds: 0.1,
            parallel_threshold: 512,
            spatial: SpatialConfig::default(),
            perception: PerceptionConfig::default(),
            detection: DetectionConfig::default(),
            targeting: TargetingConfig::default(),
            combat: CombatConfig::default(),
            movement: MovementConfig::default(),
            factions: Vec::new(),
        }
    }
}

impl TacticsConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a config from TOML text and validate it
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: TacticsConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&contents)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        for (name, value) in self.float_fields() {
            if !value.is_finite() {
                return Err(invalid(format!("{} ({}) must be finite", name, value)));
            }
        }

        if self.tick_seconds <= 0.0 {
            return Err(invalid("tick_seconds must be positive".into()));
        }

        if self.spatial.cell_size <= 0.0 {
            return Err(invalid(format!(
                "spatial.cell_size ({}) must be positive",
                self.spatial.cell_size
            )));
        }

        if self.spatial.y_mult < 3 {
            return Err(invalid(format!(
                "spatial.y_mult ({}) is too small to separate neighbor rows",
                self.spatial.y_mult
            )));
        }

        let m = &self.movement;
        if m.mult_min < 1.0 || m.mult_min > m.mult_max {
            return Err(invalid(format!(
                "movement multiplier range [{}, {}] must satisfy 1 <= min <= max",
                m.mult_min, m.mult_max
            )));
        }

        if m.hysteresis_min < 0.0 || m.hysteresis_min > m.hysteresis_max {
            return Err(invalid(format!(
                "movement hysteresis range [{}, {}] is inverted or negative",
                m.hysteresis_min, m.hysteresis_max
            )));
        }

        let d = &self.detection;
        if d.regain_timeout < 0.0 || d.search_timeout < 0.0 || d.invasion_cooldown < 0.0 {
            return Err(invalid("detection timeouts must not be negative".into()));
        }

        if self.perception.close_range < 0.0 {
            return Err(invalid("perception.close_range must not be negative".into()));
        }

        if self.targeting.tracking_memory <= 0.0 {
            return Err(invalid("targeting.tracking_memory must be positive".into()));
        }

        if self.targeting.tracking_decay <= 0.0 {
            return Err(invalid("targeting.tracking_decay must be positive".into()));
        }

        Ok(())
    }

    fn float_fields(&self) -> [(&'static str, f32); 25] {
        let p = &self.perception;
        let d = &self.detection;
        let t = &self.targeting;
        let m = &self.movement;
        [
            ("tick_seconds", self.tick_seconds),
            ("spatial.cell_size", self.spatial.cell_size),
            ("perception.close_range", p.close_range),
            ("detection.regain_timeout", d.regain_timeout),
            ("detection.search_timeout", d.search_timeout),
            ("detection.invasion_cooldown", d.invasion_cooldown),
            ("targeting.tracking_memory", t.tracking_memory),
            ("targeting.tracking_decay", t.tracking_decay),
            ("targeting.base_score", t.base_score),
            ("targeting.closest_bonus", t.closest_bonus),
            ("targeting.closest_rank_step", t.closest_rank_step),
            ("targeting.visible_bonus", t.visible_bonus),
            ("targeting.reciprocal_bonus", t.reciprocal_bonus),
            ("targeting.targeted_by_bonus", t.targeted_by_bonus),
            ("targeting.attack_phase_bonus", t.attack_phase_bonus),
            ("targeting.mutual_close_range", t.mutual_close_range),
            ("combat.alert_duration", self.combat.alert_duration),
            ("movement.ranged_keep_distance", m.ranged_keep_distance),
            ("movement.mult_min", m.mult_min),
            ("movement.mult_max", m.mult_max),
            ("movement.hysteresis_min", m.hysteresis_min),
            ("movement.hysteresis_max", m.hysteresis_max),
            ("movement.fallback_lock", m.fallback_lock),
            ("movement.flank_angle", m.flank_angle),
            ("movement.repath_distance", m.repath_distance),
        ]
    }
}

fn invalid(message: String) -> TacticsError {
    TacticsError::InvalidConfig(message)
}
