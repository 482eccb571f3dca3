//! Tactics events and the observer bus
//!
//! Every tick produces a list of events for the collaborating subsystems
//! (navigation, weapons, territory). The bus hands each event to global
//! observers and to observers scoped to the agent the event is about.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::combat::{CombatMovement, CombatState};
use crate::core::types::{AgentId, FactionId, Tick, ZoneId};

/// Events produced by the tactics core
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TacticsEvent {
    MovementDirective {
        agent: AgentId,
        movement: CombatMovement,
        target_point: Vec3,
    },
    ShouldFire {
        agent: AgentId,
        fire: bool,
    },
    CombatStateChanged {
        agent: AgentId,
        state: CombatState,
    },
    TargetChanged {
        agent: AgentId,
        target: Option<AgentId>,
    },
    UnitLost {
        agent: AgentId,
        faction: Option<FactionId>,
        killer: Option<AgentId>,
        killer_faction: Option<FactionId>,
        killer_position: Option<Vec3>,
    },
    InvasionAlert {
        zone: ZoneId,
        owner: FactionId,
        position: Vec3,
        intruder: AgentId,
    },
}

impl TacticsEvent {
    /// The agent this event is about
    pub fn agent(&self) -> AgentId {
        match self {
            TacticsEvent::MovementDirective { agent, .. }
            | TacticsEvent::ShouldFire { agent, .. }
            | TacticsEvent::CombatStateChanged { agent, .. }
            | TacticsEvent::TargetChanged { agent, .. }
            | TacticsEvent::UnitLost { agent, .. } => *agent,
            TacticsEvent::InvasionAlert { intruder, .. } => *intruder,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            TacticsEvent::MovementDirective { .. } => "movement_directive",
            TacticsEvent::ShouldFire { .. } => "should_fire",
            TacticsEvent::CombatStateChanged { .. } => "combat_state_changed",
            TacticsEvent::TargetChanged { .. } => "target_changed",
            TacticsEvent::UnitLost { .. } => "unit_lost",
            TacticsEvent::InvasionAlert { .. } => "invasion_alert",
        }
    }
}

/// Receives events after each tick
pub trait TacticsObserver: Send {
    fn on_event(&mut self, tick: Tick, event: &TacticsEvent);
}

impl<F> TacticsObserver for F
where
    F: FnMut(Tick, &TacticsEvent) + Send,
{
    fn on_event(&mut self, tick: Tick, event: &TacticsEvent) {
        self(tick, event)
    }
}

/// Handle returned by `subscribe`, used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Subscription {
    id: SubscriptionId,
    scope: Option<AgentId>,
    observer: Box<dyn TacticsObserver>,
}

/// Observer registry
#[derive(Default)]
pub struct EventBus {
    subscriptions: Vec<Subscription>,
    next_id: u64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn add(
        &mut self,
        scope: Option<AgentId>,
        observer: Box<dyn TacticsObserver>,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscriptions.push(Subscription {
            id,
            scope,
            observer,
        });
        id
    }

    /// Observe every event
    pub fn subscribe(&mut self, observer: impl TacticsObserver + 'static) -> SubscriptionId {
        self.add(None, Box::new(observer))
    }

    /// Observe only events about `agent`
    pub fn subscribe_agent(
        &mut self,
        agent: AgentId,
        observer: impl TacticsObserver + 'static,
    ) -> SubscriptionId {
        self.add(Some(agent), Box::new(observer))
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|s| s.id != id);
        self.subscriptions.len() != before
    }

    /// Drop every observer scoped to `agent`; returns how many were removed
    pub fn unsubscribe_agent(&mut self, agent: AgentId) -> usize {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|s| s.scope != Some(agent));
        before - self.subscriptions.len()
    }

    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    /// Deliver a batch of events in order
    pub fn dispatch(&mut self, tick: Tick, events: &[TacticsEvent]) {
        if self.subscriptions.is_empty() {
            return;
        }
        for event in events {
            let subject = event.agent();
            for sub in &mut self.subscriptions {
                if sub.scope.map_or(true, |scope| scope == subject) {
                    sub.observer.on_event(tick, event);
                }
            }
        }
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriptions", &self.subscriptions.len())
            .finish()
    }
}
