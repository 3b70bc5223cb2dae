//! Named simulation events and the subscriber bus.
//!
//! Systems queue events while they mutate the world; the engine flushes the
//! queue to subscribers once per tick so a callback never observes a
//! half-updated world.

use hecs::Entity;
use serde::Serialize;

use crate::components::ColonyId;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum SimEvent {
    AgentDestroyed {
        #[serde(skip)]
        agent: Entity,
        colony: ColonyId,
    },
    ColonyUnderAttack { colony: ColonyId },
    ColonyDestroyed { colony: ColonyId },
    ColonyTeleported { colony: ColonyId },
    PrioritiesChanged { colony: ColonyId },
    TurretAccepted {
        colony: ColonyId,
        #[serde(skip)]
        turret: Entity,
    },
    WaveSpawned { level: u32 },
    Victory,
}

impl SimEvent {
    /// Short event name for logs and dumps.
    pub fn name(&self) -> &'static str {
        match self {
            SimEvent::AgentDestroyed { .. } => "agent_destroyed",
            SimEvent::ColonyUnderAttack { .. } => "colony_under_attack",
            SimEvent::ColonyDestroyed { .. } => "colony_destroyed",
            SimEvent::ColonyTeleported { .. } => "colony_teleported",
            SimEvent::PrioritiesChanged { .. } => "priorities_changed",
            SimEvent::TurretAccepted { .. } => "turret_accepted",
            SimEvent::WaveSpawned { .. } => "wave_spawned",
            SimEvent::Victory => "victory",
        }
    }
}

pub type EventHandler = Box<dyn FnMut(&SimEvent)>;

#[derive(Default)]
pub struct EventBus {
    queue: Vec<SimEvent>,
    subscribers: Vec<EventHandler>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, event: SimEvent) {
        self.queue.push(event);
    }

    pub fn subscribe(&mut self, handler: EventHandler) {
        self.subscribers.push(handler);
    }

    pub fn pending(&self) -> &[SimEvent] {
        &self.queue
    }

    /// Deliver queued events in emission order. Returns how many were sent.
    pub fn flush(&mut self) -> usize {
        let events = std::mem::take(&mut self.queue);
        for event in &events {
            for handler in &mut self.subscribers {
                handler(event);
            }
        }
        events.len()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("queue", &self.queue)
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}
