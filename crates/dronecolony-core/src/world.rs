//! Shared simulation context.
//!
//! [`SimContext`] owns the ECS world, the colony cores, the single RNG and
//! the non-entity world state. Systems take `&mut SimContext` and work on
//! one agent or creep at a time by detaching its component from the world
//! for the duration of the call (see [`SimContext::with_agent`]); while
//! detached, the unit is invisible to every search.

use dronecolony_logic::stats::{AgentKind, DamageValue};
use hecs::{Entity, World};

use crate::components::{
    Agent, AgentMode, AgentTarget, ColonyCore, ColonyId, ColonyPriority, Construction, Creep, EssenceSource,
    NeutralBuilding, Rect, Teleporter, Vec2,
};
use crate::events::{EventBus, SimEvent};
use crate::presentation::{Headless, Presentation};
use crate::result::SimResult;
use crate::rng::SimRng;
use crate::spatial::{pos_to_coord, CreepGrid, PathGrid};

/// Who dealt a hit; used by morale and low-health reactions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DamageSource {
    pub pos: Vec2,
    pub flying: bool,
    pub creep: Option<Entity>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HitTarget {
    Agent(Entity),
    Creep(Entity),
    Colony(ColonyId),
}

/// A projectile in flight: lands after `delay` seconds.
#[derive(Debug, Clone, Copy)]
pub struct PendingHit {
    pub target: HitTarget,
    pub damage: DamageValue,
    pub delay: f64,
    pub source: DamageSource,
}

/// Everything in the world that is not an entity.
pub struct WorldState {
    pub map: Rect,
    pub path_grid: PathGrid,
    pub creep_grid: CreepGrid,
    pub teleporters: Vec<Teleporter>,
    pub pending_hits: Vec<PendingHit>,
    pub result: SimResult,
    pub events: EventBus,
    pub presentation: Box<dyn Presentation>,
    pub time: f64,
}

impl WorldState {
    pub fn new(map: Rect) -> Self {
        Self {
            map,
            path_grid: PathGrid::new(&map),
            creep_grid: CreepGrid::new(map),
            teleporters: Vec::new(),
            pending_hits: Vec::new(),
            result: SimResult::default(),
            events: EventBus::new(),
            presentation: Box::new(Headless),
            time: 0.0,
        }
    }
}

impl std::fmt::Debug for WorldState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorldState")
            .field("map", &self.map)
            .field("pending_hits", &self.pending_hits.len())
            .field("result", &self.result)
            .field("time", &self.time)
            .finish()
    }
}

pub struct SimContext {
    pub world: World,
    pub colonies: Vec<ColonyCore>,
    pub rng: SimRng,
    pub state: WorldState,
}

impl std::fmt::Debug for SimContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimContext")
            .field("entities", &self.world.len())
            .field("colonies", &self.colonies.len())
            .field("state", &self.state)
            .finish()
    }
}

impl SimContext {
    pub fn new(map: Rect, seed: u64) -> Self {
        Self {
            world: World::new(),
            colonies: Vec::new(),
            rng: SimRng::new(seed),
            state: WorldState::new(map),
        }
    }

    pub fn emit(&mut self, event: SimEvent) {
        self.state.events.emit(event);
    }

    pub fn colony(&self, id: ColonyId) -> Option<&ColonyCore> {
        self.colonies.get(id.index())
    }

    pub fn colony_mut(&mut self, id: ColonyId) -> Option<&mut ColonyCore> {
        self.colonies.get_mut(id.index())
    }

    /// Live (non-disposed) colony.
    pub fn live_colony(&self, id: ColonyId) -> Option<&ColonyCore> {
        self.colony(id).filter(|c| !c.disposed)
    }

    /// Shift one colony priority and renormalize the rest.
    pub fn add_priority(&mut self, id: ColonyId, priority: ColonyPriority, delta: f64) {
        let Some(colony) = self.colony_mut(id) else {
            return;
        };
        colony.priorities.add_weight(priority, delta);
        self.emit(SimEvent::PrioritiesChanged { colony: id });
    }

    pub fn add_colony(&mut self, mut colony: ColonyCore) -> ColonyId {
        let id = ColonyId(self.colonies.len() as u32);
        colony.id = id;
        self.colonies.push(colony);
        id
    }

    // Agents

    /// Roll the agent's per-instance attributes and add it to the world.
    /// The caller attaches it to a colony.
    pub fn spawn_agent(&mut self, mut agent: Agent) -> Entity {
        agent.init(&mut self.rng);
        let e = self.world.spawn((agent,));
        if let Ok(mut a) = self.world.get::<&mut Agent>(e) {
            a.id = e;
        }
        e
    }

    /// Give `e` to a colony: turrets go to the turret list (and the ground
    /// grid), roombas to the roomba list, everything else to the agents.
    pub fn attach_agent(&mut self, colony_id: ColonyId, e: Entity) {
        let Ok(mut agent) = self.world.get::<&mut Agent>(e) else {
            return;
        };
        agent.colony = colony_id;
        let stats = agent.stats;
        let pos = agent.pos;
        if stats.is_turret {
            agent.mode = AgentMode::GuardForever;
        }
        drop(agent);

        let Some(colony) = self.colonies.get_mut(colony_id.index()) else {
            return;
        };
        if stats.is_turret {
            colony.turrets.push(e);
            self.state.path_grid.set(pos_to_coord(pos), true);
            self.emit(SimEvent::TurretAccepted {
                colony: colony_id,
                turret: e,
            });
        } else if stats.kind == AgentKind::Roomba {
            colony.roombas.push(e);
        } else {
            colony.agents.add(e, stats);
        }
    }

    /// Move an agent between colonies.
    pub fn transfer_agent(&mut self, e: Entity, to: ColonyId) {
        let Some((from, stats)) = self.world.get::<&Agent>(e).ok().map(|a| (a.colony, a.stats)) else {
            return;
        };
        if let Some(colony) = self.colony_mut(from) {
            colony.detach(e, stats);
        }
        self.attach_agent(to, e);
    }

    /// Run `f` with the agent detached from the world. A disposed agent is
    /// destroyed afterwards; otherwise it is put back.
    pub fn with_agent<R>(&mut self, e: Entity, f: impl FnOnce(&mut Agent, &mut SimContext) -> R) -> Option<R> {
        let mut agent = self.world.remove_one::<Agent>(e).ok()?;
        let r = f(&mut agent, self);
        if agent.disposed {
            self.finish_agent(e, agent);
        } else if let Err(err) = self.world.insert_one(e, agent) {
            log::warn!("agent {:?} vanished during its own update: {}", e, err);
        }
        Some(r)
    }

    fn finish_agent(&mut self, e: Entity, agent: Agent) {
        let _ = self.world.despawn(e);
        if agent.is_turret() {
            self.state.path_grid.set(pos_to_coord(agent.pos), false);
        }
        if let Some(AgentTarget::Tether(c)) = agent.target {
            if let Some(colony) = self.colony_mut(c) {
                colony.tether = colony.tether.saturating_sub(1);
            }
        }
        if let Some(colony) = self.colony_mut(agent.colony) {
            colony.detach(e, agent.stats);
        }
        self.emit(SimEvent::AgentDestroyed {
            agent: e,
            colony: agent.colony,
        });
    }

    pub fn destroy_agent(&mut self, e: Entity) {
        self.with_agent(e, |a, _| a.disposed = true);
    }

    pub fn agent_pos(&self, e: Entity) -> Option<Vec2> {
        self.world.get::<&Agent>(e).ok().filter(|a| !a.disposed).map(|a| a.pos)
    }

    pub fn agent_exists(&self, e: Entity) -> bool {
        self.world.get::<&Agent>(e).map_or(false, |a| !a.disposed)
    }

    /// Every entity carrying an agent, in spawn order.
    pub fn agent_entities(&self) -> Vec<Entity> {
        let mut entities: Vec<Entity> = self.world.query::<&Agent>().iter().map(|(e, _)| e).collect();
        entities.sort_by_key(|e| e.id());
        entities
    }

    // Creeps

    pub fn spawn_creep(&mut self, creep: Creep) -> Entity {
        let e = self.world.spawn((creep,));
        if let Ok(mut c) = self.world.get::<&mut Creep>(e) {
            c.id = e;
        }
        e
    }

    pub fn with_creep<R>(&mut self, e: Entity, f: impl FnOnce(&mut Creep, &mut SimContext) -> R) -> Option<R> {
        let mut creep = self.world.remove_one::<Creep>(e).ok()?;
        let r = f(&mut creep, self);
        if creep.disposed {
            let _ = self.world.despawn(e);
        } else if let Err(err) = self.world.insert_one(e, creep) {
            log::warn!("creep {:?} vanished during its own update: {}", e, err);
        }
        Some(r)
    }

    pub fn creep_pos(&self, e: Entity) -> Option<Vec2> {
        self.world.get::<&Creep>(e).ok().filter(|c| !c.disposed).map(|c| c.pos)
    }

    pub fn creep_entities(&self) -> Vec<Entity> {
        let mut entities: Vec<Entity> = self.world.query::<&Creep>().iter().map(|(e, _)| e).collect();
        entities.sort_by_key(|e| e.id());
        entities
    }

    pub fn rebuild_creep_grid(&mut self) {
        let grid = &mut self.state.creep_grid;
        grid.clear();
        let mut creeps: Vec<(Entity, Vec2)> = self
            .world
            .query::<&Creep>()
            .iter()
            .filter(|(_, c)| !c.disposed)
            .map(|(e, c)| (e, c.pos))
            .collect();
        creeps.sort_by_key(|(e, _)| e.id());
        for (e, pos) in creeps {
            grid.insert(e, pos);
        }
    }

    // Map objects

    pub fn spawn_source(&mut self, source: EssenceSource) -> Entity {
        self.world.spawn((source,))
    }

    pub fn source_pos(&self, e: Entity) -> Option<Vec2> {
        self.world.get::<&EssenceSource>(e).ok().filter(|s| !s.disposed).map(|s| s.pos)
    }

    pub fn source_entities(&self) -> Vec<Entity> {
        let mut entities: Vec<Entity> = self
            .world
            .query::<&EssenceSource>()
            .iter()
            .filter(|(_, s)| !s.disposed)
            .map(|(e, _)| e)
            .collect();
        entities.sort_by_key(|e| e.id());
        entities
    }

    /// Drop exhausted sources from the world.
    pub fn cleanup_sources(&mut self) {
        let dead: Vec<Entity> = self
            .world
            .query::<&EssenceSource>()
            .iter()
            .filter(|(_, s)| s.disposed)
            .map(|(e, _)| e)
            .collect();
        for e in dead {
            let _ = self.world.despawn(e);
        }
    }

    pub fn construction_pos(&self, e: Entity) -> Option<Vec2> {
        self.world.get::<&Construction>(e).ok().filter(|c| !c.disposed).map(|c| c.pos)
    }

    pub fn building_pos(&self, e: Entity) -> Option<Vec2> {
        self.world.get::<&NeutralBuilding>(e).ok().map(|b| b.pos)
    }

    /// Position of whatever `target` refers to, if it still exists.
    pub fn target_pos(&self, target: AgentTarget) -> Option<Vec2> {
        match target {
            AgentTarget::Agent(e) => self.agent_pos(e),
            AgentTarget::Creep(e) => self.creep_pos(e),
            AgentTarget::Source(e) => self.source_pos(e),
            AgentTarget::Construction(e) => self.construction_pos(e),
            AgentTarget::Building(e) => self.building_pos(e),
            AgentTarget::Colony(c) | AgentTarget::Tether(c) => self.live_colony(c).map(|c| c.pos),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dronecolony_logic::stats::{DEN_CORE, GUNPOINT, TETHER_BEACON, WORKER};

    fn context() -> (SimContext, ColonyId) {
        let mut ctx = SimContext::new(Rect::from_size(800.0, 800.0), 1);
        let id = ctx.add_colony(ColonyCore::new(ColonyId(0), &DEN_CORE, Vec2::new(400.0, 400.0)));
        (ctx, id)
    }

    #[test]
    fn test_disposed_agent_is_detached() {
        let (mut ctx, id) = context();
        let e = ctx.spawn_agent(Agent::new(&WORKER, id, Vec2::ZERO));
        ctx.attach_agent(id, e);
        assert_eq!(ctx.colonies[0].agents.total_num(), 1);

        ctx.destroy_agent(e);
        assert!(!ctx.agent_exists(e));
        assert_eq!(ctx.colonies[0].agents.total_num(), 0);
        assert_eq!(ctx.state.events.pending().len(), 1);
        assert!(ctx.with_agent(e, |_, _| ()).is_none());
    }

    #[test]
    fn test_agent_is_invisible_while_detached() {
        let (mut ctx, id) = context();
        let e = ctx.spawn_agent(Agent::new(&WORKER, id, Vec2::ZERO));
        ctx.attach_agent(id, e);
        let seen = ctx.with_agent(e, |_, ctx| ctx.agent_exists(e));
        assert_eq!(seen, Some(false));
        assert!(ctx.agent_exists(e));
    }

    #[test]
    fn test_turret_marks_and_unmarks_grid() {
        let (mut ctx, id) = context();
        let pos = Vec2::new(100.0, 100.0);
        let e = ctx.spawn_agent(Agent::new(&GUNPOINT, id, pos));
        ctx.attach_agent(id, e);
        assert!(!ctx.state.path_grid.is_pos_free(pos));
        assert_eq!(ctx.colonies[0].turrets, vec![e]);
        assert_eq!(ctx.world.get::<&Agent>(e).unwrap().mode, AgentMode::GuardForever);

        ctx.destroy_agent(e);
        assert!(ctx.state.path_grid.is_pos_free(pos));
        assert!(ctx.colonies[0].turrets.is_empty());
    }

    #[test]
    fn test_destroyed_beacon_releases_tether() {
        let (mut ctx, id) = context();
        let e = ctx.spawn_agent(Agent::new(&TETHER_BEACON, id, Vec2::ZERO));
        ctx.attach_agent(id, e);
        ctx.colonies[0].tether = 1;
        ctx.world.get::<&mut Agent>(e).unwrap().target = Some(AgentTarget::Tether(id));
        ctx.destroy_agent(e);
        assert_eq!(ctx.colonies[0].tether, 0);
    }

    #[test]
    fn test_add_priority_keeps_total() {
        let (mut ctx, id) = context();
        ctx.add_priority(id, ColonyPriority::Security, 0.3);
        let total = ctx.colonies[0].priorities.total();
        assert!((total - 1.0).abs() < 1e-9);
        assert_eq!(ctx.state.events.flush(), 1);
    }
}
