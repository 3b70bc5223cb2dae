//! Simulation engine - main entry point for running the simulation

use hecs::Entity;

use crate::components::*;
use crate::config::SimConfig;
use crate::error::SimError;
use crate::events::SimEvent;
use crate::generation::{generate_map, MapLayout};
use crate::presentation::Presentation;
use crate::result::SimResult;
use crate::systems::*;
use crate::world::SimContext;

/// Main simulation engine
pub struct SimulationEngine {
    ctx: SimContext,
    arena: ArenaManager,
    config: SimConfig,
    layout: MapLayout,
    ticks: u64,
}

impl SimulationEngine {
    /// Validate `config` and generate the starting map.
    pub fn new(config: SimConfig) -> Result<Self, SimError> {
        let errors = config.validate();
        if !errors.is_empty() {
            return Err(SimError::InvalidConfig(errors));
        }

        let map = Rect::from_size(config.map_width, config.map_height);
        let mut ctx = SimContext::new(map, config.seed);
        let layout = generate_map(&mut ctx, &config);
        let arena = ArenaManager::new(&config, &mut ctx.rng);
        log::info!(
            "simulation ready: seed {}, {} arena, first wave in {:.0}s",
            config.seed,
            if config.infinite_arena { "infinite" } else { "finite" },
            arena.level_start_delay()
        );

        Ok(Self {
            ctx,
            arena,
            config,
            layout,
            ticks: 0,
        })
    }

    /// Parse, validate and build in one step.
    pub fn from_json(json: &str) -> Result<Self, SimError> {
        Self::new(SimConfig::load(json)?)
    }

    /// Advance the simulation by `delta` seconds.
    pub fn update(&mut self, delta: f64) {
        if self.is_finished() {
            self.ctx.state.events.flush();
            return;
        }
        let ctx = &mut self.ctx;

        ctx.rebuild_creep_grid();
        update_colonies(ctx, delta);
        update_agents(ctx, delta);
        update_creeps(ctx, delta);
        resolve_pending_hits(ctx, delta);
        self.arena.update(ctx, delta);
        ctx.cleanup_sources();
        update_cooldowns(ctx, delta);

        ctx.state.time += delta;
        self.ticks += 1;
        ctx.state.events.flush();
    }

    /// Run fixed steps until `seconds` of simulated time pass or the run
    /// ends. Returns the number of steps taken.
    pub fn run_for(&mut self, seconds: f64, step: f64) -> u64 {
        let start = self.ticks;
        let mut elapsed = 0.0;
        while elapsed < seconds && !self.is_finished() {
            self.update(step);
            elapsed += step;
        }
        self.ticks - start
    }

    /// Register a callback for every event, delivered once per tick.
    pub fn subscribe(&mut self, handler: impl FnMut(&SimEvent) + 'static) {
        self.ctx.state.events.subscribe(Box::new(handler));
    }

    pub fn set_presentation(&mut self, presentation: Box<dyn Presentation>) {
        self.ctx.state.presentation = presentation;
    }

    /// Order a colony to fly to `pos`. False when it can't take off now.
    pub fn relocate_colony(&mut self, id: ColonyId, pos: Vec2) -> bool {
        relocate_colony(&mut self.ctx, id, pos)
    }

    /// Shift a colony priority; the others are renormalized.
    pub fn add_priority(&mut self, id: ColonyId, priority: ColonyPriority, delta: f64) {
        self.ctx.add_priority(id, priority, delta);
    }

    /// True once the arena is won or every colony is gone.
    pub fn is_finished(&self) -> bool {
        self.arena.is_victory() || self.ctx.colonies.iter().all(|c| c.disposed)
    }

    pub fn result(&self) -> &SimResult {
        &self.ctx.state.result
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn layout(&self) -> &MapLayout {
        &self.layout
    }

    pub fn arena(&self) -> &ArenaManager {
        &self.arena
    }

    pub fn colony(&self, id: ColonyId) -> Option<&ColonyCore> {
        self.ctx.colony(id)
    }

    pub fn colonies(&self) -> &[ColonyCore] {
        &self.ctx.colonies
    }

    pub fn agent(&self, e: Entity) -> Option<Agent> {
        self.ctx.world.get::<&Agent>(e).ok().map(|a| (*a).clone())
    }

    pub fn agent_count(&self) -> usize {
        self.ctx.agent_entities().len()
    }

    pub fn creep_count(&self) -> usize {
        self.ctx.creep_entities().len()
    }

    /// Simulated seconds since the start.
    pub fn time(&self) -> f64 {
        self.ctx.state.time
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn context(&self) -> &SimContext {
        &self.ctx
    }

    /// Direct access for scenario setup and tests.
    pub fn context_mut(&mut self) -> &mut SimContext {
        &mut self.ctx
    }
}

/// Teleporter and building cooldowns.
fn update_cooldowns(ctx: &mut SimContext, delta: f64) {
    for t in &mut ctx.state.teleporters {
        t.cooldown = (t.cooldown - delta).max(0.0);
    }
    for (_, b) in ctx.world.query_mut::<&mut NeutralBuilding>() {
        b.cooldown = (b.cooldown - delta).max(0.0);
    }
}

impl std::fmt::Debug for SimulationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulationEngine")
            .field("time", &self.ctx.state.time)
            .field("ticks", &self.ticks)
            .field("level", &self.arena.level())
            .field("colonies", &self.ctx.colonies.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = SimConfig {
            colony_count: 0,
            ..SimConfig::default()
        };
        assert!(matches!(SimulationEngine::new(config), Err(SimError::InvalidConfig(_))));
    }

    #[test]
    fn test_update_advances_time() {
        let mut engine = SimulationEngine::new(SimConfig::default()).unwrap();
        let steps = engine.run_for(2.0, 0.1);
        assert!((19..=21).contains(&steps));
        assert!((engine.time() - 2.0).abs() < 0.11);
        assert_eq!(engine.ticks(), steps);
        assert!(!engine.is_finished());
    }

    #[test]
    fn test_building_cooldown_decays() {
        let mut engine = SimulationEngine::new(SimConfig::default()).unwrap();
        let building = engine.layout().buildings[0];
        engine
            .context_mut()
            .world
            .get::<&mut NeutralBuilding>(building)
            .unwrap()
            .cooldown = 1.0;
        engine.update(0.5);
        let left = engine.context().world.get::<&NeutralBuilding>(building).unwrap().cooldown;
        assert!((left - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_first_wave_event() {
        let mut engine = SimulationEngine::new(SimConfig {
            seed: 3,
            ..SimConfig::default()
        })
        .unwrap();
        let waves = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&waves);
        engine.subscribe(move |e| {
            if let SimEvent::WaveSpawned { level } = e {
                sink.borrow_mut().push(*level);
            }
        });
        engine.run_for(91.0, 0.5);
        assert_eq!(*waves.borrow(), vec![1]);
        assert_eq!(engine.result().waves_spawned, 1);
        assert_eq!(engine.arena().level(), 2);
    }

    #[test]
    fn test_priority_change_is_delivered() {
        let mut engine = SimulationEngine::new(SimConfig::default()).unwrap();
        let seen = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&seen);
        engine.subscribe(move |e| {
            if matches!(e, SimEvent::PrioritiesChanged { .. }) {
                *sink.borrow_mut() += 1;
            }
        });
        engine.add_priority(ColonyId(0), ColonyPriority::Security, 0.2);
        engine.update(0.1);
        assert!(*seen.borrow() >= 1);
        let total: f64 = ColonyPriority::ALL
            .iter()
            .map(|&p| engine.colony(ColonyId(0)).unwrap().priority(p))
            .sum();
        assert!((total - 1.0).abs() < 1e-9);
    }
}
