//! Starting map generation

use dronecolony_logic::resources::SourceKind;
use dronecolony_logic::stats::{core_stats, AgentKind, CoreKind, WORKER};
use hecs::Entity;

use crate::components::*;
use crate::config::SimConfig;
use crate::spatial::{align_pos, footprint_coord, footprint_pos};
use crate::systems::assign_mode_to;
use crate::world::SimContext;

/// Keep generated objects this far from the map edge.
const EDGE_PAD: f64 = 128.0;
/// Objects other than a colony's own sources stay out of this radius.
const COLONY_CLEARANCE: f64 = 160.0;
const SOURCES_PER_COLONY: usize = 3;
const PLACEMENT_TRIES: usize = 20;

const NEAR_SOURCE_KINDS: [SourceKind; 2] = [SourceKind::Organic, SourceKind::Iron];
const MAP_SOURCE_KINDS: [SourceKind; 8] = [
    SourceKind::Organic,
    SourceKind::Iron,
    SourceKind::Iron,
    SourceKind::Gold,
    SourceKind::Crystal,
    SourceKind::Oil,
    SourceKind::RedOil,
    SourceKind::RedCrystal,
];
const CONSTRUCTION_KINDS: [AgentKind; 3] = [AgentKind::Gunpoint, AgentKind::TetherBeacon, AgentKind::BeamTower];

/// Entities created for a fresh map.
#[derive(Debug, Clone, Default)]
pub struct MapLayout {
    pub colonies: Vec<ColonyId>,
    pub workers: Vec<Entity>,
    pub sources: Vec<Entity>,
    pub buildings: Vec<Entity>,
    pub constructions: Vec<Entity>,
}

/// Populate an empty context from `config`.
pub fn generate_map(ctx: &mut SimContext, config: &SimConfig) -> MapLayout {
    let mut layout = MapLayout::default();

    let positions = colony_positions(ctx, config.colony_count);
    for (i, &pos) in positions.iter().enumerate() {
        let id = generate_colony(ctx, config, i, pos);
        layout.colonies.push(id);
        layout.workers.extend(generate_workers(ctx, id, pos, config.starting_workers));
    }

    for &pos in &positions {
        for _ in 0..SOURCES_PER_COLONY.min(config.resource_sources) {
            let spot = pos + Vec2::from_angle(ctx.rng.rad()) * ctx.rng.float_range(96.0, 224.0);
            let kind = *ctx.rng.pick(&NEAR_SOURCE_KINDS).unwrap_or(&SourceKind::Iron);
            let spot = ctx.state.map.clamp_pos(spot, EDGE_PAD / 2.0);
            layout.sources.push(spawn_source(ctx, config, kind, spot));
        }
    }
    let near = positions.len() * SOURCES_PER_COLONY.min(config.resource_sources);
    for _ in near..config.resource_sources {
        let kind = *ctx.rng.pick(&MAP_SOURCE_KINDS).unwrap_or(&SourceKind::Iron);
        let spot = free_pos(ctx, &positions);
        layout.sources.push(spawn_source(ctx, config, kind, spot));
    }

    for _ in 0..config.teleporter_pairs {
        generate_teleporter_pair(ctx, &positions);
    }

    for _ in 0..config.neutral_buildings {
        let pos = align_pos(free_pos(ctx, &positions));
        let e = ctx.world.spawn((NeutralBuilding::new(BuildingKind::EvoPillar, pos),));
        layout.buildings.push(e);
    }

    for i in 0..config.constructions {
        let Some(&colony) = layout.colonies.get(i % layout.colonies.len().max(1)) else {
            break;
        };
        let center = positions[colony.index()];
        let kind = CONSTRUCTION_KINDS[i % CONSTRUCTION_KINDS.len()];
        let pos = align_pos(center + Vec2::from_angle(ctx.rng.rad()) * ctx.rng.float_range(96.0, 150.0));
        let e = ctx.world.spawn((Construction::new(kind, colony, pos),));
        layout.constructions.push(e);
    }

    log::info!(
        "generated map {}x{}: {} colonies, {} sources, {} teleporter pairs",
        ctx.state.map.width(),
        ctx.state.map.height(),
        layout.colonies.len(),
        layout.sources.len(),
        config.teleporter_pairs
    );
    layout
}

/// One colony in the center, several spread on a ring around it.
fn colony_positions(ctx: &mut SimContext, count: usize) -> Vec<Vec2> {
    let map = ctx.state.map;
    let center = map.center();
    if count <= 1 {
        return vec![footprint_pos(footprint_coord(center))];
    }
    let ring = map.width().min(map.height()) * 0.3;
    let start = ctx.rng.rad();
    let step = std::f64::consts::TAU / count as f64;
    (0..count)
        .map(|i| {
            let pos = center + Vec2::from_angle(start + step * i as f64) * ring;
            footprint_pos(footprint_coord(map.clamp_pos(pos, EDGE_PAD)))
        })
        .collect()
}

fn generate_colony(ctx: &mut SimContext, config: &SimConfig, index: usize, pos: Vec2) -> ColonyId {
    let stats = core_stats(config.core);
    let mut core = ColonyCore::new(ColonyId(index as u32), stats, pos);
    core.resources = config.starting_resources;
    let id = ctx.add_colony(core);
    // Arks hover and leave the ground free.
    if stats.kind == CoreKind::Den {
        ctx.state.path_grid.set_2x2(footprint_coord(pos), true);
    }
    id
}

fn generate_workers(ctx: &mut SimContext, colony: ColonyId, pos: Vec2, count: usize) -> Vec<Entity> {
    let mut workers = Vec::with_capacity(count);
    for _ in 0..count {
        let spot = pos + ctx.rng.offset(-48.0, 48.0);
        let e = ctx.spawn_agent(Agent::new(&WORKER, colony, spot));
        ctx.attach_agent(colony, e);
        assign_mode_to(ctx, e, AgentMode::Standby, Vec2::ZERO, None);
        workers.push(e);
    }
    workers
}

fn spawn_source(ctx: &mut SimContext, config: &SimConfig, kind: SourceKind, pos: Vec2) -> Entity {
    let stats = kind.stats();
    let capacity = ctx.rng.int_range(i64::from(stats.min_capacity), i64::from(stats.max_capacity));
    let capacity = ((capacity as f64) * config.resource_multiplier).round().max(1.0) as u32;
    ctx.spawn_source(EssenceSource::new(kind, pos, capacity))
}

/// Random spot away from every colony. Falls back to the last roll when the
/// map is too crowded.
fn free_pos(ctx: &mut SimContext, colonies: &[Vec2]) -> Vec2 {
    let map = ctx.state.map;
    let mut pos = map.center();
    for _ in 0..PLACEMENT_TRIES {
        pos = Vec2::new(
            ctx.rng.float_range(map.min.x + EDGE_PAD, map.max.x - EDGE_PAD),
            ctx.rng.float_range(map.min.y + EDGE_PAD, map.max.y - EDGE_PAD),
        );
        if colonies.iter().all(|c| c.dist(pos) >= COLONY_CLEARANCE) {
            break;
        }
    }
    pos
}

fn generate_teleporter_pair(ctx: &mut SimContext, colonies: &[Vec2]) {
    let a = footprint_pos(footprint_coord(free_pos(ctx, colonies)));
    let b = footprint_pos(footprint_coord(free_pos(ctx, colonies)));
    let index = ctx.state.teleporters.len();
    ctx.state.teleporters.push(Teleporter {
        pos: a,
        other: index + 1,
        cooldown: 0.0,
    });
    ctx.state.teleporters.push(Teleporter {
        pos: b,
        other: index,
        cooldown: 0.0,
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generate(config: &SimConfig) -> (SimContext, MapLayout) {
        let mut ctx = SimContext::new(Rect::from_size(config.map_width, config.map_height), config.seed);
        let layout = generate_map(&mut ctx, config);
        (ctx, layout)
    }

    #[test]
    fn test_default_map() {
        let config = SimConfig::default();
        let (ctx, layout) = generate(&config);
        assert_eq!(layout.colonies.len(), 1);
        assert_eq!(layout.workers.len(), 5);
        assert_eq!(layout.sources.len(), 14);
        assert_eq!(layout.buildings.len(), 1);
        assert_eq!(layout.constructions.len(), 1);
        assert_eq!(ctx.colonies[0].agents.total_num(), 5);
        assert_eq!(ctx.colonies[0].resources, 40.0);
        let pos = ctx.colonies[0].pos;
        assert!(!ctx.state.path_grid.is_free_2x2(footprint_coord(pos)));
    }

    #[test]
    fn test_colonies_on_ring() {
        let config = SimConfig {
            colony_count: 3,
            teleporter_pairs: 2,
            ..SimConfig::default()
        };
        let (ctx, layout) = generate(&config);
        assert_eq!(layout.colonies.len(), 3);
        assert_eq!(ctx.state.teleporters.len(), 4);
        assert_eq!(ctx.state.teleporters[1].other, 0);
        assert_eq!(ctx.state.teleporters[2].other, 3);
        for (i, a) in ctx.colonies.iter().enumerate() {
            assert_eq!(a.id, ColonyId(i as u32));
            for b in &ctx.colonies[i + 1..] {
                assert!(a.pos.dist(b.pos) > 300.0);
            }
        }
    }

    #[test]
    fn test_ark_leaves_ground_free() {
        let config = SimConfig {
            core: CoreKind::Ark,
            ..SimConfig::default()
        };
        let (ctx, _) = generate(&config);
        let pos = ctx.colonies[0].pos;
        assert!(ctx.state.path_grid.is_free_2x2(footprint_coord(pos)));
    }

    #[test]
    fn test_resource_multiplier_scales_capacity() {
        let config = SimConfig {
            resource_multiplier: 3.0,
            resource_sources: 3,
            ..SimConfig::default()
        };
        let (ctx, layout) = generate(&config);
        for e in layout.sources {
            let source = ctx.world.get::<&EssenceSource>(e).unwrap();
            assert!(source.resource >= source.stats().min_capacity * 3);
        }
    }

    #[test]
    fn test_same_seed_same_map() {
        let config = SimConfig {
            seed: 42,
            colony_count: 2,
            ..SimConfig::default()
        };
        let (a, _) = generate(&config);
        let (b, _) = generate(&config);
        let pos = |ctx: &SimContext| ctx.colonies.iter().map(|c| c.pos).collect::<Vec<_>>();
        assert_eq!(pos(&a), pos(&b));
        let sources = |ctx: &SimContext| {
            ctx.source_entities()
                .into_iter()
                .filter_map(|e| ctx.source_pos(e))
                .collect::<Vec<_>>()
        };
        assert_eq!(sources(&a), sources(&b));
    }
}
