//! Spatial services: the ground occupancy grid, the creep cluster grid and
//! small geometry helpers shared by the systems.

use std::collections::VecDeque;

use hecs::Entity;

use crate::components::{Rect, Vec2};
use crate::rng::SimRng;

/// Edge of one occupancy cell in world units.
pub const CELL_SIZE: f64 = 32.0;
/// Creep clusters per axis; positions outside the map go to the fallback.
pub const CLUSTER_GRID_SIZE: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridCoord {
    pub x: i32,
    pub y: i32,
}

impl GridCoord {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Right,
    Down,
    Left,
}

impl Direction {
    pub const ALL: [Direction; 4] = [Direction::Up, Direction::Right, Direction::Down, Direction::Left];

    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Right => (1, 0),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
        }
    }
}

/// One cell step in `dir`.
pub fn pos_move(pos: Vec2, dir: Direction) -> Vec2 {
    let (dx, dy) = dir.delta();
    pos + Vec2::new(f64::from(dx) * CELL_SIZE, f64::from(dy) * CELL_SIZE)
}

pub fn pos_to_coord(pos: Vec2) -> GridCoord {
    GridCoord::new((pos.x / CELL_SIZE).floor() as i32, (pos.y / CELL_SIZE).floor() as i32)
}

/// Center of the cell.
pub fn coord_to_pos(coord: GridCoord) -> Vec2 {
    Vec2::new(
        f64::from(coord.x) * CELL_SIZE + CELL_SIZE / 2.0,
        f64::from(coord.y) * CELL_SIZE + CELL_SIZE / 2.0,
    )
}

/// Snap to the center of the containing cell.
pub fn align_pos(pos: Vec2) -> Vec2 {
    coord_to_pos(pos_to_coord(pos))
}

/// Top-left cell of the 2x2 footprint centered at `pos`.
pub fn footprint_coord(pos: Vec2) -> GridCoord {
    pos_to_coord(pos - Vec2::new(CELL_SIZE / 2.0, CELL_SIZE / 2.0))
}

/// Center of the 2x2 footprint whose top-left cell is `coord`.
pub fn footprint_pos(coord: GridCoord) -> Vec2 {
    coord_to_pos(coord) + Vec2::new(CELL_SIZE / 2.0, CELL_SIZE / 2.0)
}

/// Offsets tried around a blocked landing spot.
pub const NEAR_OFFSETS: [(i32, i32); 8] = [
    (-2, -2),
    (0, -2),
    (2, -2),
    (2, 0),
    (2, 2),
    (0, 2),
    (-2, 2),
    (-2, 0),
];

/// Ground occupancy: landed colony footprints and turrets.
#[derive(Debug, Clone)]
pub struct PathGrid {
    pub width: i32,
    pub height: i32,
    occupied: Vec<bool>,
}

impl PathGrid {
    pub fn new(map: &Rect) -> Self {
        let width = (map.width() / CELL_SIZE).ceil().max(1.0) as i32;
        let height = (map.height() / CELL_SIZE).ceil().max(1.0) as i32;
        Self {
            width,
            height,
            occupied: vec![false; (width * height) as usize],
        }
    }

    fn index(&self, c: GridCoord) -> Option<usize> {
        if c.x < 0 || c.y < 0 || c.x >= self.width || c.y >= self.height {
            return None;
        }
        Some((c.y * self.width + c.x) as usize)
    }

    pub fn in_bounds(&self, c: GridCoord) -> bool {
        self.index(c).is_some()
    }

    pub fn is_free(&self, c: GridCoord) -> bool {
        self.index(c).map_or(false, |i| !self.occupied[i])
    }

    pub fn set(&mut self, c: GridCoord, occupied: bool) {
        if let Some(i) = self.index(c) {
            self.occupied[i] = occupied;
        }
    }

    pub fn is_free_2x2(&self, c: GridCoord) -> bool {
        self.is_free(c) && self.is_free(c.offset(1, 0)) && self.is_free(c.offset(0, 1)) && self.is_free(c.offset(1, 1))
    }

    pub fn set_2x2(&mut self, c: GridCoord, occupied: bool) {
        for (dx, dy) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
            self.set(c.offset(dx, dy), occupied);
        }
    }

    pub fn is_pos_free(&self, pos: Vec2) -> bool {
        self.is_free(pos_to_coord(pos))
    }

    /// Breadth-first route over free cells. The destination cell may be
    /// occupied; an unreachable destination gives an empty path.
    pub fn build_path(&self, from: Vec2, to: Vec2) -> VecDeque<Direction> {
        let start = pos_to_coord(from);
        let goal = pos_to_coord(to);
        let (Some(start_i), Some(goal_i)) = (self.index(start), self.index(goal)) else {
            return VecDeque::new();
        };
        if start_i == goal_i {
            return VecDeque::new();
        }

        let mut came_from: Vec<Option<(usize, Direction)>> = vec![None; self.occupied.len()];
        let mut visited = vec![false; self.occupied.len()];
        let mut queue = VecDeque::new();
        visited[start_i] = true;
        queue.push_back(start);

        while let Some(cur) = queue.pop_front() {
            let Some(cur_i) = self.index(cur) else {
                continue;
            };
            if cur_i == goal_i {
                break;
            }
            for dir in Direction::ALL {
                let (dx, dy) = dir.delta();
                let next = cur.offset(dx, dy);
                let Some(next_i) = self.index(next) else {
                    continue;
                };
                if visited[next_i] || (next_i != goal_i && self.occupied[next_i]) {
                    continue;
                }
                visited[next_i] = true;
                came_from[next_i] = Some((cur_i, dir));
                queue.push_back(next);
            }
        }

        let mut path = VecDeque::new();
        let mut cur = goal_i;
        while let Some((prev, dir)) = came_from[cur] {
            path.push_front(dir);
            cur = prev;
        }
        path
    }
}

/// Creeps bucketed into an 8x8 grid over the map, plus one fallback cluster
/// for anything outside it. Rebuilt once per tick.
#[derive(Debug, Clone)]
pub struct CreepGrid {
    map: Rect,
    cells: Vec<Vec<Entity>>,
    pub fallback: Vec<Entity>,
}

impl CreepGrid {
    pub fn new(map: Rect) -> Self {
        Self {
            map,
            cells: vec![Vec::new(); CLUSTER_GRID_SIZE * CLUSTER_GRID_SIZE],
            fallback: Vec::new(),
        }
    }

    pub fn clear(&mut self) {
        for c in &mut self.cells {
            c.clear();
        }
        self.fallback.clear();
    }

    pub fn cell_width(&self) -> f64 {
        self.map.width() / CLUSTER_GRID_SIZE as f64
    }

    pub fn cell_height(&self) -> f64 {
        self.map.height() / CLUSTER_GRID_SIZE as f64
    }

    pub fn cell_of(&self, pos: Vec2) -> Option<(usize, usize)> {
        if !self.map.contains(pos) {
            return None;
        }
        let x = ((pos.x - self.map.min.x) / self.cell_width()) as usize;
        let y = ((pos.y - self.map.min.y) / self.cell_height()) as usize;
        Some((x.min(CLUSTER_GRID_SIZE - 1), y.min(CLUSTER_GRID_SIZE - 1)))
    }

    pub fn cell_rect(&self, x: usize, y: usize) -> Rect {
        let min = self.map.min + Vec2::new(x as f64 * self.cell_width(), y as f64 * self.cell_height());
        Rect::new(min, min + Vec2::new(self.cell_width(), self.cell_height()))
    }

    pub fn insert(&mut self, e: Entity, pos: Vec2) {
        match self.cell_of(pos) {
            Some((x, y)) => self.cells[y * CLUSTER_GRID_SIZE + x].push(e),
            None => self.fallback.push(e),
        }
    }

    pub fn cell(&self, x: usize, y: usize) -> &[Entity] {
        &self.cells[y * CLUSTER_GRID_SIZE + x]
    }

    /// Inclusive cell window a weapon at `pos` with `range` may reach.
    pub fn search_window(&self, pos: Vec2, range: f64) -> Option<((usize, usize), (usize, usize))> {
        let (cx, cy) = self.cell_of(pos)?;
        let cell = self.cell_rect(cx, cy);
        let w = self.cell_width();
        let h = self.cell_height();
        let max_i = CLUSTER_GRID_SIZE as i64 - 1;

        let expand = |delta: f64, size: f64| -> i64 {
            if delta < range {
                ((range - delta) / size).ceil() as i64
            } else {
                0
            }
        };
        let x0 = (cx as i64 - expand(pos.x - cell.min.x, w)).clamp(0, max_i);
        let x1 = (cx as i64 + expand(cell.max.x - pos.x, w)).clamp(0, max_i);
        let y0 = (cy as i64 - expand(pos.y - cell.min.y, h)).clamp(0, max_i);
        let y1 = (cy as i64 + expand(cell.max.y - pos.y, h)).clamp(0, max_i);
        Some(((x0 as usize, y0 as usize), (x1 as usize, y1 as usize)))
    }
}

/// `pos` pulled inside the map with `pad` margin.
pub fn corrected_pos(map: &Rect, pos: Vec2, pad: f64) -> Vec2 {
    map.clamp_pos(pos, pad)
}

/// Uniform random point inside `sector`.
pub fn random_sector_pos(rng: &mut SimRng, sector: &Rect) -> Vec2 {
    Vec2::new(
        rng.float_range(sector.min.x, sector.max.x),
        rng.float_range(sector.min.y, sector.max.y),
    )
}

/// Lead a moving target: where a projectile of `speed` fired from `from`
/// meets a target at `target` moving with `vel`.
pub fn snipe_pos(speed: f64, from: Vec2, target: Vec2, vel: Vec2) -> Vec2 {
    if speed <= 0.0 || vel.is_zero() {
        return target;
    }
    let t = from.dist(target) / speed;
    target + vel * t
}

/// Point `dist` away from `pos`, directed away from `threat` with a little
/// angular jitter.
pub fn retreat_pos(rng: &mut SimRng, pos: Vec2, threat: Vec2, dist: f64) -> Vec2 {
    let angle = threat.angle_to(pos) + rng.float_range(-0.2, 0.2);
    pos.move_in_direction(dist, angle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coord_roundtrip_aligns() {
        let p = Vec2::new(70.0, 10.0);
        assert_eq!(pos_to_coord(p), GridCoord::new(2, 0));
        assert_eq!(align_pos(p), Vec2::new(80.0, 16.0));
        let c = footprint_coord(Vec2::new(64.0, 64.0));
        assert_eq!(c, GridCoord::new(1, 1));
        assert_eq!(footprint_pos(c), Vec2::new(64.0, 64.0));
    }

    #[test]
    fn test_path_avoids_occupied_cells() {
        let mut grid = PathGrid::new(&Rect::from_size(320.0, 320.0));
        for y in 0..4 {
            grid.set(GridCoord::new(2, y), true);
        }
        let path = grid.build_path(coord_to_pos(GridCoord::new(0, 0)), coord_to_pos(GridCoord::new(4, 0)));
        assert!(!path.is_empty());
        let mut c = GridCoord::new(0, 0);
        for dir in &path {
            let (dx, dy) = dir.delta();
            c = c.offset(dx, dy);
            assert!(grid.is_free(c) || c == GridCoord::new(4, 0));
        }
        assert_eq!(c, GridCoord::new(4, 0));
        assert!(path.len() > 4);
    }

    #[test]
    fn test_unreachable_path_is_empty() {
        let mut grid = PathGrid::new(&Rect::from_size(96.0, 96.0));
        grid.set(GridCoord::new(1, 0), true);
        grid.set(GridCoord::new(0, 1), true);
        grid.set(GridCoord::new(1, 1), true);
        let path = grid.build_path(coord_to_pos(GridCoord::new(0, 0)), coord_to_pos(GridCoord::new(2, 2)));
        assert!(path.is_empty());
    }

    #[test]
    fn test_footprint_marking() {
        let mut grid = PathGrid::new(&Rect::from_size(320.0, 320.0));
        let c = GridCoord::new(3, 3);
        assert!(grid.is_free_2x2(c));
        grid.set_2x2(c, true);
        assert!(!grid.is_free_2x2(c));
        assert!(!grid.is_free_2x2(GridCoord::new(2, 2)));
        assert!(grid.is_free_2x2(GridCoord::new(5, 5)));
        grid.set_2x2(c, false);
        assert!(grid.is_free_2x2(c));
    }

    #[test]
    fn test_creep_grid_window() {
        let map = Rect::from_size(800.0, 800.0);
        let grid = CreepGrid::new(map);
        // Cells are 100 wide; a 150 range from the middle of a cell reaches one over.
        let ((x0, y0), (x1, y1)) = grid.search_window(Vec2::new(450.0, 450.0), 150.0).unwrap();
        assert_eq!((x0, x1), (3, 5));
        assert_eq!((y0, y1), (3, 5));
        let ((x0, _), (x1, _)) = grid.search_window(Vec2::new(410.0, 450.0), 250.0).unwrap();
        assert_eq!((x0, x1), (1, 6));
        assert!(grid.search_window(Vec2::new(-5.0, 0.0), 10.0).is_none());
    }

    #[test]
    fn test_snipe_leads_target() {
        let p = snipe_pos(100.0, Vec2::ZERO, Vec2::new(100.0, 0.0), Vec2::new(0.0, 10.0));
        assert_eq!(p, Vec2::new(100.0, 10.0));
        assert_eq!(snipe_pos(0.0, Vec2::ZERO, Vec2::new(5.0, 5.0), Vec2::new(1.0, 0.0)), Vec2::new(5.0, 5.0));
    }

    #[test]
    fn test_retreat_moves_away() {
        let mut rng = SimRng::new(4);
        let p = retreat_pos(&mut rng, Vec2::new(100.0, 0.0), Vec2::ZERO, 100.0);
        assert!(p.x > 150.0);
    }
}
