//! Grid navigation for enemies without line of sight
//!
//! The arena is rasterised into square cells; a cell is blocked when any wall
//! overlaps it. [`NavGrid::next_waypoint`] runs a 4-neighbour A* and only
//! hands back the centre of the first step, so callers re-plan every tick.

use shared::{Wall, NAV_CELL_SIZE, WORLD_HEIGHT, WORLD_WIDTH};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};

pub type Cell = (i32, i32);

const NEIGHBOR_STEPS: [Cell; 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

#[derive(Debug, Clone)]
pub struct NavGrid {
    cell_size: f32,
    width: i32,
    height: i32,
    blocked: Vec<bool>,
}

impl NavGrid {
    /// Grid over the standard arena.
    pub fn from_walls(walls: &[Wall]) -> Self {
        Self::build(walls, WORLD_WIDTH, WORLD_HEIGHT, NAV_CELL_SIZE)
    }

    pub fn build(walls: &[Wall], world_width: f32, world_height: f32, cell_size: f32) -> Self {
        let width = (world_width / cell_size) as i32;
        let height = (world_height / cell_size) as i32;
        let mut grid = Self {
            cell_size,
            width,
            height,
            blocked: vec![false; (width.max(0) * height.max(0)) as usize],
        };

        for wall in walls {
            let rect = &wall.rect;
            let x0 = (rect.left() / cell_size).floor() as i32;
            let x1 = ((rect.right() - 1.0) / cell_size).floor() as i32;
            let y0 = (rect.top() / cell_size).floor() as i32;
            let y1 = ((rect.bottom() - 1.0) / cell_size).floor() as i32;

            for gx in x0.max(0)..=x1.min(width - 1) {
                for gy in y0.max(0)..=y1.min(height - 1) {
                    if let Some(index) = grid.index((gx, gy)) {
                        grid.blocked[index] = true;
                    }
                }
            }
        }
        grid
    }

    pub fn dimensions(&self) -> (i32, i32) {
        (self.width, self.height)
    }

    fn index(&self, (gx, gy): Cell) -> Option<usize> {
        if gx < 0 || gy < 0 || gx >= self.width || gy >= self.height {
            None
        } else {
            Some((gy * self.width + gx) as usize)
        }
    }

    pub fn is_blocked(&self, cell: Cell) -> bool {
        self.index(cell).map_or(true, |i| self.blocked[i])
    }

    pub fn cell_of(&self, x: f32, y: f32) -> Cell {
        (
            (x / self.cell_size).floor() as i32,
            (y / self.cell_size).floor() as i32,
        )
    }

    pub fn cell_center(&self, (gx, gy): Cell) -> (f32, f32) {
        let half = self.cell_size / 2.0;
        (
            gx as f32 * self.cell_size + half,
            gy as f32 * self.cell_size + half,
        )
    }

    /// Centre of the first cell on a shortest path from `from` to `to`.
    ///
    /// None when both points share a cell, either lies outside the grid, or
    /// no route exists. The starting cell itself may be blocked.
    pub fn next_waypoint(&self, from: (f32, f32), to: (f32, f32)) -> Option<(f32, f32)> {
        let start = self.cell_of(from.0, from.1);
        let goal = self.cell_of(to.0, to.1);
        self.index(start)?;
        self.index(goal)?;

        let path = self.find_path(start, goal)?;
        path.get(1).map(|&cell| self.cell_center(cell))
    }

    /// Full cell path including both endpoints.
    pub fn find_path(&self, start: Cell, goal: Cell) -> Option<Vec<Cell>> {
        if start == goal {
            return Some(vec![start]);
        }

        let mut open = BinaryHeap::<(Reverse<i32>, Reverse<i32>, Cell)>::new();
        let mut g_scores = HashMap::<Cell, i32>::new();
        let mut came_from = HashMap::<Cell, Cell>::new();
        let mut closed = HashSet::<Cell>::new();

        g_scores.insert(start, 0);
        open.push((Reverse(manhattan(start, goal)), Reverse(0), start));

        while let Some((_f_score, Reverse(g_cost), cell)) = open.pop() {
            if cell == goal {
                return Some(reconstruct_path(start, goal, &came_from));
            }
            if !closed.insert(cell) {
                continue;
            }

            for (dx, dy) in NEIGHBOR_STEPS {
                let next = (cell.0 + dx, cell.1 + dy);
                if self.is_blocked(next) || closed.contains(&next) {
                    continue;
                }

                let tentative_g = g_cost + 1;
                if tentative_g >= g_scores.get(&next).copied().unwrap_or(i32::MAX) {
                    continue;
                }

                came_from.insert(next, cell);
                g_scores.insert(next, tentative_g);
                open.push((
                    Reverse(tentative_g + manhattan(next, goal)),
                    Reverse(tentative_g),
                    next,
                ));
            }
        }
        None
    }
}

fn manhattan(a: Cell, b: Cell) -> i32 {
    (a.0 - b.0).abs() + (a.1 - b.1).abs()
}

fn reconstruct_path(start: Cell, goal: Cell, came_from: &HashMap<Cell, Cell>) -> Vec<Cell> {
    let mut path = vec![goal];
    let mut current = goal;
    while current != start {
        match came_from.get(&current) {
            Some(&previous) => {
                path.push(previous);
                current = previous;
            }
            None => break,
        }
    }
    path.reverse();
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::world::map_walls;

    fn small_grid(walls: &[Wall]) -> NavGrid {
        NavGrid::build(walls, 400.0, 400.0, 40.0)
    }

    #[test]
    fn test_wall_blocks_overlapped_cells_only() {
        let grid = small_grid(&[Wall::fixed(40.0, 40.0, 40.0, 80.0)]);
        assert!(grid.is_blocked((1, 1)));
        assert!(grid.is_blocked((1, 2)));
        assert!(!grid.is_blocked((2, 1)));
        assert!(!grid.is_blocked((1, 3)));
        assert!(!grid.is_blocked((0, 0)));
    }

    #[test]
    fn test_out_of_bounds_counts_as_blocked() {
        let grid = small_grid(&[]);
        assert!(grid.is_blocked((-1, 0)));
        assert!(grid.is_blocked((10, 0)));
        assert!(!grid.is_blocked((9, 9)));
    }

    #[test]
    fn test_straight_path_first_step() {
        let grid = small_grid(&[]);
        let waypoint = grid.next_waypoint((20.0, 20.0), (220.0, 20.0));
        assert_eq!(waypoint, Some((60.0, 20.0)));
    }

    #[test]
    fn test_same_cell_has_no_waypoint() {
        let grid = small_grid(&[]);
        assert_eq!(grid.next_waypoint((5.0, 5.0), (35.0, 35.0)), None);
    }

    #[test]
    fn test_path_routes_around_wall() {
        // Vertical barrier in column 2 with a gap at the bottom row.
        let grid = small_grid(&[Wall::fixed(80.0, 0.0, 40.0, 360.0)]);
        let path = grid.find_path((0, 0), (4, 0)).unwrap();

        assert_eq!(path.first(), Some(&(0, 0)));
        assert_eq!(path.last(), Some(&(4, 0)));
        assert!(path.iter().all(|&c| !grid.is_blocked(c)));
        assert!(path.contains(&(2, 9)));
        for pair in path.windows(2) {
            assert_eq!(manhattan(pair[0], pair[1]), 1);
        }
        // Down nine rows, across four columns, back up nine rows.
        assert_eq!(path.len(), 9 + 4 + 9 + 1);
    }

    #[test]
    fn test_enclosed_goal_has_no_path() {
        let walls = vec![
            Wall::fixed(120.0, 120.0, 120.0, 40.0),
            Wall::fixed(120.0, 200.0, 120.0, 40.0),
            Wall::fixed(120.0, 160.0, 40.0, 40.0),
            Wall::fixed(200.0, 160.0, 40.0, 40.0),
        ];
        let grid = small_grid(&walls);
        assert!(!grid.is_blocked((4, 4)));
        assert_eq!(grid.next_waypoint((20.0, 20.0), (180.0, 180.0)), None);
    }

    #[test]
    fn test_target_outside_grid() {
        let grid = small_grid(&[]);
        assert_eq!(grid.next_waypoint((20.0, 20.0), (900.0, 20.0)), None);
    }

    #[test]
    fn test_arena_grid_dimensions() {
        let grid = NavGrid::from_walls(&map_walls());
        assert_eq!(grid.dimensions(), (100, 75));
        // Border walls block the outer ring.
        assert!(grid.is_blocked((0, 10)));
        assert!(grid.is_blocked((99, 10)));
        // Default spawn is open floor.
        assert!(!grid.is_blocked(grid.cell_of(400.0, 300.0)));
    }
}
