use crate::error::{SimError, SimResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Position) -> f64 {
        let dx = (self.x - other.x) as f64;
        let dy = (self.y - other.y) as f64;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn step(&self, heading: Heading) -> Position {
        let (dx, dy) = heading.delta();
        Position::new(self.x + dx, self.y + dy)
    }
}

// Screen coordinates: North decreases y
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Heading {
    North,
    South,
    East,
    West,
}

impl Heading {
    /// Fixed enumeration order used when recovering from a self-collision.
    pub const ALL: [Heading; 4] = [Heading::North, Heading::East, Heading::South, Heading::West];

    pub fn delta(self) -> (i32, i32) {
        match self {
            Heading::North => (0, -1),
            Heading::South => (0, 1),
            Heading::East => (1, 0),
            Heading::West => (-1, 0),
        }
    }

    pub fn reverse(self) -> Heading {
        match self {
            Heading::North => Heading::South,
            Heading::South => Heading::North,
            Heading::East => Heading::West,
            Heading::West => Heading::East,
        }
    }

    /// Perpendicular headings in the order they are tried at a wall.
    pub fn perpendicular(self) -> [Heading; 2] {
        match self {
            Heading::East | Heading::West => [Heading::North, Heading::South],
            Heading::North | Heading::South => [Heading::East, Heading::West],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum Cell {
    Empty = 0,
    Infrastructure = 1,
    SpecialTarget = 2,
}

impl Default for Cell {
    fn default() -> Self {
        Self::Empty
    }
}

pub const MIN_GRID_SIZE: u32 = 3;
pub const MAX_GRID_SIZE: u32 = 4096;

#[derive(Debug, Clone)]
pub struct Grid {
    size: i32,
    cells: Vec<Cell>,
}

impl Grid {
    /// A `size` x `size` grid of empty cells. Sizes outside
    /// `MIN_GRID_SIZE..=MAX_GRID_SIZE` are rejected.
    pub fn new(size: u32) -> SimResult<Self> {
        if !(MIN_GRID_SIZE..=MAX_GRID_SIZE).contains(&size) {
            return Err(SimError::invalid(format!(
                "grid size {} is outside {}..={}",
                size, MIN_GRID_SIZE, MAX_GRID_SIZE
            )));
        }
        let side = size as usize;
        let cells = side
            .checked_mul(side)
            .ok_or_else(|| SimError::invalid(format!("grid size {} overflows the cell count", size)))?;
        Ok(Self {
            size: size as i32,
            cells: vec![Cell::Empty; cells],
        })
    }

    pub fn size(&self) -> i32 {
        self.size
    }

    pub fn contains(&self, pos: Position) -> bool {
        pos.x >= 0 && pos.y >= 0 && pos.x < self.size && pos.y < self.size
    }

    pub fn clamp(&self, pos: Position) -> Position {
        let max = self.size - 1;
        Position::new(pos.x.clamp(0, max), pos.y.clamp(0, max))
    }

    pub fn get(&self, pos: Position) -> Cell {
        if !self.contains(pos) {
            return Cell::Empty;
        }
        self.cells[self.index(pos)]
    }

    pub fn set(&mut self, pos: Position, cell: Cell) -> SimResult<()> {
        if !self.contains(pos) {
            return Err(SimError::Boundary { x: pos.x, y: pos.y, size: self.size });
        }
        let idx = self.index(pos);
        self.cells[idx] = cell;
        Ok(())
    }

    /// Row-major copy, `matrix[y][x]`.
    pub fn to_matrix(&self) -> Vec<Vec<u8>> {
        self.cells
            .chunks(self.size as usize)
            .map(|row| row.iter().map(|c| *c as u8).collect())
            .collect()
    }

    fn index(&self, pos: Position) -> usize {
        (pos.y * self.size + pos.x) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_bounds_reads_are_empty() {
        let grid = Grid::new(5).unwrap();
        assert_eq!(grid.get(Position::new(-1, 0)), Cell::Empty);
        assert_eq!(grid.get(Position::new(5, 5)), Cell::Empty);
    }

    #[test]
    fn out_of_bounds_writes_are_rejected() {
        let mut grid = Grid::new(5).unwrap();
        let err = grid.set(Position::new(5, 0), Cell::Infrastructure).unwrap_err();
        assert_eq!(err, SimError::Boundary { x: 5, y: 0, size: 5 });
        assert!(grid.to_matrix().iter().flatten().all(|&c| c == 0));
    }

    #[test]
    fn sizes_outside_bounds_are_rejected() {
        assert!(matches!(Grid::new(2), Err(SimError::InvalidConfiguration { .. })));
        assert!(matches!(Grid::new(50_000), Err(SimError::InvalidConfiguration { .. })));
        assert!(matches!(Grid::new(u32::MAX), Err(SimError::InvalidConfiguration { .. })));
        assert_eq!(Grid::new(MAX_GRID_SIZE).unwrap().size(), MAX_GRID_SIZE as i32);
    }

    #[test]
    fn matrix_is_row_major() {
        let mut grid = Grid::new(3).unwrap();
        grid.set(Position::new(2, 1), Cell::SpecialTarget).unwrap();
        let m = grid.to_matrix();
        assert_eq!(m[1][2], 2);
        assert_eq!(m[2][1], 0);
    }

    #[test]
    fn perpendicular_order_is_fixed() {
        assert_eq!(Heading::West.perpendicular(), [Heading::North, Heading::South]);
        assert_eq!(Heading::South.perpendicular(), [Heading::East, Heading::West]);
    }
}
