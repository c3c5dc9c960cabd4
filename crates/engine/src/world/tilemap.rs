use std::collections::HashSet;

use thiserror::Error;

use crate::math::Cell;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TileType {
    Grass,
    Dirt,
    Rock,
    Sand,
    Water,
}

impl TileType {
    pub const ALL: [TileType; 5] = [
        TileType::Grass,
        TileType::Dirt,
        TileType::Rock,
        TileType::Sand,
        TileType::Water,
    ];

    /// Logical asset name under the `tiles` category.
    pub const fn asset_name(self) -> &'static str {
        match self {
            TileType::Grass => "grass",
            TileType::Dirt => "dirt",
            TileType::Rock => "rock",
            TileType::Sand => "sand",
            TileType::Water => "water",
        }
    }

    pub const fn is_passable(self) -> bool {
        !matches!(self, TileType::Rock | TileType::Water)
    }

    pub(crate) const fn ordinal(self) -> usize {
        match self {
            TileType::Grass => 0,
            TileType::Dirt => 1,
            TileType::Rock => 2,
            TileType::Sand => 3,
            TileType::Water => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TileMapError {
    #[error("cell ({col}, {row}) is outside the map")]
    OutOfBounds { col: i32, row: i32 },
    #[error("tile count mismatch: expected {expected}, got {actual}")]
    TileCountMismatch { expected: usize, actual: usize },
    #[error("map dimensions must be positive, got {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
}

/// Fixed-size row-major grid of tile types. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileMap {
    width: u32,
    height: u32,
    tiles: Vec<TileType>,
}

impl TileMap {
    pub fn new(width: u32, height: u32, tiles: Vec<TileType>) -> Result<Self, TileMapError> {
        if width == 0 || height == 0 {
            return Err(TileMapError::InvalidDimensions { width, height });
        }
        let expected = width as usize * height as usize;
        let actual = tiles.len();
        if expected != actual {
            return Err(TileMapError::TileCountMismatch { expected, actual });
        }
        Ok(Self {
            width,
            height,
            tiles,
        })
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn in_bounds(&self, col: i32, row: i32) -> bool {
        col >= 0 && row >= 0 && (col as u32) < self.width && (row as u32) < self.height
    }

    pub fn index_of(&self, col: i32, row: i32) -> Option<usize> {
        if !self.in_bounds(col, row) {
            return None;
        }
        Some(row as usize * self.width as usize + col as usize)
    }

    pub fn tile_at(&self, col: i32, row: i32) -> Result<TileType, TileMapError> {
        self.index_of(col, row)
            .and_then(|index| self.tiles.get(index).copied())
            .ok_or(TileMapError::OutOfBounds { col, row })
    }

    /// Out-of-bounds cells are impassable rather than an error.
    pub fn is_passable(&self, col: i32, row: i32) -> bool {
        self.tile_at(col, row)
            .map(TileType::is_passable)
            .unwrap_or(false)
    }

    pub fn is_cell_passable(&self, cell: Cell) -> bool {
        self.is_passable(cell.col, cell.row)
    }

    pub fn tiles(&self) -> &[TileType] {
        &self.tiles
    }

    /// Every cell with its tile, row by row.
    pub fn cells(&self) -> impl Iterator<Item = (Cell, TileType)> + '_ {
        let width = self.width as usize;
        self.tiles.iter().enumerate().map(move |(index, tile)| {
            let cell = Cell::new((index % width) as i32, (index / width) as i32);
            (cell, *tile)
        })
    }

    pub fn count_of(&self, tile: TileType) -> usize {
        self.tiles.iter().filter(|candidate| **candidate == tile).count()
    }

    /// Passable cell nearest the centre, preferring open ground over anything else passable.
    pub fn find_spawn(&self) -> Option<Cell> {
        let center = Cell::new(self.width as i32 / 2, self.height as i32 / 2);
        let max_radius = self.width.max(self.height) as i32;
        let mut fallback = None;
        for radius in 0..=max_radius {
            for cell in ring(center, radius) {
                let Ok(tile) = self.tile_at(cell.col, cell.row) else {
                    continue;
                };
                if !tile.is_passable() {
                    continue;
                }
                if matches!(tile, TileType::Grass | TileType::Dirt | TileType::Sand) {
                    return Some(cell);
                }
                fallback.get_or_insert(cell);
            }
        }
        fallback
    }

    /// Nearest passable cell to `start` within `max_radius`, skipping `exclude`.
    pub fn find_passable_near(
        &self,
        start: Cell,
        max_radius: i32,
        exclude: &HashSet<Cell>,
    ) -> Option<Cell> {
        (0..=max_radius.max(0))
            .flat_map(|radius| ring(start, radius))
            .find(|cell| !exclude.contains(cell) && self.is_cell_passable(*cell))
    }
}

/// Cells at exactly Chebyshev distance `radius` from `center`, in a fixed order.
fn ring(center: Cell, radius: i32) -> impl Iterator<Item = Cell> {
    (-radius..=radius).flat_map(move |d_row| {
        (-radius..=radius).filter_map(move |d_col| {
            (d_col.abs().max(d_row.abs()) == radius).then(|| center.offset(d_col, d_row))
        })
    })
}
