use std::ops::{Add, AddAssign, Mul, Sub};

use serde::{Deserialize, Serialize};

/// Continuous grid-space coordinate. `x` runs along columns, `y` along rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn length_squared(self) -> f32 {
        self.x * self.x + self.y * self.y
    }

    pub fn length(self) -> f32 {
        self.length_squared().sqrt()
    }

    pub fn is_zero(self) -> bool {
        self.length_squared() <= f32::EPSILON
    }

    /// Unit vector in the same direction, or zero for a (near) zero input.
    pub fn normalized_or_zero(self) -> Vec2 {
        let len_sq = self.length_squared();
        if len_sq <= f32::EPSILON || !len_sq.is_finite() {
            return Vec2::ZERO;
        }
        let inv_len = len_sq.sqrt().recip();
        Vec2 {
            x: self.x * inv_len,
            y: self.y * inv_len,
        }
    }

    /// Shortens vectors longer than one; shorter vectors pass through.
    pub fn clamped_to_unit(self) -> Vec2 {
        if self.length_squared() > 1.0 {
            self.normalized_or_zero()
        } else {
            self
        }
    }

    pub fn distance(self, other: Vec2) -> f32 {
        (other - self).length()
    }
}

impl Add for Vec2 {
    type Output = Vec2;

    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Vec2) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vec2 {
    type Output = Vec2;

    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Vec2 {
    type Output = Vec2;

    fn mul(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

/// Discrete grid cell address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Cell {
    pub col: i32,
    pub row: i32,
}

impl Cell {
    pub const fn new(col: i32, row: i32) -> Self {
        Self { col, row }
    }

    /// The cell a continuous position falls in: `floor(position)`.
    pub fn containing(position: Vec2) -> Self {
        Self {
            col: position.x.floor() as i32,
            row: position.y.floor() as i32,
        }
    }

    pub fn center(self) -> Vec2 {
        Vec2::new(self.col as f32 + 0.5, self.row as f32 + 0.5)
    }

    /// Isometric draw diagonal; larger values are nearer the viewer.
    pub fn diagonal(self) -> i32 {
        self.col + self.row
    }

    pub fn chebyshev_distance(self, other: Cell) -> i32 {
        (self.col - other.col)
            .abs()
            .max((self.row - other.row).abs())
    }

    pub fn offset(self, d_col: i32, d_row: i32) -> Cell {
        Cell::new(self.col + d_col, self.row + d_row)
    }
}
