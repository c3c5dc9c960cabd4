use crate::config::EngineConfig;
use crate::math::{Cell, Vec2};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn center(&self) -> Vec2 {
        Vec2::new(self.width as f32 * 0.5, self.height as f32 * 0.5)
    }
}

/// 2:1 isometric projection between grid space and screen pixels.
///
/// Grid point `(col, row)` maps to the top vertex of that cell's diamond:
/// `x = (col - row) * tile_width / 2`, `y = (col + row) * tile_height / 2`.
/// The cell's diamond therefore spans grid `[col, col + 1) x [row, row + 1)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IsoProjection {
    half_width: f32,
    half_height: f32,
}

impl IsoProjection {
    pub fn new(tile_width_px: u32, tile_height_px: u32) -> Self {
        Self {
            half_width: tile_width_px as f32 * 0.5,
            half_height: tile_height_px as f32 * 0.5,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.tile_width_px, config.tile_height_px)
    }

    pub fn tile_width(&self) -> f32 {
        self.half_width * 2.0
    }

    pub fn tile_height(&self) -> f32 {
        self.half_height * 2.0
    }

    pub fn grid_to_screen(&self, col: f32, row: f32) -> Vec2 {
        Vec2 {
            x: (col - row) * self.half_width,
            y: (col + row) * self.half_height,
        }
    }

    /// Exact inverse of [`IsoProjection::grid_to_screen`].
    pub fn screen_to_grid(&self, x: f32, y: f32) -> Vec2 {
        let u = x / self.half_width;
        let v = y / self.half_height;
        Vec2 {
            x: (v + u) * 0.5,
            y: (v - u) * 0.5,
        }
    }

    /// Cell whose screen diamond contains the point.
    pub fn screen_to_cell(&self, x: f32, y: f32) -> Cell {
        Cell::containing(self.screen_to_grid(x, y))
    }

    pub fn cell_top_vertex(&self, cell: Cell) -> Vec2 {
        self.grid_to_screen(cell.col as f32, cell.row as f32)
    }

    pub fn cell_center(&self, cell: Cell) -> Vec2 {
        let center = cell.center();
        self.grid_to_screen(center.x, center.y)
    }
}

pub fn world_to_screen(projection: &IsoProjection, camera_offset: Vec2, position: Vec2) -> Vec2 {
    projection.grid_to_screen(position.x, position.y) + camera_offset
}

pub fn world_to_screen_px(
    projection: &IsoProjection,
    camera_offset: Vec2,
    position: Vec2,
) -> (i32, i32) {
    let screen = world_to_screen(projection, camera_offset, position);
    (screen.x.round() as i32, screen.y.round() as i32)
}

pub fn screen_to_world_px(
    projection: &IsoProjection,
    camera_offset: Vec2,
    screen_px: Vec2,
) -> Vec2 {
    let local = screen_px - camera_offset;
    projection.screen_to_grid(local.x, local.y)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_projection() -> IsoProjection {
        IsoProjection::new(64, 32)
    }

    #[test]
    fn grid_origin_maps_to_screen_origin() {
        let projection = default_projection();
        assert_eq!(projection.grid_to_screen(0.0, 0.0), Vec2::ZERO);
    }

    #[test]
    fn standard_two_to_one_formula() {
        let projection = default_projection();
        assert_eq!(projection.grid_to_screen(3.0, 1.0), Vec2::new(64.0, 64.0));
        assert_eq!(projection.grid_to_screen(0.0, 2.0), Vec2::new(-64.0, 32.0));
    }

    #[test]
    fn screen_to_grid_inverts_grid_to_screen() {
        let projection = default_projection();
        for (col, row) in [(0.0, 0.0), (2.5, 7.25), (-3.0, 4.0), (11.0, -6.5)] {
            let screen = projection.grid_to_screen(col, row);
            let back = projection.screen_to_grid(screen.x, screen.y);
            assert!((back.x - col).abs() < 1e-4, "col {col}");
            assert!((back.y - row).abs() < 1e-4, "row {row}");
        }
    }

    #[test]
    fn points_strictly_inside_a_diamond_round_trip_to_their_cell() {
        let projection = default_projection();
        // Fractions of the diamond's half extents, all strictly inside |u| + |v| < 1.
        let offsets = [
            (0.0, 0.0),
            (0.45, 0.0),
            (-0.45, 0.0),
            (0.0, 0.45),
            (0.0, -0.45),
            (0.3, 0.3),
            (-0.3, 0.3),
            (0.3, -0.3),
            (-0.3, -0.3),
            (0.9, 0.05),
            (-0.05, -0.9),
        ];
        for col in -4..6 {
            for row in -4..6 {
                let cell = Cell::new(col, row);
                let center = projection.cell_center(cell);
                for (fx, fy) in offsets {
                    let x = center.x + fx * 32.0;
                    let y = center.y + fy * 16.0;
                    assert_eq!(
                        projection.screen_to_cell(x, y),
                        cell,
                        "cell={cell:?} offset=({fx},{fy})"
                    );
                }
            }
        }
    }

    #[test]
    fn camera_offset_shifts_screen_position() {
        let projection = default_projection();
        let offset = Vec2::new(400.0, 300.0);
        let (x, y) = world_to_screen_px(&projection, offset, Vec2::new(1.0, 0.0));
        assert_eq!((x, y), (432, 316));
        let back = screen_to_world_px(&projection, offset, Vec2::new(432.0, 316.0));
        assert!((back.x - 1.0).abs() < 1e-4 && back.y.abs() < 1e-4);
    }

    #[test]
    fn projection_is_total_over_non_finite_input() {
        let projection = default_projection();
        // Saturating float-to-int casts map NaN to zero.
        assert_eq!(projection.screen_to_cell(f32::NAN, 10.0), Cell::new(0, 0));
        let far = projection.screen_to_cell(f32::INFINITY, f32::INFINITY);
        assert_eq!(far.col, i32::MAX);
    }
}
