use crate::assets::{AssetCatalog, Surface};
use crate::world::{DrawItem, DrawList, FrameRect, OverlayLine};

pub const DEFAULT_CLEAR_COLOR: [u8; 4] = [18, 22, 30, 255];

/// Software blitter over a tightly packed RGBA8 frame.
///
/// Items are drawn in list order with no projection of their own; the list
/// is expected to be sorted back to front already.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Compositor {
    clear_color: [u8; 4],
}

impl Default for Compositor {
    fn default() -> Self {
        Self::new(DEFAULT_CLEAR_COLOR)
    }
}

impl Compositor {
    pub fn new(clear_color: [u8; 4]) -> Self {
        Self { clear_color }
    }

    pub fn clear_color(&self) -> [u8; 4] {
        self.clear_color
    }

    pub fn compose(
        &self,
        frame: &mut [u8],
        width: u32,
        height: u32,
        list: &DrawList,
        catalog: &AssetCatalog,
    ) {
        if width == 0 || height == 0 {
            return;
        }
        for chunk in frame.chunks_exact_mut(4) {
            chunk.copy_from_slice(&self.clear_color);
        }
        for item in list.items() {
            blit_item(frame, width, height, item, catalog.surface(item.surface));
        }
        for line in list.overlay() {
            draw_line(frame, width, height, *line);
        }
    }
}

fn blit_item(frame: &mut [u8], width: u32, height: u32, item: &DrawItem, surface: &Surface) {
    let Some(source) = clip_source(item.source, surface) else {
        return;
    };

    let left = item.screen_x;
    let top = item.screen_y;
    let right = left.saturating_add(source.width as i32);
    let bottom = top.saturating_add(source.height as i32);

    let draw_left = left.max(0);
    let draw_top = top.max(0);
    let draw_right = right.min(width as i32);
    let draw_bottom = bottom.min(height as i32);
    if draw_left >= draw_right || draw_top >= draw_bottom {
        return;
    }

    let frame_width = width as usize;
    let surface_width = surface.width() as usize;
    let rgba = surface.rgba();

    for out_y in draw_top..draw_bottom {
        let src_y = source.y as usize + (out_y - top) as usize;
        let src_row_offset = src_y * surface_width * 4;
        let dst_row_offset = out_y as usize * frame_width * 4;

        for out_x in draw_left..draw_right {
            let src_x = source.x as usize + (out_x - left) as usize;
            let src_offset = src_row_offset + src_x * 4;
            let alpha = rgba[src_offset + 3];
            if alpha == 0 {
                continue;
            }
            let dst_offset = dst_row_offset + out_x as usize * 4;
            if dst_offset + 4 > frame.len() {
                return;
            }
            frame[dst_offset..dst_offset + 4].copy_from_slice(&rgba[src_offset..src_offset + 4]);
        }
    }
}

/// Intersects the requested rectangle with the surface bounds.
fn clip_source(source: FrameRect, surface: &Surface) -> Option<FrameRect> {
    if source.x >= surface.width() || source.y >= surface.height() {
        return None;
    }
    let width = source.width.min(surface.width() - source.x);
    let height = source.height.min(surface.height() - source.y);
    if width == 0 || height == 0 {
        return None;
    }
    Some(FrameRect {
        x: source.x,
        y: source.y,
        width,
        height,
    })
}

fn draw_line(frame: &mut [u8], width: u32, height: u32, line: OverlayLine) {
    let (mut x, mut y) = line.from;
    let (x1, y1) = line.to;
    let dx = (x1 - x).abs();
    let dy = -(y1 - y).abs();
    let step_x = if x < x1 { 1 } else { -1 };
    let step_y = if y < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if x < width as i32 && y < height as i32 {
            write_pixel_rgba_clipped(frame, width as usize, x, y, line.color);
        }
        if x == x1 && y == y1 {
            break;
        }
        let doubled = 2 * err;
        if doubled >= dy {
            err += dy;
            x += step_x;
        }
        if doubled <= dx {
            err += dx;
            y += step_y;
        }
    }
}

fn write_pixel_rgba_clipped(frame: &mut [u8], width: usize, x: i32, y: i32, color: [u8; 4]) {
    if x < 0 || y < 0 {
        return;
    }
    let Some(pixel_offset) = (y as usize)
        .checked_mul(width)
        .and_then(|row| row.checked_add(x as usize))
    else {
        return;
    };
    let Some(byte_offset) = pixel_offset.checked_mul(4) else {
        return;
    };
    let Some(end) = byte_offset.checked_add(4) else {
        return;
    };
    if end > frame.len() {
        return;
    }
    frame[byte_offset..end].copy_from_slice(&color);
}
