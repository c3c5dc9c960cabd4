use crate::assets::SurfaceId;

/// Coarse draw layer within one isometric diagonal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DrawLayer {
    Tile,
    Prop,
    Entity,
}

/// Back-to-front sort key. Field order is comparison order.
///
/// `diagonal` is `col + row` of the occupied cell, so everything on a nearer
/// diagonal draws later regardless of layer. Within a diagonal tiles come
/// first, then props, then entities, each refined by `fine` and `order`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DepthKey {
    pub diagonal: i32,
    pub layer: DrawLayer,
    pub fine: i64,
    pub order: u64,
}

/// Source rectangle within a surface, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// One resolved blit. Coordinates are final screen pixels of the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawItem {
    pub screen_x: i32,
    pub screen_y: i32,
    pub surface: SurfaceId,
    pub source: FrameRect,
    pub depth: DepthKey,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlayLine {
    pub from: (i32, i32),
    pub to: (i32, i32),
    pub color: [u8; 4],
}

/// Everything the renderer needs for one frame, built fresh each frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrawList {
    items: Vec<DrawItem>,
    overlay: Vec<OverlayLine>,
}

impl DrawList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
            overlay: Vec::new(),
        }
    }

    pub fn push(&mut self, item: DrawItem) {
        self.items.push(item);
    }

    pub fn push_overlay_line(&mut self, line: OverlayLine) {
        self.overlay.push(line);
    }

    /// Stable, so equal keys keep insertion order.
    pub fn sort(&mut self) {
        self.items.sort_by_key(|item| item.depth);
    }

    pub fn items(&self) -> &[DrawItem] {
        &self.items
    }

    pub fn overlay(&self) -> &[OverlayLine] {
        &self.overlay
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
