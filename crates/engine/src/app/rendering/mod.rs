mod compositor;
mod renderer;
mod transform;

pub use compositor::{Compositor, DEFAULT_CLEAR_COLOR};
pub use renderer::{BufferRenderer, PixelsRenderer, RenderError, Renderer};
pub use transform::{
    screen_to_world_px, world_to_screen, world_to_screen_px, IsoProjection, Viewport,
};
