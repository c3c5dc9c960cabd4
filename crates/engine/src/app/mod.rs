mod input;
mod loop_runner;
mod metrics;
mod rendering;

pub use input::{InputAction, Intent, IntentBatch};
pub use loop_runner::{run_app, AppError};
pub use metrics::LoopMetricsSnapshot;
pub use rendering::{
    screen_to_world_px, world_to_screen, world_to_screen_px, BufferRenderer, Compositor,
    IsoProjection, PixelsRenderer, RenderError, Renderer, Viewport, DEFAULT_CLEAR_COLOR,
};
