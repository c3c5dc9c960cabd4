use std::rc::Rc;
use std::sync::Arc;

use pixels::{Pixels, SurfaceTexture};
use thiserror::Error;
use tracing::debug;
use winit::window::Window;

use crate::assets::AssetCatalog;
use crate::world::DrawList;

use super::{Compositor, Viewport};

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to create pixel surface: {0}")]
    Surface(#[source] pixels::Error),
    #[error("failed to present frame: {0}")]
    Present(#[source] pixels::Error),
}

/// Consumer of one finished draw list per frame.
///
/// Lists arrive already sorted and projected; implementations only copy
/// pixels.
pub trait Renderer {
    fn viewport(&self) -> Viewport;

    fn present(&mut self, frame: DrawList) -> Result<(), RenderError>;
}

pub struct PixelsRenderer {
    window: Arc<Window>,
    pixels: Pixels<'static>,
    viewport: Viewport,
    catalog: Rc<AssetCatalog>,
    compositor: Compositor,
}

impl PixelsRenderer {
    pub fn new(window: Arc<Window>, catalog: Rc<AssetCatalog>) -> Result<Self, RenderError> {
        let size = window.inner_size();
        let pixels = Self::build_pixels(Arc::clone(&window), size.width, size.height)?;
        Ok(Self {
            window,
            pixels,
            viewport: Viewport {
                width: size.width,
                height: size.height,
            },
            catalog,
            compositor: Compositor::default(),
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), RenderError> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.pixels = Self::build_pixels(Arc::clone(&self.window), width, height)?;
        self.viewport = Viewport { width, height };
        debug!(width, height, "renderer_resized");
        Ok(())
    }

    fn build_pixels(
        window: Arc<Window>,
        width: u32,
        height: u32,
    ) -> Result<Pixels<'static>, RenderError> {
        let surface = SurfaceTexture::new(width.max(1), height.max(1), window);
        Pixels::new(width.max(1), height.max(1), surface).map_err(RenderError::Surface)
    }
}

impl Renderer for PixelsRenderer {
    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn present(&mut self, frame: DrawList) -> Result<(), RenderError> {
        if self.viewport.width == 0 || self.viewport.height == 0 {
            return Ok(());
        }
        self.compositor.compose(
            self.pixels.frame_mut(),
            self.viewport.width,
            self.viewport.height,
            &frame,
            &self.catalog,
        );
        self.pixels.render().map_err(RenderError::Present)
    }
}

/// Renderer over an in-memory frame, for headless runs and tests.
pub struct BufferRenderer {
    frame: Vec<u8>,
    viewport: Viewport,
    catalog: Rc<AssetCatalog>,
    compositor: Compositor,
    frames_presented: u64,
}

impl BufferRenderer {
    pub fn new(viewport: Viewport, catalog: Rc<AssetCatalog>) -> Self {
        let len = viewport.width as usize * viewport.height as usize * 4;
        Self {
            frame: vec![0; len],
            viewport,
            catalog,
            compositor: Compositor::default(),
            frames_presented: 0,
        }
    }

    pub fn frame(&self) -> &[u8] {
        &self.frame
    }

    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }
}

impl Renderer for BufferRenderer {
    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn present(&mut self, frame: DrawList) -> Result<(), RenderError> {
        self.compositor.compose(
            &mut self.frame,
            self.viewport.width,
            self.viewport.height,
            &frame,
            &self.catalog,
        );
        self.frames_presented += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::IntentBatch;
    use crate::assets::{AssetError, AssetSizes, Surface, SurfaceSource};
    use crate::config::EngineConfig;
    use crate::world::World;
    use crate::SpriteKey;

    struct EmptySource;

    impl SurfaceSource for EmptySource {
        fn load(&self, key: &SpriteKey) -> Result<Surface, AssetError> {
            Err(AssetError::NotFound {
                key: key.to_string(),
            })
        }
    }

    #[test]
    fn renderer_trait_is_object_safe() {
        let _renderer: Option<Box<dyn Renderer>> = None;
    }

    #[test]
    fn buffer_renderer_draws_world_frame() {
        let config = EngineConfig {
            map_width: 12,
            map_height: 12,
            ..EngineConfig::default()
        };
        let catalog = Rc::new(AssetCatalog::preload(
            &EmptySource,
            World::required_sprite_keys(),
            AssetSizes::from_config(&config),
        ));
        let mut world = World::new(&config, &catalog).expect("world");
        world.tick(1.0 / 60.0, &IntentBatch::idle());

        let viewport = Viewport {
            width: 320,
            height: 240,
        };
        let mut renderer = BufferRenderer::new(viewport, Rc::clone(&catalog));
        let list = world.build_draw_list(renderer.viewport(), &catalog);
        assert!(!list.is_empty());
        renderer.present(list).expect("present");

        assert_eq!(renderer.frames_presented(), 1);
        assert_eq!(renderer.frame().len(), 320 * 240 * 4);
        let clear = Compositor::default().clear_color();
        // player feet sit on the viewport centre; its sprite rises above them
        let above_feet = ((100 * 320 + 160) * 4) as usize;
        assert_ne!(renderer.frame()[above_feet..above_feet + 4], clear);
    }
}
