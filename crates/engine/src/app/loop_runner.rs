use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{info, warn};
use winit::dpi::LogicalSize;
use winit::error::{EventLoopError, OsError};
use winit::event::{ElementState, Event, KeyEvent, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::WindowBuilder;

use crate::assets::{AssetCatalog, AssetSizes, FileSurfaceSource};
use crate::config::EngineConfig;
use crate::world::{World, WorldError};

use super::input::InputCollector;
use super::metrics::MetricsAccumulator;
use super::{InputAction, PixelsRenderer, RenderError, Renderer};

const METRICS_LOG_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    World(#[from] WorldError),
    #[error("failed to create event loop: {0}")]
    CreateEventLoop(#[source] EventLoopError),
    #[error("failed to create application window: {0}")]
    CreateWindow(#[source] OsError),
    #[error("failed to initialize renderer: {0}")]
    CreateRenderer(#[source] RenderError),
    #[error("event loop failed: {0}")]
    EventLoopRun(#[source] EventLoopError),
}

/// Opens the window and runs the world until quit.
///
/// Assets under `asset_root` are loaded once before the first frame; missing
/// files are drawn as placeholders.
pub fn run_app(config: &EngineConfig, asset_root: PathBuf) -> Result<(), AppError> {
    info!(asset_root = %asset_root.display(), "asset_preload_started");
    let catalog = Rc::new(AssetCatalog::preload(
        &FileSurfaceSource::new(asset_root),
        World::required_sprite_keys(),
        AssetSizes::from_config(config),
    ));
    let mut world = World::new(config, &catalog)?;

    let event_loop = EventLoop::new().map_err(AppError::CreateEventLoop)?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(config.window_title.clone())
            .with_inner_size(LogicalSize::new(
                config.window_width as f64,
                config.window_height as f64,
            ))
            .build(&event_loop)
            .map_err(AppError::CreateWindow)?,
    );
    let mut renderer = PixelsRenderer::new(Arc::clone(&window), Rc::clone(&catalog))
        .map_err(AppError::CreateRenderer)?;

    event_loop.set_control_flow(ControlFlow::Poll);

    let fixed_dt = config.fixed_dt();
    let fixed_dt_seconds = fixed_dt.as_secs_f32();
    let max_frame_delta = config.max_frame_delta();
    let max_ticks_per_frame = config.max_ticks_per_frame.max(1);
    info!(
        target_tps = config.target_tps.max(1),
        max_frame_delta_ms = max_frame_delta.as_millis() as u64,
        max_ticks_per_frame,
        "loop_config"
    );

    let base_title = config.window_title.clone();
    let mut input = InputCollector::default();
    let mut accumulator = Duration::ZERO;
    let mut last_frame_instant = Instant::now();
    let mut metrics = MetricsAccumulator::new(last_frame_instant, METRICS_LOG_INTERVAL);
    let mut applied_title = base_title.clone();

    event_loop
        .run(move |event, window_target| match event {
            Event::WindowEvent { window_id, event } if window_id == window.id() => match event {
                WindowEvent::CloseRequested => {
                    info!(reason = "window_close", "shutdown_requested");
                    window_target.exit();
                }
                WindowEvent::Resized(new_size) => {
                    if let Err(error) = renderer.resize(new_size.width, new_size.height) {
                        warn!(error = %error, "renderer_resize_failed");
                        window_target.exit();
                    }
                }
                WindowEvent::ScaleFactorChanged { .. } => {
                    let size = window.inner_size();
                    if let Err(error) = renderer.resize(size.width, size.height) {
                        warn!(error = %error, "renderer_resize_failed");
                        window_target.exit();
                    }
                }
                WindowEvent::KeyboardInput { event, .. } => {
                    if let Some((action, is_down)) = action_for_key_event(&event) {
                        input.handle(action, is_down);
                    }
                    if input.quit_requested() {
                        info!(reason = "escape_key", "shutdown_requested");
                        window_target.exit();
                    }
                }
                WindowEvent::RedrawRequested => {
                    let now = Instant::now();
                    let raw_frame_dt = now.saturating_duration_since(last_frame_instant);
                    last_frame_instant = now;

                    accumulator =
                        accumulator.saturating_add(clamp_frame_delta(raw_frame_dt, max_frame_delta));
                    let step_plan = plan_sim_steps(accumulator, fixed_dt, max_ticks_per_frame);
                    for _ in 0..step_plan.ticks_to_run {
                        let batch = input.next_batch();
                        let report = world.tick(fixed_dt_seconds, &batch);
                        if report.quit_requested {
                            info!(reason = "quit_intent", "shutdown_requested");
                            window_target.exit();
                            break;
                        }
                    }
                    accumulator = step_plan.remaining_accumulator;
                    let dropped_ticks = if step_plan.dropped_backlog > Duration::ZERO {
                        warn!(
                            dropped_backlog_ms = step_plan.dropped_backlog.as_millis() as u64,
                            max_ticks_per_frame,
                            "sim_clamp_triggered"
                        );
                        (step_plan.dropped_backlog.as_nanos() / fixed_dt.as_nanos().max(1)) as u32
                    } else {
                        0
                    };
                    metrics.record_ticks(step_plan.ticks_to_run, dropped_ticks);

                    let draw_list = world.build_draw_list(renderer.viewport(), &catalog);
                    let draw_items = draw_list.len();
                    if let Err(error) = renderer.present(draw_list) {
                        warn!(error = %error, "renderer_present_failed");
                        window_target.exit();
                    }

                    let next_title = window_title_for(&base_title, &world);
                    if next_title != applied_title {
                        window.set_title(&next_title);
                        applied_title = next_title;
                    }

                    metrics.record_frame(raw_frame_dt, draw_items);
                    if let Some(snapshot) = metrics.maybe_snapshot(now) {
                        info!(
                            fps = snapshot.fps,
                            tps = snapshot.tps,
                            frame_time_ms = snapshot.frame_time_ms,
                            draw_items = snapshot.draw_items_per_frame,
                            dropped_ticks = snapshot.dropped_ticks,
                            entity_count = world.entities().len(),
                            "loop_metrics"
                        );
                    }
                }
                _ => {}
            },
            Event::AboutToWait => {
                window.request_redraw();
            }
            Event::LoopExiting => {
                info!(ticks = world.tick_count(), "shutdown");
            }
            _ => {}
        })
        .map_err(AppError::EventLoopRun)
}

fn action_for_key_event(event: &KeyEvent) -> Option<(InputAction, bool)> {
    let action = action_for_key(event.physical_key)?;
    Some((action, event.state == ElementState::Pressed))
}

fn action_for_key(key: PhysicalKey) -> Option<InputAction> {
    match key {
        PhysicalKey::Code(KeyCode::KeyW) | PhysicalKey::Code(KeyCode::ArrowUp) => {
            Some(InputAction::MoveUp)
        }
        PhysicalKey::Code(KeyCode::KeyS) | PhysicalKey::Code(KeyCode::ArrowDown) => {
            Some(InputAction::MoveDown)
        }
        PhysicalKey::Code(KeyCode::KeyA) | PhysicalKey::Code(KeyCode::ArrowLeft) => {
            Some(InputAction::MoveLeft)
        }
        PhysicalKey::Code(KeyCode::KeyD) | PhysicalKey::Code(KeyCode::ArrowRight) => {
            Some(InputAction::MoveRight)
        }
        PhysicalKey::Code(KeyCode::KeyE) => Some(InputAction::Interact),
        PhysicalKey::Code(KeyCode::KeyI) => Some(InputAction::OpenInventory),
        PhysicalKey::Code(KeyCode::KeyF) => Some(InputAction::Feed),
        PhysicalKey::Code(KeyCode::KeyG) => Some(InputAction::Eat),
        PhysicalKey::Code(KeyCode::F3) => Some(InputAction::ToggleOverlay),
        PhysicalKey::Code(KeyCode::Escape) => Some(InputAction::Quit),
        _ => None,
    }
}

/// Inventory contents ride in the title bar while the inventory is open.
fn window_title_for(base_title: &str, world: &World) -> String {
    if !world.is_inventory_open() {
        return base_title.to_string();
    }
    let contents = world
        .player_inventory()
        .map(|inventory| inventory.to_lines())
        .unwrap_or_default();
    if contents.is_empty() {
        format!("{base_title} | inventory: empty")
    } else {
        format!("{base_title} | {}", contents.join(", "))
    }
}

#[derive(Debug, Clone, Copy)]
struct StepPlan {
    ticks_to_run: u32,
    remaining_accumulator: Duration,
    dropped_backlog: Duration,
}

fn plan_sim_steps(
    mut accumulator: Duration,
    fixed_dt: Duration,
    max_ticks_per_frame: u32,
) -> StepPlan {
    let mut ticks_to_run = 0u32;
    while accumulator >= fixed_dt && ticks_to_run < max_ticks_per_frame {
        accumulator = accumulator.saturating_sub(fixed_dt);
        ticks_to_run = ticks_to_run.saturating_add(1);
    }

    let dropped_backlog = if accumulator >= fixed_dt {
        std::mem::take(&mut accumulator)
    } else {
        Duration::ZERO
    };
    StepPlan {
        ticks_to_run,
        remaining_accumulator: accumulator,
        dropped_backlog,
    }
}

fn clamp_frame_delta(frame_dt: Duration, max_frame_delta: Duration) -> Duration {
    frame_dt.min(max_frame_delta)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::{Intent, IntentBatch};
    use crate::assets::{AssetError, Surface, SurfaceSource};
    use crate::SpriteKey;

    #[test]
    fn clamp_frame_delta_caps_large_frame() {
        let max_frame_delta = Duration::from_millis(250);
        assert_eq!(
            clamp_frame_delta(Duration::from_millis(600), max_frame_delta),
            max_frame_delta
        );
        assert_eq!(
            clamp_frame_delta(Duration::from_millis(16), max_frame_delta),
            Duration::from_millis(16)
        );
    }

    #[test]
    fn plan_sim_steps_runs_expected_ticks_without_drop() {
        let fixed_dt = Duration::from_millis(16);
        let result = plan_sim_steps(Duration::from_millis(50), fixed_dt, 5);

        assert_eq!(result.ticks_to_run, 3);
        assert_eq!(result.remaining_accumulator, Duration::from_millis(2));
        assert_eq!(result.dropped_backlog, Duration::ZERO);
    }

    #[test]
    fn plan_sim_steps_drops_backlog_when_tick_cap_hit() {
        let fixed_dt = Duration::from_millis(16);
        let result = plan_sim_steps(Duration::from_millis(120), fixed_dt, 3);

        assert_eq!(result.ticks_to_run, 3);
        assert_eq!(result.remaining_accumulator, Duration::ZERO);
        assert_eq!(result.dropped_backlog, Duration::from_millis(72));
    }

    #[test]
    fn bindings_cover_every_action() {
        let bound: Vec<InputAction> = [
            KeyCode::KeyW,
            KeyCode::ArrowDown,
            KeyCode::KeyA,
            KeyCode::ArrowRight,
            KeyCode::KeyE,
            KeyCode::KeyI,
            KeyCode::KeyF,
            KeyCode::KeyG,
            KeyCode::F3,
            KeyCode::Escape,
        ]
        .into_iter()
        .filter_map(|code| action_for_key(PhysicalKey::Code(code)))
        .collect();
        assert_eq!(
            bound,
            vec![
                InputAction::MoveUp,
                InputAction::MoveDown,
                InputAction::MoveLeft,
                InputAction::MoveRight,
                InputAction::Interact,
                InputAction::OpenInventory,
                InputAction::Feed,
                InputAction::Eat,
                InputAction::ToggleOverlay,
                InputAction::Quit,
            ]
        );
        assert_eq!(action_for_key(PhysicalKey::Code(KeyCode::KeyQ)), None);
    }

    struct EmptySource;

    impl SurfaceSource for EmptySource {
        fn load(&self, key: &SpriteKey) -> Result<Surface, AssetError> {
            Err(AssetError::NotFound {
                key: key.to_string(),
            })
        }
    }

    #[test]
    fn title_lists_inventory_only_while_open() {
        let config = EngineConfig {
            map_width: 10,
            map_height: 10,
            ..EngineConfig::default()
        };
        let catalog = AssetCatalog::preload(
            &EmptySource,
            World::required_sprite_keys(),
            AssetSizes::from_config(&config),
        );
        let mut world = World::new(&config, &catalog).expect("world");
        assert_eq!(window_title_for("Isoworld", &world), "Isoworld");

        let open = IntentBatch::idle().with(Intent::OpenInventory);
        world.tick(1.0 / 60.0, &open);
        assert!(world.is_inventory_open());
        assert!(window_title_for("Isoworld", &world).starts_with("Isoworld | "));
    }
}
