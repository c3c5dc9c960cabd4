use std::collections::HashSet;

use thiserror::Error;
use tracing::{debug, info};

use crate::app::{world_to_screen, IntentBatch, IsoProjection, Viewport};
use crate::assets::AssetCatalog;
use crate::config::{ConfigError, EngineConfig};
use crate::math::{Cell, Vec2};
use crate::sprite_keys::{AssetCategory, SpriteKey};

use super::animation::{clip_key, clip_keys, ActionState, AnimationLibrary};
use super::draw_list::{DepthKey, DrawItem, DrawLayer, DrawList, FrameRect, OverlayLine};
use super::entity::{follow_intent, Entity, EntityId, EntityIdAllocator, MoveOutcome};
use super::inventory::{Inventory, InventoryError};
use super::resources::{ResourceKind, ResourceLayer, ResourceNode};
use super::terrain::{generate_with_config, TerrainError, TerrainStats};
use super::tilemap::{TileMap, TileMapError, TileType};

/// How far from the player the companion may spawn, in cells.
pub const COMPANION_SEARCH_RADIUS: i32 = 6;
const INTERACT_REACH_CELLS: i32 = 1;
const FINE_DEPTH_SCALE: f32 = 1024.0;
const CULL_MARGIN_CELLS: i32 = 2;
const OVERLAY_BLOCKED_COLOR: [u8; 4] = [230, 80, 80, 255];
const OVERLAY_PLAYER_COLOR: [u8; 4] = [255, 210, 70, 255];

#[derive(Debug, Error)]
pub enum WorldError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Terrain(#[from] TerrainError),
    #[error(transparent)]
    TileMap(#[from] TileMapError),
    #[error("generated map has no passable cell to spawn on")]
    NoSpawnCell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerAction {
    Interact,
    Feed,
    Eat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    Busy,
    NothingInReach,
    OutOfRange,
    NoCompanion,
    NoPlayer,
    Inventory(InventoryError),
}

impl From<InventoryError> for RejectReason {
    fn from(error: InventoryError) -> Self {
        RejectReason::Inventory(error)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WorldEvent {
    Collected {
        kind: ResourceKind,
        amount: u32,
        new_count: u32,
    },
    CompanionFed {
        hunger: f32,
    },
    PlayerAte {
        kind: ResourceKind,
        hunger: f32,
    },
    InventoryOpened {
        contents: Vec<(ResourceKind, u32)>,
    },
    OverlayToggled {
        visible: bool,
    },
    ActionRejected {
        action: PlayerAction,
        reason: RejectReason,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub quit_requested: bool,
    pub events: Vec<WorldEvent>,
}

impl TickReport {
    fn reject(&mut self, action: PlayerAction, reason: RejectReason) {
        debug!(?action, ?reason, "action_rejected");
        self.events.push(WorldEvent::ActionRejected { action, reason });
    }
}

/// Owns the map, resources and entities, and is their only writer.
#[derive(Debug)]
pub struct World {
    config: EngineConfig,
    projection: IsoProjection,
    tilemap: TileMap,
    terrain_stats: TerrainStats,
    resources: ResourceLayer,
    entities: Vec<Entity>,
    player_id: EntityId,
    companion_id: EntityId,
    animations: AnimationLibrary,
    camera_focus: Vec2,
    overlay_visible: bool,
    inventory_open: bool,
    tick_count: u64,
}

impl World {
    /// Generates terrain from the config's seed and spawns the player and companion.
    pub fn new(config: &EngineConfig, catalog: &AssetCatalog) -> Result<Self, WorldError> {
        config.validate()?;
        let generated = generate_with_config(
            config.map_width,
            config.map_height,
            config.seed,
            &config.terrain,
        )?;
        let stats = generated.stats;
        info!(
            seed = config.seed,
            width = config.map_width,
            height = config.map_height,
            grass = stats.count(TileType::Grass),
            dirt = stats.count(TileType::Dirt),
            rock = stats.count(TileType::Rock),
            sand = stats.count(TileType::Sand),
            water = stats.count(TileType::Water),
            islands_removed = stats.islands_removed,
            "terrain_generated"
        );
        let resources = ResourceLayer::scatter(&generated.tilemap, config.seed);
        let mut world = Self::with_map(config, generated.tilemap, resources, catalog)?;
        world.terrain_stats = stats;
        Ok(world)
    }

    /// Builds a world over a prepared map and resource layer.
    pub fn with_map(
        config: &EngineConfig,
        tilemap: TileMap,
        mut resources: ResourceLayer,
        catalog: &AssetCatalog,
    ) -> Result<Self, WorldError> {
        config.validate()?;
        let player_cell = tilemap.find_spawn().ok_or(WorldError::NoSpawnCell)?;
        let companion_cell = tilemap
            .find_passable_near(
                player_cell,
                COMPANION_SEARCH_RADIUS,
                &HashSet::from([player_cell]),
            )
            .unwrap_or(player_cell);
        resources.take(player_cell);
        resources.take(companion_cell);

        let mut allocator = EntityIdAllocator::default();
        let player_id = allocator.allocate();
        let companion_id = allocator.allocate();
        let entities = vec![
            Entity::player(
                player_id,
                player_cell.center(),
                config.player_speed,
                Inventory::from_config(config),
            ),
            Entity::companion(
                companion_id,
                companion_cell.center(),
                config.companion_speed,
                player_id,
            ),
        ];
        info!(
            player_col = player_cell.col,
            player_row = player_cell.row,
            companion_col = companion_cell.col,
            companion_row = companion_cell.row,
            resource_nodes = resources.len(),
            "world_spawned"
        );

        let animations = AnimationLibrary::from_catalog(
            catalog,
            &[AssetCategory::Player, AssetCategory::Animal],
            config.animation_frame_seconds,
        );
        let (width, height) = tilemap.dimensions();
        let mut counts = [0; TileType::ALL.len()];
        for tile in TileType::ALL {
            counts[tile.ordinal()] = tilemap.count_of(tile);
        }
        debug!(width, height, "world_map_installed");

        Ok(Self {
            config: config.clone(),
            projection: IsoProjection::from_config(config),
            tilemap,
            terrain_stats: TerrainStats {
                counts,
                ..TerrainStats::default()
            },
            resources,
            entities,
            player_id,
            companion_id,
            animations,
            camera_focus: player_cell.center(),
            overlay_visible: false,
            inventory_open: false,
            tick_count: 0,
        })
    }

    /// Every sprite key the world may draw, for preloading.
    pub fn required_sprite_keys() -> Vec<SpriteKey> {
        let mut keys: Vec<SpriteKey> = TileType::ALL.into_iter().map(tile_key).collect();
        keys.extend(ResourceNode::ALL.into_iter().map(prop_key));
        keys.extend(clip_keys(AssetCategory::Player));
        keys.extend(clip_keys(AssetCategory::Animal));
        keys
    }

    pub fn tilemap(&self) -> &TileMap {
        &self.tilemap
    }

    pub fn terrain_stats(&self) -> &TerrainStats {
        &self.terrain_stats
    }

    pub fn resources(&self) -> &ResourceLayer {
        &self.resources
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.iter().find(|entity| entity.id == id)
    }

    fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.iter_mut().find(|entity| entity.id == id)
    }

    pub fn player(&self) -> Option<&Entity> {
        self.entity(self.player_id)
    }

    pub fn companion(&self) -> Option<&Entity> {
        self.entity(self.companion_id)
    }

    pub fn player_inventory(&self) -> Option<&Inventory> {
        self.player().and_then(Entity::inventory)
    }

    pub fn player_hunger(&self) -> Option<f32> {
        self.player()
            .and_then(Entity::player_data)
            .map(|data| data.hunger.value())
    }

    pub fn is_overlay_visible(&self) -> bool {
        self.overlay_visible
    }

    pub fn is_inventory_open(&self) -> bool {
        self.inventory_open
    }

    pub fn camera_focus(&self) -> Vec2 {
        self.camera_focus
    }

    pub fn projection(&self) -> &IsoProjection {
        &self.projection
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Removes an entity. Returns false if it was not present.
    pub fn despawn(&mut self, id: EntityId) -> bool {
        let before = self.entities.len();
        self.entities.retain(|entity| entity.id != id);
        let removed = self.entities.len() != before;
        if removed {
            info!(entity_id = id.0, "entity_despawned");
        }
        removed
    }

    /// Advances the simulation by `dt` seconds with one batch of intents.
    pub fn tick(&mut self, dt: f32, intents: &IntentBatch) -> TickReport {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        let mut report = TickReport {
            quit_requested: intents.quit,
            events: Vec::new(),
        };
        self.tick_count = self.tick_count.saturating_add(1);

        self.apply_flags(intents, &mut report);
        self.move_player(dt, intents.movement);
        if intents.interact {
            self.interact(&mut report);
        }
        if intents.feed {
            self.feed(&mut report);
        }
        if intents.eat {
            self.eat(&mut report);
        }
        self.move_companion(dt);
        for entity in &mut self.entities {
            entity.advance_animation(dt);
        }
        let player_hunger_step = self.config.player_hunger_per_second * dt;
        if let Some(data) = self
            .entity_mut(self.player_id)
            .and_then(Entity::player_data_mut)
        {
            data.hunger.grow(player_hunger_step);
        }
        let hunger_step = self.config.hunger_per_second * dt;
        if let Some(data) = self
            .entity_mut(self.companion_id)
            .and_then(Entity::companion_data_mut)
        {
            data.grow_hungry(hunger_step);
        }
        self.forage(&mut report);
        if let Some(player) = self.player() {
            self.camera_focus = player.position;
        }
        report
    }

    fn apply_flags(&mut self, intents: &IntentBatch, report: &mut TickReport) {
        if intents.toggle_overlay {
            self.overlay_visible = !self.overlay_visible;
            info!(visible = self.overlay_visible, "debug_overlay_toggled");
            report.events.push(WorldEvent::OverlayToggled {
                visible: self.overlay_visible,
            });
        }
        if intents.open_inventory {
            self.inventory_open = !self.inventory_open;
            if self.inventory_open {
                let contents: Vec<(ResourceKind, u32)> = self
                    .player_inventory()
                    .map(|inventory| inventory.iter().collect())
                    .unwrap_or_default();
                let summary = contents
                    .iter()
                    .map(|(kind, count)| format!("{kind}={count}"))
                    .collect::<Vec<_>>()
                    .join(",");
                info!(contents = %summary, "inventory_opened");
                report.events.push(WorldEvent::InventoryOpened { contents });
            } else {
                debug!("inventory_closed");
            }
        }
    }

    fn move_player(&mut self, dt: f32, movement: Vec2) {
        let Some(player) = self.entities.iter_mut().find(|e| e.id == self.player_id) else {
            return;
        };
        player.intent = movement;
        let outcome = player.step_movement(dt, &self.tilemap);
        if outcome == MoveOutcome::Blocked {
            debug!(
                col = player.cell().col,
                row = player.cell().row,
                "player_move_blocked"
            );
        }
    }

    fn interact(&mut self, report: &mut TickReport) {
        let Some(player) = self.player() else {
            report.reject(PlayerAction::Interact, RejectReason::NoPlayer);
            return;
        };
        if player.is_busy() {
            report.reject(PlayerAction::Interact, RejectReason::Busy);
            return;
        }
        let Some((cell, node)) = self
            .resources
            .nearest_interactable(player.cell(), INTERACT_REACH_CELLS)
        else {
            report.reject(PlayerAction::Interact, RejectReason::NothingInReach);
            return;
        };

        let (kind, amount) = node.yield_of();
        let Some(player) = self.entities.iter_mut().find(|e| e.id == self.player_id) else {
            return;
        };
        let (old_count, collected) = match player.inventory_mut() {
            Some(inventory) => (inventory.count(kind), inventory.collect(kind, amount)),
            None => return,
        };
        match collected {
            Ok(new_count) => {
                self.resources.take(cell);
                player.face_towards(cell.center());
                let key = clip_key(AssetCategory::Player, ActionState::Interacting, player.facing);
                player.begin_one_shot(ActionState::Interacting, self.animations.cycle_seconds(&key));
                debug!(?node, col = cell.col, row = cell.row, "resource_harvested");
                report.events.push(WorldEvent::Collected {
                    kind,
                    amount: new_count - old_count,
                    new_count,
                });
            }
            Err(error) => report.reject(PlayerAction::Interact, error.into()),
        }
    }

    fn feed(&mut self, report: &mut TickReport) {
        let Some(player_position) = self.player().map(|player| player.position) else {
            report.reject(PlayerAction::Feed, RejectReason::NoPlayer);
            return;
        };
        let Some(companion) = self.companion() else {
            report.reject(PlayerAction::Feed, RejectReason::NoCompanion);
            return;
        };
        if companion.position.distance(player_position) > self.config.interaction_range {
            report.reject(PlayerAction::Feed, RejectReason::OutOfRange);
            return;
        }
        if companion.is_busy() {
            report.reject(PlayerAction::Feed, RejectReason::Busy);
            return;
        }

        let consumed = match self
            .entity_mut(self.player_id)
            .and_then(Entity::inventory_mut)
        {
            Some(inventory) => {
                let food = inventory.first_food().unwrap_or(ResourceKind::Berries);
                inventory.consume(food, 1)
            }
            None => return,
        };
        if let Err(error) = consumed {
            report.reject(PlayerAction::Feed, error.into());
            return;
        }

        let relief = self.config.hunger_relief_per_feed;
        let Some(companion) = self
            .entities
            .iter_mut()
            .find(|entity| entity.id == self.companion_id)
        else {
            return;
        };
        companion.face_towards(player_position);
        let key = clip_key(AssetCategory::Animal, ActionState::Eating, companion.facing);
        companion.begin_one_shot(ActionState::Eating, self.animations.cycle_seconds(&key));
        let hunger = match companion.companion_data_mut() {
            Some(data) => {
                data.feed(relief);
                data.hunger()
            }
            None => return,
        };
        info!(hunger, "companion_fed");
        report.events.push(WorldEvent::CompanionFed { hunger });
    }

    fn eat(&mut self, report: &mut TickReport) {
        let relief = self.config.player_meal_relief;
        let Some(player) = self.entities.iter_mut().find(|e| e.id == self.player_id) else {
            report.reject(PlayerAction::Eat, RejectReason::NoPlayer);
            return;
        };
        if player.is_busy() {
            report.reject(PlayerAction::Eat, RejectReason::Busy);
            return;
        }
        let Some(data) = player.player_data_mut() else {
            return;
        };
        let food = data.inventory.first_food().unwrap_or(ResourceKind::Berries);
        if let Err(error) = data.inventory.consume(food, 1) {
            report.reject(PlayerAction::Eat, error.into());
            return;
        }
        data.hunger.relieve(relief);
        let hunger = data.hunger.value();

        let key = clip_key(AssetCategory::Player, ActionState::Eating, player.facing);
        player.begin_one_shot(ActionState::Eating, self.animations.cycle_seconds(&key));
        info!(?food, hunger, "player_ate");
        report.events.push(WorldEvent::PlayerAte { kind: food, hunger });
    }

    fn move_companion(&mut self, dt: f32) {
        let radius = self.config.follow_radius;
        let Some(target) = self
            .companion()
            .and_then(Entity::companion_data)
            .map(|data| data.follow_target)
        else {
            return;
        };
        let leader = self.entity(target).map(|leader| leader.position);
        let Some(companion) = self
            .entities
            .iter_mut()
            .find(|entity| entity.id == self.companion_id)
        else {
            return;
        };
        companion.intent = follow_intent(companion.position, leader, radius);
        companion.step_movement(dt, &self.tilemap);
    }

    fn forage(&mut self, report: &mut TickReport) {
        let Some(cell) = self.player().map(Entity::cell) else {
            return;
        };
        let Some(node) = self.resources.node_at(cell) else {
            return;
        };
        if node.requires_interaction() {
            return;
        }
        let (kind, amount) = node.yield_of();
        let (old_count, collected) = match self
            .entity_mut(self.player_id)
            .and_then(Entity::inventory_mut)
        {
            Some(inventory) => (inventory.count(kind), inventory.collect(kind, amount)),
            None => return,
        };
        match collected {
            Ok(new_count) => {
                self.resources.take(cell);
                debug!(?node, col = cell.col, row = cell.row, "resource_foraged");
                report.events.push(WorldEvent::Collected {
                    kind,
                    amount: new_count - old_count,
                    new_count,
                });
            }
            Err(error) => debug!(%error, "forage_failed"),
        }
    }

    /// Screen offset that puts the camera focus at the viewport centre.
    pub fn camera_offset(&self, viewport: Viewport) -> Vec2 {
        let focus = self
            .projection
            .grid_to_screen(self.camera_focus.x, self.camera_focus.y);
        viewport.center() - focus
    }

    /// Projects visible tiles, props and entities and sorts them back to front.
    pub fn build_draw_list(&self, viewport: Viewport, catalog: &AssetCatalog) -> DrawList {
        if viewport.width == 0 || viewport.height == 0 {
            return DrawList::new();
        }
        let offset = self.camera_offset(viewport);
        let mut list = DrawList::with_capacity(self.tilemap.tiles().len() / 2);
        let Some((min, max)) = self.visible_cell_range(viewport, offset) else {
            return list;
        };

        for row in min.row..=max.row {
            for col in min.col..=max.col {
                let cell = Cell::new(col, row);
                let Ok(tile) = self.tilemap.tile_at(col, row) else {
                    continue;
                };
                let top = world_to_screen(&self.projection, offset, Vec2::new(col as f32, row as f32));
                let key = tile_key(tile);
                let (width, height) = catalog.frame_size(&key);
                // bottom of the sprite sits on the diamond's bottom vertex
                let screen_x = top.x.round() as i32 - (width / 2) as i32;
                let screen_y =
                    (top.y + self.projection.tile_height()).round() as i32 - height as i32;
                push_if_visible(
                    &mut list,
                    viewport,
                    DrawItem {
                        screen_x,
                        screen_y,
                        surface: catalog.resolve(&key),
                        source: whole_frame(width, height),
                        depth: DepthKey {
                            diagonal: cell.diagonal(),
                            layer: DrawLayer::Tile,
                            fine: col as i64,
                            order: 0,
                        },
                    },
                );

                if let Some(node) = self.resources.node_at(cell) {
                    let key = prop_key(node);
                    let (width, height) = catalog.frame_size(&key);
                    let (x, y) = anchor_bottom_center(
                        world_to_screen(&self.projection, offset, cell.center()),
                        width,
                        height,
                    );
                    push_if_visible(
                        &mut list,
                        viewport,
                        DrawItem {
                            screen_x: x,
                            screen_y: y,
                            surface: catalog.resolve(&key),
                            source: whole_frame(width, height),
                            depth: DepthKey {
                                diagonal: cell.diagonal(),
                                layer: DrawLayer::Prop,
                                fine: col as i64,
                                order: 0,
                            },
                        },
                    );
                }
            }
        }

        for entity in &self.entities {
            let (key, frame) =
                self.animations
                    .current_frame(entity.category(), &entity.animation, entity.facing);
            let (width, height) = catalog.frame_size(&key);
            let (x, y) = anchor_bottom_center(
                world_to_screen(&self.projection, offset, entity.position),
                width,
                height,
            );
            let frame = frame.min(catalog.frame_count(&key).saturating_sub(1));
            push_if_visible(
                &mut list,
                viewport,
                DrawItem {
                    screen_x: x,
                    screen_y: y,
                    surface: catalog.resolve(&key),
                    source: FrameRect {
                        x: frame * width,
                        y: 0,
                        width,
                        height,
                    },
                    depth: DepthKey {
                        diagonal: entity.cell().diagonal(),
                        layer: DrawLayer::Entity,
                        fine: ((entity.position.x + entity.position.y) * FINE_DEPTH_SCALE) as i64,
                        order: entity.id.0,
                    },
                },
            );
        }
        list.sort();

        if self.overlay_visible {
            for row in min.row..=max.row {
                for col in min.col..=max.col {
                    let cell = Cell::new(col, row);
                    if self.tilemap.in_bounds(col, row) && !self.tilemap.is_cell_passable(cell) {
                        self.push_cell_outline(&mut list, offset, cell, OVERLAY_BLOCKED_COLOR);
                    }
                }
            }
            if let Some(player) = self.player() {
                self.push_cell_outline(&mut list, offset, player.cell(), OVERLAY_PLAYER_COLOR);
            }
        }
        list
    }

    /// Inclusive map cell range whose diamonds can touch the viewport.
    fn visible_cell_range(&self, viewport: Viewport, offset: Vec2) -> Option<(Cell, Cell)> {
        let (map_width, map_height) = self.tilemap.dimensions();
        let corners = [
            (0.0, 0.0),
            (viewport.width as f32, 0.0),
            (0.0, viewport.height as f32),
            (viewport.width as f32, viewport.height as f32),
        ];
        let mut min = Cell::new(i32::MAX, i32::MAX);
        let mut max = Cell::new(i32::MIN, i32::MIN);
        for (x, y) in corners {
            let grid = self.projection.screen_to_grid(x - offset.x, y - offset.y);
            let cell = Cell::containing(grid);
            min = Cell::new(min.col.min(cell.col), min.row.min(cell.row));
            max = Cell::new(max.col.max(cell.col), max.row.max(cell.row));
        }
        let min = Cell::new(
            min.col.saturating_sub(CULL_MARGIN_CELLS).max(0),
            min.row.saturating_sub(CULL_MARGIN_CELLS).max(0),
        );
        let max = Cell::new(
            max.col
                .saturating_add(CULL_MARGIN_CELLS)
                .min(map_width as i32 - 1),
            max.row
                .saturating_add(CULL_MARGIN_CELLS)
                .min(map_height as i32 - 1),
        );
        (min.col <= max.col && min.row <= max.row).then_some((min, max))
    }

    fn push_cell_outline(&self, list: &mut DrawList, offset: Vec2, cell: Cell, color: [u8; 4]) {
        let vertex = |col: i32, row: i32| {
            let point = world_to_screen(&self.projection, offset, Vec2::new(col as f32, row as f32));
            (point.x.round() as i32, point.y.round() as i32)
        };
        let top = vertex(cell.col, cell.row);
        let right = vertex(cell.col + 1, cell.row);
        let bottom = vertex(cell.col + 1, cell.row + 1);
        let left = vertex(cell.col, cell.row + 1);
        for (from, to) in [(top, right), (right, bottom), (bottom, left), (left, top)] {
            list.push_overlay_line(OverlayLine { from, to, color });
        }
    }
}

fn tile_key(tile: TileType) -> SpriteKey {
    SpriteKey::builtin(AssetCategory::Tiles, tile.asset_name().to_string())
}

fn prop_key(node: ResourceNode) -> SpriteKey {
    SpriteKey::builtin(AssetCategory::Props, node.asset_name().to_string())
}

fn whole_frame(width: u32, height: u32) -> FrameRect {
    FrameRect {
        x: 0,
        y: 0,
        width,
        height,
    }
}

fn anchor_bottom_center(foot: Vec2, width: u32, height: u32) -> (i32, i32) {
    (
        foot.x.round() as i32 - (width / 2) as i32,
        foot.y.round() as i32 - height as i32,
    )
}

fn push_if_visible(list: &mut DrawList, viewport: Viewport, item: DrawItem) {
    let right = item.screen_x.saturating_add(item.source.width as i32);
    let bottom = item.screen_y.saturating_add(item.source.height as i32);
    if right <= 0
        || bottom <= 0
        || item.screen_x >= viewport.width as i32
        || item.screen_y >= viewport.height as i32
    {
        return;
    }
    list.push(item);
}
