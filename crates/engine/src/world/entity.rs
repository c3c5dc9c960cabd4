use crate::math::{Cell, Vec2};
use crate::sprite_keys::AssetCategory;

use super::animation::{ActionState, AnimationState, CardinalFacing};
use super::inventory::Inventory;
use super::tilemap::TileMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u64);

#[derive(Debug, Default)]
pub struct EntityIdAllocator {
    next: u64,
}

impl EntityIdAllocator {
    pub fn allocate(&mut self) -> EntityId {
        let id = EntityId(self.next);
        self.next = self.next.saturating_add(1);
        id
    }
}

/// Result of one movement step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    Moved,
    /// Destination cell impassable or off the map; position unchanged.
    Blocked,
    Stationary,
    /// Mid one-shot action; position unchanged.
    Busy,
}

/// Hunger level in [0, 1]; 0 is sated. Non-finite input reads as sated.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Hunger(f32);

impl Hunger {
    pub fn value(self) -> f32 {
        self.0
    }

    pub fn set(&mut self, hunger: f32) {
        self.0 = if hunger.is_finite() {
            hunger.clamp(0.0, 1.0)
        } else {
            0.0
        };
    }

    pub fn grow(&mut self, amount: f32) {
        self.set(self.0 + amount);
    }

    pub fn relieve(&mut self, relief: f32) {
        self.set(self.0 - relief);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerData {
    pub inventory: Inventory,
    pub hunger: Hunger,
}

impl PlayerData {
    pub fn new(inventory: Inventory) -> Self {
        Self {
            inventory,
            hunger: Hunger::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompanionData {
    hunger: Hunger,
    /// Lookup only; the target may be gone.
    pub follow_target: EntityId,
}

impl CompanionData {
    pub fn new(follow_target: EntityId) -> Self {
        Self {
            hunger: Hunger::default(),
            follow_target,
        }
    }

    /// In [0, 1].
    pub fn hunger(&self) -> f32 {
        self.hunger.value()
    }

    pub fn set_hunger(&mut self, hunger: f32) {
        self.hunger.set(hunger);
    }

    pub fn grow_hungry(&mut self, amount: f32) {
        self.hunger.grow(amount);
    }

    pub fn feed(&mut self, relief: f32) {
        self.hunger.relieve(relief);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EntityKind {
    Player(PlayerData),
    Companion(CompanionData),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub id: EntityId,
    /// Continuous grid-space position; the occupied cell is its floor.
    pub position: Vec2,
    pub facing: CardinalFacing,
    pub animation: AnimationState,
    pub intent: Vec2,
    pub speed: f32,
    pub kind: EntityKind,
    one_shot_seconds: f32,
}

impl Entity {
    pub fn player(id: EntityId, position: Vec2, speed: f32, inventory: Inventory) -> Self {
        Self::with_kind(id, position, speed, EntityKind::Player(PlayerData::new(inventory)))
    }

    pub fn companion(id: EntityId, position: Vec2, speed: f32, follow_target: EntityId) -> Self {
        Self::with_kind(
            id,
            position,
            speed,
            EntityKind::Companion(CompanionData::new(follow_target)),
        )
    }

    fn with_kind(id: EntityId, position: Vec2, speed: f32, kind: EntityKind) -> Self {
        Self {
            id,
            position,
            facing: CardinalFacing::South,
            animation: AnimationState::default(),
            intent: Vec2::ZERO,
            speed,
            kind,
            one_shot_seconds: 0.0,
        }
    }

    pub fn cell(&self) -> Cell {
        Cell::containing(self.position)
    }

    pub fn action(&self) -> ActionState {
        self.animation.action()
    }

    pub fn is_busy(&self) -> bool {
        self.action().is_one_shot()
    }

    /// Sprite category for this entity's animation clips.
    pub fn category(&self) -> AssetCategory {
        match self.kind {
            EntityKind::Player(_) => AssetCategory::Player,
            EntityKind::Companion(_) => AssetCategory::Animal,
        }
    }

    pub fn inventory(&self) -> Option<&Inventory> {
        match &self.kind {
            EntityKind::Player(data) => Some(&data.inventory),
            EntityKind::Companion(_) => None,
        }
    }

    pub fn inventory_mut(&mut self) -> Option<&mut Inventory> {
        match &mut self.kind {
            EntityKind::Player(data) => Some(&mut data.inventory),
            EntityKind::Companion(_) => None,
        }
    }

    pub fn player_data(&self) -> Option<&PlayerData> {
        match &self.kind {
            EntityKind::Player(data) => Some(data),
            EntityKind::Companion(_) => None,
        }
    }

    pub fn player_data_mut(&mut self) -> Option<&mut PlayerData> {
        match &mut self.kind {
            EntityKind::Player(data) => Some(data),
            EntityKind::Companion(_) => None,
        }
    }

    pub fn companion_data(&self) -> Option<&CompanionData> {
        match &self.kind {
            EntityKind::Companion(data) => Some(data),
            EntityKind::Player(_) => None,
        }
    }

    pub fn companion_data_mut(&mut self) -> Option<&mut CompanionData> {
        match &mut self.kind {
            EntityKind::Companion(data) => Some(data),
            EntityKind::Player(_) => None,
        }
    }

    /// Applies the current intent for `dt` seconds.
    ///
    /// Facing follows any non-zero intent, even when the step itself is refused.
    /// Every cell the step passes through must be passable, otherwise the step
    /// is dropped whole. A zero `dt` leaves position and action untouched.
    pub fn step_movement(&mut self, dt: f32, tilemap: &TileMap) -> MoveOutcome {
        let direction = self.intent.clamped_to_unit();
        if let Some(facing) = CardinalFacing::from_direction(direction) {
            self.facing = facing;
        }
        if self.is_busy() {
            return if direction.is_zero() {
                MoveOutcome::Stationary
            } else {
                MoveOutcome::Busy
            };
        }
        if direction.is_zero() {
            self.animation.set(ActionState::Idle);
            return MoveOutcome::Stationary;
        }
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        if dt == 0.0 {
            return MoveOutcome::Stationary;
        }
        let step = direction * (self.speed * dt);

        if !path_is_passable(self.position, step, tilemap) {
            self.animation.set(ActionState::Idle);
            return MoveOutcome::Blocked;
        }
        self.position = self.position + step;
        self.animation.set(ActionState::Walking);
        MoveOutcome::Moved
    }

    /// Enters a one-shot state lasting `duration` seconds of in-state time.
    pub fn begin_one_shot(&mut self, action: ActionState, duration: f32) {
        debug_assert!(action.is_one_shot());
        self.animation.set(ActionState::Idle);
        self.animation.set(action);
        self.one_shot_seconds = duration.max(0.0);
    }

    pub fn face_towards(&mut self, target: Vec2) {
        if let Some(facing) = CardinalFacing::from_direction(target - self.position) {
            self.facing = facing;
        }
    }

    pub fn advance_animation(&mut self, dt: f32) {
        self.animation.advance(dt);
        if self.is_busy() && self.animation.elapsed() >= self.one_shot_seconds {
            self.animation.set(ActionState::Idle);
        }
    }
}

/// Samples the segment at most one cell apart so no cell along it is skipped.
fn path_is_passable(start: Vec2, step: Vec2, tilemap: &TileMap) -> bool {
    let length = step.length();
    let (width, height) = tilemap.dimensions();
    // a straight segment this long cannot stay inside the map
    if !length.is_finite() || length > (width + height) as f32 {
        return false;
    }
    let pieces = length.ceil().max(1.0) as u32;
    (1..=pieces).all(|piece| {
        let point = start + step * (piece as f32 / pieces as f32);
        tilemap.is_cell_passable(Cell::containing(point))
    })
}

/// Movement intent toward the leader's cell, or zero within `radius` or without a leader.
pub fn follow_intent(follower: Vec2, leader: Option<Vec2>, radius: f32) -> Vec2 {
    let Some(leader) = leader else {
        return Vec2::ZERO;
    };
    if follower.distance(leader) <= radius {
        return Vec2::ZERO;
    }
    (Cell::containing(leader).center() - follower).normalized_or_zero()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::tilemap::TileType;

    fn open_map(width: u32, height: u32) -> TileMap {
        TileMap::new(width, height, vec![TileType::Grass; (width * height) as usize])
            .expect("tilemap")
    }

    fn walker(position: Vec2) -> Entity {
        Entity::player(EntityId(0), position, 2.0, Inventory::default())
    }

    #[test]
    fn moving_into_open_cell_walks() {
        let tilemap = open_map(5, 5);
        let mut entity = walker(Vec2::new(1.5, 1.5));
        entity.intent = Vec2::new(1.0, 0.0);
        assert_eq!(entity.step_movement(0.25, &tilemap), MoveOutcome::Moved);
        assert_eq!(entity.position, Vec2::new(2.0, 1.5));
        assert_eq!(entity.action(), ActionState::Walking);
        assert_eq!(entity.facing, CardinalFacing::East);
    }

    #[test]
    fn moving_into_impassable_cell_is_rejected_whole() {
        let mut tiles = vec![TileType::Grass; 9];
        tiles[1 * 3 + 2] = TileType::Water;
        let tilemap = TileMap::new(3, 3, tiles).expect("tilemap");
        let mut entity = walker(Vec2::new(1.9, 1.5));
        entity.animation.set(ActionState::Walking);
        entity.intent = Vec2::new(1.0, 0.0);
        assert_eq!(entity.step_movement(0.1, &tilemap), MoveOutcome::Blocked);
        assert_eq!(entity.position, Vec2::new(1.9, 1.5));
        assert_eq!(entity.action(), ActionState::Idle);
        assert_eq!(entity.facing, CardinalFacing::East);
    }

    #[test]
    fn long_step_cannot_jump_over_water() {
        let tiles = vec![TileType::Grass, TileType::Water, TileType::Grass];
        let tilemap = TileMap::new(3, 1, tiles).expect("tilemap");
        let mut entity = Entity::player(EntityId(0), Vec2::new(0.5, 0.5), 3.5, Inventory::default());
        entity.intent = Vec2::new(1.0, 0.0);
        assert_eq!(entity.step_movement(0.5, &tilemap), MoveOutcome::Blocked);
        assert_eq!(entity.position, Vec2::new(0.5, 0.5));
        assert_eq!(entity.action(), ActionState::Idle);
    }

    #[test]
    fn long_step_over_open_ground_moves() {
        let tilemap = open_map(4, 1);
        let mut entity = Entity::player(EntityId(0), Vec2::new(0.5, 0.5), 3.5, Inventory::default());
        entity.intent = Vec2::new(1.0, 0.0);
        assert_eq!(entity.step_movement(0.5, &tilemap), MoveOutcome::Moved);
        assert!((entity.position.x - 2.25).abs() < 1e-5);
    }

    #[test]
    fn huge_dt_is_blocked_at_the_map_edge() {
        let tilemap = open_map(3, 3);
        let mut entity = walker(Vec2::new(1.5, 1.5));
        entity.intent = Vec2::new(0.0, 1.0);
        assert_eq!(entity.step_movement(1.0e6, &tilemap), MoveOutcome::Blocked);
        assert_eq!(entity.position, Vec2::new(1.5, 1.5));
    }

    #[test]
    fn zero_dt_keeps_walking_state() {
        let tilemap = open_map(3, 3);
        let mut entity = walker(Vec2::new(1.5, 1.5));
        entity.intent = Vec2::new(1.0, 0.0);
        assert_eq!(entity.step_movement(0.1, &tilemap), MoveOutcome::Moved);
        let position = entity.position;
        assert_eq!(entity.step_movement(0.0, &tilemap), MoveOutcome::Stationary);
        assert_eq!(entity.action(), ActionState::Walking);
        assert_eq!(entity.position, position);
    }

    #[test]
    fn moving_off_the_map_is_blocked() {
        let tilemap = open_map(2, 2);
        let mut entity = walker(Vec2::new(0.1, 0.5));
        entity.intent = Vec2::new(-1.0, 0.0);
        assert_eq!(entity.step_movement(0.5, &tilemap), MoveOutcome::Blocked);
        assert_eq!(entity.position, Vec2::new(0.1, 0.5));
    }

    #[test]
    fn zero_intent_goes_idle() {
        let tilemap = open_map(3, 3);
        let mut entity = walker(Vec2::new(1.5, 1.5));
        entity.animation.set(ActionState::Walking);
        assert_eq!(entity.step_movement(0.1, &tilemap), MoveOutcome::Stationary);
        assert_eq!(entity.action(), ActionState::Idle);
        assert_eq!(entity.facing, CardinalFacing::South);
    }

    #[test]
    fn long_intent_is_clamped_to_speed() {
        let tilemap = open_map(10, 10);
        let mut entity = walker(Vec2::new(1.5, 1.5));
        entity.intent = Vec2::new(0.0, 5.0);
        entity.step_movement(0.5, &tilemap);
        assert!((entity.position.y - 2.5).abs() < 1e-5);
        assert_eq!(entity.facing, CardinalFacing::South);
    }

    #[test]
    fn one_shot_blocks_movement_then_returns_to_idle() {
        let tilemap = open_map(5, 5);
        let mut entity = walker(Vec2::new(2.5, 2.5));
        entity.begin_one_shot(ActionState::Interacting, 0.25);
        entity.intent = Vec2::new(0.0, -1.0);
        assert_eq!(entity.step_movement(0.1, &tilemap), MoveOutcome::Busy);
        assert_eq!(entity.position, Vec2::new(2.5, 2.5));
        assert_eq!(entity.facing, CardinalFacing::North);

        entity.advance_animation(0.2);
        assert_eq!(entity.action(), ActionState::Interacting);
        entity.advance_animation(0.1);
        assert_eq!(entity.action(), ActionState::Idle);
        assert_eq!(entity.animation.elapsed(), 0.0);
        assert_eq!(entity.step_movement(0.1, &tilemap), MoveOutcome::Moved);
    }

    #[test]
    fn follow_intent_outside_radius_points_at_leader() {
        let intent = follow_intent(Vec2::new(0.5, 0.5), Some(Vec2::new(5.5, 0.5)), 3.0);
        assert!(!intent.is_zero());
        assert!(intent.x > 0.99);
        assert!(intent.y.abs() < 1e-5);
    }

    #[test]
    fn follow_intent_inside_radius_is_zero() {
        let intent = follow_intent(Vec2::new(0.5, 0.5), Some(Vec2::new(1.5, 0.5)), 3.0);
        assert!(intent.is_zero());
    }

    #[test]
    fn follow_intent_without_leader_is_zero() {
        assert!(follow_intent(Vec2::new(0.5, 0.5), None, 3.0).is_zero());
    }

    #[test]
    fn hunger_is_clamped() {
        let mut data = CompanionData::new(EntityId(0));
        data.grow_hungry(1.7);
        assert_eq!(data.hunger(), 1.0);
        data.feed(0.4);
        assert!((data.hunger() - 0.6).abs() < 1e-6);
        data.feed(5.0);
        assert_eq!(data.hunger(), 0.0);
        data.set_hunger(f32::NAN);
        assert_eq!(data.hunger(), 0.0);
    }

    #[test]
    fn player_hunger_starts_sated_and_is_clamped() {
        let mut data = PlayerData::new(Inventory::default());
        assert_eq!(data.hunger.value(), 0.0);
        data.hunger.grow(0.5);
        data.hunger.relieve(0.3);
        assert!((data.hunger.value() - 0.2).abs() < 1e-6);
        data.hunger.grow(5.0);
        assert_eq!(data.hunger.value(), 1.0);
        data.hunger.relieve(f32::NAN);
        assert_eq!(data.hunger.value(), 0.0);
    }

    #[test]
    fn allocator_hands_out_sequential_ids() {
        let mut allocator = EntityIdAllocator::default();
        assert_eq!(allocator.allocate(), EntityId(0));
        assert_eq!(allocator.allocate(), EntityId(1));
    }
}
