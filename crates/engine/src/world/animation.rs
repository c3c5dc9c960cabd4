use std::collections::HashMap;

use crate::assets::AssetCatalog;
use crate::math::Vec2;
use crate::sprite_keys::{AssetCategory, SpriteKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionState {
    Idle,
    Walking,
    Interacting,
    Eating,
}

impl ActionState {
    pub const ALL: [ActionState; 4] = [
        ActionState::Idle,
        ActionState::Walking,
        ActionState::Interacting,
        ActionState::Eating,
    ];

    /// Token used in clip names.
    pub const fn as_str(self) -> &'static str {
        match self {
            ActionState::Idle => "idle",
            ActionState::Walking => "walk",
            ActionState::Interacting => "interact",
            ActionState::Eating => "eat",
        }
    }

    /// Plays one cycle then falls back to idle.
    pub const fn is_one_shot(self) -> bool {
        matches!(self, ActionState::Interacting | ActionState::Eating)
    }
}

/// Grid-space compass direction. North is toward row -1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CardinalFacing {
    North,
    South,
    East,
    West,
}

impl CardinalFacing {
    pub const ALL: [CardinalFacing; 4] = [
        CardinalFacing::North,
        CardinalFacing::South,
        CardinalFacing::East,
        CardinalFacing::West,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            CardinalFacing::North => "north",
            CardinalFacing::South => "south",
            CardinalFacing::East => "east",
            CardinalFacing::West => "west",
        }
    }

    /// Dominant axis of `direction`; horizontal wins ties. `None` for a zero vector.
    pub fn from_direction(direction: Vec2) -> Option<Self> {
        if direction.is_zero() {
            return None;
        }
        if direction.x.abs() >= direction.y.abs() {
            Some(if direction.x >= 0.0 {
                CardinalFacing::East
            } else {
                CardinalFacing::West
            })
        } else {
            Some(if direction.y >= 0.0 {
                CardinalFacing::South
            } else {
                CardinalFacing::North
            })
        }
    }
}

/// Current action plus time spent in it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationState {
    action: ActionState,
    elapsed: f32,
}

impl Default for AnimationState {
    fn default() -> Self {
        Self {
            action: ActionState::Idle,
            elapsed: 0.0,
        }
    }
}

impl AnimationState {
    pub fn action(&self) -> ActionState {
        self.action
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Switches action; time in state restarts only when the action changes.
    pub fn set(&mut self, action: ActionState) {
        if self.action != action {
            self.action = action;
            self.elapsed = 0.0;
        }
    }

    pub fn advance(&mut self, dt: f32) {
        if dt.is_finite() && dt > 0.0 {
            self.elapsed += dt;
        }
    }
}

/// Frame to show after `elapsed` seconds in a state, wrapping at `frame_count`.
pub fn frame_index(elapsed: f32, frame_seconds: f32, frame_count: u32) -> u32 {
    if frame_count <= 1 || !frame_seconds.is_finite() || frame_seconds <= 0.0 {
        return 0;
    }
    if !elapsed.is_finite() || elapsed <= 0.0 {
        return 0;
    }
    let steps = (elapsed / frame_seconds).floor() as u64;
    (steps % frame_count as u64) as u32
}

/// `<category>/<action>_<facing>`.
pub fn clip_key(category: AssetCategory, action: ActionState, facing: CardinalFacing) -> SpriteKey {
    SpriteKey::builtin(
        category,
        format!("{}_{}", action.as_str(), facing.as_str()),
    )
}

/// Every clip an animated category can ask for.
pub fn clip_keys(category: AssetCategory) -> impl Iterator<Item = SpriteKey> {
    ActionState::ALL.into_iter().flat_map(move |action| {
        CardinalFacing::ALL
            .into_iter()
            .map(move |facing| clip_key(category, action, facing))
    })
}

/// Frame counts captured from the asset catalog at world construction.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationLibrary {
    frame_seconds: f32,
    frame_counts: HashMap<SpriteKey, u32>,
}

impl AnimationLibrary {
    pub fn new(frame_seconds: f32) -> Self {
        Self {
            frame_seconds,
            frame_counts: HashMap::new(),
        }
    }

    pub fn from_catalog(
        catalog: &AssetCatalog,
        categories: &[AssetCategory],
        frame_seconds: f32,
    ) -> Self {
        let mut library = Self::new(frame_seconds);
        for category in categories {
            for key in clip_keys(*category) {
                let count = catalog.frame_count(&key);
                library.frame_counts.insert(key, count);
            }
        }
        library
    }

    pub fn insert(&mut self, key: SpriteKey, frame_count: u32) {
        self.frame_counts.insert(key, frame_count.max(1));
    }

    pub fn frame_seconds(&self) -> f32 {
        self.frame_seconds
    }

    /// Missing sheets count as a single frame.
    pub fn frame_count(&self, key: &SpriteKey) -> u32 {
        self.frame_counts.get(key).copied().unwrap_or(1).max(1)
    }

    /// Seconds one pass through the clip takes.
    pub fn cycle_seconds(&self, key: &SpriteKey) -> f32 {
        self.frame_count(key) as f32 * self.frame_seconds
    }

    pub fn current_frame(
        &self,
        category: AssetCategory,
        state: &AnimationState,
        facing: CardinalFacing,
    ) -> (SpriteKey, u32) {
        let key = clip_key(category, state.action(), facing);
        let frame = frame_index(state.elapsed(), self.frame_seconds, self.frame_count(&key));
        (key, frame)
    }
}
