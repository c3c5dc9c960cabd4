mod animation;
mod draw_list;
mod entity;
mod inventory;
mod orchestrator;
mod resources;
mod terrain;
mod tilemap;

pub use animation::{
    clip_key, clip_keys, frame_index, ActionState, AnimationLibrary, AnimationState,
    CardinalFacing,
};
pub use draw_list::{DepthKey, DrawItem, DrawLayer, DrawList, FrameRect, OverlayLine};
pub use entity::{
    follow_intent, CompanionData, Entity, EntityId, EntityIdAllocator, EntityKind, MoveOutcome,
    PlayerData,
};
pub use inventory::{Inventory, InventoryError};
pub use orchestrator::{
    PlayerAction, RejectReason, TickReport, World, WorldError, WorldEvent, COMPANION_SEARCH_RADIUS,
};
pub use resources::{ResourceKind, ResourceLayer, ResourceNode};
pub use terrain::{generate, generate_with_config, GeneratedTerrain, TerrainError, TerrainStats};
pub use tilemap::{TileMap, TileMapError, TileType};
