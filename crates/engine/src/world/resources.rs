use std::collections::BTreeMap;
use std::fmt;

use rand::{Rng, SeedableRng};
use rand_xorshift::XorShiftRng;
use serde::{Deserialize, Serialize};

use crate::math::Cell;

use super::tilemap::{TileMap, TileType};

const RESOURCE_SEED_SALT: u64 = 0x5eed_0f_c0ffee;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Wood,
    Stone,
    Berries,
    Fiber,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 4] = [
        ResourceKind::Wood,
        ResourceKind::Stone,
        ResourceKind::Berries,
        ResourceKind::Fiber,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Wood => "wood",
            ResourceKind::Stone => "stone",
            ResourceKind::Berries => "berries",
            ResourceKind::Fiber => "fiber",
        }
    }

    pub const fn is_food(self) -> bool {
        matches!(self, ResourceKind::Berries)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Harvestable object sitting on a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceNode {
    Tree,
    Boulder,
    BerryBush,
    Reeds,
}

impl ResourceNode {
    pub const fn asset_name(self) -> &'static str {
        match self {
            ResourceNode::Tree => "tree",
            ResourceNode::Boulder => "boulder",
            ResourceNode::BerryBush => "berry_bush",
            ResourceNode::Reeds => "reeds",
        }
    }

    pub const fn yield_of(self) -> (ResourceKind, u32) {
        match self {
            ResourceNode::Tree => (ResourceKind::Wood, 2),
            ResourceNode::Boulder => (ResourceKind::Stone, 2),
            ResourceNode::BerryBush => (ResourceKind::Berries, 1),
            ResourceNode::Reeds => (ResourceKind::Fiber, 1),
        }
    }

    /// Bushes are foraged by walking onto them; the rest need an interact.
    pub const fn requires_interaction(self) -> bool {
        !matches!(self, ResourceNode::BerryBush)
    }

    pub const ALL: [ResourceNode; 4] = [
        ResourceNode::Tree,
        ResourceNode::Boulder,
        ResourceNode::BerryBush,
        ResourceNode::Reeds,
    ];
}

/// Spawn chance per terrain, checked in order; at most one node per cell.
fn spawn_table(tile: TileType) -> &'static [(ResourceNode, f64)] {
    match tile {
        TileType::Grass => &[(ResourceNode::Tree, 0.10), (ResourceNode::BerryBush, 0.06)],
        TileType::Dirt => &[(ResourceNode::Tree, 0.04), (ResourceNode::Boulder, 0.04)],
        TileType::Rock => &[(ResourceNode::Boulder, 0.15)],
        TileType::Sand => &[(ResourceNode::Reeds, 0.08)],
        TileType::Water => &[],
    }
}

/// Resource nodes keyed by cell. Owned and mutated by the world only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceLayer {
    nodes: BTreeMap<Cell, ResourceNode>,
}

impl ResourceLayer {
    /// Deterministic scatter: one roll sequence per cell in row-major order.
    pub fn scatter(tilemap: &TileMap, seed: u64) -> Self {
        let mut rng = XorShiftRng::seed_from_u64(seed ^ RESOURCE_SEED_SALT);
        let mut nodes = BTreeMap::new();
        for (cell, tile) in tilemap.cells() {
            for (node, chance) in spawn_table(tile) {
                if rng.gen_bool(*chance) {
                    nodes.insert(cell, *node);
                    break;
                }
            }
        }
        Self { nodes }
    }

    pub fn insert(&mut self, cell: Cell, node: ResourceNode) -> Option<ResourceNode> {
        self.nodes.insert(cell, node)
    }

    pub fn node_at(&self, cell: Cell) -> Option<ResourceNode> {
        self.nodes.get(&cell).copied()
    }

    pub fn take(&mut self, cell: Cell) -> Option<ResourceNode> {
        self.nodes.remove(&cell)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Cell, ResourceNode)> + '_ {
        self.nodes.iter().map(|(cell, node)| (*cell, *node))
    }

    /// Closest node needing an interact within Chebyshev `reach` of `center`.
    /// Ties resolve to the first cell in row-major order.
    pub fn nearest_interactable(&self, center: Cell, reach: i32) -> Option<(Cell, ResourceNode)> {
        self.nodes
            .iter()
            .filter(|(cell, node)| {
                node.requires_interaction() && cell.chebyshev_distance(center) <= reach
            })
            .min_by_key(|(cell, _)| (cell.chebyshev_distance(center), cell.row, cell.col))
            .map(|(cell, node)| (*cell, *node))
    }
}
