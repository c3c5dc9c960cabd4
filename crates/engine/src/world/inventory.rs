use std::collections::BTreeMap;

use thiserror::Error;

use crate::config::EngineConfig;

use super::resources::ResourceKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InventoryError {
    #[error("amount for {kind} must be greater than zero")]
    InvalidAmount { kind: ResourceKind },
    #[error("not enough {kind}: requested {requested}, have {available}")]
    InsufficientResource {
        kind: ResourceKind,
        requested: u32,
        available: u32,
    },
}

/// Resource counts with optional per-kind caps.
///
/// Collecting past a cap drops the excess silently; consuming more than is
/// held is rejected. Entries appear on first collection and are never removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inventory {
    counts: BTreeMap<ResourceKind, u32>,
    capacities: BTreeMap<ResourceKind, u32>,
    default_capacity: Option<u32>,
}

impl Inventory {
    pub fn new(capacities: BTreeMap<ResourceKind, u32>, default_capacity: Option<u32>) -> Self {
        Self {
            counts: BTreeMap::new(),
            capacities,
            default_capacity,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.inventory_capacities.clone(), config.default_capacity)
    }

    pub fn capacity(&self, kind: ResourceKind) -> Option<u32> {
        self.capacities.get(&kind).copied().or(self.default_capacity)
    }

    pub fn count(&self, kind: ResourceKind) -> u32 {
        self.counts.get(&kind).copied().unwrap_or(0)
    }

    pub fn has(&self, kind: ResourceKind, amount: u32) -> bool {
        self.count(kind) >= amount
    }

    pub fn collect(&mut self, kind: ResourceKind, amount: u32) -> Result<u32, InventoryError> {
        if amount == 0 {
            return Err(InventoryError::InvalidAmount { kind });
        }
        let cap = self.capacity(kind).unwrap_or(u32::MAX);
        let entry = self.counts.entry(kind).or_insert(0);
        *entry = entry.saturating_add(amount).min(cap).max(*entry);
        Ok(*entry)
    }

    pub fn consume(&mut self, kind: ResourceKind, amount: u32) -> Result<u32, InventoryError> {
        if amount == 0 {
            return Err(InventoryError::InvalidAmount { kind });
        }
        let available = self.count(kind);
        if available < amount {
            return Err(InventoryError::InsufficientResource {
                kind,
                requested: amount,
                available,
            });
        }
        let remaining = available - amount;
        self.counts.insert(kind, remaining);
        Ok(remaining)
    }

    /// First food kind held, in declaration order.
    pub fn first_food(&self) -> Option<ResourceKind> {
        ResourceKind::ALL
            .into_iter()
            .find(|kind| kind.is_food() && self.has(*kind, 1))
    }

    pub fn total_items(&self) -> u64 {
        self.counts.values().map(|count| *count as u64).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ResourceKind, u32)> + '_ {
        self.counts.iter().map(|(kind, count)| (*kind, *count))
    }

    pub fn to_lines(&self) -> Vec<String> {
        self.iter()
            .map(|(kind, count)| format!("{kind}: {count}"))
            .collect()
    }
}
