//! Item slots, bags and the account bank.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::item::ItemId;

/// An occupied slot in the bank or in a bag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemSlot {
    /// Catalog id of the stored item.
    pub id: ItemId,
    /// Stack size.
    #[serde(default = "default_count")]
    pub count: u32,
    /// Remaining charges, for consumables with charges.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub charges: Option<u32>,
    /// Binding ("Account" or "Character").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binding: Option<String>,
    /// Character the item is soulbound to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bound_to: Option<String>,
    /// Upgrades, infusions, skins and other upstream fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_count() -> u32 {
    1
}

/// The account bank: a fixed number of slots, empty ones are `null` upstream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Bank(pub Vec<Option<ItemSlot>>);

impl Bank {
    /// Iterates over occupied slots.
    pub fn slots(&self) -> impl Iterator<Item = &ItemSlot> {
        self.0.iter().flatten()
    }

    /// Total number of slots, occupied or not.
    pub fn capacity(&self) -> usize {
        self.0.len()
    }

    /// Item ids of every occupied slot, in slot order (may repeat).
    pub fn item_ids(&self) -> Vec<ItemId> {
        self.slots().map(|slot| slot.id).collect()
    }
}

/// A bag equipped by a character.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bag {
    /// Catalog id of the bag itself.
    pub id: ItemId,
    /// Number of slots.
    pub size: u32,
    /// Slots, empty ones are `null` upstream.
    #[serde(default)]
    pub inventory: Vec<Option<ItemSlot>>,
}

/// Response of `/v2/characters/{name}/inventory`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CharacterInventory {
    /// Bag slots, empty ones are `null` upstream.
    #[serde(default)]
    pub bags: Vec<Option<Bag>>,
}

impl CharacterInventory {
    /// Iterates over occupied item slots across all bags.
    pub fn slots(&self) -> impl Iterator<Item = &ItemSlot> {
        self.bags
            .iter()
            .flatten()
            .flat_map(|bag| bag.inventory.iter().flatten())
    }

    /// Item ids of every occupied slot, bag by bag (may repeat).
    pub fn item_ids(&self) -> Vec<ItemId> {
        self.slots().map(|slot| slot.id).collect()
    }
}
