//! JSON output formatting.

use anyhow::Result;
use serde::Serialize;
use std::sync::Arc;
use tyria_core::{Bag, Item, ItemId, ItemSlot, item_icon, item_name};

// ============================================================================
// Output Types
// ============================================================================

/// One occupied slot, with its item resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotOutput {
    pub slot: usize,
    pub id: ItemId,
    pub count: u32,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub binding: Option<String>,
}

impl SlotOutput {
    /// Resolves every occupied slot of `slots` against `items`.
    ///
    /// Items missing from `items` get the placeholder name.
    pub fn resolve(slots: &[Option<ItemSlot>], items: &[Arc<Item>]) -> Vec<SlotOutput> {
        slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_ref().map(|slot| (index, slot)))
            .map(|(index, slot)| SlotOutput {
                slot: index + 1,
                id: slot.id,
                count: slot.count,
                name: item_name(items.iter().map(|item| &**item), slot.id).to_string(),
                icon: item_icon(items.iter().map(|item| &**item), slot.id).map(str::to_string),
                binding: slot.binding.clone(),
            })
            .collect()
    }
}

/// One bag of a character's inventory.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BagOutput {
    pub position: usize,
    pub id: ItemId,
    pub name: String,
    pub size: u32,
    pub used: usize,
    pub items: Vec<SlotOutput>,
}

impl BagOutput {
    /// Resolves the equipped bags and their contents against `items`.
    pub fn resolve(bags: &[Option<Bag>], items: &[Arc<Item>]) -> Vec<BagOutput> {
        bags.iter()
            .enumerate()
            .filter_map(|(index, bag)| bag.as_ref().map(|bag| (index, bag)))
            .map(|(index, bag)| {
                let contents = SlotOutput::resolve(&bag.inventory, items);
                BagOutput {
                    position: index + 1,
                    id: bag.id,
                    name: item_name(items.iter().map(|item| &**item), bag.id).to_string(),
                    size: bag.size,
                    used: contents.len(),
                    items: contents,
                }
            })
            .collect()
    }
}

/// Bank or inventory listing.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerOutput<T: Serialize> {
    pub title: String,
    pub capacity: usize,
    pub entries: Vec<T>,
}

/// Result of a catalog lookup.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemsOutput<'a> {
    pub items: Vec<&'a Item>,
    pub missing: Vec<ItemId>,
}

/// State of the stored API key.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyStatusOutput {
    pub set: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
    pub backend: String,
    pub encoding: String,
    pub auth_strategy: String,
}

// ============================================================================
// JSON Formatter
// ============================================================================

/// JSON output formatter.
pub struct JsonFormatter {
    pretty: bool,
}

impl JsonFormatter {
    /// Creates a new JSON formatter.
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    /// Formats any serializable value.
    pub fn format<T: Serialize>(&self, data: &T) -> Result<String> {
        let json = if self.pretty {
            serde_json::to_string_pretty(data)?
        } else {
            serde_json::to_string(data)?
        };
        Ok(json)
    }
}
