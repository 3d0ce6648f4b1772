//! Catalog item types.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// Name shown for an item the catalog has no record of.
pub const UNKNOWN_ITEM_NAME: &str = "Unknown item";

// ============================================================================
// Item Id
// ============================================================================

/// Identifier of a catalog item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub u32);

impl ItemId {
    /// Returns the raw numeric id.
    pub fn get(self) -> u32 {
        self.0
    }
}

impl From<u32> for ItemId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ItemId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u32>()
            .map(Self)
            .map_err(|_| CoreError::InvalidId(s.to_string()))
    }
}

// ============================================================================
// Item
// ============================================================================

/// A catalog record returned by `/v2/items`.
///
/// Only the fields the workspace reads are typed; everything else the
/// upstream sends is kept in [`Item::extra`] so nothing is lost when an item
/// is cached and re-serialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Catalog id.
    pub id: ItemId,

    /// Display name.
    #[serde(default)]
    pub name: String,

    /// Icon URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,

    /// Flavor/description text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Item type (e.g. "Armor", "Consumable").
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub item_type: Option<String>,

    /// Rarity (e.g. "Exotic").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rarity: Option<String>,

    /// Required level.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<u32>,

    /// Vendor value in copper.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor_value: Option<u64>,

    /// Item flags (e.g. "AccountBound").
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flags: Vec<String>,

    /// Any other upstream fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Item {
    /// Creates an item with just an id and a name.
    pub fn new(id: impl Into<ItemId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            icon: None,
            description: None,
            item_type: None,
            rarity: None,
            level: None,
            vendor_value: None,
            flags: Vec::new(),
            extra: Map::new(),
        }
    }

    /// Sets the icon URL.
    #[must_use]
    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }
}

// ============================================================================
// Lookup Helpers
// ============================================================================

/// Returns the name of `id` among `items`, or [`UNKNOWN_ITEM_NAME`].
pub fn item_name<'a, I>(items: I, id: ItemId) -> &'a str
where
    I: IntoIterator<Item = &'a Item>,
{
    items
        .into_iter()
        .find(|item| item.id == id)
        .map_or(UNKNOWN_ITEM_NAME, |item| item.name.as_str())
}

/// Returns the icon URL of `id` among `items`, if the item is known and has one.
pub fn item_icon<'a, I>(items: I, id: ItemId) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a Item>,
{
    items
        .into_iter()
        .find(|item| item.id == id)
        .and_then(|item| item.icon.as_deref())
}
