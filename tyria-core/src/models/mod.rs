//! Domain models for Tyria.
//!
//! ## Submodules
//!
//! - [`item`] - Catalog items and lookup helpers
//! - [`character`] - Character records returned by `/characters/{name}`
//! - [`inventory`] - Item slots, bags and the account bank

mod character;
mod inventory;
mod item;

pub use character::{Character, CharacterCore, CharacterCrafting, CraftingDiscipline};
pub use inventory::{Bag, Bank, CharacterInventory, ItemSlot};
pub use item::{Item, ItemId, UNKNOWN_ITEM_NAME, item_icon, item_name};
