// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # Tyria Core
//!
//! Core types and models for the Tyria workspace.
//!
//! This crate holds the data shapes returned by the Guild Wars 2 API that the
//! rest of the workspace depends on. It has no network or storage awareness.
//!
//! ## Key Types
//!
//! ### Catalog
//! - [`ItemId`] - Identifier of a catalog item
//! - [`Item`] - A catalog record (name, icon, and upstream fields)
//!
//! ### Account & Characters
//! - [`ItemSlot`] - One occupied slot in the bank or a bag
//! - [`Bank`] - The account bank
//! - [`Character`], [`CharacterCore`], [`CharacterCrafting`]
//! - [`CharacterInventory`], [`Bag`]

pub mod error;
pub mod models;

// Re-export error types
pub use error::CoreError;

// Re-export all model types
pub use models::{
    // Catalog
    Item,
    ItemId,
    UNKNOWN_ITEM_NAME,
    item_icon,
    item_name,
    // Account & characters
    Bag,
    Bank,
    Character,
    CharacterCore,
    CharacterCrafting,
    CharacterInventory,
    CraftingDiscipline,
    ItemSlot,
};
