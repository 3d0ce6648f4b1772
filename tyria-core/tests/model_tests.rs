//! Integration tests for core model types.

use tyria_core::{Item, ItemId, UNKNOWN_ITEM_NAME, item_name};

#[test]
fn test_item_serialization_roundtrip() {
    let item = Item::new(24, "Sealed Package of Snowballs").with_icon("https://render/24.png");
    let json = serde_json::to_string(&item).unwrap();
    let parsed: Item = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, item);
}

#[test]
fn test_item_name_over_shared_items() {
    let items = vec![std::sync::Arc::new(Item::new(1, "Copper Ore"))];
    assert_eq!(item_name(items.iter().map(|item| &**item), ItemId(1)), "Copper Ore");
    assert_eq!(item_name(items.iter().map(|item| &**item), ItemId(9)), UNKNOWN_ITEM_NAME);
}
