use crate::world::item_types::ItemType;
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
pub struct ItemTypeId(pub u16);

impl fmt::Display for ItemTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An item instance on a tile or in an inventory slot. The type data is shared
/// with every other item of the same type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    item_type: Arc<ItemType>,
    pub count: u16,
}

impl Item {
    pub fn new(item_type: Arc<ItemType>, count: u16) -> Self {
        let count = if item_type.stackable { count.max(1) } else { 1 };
        Self { item_type, count }
    }

    pub fn type_id(&self) -> ItemTypeId {
        self.item_type.id
    }

    pub fn item_type(&self) -> &ItemType {
        &self.item_type
    }

    pub fn name(&self) -> &str {
        &self.item_type.name
    }

    pub fn is_ground(&self) -> bool {
        self.item_type.ground
    }

    pub fn is_always_on_top(&self) -> bool {
        self.item_type.always_on_top
    }

    pub fn is_blocking(&self) -> bool {
        self.item_type.blocking
    }

    pub fn is_stackable(&self) -> bool {
        self.item_type.stackable
    }

    pub fn is_movable(&self) -> bool {
        self.item_type.movable && !self.item_type.ground
    }

    pub fn is_usable(&self) -> bool {
        self.item_type.usable || self.item_type.container
    }

    pub fn is_container(&self) -> bool {
        self.item_type.container
    }

    pub fn ground_speed(&self) -> u16 {
        self.item_type.speed
    }

    /// Splits `count` units off a stackable item. Returns `None` when the item
    /// is not stackable or `count` does not leave anything behind.
    pub fn split(&mut self, count: u16) -> Option<Item> {
        if !self.is_stackable() || count == 0 || count >= self.count {
            return None;
        }
        self.count -= count;
        Some(Item {
            item_type: Arc::clone(&self.item_type),
            count,
        })
    }

    /// Merges `other` into this stack if both are the same stackable type.
    pub fn merge(&mut self, other: Item) -> Result<(), Item> {
        if !self.is_stackable() || self.type_id() != other.type_id() {
            return Err(other);
        }
        let Some(total) = self.count.checked_add(other.count) else {
            return Err(other);
        };
        self.count = total;
        Ok(())
    }

    /// Text shown when a player looks at the item, e.g. "a shovel" or "12 gold coins".
    pub fn description(&self) -> String {
        let name = self.name();
        if self.is_stackable() && self.count > 1 {
            return format!("{} {}s", self.count, name);
        }
        let article = match name.chars().next() {
            Some(first) if "aeiouAEIOU".contains(first) => "an",
            _ => "a",
        };
        format!("{article} {name}")
    }
}
