use crate::entities::item::{Item, ItemTypeId};
use crate::world::error::LoadError;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

pub const DEFAULT_GROUND_SPEED: u16 = 150;

fn default_ground_speed() -> u16 {
    DEFAULT_GROUND_SPEED
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ItemType {
    pub id: ItemTypeId,
    pub name: String,
    #[serde(default)]
    pub ground: bool,
    #[serde(default)]
    pub always_on_top: bool,
    #[serde(default)]
    pub blocking: bool,
    #[serde(default)]
    pub stackable: bool,
    #[serde(default)]
    pub movable: bool,
    #[serde(default)]
    pub usable: bool,
    #[serde(default)]
    pub container: bool,
    /// Ground speed, only meaningful for ground items.
    #[serde(default = "default_ground_speed")]
    pub speed: u16,
}

impl Default for ItemType {
    fn default() -> Self {
        Self {
            id: ItemTypeId(0),
            name: String::new(),
            ground: false,
            always_on_top: false,
            blocking: false,
            stackable: false,
            movable: false,
            usable: false,
            container: false,
            speed: DEFAULT_GROUND_SPEED,
        }
    }
}

/// Creates items from their type id. Map loading and in-game commands go
/// through this instead of touching the type table directly.
pub trait ItemFactory: Send + Sync {
    fn create_item(&self, type_id: ItemTypeId, count: u16) -> Option<Item>;
}

#[derive(Debug, Default, Clone)]
pub struct ItemTypeIndex {
    types: HashMap<ItemTypeId, Arc<ItemType>>,
}

impl ItemTypeIndex {
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let content = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&content).map_err(|err| err.with_path(path))
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, LoadError> {
        let entries: Vec<ItemType> = serde_yaml::from_str(content)?;
        let mut index = Self::default();
        for entry in entries {
            index.insert(entry)?;
        }
        if index.is_empty() {
            return Err(LoadError::Invalid("item table is empty".to_string()));
        }
        Ok(index)
    }

    pub fn get(&self, id: ItemTypeId) -> Option<&ItemType> {
        self.types.get(&id).map(Arc::as_ref)
    }

    pub fn insert(&mut self, item: ItemType) -> Result<(), LoadError> {
        if item.id.0 == 0 {
            return Err(LoadError::Invalid(format!("item '{}' uses reserved id 0", item.name)));
        }
        if self.types.contains_key(&item.id) {
            return Err(LoadError::Invalid(format!("item type {} already exists", item.id)));
        }
        self.types.insert(item.id, Arc::new(item));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl ItemFactory for ItemTypeIndex {
    fn create_item(&self, type_id: ItemTypeId, count: u16) -> Option<Item> {
        self.types
            .get(&type_id)
            .map(|item_type| Item::new(Arc::clone(item_type), count))
    }
}
