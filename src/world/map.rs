use crate::entities::item::ItemTypeId;
use crate::world::error::{LoadError, WorldError};
use crate::world::item_types::ItemFactory;
use crate::world::position::Position;
use crate::world::tile::{Tile, MAX_TILE_THINGS};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// The fixed rectangle and floor range a map covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct MapBounds {
    pub origin_x: u16,
    pub origin_y: u16,
    pub width: u16,
    pub height: u16,
    pub min_z: u8,
    pub max_z: u8,
}

impl MapBounds {
    pub fn contains(&self, position: Position) -> bool {
        let x = u32::from(position.x);
        let y = u32::from(position.y);
        x >= u32::from(self.origin_x)
            && x < u32::from(self.origin_x) + u32::from(self.width)
            && y >= u32::from(self.origin_y)
            && y < u32::from(self.origin_y) + u32::from(self.height)
            && position.z >= self.min_z
            && position.z <= self.max_z
    }

    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        (self.min_z..=self.max_z).flat_map(move |z| {
            (0..self.height).flat_map(move |dy| {
                (0..self.width).filter_map(move |dx| {
                    let x = self.origin_x.checked_add(dx)?;
                    let y = self.origin_y.checked_add(dy)?;
                    Some(Position { x, y, z })
                })
            })
        })
    }
}

/// Sparse spatial index of tiles. Tiles are created while loading and the
/// bounds never change afterwards; positions inside the bounds may still be
/// holes without a tile.
#[derive(Debug, Clone)]
pub struct TileGrid {
    name: String,
    bounds: MapBounds,
    tiles: HashMap<Position, Tile>,
}

impl TileGrid {
    pub fn new(name: impl Into<String>, bounds: MapBounds) -> Self {
        Self {
            name: name.into(),
            bounds,
            tiles: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bounds(&self) -> MapBounds {
        self.bounds
    }

    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    pub fn insert_tile(&mut self, position: Position, tile: Tile) -> Result<(), WorldError> {
        if !self.bounds.contains(position) {
            return Err(WorldError::OutOfBounds(position));
        }
        self.tiles.insert(position, tile);
        Ok(())
    }

    pub fn tile(&self, position: Position) -> Result<&Tile, WorldError> {
        if !self.bounds.contains(position) {
            return Err(WorldError::OutOfBounds(position));
        }
        self.tiles
            .get(&position)
            .ok_or(WorldError::TileNotFound(position))
    }

    pub fn tile_mut(&mut self, position: Position) -> Result<&mut Tile, WorldError> {
        if !self.bounds.contains(position) {
            return Err(WorldError::OutOfBounds(position));
        }
        self.tiles
            .get_mut(&position)
            .ok_or(WorldError::TileNotFound(position))
    }

    /// Tiles inside the rectangle spanned by `min` and `max` on `min.z`.
    pub fn tiles_in(&self, min: Position, max: Position) -> impl Iterator<Item = (Position, &Tile)> {
        let z = min.z;
        (min.y..=max.y).flat_map(move |y| {
            (min.x..=max.x).filter_map(move |x| {
                let position = Position { x, y, z };
                self.tiles.get(&position).map(|tile| (position, tile))
            })
        })
    }

    pub fn tiles(&self) -> impl Iterator<Item = (&Position, &Tile)> {
        self.tiles.iter()
    }
}

#[derive(Debug, Deserialize)]
struct MapFile {
    #[serde(default = "default_map_name")]
    name: String,
    bounds: MapBounds,
    /// Ground placed on every position of the bounds.
    #[serde(default)]
    ground: Option<ItemTypeId>,
    #[serde(default)]
    tiles: Vec<TileEntry>,
    #[serde(default)]
    holes: Vec<Position>,
}

#[derive(Debug, Deserialize)]
struct TileEntry {
    position: Position,
    #[serde(default)]
    ground: Option<ItemTypeId>,
    #[serde(default)]
    items: Vec<ItemEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ItemEntry {
    Plain(ItemTypeId),
    Counted { id: ItemTypeId, count: u16 },
}

fn default_map_name() -> String {
    "map".to_string()
}

pub fn load_map(path: &Path, items: &dyn ItemFactory) -> Result<TileGrid, LoadError> {
    let content = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_map(&content, items).map_err(|err| err.with_path(path))
}

pub fn parse_map(content: &str, items: &dyn ItemFactory) -> Result<TileGrid, LoadError> {
    let file: MapFile = serde_yaml::from_str(content)?;
    if file.bounds.width == 0 || file.bounds.height == 0 || file.bounds.min_z > file.bounds.max_z {
        return Err(LoadError::Invalid(format!(
            "map '{}' has empty bounds",
            file.name
        )));
    }

    let mut grid = TileGrid::new(file.name, file.bounds);
    if let Some(ground) = file.ground {
        for position in file.bounds.positions() {
            let ground = items
                .create_item(ground, 1)
                .ok_or(LoadError::UnknownItem(ground))?;
            grid.tiles.insert(position, Tile::new(Some(ground)));
        }
    }

    for entry in file.tiles {
        let ground = match entry.ground {
            Some(type_id) => Some(
                items
                    .create_item(type_id, 1)
                    .ok_or(LoadError::UnknownItem(type_id))?,
            ),
            None => grid
                .tiles
                .get(&entry.position)
                .and_then(|tile| tile.ground().cloned()),
        };
        let mut tile = Tile::new(ground);
        for item in entry.items {
            let (type_id, count) = match item {
                ItemEntry::Plain(type_id) => (type_id, 1),
                ItemEntry::Counted { id, count } => (id, count),
            };
            let item = items
                .create_item(type_id, count)
                .ok_or(LoadError::UnknownItem(type_id))?;
            if tile.is_full() {
                return Err(LoadError::Invalid(format!(
                    "tile {} holds more than {MAX_TILE_THINGS} things",
                    entry.position
                )));
            }
            tile.add_item(item);
        }
        grid.insert_tile(entry.position, tile).map_err(|err| {
            LoadError::Invalid(format!("tile entry rejected: {err}"))
        })?;
    }

    for hole in file.holes {
        grid.tiles.remove(&hole);
    }

    Ok(grid)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::{parse_map, TileGrid};
    use crate::world::item_types::fixtures::item_types;

    /// 16x16 grass floor covering (192, 192, 7) to (207, 207, 7).
    pub const SMALL_MAP_YAML: &str = r#"
name: test
bounds: { origin_x: 192, origin_y: 192, width: 16, height: 16, min_z: 7, max_z: 7 }
ground: 102
tiles:
  - position: { x: 200, y: 200, z: 7 }
    items: [1011]
  - position: { x: 196, y: 196, z: 7 }
    items: [2554, { id: 2148, count: 30 }]
  - position: { x: 198, y: 192, z: 7 }
    ground: 103
holes:
  - { x: 207, y: 207, z: 7 }
"#;

    pub fn small_map() -> TileGrid {
        parse_map(SMALL_MAP_YAML, &item_types()).expect("fixture map")
    }
}
