use crate::entities::creature::CreatureId;
use crate::entities::item::Item;
use crate::world::item_types::DEFAULT_GROUND_SPEED;

/// Most things a tile holds, ground and creatures included. Items beyond this
/// are refused so every thing keeps an addressable stack position.
pub const MAX_TILE_THINGS: usize = 10;

/// Something addressable by stack position on a tile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Thing<'a> {
    Item(&'a Item),
    Creature(CreatureId),
}

/// One map cell. Things are ordered for the client as: ground, always-on-top
/// items, creatures (newest first), then the remaining items (newest first).
/// A thing's index in that order is its stack position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tile {
    ground: Option<Item>,
    top_items: Vec<Item>,
    creature_ids: Vec<CreatureId>,
    bottom_items: Vec<Item>,
}

fn to_stack_pos(index: usize) -> u8 {
    u8::try_from(index).unwrap_or(u8::MAX)
}

impl Tile {
    pub fn new(ground: Option<Item>) -> Self {
        Self {
            ground,
            ..Self::default()
        }
    }

    pub fn ground(&self) -> Option<&Item> {
        self.ground.as_ref()
    }

    pub fn ground_speed(&self) -> u16 {
        self.ground
            .as_ref()
            .map(Item::ground_speed)
            .unwrap_or(DEFAULT_GROUND_SPEED)
    }

    pub fn creature_ids(&self) -> &[CreatureId] {
        &self.creature_ids
    }

    pub fn has_creature(&self, id: CreatureId) -> bool {
        self.creature_ids.contains(&id)
    }

    pub fn thing_count(&self) -> usize {
        usize::from(self.ground.is_some())
            + self.top_items.len()
            + self.creature_ids.len()
            + self.bottom_items.len()
    }

    /// Whether a creature may stand here: there is ground, nothing blocks and
    /// nobody else occupies the tile.
    pub fn is_enterable(&self) -> bool {
        self.ground.is_some()
            && self.creature_ids.is_empty()
            && !self.items().any(Item::is_blocking)
    }

    /// Whether items may be dropped here. Walls and other blocking top items
    /// refuse them, and so does a full tile.
    pub fn accepts_items(&self) -> bool {
        self.ground.is_some()
            && !self.is_full()
            && !self.top_items.iter().any(Item::is_blocking)
    }

    pub fn is_full(&self) -> bool {
        self.thing_count() >= MAX_TILE_THINGS
    }

    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.ground
            .iter()
            .chain(self.top_items.iter())
            .chain(self.bottom_items.iter())
    }

    /// Places a creature on top of the others.
    ///
    /// Panics if the creature is already here; the world registry and the tile
    /// sets would disagree.
    pub fn add_creature(&mut self, id: CreatureId) {
        assert!(
            !self.has_creature(id),
            "creature {id} added twice to the same tile"
        );
        self.creature_ids.insert(0, id);
    }

    /// Panics if the creature is not on this tile.
    pub fn remove_creature(&mut self, id: CreatureId) {
        let index = self
            .creature_ids
            .iter()
            .position(|entry| *entry == id);
        match index {
            Some(index) => {
                self.creature_ids.remove(index);
            }
            None => panic!("creature {id} removed from a tile it is not on"),
        }
    }

    pub fn creature_stack_pos(&self, id: CreatureId) -> Option<u8> {
        let index = self.creature_ids.iter().position(|entry| *entry == id)?;
        Some(to_stack_pos(self.creature_offset() + index))
    }

    /// Adds an item and returns the stack position it landed at. A ground item
    /// replaces the current ground.
    pub fn add_item(&mut self, item: Item) -> u8 {
        if item.is_ground() {
            self.ground = Some(item);
            return 0;
        }
        if item.is_always_on_top() {
            self.top_items.push(item);
            return to_stack_pos(self.ground_offset() + self.top_items.len() - 1);
        }
        self.bottom_items.insert(0, item);
        to_stack_pos(self.bottom_offset())
    }

    pub fn thing(&self, stack_pos: u8) -> Option<Thing<'_>> {
        let mut index = usize::from(stack_pos);
        if let Some(ground) = self.ground.as_ref() {
            if index == 0 {
                return Some(Thing::Item(ground));
            }
            index -= 1;
        }
        if let Some(item) = self.top_items.get(index) {
            return Some(Thing::Item(item));
        }
        index -= self.top_items.len();
        if let Some(id) = self.creature_ids.get(index) {
            return Some(Thing::Creature(*id));
        }
        index -= self.creature_ids.len();
        self.bottom_items.get(index).map(Thing::Item)
    }

    pub fn item(&self, stack_pos: u8) -> Option<&Item> {
        match self.thing(stack_pos)? {
            Thing::Item(item) => Some(item),
            Thing::Creature(_) => None,
        }
    }

    pub fn item_mut(&mut self, stack_pos: u8) -> Option<&mut Item> {
        let (list, index) = self.locate_item(stack_pos)?;
        match list {
            ItemList::Ground => self.ground.as_mut(),
            ItemList::Top => self.top_items.get_mut(index),
            ItemList::Bottom => self.bottom_items.get_mut(index),
        }
    }

    pub fn remove_item(&mut self, stack_pos: u8) -> Option<Item> {
        let (list, index) = self.locate_item(stack_pos)?;
        match list {
            ItemList::Ground => self.ground.take(),
            ItemList::Top => Some(self.top_items.remove(index)),
            ItemList::Bottom => Some(self.bottom_items.remove(index)),
        }
    }

    /// What a player looking at this tile sees first: the top creature, then
    /// the newest loose item, then the top decorations, then the ground.
    pub fn look_target(&self) -> Option<Thing<'_>> {
        if let Some(id) = self.creature_ids.first() {
            return Some(Thing::Creature(*id));
        }
        if let Some(item) = self.bottom_items.first() {
            return Some(Thing::Item(item));
        }
        if let Some(item) = self.top_items.last() {
            return Some(Thing::Item(item));
        }
        self.ground.as_ref().map(Thing::Item)
    }

    fn ground_offset(&self) -> usize {
        usize::from(self.ground.is_some())
    }

    fn creature_offset(&self) -> usize {
        self.ground_offset() + self.top_items.len()
    }

    fn bottom_offset(&self) -> usize {
        self.creature_offset() + self.creature_ids.len()
    }

    fn locate_item(&self, stack_pos: u8) -> Option<(ItemList, usize)> {
        let mut index = usize::from(stack_pos);
        if self.ground.is_some() {
            if index == 0 {
                return Some((ItemList::Ground, 0));
            }
            index -= 1;
        }
        if index < self.top_items.len() {
            return Some((ItemList::Top, index));
        }
        index -= self.top_items.len();
        if index < self.creature_ids.len() {
            return None;
        }
        index -= self.creature_ids.len();
        (index < self.bottom_items.len()).then_some((ItemList::Bottom, index))
    }
}

#[derive(Debug, Clone, Copy)]
enum ItemList {
    Ground,
    Top,
    Bottom,
}
