use crate::entities::item::{Item, ItemTypeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InventorySlot {
    Head,
    Necklace,
    Backpack,
    Armor,
    RightHand,
    LeftHand,
    Legs,
    Feet,
    Ring,
    Ammo,
}

impl InventorySlot {
    const COUNT: usize = 10;

    pub fn index(self) -> usize {
        match self {
            InventorySlot::Head => 0,
            InventorySlot::Necklace => 1,
            InventorySlot::Backpack => 2,
            InventorySlot::Armor => 3,
            InventorySlot::RightHand => 4,
            InventorySlot::LeftHand => 5,
            InventorySlot::Legs => 6,
            InventorySlot::Feet => 7,
            InventorySlot::Ring => 8,
            InventorySlot::Ammo => 9,
        }
    }
}

pub const INVENTORY_SLOTS: [InventorySlot; InventorySlot::COUNT] = [
    InventorySlot::Head,
    InventorySlot::Necklace,
    InventorySlot::Backpack,
    InventorySlot::Armor,
    InventorySlot::RightHand,
    InventorySlot::LeftHand,
    InventorySlot::Legs,
    InventorySlot::Feet,
    InventorySlot::Ring,
    InventorySlot::Ammo,
];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InventoryError {
    #[error("inventory slot {0:?} is empty")]
    Empty(InventorySlot),
    #[error("inventory slot {0:?} is occupied")]
    Occupied(InventorySlot),
    #[error("inventory slot {slot:?} holds no item of type {type_id}")]
    WrongType {
        slot: InventorySlot,
        type_id: ItemTypeId,
    },
    #[error("invalid item count {0}")]
    InvalidCount(u16),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inventory {
    slots: [Option<Item>; InventorySlot::COUNT],
}

impl Inventory {
    pub fn item(&self, slot: InventorySlot) -> Option<&Item> {
        self.slots[slot.index()].as_ref()
    }

    pub fn items(&self) -> impl Iterator<Item = (InventorySlot, &Item)> {
        INVENTORY_SLOTS
            .iter()
            .filter_map(|slot| self.item(*slot).map(|item| (*slot, item)))
    }

    /// Whether `item` fits: the slot is empty or holds the same stackable type
    /// with room left in the stack.
    pub fn can_add(&self, slot: InventorySlot, item: &Item) -> bool {
        match self.item(slot) {
            None => true,
            Some(existing) => {
                existing.is_stackable()
                    && existing.type_id() == item.type_id()
                    && existing.count.checked_add(item.count).is_some()
            }
        }
    }

    /// Puts `item` into `slot`, merging stacks. A refused item is handed back.
    pub fn add(&mut self, slot: InventorySlot, item: Item) -> Result<(), Item> {
        let entry = &mut self.slots[slot.index()];
        match entry {
            Some(existing) => existing.merge(item),
            None => {
                *entry = Some(item);
                Ok(())
            }
        }
    }

    /// Checks that `slot` holds `count` of `type_id` without changing anything.
    pub fn check_remove(
        &self,
        slot: InventorySlot,
        type_id: ItemTypeId,
        count: u16,
    ) -> Result<&Item, InventoryError> {
        let item = self.item(slot).ok_or(InventoryError::Empty(slot))?;
        if item.type_id() != type_id {
            return Err(InventoryError::WrongType { slot, type_id });
        }
        if count == 0 || (item.is_stackable() && count > item.count) {
            return Err(InventoryError::InvalidCount(count));
        }
        Ok(item)
    }

    /// Takes `count` from `slot`. Taking part of a stack leaves the rest.
    pub fn remove(
        &mut self,
        slot: InventorySlot,
        type_id: ItemTypeId,
        count: u16,
    ) -> Result<Item, InventoryError> {
        self.check_remove(slot, type_id, count)?;
        let entry = &mut self.slots[slot.index()];
        if let Some(taken) = entry.as_mut().and_then(|item| item.split(count)) {
            return Ok(taken);
        }
        entry.take().ok_or(InventoryError::Empty(slot))
    }

    /// Moves `count` between two slots. The destination must be able to take
    /// the item, otherwise nothing changes.
    pub fn move_between(
        &mut self,
        from: InventorySlot,
        to: InventorySlot,
        type_id: ItemTypeId,
        count: u16,
    ) -> Result<(), InventoryError> {
        if from == to {
            self.check_remove(from, type_id, count)?;
            return Ok(());
        }
        let source = self.check_remove(from, type_id, count)?;
        let mut probe = source.clone();
        if probe.is_stackable() {
            probe.count = count;
        }
        if !self.can_add(to, &probe) {
            return Err(InventoryError::Occupied(to));
        }
        let item = self.remove(from, type_id, count)?;
        self.add(to, item)
            .map_err(|_| InventoryError::Occupied(to))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::item_types::fixtures::{item_types, BACKPACK, GOLD, SHOVEL};
    use crate::world::item_types::ItemFactory;

    fn item(type_id: u16, count: u16) -> Item {
        item_types()
            .create_item(ItemTypeId(type_id), count)
            .expect("fixture item")
    }

    #[test]
    fn stackables_merge_and_others_refuse() {
        let mut inventory = Inventory::default();
        assert!(inventory.add(InventorySlot::Ammo, item(GOLD, 10)).is_ok());
        assert!(inventory.can_add(InventorySlot::Ammo, &item(GOLD, 5)));
        assert!(inventory.add(InventorySlot::Ammo, item(GOLD, 5)).is_ok());
        assert_eq!(inventory.item(InventorySlot::Ammo).map(|item| item.count), Some(15));

        assert!(inventory.add(InventorySlot::Backpack, item(BACKPACK, 1)).is_ok());
        assert!(!inventory.can_add(InventorySlot::Backpack, &item(SHOVEL, 1)));
        let refused = inventory
            .add(InventorySlot::Backpack, item(SHOVEL, 1))
            .expect_err("occupied");
        assert_eq!(refused.type_id(), ItemTypeId(SHOVEL));
    }

    #[test]
    fn partial_removal_splits_the_stack() {
        let mut inventory = Inventory::default();
        inventory
            .add(InventorySlot::LeftHand, item(GOLD, 20))
            .expect("add gold");
        let taken = inventory
            .remove(InventorySlot::LeftHand, ItemTypeId(GOLD), 5)
            .expect("split");
        assert_eq!(taken.count, 5);
        assert_eq!(inventory.item(InventorySlot::LeftHand).map(|item| item.count), Some(15));

        let rest = inventory
            .remove(InventorySlot::LeftHand, ItemTypeId(GOLD), 15)
            .expect("rest");
        assert_eq!(rest.count, 15);
        assert!(inventory.item(InventorySlot::LeftHand).is_none());
    }

    #[test]
    fn removal_checks_type_and_count() {
        let mut inventory = Inventory::default();
        inventory
            .add(InventorySlot::RightHand, item(SHOVEL, 1))
            .expect("add shovel");
        assert_eq!(
            inventory.remove(InventorySlot::Head, ItemTypeId(SHOVEL), 1),
            Err(InventoryError::Empty(InventorySlot::Head))
        );
        assert_eq!(
            inventory.remove(InventorySlot::RightHand, ItemTypeId(GOLD), 1),
            Err(InventoryError::WrongType {
                slot: InventorySlot::RightHand,
                type_id: ItemTypeId(GOLD)
            })
        );
        assert_eq!(
            inventory.remove(InventorySlot::RightHand, ItemTypeId(SHOVEL), 0),
            Err(InventoryError::InvalidCount(0))
        );
        assert!(inventory.item(InventorySlot::RightHand).is_some());
    }

    #[test]
    fn move_between_slots_keeps_items_on_refusal() {
        let mut inventory = Inventory::default();
        inventory
            .add(InventorySlot::RightHand, item(SHOVEL, 1))
            .expect("add shovel");
        inventory
            .add(InventorySlot::LeftHand, item(GOLD, 8))
            .expect("add gold");

        assert_eq!(
            inventory.move_between(InventorySlot::LeftHand, InventorySlot::RightHand, ItemTypeId(GOLD), 3),
            Err(InventoryError::Occupied(InventorySlot::RightHand))
        );
        assert_eq!(inventory.item(InventorySlot::LeftHand).map(|item| item.count), Some(8));

        inventory
            .move_between(InventorySlot::LeftHand, InventorySlot::Ammo, ItemTypeId(GOLD), 3)
            .expect("split move");
        assert_eq!(inventory.item(InventorySlot::Ammo).map(|item| item.count), Some(3));
        assert_eq!(inventory.item(InventorySlot::LeftHand).map(|item| item.count), Some(5));
        assert_eq!(inventory.items().count(), 3);
    }
}
