use crate::entities::creature::{Creature, CreatureId, Light, Outfit};
use crate::entities::inventory::InventorySlot;
use crate::entities::item::{Item, ItemTypeId};
use crate::world::creature_ctrl::CreatureCtrl;
use crate::world::position::{Direction, Position};
use std::fmt;

/// What a session needs to draw another creature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatureView {
    pub id: CreatureId,
    pub name: String,
    pub direction: Direction,
    pub health_percent: u8,
    pub speed: u16,
    pub light: Light,
    pub outfit: Outfit,
}

impl From<&Creature> for CreatureView {
    fn from(creature: &Creature) -> Self {
        Self {
            id: creature.id(),
            name: creature.name.clone(),
            direction: creature.direction,
            health_percent: creature.health_percent(),
            speed: creature.speed,
            light: creature.light,
            outfit: creature.outfit,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemView {
    pub type_id: ItemTypeId,
    pub count: u16,
}

impl From<&Item> for ItemView {
    fn from(item: &Item) -> Self {
        Self {
            type_id: item.type_id(),
            count: item.count,
        }
    }
}

/// Outgoing message for one session. Framing and encoding happen outside the
/// engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    Login {
        creature_id: CreatureId,
        position: Position,
        message: String,
        visible: Vec<(CreatureView, Position)>,
    },
    LoginRejected {
        reason: String,
    },
    CreatureSpawn {
        creature: CreatureView,
        position: Position,
    },
    CreatureDespawn {
        creature_id: CreatureId,
        position: Position,
        stack_pos: u8,
    },
    CreatureMove {
        creature_id: CreatureId,
        from: Position,
        from_stack_pos: u8,
        to: Position,
        to_stack_pos: u8,
    },
    CreatureTurn {
        creature_id: CreatureId,
        position: Position,
        stack_pos: u8,
        direction: Direction,
    },
    CreatureSay {
        creature_id: CreatureId,
        name: String,
        position: Position,
        message: String,
    },
    PrivateMessage {
        from: String,
        message: String,
    },
    ChannelMessage {
        channel_id: u16,
        from: String,
        message: String,
    },
    ItemAdded {
        position: Position,
        item: ItemView,
    },
    ItemRemoved {
        position: Position,
        stack_pos: u8,
    },
    TileUpdate {
        position: Position,
    },
    EquipmentUpdated {
        slot: InventorySlot,
        item: Option<ItemView>,
    },
    UseItem {
        item: ItemView,
    },
    CancelWalk {
        direction: Direction,
    },
    Cancel {
        message: String,
    },
    TextMessage {
        message: String,
    },
}

/// Where a session's outgoing messages go. Called on the game-logic thread,
/// so it must only queue the message.
pub type MessageSink = Box<dyn Fn(ServerMessage) + Send + Sync>;

/// Session-side controller of a player creature.
pub struct PlayerCtrl {
    player_id: CreatureId,
    sink: MessageSink,
}

impl fmt::Debug for PlayerCtrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlayerCtrl")
            .field("player_id", &self.player_id)
            .finish_non_exhaustive()
    }
}

impl PlayerCtrl {
    pub fn new(player_id: CreatureId, sink: MessageSink) -> Self {
        Self { player_id, sink }
    }

    pub fn player_id(&self) -> CreatureId {
        self.player_id
    }

    pub fn send(&self, message: ServerMessage) {
        (self.sink)(message);
    }

    pub fn send_cancel(&self, message: &str) {
        self.send(ServerMessage::Cancel {
            message: message.to_string(),
        });
    }

    pub fn send_cancel_walk(&self, direction: Direction) {
        self.send(ServerMessage::CancelWalk { direction });
    }

    pub fn send_text(&self, message: impl Into<String>) {
        self.send(ServerMessage::TextMessage {
            message: message.into(),
        });
    }

    pub fn on_equipment_updated(&self, slot: InventorySlot, item: Option<&Item>) {
        self.send(ServerMessage::EquipmentUpdated {
            slot,
            item: item.map(ItemView::from),
        });
    }

    pub fn on_use_item(&self, item: &Item) {
        self.send(ServerMessage::UseItem {
            item: ItemView::from(item),
        });
    }
}

impl CreatureCtrl for PlayerCtrl {
    fn on_creature_spawn(&self, creature: &Creature, position: Position) {
        self.send(ServerMessage::CreatureSpawn {
            creature: CreatureView::from(creature),
            position,
        });
    }

    fn on_creature_despawn(&self, creature: &Creature, position: Position, stack_pos: u8) {
        self.send(ServerMessage::CreatureDespawn {
            creature_id: creature.id(),
            position,
            stack_pos,
        });
    }

    fn on_creature_move(
        &self,
        creature: &Creature,
        old_position: Position,
        old_stack_pos: u8,
        new_position: Position,
        new_stack_pos: u8,
    ) {
        self.send(ServerMessage::CreatureMove {
            creature_id: creature.id(),
            from: old_position,
            from_stack_pos: old_stack_pos,
            to: new_position,
            to_stack_pos: new_stack_pos,
        });
    }

    fn on_creature_turn(&self, creature: &Creature, position: Position, stack_pos: u8) {
        self.send(ServerMessage::CreatureTurn {
            creature_id: creature.id(),
            position,
            stack_pos,
            direction: creature.direction,
        });
    }

    fn on_creature_say(&self, creature: &Creature, position: Position, message: &str) {
        self.send(ServerMessage::CreatureSay {
            creature_id: creature.id(),
            name: creature.name.clone(),
            position,
            message: message.to_string(),
        });
    }

    fn on_item_added(&self, item: &Item, position: Position) {
        self.send(ServerMessage::ItemAdded {
            position,
            item: ItemView::from(item),
        });
    }

    fn on_item_removed(&self, position: Position, stack_pos: u8) {
        self.send(ServerMessage::ItemRemoved {
            position,
            stack_pos,
        });
    }

    fn on_tile_update(&self, position: Position) {
        self.send(ServerMessage::TileUpdate { position });
    }
}
