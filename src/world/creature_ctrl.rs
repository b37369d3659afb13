use crate::entities::creature::Creature;
use crate::entities::item::Item;
use crate::world::position::Position;

/// Receives the world changes a creature can observe. Implemented once per
/// session; the world calls it synchronously on the game-logic thread, so
/// implementations must hand work off instead of blocking or calling back
/// into the world.
pub trait CreatureCtrl: Send + Sync {
    fn on_creature_spawn(&self, creature: &Creature, position: Position);
    fn on_creature_despawn(&self, creature: &Creature, position: Position, stack_pos: u8);
    fn on_creature_move(
        &self,
        creature: &Creature,
        old_position: Position,
        old_stack_pos: u8,
        new_position: Position,
        new_stack_pos: u8,
    );
    fn on_creature_turn(&self, creature: &Creature, position: Position, stack_pos: u8);
    fn on_creature_say(&self, creature: &Creature, position: Position, message: &str);
    fn on_item_added(&self, item: &Item, position: Position);
    fn on_item_removed(&self, position: Position, stack_pos: u8);
    fn on_tile_update(&self, position: Position);
}
