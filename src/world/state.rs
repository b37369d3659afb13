use crate::entities::creature::{Creature, CreatureId};
use crate::entities::item::{Item, ItemTypeId};
use crate::world::creature_ctrl::CreatureCtrl;
use crate::world::error::WorldError;
use crate::world::map::TileGrid;
use crate::world::position::{Direction, Position};
use crate::world::tile::Tile;
use crate::world::viewport::VisibilityWindow;
use std::collections::HashMap;
use std::sync::Weak;

/// Creature placement and visibility on top of the tile grid.
///
/// A creature id is registered in `creatures`, `positions` and `ctrls` and
/// stands on exactly one tile, or it is in none of them. Every mutation keeps
/// those views in step and then notifies the controllers of the creatures
/// that can see the change.
///
/// The world is not synchronized. Only the game-logic thread touches it.
#[derive(Debug)]
pub struct World {
    grid: TileGrid,
    window: VisibilityWindow,
    creatures: HashMap<CreatureId, Creature>,
    positions: HashMap<CreatureId, Position>,
    ctrls: HashMap<CreatureId, Weak<dyn CreatureCtrl>>,
}

impl World {
    pub fn new(grid: TileGrid) -> Self {
        Self::with_window(grid, VisibilityWindow::default())
    }

    pub fn with_window(grid: TileGrid, window: VisibilityWindow) -> Self {
        Self {
            grid,
            window,
            creatures: HashMap::new(),
            positions: HashMap::new(),
            ctrls: HashMap::new(),
        }
    }

    pub fn grid(&self) -> &TileGrid {
        &self.grid
    }

    pub fn tile(&self, position: Position) -> Result<&Tile, WorldError> {
        self.grid.tile(position)
    }

    pub fn creature_count(&self) -> usize {
        self.positions.len()
    }

    pub fn creature_exists(&self, id: CreatureId) -> bool {
        self.positions.contains_key(&id)
    }

    pub fn creature(&self, id: CreatureId) -> Result<&Creature, WorldError> {
        self.creatures
            .get(&id)
            .ok_or(WorldError::CreatureNotFound(id))
    }

    pub fn creature_position(&self, id: CreatureId) -> Result<Position, WorldError> {
        self.positions
            .get(&id)
            .copied()
            .ok_or(WorldError::CreatureNotFound(id))
    }

    pub fn creature_stack_pos(&self, id: CreatureId) -> Result<u8, WorldError> {
        let position = self.creature_position(id)?;
        Ok(self.stack_pos_on(id, position))
    }

    /// The window a creature observes the world through. Every creature
    /// currently shares the world window.
    pub fn window_of(&self, _id: CreatureId) -> VisibilityWindow {
        self.window
    }

    /// Whether `observer` currently sees `position`.
    pub fn can_see(&self, observer: CreatureId, position: Position) -> bool {
        self.positions
            .get(&observer)
            .is_some_and(|from| self.window_of(observer).can_see(*from, position))
    }

    pub fn is_enterable(&self, position: Position) -> bool {
        self.grid.tile(position).is_ok_and(Tile::is_enterable)
    }

    pub fn can_add_item(&self, position: Position) -> bool {
        self.grid.tile(position).is_ok_and(Tile::accepts_items)
    }

    /// Places a new creature and tells everyone who can see it. The newcomer
    /// is not told about itself or about creatures already around it.
    pub fn add_creature(
        &mut self,
        creature: Creature,
        ctrl: Weak<dyn CreatureCtrl>,
        position: Position,
    ) -> Result<(), WorldError> {
        let id = creature.id();
        if self.creature_exists(id) {
            return Err(WorldError::DuplicateCreature(id));
        }
        let tile = self
            .grid
            .tile_mut(position)
            .map_err(|_| WorldError::InvalidPlacement(position))?;
        if !tile.is_enterable() {
            return Err(WorldError::InvalidPlacement(position));
        }

        tile.add_creature(id);
        self.positions.insert(id, position);
        self.ctrls.insert(id, ctrl);
        self.creatures.insert(id, creature);

        let observers = self.observers(&[position], Some(id));
        let creature = self.registered(id);
        self.notify(&observers, |ctrl| ctrl.on_creature_spawn(creature, position));
        tracing::debug!(%id, %position, observers = observers.len(), "creature added");
        Ok(())
    }

    /// Removes a creature and hands it back. Observers are computed from the
    /// last position before anything is removed.
    pub fn remove_creature(&mut self, id: CreatureId) -> Result<Creature, WorldError> {
        let position = self.creature_position(id)?;
        let observers = self.observers(&[position], Some(id));
        let stack_pos = self.stack_pos_on(id, position);

        self.occupied_tile_mut(id, position).remove_creature(id);
        self.positions.remove(&id);
        self.ctrls.remove(&id);
        let creature = self
            .creatures
            .remove(&id)
            .unwrap_or_else(|| panic!("creature {id} had a position but no record"));

        self.notify(&observers, |ctrl| {
            ctrl.on_creature_despawn(&creature, position, stack_pos)
        });
        tracing::debug!(%id, %position, observers = observers.len(), "creature removed");
        Ok(creature)
    }

    /// Steps a creature one tile and turns it to face the step.
    pub fn creature_move(&mut self, id: CreatureId, direction: Direction) -> Result<(), WorldError> {
        let from = self.creature_position(id)?;
        let to = from
            .step(direction)
            .ok_or(WorldError::InvalidPlacement(from))?;
        self.move_creature(id, from, to, Some(direction.facing()))
    }

    /// Moves a creature to any enterable position, keeping its facing.
    pub fn creature_move_to(&mut self, id: CreatureId, to: Position) -> Result<(), WorldError> {
        let from = self.creature_position(id)?;
        if from == to {
            return Ok(());
        }
        self.move_creature(id, from, to, None)
    }

    pub fn creature_turn(&mut self, id: CreatureId, direction: Direction) -> Result<(), WorldError> {
        let position = self.creature_position(id)?;
        let creature = self
            .creatures
            .get_mut(&id)
            .ok_or(WorldError::CreatureNotFound(id))?;
        if creature.direction == direction {
            return Ok(());
        }
        creature.direction = direction;

        let stack_pos = self.stack_pos_on(id, position);
        let observers = self.observers(&[position], None);
        let creature = self.registered(id);
        self.notify(&observers, |ctrl| {
            ctrl.on_creature_turn(creature, position, stack_pos)
        });
        Ok(())
    }

    pub fn creature_say(&mut self, id: CreatureId, message: &str) -> Result<(), WorldError> {
        let position = self.creature_position(id)?;
        let observers = self.observers(&[position], None);
        let creature = self.registered(id);
        self.notify(&observers, |ctrl| {
            ctrl.on_creature_say(creature, position, message)
        });
        Ok(())
    }

    /// Drops an item on a tile and returns its stack position.
    pub fn add_item(&mut self, item: Item, position: Position) -> Result<u8, WorldError> {
        let tile = self
            .grid
            .tile_mut(position)
            .map_err(|_| WorldError::InvalidPlacement(position))?;
        if !tile.accepts_items() {
            return Err(WorldError::InvalidPlacement(position));
        }
        let stack_pos = tile.add_item(item);

        let observers = self.observers(&[position], None);
        if let Some(item) = self.grid.tile(position)?.item(stack_pos) {
            self.notify(&observers, |ctrl| ctrl.on_item_added(item, position));
        }
        Ok(stack_pos)
    }

    /// Takes `count` of the movable item at `stack_pos`. Taking part of a
    /// stack leaves the rest in place and is reported as a tile update.
    pub fn remove_item(
        &mut self,
        position: Position,
        stack_pos: u8,
        type_id: ItemTypeId,
        count: u16,
    ) -> Result<Item, WorldError> {
        self.check_movable_item(position, stack_pos, type_id, count)?;
        let observers = self.observers(&[position], None);

        let (item, split) = {
            let tile = self.grid.tile_mut(position)?;
            match tile.item_mut(stack_pos).and_then(|item| item.split(count)) {
                Some(taken) => (taken, true),
                None => {
                    let removed = tile.remove_item(stack_pos).ok_or(WorldError::ItemNotFound {
                        position,
                        stack_pos,
                        type_id,
                    })?;
                    (removed, false)
                }
            }
        };

        if split {
            self.notify(&observers, |ctrl| ctrl.on_tile_update(position));
        } else {
            self.notify(&observers, |ctrl| ctrl.on_item_removed(position, stack_pos));
        }
        Ok(item)
    }

    /// Moves an item between tiles. The destination is checked before the
    /// source is touched, so a refused move changes nothing.
    pub fn move_item(
        &mut self,
        from: Position,
        stack_pos: u8,
        type_id: ItemTypeId,
        count: u16,
        to: Position,
    ) -> Result<(), WorldError> {
        if !self.can_add_item(to) {
            return Err(WorldError::InvalidPlacement(to));
        }
        let item = self.remove_item(from, stack_pos, type_id, count)?;
        self.add_item(item, to)?;
        Ok(())
    }

    /// Creatures standing inside the world window around `center`.
    pub fn visible_creatures(&self, center: Position) -> Vec<(&Creature, Position)> {
        let (min, max) = self.window.bounds(center);
        self.grid
            .tiles_in(min, max)
            .flat_map(|(position, tile)| {
                tile.creature_ids()
                    .iter()
                    .map(move |id| (self.registered(*id), position))
            })
            .collect()
    }

    /// Panics unless every registered creature stands on exactly the tile its
    /// position says and has a controller.
    pub fn check_invariants(&self) {
        assert_eq!(self.positions.len(), self.creatures.len(), "position/creature registries differ");
        assert_eq!(self.positions.len(), self.ctrls.len(), "position/controller registries differ");
        for (id, position) in &self.positions {
            assert!(self.creatures.contains_key(id), "creature {id} has no record");
            assert!(self.ctrls.contains_key(id), "creature {id} has no controller");
            let tile = self
                .grid
                .tile(*position)
                .unwrap_or_else(|err| panic!("creature {id} registered at {position}: {err}"));
            assert!(tile.has_creature(*id), "creature {id} missing from tile {position}");
        }
        let on_tiles: usize = self
            .grid
            .tiles()
            .map(|(_, tile)| tile.creature_ids().len())
            .sum();
        assert_eq!(on_tiles, self.positions.len(), "tiles hold unregistered creatures");
    }

    fn move_creature(
        &mut self,
        id: CreatureId,
        from: Position,
        to: Position,
        facing: Option<Direction>,
    ) -> Result<(), WorldError> {
        let destination = self
            .grid
            .tile(to)
            .map_err(|_| WorldError::InvalidPlacement(to))?;
        if !destination.is_enterable() {
            return Err(WorldError::InvalidPlacement(to));
        }

        let old_stack_pos = self.stack_pos_on(id, from);
        self.occupied_tile_mut(id, from).remove_creature(id);
        self.grid.tile_mut(to)?.add_creature(id);
        self.positions.insert(id, to);
        if let (Some(facing), Some(creature)) = (facing, self.creatures.get_mut(&id)) {
            creature.direction = facing;
        }
        let new_stack_pos = self.stack_pos_on(id, to);

        // Whoever saw either end of the step, the mover included.
        let observers = self.observers(&[from, to], None);
        let creature = self.registered(id);
        self.notify(&observers, |ctrl| {
            ctrl.on_creature_move(creature, from, old_stack_pos, to, new_stack_pos)
        });
        Ok(())
    }

    /// Creatures whose own window contains any of `positions`. Candidates
    /// come from the tiles around each position; `window_of` never exceeds
    /// the world window, so that scan finds every observer.
    fn observers(&self, positions: &[Position], exclude: Option<CreatureId>) -> Vec<CreatureId> {
        let mut found = Vec::new();
        for &position in positions {
            let (min, max) = self.window.bounds(position);
            for (tile_position, tile) in self.grid.tiles_in(min, max) {
                for &id in tile.creature_ids() {
                    if Some(id) == exclude || found.contains(&id) {
                        continue;
                    }
                    debug_assert_eq!(self.positions.get(&id), Some(&tile_position));
                    if self.window_of(id).can_see(tile_position, position) {
                        found.push(id);
                    }
                }
            }
        }
        found
    }

    fn notify(&self, observers: &[CreatureId], mut deliver: impl FnMut(&dyn CreatureCtrl)) {
        for id in observers {
            let Some(ctrl) = self.ctrls.get(id) else {
                panic!("creature {id} stands on a tile without a controller");
            };
            match ctrl.upgrade() {
                Some(ctrl) => deliver(ctrl.as_ref()),
                None => tracing::warn!(%id, "controller dropped while its creature is in the world"),
            }
        }
    }

    fn registered(&self, id: CreatureId) -> &Creature {
        self.creatures
            .get(&id)
            .unwrap_or_else(|| panic!("creature {id} stands on a tile but has no record"))
    }

    fn stack_pos_on(&self, id: CreatureId, position: Position) -> u8 {
        self.grid
            .tile(position)
            .ok()
            .and_then(|tile| tile.creature_stack_pos(id))
            .unwrap_or_else(|| panic!("creature {id} is not on its tile {position}"))
    }

    fn occupied_tile_mut(&mut self, id: CreatureId, position: Position) -> &mut Tile {
        match self.grid.tile_mut(position) {
            Ok(tile) => tile,
            Err(err) => panic!("creature {id} registered at {position}: {err}"),
        }
    }

    fn check_movable_item(
        &self,
        position: Position,
        stack_pos: u8,
        type_id: ItemTypeId,
        count: u16,
    ) -> Result<(), WorldError> {
        let item = self
            .grid
            .tile(position)?
            .item(stack_pos)
            .filter(|item| item.type_id() == type_id)
            .ok_or(WorldError::ItemNotFound {
                position,
                stack_pos,
                type_id,
            })?;
        if !item.is_movable() {
            return Err(WorldError::ItemNotMovable { position, stack_pos });
        }
        if count == 0 || (item.is_stackable() && count > item.count) {
            return Err(WorldError::InvalidCount(count));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::creature_ctrl::testing::{CtrlEvent, RecordingCtrl};
    use crate::world::item_types::fixtures::{item_types, GOLD, SHOVEL};
    use crate::world::item_types::ItemFactory;
    use crate::world::map::fixtures::small_map;
    use std::sync::Arc;

    const ONE: Position = Position::new(192, 192, 7);
    const TWO: Position = Position::new(193, 193, 7);
    const THREE: Position = Position::new(202, 193, 7);
    const FOUR: Position = Position::new(195, 200, 7);

    fn spawn(world: &mut World, name: &str, position: Position) -> (CreatureId, Arc<RecordingCtrl>) {
        let creature = Creature::new(name);
        let id = creature.id();
        let ctrl = Arc::new(RecordingCtrl::default());
        let weak: Weak<dyn CreatureCtrl> = Arc::<RecordingCtrl>::downgrade(&ctrl);
        world.add_creature(creature, weak, position).expect("add creature");
        (id, ctrl)
    }

    fn lcg_next(state: &mut u64) -> u32 {
        *state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1);
        (*state >> 32) as u32
    }

    #[test]
    fn add_creature_notifies_creatures_that_see_the_newcomer() {
        let mut world = World::new(small_map());

        let (one, ctrl_one) = spawn(&mut world, "TestCreatureOne", ONE);
        assert!(ctrl_one.take().is_empty());
        assert!(world.creature_exists(one));
        assert_eq!(world.creature(one).expect("one").name, "TestCreatureOne");
        assert_eq!(world.creature_position(one), Ok(ONE));

        let (two, ctrl_two) = spawn(&mut world, "TestCreatureTwo", TWO);
        assert_eq!(ctrl_one.take(), vec![CtrlEvent::Spawn(two, TWO)]);
        assert!(ctrl_two.take().is_empty());
        assert_eq!(world.creature_position(two), Ok(TWO));

        // dx to one is 10, dx to two is 9
        let (three, ctrl_three) = spawn(&mut world, "TestCreatureThree", THREE);
        assert!(ctrl_one.take().is_empty());
        assert_eq!(ctrl_two.take(), vec![CtrlEvent::Spawn(three, THREE)]);
        assert!(ctrl_three.take().is_empty());

        // dy to one is 8, dy to two and three is 7
        let (four, ctrl_four) = spawn(&mut world, "TestCreatureFour", FOUR);
        assert!(ctrl_one.take().is_empty());
        assert_eq!(ctrl_two.take(), vec![CtrlEvent::Spawn(four, FOUR)]);
        assert_eq!(ctrl_three.take(), vec![CtrlEvent::Spawn(four, FOUR)]);
        assert!(ctrl_four.take().is_empty());
        assert_eq!(world.creature_position(four), Ok(FOUR));

        assert_eq!(world.creature_count(), 4);
        world.check_invariants();
    }

    #[test]
    fn remove_creature_mirrors_spawn_visibility() {
        let mut world = World::new(small_map());
        let (one, ctrl_one) = spawn(&mut world, "TestCreatureOne", ONE);
        let (two, ctrl_two) = spawn(&mut world, "TestCreatureTwo", TWO);
        let (three, ctrl_three) = spawn(&mut world, "TestCreatureThree", THREE);
        let (four, ctrl_four) = spawn(&mut world, "TestCreatureFour", FOUR);
        for ctrl in [&ctrl_one, &ctrl_two, &ctrl_three, &ctrl_four] {
            ctrl.take();
        }

        let removed = world.remove_creature(one).expect("remove one");
        assert_eq!(removed.id(), one);
        assert!(!world.creature_exists(one));
        assert!(ctrl_one.take().is_empty());
        assert_eq!(ctrl_two.take(), vec![CtrlEvent::Despawn(one, ONE, 1)]);
        assert!(ctrl_three.take().is_empty());
        assert!(ctrl_four.take().is_empty());

        world.remove_creature(two).expect("remove two");
        assert!(ctrl_two.take().is_empty());
        assert_eq!(ctrl_three.take(), vec![CtrlEvent::Despawn(two, TWO, 1)]);
        assert_eq!(ctrl_four.take(), vec![CtrlEvent::Despawn(two, TWO, 1)]);

        world.remove_creature(three).expect("remove three");
        assert!(ctrl_three.take().is_empty());
        assert_eq!(ctrl_four.take(), vec![CtrlEvent::Despawn(three, THREE, 1)]);

        world.remove_creature(four).expect("remove four");
        assert!(ctrl_four.take().is_empty());
        assert!(!world.creature_exists(four));
        assert_eq!(world.creature_count(), 0);
        world.check_invariants();
    }

    #[test]
    fn removing_twice_reports_not_found_without_side_effects() {
        let mut world = World::new(small_map());
        let (one, _ctrl_one) = spawn(&mut world, "One", ONE);
        let (_two, ctrl_two) = spawn(&mut world, "Two", TWO);
        world.remove_creature(one).expect("first removal");
        ctrl_two.take();

        assert_eq!(
            world.remove_creature(one).map(|creature| creature.id()),
            Err(WorldError::CreatureNotFound(one))
        );
        assert!(ctrl_two.take().is_empty());
        assert_eq!(world.creature_count(), 1);
        world.check_invariants();
    }

    #[test]
    fn spawn_notifications_match_the_window_predicate() {
        let mut world = World::new(small_map());
        let window = VisibilityWindow::default();
        let mut placed: Vec<(Position, Arc<RecordingCtrl>)> = Vec::new();
        let mut state = 0x5eed_cafe_f00d_beef;
        for _ in 0..64 {
            let position = Position::new(
                192 + (lcg_next(&mut state) % 16) as u16,
                192 + (lcg_next(&mut state) % 16) as u16,
                7,
            );
            if !world.is_enterable(position) {
                continue;
            }
            let (id, ctrl) = spawn(&mut world, "Roamer", position);
            for (observer_position, observer_ctrl) in &placed {
                let expected = if window.can_see(*observer_position, position) {
                    vec![CtrlEvent::Spawn(id, position)]
                } else {
                    Vec::new()
                };
                assert_eq!(observer_ctrl.take(), expected);
            }
            assert!(ctrl.take().is_empty());
            placed.push((position, ctrl));
        }
        assert!(placed.len() > 10);
        world.check_invariants();
    }

    #[test]
    fn blocked_or_foreign_placements_are_rejected() {
        let mut world = World::new(small_map());
        let (one, _ctrl) = spawn(&mut world, "One", ONE);

        let ctrl = Arc::new(RecordingCtrl::default());
        for position in [
            ONE,
            Position::new(200, 200, 7),
            Position::new(191, 192, 7),
            Position::new(207, 207, 7),
            Position::new(192, 192, 6),
        ] {
            let weak: Weak<dyn CreatureCtrl> = Arc::<RecordingCtrl>::downgrade(&ctrl);
            assert_eq!(
                world.add_creature(Creature::new("Blocked"), weak, position),
                Err(WorldError::InvalidPlacement(position))
            );
        }

        let duplicate = world.creature(one).expect("one").clone();
        let weak: Weak<dyn CreatureCtrl> = Arc::<RecordingCtrl>::downgrade(&ctrl);
        assert_eq!(
            world.add_creature(duplicate, weak, TWO),
            Err(WorldError::DuplicateCreature(one))
        );
        assert_eq!(world.creature_count(), 1);
        world.check_invariants();
    }

    #[test]
    fn unknown_ids_are_not_found() {
        let mut world = World::new(small_map());
        let ghost = CreatureId::next();
        assert!(!world.creature_exists(ghost));
        assert!(world.creature(ghost).is_err());
        assert_eq!(world.creature_position(ghost), Err(WorldError::CreatureNotFound(ghost)));
        assert_eq!(world.creature_move(ghost, Direction::North), Err(WorldError::CreatureNotFound(ghost)));
        assert_eq!(world.creature_say(ghost, "boo"), Err(WorldError::CreatureNotFound(ghost)));
    }

    #[test]
    fn mover_and_observers_are_told_about_a_step() {
        let mut world = World::new(small_map());
        let (one, ctrl_one) = spawn(&mut world, "One", ONE);
        let (_two, ctrl_two) = spawn(&mut world, "Two", TWO);
        ctrl_one.take();

        world.creature_move(one, Direction::East).expect("move");
        let to = Position::new(193, 192, 7);
        let expected = vec![CtrlEvent::Move(one, ONE, 1, to, 1)];
        assert_eq!(ctrl_one.take(), expected);
        assert_eq!(ctrl_two.take(), expected);
        assert_eq!(world.creature_position(one), Ok(to));
        assert_eq!(world.creature(one).expect("one").direction, Direction::East);
        world.check_invariants();
    }

    #[test]
    fn steps_across_the_window_edge_reach_both_sides() {
        let mut world = World::new(small_map());
        let (watcher, ctrl_watcher) = spawn(&mut world, "Watcher", ONE);
        let far = Position::new(202, 192, 7);
        let (walker, _ctrl_walker) = spawn(&mut world, "Walker", far);
        assert!(ctrl_watcher.take().is_empty());

        world.creature_move(walker, Direction::West).expect("into view");
        let near = Position::new(201, 192, 7);
        assert_eq!(ctrl_watcher.take(), vec![CtrlEvent::Move(walker, far, 1, near, 1)]);

        world.creature_move(walker, Direction::East).expect("out of view");
        assert_eq!(ctrl_watcher.take(), vec![CtrlEvent::Move(walker, near, 1, far, 1)]);

        world.creature_move(walker, Direction::East).expect("further away");
        assert!(ctrl_watcher.take().is_empty());
        assert!(world.can_see(watcher, near));
        assert!(!world.can_see(watcher, far));
    }

    #[test]
    fn blocked_steps_change_nothing() {
        let mut world = World::new(small_map());
        let start = Position::new(199, 200, 7);
        let (walker, ctrl) = spawn(&mut world, "Walker", start);
        let (_other, _other_ctrl) = spawn(&mut world, "Other", Position::new(199, 199, 7));
        ctrl.take();

        assert_eq!(
            world.creature_move(walker, Direction::East),
            Err(WorldError::InvalidPlacement(Position::new(200, 200, 7)))
        );
        assert_eq!(
            world.creature_move(walker, Direction::North),
            Err(WorldError::InvalidPlacement(Position::new(199, 199, 7)))
        );
        assert_eq!(world.creature_position(walker), Ok(start));
        assert_eq!(world.creature(walker).expect("walker").direction, Direction::South);
        assert!(ctrl.take().is_empty());

        let (edge, _edge_ctrl) = spawn(&mut world, "Edge", ONE);
        assert_eq!(
            world.creature_move(edge, Direction::North),
            Err(WorldError::InvalidPlacement(Position::new(192, 191, 7)))
        );
        world.check_invariants();
    }

    #[test]
    fn teleport_keeps_facing() {
        let mut world = World::new(small_map());
        let (one, ctrl_one) = spawn(&mut world, "One", ONE);
        let target = Position::new(205, 205, 7);
        world.creature_move_to(one, target).expect("teleport");
        assert_eq!(ctrl_one.take(), vec![CtrlEvent::Move(one, ONE, 1, target, 1)]);
        assert_eq!(world.creature(one).expect("one").direction, Direction::South);
        world.creature_move_to(one, target).expect("same spot");
        assert!(ctrl_one.take().is_empty());
    }

    #[test]
    fn turns_reach_self_and_observers_once() {
        let mut world = World::new(small_map());
        let (one, ctrl_one) = spawn(&mut world, "One", ONE);
        let (_three, ctrl_three) = spawn(&mut world, "Three", THREE);

        world.creature_turn(one, Direction::North).expect("turn");
        assert_eq!(ctrl_one.take(), vec![CtrlEvent::Turn(one, ONE, 1, Direction::North)]);
        assert!(ctrl_three.take().is_empty());

        world.creature_turn(one, Direction::North).expect("same facing");
        assert!(ctrl_one.take().is_empty());
    }

    #[test]
    fn speech_reaches_the_speaker_and_listeners_in_view() {
        let mut world = World::new(small_map());
        let (one, ctrl_one) = spawn(&mut world, "One", ONE);
        let (_two, ctrl_two) = spawn(&mut world, "Two", TWO);
        let (_three, ctrl_three) = spawn(&mut world, "Three", THREE);
        ctrl_one.take();
        ctrl_two.take();

        world.creature_say(one, "hello").expect("say");
        let expected = vec![CtrlEvent::Say(one, ONE, "hello".to_string())];
        assert_eq!(ctrl_one.take(), expected);
        assert_eq!(ctrl_two.take(), expected);
        assert!(ctrl_three.take().is_empty());
    }

    #[test]
    fn item_changes_are_reported_to_observers() {
        let mut world = World::new(small_map());
        let (_one, ctrl_one) = spawn(&mut world, "One", Position::new(195, 195, 7));
        let pile = Position::new(196, 196, 7);

        let coins = world
            .remove_item(pile, 1, ItemTypeId(GOLD), 10)
            .expect("split coins");
        assert_eq!(coins.count, 10);
        assert_eq!(ctrl_one.take(), vec![CtrlEvent::TileUpdate(pile)]);
        assert_eq!(world.tile(pile).expect("pile").item(1).map(|item| item.count), Some(20));

        let rest = world
            .remove_item(pile, 1, ItemTypeId(GOLD), 20)
            .expect("remaining coins");
        assert_eq!(rest.count, 20);
        assert_eq!(ctrl_one.take(), vec![CtrlEvent::ItemRemoved(pile, 1)]);

        let target = Position::new(194, 194, 7);
        assert_eq!(world.add_item(coins, target), Ok(1));
        assert_eq!(ctrl_one.take(), vec![CtrlEvent::ItemAdded(ItemTypeId(GOLD), target)]);
    }

    #[test]
    fn item_moves_validate_before_touching_the_source() {
        let mut world = World::new(small_map());
        let (_one, ctrl_one) = spawn(&mut world, "One", Position::new(197, 197, 7));
        let pile = Position::new(196, 196, 7);

        assert_eq!(
            world.move_item(pile, 2, ItemTypeId(SHOVEL), 1, Position::new(200, 200, 7)),
            Err(WorldError::InvalidPlacement(Position::new(200, 200, 7)))
        );
        assert_eq!(
            world.move_item(pile, 0, ItemTypeId(102), 1, Position::new(197, 196, 7)),
            Err(WorldError::ItemNotMovable { position: pile, stack_pos: 0 })
        );
        assert_eq!(
            world.move_item(pile, 1, ItemTypeId(SHOVEL), 1, Position::new(197, 196, 7)),
            Err(WorldError::ItemNotFound {
                position: pile,
                stack_pos: 1,
                type_id: ItemTypeId(SHOVEL)
            })
        );
        assert_eq!(
            world.move_item(pile, 1, ItemTypeId(GOLD), 31, Position::new(197, 196, 7)),
            Err(WorldError::InvalidCount(31))
        );
        assert!(ctrl_one.take().is_empty());

        let target = Position::new(197, 196, 7);
        world
            .move_item(pile, 2, ItemTypeId(SHOVEL), 1, target)
            .expect("move shovel");
        assert_eq!(
            ctrl_one.take(),
            vec![
                CtrlEvent::ItemRemoved(pile, 2),
                CtrlEvent::ItemAdded(ItemTypeId(SHOVEL), target)
            ]
        );
        assert_eq!(
            world.tile(target).expect("target").item(1).map(Item::type_id),
            Some(ItemTypeId(SHOVEL))
        );
    }

    #[test]
    fn items_can_land_under_creatures() {
        let mut world = World::new(small_map());
        let (_one, ctrl_one) = spawn(&mut world, "One", ONE);
        let shovel = item_types()
            .create_item(ItemTypeId(SHOVEL), 1)
            .expect("shovel");
        assert_eq!(world.add_item(shovel, ONE), Ok(2));
        assert_eq!(ctrl_one.take(), vec![CtrlEvent::ItemAdded(ItemTypeId(SHOVEL), ONE)]);
    }

    #[test]
    fn full_tiles_refuse_more_items() {
        let mut world = World::new(small_map());
        let (one, ctrl_one) = spawn(&mut world, "One", ONE);
        let items = item_types();
        let shovel = || items.create_item(ItemTypeId(SHOVEL), 1).expect("shovel");
        for _ in 0..8 {
            assert_eq!(world.add_item(shovel(), ONE), Ok(2));
        }
        assert!(!world.can_add_item(ONE));
        assert_eq!(world.add_item(shovel(), ONE), Err(WorldError::InvalidPlacement(ONE)));
        assert_eq!(world.creature_stack_pos(one), Ok(1));
        assert_eq!(ctrl_one.take().len(), 8);

        let pile = Position::new(196, 196, 7);
        assert_eq!(
            world.move_item(pile, 1, ItemTypeId(GOLD), 5, ONE),
            Err(WorldError::InvalidPlacement(ONE))
        );
        assert_eq!(world.tile(pile).expect("pile").item(1).map(|item| item.count), Some(30));
        world.check_invariants();
    }

    #[test]
    fn visible_creatures_are_window_bounded() {
        let mut world = World::new(small_map());
        let (one, _c1) = spawn(&mut world, "One", ONE);
        let (two, _c2) = spawn(&mut world, "Two", TWO);
        let (_three, _c3) = spawn(&mut world, "Three", THREE);
        let mut visible: Vec<CreatureId> = world
            .visible_creatures(ONE)
            .into_iter()
            .map(|(creature, _)| creature.id())
            .collect();
        visible.sort();
        assert_eq!(visible, vec![one, two]);
    }

    #[test]
    fn dropped_controllers_are_skipped() {
        let mut world = World::new(small_map());
        let (one, ctrl_one) = spawn(&mut world, "One", ONE);
        drop(ctrl_one);
        let (_two, ctrl_two) = spawn(&mut world, "Two", TWO);
        world.creature_say(one, "still here").expect("say");
        assert_eq!(
            ctrl_two.take(),
            vec![CtrlEvent::Say(one, ONE, "still here".to_string())]
        );
    }
}
