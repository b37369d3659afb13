use crate::admin::commands::{parse_admin_command, AdminCommand};
use crate::engine::error::EngineError;
use crate::engine::player_ctrl::{CreatureView, PlayerCtrl, ServerMessage};
use crate::engine::task_queue::TaskHandle;
use crate::entities::creature::{Creature, CreatureId};
use crate::entities::inventory::{InventoryError, InventorySlot};
use crate::entities::item::ItemTypeId;
use crate::entities::player::Player;
use crate::world::creature_ctrl::CreatureCtrl;
use crate::world::error::WorldError;
use crate::world::item_types::{ItemFactory, DEFAULT_GROUND_SPEED};
use crate::world::position::{Direction, Position, ALL_DIRECTIONS};
use crate::world::state::World;
use crate::world::tile::{Thing, Tile};
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

const MSG_NO_ROOM: &str = "There is no room.";
const MSG_TOO_FAR: &str = "You are too far away.";
const MSG_NOT_MOVABLE: &str = "You cannot move this object.";
const MSG_NOT_POSSIBLE: &str = "Sorry, not possible.";
const MSG_NOT_USABLE: &str = "You cannot use this object.";
const MSG_NOT_ONLINE: &str = "A player with this name is not online.";
const MSG_NO_ADMIN_RIGHTS: &str = "You do not have admin rights.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TalkType {
    Say,
    Whisper,
    Yell,
    Private,
    Channel,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub spawn_position: Position,
    pub login_message: String,
    /// Names, compared case-insensitively, of players allowed to run chat
    /// commands.
    pub gamemasters: Vec<String>,
}

impl EngineConfig {
    pub fn is_gamemaster(&self, name: &str) -> bool {
        self.gamemasters
            .iter()
            .any(|gamemaster| gamemaster.eq_ignore_ascii_case(name))
    }
}

/// Everything the game-logic thread owns. Tasks get `&mut GameState`, so no
/// other thread ever touches the world or the player registries.
pub struct GameState {
    world: World,
    players: HashMap<CreatureId, Player>,
    ctrls: HashMap<CreatureId, Arc<PlayerCtrl>>,
    items: Arc<dyn ItemFactory>,
    config: EngineConfig,
    tasks: TaskHandle<GameState>,
}

impl GameState {
    pub fn new(
        world: World,
        items: Arc<dyn ItemFactory>,
        config: EngineConfig,
        tasks: TaskHandle<GameState>,
    ) -> Self {
        Self {
            world,
            players: HashMap::new(),
            ctrls: HashMap::new(),
            items,
            config,
            tasks,
        }
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn player(&self, id: CreatureId) -> Option<&Player> {
        self.players.get(&id)
    }

    pub fn online_players(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .players
            .values()
            .map(|player| player.name.clone())
            .collect();
        names.sort();
        names
    }

    pub(crate) fn spawn(&mut self, id: CreatureId, name: String, ctrl: Arc<PlayerCtrl>) {
        let Some(position) = self.spawn_position() else {
            tracing::info!(%id, %name, "no room to spawn player");
            ctrl.send(ServerMessage::LoginRejected {
                reason: MSG_NO_ROOM.to_string(),
            });
            return;
        };

        let visible = self
            .world
            .visible_creatures(position)
            .into_iter()
            .map(|(creature, at)| (CreatureView::from(creature), at))
            .collect();
        let observer: Weak<dyn CreatureCtrl> = Arc::<PlayerCtrl>::downgrade(&ctrl);
        let creature = Creature::with_id(id, name.clone());
        if let Err(err) = self.world.add_creature(creature, observer, position) {
            tracing::warn!(%id, %name, error = %err, "player spawn rejected");
            ctrl.send(ServerMessage::LoginRejected {
                reason: MSG_NOT_POSSIBLE.to_string(),
            });
            return;
        }

        let mut player = Player::new(id, name.clone());
        player.is_gm = self.config.is_gamemaster(&name);
        self.players.insert(id, player);
        self.ctrls.insert(id, Arc::clone(&ctrl));
        ctrl.send(ServerMessage::Login {
            creature_id: id,
            position,
            message: self.config.login_message.clone(),
            visible,
        });
        tracing::info!(%id, %name, %position, "player spawned");
    }

    /// The configured spawn position, or the first free tile around it.
    fn spawn_position(&self) -> Option<Position> {
        let spawn = self.config.spawn_position;
        std::iter::once(Some(spawn))
            .chain(ALL_DIRECTIONS.iter().map(|direction| spawn.step(*direction)))
            .flatten()
            .find(|position| self.world.is_enterable(*position))
    }

    pub(crate) fn despawn(&mut self, id: CreatureId) {
        match self.world.remove_creature(id) {
            Ok(creature) => tracing::info!(%id, name = %creature.name, "player despawned"),
            Err(err) => {
                tracing::debug!(%id, error = %EngineError::from(err), "despawn of unknown creature")
            }
        }
        self.players.remove(&id);
        self.ctrls.remove(&id);
    }

    pub(crate) fn move_creature(&mut self, id: CreatureId, direction: Direction) {
        let Some(ctrl) = self.session(id) else {
            return;
        };
        let now = Instant::now();
        let Some(player) = self.players.get_mut(&id) else {
            return;
        };
        if let Some(delay) = player.walk_delay(now) {
            if let Some(generation) = player.queue_step(direction) {
                self.schedule(delay, move |state| state.path_step(id, generation));
            }
            return;
        }
        player.stop_path();
        self.step(id, direction, now, &ctrl);
    }

    pub(crate) fn move_path(&mut self, id: CreatureId, path: Vec<Direction>) {
        if self.session(id).is_none() {
            return;
        }
        let Some(player) = self.players.get_mut(&id) else {
            return;
        };
        let generation = player.start_path(path);
        let delay = player.walk_delay(Instant::now()).unwrap_or_default();
        self.schedule(delay, move |state| state.path_step(id, generation));
    }

    pub(crate) fn path_step(&mut self, id: CreatureId, generation: u64) {
        let Some(ctrl) = self.session(id) else {
            return;
        };
        let now = Instant::now();
        let Some(player) = self.players.get_mut(&id) else {
            return;
        };
        if !player.is_current_path(generation) {
            return;
        }
        if let Some(delay) = player.walk_delay(now) {
            self.schedule(delay, move |state| state.path_step(id, generation));
            return;
        }
        let Some(direction) = player.next_path_step(generation) else {
            return;
        };

        let moved = self.step(id, direction, now, &ctrl);
        let Some(player) = self.players.get_mut(&id) else {
            return;
        };
        if !moved {
            player.stop_path();
            return;
        }
        if player.queued_steps() > 0 {
            let delay = player.walk_delay(now).unwrap_or_default();
            self.schedule(delay, move |state| state.path_step(id, generation));
        }
    }

    pub(crate) fn cancel_move(&mut self, id: CreatureId) {
        let Some(ctrl) = self.session(id) else {
            return;
        };
        if let Some(player) = self.players.get_mut(&id) {
            player.cancel_walk();
        }
        ctrl.send_cancel_walk(self.facing(id));
    }

    pub(crate) fn turn(&mut self, id: CreatureId, direction: Direction) {
        if self.session(id).is_none() {
            return;
        }
        if let Err(err) = self.world.creature_turn(id, direction) {
            tracing::debug!(%id, error = %err, "turn rejected");
        }
    }

    pub(crate) fn say(
        &mut self,
        id: CreatureId,
        talk_type: TalkType,
        receiver: &str,
        channel_id: u16,
        message: &str,
    ) {
        let Some(ctrl) = self.session(id) else {
            return;
        };
        if matches!(talk_type, TalkType::Say | TalkType::Whisper | TalkType::Yell) {
            match parse_admin_command(message) {
                Ok(None) => {}
                _ if !self.is_gm(id) => {
                    tracing::info!(%id, "chat command refused");
                    ctrl.send_text(MSG_NO_ADMIN_RIGHTS);
                    return;
                }
                Ok(Some(command)) => {
                    self.run_command(id, &ctrl, command);
                    return;
                }
                Err(err) => {
                    ctrl.send_text(err.to_string());
                    return;
                }
            }
        }

        let from = self
            .players
            .get(&id)
            .map(|player| player.name.clone())
            .unwrap_or_default();
        match talk_type {
            TalkType::Say | TalkType::Whisper | TalkType::Yell => {
                if let Err(err) = self.world.creature_say(id, message) {
                    tracing::debug!(%id, error = %err, "say rejected");
                }
            }
            TalkType::Private => match self.find_player(receiver) {
                Some(target) => target.send(ServerMessage::PrivateMessage {
                    from,
                    message: message.to_string(),
                }),
                None => ctrl.send_cancel(MSG_NOT_ONLINE),
            },
            TalkType::Channel => {
                for target in self.ctrls.values() {
                    target.send(ServerMessage::ChannelMessage {
                        channel_id,
                        from: from.clone(),
                        message: message.to_string(),
                    });
                }
            }
        }
    }

    fn run_command(&mut self, id: CreatureId, ctrl: &PlayerCtrl, command: AdminCommand) {
        tracing::info!(%id, ?command, "admin command");
        match command {
            AdminCommand::Online => {
                let names = self.online_players();
                ctrl.send_text(format!(
                    "{} player(s) online: {}",
                    names.len(),
                    names.join(", ")
                ));
            }
            AdminCommand::Where => {
                if let Ok(position) = self.world.creature_position(id) {
                    ctrl.send_text(format!("You are at {position}."));
                }
            }
            AdminCommand::Teleport { position } => {
                if let Some(player) = self.players.get_mut(&id) {
                    player.stop_path();
                }
                if let Err(err) = self.world.creature_move_to(id, position) {
                    ctrl.send_cancel(cancel_message(&err));
                }
            }
            AdminCommand::Put { type_id, count } => {
                let Some(item) = self.items.create_item(type_id, count) else {
                    ctrl.send_text(format!("Unknown item type {type_id}."));
                    return;
                };
                let target = self
                    .world
                    .creature_position(id)
                    .ok()
                    .and_then(|position| position.step(self.facing(id)));
                match target {
                    Some(target) => {
                        if let Err(err) = self.world.add_item(item, target) {
                            ctrl.send_cancel(cancel_message(&err));
                        }
                    }
                    None => ctrl.send_cancel(MSG_NO_ROOM),
                }
            }
            AdminCommand::Shutdown => {
                ctrl.send_text("Shutdown is only available on the server console.")
            }
            AdminCommand::Unknown(name) => ctrl.send_text(format!("Unknown command '{name}'.")),
        }
    }

    pub(crate) fn move_item_from_pos_to_pos(
        &mut self,
        id: CreatureId,
        from: Position,
        stack_pos: u8,
        type_id: ItemTypeId,
        count: u16,
        to: Position,
    ) {
        let Some(ctrl) = self.session(id) else {
            return;
        };
        if !self.within_reach(id, from) {
            ctrl.send_cancel(MSG_TOO_FAR);
            return;
        }
        if !self.world.can_see(id, to) {
            ctrl.send_cancel(MSG_NOT_POSSIBLE);
            return;
        }
        if let Err(err) = self.world.move_item(from, stack_pos, type_id, count, to) {
            tracing::debug!(%id, error = %err, "item move rejected");
            ctrl.send_cancel(cancel_message(&err));
        }
    }

    pub(crate) fn move_item_from_pos_to_inv(
        &mut self,
        id: CreatureId,
        from: Position,
        stack_pos: u8,
        type_id: ItemTypeId,
        count: u16,
        slot: InventorySlot,
    ) {
        let Some(ctrl) = self.session(id) else {
            return;
        };
        if !self.within_reach(id, from) {
            ctrl.send_cancel(MSG_TOO_FAR);
            return;
        }
        let Some(player) = self.players.get_mut(&id) else {
            return;
        };
        let fits = self
            .world
            .tile(from)
            .ok()
            .and_then(|tile| tile.item(stack_pos))
            .filter(|item| item.type_id() == type_id)
            .map(|item| {
                let mut probe = item.clone();
                probe.count = count.min(item.count);
                player.inventory.can_add(slot, &probe)
            });
        if fits == Some(false) {
            ctrl.send_cancel(MSG_NO_ROOM);
            return;
        }

        let item = match self.world.remove_item(from, stack_pos, type_id, count) {
            Ok(item) => item,
            Err(err) => {
                tracing::debug!(%id, error = %err, "item pickup rejected");
                ctrl.send_cancel(cancel_message(&err));
                return;
            }
        };
        if let Err(item) = player.inventory.add(slot, item) {
            tracing::warn!(%id, ?slot, "inventory refused a checked item, putting it back");
            if let Err(err) = self.world.add_item(item, from) {
                tracing::error!(%id, error = %err, "item lost while returning it to the map");
            }
            ctrl.send_cancel(MSG_NO_ROOM);
            return;
        }
        ctrl.on_equipment_updated(slot, player.inventory.item(slot));
    }

    pub(crate) fn move_item_from_inv_to_pos(
        &mut self,
        id: CreatureId,
        slot: InventorySlot,
        type_id: ItemTypeId,
        count: u16,
        to: Position,
    ) {
        let Some(ctrl) = self.session(id) else {
            return;
        };
        if !self.world.can_see(id, to) {
            ctrl.send_cancel(MSG_NOT_POSSIBLE);
            return;
        }
        if !self.world.can_add_item(to) {
            ctrl.send_cancel(MSG_NO_ROOM);
            return;
        }
        let Some(player) = self.players.get_mut(&id) else {
            return;
        };
        let item = match player.inventory.remove(slot, type_id, count) {
            Ok(item) => item,
            Err(err) => {
                tracing::debug!(%id, error = %err, "item drop rejected");
                ctrl.send_cancel(MSG_NOT_POSSIBLE);
                return;
            }
        };
        if let Err(err) = self.world.add_item(item, to) {
            tracing::error!(%id, error = %err, "checked destination refused an item");
            ctrl.send_cancel(cancel_message(&err));
        }
        ctrl.on_equipment_updated(slot, player.inventory.item(slot));
    }

    pub(crate) fn move_item_from_inv_to_inv(
        &mut self,
        id: CreatureId,
        from: InventorySlot,
        type_id: ItemTypeId,
        count: u16,
        to: InventorySlot,
    ) {
        let Some(ctrl) = self.session(id) else {
            return;
        };
        let Some(player) = self.players.get_mut(&id) else {
            return;
        };
        match player.inventory.move_between(from, to, type_id, count) {
            Ok(()) => {
                ctrl.on_equipment_updated(from, player.inventory.item(from));
                ctrl.on_equipment_updated(to, player.inventory.item(to));
            }
            Err(InventoryError::Occupied(_)) => ctrl.send_cancel(MSG_NO_ROOM),
            Err(err) => {
                tracing::debug!(%id, error = %err, "inventory move rejected");
                ctrl.send_cancel(MSG_NOT_POSSIBLE);
            }
        }
    }

    pub(crate) fn use_inv_item(&mut self, id: CreatureId, type_id: ItemTypeId, slot: InventorySlot) {
        let Some(ctrl) = self.session(id) else {
            return;
        };
        let item = self
            .players
            .get(&id)
            .and_then(|player| player.inventory.item(slot))
            .filter(|item| item.type_id() == type_id);
        match item {
            Some(item) if item.is_usable() => ctrl.on_use_item(item),
            Some(_) => ctrl.send_cancel(MSG_NOT_USABLE),
            None => ctrl.send_cancel(MSG_NOT_POSSIBLE),
        }
    }

    pub(crate) fn use_pos_item(
        &mut self,
        id: CreatureId,
        type_id: ItemTypeId,
        position: Position,
        stack_pos: u8,
    ) {
        let Some(ctrl) = self.session(id) else {
            return;
        };
        if !self.within_reach(id, position) {
            ctrl.send_cancel(MSG_TOO_FAR);
            return;
        }
        let item = self
            .world
            .tile(position)
            .ok()
            .and_then(|tile| tile.item(stack_pos))
            .filter(|item| item.type_id() == type_id);
        match item {
            Some(item) if item.is_usable() => ctrl.on_use_item(item),
            Some(_) => ctrl.send_cancel(MSG_NOT_USABLE),
            None => ctrl.send_cancel(MSG_NOT_POSSIBLE),
        }
    }

    pub(crate) fn look_at(&mut self, id: CreatureId, position: Position) {
        let Some(ctrl) = self.session(id) else {
            return;
        };
        if !self.world.can_see(id, position) {
            return;
        }
        let Some(target) = self.world.tile(position).ok().and_then(Tile::look_target) else {
            return;
        };
        let description = match target {
            Thing::Creature(creature_id) => match self.world.creature(creature_id) {
                Ok(creature) => creature.name.clone(),
                Err(_) => return,
            },
            Thing::Item(item) => item.description(),
        };
        ctrl.send_text(format!("You see {description}."));
    }

    fn session(&self, id: CreatureId) -> Option<Arc<PlayerCtrl>> {
        let ctrl = self.ctrls.get(&id).cloned();
        if ctrl.is_none() {
            tracing::debug!(error = %EngineError::StaleReference(id), "dropping player task");
        }
        ctrl
    }

    fn is_gm(&self, id: CreatureId) -> bool {
        self.players.get(&id).is_some_and(|player| player.is_gm)
    }

    fn find_player(&self, name: &str) -> Option<&Arc<PlayerCtrl>> {
        self.players
            .values()
            .find(|player| player.name.eq_ignore_ascii_case(name))
            .and_then(|player| self.ctrls.get(&player.creature_id()))
    }

    fn step(&mut self, id: CreatureId, direction: Direction, now: Instant, ctrl: &PlayerCtrl) -> bool {
        match self.world.creature_move(id, direction) {
            Ok(()) => {
                let duration = self.step_duration(id, direction);
                if let Some(player) = self.players.get_mut(&id) {
                    player.record_step(now, duration);
                }
                true
            }
            Err(WorldError::InvalidPlacement(_)) => {
                ctrl.send_cancel(MSG_NO_ROOM);
                ctrl.send_cancel_walk(self.facing(id));
                false
            }
            Err(err) => {
                tracing::debug!(%id, error = %err, "move rejected");
                false
            }
        }
    }

    /// How long the step just taken keeps the creature busy, from the ground
    /// it landed on.
    fn step_duration(&self, id: CreatureId, direction: Direction) -> Duration {
        let ground_speed = self
            .world
            .creature_position(id)
            .ok()
            .and_then(|position| self.world.tile(position).ok())
            .map(Tile::ground_speed)
            .unwrap_or(DEFAULT_GROUND_SPEED);
        self.world
            .creature(id)
            .map(|creature| creature.step_duration(ground_speed, direction))
            .unwrap_or_default()
    }

    fn facing(&self, id: CreatureId) -> Direction {
        self.world
            .creature(id)
            .map(|creature| creature.direction)
            .unwrap_or(Direction::South)
    }

    fn within_reach(&self, id: CreatureId, position: Position) -> bool {
        self.world
            .creature_position(id)
            .is_ok_and(|at| at.is_adjacent(position))
    }

    fn schedule(&self, delay: Duration, task: impl FnOnce(&mut GameState) + Send + 'static) {
        let queued = if delay.is_zero() {
            self.tasks.add_task(task)
        } else {
            self.tasks.add_task_after(delay, task)
        };
        if let Err(err) = queued {
            tracing::debug!(error = %err, "follow-up task dropped");
        }
    }
}

fn cancel_message(err: &WorldError) -> &'static str {
    match err {
        WorldError::InvalidPlacement(_) => MSG_NO_ROOM,
        WorldError::ItemNotMovable { .. } => MSG_NOT_MOVABLE,
        _ => MSG_NOT_POSSIBLE,
    }
}
