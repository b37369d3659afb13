use crate::engine::error::{EngineError, EngineState};
use crate::engine::game_state::{EngineConfig, GameState, TalkType};
use crate::engine::player_ctrl::{MessageSink, PlayerCtrl};
use crate::engine::task_queue::{TaskHandle, TaskQueue};
use crate::entities::creature::CreatureId;
use crate::entities::inventory::InventorySlot;
use crate::entities::item::ItemTypeId;
use crate::world::item_types::ItemFactory;
use crate::world::position::{Direction, Position};
use crate::world::state::World;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Front door for network threads.
///
/// Every `player_*` method only packages its arguments into a task and
/// enqueues it; the game-logic thread started by [`GameEngine::start`] runs
/// the tasks one at a time against the [`GameState`]. A task that refers to a
/// player who has left in the meantime does nothing.
pub struct GameEngine {
    state: Mutex<EngineState>,
    tasks: TaskHandle<GameState>,
    startup: Mutex<Option<(TaskQueue<GameState>, GameState)>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl GameEngine {
    pub fn new(world: World, items: Arc<dyn ItemFactory>, config: EngineConfig) -> Self {
        let queue = TaskQueue::new();
        let tasks = queue.handle();
        let game = GameState::new(world, items, config, queue.handle());
        Self {
            state: Mutex::new(EngineState::Initialized),
            tasks,
            startup: Mutex::new(Some((queue, game))),
            worker: Mutex::new(None),
        }
    }

    pub fn state(&self) -> EngineState {
        *lock(&self.state)
    }

    /// Starts the game-logic thread.
    pub fn start(&self) -> Result<(), EngineError> {
        self.transition(EngineState::Initialized, EngineState::Running)?;
        let Some((queue, mut game)) = lock(&self.startup).take() else {
            return Err(EngineError::InvalidStateTransition {
                from: EngineState::Initialized,
                to: EngineState::Running,
            });
        };
        let worker = std::thread::Builder::new()
            .name("game-logic".to_string())
            .spawn(move || {
                queue.run(&mut game);
                tracing::info!("game logic thread finished");
            })
            .map_err(|err| EngineError::Spawn(err.to_string()))?;
        *lock(&self.worker) = Some(worker);
        tracing::info!("game engine running");
        Ok(())
    }

    /// Rejects new intents, lets the logic thread finish everything already
    /// queued, and waits for it. Must not be called from a task.
    pub fn stop(&self) -> Result<(), EngineError> {
        self.transition(EngineState::Running, EngineState::Closing)?;
        if let Err(err) = self.tasks.close() {
            tracing::warn!(error = %err, "task queue already closed");
        }
        if let Some(worker) = lock(&self.worker).take() {
            if worker.join().is_err() {
                tracing::error!("game logic thread panicked");
            }
        }
        *lock(&self.state) = EngineState::Closed;
        tracing::info!("game engine closed");
        Ok(())
    }

    /// Allocates the creature id right away; the player enters the world when
    /// the queued spawn runs.
    pub fn player_spawn(
        &self,
        name: impl Into<String>,
        sink: MessageSink,
    ) -> Result<CreatureId, EngineError> {
        let id = CreatureId::next();
        let name = name.into();
        let ctrl = Arc::new(PlayerCtrl::new(id, sink));
        self.post(move |game| game.spawn(id, name, ctrl))?;
        Ok(id)
    }

    pub fn player_despawn(&self, id: CreatureId) -> Result<(), EngineError> {
        self.post(move |game| game.despawn(id))
    }

    pub fn player_move(&self, id: CreatureId, direction: Direction) -> Result<(), EngineError> {
        self.post(move |game| game.move_creature(id, direction))
    }

    pub fn player_move_path(&self, id: CreatureId, path: Vec<Direction>) -> Result<(), EngineError> {
        self.post(move |game| game.move_path(id, path))
    }

    pub fn player_cancel_move(&self, id: CreatureId) -> Result<(), EngineError> {
        self.post(move |game| game.cancel_move(id))
    }

    pub fn player_turn(&self, id: CreatureId, direction: Direction) -> Result<(), EngineError> {
        self.post(move |game| game.turn(id, direction))
    }

    pub fn player_say(
        &self,
        id: CreatureId,
        talk_type: TalkType,
        receiver: String,
        channel_id: u16,
        message: String,
    ) -> Result<(), EngineError> {
        self.post(move |game| game.say(id, talk_type, &receiver, channel_id, &message))
    }

    pub fn player_move_item_from_pos_to_pos(
        &self,
        id: CreatureId,
        from: Position,
        stack_pos: u8,
        type_id: ItemTypeId,
        count: u16,
        to: Position,
    ) -> Result<(), EngineError> {
        self.post(move |game| game.move_item_from_pos_to_pos(id, from, stack_pos, type_id, count, to))
    }

    pub fn player_move_item_from_pos_to_inv(
        &self,
        id: CreatureId,
        from: Position,
        stack_pos: u8,
        type_id: ItemTypeId,
        count: u16,
        slot: InventorySlot,
    ) -> Result<(), EngineError> {
        self.post(move |game| game.move_item_from_pos_to_inv(id, from, stack_pos, type_id, count, slot))
    }

    pub fn player_move_item_from_inv_to_pos(
        &self,
        id: CreatureId,
        slot: InventorySlot,
        type_id: ItemTypeId,
        count: u16,
        to: Position,
    ) -> Result<(), EngineError> {
        self.post(move |game| game.move_item_from_inv_to_pos(id, slot, type_id, count, to))
    }

    pub fn player_move_item_from_inv_to_inv(
        &self,
        id: CreatureId,
        from: InventorySlot,
        type_id: ItemTypeId,
        count: u16,
        to: InventorySlot,
    ) -> Result<(), EngineError> {
        self.post(move |game| game.move_item_from_inv_to_inv(id, from, type_id, count, to))
    }

    pub fn player_use_inv_item(
        &self,
        id: CreatureId,
        type_id: ItemTypeId,
        slot: InventorySlot,
    ) -> Result<(), EngineError> {
        self.post(move |game| game.use_inv_item(id, type_id, slot))
    }

    pub fn player_use_pos_item(
        &self,
        id: CreatureId,
        type_id: ItemTypeId,
        position: Position,
        stack_pos: u8,
    ) -> Result<(), EngineError> {
        self.post(move |game| game.use_pos_item(id, type_id, position, stack_pos))
    }

    pub fn player_look_at(&self, id: CreatureId, position: Position) -> Result<(), EngineError> {
        self.post(move |game| game.look_at(id, position))
    }

    /// Names of everyone logged in, read on the logic thread. Blocks until
    /// every task queued before the call has run.
    pub fn online_players(&self) -> Result<Vec<String>, EngineError> {
        let (reply, answer) = crossbeam_channel::bounded(1);
        self.post(move |game| {
            let _ = reply.send(game.online_players());
        })?;
        answer.recv().map_err(|_| EngineError::NotRunning)
    }

    fn post(&self, task: impl FnOnce(&mut GameState) + Send + 'static) -> Result<(), EngineError> {
        if self.state() != EngineState::Running {
            return Err(EngineError::NotRunning);
        }
        self.tasks.add_task(task)?;
        Ok(())
    }

    fn transition(&self, from: EngineState, to: EngineState) -> Result<(), EngineError> {
        let mut state = lock(&self.state);
        if *state != from {
            return Err(EngineError::InvalidStateTransition { from: *state, to });
        }
        *state = to;
        Ok(())
    }
}

impl Drop for GameEngine {
    fn drop(&mut self) {
        if self.state() == EngineState::Running {
            if let Err(err) = self.stop() {
                tracing::error!(error = %err, "failed to stop game engine");
            }
        }
    }
}
