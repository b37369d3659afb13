use crate::entities::creature::CreatureId;
use crate::entities::inventory::Inventory;
use crate::world::position::Direction;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Engine-side state of a logged-in player. The creature itself lives in the
/// world; this holds what only the game logic needs.
#[derive(Debug, Clone)]
pub struct Player {
    creature_id: CreatureId,
    pub name: String,
    pub inventory: Inventory,
    /// Gamemasters may run `!` commands from chat.
    pub is_gm: bool,
    autowalk_steps: VecDeque<Direction>,
    walk_generation: u64,
    manual_walk: bool,
    cancel_requested: bool,
    next_walk_at: Instant,
}

impl Player {
    pub fn new(creature_id: CreatureId, name: impl Into<String>) -> Self {
        Self {
            creature_id,
            name: name.into(),
            inventory: Inventory::default(),
            is_gm: false,
            autowalk_steps: VecDeque::new(),
            walk_generation: 0,
            manual_walk: false,
            cancel_requested: false,
            next_walk_at: Instant::now(),
        }
    }

    pub fn creature_id(&self) -> CreatureId {
        self.creature_id
    }

    /// Replaces any queued path and returns the generation its steps must carry.
    pub fn start_path(&mut self, path: impl IntoIterator<Item = Direction>) -> u64 {
        self.walk_generation += 1;
        self.manual_walk = false;
        self.cancel_requested = false;
        self.autowalk_steps = path.into_iter().collect();
        self.walk_generation
    }

    /// Queues a manual step that arrived while the player was still busy.
    /// Returns the generation of a newly started walk whose first step must be
    /// scheduled, or `None` when the step joined manual steps already queued.
    /// A pending auto-walk path is replaced.
    pub fn queue_step(&mut self, direction: Direction) -> Option<u64> {
        if self.manual_walk && !self.cancel_requested && !self.autowalk_steps.is_empty() {
            self.autowalk_steps.push_back(direction);
            return None;
        }
        let generation = self.start_path([direction]);
        self.manual_walk = true;
        Some(generation)
    }

    /// Next step of the path started as `generation`, or `None` once the path
    /// is finished, cancelled or superseded.
    pub fn next_path_step(&mut self, generation: u64) -> Option<Direction> {
        if !self.is_current_path(generation) {
            return None;
        }
        self.autowalk_steps.pop_front()
    }

    /// Whether steps tagged with `generation` may still run.
    pub fn is_current_path(&self, generation: u64) -> bool {
        !self.cancel_requested && generation == self.walk_generation
    }

    pub fn queued_steps(&self) -> usize {
        self.autowalk_steps.len()
    }

    /// Drops the current path without flagging a cancel, e.g. when the player
    /// takes a manual step.
    pub fn stop_path(&mut self) {
        self.walk_generation += 1;
        self.autowalk_steps.clear();
    }

    pub fn cancel_walk(&mut self) {
        self.cancel_requested = true;
        self.stop_path();
    }

    pub fn is_walk_cancelled(&self) -> bool {
        self.cancel_requested
    }

    /// Time left before the player may step again.
    pub fn walk_delay(&self, now: Instant) -> Option<Duration> {
        self.next_walk_at
            .checked_duration_since(now)
            .filter(|delay| !delay.is_zero())
    }

    pub fn record_step(&mut self, now: Instant, step: Duration) {
        self.next_walk_at = now + step;
    }
}
