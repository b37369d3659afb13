use crate::engine::task_queue::TaskQueueError;
use crate::entities::creature::CreatureId;
use crate::world::error::WorldError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("cannot go from {from:?} to {to:?}")]
    InvalidStateTransition {
        from: EngineState,
        to: EngineState,
    },
    #[error("engine is not running")]
    NotRunning,
    #[error("creature {0} is no longer in the game")]
    StaleReference(CreatureId),
    #[error("world rejected the action: {0}")]
    World(#[from] WorldError),
    #[error("failed to start game thread: {0}")]
    Spawn(String),
}

impl From<TaskQueueError> for EngineError {
    fn from(_: TaskQueueError) -> Self {
        EngineError::NotRunning
    }
}

/// Lifecycle of a [`GameEngine`](crate::engine::game_engine::GameEngine).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Initialized,
    Running,
    Closing,
    Closed,
}
