pub mod error;
pub mod game_engine;
pub mod game_state;
pub mod player_ctrl;
pub mod task_queue;
