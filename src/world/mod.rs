pub mod creature_ctrl;
pub mod error;
pub mod item_types;
pub mod map;
pub mod position;
pub mod state;
pub mod tile;
pub mod viewport;
