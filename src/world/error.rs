use crate::entities::creature::CreatureId;
use crate::entities::item::ItemTypeId;
use crate::world::position::Position;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorldError {
    #[error("creature {0} not found")]
    CreatureNotFound(CreatureId),
    #[error("creature {0} is already in the world")]
    DuplicateCreature(CreatureId),
    #[error("position {0} is outside the map")]
    OutOfBounds(Position),
    #[error("no tile at {0}")]
    TileNotFound(Position),
    #[error("cannot place anything at {0}")]
    InvalidPlacement(Position),
    #[error("no item of type {type_id} at {position} stack position {stack_pos}")]
    ItemNotFound {
        position: Position,
        stack_pos: u8,
        type_id: ItemTypeId,
    },
    #[error("item at {position} stack position {stack_pos} cannot be moved")]
    ItemNotMovable { position: Position, stack_pos: u8 },
    #[error("invalid item count {0}")]
    InvalidCount(u16),
}

/// Startup data failures. Any of these keeps the server from running.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("{}: invalid yaml: {source}", .path.display())]
    YamlFile {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("unknown item type {0}")]
    UnknownItem(ItemTypeId),
    #[error("{0}")]
    Invalid(String),
    #[error("{}: {message}", .path.display())]
    InFile { path: PathBuf, message: String },
}

impl LoadError {
    /// Attaches the file being loaded to errors raised while parsing its content.
    pub fn with_path(self, path: &Path) -> Self {
        let path = path.to_path_buf();
        match self {
            LoadError::Yaml(source) => LoadError::YamlFile { path, source },
            LoadError::UnknownItem(id) => LoadError::InFile {
                path,
                message: format!("unknown item type {id}"),
            },
            LoadError::Invalid(message) => LoadError::InFile { path, message },
            other => other,
        }
    }
}
