use crate::entities::item::ItemTypeId;
use crate::world::position::Position;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminCommand {
    Online,
    Shutdown,
    Teleport { position: Position },
    Where,
    Put { type_id: ItemTypeId, count: u16 },
    Unknown(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("admin command missing name")]
    MissingName,
    #[error("admin command missing {0}")]
    MissingValue(&'static str),
    #[error("admin command expected {expected}, got '{value}'")]
    InvalidValue { expected: &'static str, value: String },
}

/// Parses a `!command` typed in chat. Messages without the prefix are not
/// commands.
pub fn parse_admin_command(message: &str) -> Result<Option<AdminCommand>, CommandError> {
    let trimmed = message.trim();
    match trimmed.strip_prefix('!') {
        Some(command) => parse_command_line(command).map(Some),
        None => Ok(None),
    }
}

/// Parses a line typed on the server console, where the prefix is optional.
pub fn parse_console_command(line: &str) -> Result<AdminCommand, CommandError> {
    let trimmed = line.trim();
    parse_command_line(trimmed.strip_prefix('!').unwrap_or(trimmed))
}

fn parse_command_line(line: &str) -> Result<AdminCommand, CommandError> {
    let mut parts = line.split_whitespace();
    let command = parts.next().ok_or(CommandError::MissingName)?;
    let command = command.to_ascii_lowercase();
    let parsed = match command.as_str() {
        "online" => AdminCommand::Online,
        "shutdown" | "quit" => AdminCommand::Shutdown,
        "teleport" | "tp" => {
            let x = parse_value::<u16>(parts.next(), "x", "u16")?;
            let y = parse_value::<u16>(parts.next(), "y", "u16")?;
            let z = parse_value::<u8>(parts.next(), "z", "u8")?;
            AdminCommand::Teleport {
                position: Position { x, y, z },
            }
        }
        "where" | "pos" => AdminCommand::Where,
        "put" | "item" => {
            let type_id = parse_value::<u16>(parts.next(), "item type", "u16")?;
            let count = match parts.next() {
                Some(value) => parse_value::<u16>(Some(value), "count", "u16")?,
                None => 1,
            };
            AdminCommand::Put {
                type_id: ItemTypeId(type_id),
                count,
            }
        }
        _ => AdminCommand::Unknown(command),
    };
    Ok(parsed)
}

fn parse_value<T: std::str::FromStr>(
    value: Option<&str>,
    name: &'static str,
    expected: &'static str,
) -> Result<T, CommandError> {
    let value = value.ok_or(CommandError::MissingValue(name))?;
    value.parse::<T>().map_err(|_| CommandError::InvalidValue {
        expected,
        value: value.to_string(),
    })
}
