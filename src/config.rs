use crate::world::position::Position;
use serde::Deserialize;
use std::path::{Path, PathBuf};

const USAGE: &str = "usage: worldserver <data-root> [config.yaml]";
const DEFAULT_CONFIG_FILE: &str = "world.yaml";
const DEFAULT_ITEMS_FILE: &str = "items.yaml";
const DEFAULT_MAP_FILE: &str = "map.yaml";
const DEFAULT_SPAWN: Position = Position::new(1010, 1010, 7);
const DEFAULT_LOGIN_MESSAGE: &str = "Welcome to the world server.";
const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0}")]
    Usage(&'static str),
    #[error("read config {} failed: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("config {}: {source}", .path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("{name}='{value}' is invalid, expected {expected}")]
    InvalidEnv {
        name: &'static str,
        value: String,
        expected: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub root: PathBuf,
    pub items_file: PathBuf,
    pub map_file: PathBuf,
    pub spawn_position: Position,
    pub login_message: String,
    pub gamemasters: Vec<String>,
    pub log_filter: String,
    pub log_to_file: bool,
}

/// Optional overrides read from `world.yaml`.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    items: Option<PathBuf>,
    map: Option<PathBuf>,
    spawn: Option<Position>,
    login_message: Option<String>,
    gamemasters: Option<Vec<String>>,
    log_filter: Option<String>,
    log_to_file: Option<bool>,
}

impl AppConfig {
    pub fn from_args(args: &[String]) -> Result<Self, ConfigError> {
        Self::from_args_with_env(args, |name| std::env::var(name).ok())
    }

    /// Settings come from the config file first, then `WORLDSERVER_*`
    /// variables, then built-in defaults.
    pub fn from_args_with_env(
        args: &[String],
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if args.len() < 2 {
            return Err(ConfigError::Usage(USAGE));
        }
        let root = Path::new(&args[1]).to_path_buf();
        let file = match args.get(2) {
            Some(path) => read_file_config(Path::new(path))?,
            None => {
                let default = root.join(DEFAULT_CONFIG_FILE);
                if default.is_file() {
                    read_file_config(&default)?
                } else {
                    FileConfig::default()
                }
            }
        };
        let env = |name: &str| non_empty(env(name));

        let items_file = file
            .items
            .or_else(|| env("WORLDSERVER_ITEMS").map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_ITEMS_FILE));
        let map_file = file
            .map
            .or_else(|| env("WORLDSERVER_MAP").map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_MAP_FILE));
        let spawn_position = match file.spawn {
            Some(position) => position,
            None => match env("WORLDSERVER_SPAWN") {
                Some(value) => parse_position(&value).ok_or(ConfigError::InvalidEnv {
                    name: "WORLDSERVER_SPAWN",
                    value,
                    expected: "x,y,z",
                })?,
                None => DEFAULT_SPAWN,
            },
        };
        let login_message = file
            .login_message
            .or_else(|| env("WORLDSERVER_LOGIN_MESSAGE"))
            .unwrap_or_else(|| DEFAULT_LOGIN_MESSAGE.to_string());
        let gamemasters = file
            .gamemasters
            .or_else(|| env("WORLDSERVER_GAMEMASTERS").map(|value| parse_list(&value)))
            .unwrap_or_default();
        let log_filter = file
            .log_filter
            .or_else(|| env("WORLDSERVER_LOG"))
            .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());

        Ok(Self {
            items_file: root.join(items_file),
            map_file: root.join(map_file),
            spawn_position,
            login_message,
            gamemasters,
            log_filter,
            log_to_file: file.log_to_file.unwrap_or(false),
            root,
        })
    }

    pub fn log_directory(&self) -> Option<PathBuf> {
        self.log_to_file.then(|| self.root.join("log"))
    }
}

fn read_file_config(path: &Path) -> Result<FileConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_yaml::from_str(&content).map_err(|source| ConfigError::Yaml {
        path: path.to_path_buf(),
        source,
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_position(value: &str) -> Option<Position> {
    let mut parts = value.split(',').map(str::trim);
    let x = parts.next()?.parse().ok()?;
    let y = parts.next()?.parse().ok()?;
    let z = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some(Position::new(x, y, z))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "worldserver-{name}-{}",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).expect("scratch dir");
        dir
    }

    #[test]
    fn requires_a_data_root() {
        assert!(matches!(
            AppConfig::from_args_with_env(&args(&["worldserver"]), no_env),
            Err(ConfigError::Usage(_))
        ));
    }

    #[test]
    fn defaults_resolve_against_the_root() {
        let config =
            AppConfig::from_args_with_env(&args(&["worldserver", "/nonexistent/data"]), no_env)
                .expect("config");
        assert_eq!(config.items_file, PathBuf::from("/nonexistent/data/items.yaml"));
        assert_eq!(config.map_file, PathBuf::from("/nonexistent/data/map.yaml"));
        assert_eq!(config.spawn_position, DEFAULT_SPAWN);
        assert_eq!(config.log_filter, "info");
        assert!(config.gamemasters.is_empty());
        assert_eq!(config.log_directory(), None);
    }

    #[test]
    fn environment_fills_in_missing_values() {
        let vars: HashMap<&str, &str> = [
            ("WORLDSERVER_MAP", " maps/island.yaml "),
            ("WORLDSERVER_SPAWN", "100, 120, 6"),
            ("WORLDSERVER_LOGIN_MESSAGE", "   "),
            ("WORLDSERVER_LOG", "worldserver=debug"),
            ("WORLDSERVER_GAMEMASTERS", "Alice, ,Bob"),
        ]
        .into_iter()
        .collect();
        let config = AppConfig::from_args_with_env(&args(&["worldserver", "/nonexistent/data"]), |name| {
            vars.get(name).map(|value| value.to_string())
        })
        .expect("config");
        assert_eq!(config.map_file, PathBuf::from("/nonexistent/data/maps/island.yaml"));
        assert_eq!(config.spawn_position, Position::new(100, 120, 6));
        assert_eq!(config.login_message, DEFAULT_LOGIN_MESSAGE);
        assert_eq!(config.log_filter, "worldserver=debug");
        assert_eq!(config.gamemasters, vec!["Alice", "Bob"]);
    }

    #[test]
    fn rejects_malformed_spawn_variable() {
        let result = AppConfig::from_args_with_env(&args(&["worldserver", "/nonexistent/data"]), |name| {
            (name == "WORLDSERVER_SPAWN").then(|| "100,120".to_string())
        });
        assert!(matches!(
            result,
            Err(ConfigError::InvalidEnv { name: "WORLDSERVER_SPAWN", .. })
        ));
    }

    #[test]
    fn config_file_wins_over_environment() {
        let dir = scratch_dir("config-file");
        std::fs::write(
            dir.join(DEFAULT_CONFIG_FILE),
            "spawn: { x: 5, y: 6, z: 7 }\nlogin_message: Hello\ngamemasters: [Ops]\nlog_to_file: true\n",
        )
        .expect("write config");
        let root = dir.to_string_lossy().to_string();
        let config = AppConfig::from_args_with_env(&args(&["worldserver", &root]), |name| {
            match name {
                "WORLDSERVER_SPAWN" => Some("1,2,3".to_string()),
                "WORLDSERVER_LOGIN_MESSAGE" => Some("Ignored".to_string()),
                _ => None,
            }
        })
        .expect("config");
        assert_eq!(config.spawn_position, Position::new(5, 6, 7));
        assert_eq!(config.login_message, "Hello");
        assert_eq!(config.gamemasters, vec!["Ops"]);
        assert_eq!(config.log_directory(), Some(dir.join("log")));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn unknown_config_keys_are_errors() {
        let dir = scratch_dir("config-unknown");
        let path = dir.join("custom.yaml");
        std::fs::write(&path, "bind_addr: 0.0.0.0:7172\n").expect("write config");
        let root = dir.to_string_lossy().to_string();
        let file = path.to_string_lossy().to_string();
        assert!(matches!(
            AppConfig::from_args_with_env(&args(&["worldserver", &root, &file]), no_env),
            Err(ConfigError::Yaml { .. })
        ));
        let _ = std::fs::remove_dir_all(&dir);
    }
}
