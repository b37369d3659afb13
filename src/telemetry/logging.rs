use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// `EnvFilter` directives, e.g. `info` or `worldserver::engine=debug`.
    pub filter: String,
    /// Also append to `<directory>/game.log` when set.
    pub directory: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            directory: None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("log directory create failed: {0}")]
    CreateDir(#[source] std::io::Error),
    #[error("open log {} failed: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid log filter '{filter}': {message}")]
    Filter { filter: String, message: String },
    #[error("log system already initialized")]
    AlreadyInitialized,
}

static INITIALIZED: OnceLock<()> = OnceLock::new();

const GAME_LOG: &str = "game.log";
const HEADER_LINE: &str = "-------------------------------------------------------------------------------";
const HEADER_TITLE: &str = "worldserver - simulation core";

/// Installs the global subscriber. Later calls are no-ops.
pub fn init(config: &LogConfig) -> Result<(), LogError> {
    if INITIALIZED.get().is_some() {
        return Ok(());
    }
    let filter = parse_filter(&config.filter)?;
    let file_layer = match &config.directory {
        Some(directory) => Some(
            fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(open_game_log(directory)?)),
        ),
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(file_layer)
        .try_init()
        .map_err(|_| LogError::AlreadyInitialized)?;
    let _ = INITIALIZED.set(());
    Ok(())
}

fn parse_filter(filter: &str) -> Result<EnvFilter, LogError> {
    EnvFilter::try_new(filter).map_err(|err| LogError::Filter {
        filter: filter.to_string(),
        message: err.to_string(),
    })
}

/// Opens `game.log` for appending, writing the banner into a fresh file.
fn open_game_log(directory: &Path) -> Result<File, LogError> {
    std::fs::create_dir_all(directory).map_err(LogError::CreateDir)?;
    let path = directory.join(GAME_LOG);
    let open_error = |source| LogError::Open {
        path: path.clone(),
        source,
    };
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(open_error)?;
    if file.metadata().map(|meta| meta.len()).unwrap_or(0) == 0 {
        write_header(&mut file).map_err(open_error)?;
    }
    Ok(file)
}

fn write_header(file: &mut File) -> std::io::Result<()> {
    let started = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0);
    writeln!(file, "{HEADER_LINE}")?;
    writeln!(file, "{HEADER_TITLE}")?;
    writeln!(file, "{GAME_LOG} - started at unix time {started}")?;
    file.flush()
}
