use std::io::Write;
use std::str::FromStr;

use chrono::Local;
use env_logger::{Builder, Env};
use log::{LevelFilter, SetLoggerError};

/// Parses a level name, falling back to `Info` for anything unknown.
pub fn level_filter(level: &str) -> LevelFilter {
    LevelFilter::from_str(level).unwrap_or(LevelFilter::Info)
}

fn builder(level: LevelFilter) -> Builder {
    let mut builder = Builder::new();
    builder
        .filter_level(level)
        .parse_env(Env::default())
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] {}: {}",
                Local::now().to_rfc3339(),
                record.level(),
                record.target(),
                record.args()
            )
        });
    builder
}

/// Installs the global logger. `RUST_LOG` overrides `level`.
pub fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
    builder(level).try_init()?;
    log::info!("Logging initialized at {}", log::max_level());
    Ok(())
}
