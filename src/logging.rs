use anyhow::Result;
use log::LevelFilter;
use simple_logger::{set_up_color_terminal, SimpleLogger};

/// Installs the process wide logger. `RUST_LOG` overrides the default level.
pub fn init() -> Result<()> {
    set_up_color_terminal();
    let logger = SimpleLogger::new().with_level(LevelFilter::Info).env();
    logger.init()?;
    Ok(())
}
