use std::io;

use eyre::Result;
use tracing_subscriber::EnvFilter;

pub mod cli;
pub mod config;
pub mod fan;
pub mod transport;

mod misc;

pub fn init() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("breeze=info")),
        )
        .with_writer(io::stderr)
        .init();

    Ok(())
}
