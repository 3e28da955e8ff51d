use eyre::{Result, ensure};
use futures::future::try_join_all;
use tokio::signal;

use crate::{config::Config, fan::Controller};

pub async fn launch(config_path: &str) -> Result<()> {
    let config = Config::load(config_path).await?;

    ensure!(!config.devices.is_empty(), "No devices configured");

    let controllers = try_join_all(config.devices.iter().map(Controller::from_config)).await?;

    for controller in &controllers {
        controller.arm_timers().await;
        tracing::info!(device = controller.name(), "controller ready");
    }

    tracing::info!("Supervising {} device(s), ctrl-c to exit", controllers.len());

    signal::ctrl_c().await?;

    tracing::info!("Shutting down");

    Ok(())
}
