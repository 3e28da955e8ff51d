use eyre::{Result, eyre};

use crate::{config::Config, fan::Controller};

use super::SendAction;

pub async fn issue(config_path: &str, device: &str, action: SendAction) -> Result<()> {
    let config = Config::load(config_path).await?;

    let device_config = config
        .devices
        .iter()
        .find(|candidate| candidate.name == device)
        .ok_or_else(|| eyre!("Device {device} not found in {config_path}"))?;

    let controller = Controller::from_config(device_config).await?;

    let outcome = match action {
        SendAction::Power { on } => controller.set_power(on).await?,
        SendAction::Speed { percent } => controller.set_speed(percent).await?,
        SendAction::Swing { on } => controller.set_swing(on).await?,
        SendAction::Direction { direction } => controller.set_direction(direction.into()).await?,
    };

    println!("{outcome}");

    Ok(())
}
