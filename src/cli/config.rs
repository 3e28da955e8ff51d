use eyre::Result;

use crate::{config::Config, fan::DeviceProfile, misc::ColourDot};

pub async fn read_and_print(path: &str) -> Result<()> {
    let config = Config::load(path).await?;

    println!("{} device(s) configured", config.devices.len());

    for device in &config.devices {
        let profile = DeviceProfile::from_config(device)?;

        println!(
            "\n{} {}  mode {}  {} steps of {}%",
            ColourDot(profile.power_on.is_some() && profile.power_off.is_some()),
            device.name,
            profile.addressing,
            profile.step_count,
            profile.step_size,
        );

        println!(
            "    swing {}  rotation {}  auto-off {}  auto-on {}",
            ColourDot(profile.show_swing && profile.swing_toggle.is_some()),
            ColourDot(profile.show_rotation_direction && profile.rotate_clockwise.is_some()),
            ColourDot(profile.auto_off_after.is_some()),
            ColourDot(profile.auto_on_after.is_some()),
        );
    }

    Ok(())
}
