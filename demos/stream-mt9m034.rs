use std::env;
use std::path::Path;
use std::thread::sleep;
use std::time::Duration;

use anyhow::{anyhow, Context};
use aptina_sensors::mt9m0xx::{Mt9m034Driver, DEFAULT_ADDRESS};
use aptina_sensors::{ControlId, NoPlatform, PlatformData, Subdevice};
use linux_embedded_hal::{Delay, I2cdev};

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args: Vec<String> = env::args().collect();
    if args.len() < 4 || args.len() > 6 {
        return Err(anyhow!(
            "Three arguments required: <I2C bus> <width> <height> [exposure] [seconds]"
        ));
    }
    let bus_path = Path::new(&args[1]);
    let bus = I2cdev::new(bus_path).with_context(|| format!("opening {}", args[1]))?;
    let width: u32 = args[2].parse()?;
    let height: u32 = args[3].parse()?;
    let exposure: Option<i32> = args.get(4).map(|arg| arg.parse()).transpose()?;
    let seconds: u64 = args.get(5).map(|arg| arg.parse()).transpose()?.unwrap_or(5);

    let mut sensor = Mt9m034Driver::new_with_address(
        bus,
        Delay,
        NoPlatform,
        PlatformData::default(),
        DEFAULT_ADDRESS,
    );
    sensor.registered()?;
    sensor.set_power(true)?;
    if let Some(exposure) = exposure {
        let applied = sensor.set_control(ControlId::Exposure, exposure)?;
        log::info!("Exposure set to {} lines", applied);
    }
    let size = sensor.set_frame_size(width, height)?;
    log::info!("Streaming {}x{} for {}s", size.width, size.height, seconds);
    sensor.set_stream(true)?;
    sleep(Duration::from_secs(seconds));
    println!(
        "Streamed {}x{}, crop {:?}",
        size.width,
        size.height,
        sensor.get_crop(aptina_sensors::FormatWhich::Active)
    );
    sensor.shutdown()?;
    Ok(())
}
