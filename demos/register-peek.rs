use std::env;
use std::path::Path;

use anyhow::anyhow;
use aptina_sensors::bus::Width;
use aptina_sensors::debug::RegisterWindow;
use aptina_sensors::{ap0100, mt9d131, mt9m0xx, mt9p006, NoPlatform, PlatformData};
use aptina_sensors::{RegisterDebug, Subdevice};
use linux_embedded_hal::{Delay, I2cdev};

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args: Vec<String> = env::args().collect();
    if args.len() < 4 || args.len() > 5 {
        return Err(anyhow!(
            "Three arguments required: [mt9m034|mt9p006|mt9d131|ap0100] <I2C bus> <register> [value]"
        ));
    }
    let bus = I2cdev::new(Path::new(&args[2]))?;
    let register = &args[3];
    let value = args.get(4).map(String::as_str);
    let platform = PlatformData::default();
    match args[1].as_ref() {
        "mt9m034" => {
            let sensor = mt9m0xx::Mt9m034Driver::new(bus, Delay, NoPlatform, platform);
            peek(sensor, Width::Word, register, value)
        }
        "mt9p006" => {
            let sensor = mt9p006::Mt9p006::new(bus, Delay, NoPlatform, platform)?;
            peek(sensor, Width::Word, register, value)
        }
        "mt9d131" => {
            let sensor = mt9d131::Mt9d131::new(bus, Delay, NoPlatform, platform);
            peek(sensor, Width::Word, register, value)
        }
        "ap0100" => {
            let sensor = ap0100::Ap0100::new(bus, Delay, NoPlatform);
            peek(sensor, Width::Word, register, value)
        }
        _ => Err(anyhow!(
            "The first argument must be one of mt9m034, mt9p006, mt9d131 or ap0100"
        )),
    }
}

/// Power the sensor up, read (or write, then read back) one register, and power down again.
fn peek<S, E>(mut sensor: S, width: Width, register: &str, value: Option<&str>) -> anyhow::Result<()>
where
    S: Subdevice<Error = E> + RegisterDebug<Error = E>,
    E: std::error::Error + Send + Sync + 'static,
{
    let mut window = RegisterWindow::new(width);
    window.store_address(register)?;
    sensor.set_power(true)?;
    if let Some(value) = value {
        window.store_value(&mut sensor, value)?;
    }
    let mut shown = String::new();
    window.show_value(&mut sensor, &mut shown)?;
    sensor.set_power(false)?;
    print!("0x{:04x}: {}", window.address(), shown);
    Ok(())
}
