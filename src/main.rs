use btleplug::api::Manager as _;
use btleplug::platform::Manager;
use csc_monitor::config::Config;
use csc_monitor::display::LogDisplay;
use csc_monitor::peripherals;
use csc_monitor::session::SessionMachine;
use log::info;
use std::error::Error;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_env()?;

    info!("Getting Manager...");
    let manager = Manager::new().await?;
    let central = manager
        .adapters()
        .await?
        .into_iter()
        .next()
        .ok_or("no Bluetooth adapter found")?;

    let mut machine = SessionMachine::new(config.wheel_circumference_mm, LogDisplay::default());
    let result = peripherals::speed::monitor(&central, &config, &mut machine).await;
    info!(
        "Dropped {} malformed notifications",
        machine.sink().dropped_frames()
    );
    result.map_err(|e| e.into())
}
