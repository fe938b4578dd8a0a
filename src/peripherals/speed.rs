use crate::ble::csc_measurement::{MEASURE_UUID, SERVICE_UUID};
use crate::config::Config;
use crate::error::MonitorError;
use crate::peripherals::device_info;
use crate::session::{MeasurementSink, SessionMachine};
use btleplug::api::{Central, CentralEvent, Peripheral, ScanFilter, ValueNotification};
use futures::stream::{Stream, StreamExt};
use log::{debug, info, warn};
use std::future::Future;
use std::pin::Pin;

type Notifications = Pin<Box<dyn Stream<Item = ValueNotification> + Send>>;

/// Finds the configured sensor, keeps it connected and feeds every
/// notification to `machine` until Ctrl-C.
pub async fn monitor<C: Central, S: MeasurementSink>(
    central: &C,
    config: &Config,
    machine: &mut SessionMachine<S>,
) -> Result<(), MonitorError> {
    let peripheral = match find(central, config).await? {
        Some(p) => p,
        None => return Err(MonitorError::SensorNotFound(describe_target(config))),
    };
    info!("Found sensor {}", peripheral.address());

    // Subscribe to central events first so a drop during setup is still seen
    let mut events = central.events().await?;
    connect(&peripheral, config, machine).await?;
    device_info::read(&peripheral).await.log();
    info!("Wheel circumference: {}mm", config.wheel_circumference_mm);
    let mut notifications = subscribe(&peripheral, machine).await?;
    info!("Waiting for measurements... (move the sensor to see data)");

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        let connection_lost = tokio::select! {
            notification = notifications.next() => match notification {
                Some(n) => {
                    machine.on_notification(n.uuid, &n.value)?;
                    false
                }
                None => {
                    warn!("Notification stream ended");
                    true
                }
            },
            Some(event) = events.next() => match event {
                CentralEvent::DeviceDisconnected(id) if id == peripheral.id() => {
                    !peripheral.is_connected().await?
                }
                _ => false,
            },
            _ = &mut ctrl_c => {
                info!("Stopping...");
                break;
            }
        };

        if connection_lost {
            warn!("Sensor disconnected");
            // Reconnecting can go on forever, so Ctrl-C has to be able to cut it short
            match unless_stopped(reconnect(&peripheral, config, machine), &mut ctrl_c).await {
                Some(reconnected) => notifications = reconnected?,
                None => {
                    info!("Stopping...");
                    break;
                }
            }
        }
    }

    if let Some(c) = measurement_characteristic(&peripheral) {
        if let Err(e) = peripheral.unsubscribe(&c).await {
            debug!("Unsubscribe failed: {}", e);
        }
    }
    if peripheral.is_connected().await.unwrap_or(false) {
        peripheral.disconnect().await?;
        info!("Disconnected");
    }
    machine.on_disconnected();
    Ok(())
}

// None if `stop` finishes before `work` does.
async fn unless_stopped<T, S: Future + Unpin>(
    work: impl Future<Output = T>,
    stop: &mut S,
) -> Option<T> {
    tokio::select! {
        output = work => Some(output),
        _ = stop => None,
    }
}

fn describe_target(config: &Config) -> String {
    match config.device_address {
        Some(address) => address.to_string(),
        None => format!("name {:?}", config.device_name),
    }
}

async fn find<C: Central>(central: &C, config: &Config) -> Result<Option<C::Peripheral>, MonitorError> {
    info!("Scanning for {}", describe_target(config));
    central
        .start_scan(ScanFilter {
            services: vec![SERVICE_UUID],
        })
        .await?;
    tokio::time::sleep(config.scan_duration).await;
    central.stop_scan().await?;

    for peripheral in central.peripherals().await? {
        if is_target(&peripheral, config).await? {
            return Ok(Some(peripheral));
        }
    }
    Ok(None)
}

async fn is_target(p: &impl Peripheral, config: &Config) -> Result<bool, MonitorError> {
    if let Some(address) = config.device_address {
        return Ok(p.address() == address);
    }
    let op = p.properties().await?;
    Ok(match op {
        Some(properties) => properties
            .local_name
            .iter()
            .any(|name| name.contains(&config.device_name)),
        None => false,
    })
}

async fn connect<S: MeasurementSink>(
    peripheral: &impl Peripheral,
    config: &Config,
    machine: &mut SessionMachine<S>,
) -> Result<(), MonitorError> {
    for attempt in 1..=config.connect_attempts {
        machine.on_connecting();
        info!("Connection attempt {}/{}...", attempt, config.connect_attempts);
        match tokio::time::timeout(config.connect_timeout, peripheral.connect()).await {
            Ok(Ok(())) => {
                if peripheral.is_connected().await? {
                    machine.on_connected();
                    peripheral.discover_services().await?;
                    return Ok(());
                }
            }
            Ok(Err(e)) => warn!("Connect failed: {}", e),
            Err(_) => warn!("Timed out after {:?}", config.connect_timeout),
        }
        machine.on_disconnected();
        if attempt < config.connect_attempts {
            tokio::time::sleep(config.retry_delay).await;
        }
    }
    Err(MonitorError::ConnectFailed(config.connect_attempts))
}

fn measurement_characteristic(
    peripheral: &impl Peripheral,
) -> Option<btleplug::api::Characteristic> {
    peripheral
        .characteristics()
        .into_iter()
        .find(|c| c.uuid == MEASURE_UUID)
}

async fn subscribe<S: MeasurementSink>(
    peripheral: &impl Peripheral,
    machine: &mut SessionMachine<S>,
) -> Result<Notifications, MonitorError> {
    let characteristic =
        measurement_characteristic(peripheral).ok_or(MonitorError::NoMeasurementCharacteristic)?;
    // Take the stream before subscribing so that the first notification isn't missed
    let notifications = peripheral.notifications().await?;
    peripheral.subscribe(&characteristic).await?;
    machine.on_subscribed();
    info!("Subscribed to CSC measurement");
    Ok(notifications)
}

// The previous session is gone by the time we get here; the new one starts
// with no sample to diff against.
async fn reconnect<S: MeasurementSink>(
    peripheral: &impl Peripheral,
    config: &Config,
    machine: &mut SessionMachine<S>,
) -> Result<Notifications, MonitorError> {
    machine.on_disconnected();
    loop {
        tokio::time::sleep(config.reconnect_delay).await;
        info!("Attempting sensor reconnect.");
        match connect(peripheral, config, machine).await {
            Ok(()) => {
                info!("Sensor reconnected.");
                return subscribe(peripheral, machine).await;
            }
            Err(MonitorError::ConnectFailed(_)) => info!("Sensor reconnect failed."),
            Err(e) => return Err(e),
        }
    }
}
