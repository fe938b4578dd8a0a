use crate::ble::csc_feature::{parse_csc_feature, CscFeature};
use crate::ble::csc_measurement::FEATURE_UUID;
use btleplug::api::{bleuuid::uuid_from_u16, Peripheral};
use log::{debug, info};
use uuid::Uuid;

const DEVICE_NAME_UUID: Uuid = uuid_from_u16(0x2A00);
const MANUFACTURER_UUID: Uuid = uuid_from_u16(0x2A29);
const MODEL_NUMBER_UUID: Uuid = uuid_from_u16(0x2A24);
const SERIAL_NUMBER_UUID: Uuid = uuid_from_u16(0x2A25);
const FIRMWARE_UUID: Uuid = uuid_from_u16(0x2A26);
const HARDWARE_UUID: Uuid = uuid_from_u16(0x2A27);
const SOFTWARE_UUID: Uuid = uuid_from_u16(0x2A28);
const BATTERY_LEVEL_UUID: Uuid = uuid_from_u16(0x2A19);

// Everything here is optional: plenty of sensors skip some of these, and
// none of it is needed to decode measurements.
#[derive(Debug, Default, PartialEq, Clone)]
pub struct DeviceInformation {
    pub name: Option<String>,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub serial_number: Option<String>,
    pub firmware: Option<String>,
    pub hardware: Option<String>,
    pub software: Option<String>,
    pub battery_percent: Option<u8>,
    pub feature: Option<CscFeature>,
}

impl DeviceInformation {
    pub fn log(&self) {
        let fields = [
            ("Device Name", &self.name),
            ("Manufacturer", &self.manufacturer),
            ("Model", &self.model),
            ("Serial Number", &self.serial_number),
            ("Firmware", &self.firmware),
            ("Software", &self.software),
            ("Hardware", &self.hardware),
        ];
        for (label, value) in fields.iter() {
            if let Some(value) = value {
                info!("{:<14} {}", format!("{}:", label), value);
            }
        }
        if let Some(battery) = self.battery_percent {
            info!("{:<14} {}%", "Battery Level:", battery);
        }
        if let Some(feature) = &self.feature {
            info!(
                "Wheel revolution data: {}, crank revolution data: {}",
                yes_no(feature.wheel_revolution_data),
                yes_no(feature.crank_revolution_data)
            );
        }
    }
}

fn yes_no(b: bool) -> &'static str {
    if b {
        "Yes"
    } else {
        "No"
    }
}

pub async fn read(peripheral: &impl Peripheral) -> DeviceInformation {
    DeviceInformation {
        name: read_char(peripheral, DEVICE_NAME_UUID).await.map(|v| decode_string(&v)),
        manufacturer: read_char(peripheral, MANUFACTURER_UUID).await.map(|v| decode_string(&v)),
        model: read_char(peripheral, MODEL_NUMBER_UUID).await.map(|v| decode_string(&v)),
        serial_number: read_char(peripheral, SERIAL_NUMBER_UUID).await.map(|v| decode_string(&v)),
        firmware: read_char(peripheral, FIRMWARE_UUID).await.map(|v| decode_string(&v)),
        hardware: read_char(peripheral, HARDWARE_UUID).await.map(|v| decode_string(&v)),
        software: read_char(peripheral, SOFTWARE_UUID).await.map(|v| decode_string(&v)),
        battery_percent: read_char(peripheral, BATTERY_LEVEL_UUID)
            .await
            .and_then(|v| v.first().copied()),
        feature: read_char(peripheral, FEATURE_UUID)
            .await
            .and_then(|v| match parse_csc_feature(&v) {
                Ok(feature) => Some(feature),
                Err(e) => {
                    debug!("Ignoring CSC feature value {:02X?}: {}", v, e);
                    None
                }
            }),
    }
}

async fn read_char(peripheral: &impl Peripheral, uuid: Uuid) -> Option<Vec<u8>> {
    let characteristic = peripheral
        .characteristics()
        .into_iter()
        .find(|c| c.uuid == uuid)?;
    match peripheral.read(&characteristic).await {
        Ok(value) => Some(value),
        Err(e) => {
            debug!("Could not read {}: {}", uuid, e);
            None
        }
    }
}

// GATT strings are UTF-8 but some devices pad them with NULs.
fn decode_string(value: &[u8]) -> String {
    String::from_utf8_lossy(value)
        .trim_end_matches('\0')
        .trim()
        .to_string()
}
