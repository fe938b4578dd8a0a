pub mod ble;
pub mod config;
pub mod display;
pub mod error;
pub mod peripherals;
pub mod session;
