pub mod device_info;
pub mod speed;
