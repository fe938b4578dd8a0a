pub mod csc_feature;
pub mod csc_measurement;
pub mod field_reader;
pub mod revolution_data;
pub mod speed;
