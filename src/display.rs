use crate::error::DecodeError;
use crate::session::{Measurement, MeasurementSink};
use log::{info, warn};

/// Writes each measurement as one log line.
#[derive(Debug, Default)]
pub struct LogDisplay {
    dropped_frames: u64,
}

impl LogDisplay {
    pub fn dropped_frames(&self) -> u64 {
        self.dropped_frames
    }
}

impl MeasurementSink for LogDisplay {
    fn on_measurement(&mut self, measurement: &Measurement) {
        info!("{}", format_measurement(measurement));
    }

    fn on_decode_error(&mut self, error: &DecodeError) {
        self.dropped_frames += 1;
        warn!(
            "Dropped malformed CSC notification ({} so far): {}",
            self.dropped_frames, error
        );
    }
}

pub fn format_measurement(measurement: &Measurement) -> String {
    let mut line = format!("[{}]", measurement.timestamp.format("%H:%M:%S"));
    if let Some(wheel) = &measurement.event.wheel {
        line.push_str(&format!(
            " Speed: {:6.2} km/h | Wheel Revs: {:8} | Time: {:5}",
            measurement.speed_kmh, wheel.cumulative_revolutions, wheel.event_time
        ));
    }
    if let Some(crank) = &measurement.event.crank {
        line.push_str(&format!(" | Crank Revs: {:5}", crank.cumulative_revolutions));
        if let Some(rpm) = measurement.cadence_rpm {
            line.push_str(&format!(" | Cadence: {:5.1} rpm", rpm));
        }
    }
    line
}
