use crate::ble::csc_measurement::{parse_csc_measurement, CscMeasurement, MEASURE_UUID};
use crate::ble::revolution_data::{crank_delta, wheel_delta, CrankSample, WheelSample};
use crate::ble::speed::{cadence_rpm, speed_kmh};
use crate::error::{DecodeError, InvariantViolation};
use chrono::{DateTime, Local};
use log::{debug, error, info};
use uuid::Uuid;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Connected { subscribed: bool },
}

/// A decoded notification together with the rates derived from it.
#[derive(Debug, PartialEq, Clone)]
pub struct Measurement {
    pub event: CscMeasurement,
    // The most recent speed, which may be carried over from an earlier frame
    pub speed_kmh: f64,
    // Whether this frame produced a new speed
    pub speed_updated: bool,
    pub cadence_rpm: Option<f64>,
    pub timestamp: DateTime<Local>,
}

/// Where measurements (and dropped frames) go.
pub trait MeasurementSink {
    fn on_measurement(&mut self, measurement: &Measurement);

    fn on_decode_error(&mut self, _error: &DecodeError) {}
}

// Everything we know about one connection. Built fresh on every connect and
// dropped on disconnect, so nothing carries over between connections.
#[derive(Debug, Clone)]
pub struct SensorSession {
    wheel_circumference_mm: u32,
    subscribed: bool,
    previous_wheel: Option<WheelSample>,
    previous_crank: Option<CrankSample>,
    current_speed_kmh: f64,
    current_cadence_rpm: Option<f64>,
}

impl SensorSession {
    pub fn new(wheel_circumference_mm: u32) -> SensorSession {
        SensorSession {
            wheel_circumference_mm,
            subscribed: false,
            previous_wheel: None,
            previous_crank: None,
            current_speed_kmh: 0.0,
            current_cadence_rpm: None,
        }
    }

    pub fn previous_wheel(&self) -> Option<&WheelSample> {
        self.previous_wheel.as_ref()
    }

    pub fn current_speed_kmh(&self) -> f64 {
        self.current_speed_kmh
    }

    pub fn current_cadence_rpm(&self) -> Option<f64> {
        self.current_cadence_rpm
    }

    // Returns whether the speed changed. The sample always replaces the
    // previous one, even when it is too stale to produce a speed.
    fn apply_wheel(&mut self, sample: WheelSample) -> Result<bool, InvariantViolation> {
        let updated = match self.previous_wheel {
            Some(previous) => {
                let delta = wheel_delta(&previous, &sample)?;
                match speed_kmh(&delta, self.wheel_circumference_mm) {
                    Some(speed) => {
                        self.current_speed_kmh = speed;
                        true
                    }
                    None => false,
                }
            }
            None => false,
        };
        self.previous_wheel = Some(sample);
        Ok(updated)
    }

    fn apply_crank(&mut self, sample: CrankSample) -> Result<(), InvariantViolation> {
        if let Some(previous) = self.previous_crank {
            let delta = crank_delta(&previous, &sample)?;
            if let Some(rpm) = cadence_rpm(&delta) {
                self.current_cadence_rpm = Some(rpm);
            }
        }
        self.previous_crank = Some(sample);
        Ok(())
    }

    pub fn apply(&mut self, event: &CscMeasurement) -> Result<bool, InvariantViolation> {
        // Check both deltas before touching any state, so a failure leaves the
        // session exactly as it was.
        if let (Some(previous), Some(current)) = (self.previous_wheel, event.wheel) {
            wheel_delta(&previous, &current)?;
        }
        if let (Some(previous), Some(current)) = (self.previous_crank, event.crank) {
            crank_delta(&previous, &current)?;
        }

        let speed_updated = match event.wheel {
            Some(sample) => self.apply_wheel(sample)?,
            None => false,
        };
        if let Some(sample) = event.crank {
            self.apply_crank(sample)?;
        }
        Ok(speed_updated)
    }
}

/// Drives a [`SensorSession`] from the transport's lifecycle signals and
/// notifications. Calls for one sensor must be serialized, but may come from
/// any thread.
pub struct SessionMachine<S> {
    wheel_circumference_mm: u32,
    state: State,
    sink: S,
}

enum State {
    Disconnected,
    Connecting,
    Connected(SensorSession),
}

impl<S: MeasurementSink> SessionMachine<S> {
    pub fn new(wheel_circumference_mm: u32, sink: S) -> SessionMachine<S> {
        SessionMachine {
            wheel_circumference_mm,
            state: State::Disconnected,
            sink,
        }
    }

    pub fn state(&self) -> SessionState {
        match &self.state {
            State::Disconnected => SessionState::Disconnected,
            State::Connecting => SessionState::Connecting,
            State::Connected(session) => SessionState::Connected {
                subscribed: session.subscribed,
            },
        }
    }

    pub fn session(&self) -> Option<&SensorSession> {
        match &self.state {
            State::Connected(session) => Some(session),
            _ => None,
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn on_connecting(&mut self) {
        debug!("Sensor connecting");
        self.state = State::Connecting;
    }

    pub fn on_connected(&mut self) {
        info!("Sensor connected, starting a new session");
        self.state = State::Connected(SensorSession::new(self.wheel_circumference_mm));
    }

    pub fn on_subscribed(&mut self) {
        match &mut self.state {
            State::Connected(session) => session.subscribed = true,
            _ => debug!("Ignoring subscription while not connected"),
        }
    }

    pub fn on_disconnected(&mut self) {
        if let State::Connected(_) = self.state {
            info!("Sensor disconnected, discarding session");
        }
        self.state = State::Disconnected;
    }

    // A broken invariant means the derived numbers can't be trusted any more,
    // so the session goes away along with them.
    fn end_session(&mut self, violation: InvariantViolation) -> InvariantViolation {
        error!("Ending session: {}", violation);
        self.state = State::Disconnected;
        violation
    }

    /// Handles one raw notification. Malformed frames are reported to the sink
    /// and otherwise ignored; only an arithmetic invariant violation is an
    /// error, and it ends the session.
    pub fn on_notification(
        &mut self,
        characteristic: Uuid,
        data: &[u8],
    ) -> Result<Option<Measurement>, InvariantViolation> {
        if characteristic != MEASURE_UUID {
            return Ok(None);
        }
        let session = match &mut self.state {
            State::Connected(session) if session.subscribed => session,
            _ => {
                debug!("Dropping notification received outside a subscribed session");
                return Ok(None);
            }
        };

        let event = match parse_csc_measurement(data) {
            Ok(event) => event,
            Err(e) => {
                debug!("Could not decode {:02X?}: {}", data, e);
                self.sink.on_decode_error(&e);
                return Ok(None);
            }
        };
        if event.is_empty() {
            return Ok(None);
        }

        let speed_updated = match session.apply(&event) {
            Ok(updated) => updated,
            Err(e) => return Err(self.end_session(e)),
        };

        let measurement = Measurement {
            event,
            speed_kmh: session.current_speed_kmh,
            speed_updated,
            cadence_rpm: session.current_cadence_rpm,
            timestamp: Local::now(),
        };
        self.sink.on_measurement(&measurement);
        Ok(Some(measurement))
    }
}
