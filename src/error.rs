use thiserror::Error;

/// Why a single notification could not be decoded. These are per-frame and
/// never end a session: the frame is dropped and the stream carries on.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum DecodeError {
    #[error("empty notification")]
    EmptyBuffer,
    #[error("{width} byte field at offset {offset} overruns a {len} byte buffer")]
    TruncatedBuffer {
        offset: usize,
        width: usize,
        len: usize,
    },
    #[error("wheel revolution data flagged but buffer is {len} bytes (need {required})")]
    TruncatedWheelData { len: usize, required: usize },
    #[error("crank revolution data flagged but buffer is {len} bytes (need {required})")]
    TruncatedCrankData { len: usize, required: usize },
}

/// A delta that is still negative after wraparound correction. This can only
/// come from a bug in the tracker, so it ends the session.
#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum InvariantViolation {
    #[error("rollover correction of {previous} -> {current} (modulus {modulus}) produced {delta}")]
    RolloverArithmetic {
        previous: i64,
        current: i64,
        modulus: i64,
        delta: i64,
    },
}

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("no sensor matching {0} was found")]
    SensorNotFound(String),
    #[error("sensor does not expose the CSC measurement characteristic")]
    NoMeasurementCharacteristic,
    #[error("could not connect after {0} attempts")]
    ConnectFailed(u32),
    #[error(transparent)]
    Transport(#[from] btleplug::Error),
    #[error(transparent)]
    Invariant(#[from] InvariantViolation),
}
