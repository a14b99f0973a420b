use crate::model::{Reading, Status};

/// Smoke level (MQ-2 ADC units) at or above which a sample is a warning.
pub const SMOKE_WARNING: i64 = 200;
/// Smoke level at or above which a sample is dangerous.
pub const SMOKE_DANGER: i64 = 400;
/// Temperature (°C) at or above which a sample is a warning.
pub const TEMP_WARNING: f64 = 45.0;
/// Temperature at or above which a sample is dangerous.
pub const TEMP_DANGER: f64 = 55.0;

/// Maps a reading to its safety tier. A value exactly at a threshold counts
/// as crossing it; humidity never affects the tier.
pub fn classify(reading: &Reading) -> Status {
    if reading.smoke >= SMOKE_DANGER || reading.temperature >= TEMP_DANGER {
        return Status::Danger;
    }
    if reading.smoke >= SMOKE_WARNING || reading.temperature >= TEMP_WARNING {
        return Status::Warning;
    }
    Status::Safe
}
