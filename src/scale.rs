//! Linear range mapping for continuous controls

use thiserror::Error;

/// Lowest raw value a 7-bit controller sends
pub const MIDI_MIN: f64 = 0.0;

/// Highest raw value a 7-bit controller sends
pub const MIDI_MAX: f64 = 127.0;

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum ScaleError {
    #[error("input range is empty (low = high = {0})")]
    EmptyInputRange(f64),
}

/// Map `input` from `[in_low, in_high]` onto `[out_low, out_high]`.
///
/// No clamping is applied; inputs outside the source range extrapolate.
pub fn scale(
    input: f64,
    in_low: f64,
    in_high: f64,
    out_low: f64,
    out_high: f64,
) -> Result<f64, ScaleError> {
    if in_high == in_low {
        return Err(ScaleError::EmptyInputRange(in_low));
    }
    Ok(out_low + (out_high - out_low) * ((input - in_low) / (in_high - in_low)))
}
