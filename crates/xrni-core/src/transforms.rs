//! Mapping from physical units to the instrument's internal parameter scales.
//!
//! Every function follows the same absence convention: `None` *and* a literal
//! zero both mean "not specified" and yield `None`, leaving the caller to fall
//! back to an inherited default. A genuine zero-second stage or a 0 dB level is
//! therefore indistinguishable from an omitted one, which is what the converted
//! instruments have always relied on.

/// Cutoff frequency (Hz) at which the internal cutoff scale starts.
const CUTOFF_BASE_HZ: f64 = 130.0;

/// Frequency used for the baseline (fully open) cutoff.
pub const DEFAULT_CUTOFF_HZ: f64 = 20000.0;

/// Returns the value when it is present and nonzero.
pub fn specified(value: Option<f64>) -> Option<f64> {
    value.filter(|v| *v != 0.0)
}

/// Envelope stage duration in seconds to envelope unit: `(s / 60)^(1/3)`.
pub fn seconds_to_envelope_unit(seconds: Option<f64>) -> Option<f64> {
    specified(seconds).map(|s| (s / 60.0).cbrt())
}

/// Level in decibels to linear volume unit: `e^(db / 8.68)`.
pub fn decibel_to_volume_unit(db: Option<f64>) -> Option<f64> {
    specified(db).map(|db| (db / 8.68).exp())
}

/// Frequency in Hz to cutoff unit: `127 * clamp(ln(hz / 130) / 5, 0, 1)`.
pub fn frequency_to_cutoff_unit(hz: Option<f64>) -> Option<f64> {
    specified(hz).map(|hz| 127.0 * ((hz / CUTOFF_BASE_HZ).ln() / 5.0).clamp(0.0, 1.0))
}

/// Cutoff unit of a fully open filter.
pub fn default_cutoff_unit() -> f64 {
    127.0 * ((DEFAULT_CUTOFF_HZ / CUTOFF_BASE_HZ).ln() / 5.0).clamp(0.0, 1.0)
}

/// Fine tuning in cents to the internal finetune unit (128 steps per semitone),
/// truncated toward zero and limited to ±64.
pub fn cents_to_finetune(cents: Option<f64>) -> Option<i32> {
    specified(cents).map(|c| ((128.0 * c / 100.0) as i32).clamp(-64, 64))
}

/// Bipolar pan (-1 = left, 1 = right) to panning unit in [0, 1].
pub fn pan_to_panning(pan: Option<f64>) -> Option<f64> {
    specified(pan).map(|p| (0.5 + p / 2.0).clamp(0.0, 1.0))
}
