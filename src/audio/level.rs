//! RMS → decibel estimation for 16-bit PCM blocks.
//!
//! The calibration maps the dynamic range of signed 16-bit audio onto an
//! approximate real-world dB(A) scale: near-silence sits at 0 dB and a
//! full-scale (clipping) signal at 120 dB.  The `+90` offset, the `32767`
//! full-scale reference and the `[0, 120]` clamp are fixed calibration
//! constants shared with the storage backend — do not change them.

/// Full-scale reference for signed 16-bit PCM.
pub const FULL_SCALE: f64 = 32767.0;

/// Additive calibration offset anchoring the dB scale.
pub const DB_OFFSET: f64 = 90.0;

/// Lower clamp bound in dB.
pub const DB_FLOOR: f64 = 0.0;

/// Upper clamp bound in dB.
pub const DB_CEIL: f64 = 120.0;

/// Estimate the sound pressure level of one block of 16-bit samples.
///
/// Computes the root-mean-square amplitude of `samples` and converts it to
/// decibels as `20 * log10(rms / 32767) + 90`, clamped to `[0, 120]`.
///
/// This function is total: an empty block or an all-zero (silent) block
/// yields exactly `0.0` — the logarithm of zero is never taken and no input
/// can make it panic.  The pipeline relies on this to keep running no matter
/// what the capture layer delivers.
///
/// ```
/// use noise_monitor::audio::estimate_decibels;
///
/// assert_eq!(estimate_decibels(&[0; 1024]), 0.0);
/// assert!(estimate_decibels(&[i16::MAX; 1024]) <= 120.0);
/// ```
pub fn estimate_decibels(samples: &[i16]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }

    // Sum of squares in i64: 1024 samples of ±32767 is far below overflow.
    let sum_sq: i64 = samples.iter().map(|&s| s as i64 * s as i64).sum();
    let rms = ((sum_sq as f64) / (samples.len() as f64)).sqrt();

    if rms <= 0.0 {
        return 0.0;
    }

    let db = 20.0 * (rms / FULL_SCALE).log10() + DB_OFFSET;
    db.clamp(DB_FLOOR, DB_CEIL)
}

/// Build a constant-amplitude block whose RMS lands on (approximately) the
/// given decibel value — the inverse of [`estimate_decibels`] for constant
/// signals.  Test helper; values outside `(0, 120)` are not meaningful.
#[cfg(test)]
pub fn block_at_db(db: f64, len: usize) -> Vec<i16> {
    let amplitude = FULL_SCALE * 10f64.powf((db - DB_OFFSET) / 20.0);
    vec![amplitude.round() as i16; len]
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
