//! Peak amplitude metering over 16-bit little-endian PCM.

/// Floor reported for silence, in dBFS.
pub const SILENCE_DB: f64 = -160.0;

/// Peak amplitude of a PCM chunk in dBFS, clamped to [-160, 0].
///
/// A trailing odd byte is ignored.
pub fn peak_db(chunk: &[u8]) -> f64 {
    let mut peak: i32 = 0;
    for pair in chunk.chunks_exact(2) {
        let sample = i16::from_le_bytes([pair[0], pair[1]]) as i32;
        peak = peak.max(sample.abs());
    }
    if peak == 0 {
        return SILENCE_DB;
    }
    (20.0 * (peak as f64 / 32767.0).log10()).clamp(SILENCE_DB, 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn pcm(samples: &[i16]) -> Vec<u8> {
        samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }

    #[test]
    fn test_silence_hits_floor() {
        assert_eq!(peak_db(&pcm(&[0, 0, 0, 0])), SILENCE_DB);
        assert_eq!(peak_db(&[]), SILENCE_DB);
    }

    #[test]
    fn test_full_scale_is_zero_db() {
        assert_relative_eq!(peak_db(&pcm(&[32767])), 0.0, epsilon = 1e-9);
        // i16::MIN overshoots full scale slightly; the clamp holds it at 0
        assert_eq!(peak_db(&pcm(&[i16::MIN])), 0.0);
    }

    #[test]
    fn test_half_scale() {
        let db = peak_db(&pcm(&[16384, -100, 7]));
        assert_relative_eq!(db, 20.0 * (16384.0f64 / 32767.0).log10(), epsilon = 1e-9);
        assert!(db < 0.0 && db > -7.0);
    }

    #[test]
    fn test_peak_uses_magnitude() {
        assert_eq!(peak_db(&pcm(&[-16384])), peak_db(&pcm(&[16384])));
    }

    #[test]
    fn test_trailing_byte_ignored() {
        let mut bytes = pcm(&[1000]);
        bytes.push(0x7f);
        assert_eq!(peak_db(&bytes), peak_db(&pcm(&[1000])));
    }
}
