use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use dialtrack_core::local_extrema;

/// Bit value threshold after renormalization to `[0, 100]`.
const BIT_THRESHOLD: f32 = 50.0;

/// Barcode geometry and detection settings.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct BarcodeConfig {
    /// Payload width in bits (MSB first).
    pub data_bits: usize,
    /// Checksum width; the payload satisfies `value mod 31 == checksum`.
    pub checksum_bits: usize,
    /// Border marker width on each side; a 3-bit border reads `101`.
    pub border_bits: usize,
    /// Hysteresis amplitude for bump/valley detection on the 0–100 scale.
    pub extrema_amplitude: f32,
}

impl Default for BarcodeConfig {
    fn default() -> Self {
        Self {
            data_bits: 10,
            checksum_bits: 5,
            border_bits: 3,
            extrema_amplitude: 20.0,
        }
    }
}

impl BarcodeConfig {
    #[inline]
    pub fn total_bits(&self) -> usize {
        self.data_bits + self.checksum_bits + 2 * self.border_bits
    }
}

/// Decode failures; one variant per distinguishable cause, so the
/// calibration locator can report which scan line failed and how.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum BarcodeError {
    #[error("degenerate barcode configuration")]
    BadConfig,
    #[error("not enough extrema on the scan line (maxima={maxima}, minima={minima})")]
    InsufficientExtrema { maxima: usize, minima: usize },
    #[error("bump span too short for {expected} bits (span={span})")]
    SpanTooShort { span: usize, expected: usize },
    #[error("start border marker mismatch")]
    StartMarker,
    #[error("end border marker mismatch")]
    EndMarker,
    #[error("checksum mismatch (value={value}, checksum={checksum})")]
    Checksum { value: u32, checksum: u32 },
}

/// Decode one scan-line profile into the device id.
///
/// Steps: rescale to `[0, 100]`, renormalize each min–max–min run against
/// its larger flanking minimum (defeats uneven illumination along the
/// line), divide the outer bump span into evenly spaced bit samples,
/// threshold, validate both border markers, then check the mod-31 checksum.
pub fn decode(values: &[f32], cfg: &BarcodeConfig) -> Result<u32, BarcodeError> {
    if cfg.data_bits == 0
        || cfg.border_bits == 0
        || cfg.data_bits + cfg.checksum_bits > 31
        || values.len() < cfg.total_bits()
    {
        return Err(BarcodeError::BadConfig);
    }

    let scaled = rescale_to_hundred(values);
    let extrema = local_extrema(&scaled, cfg.extrema_amplitude);
    if extrema.maxima.len() < 3 || extrema.minima.len() < 3 {
        return Err(BarcodeError::InsufficientExtrema {
            maxima: extrema.maxima.len(),
            minima: extrema.minima.len(),
        });
    }

    let normalized = renormalize_segments(&scaled, &extrema.minima);

    let start = extrema.maxima[0];
    let end = *extrema.maxima.last().unwrap_or(&start);
    let total = cfg.total_bits();
    if end <= start || end - start + 1 < total {
        return Err(BarcodeError::SpanTooShort {
            span: end.saturating_sub(start) + 1,
            expected: total,
        });
    }

    let step = (end - start) as f32 / (total - 1) as f32;
    let mut bits = Vec::with_capacity(total);
    for k in 0..total {
        let idx = (start as f32 + k as f32 * step).round() as usize;
        let idx = idx.min(normalized.len() - 1);
        bits.push(normalized[idx] >= BIT_THRESHOLD);
    }

    for (j, &bit) in bits[..cfg.border_bits].iter().enumerate() {
        if bit != border_bit(j) {
            return Err(BarcodeError::StartMarker);
        }
    }
    for (j, &bit) in bits[total - cfg.border_bits..].iter().enumerate() {
        if bit != border_bit(j) {
            return Err(BarcodeError::EndMarker);
        }
    }

    let mut value = 0u32;
    for &bit in &bits[cfg.border_bits..cfg.border_bits + cfg.data_bits] {
        value = (value << 1) | bit as u32;
    }
    let mut checksum = 0u32;
    for &bit in
        &bits[cfg.border_bits + cfg.data_bits..cfg.border_bits + cfg.data_bits + cfg.checksum_bits]
    {
        checksum = (checksum << 1) | bit as u32;
    }

    if value % 31 != checksum {
        return Err(BarcodeError::Checksum { value, checksum });
    }

    debug!("decoded barcode value {value} (span {start}..{end})");
    Ok(value)
}

/// Border markers alternate starting with a bar: `101` for 3 bits.
#[inline]
fn border_bit(j: usize) -> bool {
    j % 2 == 0
}

fn rescale_to_hundred(values: &[f32]) -> Vec<f32> {
    let mut min = f32::MAX;
    let mut max = f32::MIN;
    for &v in values {
        let v = v.max(0.0);
        min = min.min(v);
        max = max.max(v);
    }
    if max <= min {
        return vec![0.0; values.len()];
    }
    values
        .iter()
        .map(|&v| (v.max(0.0) - min) / (max - min) * 100.0)
        .collect()
}

/// Rescale each run between consecutive minima independently, using the
/// larger flanking minimum as the floor. Samples outside the outermost
/// minima keep the global scaling.
fn renormalize_segments(scaled: &[f32], minima: &[usize]) -> Vec<f32> {
    let mut out = scaled.to_vec();
    for pair in minima.windows(2) {
        let (m0, m1) = (pair[0], pair[1]);
        if m1 <= m0 + 1 || m1 >= scaled.len() {
            continue;
        }
        let floor = scaled[m0].max(scaled[m1]);
        let peak = scaled[m0..=m1].iter().cloned().fold(f32::MIN, f32::max);
        if peak - floor <= f32::EPSILON {
            continue;
        }
        for i in m0..=m1 {
            out[i] = ((scaled[i] - floor) / (peak - floor) * 100.0).clamp(0.0, 100.0);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLES_PER_BIT: usize = 9;

    /// Render a bitstring as a scan line: every set bit is a triangular bump
    /// peaking at the bit centre, cleared bits stay at the baseline.
    fn render_bits(bits: &[bool], gain: impl Fn(usize) -> f32) -> Vec<f32> {
        let mut out = Vec::with_capacity(bits.len() * SAMPLES_PER_BIT);
        let half = (SAMPLES_PER_BIT / 2) as f32;
        for (b, &bit) in bits.iter().enumerate() {
            for s in 0..SAMPLES_PER_BIT {
                let base = 12.0;
                let v = if bit {
                    let d = (s as f32 - half).abs() / half;
                    base + (1.0 - d) * 180.0
                } else {
                    base
                };
                out.push(v * gain(b * SAMPLES_PER_BIT + s));
            }
        }
        out
    }

    fn encode(value: u32, cfg: &BarcodeConfig) -> Vec<bool> {
        let checksum = value % 31;
        let mut bits = Vec::with_capacity(cfg.total_bits());
        for j in 0..cfg.border_bits {
            bits.push(border_bit(j));
        }
        for i in (0..cfg.data_bits).rev() {
            bits.push((value >> i) & 1 == 1);
        }
        for i in (0..cfg.checksum_bits).rev() {
            bits.push((checksum >> i) & 1 == 1);
        }
        for j in 0..cfg.border_bits {
            bits.push(border_bit(j));
        }
        bits
    }

    #[test]
    fn decodes_valid_payloads_exactly() {
        let cfg = BarcodeConfig::default();
        for value in [0u32, 1, 42, 714, 1023] {
            let bits = encode(value, &cfg);
            let line = render_bits(&bits, |_| 1.0);
            assert_eq!(decode(&line, &cfg), Ok(value), "value {value}");
        }
    }

    #[test]
    fn survives_uneven_illumination() {
        let cfg = BarcodeConfig::default();
        let bits = encode(714, &cfg);
        let n = bits.len() * SAMPLES_PER_BIT;
        // linear lighting falloff across the strip
        let line = render_bits(&bits, |i| 1.0 - 0.45 * i as f32 / n as f32);
        assert_eq!(decode(&line, &cfg), Ok(714));
    }

    #[test]
    fn flipped_border_bit_reports_the_side() {
        let cfg = BarcodeConfig::default();
        let mut bits = encode(42, &cfg);
        bits[1] = true; // start border now reads 111
        let line = render_bits(&bits, |_| 1.0);
        assert_eq!(decode(&line, &cfg), Err(BarcodeError::StartMarker));

        let mut bits = encode(42, &cfg);
        let last = bits.len() - 2;
        bits[last] = true; // end border now reads 111
        let line = render_bits(&bits, |_| 1.0);
        assert_eq!(decode(&line, &cfg), Err(BarcodeError::EndMarker));
    }

    #[test]
    fn broken_checksum_is_rejected() {
        let cfg = BarcodeConfig::default();
        let mut bits = encode(42, &cfg);
        // flip the lowest checksum bit: 42 % 31 = 11 -> reads 10
        let idx = cfg.border_bits + cfg.data_bits + cfg.checksum_bits - 1;
        bits[idx] = !bits[idx];
        let line = render_bits(&bits, |_| 1.0);
        assert!(matches!(
            decode(&line, &cfg),
            Err(BarcodeError::Checksum { value: 42, .. })
        ));
    }

    #[test]
    fn flat_line_has_insufficient_extrema() {
        let cfg = BarcodeConfig::default();
        let line = vec![40.0f32; 300];
        assert!(matches!(
            decode(&line, &cfg),
            Err(BarcodeError::InsufficientExtrema { .. })
        ));
    }

    #[test]
    fn short_input_is_bad_config() {
        let cfg = BarcodeConfig::default();
        let line = vec![0.0f32; 4];
        assert_eq!(decode(&line, &cfg), Err(BarcodeError::BadConfig));
    }
}
