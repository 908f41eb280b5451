//! Click detection on the smoothed ratchet angle stream.
//!
//! Purely a function of the angle sequence, no geometry. A click shows up
//! as a sharp dip of the deviation signal below `-threshold`; the latch
//! releases once the signal recovers, reporting the angle at release.

use serde::{Deserialize, Serialize};

/// Signal value substituted for pathological 0↔360 wrap spikes.
const WRAP_SENTINEL: f32 = -10_000.0;

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct ClickParams {
    /// FIFO window over recent smoothed angles.
    pub window: usize,
    /// Latch when the deviation signal crosses below `-threshold`.
    pub threshold: f32,
}

impl Default for ClickParams {
    fn default() -> Self {
        Self {
            window: 5,
            threshold: 40.0,
        }
    }
}

/// Stateful click detector consuming one ratchet angle per frame.
#[derive(Clone, Debug)]
pub struct ClickDetector {
    params: ClickParams,
    buffer: Vec<f32>,
    latched: bool,
    clicked: bool,
    released: Option<f32>,
}

impl ClickDetector {
    pub fn new(params: ClickParams) -> Self {
        Self {
            params,
            buffer: Vec::new(),
            latched: false,
            clicked: false,
            released: None,
        }
    }

    /// Feed the next smoothed ratchet angle. The per-call outputs
    /// [`ClickDetector::clicked`] and [`ClickDetector::released`] refer to
    /// this angle only.
    pub fn new_angle(&mut self, angle: f32) {
        self.clicked = false;
        self.released = None;

        self.buffer.push(angle);
        if self.buffer.len() > self.params.window {
            self.buffer.remove(0);
        }
        if self.buffer.len() < 2 {
            return;
        }

        let n = self.buffer.len() as f32;
        let mean = self.buffer.iter().sum::<f32>() / n;
        let var = self
            .buffer
            .iter()
            .map(|a| (a - mean) * (a - mean))
            .sum::<f32>()
            / n;
        let std = var.sqrt();

        let deviation = angle - mean;
        let signal = if deviation.abs() > 180.0 {
            WRAP_SENTINEL
        } else {
            std * deviation
        };

        if signal < -self.params.threshold {
            if !self.latched {
                self.latched = true;
                self.clicked = true;
            }
        } else if self.latched {
            self.latched = false;
            self.released = Some(angle);
        }
    }

    /// A click latched on this angle (rising edge only).
    #[inline]
    pub fn clicked(&self) -> bool {
        self.clicked
    }

    /// The latch released on this angle; carries the release angle.
    #[inline]
    pub fn released(&self) -> Option<f32> {
        self.released
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
        self.latched = false;
        self.clicked = false;
        self.released = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector() -> ClickDetector {
        ClickDetector::new(ClickParams::default())
    }

    #[test]
    fn steady_stream_never_clicks() {
        let mut d = detector();
        for _ in 0..50 {
            d.new_angle(120.0);
            assert!(!d.clicked());
            assert!(d.released().is_none());
        }
    }

    #[test]
    fn dip_latches_once_then_releases_with_angle() {
        let mut d = detector();
        for _ in 0..5 {
            d.new_angle(100.0);
        }
        d.new_angle(60.0);
        assert!(d.clicked());

        // still below threshold: latched, but no second click edge
        d.new_angle(55.0);
        assert!(!d.clicked());
        assert!(d.released().is_none());

        // recovery releases and reports the angle
        d.new_angle(100.0);
        assert!(!d.clicked());
        assert_eq!(d.released(), Some(100.0));
    }

    #[test]
    fn wrap_spike_is_clamped_to_the_sentinel() {
        let mut d = detector();
        for a in [5.0, 4.0, 3.0, 2.0, 1.0] {
            d.new_angle(a);
            assert!(!d.clicked());
        }
        // 1 -> 359 is a tiny backward step that reads as +358 on the buffer
        d.new_angle(359.0);
        assert!(d.clicked());
    }

    #[test]
    fn slow_drift_stays_quiet() {
        let mut d = detector();
        for i in 0..100 {
            d.new_angle(50.0 + i as f32 * 0.5);
            assert!(!d.clicked(), "drift frame {i}");
        }
    }
}
