use dialtrack_calib::DeviceFamily;

/// Per-frame finder failures. These are expected conditions reported to the
/// caller for logging and UI decisions, never panics.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq)]
pub enum FinderError {
    #[error("finder not configured with a completed calibration")]
    NotConfigured,
    #[error("device family {0:?} is not supported by this finder")]
    DeviceNotSupported(DeviceFamily),
    #[error("no ratchet dots above the noise threshold")]
    NoDots,
    #[error("only one ratchet dot survived filtering")]
    SingleDot,
    #[error("too many ratchet dots ({count})")]
    TooManyDots { count: usize },
    #[error("no dot gap matched the expected spacings")]
    NoGapMatch,
    #[error("best gap match off by {deviation:.1} degrees")]
    GapOutlier { deviation: f32 },
    #[error("forward jump of {delta:.1} degrees rejected")]
    TooMuchMotion { delta: f32 },
    #[error("backward motion of {delta:.1} degrees rejected")]
    BackwardMotion { delta: f32 },
    #[error("ratchet centre drifted by {deviation:.1}px")]
    CenterDrifted { deviation: f32 },
    #[error("dot pair gap {gap:.1} outside the accepted bands")]
    DotPairMismatch { gap: f32 },
    #[error("light metering at the satellite dots failed")]
    LightMeterFailed,
    #[error("no peak in the scrolly profile")]
    NoPeak,
    #[error("not enough light in the slider strip (energy {energy:.0})")]
    NotEnoughLight { energy: f32 },
    #[error("no slider dot in the search window")]
    NoDotFound,
}
