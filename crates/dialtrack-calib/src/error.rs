use dialtrack_barcode::BarcodeError;
use dialtrack_circle::CircleFitError;

/// Errors returned by the calibration locator. Stages are hard-gated, so
/// the variant names the first stage that failed.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq)]
pub enum CalibError {
    #[error("no calibration column candidates in the luma projection")]
    NoColumnCandidates,
    #[error("no candidate column carried a readable strip (tried {tried})")]
    ColumnScanExhausted { tried: usize },
    #[error(transparent)]
    Barcode(#[from] BarcodeError),
    #[error("strip dot count {found} outside {min}..={max}")]
    DotCountMismatch { found: usize, min: usize, max: usize },
    #[error("degenerate spacing between the top strip dots")]
    DotSpacingDegenerate,
    #[error("no mass inside the ratchet search region")]
    RatchetSeedNotFound,
    #[error(transparent)]
    RatchetFit(#[from] CircleFitError),
    #[error("found {found} top markers, need 3")]
    TopMarkersNotFound { found: usize },
    #[error("top marker {index} failed centre refinement")]
    MarkerRefineFailed { index: usize },
    #[error("scrolly marker failed centre refinement")]
    ScrollyRefineFailed,
    #[error("slider region degenerate after margins")]
    SliderRegionInvalid,
    #[error("no brightness maximum inside the slider region")]
    SliderBrightnessMissing,
    #[error("no slider dot inside the slider region")]
    SliderDotNotFound,
    #[error("satellite dot {index} not found along its ray")]
    SatelliteDotMissing { index: usize },
    #[error("satellite-reconstructed centre off by {deviation:.1}px")]
    SatelliteCenterMismatch { deviation: f32 },
}
