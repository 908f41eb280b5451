use log::info;

use dialtrack_calib::{
    CalibError, CalibrationLocator, DeviceCalibration, DeviceFamily, DeviceGeometry,
};
use dialtrack_core::FrameView;
use dialtrack_finders::{
    AngleFinder, AngleMeasurement, ClickDetector, ClickParams, FinderError, RatchetAngleFinder,
    RatchetParams, ScrollyAngleFinder, ScrollyParams, SliderFinder, SliderMeasurement,
    SliderParams,
};

/// Everything measured on one frame. Finder failures are expected
/// per-frame conditions, so each feature carries its own result.
#[derive(Clone, Debug)]
pub struct FrameReport {
    pub frame: u64,
    pub ratchet: Result<AngleMeasurement, FinderError>,
    pub scrolly: Result<AngleMeasurement, FinderError>,
    pub slider: Result<SliderMeasurement, FinderError>,
    pub clicked: bool,
    pub released: Option<f32>,
}

/// One physical device, one session: owns the calibration and one instance
/// of every finder, and feeds frames through them in arrival order.
pub struct TrackingSession {
    locator: CalibrationLocator,
    calibration: Option<DeviceCalibration>,
    ratchet: RatchetAngleFinder,
    scrolly: ScrollyAngleFinder,
    slider: SliderFinder,
    clicks: ClickDetector,
    frames: u64,
}

impl TrackingSession {
    pub fn new(family: DeviceFamily) -> Self {
        let geometry = DeviceGeometry::for_family(family);
        // the camera occlusion zone travels from the device table into the
        // ratchet finder
        let ratchet_params = RatchetParams {
            blackout: geometry.blackout,
            photometric: family == DeviceFamily::Injection,
            ..RatchetParams::default()
        };
        Self {
            locator: CalibrationLocator::new(geometry),
            calibration: None,
            ratchet: RatchetAngleFinder::new(ratchet_params),
            scrolly: ScrollyAngleFinder::new(ScrollyParams::default()),
            slider: SliderFinder::new(SliderParams::default()),
            clicks: ClickDetector::new(ClickParams::default()),
            frames: 0,
        }
    }

    #[inline]
    pub fn calibration(&self) -> Option<&DeviceCalibration> {
        self.calibration.as_ref()
    }

    #[inline]
    pub fn locator(&self) -> &CalibrationLocator {
        &self.locator
    }

    /// Run the static calibration locator and configure every finder.
    pub fn calibrate(&mut self, frame: &FrameView<'_>) -> Result<&DeviceCalibration, CalibError> {
        let calibration = self.locator.locate(frame)?;
        self.ratchet.configure(&calibration);
        self.scrolly.configure(&calibration);
        self.slider.configure(&calibration);
        self.clicks.reset();
        self.frames = 0;
        info!("session calibrated for device {:?}", calibration.device_id);
        Ok(self.calibration.insert(calibration))
    }

    /// Push one frame through all finders. Frames must arrive in order;
    /// every finder updates its cross-frame state exactly once per call.
    pub fn process(&mut self, frame: &FrameView<'_>) -> FrameReport {
        self.frames += 1;

        let ratchet = self.ratchet.find(frame);
        let scrolly = self.scrolly.find(frame);
        let slider = self.slider.find(frame);

        let (clicked, released) = match &ratchet {
            Ok(m) => {
                self.clicks.new_angle(m.angle_deg);
                (self.clicks.clicked(), self.clicks.released())
            }
            Err(_) => (false, None),
        };

        FrameReport {
            frame: self.frames,
            ratchet,
            scrolly,
            slider,
            clicked,
            released,
        }
    }
}
