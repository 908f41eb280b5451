use dialtrack_calib::synthetic::SyntheticDevice;
use dialtrack_calib::{
    CalibrationLocator, DeviceCalibration, DeviceFamily, DeviceGeometry,
};
use dialtrack_core::{signed_delta, wrap_deg, Circle, Region};
use dialtrack_finders::{
    AngleFinder, ClickDetector, ClickParams, FinderError, RatchetAngleFinder, RatchetParams,
    ScrollyAngleFinder, ScrollyParams, SliderFinder, SliderParams,
};
use nalgebra::Point2;

fn calibrate(family: DeviceFamily) -> (SyntheticDevice, DeviceCalibration) {
    let _ = env_logger::builder().is_test(true).try_init();
    let scene = SyntheticDevice::new(family);
    let frame = scene.render();
    let locator = CalibrationLocator::new(DeviceGeometry::for_family(family));
    let calib = locator.locate(&frame.view()).expect("calibration");
    (scene, calib)
}

#[test]
fn manta_rotation_tracks_without_rejections() {
    let (mut scene, calib) = calibrate(DeviceFamily::Manta);
    let mut finder = RatchetAngleFinder::new(RatchetParams::default());
    finder.configure(&calib);

    for i in 0..30 {
        let rotation = 10.0 + i as f32;
        scene.ratchet_angle_deg = rotation;
        let frame = scene.render();
        let m = finder
            .find(&frame.view())
            .unwrap_or_else(|e| panic!("frame {i} rejected: {e}"));
        assert_eq!(m.dots, 4);
        assert!(
            signed_delta(m.raw_deg, rotation).abs() < 1.5,
            "frame {i}: raw {} vs rotation {rotation}",
            m.raw_deg
        );
        assert!((0.0..360.0).contains(&m.angle_deg));
    }
}

#[test]
fn reversing_rotation_is_a_backward_motion_error() {
    let (mut scene, calib) = calibrate(DeviceFamily::Manta);
    let mut finder = RatchetAngleFinder::new(RatchetParams::default());
    finder.configure(&calib);

    scene.ratchet_angle_deg = 40.0;
    finder.find(&scene.render().view()).expect("forward frame");

    scene.ratchet_angle_deg = 28.0;
    let err = finder.find(&scene.render().view()).unwrap_err();
    assert!(matches!(err, FinderError::BackwardMotion { .. }), "{err}");
}

#[test]
fn forward_jump_is_rejected_but_recorded() {
    let (mut scene, calib) = calibrate(DeviceFamily::Manta);
    let mut finder = RatchetAngleFinder::new(RatchetParams::default());
    finder.configure(&calib);

    scene.ratchet_angle_deg = 40.0;
    finder.find(&scene.render().view()).expect("first frame");

    scene.ratchet_angle_deg = 75.0;
    let err = finder.find(&scene.render().view()).unwrap_err();
    assert!(matches!(err, FinderError::TooMuchMotion { .. }), "{err}");

    // the rejected raw angle became the new reference, so a frame near it
    // is accepted again
    scene.ratchet_angle_deg = 76.0;
    finder.find(&scene.render().view()).expect("recovery frame");
}

#[test]
fn blackout_zone_drops_covered_dots() {
    let (scene, calib) = calibrate(DeviceFamily::Manta);
    // cover the pattern dot at angle 0 (image position right of the centre)
    let track = scene.dot_track_radius();
    let cx = (scene.ratchet_center.x + track) as i32;
    let cy = scene.ratchet_center.y as i32;
    let params = RatchetParams {
        blackout: Some(Region::new(cx - 7, cy - 7, cx + 8, cy + 8)),
        ..RatchetParams::default()
    };
    let mut finder = RatchetAngleFinder::new(params);
    finder.configure(&calib);

    let m = finder.find(&scene.render().view()).expect("three dots left");
    assert_eq!(m.dots, 3);
    assert!(signed_delta(m.raw_deg, 0.0).abs() < 1.5);
}

#[test]
fn extra_dot_on_the_track_is_too_many() {
    let (scene, calib) = calibrate(DeviceFamily::Manta);
    let mut frame = scene.render();
    // paint a stray blob on the dot track at 300 degrees
    let track = scene.dot_track_radius();
    let (sin_a, cos_a) = 300.0f32.to_radians().sin_cos();
    let bx = (scene.ratchet_center.x + track * cos_a) as i32;
    let by = (scene.ratchet_center.y + track * sin_a) as i32;
    for dy in -3..=3 {
        for dx in -3..=3 {
            let (x, y) = ((bx + dx) as usize, (by + dy) as usize);
            frame.luma[y * frame.width + x] = 230;
        }
    }

    let mut finder = RatchetAngleFinder::new(RatchetParams::default());
    finder.configure(&calib);
    let err = finder.find(&frame.view()).unwrap_err();
    assert_eq!(err, FinderError::TooManyDots { count: 5 });
}

#[test]
fn mvp_two_dot_pair_averages_wrap_aware() {
    let (mut scene, calib) = calibrate(DeviceFamily::Mvp);
    let mut finder = RatchetAngleFinder::new(RatchetParams::default());
    finder.configure(&calib);

    scene.ratchet_angle_deg = 20.0;
    let m = finder.find(&scene.render().view()).expect("two dots");
    assert_eq!(m.dots, 2);
    // dots at 20 and 110, direct pairing: midpoint 65
    assert!(signed_delta(m.raw_deg, 65.0).abs() < 1.5, "raw={}", m.raw_deg);
}

#[test]
fn legacy_family_is_unsupported() {
    let mut calib = DeviceCalibration::new(DeviceFamily::Legacy);
    calib.ratchet = Some(Circle::new(Point2::new(100.0, 100.0), 40.0, 4.0));
    let mut finder = RatchetAngleFinder::new(RatchetParams::default());
    finder.configure(&calib);

    let scene = SyntheticDevice::new(DeviceFamily::Legacy);
    let err = finder.find(&scene.render().view()).unwrap_err();
    assert_eq!(err, FinderError::DeviceNotSupported(DeviceFamily::Legacy));
}

#[test]
fn injection_center_check_passes_then_flags_drift() {
    let (mut scene, calib) = calibrate(DeviceFamily::Injection);
    let mut finder = RatchetAngleFinder::new(RatchetParams::default());
    finder.configure(&calib);

    finder.find(&scene.render().view()).expect("steady frame");

    // shift the whole wheel: the satellites no longer reconstruct the
    // calibrated centre
    scene.ratchet_center = Point2::new(scene.ratchet_center.x + 6.0, scene.ratchet_center.y);
    let err = finder.find(&scene.render().view()).unwrap_err();
    assert!(
        matches!(
            err,
            FinderError::CenterDrifted { .. } | FinderError::LightMeterFailed
        ),
        "{err}"
    );
}

#[test]
fn injection_photometric_correction_keeps_the_anchor() {
    let (scene, calib) = calibrate(DeviceFamily::Injection);
    let params = RatchetParams {
        photometric: true,
        ..RatchetParams::default()
    };
    let mut finder = RatchetAngleFinder::new(params);
    finder.configure(&calib);

    let m = finder.find(&scene.render().view()).expect("corrected frame");
    assert!(signed_delta(m.raw_deg, 0.0).abs() < 1.5);
}

#[test]
fn scrolly_follows_the_rim_dot() {
    let (mut scene, calib) = calibrate(DeviceFamily::Manta);
    let mut finder = ScrollyAngleFinder::new(ScrollyParams::default());
    finder.configure(&calib);

    scene.scrolly_angle_deg = 90.0;
    let m = finder.find(&scene.render().view()).expect("first frame");
    assert!(signed_delta(m.raw_deg, 90.0).abs() < 2.0, "raw={}", m.raw_deg);
    assert!(
        signed_delta(m.angle_deg, wrap_deg(-90.0)).abs() < 2.0,
        "angle={}",
        m.angle_deg
    );

    // slow motion with the 50/50 temporal blend lagging at most a frame
    for i in 1..=10 {
        scene.scrolly_angle_deg = 90.0 + 2.0 * i as f32;
        let m = finder.find(&scene.render().view()).expect("blend frame");
        assert!(
            signed_delta(m.raw_deg, scene.scrolly_angle_deg).abs() < 4.0,
            "frame {i}: raw {} vs {}",
            m.raw_deg,
            scene.scrolly_angle_deg
        );
    }
}

#[test]
fn slider_measures_subpixel_offsets() {
    let (mut scene, calib) = calibrate(DeviceFamily::Manta);
    let mut finder = SliderFinder::new(SliderParams::default());
    finder.configure(&calib);

    for i in 0..6 {
        scene.slider_x = 126.0 + 3.0 * i as f32;
        let m = finder.find(&scene.render().view()).expect("slider frame");
        assert!(
            (m.position.x - scene.slider_x).abs() < 1.5,
            "frame {i}: x {} vs {}",
            m.position.x,
            scene.slider_x
        );
        let mm = m.offset_mm.expect("scale known");
        assert!((mm - m.offset_px / 4.0).abs() < 1e-3);
    }
}

#[test]
fn dark_strip_is_not_enough_light_regardless_of_position() {
    let (mut scene, calib) = calibrate(DeviceFamily::Manta);
    let params = SliderParams {
        energy_threshold: 1e9,
        ..SliderParams::default()
    };
    let mut finder = SliderFinder::new(params);
    finder.configure(&calib);

    for x in [110.0, 126.0, 150.0] {
        scene.slider_x = x;
        let err = finder.find(&scene.render().view()).unwrap_err();
        assert!(matches!(err, FinderError::NotEnoughLight { .. }), "{err}");
    }
}

#[test]
fn dot_outside_the_search_window_is_no_dot_found() {
    let (mut scene, calib) = calibrate(DeviceFamily::Manta);
    let mut finder = SliderFinder::new(SliderParams::default());
    finder.configure(&calib);

    // dot jumped far beyond the ±15 sample window around the last peak
    scene.slider_x = 158.0;
    let err = finder.find(&scene.render().view()).unwrap_err();
    assert_eq!(err, FinderError::NoDotFound);
}

#[test]
fn clicks_come_from_the_ratchet_angle_stream() {
    let mut clicks = ClickDetector::new(ClickParams::default());
    let mut events = 0;
    for frame in 0..40 {
        let angle = if frame == 20 { 60.0 } else { 100.0 };
        clicks.new_angle(angle);
        if clicks.clicked() {
            events += 1;
        }
    }
    assert_eq!(events, 1);
}
