//! Calibrate against a still image and print the result as JSON.
//!
//! The luma plane comes from the grayscale conversion; without a real
//! chroma split the red plane falls back to the same data, which is good
//! enough for bench checks of strip decoding and geometry.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::LevelFilter;

use dialtrack::calib::CalibrationLocator;
use dialtrack::{core, DeviceFamily, DeviceGeometry, FrameView};

#[derive(Parser, Debug)]
#[command(name = "dialtrack", about = "Locate device calibration in an image")]
struct Args {
    /// Input image (any format the `image` crate decodes).
    image: PathBuf,

    /// Device family to calibrate for.
    #[arg(long, value_enum, default_value_t = Family::Manta)]
    family: Family,

    /// Verbose stage logging.
    #[arg(short, long)]
    verbose: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum Family {
    Mvp,
    Inhouse,
    Injection,
    Manta,
}

impl From<Family> for DeviceFamily {
    fn from(f: Family) -> Self {
        match f {
            Family::Mvp => DeviceFamily::Mvp,
            Family::Inhouse => DeviceFamily::Inhouse,
            Family::Injection => DeviceFamily::Injection,
            Family::Manta => DeviceFamily::Manta,
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    let level = if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let _ = core::init_with_level(level);

    let reader = match image::ImageReader::open(&args.image) {
        Ok(reader) => reader,
        Err(e) => {
            eprintln!("failed to open {}: {e}", args.image.display());
            return ExitCode::FAILURE;
        }
    };
    let gray = match reader.decode() {
        Ok(img) => img.to_luma8(),
        Err(e) => {
            eprintln!("failed to decode {}: {e}", args.image.display());
            return ExitCode::FAILURE;
        }
    };

    let data = gray.as_raw();
    let frame = FrameView {
        width: gray.width() as usize,
        height: gray.height() as usize,
        luma: data,
        chroma_blue: data,
        chroma_red: data,
    };

    let locator = CalibrationLocator::new(DeviceGeometry::for_family(args.family.into()));
    let (calibration, result) = locator.locate_partial(&frame);

    match serde_json::to_string_pretty(&calibration) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("failed to serialize calibration: {e}");
            return ExitCode::FAILURE;
        }
    }

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("calibration incomplete: {e}");
            ExitCode::FAILURE
        }
    }
}
