use clap::Parser;
use std::path::PathBuf;

use camcalib::config::CalibrationConfig;
use camcalib::pattern::PatternSpec;

/// Calibrate a camera from images of a chessboard.
#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// Glob pattern selecting the input images.
    #[arg(default_value = "data/*.jpg")]
    image_glob: String,

    /// Directory for the corner visualizations and the undistorted previews, empty to disable.
    #[arg(long, default_value = "./output/")]
    debug: String,

    /// Side length of a square of the chessboard.
    #[arg(long = "square_size", default_value_t = 1.0)]
    square_size: f64,

    /// Number of internal corners along a row.
    #[arg(long = "pattern_width", default_value_t = 7)]
    pattern_width: usize,

    /// Number of internal corners along a column.
    #[arg(long = "pattern_height", default_value_t = 5)]
    pattern_height: usize,

    /// Directory for data.yaml and data.json.
    #[arg(long = "output_dir", default_value = ".")]
    output_dir: PathBuf,
}

impl TryFrom<Args> for CalibrationConfig {
    type Error = camcalib::config::ConfigError;

    fn try_from(args: Args) -> Result<Self, Self::Error> {
        let config = Self {
            image_glob: args.image_glob,
            debug_dir: (!args.debug.is_empty()).then(|| PathBuf::from(args.debug)),
            output_dir: args.output_dir,
            pattern: PatternSpec::new(args.pattern_width, args.pattern_height, args.square_size)?,
        };
        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let env = env_logger::Env::default().default_filter_or("info");
    env_logger::init_from_env(env);

    let config = CalibrationConfig::try_from(Args::parse())?;
    let summary = camcalib::run(&config)?;

    println!("RMS: {}", summary.rms);
    println!("camera matrix:\n{:?}", summary.result.camera_matrix);
    println!("distortion coefficients: {:?}", summary.result.dist_coeff[0]);

    Ok(())
}
