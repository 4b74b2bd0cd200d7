//! Stereo point-cloud feature extraction command line
//!
//! `generate` writes a synthetic left/right cylinder pair; `process`
//! loads a stereo PLY pair, runs both clouds through independent
//! pipelines in parallel, and persists the resulting feature sets and
//! filtered clouds.

use anyhow::Context;
use clap::{Parser, Subcommand};
use log::{info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::{Path, PathBuf};
use stereosift_algorithms::{process_stereo_pair, CameraSide, PipelineReport};
use stereosift_core::{synthetic, PipelineConfig};
use stereosift_io::{read_point_cloud, write_point_cloud, save_features};

#[derive(Parser)]
#[command(name = "stereosift", version, about = "Stereo point cloud SIFT feature extraction")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a synthetic left/right cylinder pair as PLY files
    Generate {
        /// Output directory for left_camera.ply / right_camera.ply
        #[arg(long, default_value = "data")]
        output: PathBuf,
        /// Points per cloud
        #[arg(long, default_value_t = 10_000)]
        num_points: usize,
        /// RNG seed for reproducible clouds
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
    /// Run the feature pipeline over a stereo pair of PLY clouds
    Process {
        /// Left camera PLY file
        #[arg(long, default_value = "data/left_camera.ply")]
        left: PathBuf,
        /// Right camera PLY file
        #[arg(long, default_value = "data/right_camera.ply")]
        right: PathBuf,
        /// Output directory for feature and filtered-cloud files
        #[arg(long, default_value = "output")]
        output: PathBuf,
        /// Raster width and height in cells
        #[arg(long, default_value_t = 256)]
        raster_size: usize,
        /// Standard-deviation multiplier for outlier removal
        #[arg(long, default_value_t = 2.0)]
        outlier_threshold: f64,
        /// Keep only the strongest N features per cloud
        #[arg(long)]
        max_features: Option<usize>,
        /// Skip writing feature and cloud files
        #[arg(long)]
        no_save: bool,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match Cli::parse().command {
        Command::Generate {
            output,
            num_points,
            seed,
        } => generate(&output, num_points, seed),
        Command::Process {
            left,
            right,
            output,
            raster_size,
            outlier_threshold,
            max_features,
            no_save,
        } => process(
            &left,
            &right,
            &output,
            raster_size,
            outlier_threshold,
            max_features,
            no_save,
        ),
    }
}

fn generate(output: &Path, num_points: usize, seed: u64) -> anyhow::Result<()> {
    std::fs::create_dir_all(output)
        .with_context(|| format!("creating output directory {}", output.display()))?;

    let mut rng = StdRng::seed_from_u64(seed);

    let mut left = synthetic::cylinder(&mut rng, 0.8, 2.0, num_points);
    for point in left.iter_mut() {
        point.position.x -= 1.0;
    }
    let mut right = synthetic::cylinder(&mut rng, 0.8, 2.0, num_points);
    for point in right.iter_mut() {
        point.position.x += 1.0;
    }

    let left_path = output.join("left_camera.ply");
    let right_path = output.join("right_camera.ply");
    write_point_cloud(&left, &left_path)
        .with_context(|| format!("writing {}", left_path.display()))?;
    write_point_cloud(&right, &right_path)
        .with_context(|| format!("writing {}", right_path.display()))?;

    info!("wrote {} ({} points)", left_path.display(), left.len());
    info!("wrote {} ({} points)", right_path.display(), right.len());
    Ok(())
}

fn process(
    left: &Path,
    right: &Path,
    output: &Path,
    raster_size: usize,
    outlier_threshold: f64,
    max_features: Option<usize>,
    no_save: bool,
) -> anyhow::Result<()> {
    let mut config = PipelineConfig::default()
        .with_raster_size(raster_size, raster_size)
        .with_outlier_threshold(outlier_threshold);
    config.max_features = max_features;

    let left_cloud =
        read_point_cloud(left).with_context(|| format!("loading {}", left.display()))?;
    info!("loaded left cloud: {} points", left_cloud.len());
    let right_cloud =
        read_point_cloud(right).with_context(|| format!("loading {}", right.display()))?;
    info!("loaded right cloud: {} points", right_cloud.len());

    let stereo = process_stereo_pair(&left_cloud, &right_cloud, &config)?;

    report_side(CameraSide::Left, &stereo.left);
    report_side(CameraSide::Right, &stereo.right);

    if !no_save {
        std::fs::create_dir_all(output)
            .with_context(|| format!("creating output directory {}", output.display()))?;

        save_features(&stereo.left.features, output.join("features_left.bin"))?;
        save_features(&stereo.right.features, output.join("features_right.bin"))?;
        write_point_cloud(&stereo.left.filtered, output.join("filtered_left.ply"))?;
        write_point_cloud(&stereo.right.filtered, output.join("filtered_right.ply"))?;
        info!("feature data written to {}", output.display());
    }

    Ok(())
}

fn report_side(side: CameraSide, report: &PipelineReport) {
    info!(
        "{} camera: {} features from {} points ({} kept after filtering, {} keypoints dropped)",
        side,
        report.features.len(),
        report.input_points,
        report.filtered_points,
        report.dropped_keypoints,
    );
    if let Some(degeneracy) = report.degeneracy {
        warn!("{} camera: degenerate extraction: {:?}", side, degeneracy);
    }
}
