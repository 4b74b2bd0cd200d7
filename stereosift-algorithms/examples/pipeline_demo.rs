//! End-to-end pipeline demo over a synthetic stereo pair

use rand::rngs::StdRng;
use rand::SeedableRng;
use stereosift_algorithms::process_stereo_pair;
use stereosift_core::{synthetic, PipelineConfig};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut rng = StdRng::seed_from_u64(42);

    let mut left = synthetic::cylinder(&mut rng, 0.8, 2.0, 10_000);
    for p in left.iter_mut() {
        p.position.x -= 1.0;
    }
    let mut right = synthetic::cylinder(&mut rng, 0.8, 2.0, 10_000);
    for p in right.iter_mut() {
        p.position.x += 1.0;
    }
    println!("generated stereo pair: {} / {} points", left.len(), right.len());

    let config = PipelineConfig::default();
    let stereo = process_stereo_pair(&left, &right, &config)?;

    for (side, report) in [("left", &stereo.left), ("right", &stereo.right)] {
        println!(
            "{} camera: {} features from {} points ({} kept after filtering, {} keypoints dropped)",
            side,
            report.features.len(),
            report.input_points,
            report.filtered_points,
            report.dropped_keypoints,
        );
    }

    Ok(())
}
