use anyhow::{bail, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

use stabrig::artifacts::ArtifactWriter;
use stabrig::rig::RigController;
use stabrig::sim::{SimScene, SimulatedActuator, SimulatedCamera, SimulatedFrameSource};
use stabrig::verdict::Outcome;
use stabrig::{RigConfig, StabilizationHarness};

#[derive(Parser, Debug)]
#[command(name = "stabrig")]
#[command(about = "Video stabilization certification rig", long_about = None)]
struct Args {
    /// JSON config overriding the built-in certification constants
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output directory for plots, reports and preserved frames
    #[arg(long, default_value = "stabrig_out")]
    output_dir: String,

    /// Backend to run against (only "sim" is wired in)
    #[arg(long, default_value = "sim")]
    backend: String,

    /// Device mounted in the tablet fixture (slower servo sweep)
    #[arg(long)]
    tablet: bool,

    /// Residual motion fraction for the simulated stabilizer
    #[arg(long, default_value = "0.3")]
    sim_attenuation: f64,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => RigConfig::load(path)?,
        None => RigConfig::default(),
    };
    config.tablet_rig = args.tablet;

    if args.backend != "sim" {
        bail!(
            "backend {:?} is not wired in; implement the CameraSession, \
             FrameSource and ActuatorPort traits for your bench hardware",
            args.backend
        );
    }

    let scene = Arc::new(SimScene::from_config(&config, args.sim_attenuation));
    let camera = SimulatedCamera::new(&config, scene.clone());
    let frames = SimulatedFrameSource::new(&config, scene);
    let controller = RigController::connect(Box::new(SimulatedActuator::new(0)), &config).await?;
    let artifacts = ArtifactWriter::new(&args.output_dir)?;

    let mut harness = StabilizationHarness::new(config, camera, frames, controller, artifacts);
    let report = harness.run().await?;

    println!("\n=== Stabilization verdicts ===");
    for v in &report.verdicts {
        println!(
            "{:>6}: camera {:.3} deg, gyro {:.3} deg, ratio {:.4}, thresh {:.2} -> {:?}",
            v.quality.label(),
            v.camera_peak_deg,
            v.gyro_peak_deg,
            v.ratio,
            v.threshold_factor,
            v.outcome
        );
        if v.outcome == Outcome::Invalid {
            println!("        rig stimulus insufficient; verdict inconclusive");
        }
    }
    for (quality, message) in &report.errors {
        println!("{:>6}: ERROR {message}", quality.label());
    }

    if report.overall_passed() {
        println!("PASS");
        Ok(())
    } else {
        println!("FAIL");
        std::process::exit(1);
    }
}
