use std::error::Error;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use log::{info, LevelFilter};
use nalgebra::{Matrix3, Point3, Vector3};

use quadtrack::capture::{FrameSource, SyntheticQuadCam};
use quadtrack::core::{
    init_with_level, projection_matrix, CalibrationStore, CameraId, CameraIntrinsics, PairKey,
    StereoCalibration, CAMERA_COUNT,
};
use quadtrack::detect::MarkerDetector;
use quadtrack::{LatestPointFile, StreamServer, TrackerConfig, TrackingPipeline};

const SLICE_WIDTH: u32 = 320;
const SLICE_HEIGHT: u32 = 200;
const MARKER_RGB: [u8; 3] = [128, 200, 64];
const FRAME_INTERVAL: Duration = Duration::from_millis(33);

/// Track a colored marker with the synthetic quadcam rig and stream fused
/// 3D coordinates over TCP.
#[derive(Parser, Debug)]
#[command(name = "quadtrack", version)]
struct Args {
    /// JSON runtime config; defaults are used when the file is absent.
    #[arg(long, default_value = "quadtrack.json")]
    config: PathBuf,

    /// Override the configured listen host.
    #[arg(long)]
    host: Option<String>,

    /// Override the configured listen port.
    #[arg(long)]
    port: Option<u16>,

    /// Override the configured calibration snapshot path.
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Write a synthetic rig calibration to the snapshot path, then run
    /// against it. Without this flag the snapshot must already exist.
    #[arg(long)]
    demo: bool,

    /// Number of capture cycles to run (0 = until the process is killed).
    #[arg(long, default_value_t = 300)]
    cycles: u64,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let level = LevelFilter::from_str(&args.log_level).unwrap_or(LevelFilter::Info);
    init_with_level(level)?;
    run(args)
}

fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let mut config = if args.config.exists() {
        TrackerConfig::load_json(&args.config)?
    } else {
        info!("no config at {}, using defaults", args.config.display());
        TrackerConfig::default()
    };
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(snapshot) = args.snapshot {
        config.snapshot_path = snapshot;
    }

    if args.demo {
        let store = demo_store()?;
        store.persist(&config.snapshot_path)?;
        info!("demo calibration written to {}", config.snapshot_path.display());
    }

    // Missing or corrupt calibration is fatal: never run uncalibrated.
    let store = Arc::new(CalibrationStore::load(&config.snapshot_path)?);

    let server = StreamServer::bind(config.listen_addr())?;
    let device = SyntheticQuadCam::new(SLICE_WIDTH, SLICE_HEIGHT, MARKER_RGB)
        .with_script(demo_script(&store, args.cycles.max(1)));

    let mut pipeline = TrackingPipeline::new(
        FrameSource::new(device),
        MarkerDetector::new(config.marker),
        store,
    )
    .with_broadcaster(server.broadcaster());
    if let Some(rotation) = config.world_rotation {
        pipeline = pipeline.with_world_rotation(rotation);
    }
    if let Some(path) = &config.sink_path {
        pipeline = pipeline.with_sink(Box::new(LatestPointFile::new(path)));
    }

    pipeline.open()?;
    let mut cycle = 0u64;
    while args.cycles == 0 || cycle < args.cycles {
        pipeline.run_cycle()?;
        cycle += 1;
        std::thread::sleep(FRAME_INTERVAL);
    }

    info!("published {} fused point(s) over {cycle} cycle(s)", pipeline.published());
    server.shutdown();
    Ok(())
}

/// Synthetic rig: camera 0 is the reference; the other three sit on short
/// axis-aligned baselines with identical orientation.
fn demo_store() -> Result<CalibrationStore, Box<dyn Error>> {
    let intrinsics = |i: u8| -> Result<CameraIntrinsics, Box<dyn Error>> {
        let k = Matrix3::new(
            400.0,
            0.0,
            SLICE_WIDTH as f64 / 2.0,
            0.0,
            400.0,
            SLICE_HEIGHT as f64 / 2.0,
            0.0,
            0.0,
            1.0,
        );
        Ok(CameraIntrinsics::new(CameraId::new(i)?, k, [0.0; 5]))
    };

    let mut store = CalibrationStore::new();
    for i in 0..CAMERA_COUNT as u8 {
        store.record_intrinsics(intrinsics(i)?);
    }
    for (other, translation) in [
        (1u8, Vector3::new(-6.0, 0.0, 0.0)),
        (2, Vector3::new(6.0, 0.0, 0.0)),
        (3, Vector3::new(0.0, -6.0, 0.0)),
    ] {
        let key = PairKey::new(CameraId::new(0)?, CameraId::new(other)?)?;
        let calib = StereoCalibration::new(
            key,
            intrinsics(0)?,
            intrinsics(other)?,
            Matrix3::identity(),
            translation,
        )?;
        store.record_pair(calib)?;
    }
    Ok(store)
}

/// Project a slow circular marker trajectory through every camera so the
/// rendered discs stay geometrically consistent with the calibration.
fn demo_script(
    store: &CalibrationStore,
    cycles: u64,
) -> Vec<[Option<(i32, i32)>; CAMERA_COUNT]> {
    let mut script = Vec::with_capacity(cycles as usize);
    for t in 0..cycles {
        let theta = t as f64 * std::f64::consts::TAU / 240.0;
        let world = Point3::new(3.0 * theta.cos(), 3.0 * theta.sin(), 40.0);

        let mut positions = [None; CAMERA_COUNT];
        for calib in store.pairs() {
            let p_ref = projection_matrix(
                &calib.reference,
                &Matrix3::identity(),
                &Vector3::zeros(),
            );
            let p_other = projection_matrix(&calib.other, &calib.rotation, &calib.translation);
            positions[calib.key.reference.index()] = Some(project(&p_ref, &world));
            positions[calib.key.other.index()] = Some(project(&p_other, &world));
        }
        script.push(positions);
    }
    script
}

fn project(cam: &nalgebra::Matrix3x4<f64>, world: &Point3<f64>) -> (i32, i32) {
    let x = cam * nalgebra::Vector4::new(world.x, world.y, world.z, 1.0);
    ((x.x / x.z).round() as i32, (x.y / x.z).round() as i32)
}
