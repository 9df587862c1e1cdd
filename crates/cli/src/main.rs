use std::path::PathBuf;
use std::process;

use clap::Parser;
use crossbeam_channel::Receiver;

use moodlight_core::actuation::domain::actuator_driver::ActuatorDriver;
use moodlight_core::actuation::domain::pin_writer::PinWriter;
use moodlight_core::actuation::infrastructure::dry_run_writer::DryRunWriter;
use moodlight_core::actuation::infrastructure::gpioset_writer::GpiosetWriter;
use moodlight_core::capture::infrastructure::command_capture::CommandCapture;
use moodlight_core::config::settings::{Overrides, Settings, ShutdownPolicy};
use moodlight_core::detection::domain::emotion_classifier::EmotionClassifier;
use moodlight_core::detection::domain::face_locator::FaceLocator;
use moodlight_core::detection::infrastructure::deadline_emotion_classifier::DeadlineEmotionClassifier;
use moodlight_core::detection::infrastructure::deadline_face_locator::DeadlineFaceLocator;
use moodlight_core::detection::infrastructure::locator_factory::build_locator;
use moodlight_core::detection::infrastructure::random_emotion_classifier::RandomEmotionClassifier;
use moodlight_core::pipeline::cycle_logger::LogCycleLogger;
use moodlight_core::pipeline::detection_loop::DetectionLoop;
use moodlight_core::shared::constants::CONFIG_ENV_VAR;

/// Lights an LED for the emotion on the face in front of the camera.
#[derive(Parser)]
#[command(name = "moodlight", version)]
struct Cli {
    /// JSON config file (default: <config dir>/moodlight/config.json).
    #[arg(long, env = CONFIG_ENV_VAR)]
    config: Option<PathBuf>,

    /// Milliseconds between detection cycles.
    #[arg(long, env = "MOODLIGHT_INTERVAL_MS")]
    interval_ms: Option<u64>,

    /// Camera device for the fswebcam backend (e.g. /dev/video0).
    #[arg(long, env = "MOODLIGHT_DEVICE")]
    device: Option<String>,

    /// Log GPIO levels instead of driving the pins.
    #[arg(long)]
    dry_run: bool,

    /// Run a single cycle and exit.
    #[arg(long)]
    once: bool,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let overrides = Overrides {
        interval_ms: cli.interval_ms,
        device: cli.device,
        dry_run: cli.dry_run,
    };
    let settings = Settings::load(cli.config.as_deref(), &overrides)?;

    // Installed before backends resolve, since a model download can block.
    let shutdown_rx = install_shutdown_handler()?;

    let locator = build_locator(&settings.locator_options(), Some(Box::new(download_progress)))?;
    let locator: Box<dyn FaceLocator> =
        Box::new(DeadlineFaceLocator::new(locator, settings.stage_timeout()));

    let classifier = match settings.classifier.seed {
        Some(seed) => RandomEmotionClassifier::seeded(seed),
        None => RandomEmotionClassifier::new(),
    };
    let classifier: Box<dyn EmotionClassifier> = Box::new(DeadlineEmotionClassifier::new(
        Box::new(classifier),
        settings.stage_timeout(),
    ));

    let actuator = ActuatorDriver::new(settings.gpio.pin_map.clone(), build_writer(&settings));
    let capture = Box::new(CommandCapture::new(settings.capture_options()));

    let mut detection_loop = DetectionLoop::new(capture, locator, classifier, actuator, shutdown_rx)
        .with_interval(settings.interval())
        .with_classify_all_faces(settings.classify_all_faces)
        .with_logger(Box::new(LogCycleLogger::new()));

    if cli.once {
        let report = detection_loop.run_cycle();
        log::info!(
            "Cycle {}: {} -> {}",
            report.outcome.label(),
            report.detections,
            report.emotion
        );
    } else {
        detection_loop.run();
    }

    let mut actuator = detection_loop.into_actuator();
    match settings.shutdown {
        ShutdownPolicy::AllOff if !cli.once => {
            if let Err(e) = actuator.all_off() {
                log::warn!("Could not switch outputs off on exit: {e}");
            }
        }
        _ => log::debug!("Leaving outputs as they are"),
    }

    Ok(())
}

/// Routes SIGINT/SIGTERM into a channel the detection loop polls. A signal
/// that arrives before the loop starts stays queued and stops it at once.
fn install_shutdown_handler() -> Result<Receiver<()>, ctrlc::Error> {
    let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded(1);
    ctrlc::set_handler(move || {
        log::info!("Shutdown requested");
        let _ = shutdown_tx.try_send(());
    })?;
    Ok(shutdown_rx)
}

fn build_writer(settings: &Settings) -> Box<dyn PinWriter> {
    if settings.gpio.dry_run {
        log::info!("Dry run: GPIO levels are logged, not written");
        return Box::new(DryRunWriter);
    }
    let writer = GpiosetWriter::new(settings.gpio.chip.clone(), settings.gpio_timeout());
    match &settings.gpio.program {
        Some(program) => Box::new(writer.with_program(program.clone())),
        None => Box::new(writer),
    }
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading face detection model... {pct}%");
    } else {
        eprint!("\rDownloading face detection model... {downloaded} bytes");
    }
}
