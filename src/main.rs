// src/main.rs
use anyhow::{Context, Result};
use eframe::egui;
use std::time::Instant;
use tracing::{error, info};

use hand_control::app::{self, AppSettings, HandControlApp};
use hand_control::controller::GestureController;
use hand_control::detector::{DetectorSettings, MediaPipeBridge};
use hand_control::keys::{EnigoInjector, KeyTiming};
use hand_control::tracking::GestureConfig;
use hand_control::video::{self, CameraSettings, VideoSource};

fn main() {
    // Initialize logging
    tracing_subscriber::fmt::init();

    if let Err(e) = run() {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    video::list_cameras();

    let camera_settings = CameraSettings::default();
    let video_source = VideoSource::open(&camera_settings).context("Could not open camera")?;
    let (width, height) = video_source.resolution();
    info!("Camera frame rate: {} fps", video_source.frame_rate());

    let detector = MediaPipeBridge::spawn(&DetectorSettings::default())
        .context("Could not start the hand detector")?;

    let injector = EnigoInjector::connect().context("Could not set up key injection")?;

    let settings = AppSettings::default();
    app::print_instructions();
    app::countdown(settings.countdown);

    // The debounce clock starts once the user has had time to focus the game
    let controller = GestureController::new(
        GestureConfig::default(),
        injector,
        KeyTiming::default(),
        Instant::now(),
    );

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title(settings.window_title.clone())
            .with_inner_size([width as f32, height as f32]),
        centered: true,
        ..Default::default()
    };

    let title = settings.window_title.clone();
    eframe::run_native(
        &title,
        options,
        Box::new(move |_cc| {
            Box::new(HandControlApp::new(video_source, detector, controller, settings))
        }),
    )
    .map_err(|e| anyhow::anyhow!("Error running application: {}", e))?;

    Ok(())
}
