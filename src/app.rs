// src/app.rs
use crate::controller::GestureController;
use crate::detector::{HandDetector, HandLandmarks};
use crate::keys::KeyInjector;
use crate::tracking::{FpsCounter, Gesture, HandCenter};
use crate::ui::{OverlayRenderer, OverlayStyle, VideoWidget};
use crate::video::VideoSource;

use anyhow::{Context, Result};
use eframe::egui;
use std::time::{Duration, Instant};
use tracing::{error, info};

#[derive(Debug, Clone)]
pub struct AppSettings {
    pub window_title: String,
    pub countdown: u32,
    pub fps_report_every: u64,
    pub quit_key: egui::Key,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            window_title: "Hand Control".to_string(),
            countdown: 3,
            fps_report_every: 30,
            quit_key: egui::Key::Q,
        }
    }
}

/// Owns every resource of the capture loop. Dropping it releases the camera
/// and stops the detector process.
pub struct HandControlApp<D, I> {
    video_source: VideoSource,
    detector: D,
    controller: GestureController<I>,
    fps: FpsCounter,
    overlay: OverlayRenderer,
    video_widget: VideoWidget,
    settings: AppSettings,

    current_gesture: Gesture,
    current_hands: Vec<HandLandmarks>,
    current_center: Option<HandCenter>,
    stopped: bool,
}

impl<D: HandDetector, I: KeyInjector> HandControlApp<D, I> {
    pub fn new(
        video_source: VideoSource,
        detector: D,
        controller: GestureController<I>,
        settings: AppSettings,
    ) -> Self {
        Self {
            video_source,
            detector,
            controller,
            fps: FpsCounter::new(Instant::now(), settings.fps_report_every),
            overlay: OverlayRenderer::new(OverlayStyle::default()),
            video_widget: VideoWidget::new(),
            settings,
            current_gesture: Gesture::None,
            current_hands: Vec::new(),
            current_center: None,
            stopped: false,
        }
    }

    /// capture -> detect -> classify/debounce/act -> upload for display
    fn step(&mut self, ctx: &egui::Context) -> Result<()> {
        let frame = self.video_source.read_frame()?;

        if let Some(fps) = self.fps.tick(Instant::now()) {
            info!("FPS: {:.2}", fps);
        }

        let hands = self
            .detector
            .detect(&frame)
            .context("Hand detection failed")?;

        let outcome = self.controller.handle_frame(&hands, Instant::now());

        self.current_gesture = outcome.gesture;
        self.current_center = outcome.center;
        self.current_hands = hands;
        self.video_widget.update_frame(ctx, &frame);

        Ok(())
    }

    fn stop(&mut self, ctx: &egui::Context) {
        self.stopped = true;
        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
    }
}

impl<D: HandDetector, I: KeyInjector> eframe::App for HandControlApp<D, I> {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if ctx.input(|i| i.key_pressed(self.settings.quit_key)) {
            info!("Quit key pressed");
            self.stop(ctx);
        }

        if !self.stopped {
            if let Err(e) = self.step(ctx) {
                error!("{:#}", e);
                self.stop(ctx);
            }
        }

        egui::CentralPanel::default()
            .frame(egui::Frame::none().fill(egui::Color32::BLACK))
            .show(ctx, |ui| {
                ui.centered_and_justified(|ui| {
                    if let Some(mapping) = self.video_widget.show(ui) {
                        self.overlay.draw(
                            ui.painter(),
                            &mapping,
                            self.current_gesture,
                            &self.current_hands,
                            self.current_center,
                        );
                    } else {
                        ui.label("Waiting for camera...");
                    }
                });
            });

        if !self.stopped {
            ctx.request_repaint();
        }
    }
}

impl<D, I> Drop for HandControlApp<D, I> {
    fn drop(&mut self) {
        info!("Cleaning up...");
    }
}

pub fn print_instructions() {
    println!("\nStarting hand gesture control...");
    println!("IMPORTANT SETUP STEPS:");
    println!("1. Open the browser game you want to control");
    println!("2. Position the game window next to the camera window");
    println!("3. Click on the game window once to focus it");
    println!("\nGesture Controls:");
    println!("↑ Raise hand UP to JUMP");
    println!("↓ Lower hand DOWN to ROLL");
    println!("← Move hand LEFT to go LEFT");
    println!("→ Move hand RIGHT to go RIGHT");
    println!("Press 'q' in the camera window to quit\n");
}

/// Give the user time to switch focus to the game window.
pub fn countdown(seconds: u32) {
    if seconds == 0 {
        return;
    }
    println!("Starting in:");
    for i in (1..=seconds).rev() {
        println!("{}...", i);
        std::thread::sleep(Duration::from_secs(1));
    }
    println!("Go!");
}
