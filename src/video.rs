// src/video.rs - Webcam frame source
use image::RgbImage;
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{
    CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType, Resolution,
};
use nokhwa::Camera;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Failed to open camera {index}: {reason}")]
    Open { index: u32, reason: String },

    #[error("Failed to open camera stream: {0}")]
    Stream(String),

    #[error("Failed to capture frame: {0}")]
    Frame(String),

    #[error("Failed to decode frame: {0}")]
    Decode(String),
}

#[derive(Debug, Clone)]
pub struct CameraSettings {
    pub index: u32,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    /// Mirror frames so the preview behaves like a selfie view.
    pub mirror: bool,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            index: 0,
            width: 640,
            height: 480,
            fps: 30,
            mirror: true,
        }
    }
}

impl CameraSettings {
    pub fn requested_format(&self) -> RequestedFormat<'static> {
        let format = CameraFormat::new(
            Resolution::new(self.width, self.height),
            FrameFormat::MJPEG,
            self.fps,
        );
        // The driver may not offer the exact size; take the closest and report it
        RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(format))
    }
}

/// Log every camera the native backend can see.
pub fn list_cameras() {
    match nokhwa::query(nokhwa::utils::ApiBackend::Auto) {
        Ok(cameras) => {
            info!("Found {} camera(s)", cameras.len());
            for (i, camera) in cameras.iter().enumerate() {
                info!("  [{}] {}", i, camera.human_name());
            }
        }
        Err(e) => {
            warn!("Failed to query cameras: {}", e);
        }
    }
}

/// An open camera stream. The stream is stopped when this is dropped.
pub struct VideoSource {
    camera: Camera,
    mirror: bool,
}

impl VideoSource {
    pub fn open(settings: &CameraSettings) -> Result<Self, CaptureError> {
        debug!("Opening camera index {}", settings.index);

        let index = CameraIndex::Index(settings.index);
        let mut camera =
            Camera::new(index, settings.requested_format()).map_err(|e| CaptureError::Open {
                index: settings.index,
                reason: e.to_string(),
            })?;

        camera
            .open_stream()
            .map_err(|e| CaptureError::Stream(e.to_string()))?;

        let source = Self {
            camera,
            mirror: settings.mirror,
        };
        let (width, height) = source.resolution();
        info!("Camera Resolution: {}x{}", width, height);

        Ok(source)
    }

    /// Actual capture size, which may differ from the requested one.
    pub fn resolution(&self) -> (u32, u32) {
        let resolution = self.camera.resolution();
        (resolution.width(), resolution.height())
    }

    pub fn frame_rate(&self) -> u32 {
        self.camera.frame_rate()
    }

    /// Block until the next frame is available and return it as RGB.
    pub fn read_frame(&mut self) -> Result<RgbImage, CaptureError> {
        let buffer = self
            .camera
            .frame()
            .map_err(|e| CaptureError::Frame(e.to_string()))?;

        let decoded = buffer
            .decode_image::<RgbFormat>()
            .map_err(|e| CaptureError::Decode(e.to_string()))?;

        Ok(prepare_frame(decoded, self.mirror))
    }
}

impl Drop for VideoSource {
    fn drop(&mut self) {
        debug!("Releasing camera");
        let _ = self.camera.stop_stream();
    }
}

pub fn prepare_frame(frame: RgbImage, mirror: bool) -> RgbImage {
    if mirror {
        image::imageops::flip_horizontal(&frame)
    } else {
        frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn default_request_is_vga() {
        let settings = CameraSettings::default();
        assert_eq!((settings.width, settings.height), (640, 480));
        assert_eq!(settings.index, 0);
    }

    #[test]
    fn mirroring_flips_columns() {
        let mut frame = RgbImage::new(3, 1);
        frame.put_pixel(0, 0, Rgb([255, 0, 0]));
        frame.put_pixel(2, 0, Rgb([0, 0, 255]));

        let mirrored = prepare_frame(frame.clone(), true);
        assert_eq!(mirrored.get_pixel(0, 0), &Rgb([0, 0, 255]));
        assert_eq!(mirrored.get_pixel(2, 0), &Rgb([255, 0, 0]));

        let untouched = prepare_frame(frame.clone(), false);
        assert_eq!(untouched, frame);
    }
}
