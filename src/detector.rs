// src/detector.rs - MediaPipe hand landmarker behind a subprocess bridge
//
// The child process is `scripts/hand_detect.py`. It prints `READY` once the
// model is loaded, then answers every frame with a single JSON line.
use anyhow::{Context, Result};
use image::RgbImage;
use nalgebra::Vector3;
use serde::Deserialize;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use tracing::{debug, info, warn};

/// Number of keypoints MediaPipe reports per hand.
pub const HAND_LANDMARK_COUNT: usize = 21;

/// Bone pairs of the MediaPipe hand model, used for drawing.
#[rustfmt::skip]
pub const HAND_CONNECTIONS: [(usize, usize); 21] = [
    (0, 1), (1, 2), (2, 3), (3, 4),
    (0, 5), (5, 6), (6, 7), (7, 8),
    (5, 9), (9, 10), (10, 11), (11, 12),
    (9, 13), (13, 14), (14, 15), (15, 16),
    (13, 17), (0, 17), (17, 18), (18, 19), (19, 20),
];

#[derive(Debug, Clone)]
pub struct HandLandmarks {
    /// Normalized (x, y) with depth in z, relative to the wrist.
    pub points: Vec<Vector3<f64>>,
    pub score: f32,
    pub handedness: String,
}

pub trait HandDetector {
    /// Hands found in `frame`, best first. An empty vector means no hand.
    fn detect(&mut self, frame: &RgbImage) -> Result<Vec<HandLandmarks>>;
}

#[derive(Debug, Clone)]
pub struct DetectorSettings {
    pub python: PathBuf,
    pub script: PathBuf,
    pub max_hands: u32,
    pub min_detection_confidence: f32,
    pub min_tracking_confidence: f32,
}

impl Default for DetectorSettings {
    fn default() -> Self {
        let roots = search_roots();
        let python = locate(Path::new(".venv/bin/python"), &roots)
            .unwrap_or_else(|| PathBuf::from("python3"));
        let script = Path::new("scripts/hand_detect.py");

        Self {
            python,
            script: locate(script, &roots).unwrap_or_else(|| script.to_path_buf()),
            max_hands: 1,
            min_detection_confidence: 0.5,
            min_tracking_confidence: 0.5,
        }
    }
}

/// Directories searched for the detector files: the working directory, the
/// executable's directory and its ancestors, then the crate root.
fn search_roots() -> Vec<PathBuf> {
    let mut roots = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        roots.push(cwd);
    }
    if let Ok(exe) = std::env::current_exe() {
        roots.extend(exe.ancestors().skip(1).map(Path::to_path_buf));
    }
    roots.push(PathBuf::from(env!("CARGO_MANIFEST_DIR")));
    roots
}

/// First existing `root/relative` among `roots`.
fn locate(relative: &Path, roots: &[PathBuf]) -> Option<PathBuf> {
    roots
        .iter()
        .map(|root| root.join(relative))
        .find(|candidate| candidate.exists())
}

#[derive(Deserialize, Debug)]
struct LandmarkJson {
    x: f64,
    y: f64,
    #[serde(default)]
    z: f64,
}

#[derive(Deserialize, Debug)]
struct HandJson {
    #[serde(default)]
    handedness: String,
    #[serde(default)]
    score: f32,
    landmarks: Vec<LandmarkJson>,
}

#[derive(Deserialize, Debug)]
struct DetectionResponse {
    #[serde(default)]
    hands: Vec<HandJson>,
    #[serde(default)]
    error: Option<String>,
}

/// Decode one response line from the detector process.
///
/// A detector-side error is logged and reads as "no hands" so that a single
/// bad frame does not end the session.
pub fn parse_response(line: &str) -> Result<Vec<HandLandmarks>> {
    let response: DetectionResponse = serde_json::from_str(line.trim())
        .with_context(|| format!("Failed to parse detector response: {}", line.trim()))?;

    if let Some(error) = response.error {
        warn!("Hand detector error: {}", error);
        return Ok(Vec::new());
    }

    let hands = response
        .hands
        .into_iter()
        .filter_map(|hand| {
            if hand.landmarks.len() != HAND_LANDMARK_COUNT {
                warn!(
                    "Expected {} landmarks, got {}",
                    HAND_LANDMARK_COUNT,
                    hand.landmarks.len()
                );
                return None;
            }

            Some(HandLandmarks {
                points: hand
                    .landmarks
                    .iter()
                    .map(|lm| Vector3::new(lm.x, lm.y, lm.z))
                    .collect(),
                score: hand.score,
                handedness: hand.handedness,
            })
        })
        .collect();

    Ok(hands)
}

pub struct MediaPipeBridge {
    process: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

impl MediaPipeBridge {
    pub fn spawn(settings: &DetectorSettings) -> Result<Self> {
        if !settings.script.exists() {
            anyhow::bail!(
                "Hand detection script not found at {}",
                settings.script.display()
            );
        }

        info!(
            "Starting MediaPipe hand detector: {} {}",
            settings.python.display(),
            settings.script.display()
        );

        let mut process = Command::new(&settings.python)
            .arg(&settings.script)
            .arg("--max-hands")
            .arg(settings.max_hands.to_string())
            .arg("--min-detection-confidence")
            .arg(settings.min_detection_confidence.to_string())
            .arg("--min-tracking-confidence")
            .arg(settings.min_tracking_confidence.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .with_context(|| format!("Failed to start {}", settings.python.display()))?;

        let stdin = process.stdin.take().context("Detector stdin unavailable")?;
        let stdout = process.stdout.take().context("Detector stdout unavailable")?;

        let mut bridge = Self {
            process,
            stdin,
            stdout: BufReader::new(stdout),
        };

        let ready = bridge.read_line()?;
        if ready.trim() != "READY" {
            anyhow::bail!("Hand detector did not signal ready, got: {}", ready.trim());
        }

        info!("MediaPipe hand detector ready");
        Ok(bridge)
    }

    fn read_line(&mut self) -> Result<String> {
        let mut line = String::new();
        let read = self
            .stdout
            .read_line(&mut line)
            .context("Failed to read from hand detector")?;
        if read == 0 {
            anyhow::bail!("Hand detector process exited");
        }
        Ok(line)
    }

    fn send_frame(&mut self, frame: &RgbImage) -> Result<()> {
        let header = [frame.width(), frame.height(), 3u32];
        for value in header {
            self.stdin.write_all(&value.to_le_bytes())?;
        }
        self.stdin.write_all(frame.as_raw())?;
        self.stdin.flush()?;
        Ok(())
    }
}

impl HandDetector for MediaPipeBridge {
    fn detect(&mut self, frame: &RgbImage) -> Result<Vec<HandLandmarks>> {
        self.send_frame(frame)
            .context("Failed to send frame to hand detector")?;
        let line = self.read_line()?;
        let hands = parse_response(&line)?;

        if let Some(hand) = hands.first() {
            debug!(
                "Hand detected: {} (score={:.2}), wrist=({:.3},{:.3})",
                hand.handedness, hand.score, hand.points[0].x, hand.points[0].y
            );
        }
        Ok(hands)
    }
}

impl Drop for MediaPipeBridge {
    fn drop(&mut self) {
        let _ = self.process.kill();
        let _ = self.process.wait();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hand_json(count: usize, score: f32) -> String {
        let landmarks: Vec<String> = (0..count)
            .map(|i| format!(r#"{{"x":{},"y":0.5,"z":-0.01}}"#, i as f64 / 100.0))
            .collect();
        format!(
            r#"{{"handedness":"Right","score":{},"landmarks":[{}]}}"#,
            score,
            landmarks.join(",")
        )
    }

    #[test]
    fn parses_full_hand() {
        let line = format!(r#"{{"hands":[{}],"error":null}}"#, hand_json(21, 0.9));
        let hands = parse_response(&line).unwrap();

        assert_eq!(hands.len(), 1);
        assert_eq!(hands[0].points.len(), HAND_LANDMARK_COUNT);
        assert_eq!(hands[0].handedness, "Right");
        assert!((hands[0].points[20].x - 0.20).abs() < 1e-12);
        assert!((hands[0].points[3].z + 0.01).abs() < 1e-12);
    }

    #[test]
    fn empty_hand_list_means_no_hand() {
        let hands = parse_response("{\"hands\":[]}\n").unwrap();
        assert!(hands.is_empty());
    }

    #[test]
    fn skips_hands_with_wrong_landmark_count() {
        let line = format!(
            r#"{{"hands":[{},{}]}}"#,
            hand_json(5, 0.9),
            hand_json(21, 0.7)
        );
        let hands = parse_response(&line).unwrap();

        assert_eq!(hands.len(), 1);
        assert!((hands[0].score - 0.7).abs() < 1e-6);
    }

    #[test]
    fn detector_error_reads_as_no_hands() {
        let hands = parse_response(r#"{"hands":[],"error":"bad frame"}"#).unwrap();
        assert!(hands.is_empty());
    }

    #[test]
    fn malformed_response_is_an_error() {
        assert!(parse_response("Traceback (most recent call last):").is_err());
    }

    #[test]
    fn connections_reference_valid_landmarks() {
        assert!(HAND_CONNECTIONS
            .iter()
            .all(|&(a, b)| a < HAND_LANDMARK_COUNT && b < HAND_LANDMARK_COUNT));
    }

    #[test]
    fn locates_script_outside_working_directory() {
        let roots = [
            PathBuf::from("does/not/exist"),
            PathBuf::from(env!("CARGO_MANIFEST_DIR")),
        ];
        let found = locate(Path::new("scripts/hand_detect.py"), &roots).unwrap();

        assert!(found.is_absolute());
        assert!(found.ends_with("scripts/hand_detect.py"));
        assert!(locate(Path::new("scripts/missing.py"), &roots).is_none());
    }

    #[test]
    fn default_script_path_resolves_from_crate_root() {
        let settings = DetectorSettings::default();
        assert!(settings.script.exists());
    }

    #[test]
    fn missing_script_fails_to_spawn() {
        let settings = DetectorSettings {
            script: PathBuf::from("does/not/exist/hand_detect.py"),
            ..DetectorSettings::default()
        };
        assert!(MediaPipeBridge::spawn(&settings).is_err());
    }
}
