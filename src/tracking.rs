// src/tracking.rs - Centroid gesture classification and debounce
use nalgebra::{Vector2, Vector3};
use std::collections::VecDeque;
use std::fmt;
use std::time::{Duration, Instant};

/// Mean landmark position of one hand, in normalized image coordinates.
pub type HandCenter = Vector2<f64>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gesture {
    None,
    Up,
    Down,
    Left,
    Right,
}

impl Gesture {
    pub fn is_directional(self) -> bool {
        self != Gesture::None
    }

    pub fn label(self) -> &'static str {
        match self {
            Gesture::None => "NONE",
            Gesture::Up => "UP",
            Gesture::Down => "DOWN",
            Gesture::Left => "LEFT",
            Gesture::Right => "RIGHT",
        }
    }
}

impl fmt::Display for Gesture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone)]
pub struct GestureConfig {
    pub vertical_threshold: f64,
    pub horizontal_threshold: f64,
    pub cooldown: Duration,
    pub history_size: usize,
    pub required_consecutive: usize,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            vertical_threshold: 0.02,
            horizontal_threshold: 0.02,
            cooldown: Duration::from_millis(50),
            // History of one with one required hit: the cooldown is the only effective gate
            history_size: 1,
            required_consecutive: 1,
        }
    }
}

/// Arithmetic mean of the x/y coordinates of a landmark set.
///
/// Returns `None` for an empty set.
pub fn hand_center(landmarks: &[Vector3<f64>]) -> Option<HandCenter> {
    if landmarks.is_empty() {
        return None;
    }

    let sum = landmarks
        .iter()
        .fold(Vector2::zeros(), |acc: Vector2<f64>, lm| acc + lm.xy());

    Some(sum / landmarks.len() as f64)
}

/// Classify the displacement between two consecutive centers.
///
/// Vertical movement wins over horizontal movement when both exceed their
/// thresholds. Image y grows downwards, so a negative `dy` is `Up`.
pub fn classify_movement(
    previous: Option<HandCenter>,
    current: HandCenter,
    config: &GestureConfig,
) -> Gesture {
    let Some(previous) = previous else {
        return Gesture::None;
    };

    let delta = current - previous;
    let (dx, dy) = (delta.x, delta.y);

    if dy.abs() > config.vertical_threshold {
        return if dy < 0.0 { Gesture::Up } else { Gesture::Down };
    }

    if dx.abs() > config.horizontal_threshold {
        return if dx > 0.0 { Gesture::Right } else { Gesture::Left };
    }

    Gesture::None
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureReading {
    pub gesture: Gesture,
    pub center: HandCenter,
}

/// Tracks a single hand center across frames and labels its movement.
pub struct GestureClassifier {
    config: GestureConfig,
    prev_center: Option<HandCenter>,
}

impl GestureClassifier {
    pub fn new(config: GestureConfig) -> Self {
        Self {
            config,
            prev_center: None,
        }
    }

    /// Label the movement of `landmarks` relative to the last observed hand.
    ///
    /// The first observation only establishes a baseline and reads as
    /// `Gesture::None`. An empty landmark set is ignored and leaves the
    /// baseline untouched.
    pub fn observe(&mut self, landmarks: &[Vector3<f64>]) -> Option<GestureReading> {
        let center = hand_center(landmarks)?;
        let gesture = classify_movement(self.prev_center, center, &self.config);
        self.prev_center = Some(center);

        Some(GestureReading { gesture, center })
    }

    pub fn previous_center(&self) -> Option<HandCenter> {
        self.prev_center
    }
}

/// Cooldown plus run-length gate in front of the key dispatcher.
pub struct GestureDebouncer {
    history: VecDeque<Gesture>,
    history_size: usize,
    required_consecutive: usize,
    cooldown: Duration,
    last_action: Instant,
}

impl GestureDebouncer {
    /// `now` seeds the last-action time, so the first action also waits out
    /// one cooldown.
    pub fn new(config: &GestureConfig, now: Instant) -> Self {
        Self {
            history: VecDeque::with_capacity(config.history_size),
            history_size: config.history_size,
            required_consecutive: config.required_consecutive,
            cooldown: config.cooldown,
            last_action: now,
        }
    }

    /// Decide whether `gesture` may trigger an action at `now`.
    ///
    /// Candidates arriving inside the cooldown are dropped before they reach
    /// the history. A permitted candidate restarts the cooldown.
    pub fn submit(&mut self, gesture: Gesture, now: Instant) -> bool {
        if !gesture.is_directional() {
            return false;
        }

        if now.saturating_duration_since(self.last_action) < self.cooldown {
            return false;
        }

        if !self.record(gesture) {
            return false;
        }

        self.last_action = now;
        true
    }

    fn record(&mut self, gesture: Gesture) -> bool {
        self.history.push_back(gesture);
        while self.history.len() > self.history_size {
            self.history.pop_front();
        }

        let consecutive = self
            .history
            .iter()
            .rev()
            .take_while(|g| **g == gesture)
            .count();

        consecutive >= self.required_consecutive
    }

    pub fn history(&self) -> impl Iterator<Item = Gesture> + '_ {
        self.history.iter().copied()
    }

    pub fn last_action(&self) -> Instant {
        self.last_action
    }
}

/// Frames-per-second over the whole run, reported every `report_every` frames.
pub struct FpsCounter {
    started: Instant,
    frame_count: u64,
    report_every: u64,
}

impl FpsCounter {
    pub fn new(started: Instant, report_every: u64) -> Self {
        Self {
            started,
            frame_count: 0,
            report_every: report_every.max(1),
        }
    }

    pub fn tick(&mut self, now: Instant) -> Option<f64> {
        self.frame_count += 1;
        if self.frame_count % self.report_every != 0 {
            return None;
        }

        let elapsed = now.saturating_duration_since(self.started).as_secs_f64();
        if elapsed <= 0.0 {
            return None;
        }
        Some(self.frame_count as f64 / elapsed)
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}
