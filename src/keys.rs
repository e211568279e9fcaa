// src/keys.rs - Gesture to arrow-key injection
use crate::tracking::Gesture;
use enigo::{Direction, Enigo, Key, Keyboard, Settings};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum KeyPressError {
    #[error("Could not connect to the keyboard backend: {0}")]
    Connection(String),

    #[error("Failed to press {key:?}: {reason}")]
    Press { key: Key, reason: String },

    #[error("Failed to release {key:?}, it may still be held down: {reason}")]
    Release { key: Key, reason: String },
}

/// Low-level key event sink.
pub trait KeyInjector {
    fn press(&mut self, key: Key) -> Result<(), KeyPressError>;
    fn release(&mut self, key: Key) -> Result<(), KeyPressError>;
}

pub struct EnigoInjector {
    enigo: Enigo,
}

impl EnigoInjector {
    pub fn connect() -> Result<Self, KeyPressError> {
        let enigo = Enigo::new(&Settings::default())
            .map_err(|e| KeyPressError::Connection(e.to_string()))?;
        Ok(Self { enigo })
    }
}

impl KeyInjector for EnigoInjector {
    fn press(&mut self, key: Key) -> Result<(), KeyPressError> {
        self.enigo
            .key(key, Direction::Press)
            .map_err(|e| KeyPressError::Press {
                key,
                reason: e.to_string(),
            })
    }

    fn release(&mut self, key: Key) -> Result<(), KeyPressError> {
        self.enigo
            .key(key, Direction::Release)
            .map_err(|e| KeyPressError::Release {
                key,
                reason: e.to_string(),
            })
    }
}

#[derive(Debug, Clone)]
pub struct KeyTiming {
    /// Time the key is held down.
    pub hold: Duration,
    /// Pause after release before control returns to the loop.
    pub settle: Duration,
}

impl Default for KeyTiming {
    fn default() -> Self {
        Self {
            hold: Duration::from_millis(100),
            settle: Duration::from_millis(50),
        }
    }
}

pub fn gesture_key(gesture: Gesture) -> Option<Key> {
    match gesture {
        Gesture::Up => Some(Key::UpArrow),
        Gesture::Down => Some(Key::DownArrow),
        Gesture::Left => Some(Key::LeftArrow),
        Gesture::Right => Some(Key::RightArrow),
        Gesture::None => None,
    }
}

pub struct KeyDispatcher<I> {
    injector: I,
    timing: KeyTiming,
}

impl<I: KeyInjector> KeyDispatcher<I> {
    pub fn new(injector: I, timing: KeyTiming) -> Self {
        Self { injector, timing }
    }

    /// Tap the arrow key for `gesture`. Blocks for the hold and settle time.
    ///
    /// Returns the key that was tapped, or `None` when the gesture has no key.
    pub fn dispatch(&mut self, gesture: Gesture) -> Result<Option<Key>, KeyPressError> {
        let Some(key) = gesture_key(gesture) else {
            return Ok(None);
        };

        self.injector.press(key)?;
        pause(self.timing.hold);
        // One retry: a lost release leaves the key held on the host
        if self.injector.release(key).is_err() {
            self.injector.release(key)?;
        }
        pause(self.timing.settle);

        Ok(Some(key))
    }

    pub fn injector(&self) -> &I {
        &self.injector
    }
}

fn pause(duration: Duration) {
    if !duration.is_zero() {
        std::thread::sleep(duration);
    }
}
