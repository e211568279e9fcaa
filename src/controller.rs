// src/controller.rs - One loop iteration: classify, debounce, act
use crate::detector::HandLandmarks;
use crate::keys::{KeyDispatcher, KeyInjector, KeyPressError, KeyTiming};
use crate::tracking::{Gesture, GestureClassifier, GestureConfig, GestureDebouncer, HandCenter};
use enigo::Key;
use std::time::Instant;
use tracing::{info, warn};

#[derive(Debug)]
pub struct FrameOutcome {
    pub gesture: Gesture,
    pub center: Option<HandCenter>,
    /// Present only when the debouncer let the gesture through.
    pub action: Option<Result<Key, KeyPressError>>,
}

impl FrameOutcome {
    fn idle() -> Self {
        Self {
            gesture: Gesture::None,
            center: None,
            action: None,
        }
    }
}

pub struct GestureController<I> {
    classifier: GestureClassifier,
    debouncer: GestureDebouncer,
    dispatcher: KeyDispatcher<I>,
}

impl<I: KeyInjector> GestureController<I> {
    pub fn new(config: GestureConfig, injector: I, timing: KeyTiming, now: Instant) -> Self {
        let debouncer = GestureDebouncer::new(&config, now);
        Self {
            classifier: GestureClassifier::new(config),
            debouncer,
            dispatcher: KeyDispatcher::new(injector, timing),
        }
    }

    /// Run the control logic for the hands seen in one frame.
    ///
    /// Only the first hand is tracked. Key failures are logged and returned
    /// in the outcome; they never stop the loop.
    pub fn handle_frame(&mut self, hands: &[HandLandmarks], now: Instant) -> FrameOutcome {
        let Some(hand) = hands.first() else {
            return FrameOutcome::idle();
        };

        let Some(reading) = self.classifier.observe(&hand.points) else {
            return FrameOutcome::idle();
        };

        let mut outcome = FrameOutcome {
            gesture: reading.gesture,
            center: Some(reading.center),
            action: None,
        };

        if self.debouncer.submit(reading.gesture, now) {
            info!("{}!", reading.gesture);
            let action = match self.dispatcher.dispatch(reading.gesture) {
                Ok(Some(key)) => Ok(key),
                Ok(None) => return outcome,
                Err(e) => {
                    warn!("Error simulating keypress: {}", e);
                    Err(e)
                }
            };
            outcome.action = Some(action);
        }

        outcome
    }

    pub fn classifier(&self) -> &GestureClassifier {
        &self.classifier
    }

    pub fn dispatcher(&self) -> &KeyDispatcher<I> {
        &self.dispatcher
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::tests::{instant_timing, Event, RecordingInjector};
    use nalgebra::Vector3;
    use std::time::Duration;

    fn hand_at(x: f64, y: f64) -> HandLandmarks {
        HandLandmarks {
            points: vec![Vector3::new(x, y, 0.0); 21],
            score: 0.9,
            handedness: "Right".to_string(),
        }
    }

    fn controller(
        injector: RecordingInjector,
        t0: Instant,
    ) -> GestureController<RecordingInjector> {
        GestureController::new(GestureConfig::default(), injector, instant_timing(), t0)
    }

    #[test]
    fn no_hand_is_idle() {
        let t0 = Instant::now();
        let mut ctl = controller(RecordingInjector::default(), t0);

        let outcome = ctl.handle_frame(&[], t0 + Duration::from_secs(1));

        assert_eq!(outcome.gesture, Gesture::None);
        assert!(outcome.center.is_none());
        assert!(outcome.action.is_none());
        assert!(ctl.classifier().previous_center().is_none());
    }

    #[test]
    fn movement_after_baseline_taps_key() {
        let t0 = Instant::now();
        let mut ctl = controller(RecordingInjector::default(), t0);

        let first = ctl.handle_frame(&[hand_at(0.5, 0.5)], t0 + Duration::from_millis(100));
        assert_eq!(first.gesture, Gesture::None);
        assert!(first.action.is_none());

        let second = ctl.handle_frame(&[hand_at(0.5, 0.4)], t0 + Duration::from_millis(200));
        assert_eq!(second.gesture, Gesture::Up);
        assert!(matches!(second.action, Some(Ok(Key::UpArrow))));
        assert_eq!(
            ctl.dispatcher().injector().events,
            vec![Event::Press(Key::UpArrow), Event::Release(Key::UpArrow)]
        );
    }

    #[test]
    fn only_first_hand_is_tracked() {
        let t0 = Instant::now();
        let mut ctl = controller(RecordingInjector::default(), t0);

        ctl.handle_frame(&[hand_at(0.5, 0.5), hand_at(0.1, 0.1)], t0);
        let outcome = ctl.handle_frame(
            &[hand_at(0.6, 0.5), hand_at(0.9, 0.9)],
            t0 + Duration::from_millis(100),
        );

        assert_eq!(outcome.gesture, Gesture::Right);
    }

    #[test]
    fn repeat_inside_cooldown_is_classified_but_not_acted_on() {
        let t0 = Instant::now();
        let mut ctl = controller(RecordingInjector::default(), t0);

        ctl.handle_frame(&[hand_at(0.5, 0.5)], t0);
        let t1 = t0 + Duration::from_millis(100);
        assert!(ctl.handle_frame(&[hand_at(0.5, 0.6)], t1).action.is_some());

        let repeat = ctl.handle_frame(&[hand_at(0.5, 0.7)], t1 + Duration::from_millis(20));
        assert_eq!(repeat.gesture, Gesture::Down);
        assert!(repeat.action.is_none());
        assert_eq!(ctl.dispatcher().injector().events.len(), 2);
    }

    #[test]
    fn key_failure_does_not_stop_processing() {
        let t0 = Instant::now();
        let injector = RecordingInjector {
            fail_press: true,
            ..Default::default()
        };
        let mut ctl = controller(injector, t0);

        ctl.handle_frame(&[hand_at(0.5, 0.5)], t0);
        let failed = ctl.handle_frame(&[hand_at(0.4, 0.5)], t0 + Duration::from_millis(100));
        assert!(matches!(failed.action, Some(Err(KeyPressError::Press { .. }))));

        // The failed attempt still restarts the cooldown
        let next = ctl.handle_frame(&[hand_at(0.3, 0.5)], t0 + Duration::from_millis(120));
        assert_eq!(next.gesture, Gesture::Left);
        assert!(next.action.is_none());
    }
}
