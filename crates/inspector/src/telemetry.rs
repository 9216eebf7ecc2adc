//! Optional usage telemetry.
//!
//! Nothing in the viewport depends on these calls succeeding. Throttled
//! channels drop events that arrive within the configured interval.

use std::cell::RefCell;
use std::time::{Duration, Instant};

use crate::settings::TelemetrySettings;

/// Destination for usage events
pub trait TelemetrySink {
    fn track(&self, category: &str, action: &str, label: Option<&str>);
}

/// At most one pass per interval
#[derive(Debug)]
pub struct Throttle {
    interval: Duration,
    last: Option<Instant>,
}

impl Throttle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    /// Returns true (and arms the throttle) when an event may pass at `now`.
    pub fn ready(&mut self, now: Instant) -> bool {
        let pass = self
            .last
            .map_or(true, |last| now.saturating_duration_since(last) >= self.interval);
        if pass {
            self.last = Some(now);
        }
        pass
    }
}

/// Throttled event channels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    TransformEntity,
    ChangeEditorCamera,
}

/// Telemetry front end shared through the editor session
pub struct Telemetry {
    sink: Option<Box<dyn TelemetrySink>>,
    transform: RefCell<Throttle>,
    camera: RefCell<Throttle>,
}

impl Telemetry {
    pub fn new(sink: Option<Box<dyn TelemetrySink>>, settings: &TelemetrySettings) -> Self {
        let sink = if settings.enabled { sink } else { None };
        let interval = Duration::from_millis(settings.throttle_ms);
        Self {
            sink,
            transform: RefCell::new(Throttle::new(interval)),
            camera: RefCell::new(Throttle::new(interval)),
        }
    }

    /// Unthrottled viewport event
    pub fn track(&self, action: &str, label: Option<&str>) {
        if let Some(sink) = &self.sink {
            sink.track("Viewport", action, label);
        }
    }

    pub fn track_throttled(&self, channel: Channel, label: Option<&str>) {
        self.track_throttled_at(channel, label, Instant::now());
    }

    pub fn track_throttled_at(&self, channel: Channel, label: Option<&str>, now: Instant) {
        if self.sink.is_none() {
            return;
        }
        let (throttle, action) = match channel {
            Channel::TransformEntity => (&self.transform, "transformEntity"),
            Channel::ChangeEditorCamera => (&self.camera, "changeEditorCamera"),
        };
        if throttle.borrow_mut().ready(now) {
            self.track(action, label);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    struct Recorder(Rc<RefCell<Vec<String>>>);

    impl TelemetrySink for Recorder {
        fn track(&self, _category: &str, action: &str, _label: Option<&str>) {
            self.0.borrow_mut().push(action.to_string());
        }
    }

    fn recorder(settings: &TelemetrySettings) -> (Telemetry, Rc<RefCell<Vec<String>>>) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let telemetry = Telemetry::new(Some(Box::new(Recorder(log.clone()))), settings);
        (telemetry, log)
    }

    #[test]
    fn test_throttle_passes_once_per_interval() {
        let mut t = Throttle::new(Duration::from_millis(100));
        let start = Instant::now();
        assert!(t.ready(start));
        assert!(!t.ready(start + Duration::from_millis(50)));
        assert!(t.ready(start + Duration::from_millis(100)));
    }

    #[test]
    fn test_channels_throttle_independently() {
        let (telemetry, log) = recorder(&TelemetrySettings::default());
        let now = Instant::now();
        telemetry.track_throttled_at(Channel::TransformEntity, Some("translate"), now);
        telemetry.track_throttled_at(Channel::TransformEntity, Some("translate"), now);
        telemetry.track_throttled_at(Channel::ChangeEditorCamera, None, now);
        assert_eq!(*log.borrow(), vec!["transformEntity", "changeEditorCamera"]);
    }

    #[test]
    fn test_disabled_settings_drop_everything() {
        let settings = TelemetrySettings {
            enabled: false,
            ..Default::default()
        };
        let (telemetry, log) = recorder(&settings);
        telemetry.track("toggleEditor", Some("true"));
        telemetry.track_throttled(Channel::TransformEntity, None);
        assert!(log.borrow().is_empty());
    }
}
