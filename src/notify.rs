pub(crate) mod telegram;
pub(crate) mod thingspeak;

use crate::classify::ClassificationResult;
use crate::error::{NotificationError, TelemetryError};
use chrono::{DateTime, Local};
use futures_lite::future;
use tracing::{info, warn};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// What one dispatch sends out.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct NotificationEvent {
    pub message: String,
    pub image: Vec<u8>,
    pub telemetry_code: u8,
}

impl NotificationEvent {
    pub(crate) fn new(result: &ClassificationResult, now: DateTime<Local>, location: &str) -> Self {
        Self {
            message: format!(
                "Detected: {}\nTime: {}\nLocation: {}",
                result.waste_type,
                now.format(TIME_FORMAT),
                location
            ),
            image: result.image.clone(),
            telemetry_code: result.waste_type.telemetry_code(),
        }
    }
}

pub(crate) trait Messenger {
    async fn send_alert(&self, text: &str, image: &[u8]) -> Result<(), NotificationError>;
}

pub(crate) trait TelemetrySink {
    async fn post_code(&self, code: u8) -> Result<(), TelemetryError>;
}

/// Result of each channel, reported separately.
#[derive(Debug)]
pub(crate) struct DispatchOutcome {
    pub message: Result<(), NotificationError>,
    pub telemetry: Result<(), TelemetryError>,
}

impl DispatchOutcome {
    pub(crate) fn is_complete(&self) -> bool {
        self.message.is_ok() && self.telemetry.is_ok()
    }
}

pub(crate) struct Dispatcher<M, T> {
    messenger: M,
    telemetry: T,
    location: String,
}

impl<M: Messenger, T: TelemetrySink> Dispatcher<M, T> {
    pub(crate) fn new(messenger: M, telemetry: T, location: impl Into<String>) -> Self {
        Self {
            messenger,
            telemetry,
            location: location.into(),
        }
    }

    /// Send to both channels. Neither send waits on or is cancelled by the
    /// other's failure; failures are logged and returned, never retried.
    pub(crate) async fn dispatch(&self, result: &ClassificationResult) -> DispatchOutcome {
        let event = NotificationEvent::new(result, Local::now(), &self.location);

        let (message, telemetry) = future::zip(
            self.messenger.send_alert(&event.message, &event.image),
            self.telemetry.post_code(event.telemetry_code),
        )
        .await;

        match &message {
            Ok(()) => info!("Alert sent: {}", event.message.lines().next().unwrap_or_default()),
            Err(e) => warn!("Alert not sent: {e}"),
        }
        match &telemetry {
            Ok(()) => info!("Telemetry code {} posted", event.telemetry_code),
            Err(e) => warn!("Telemetry code {} not posted: {e}", event.telemetry_code),
        }

        DispatchOutcome { message, telemetry }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::classify::WasteType;
    use crate::error::HttpError;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    pub(crate) struct RecordingMessenger {
        pub sent: Arc<Mutex<Vec<(String, Vec<u8>)>>>,
        pub attempts: Arc<AtomicUsize>,
        pub fail: bool,
        /// Never complete, like an endpoint that stopped answering.
        pub hang: bool,
    }

    impl Messenger for RecordingMessenger {
        async fn send_alert(&self, text: &str, image: &[u8]) -> Result<(), NotificationError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            if self.hang {
                future::pending::<()>().await;
            }
            if self.fail {
                return Err(NotificationError::Transport(HttpError::Transport(
                    "connection refused".into(),
                )));
            }
            self.sent.lock().unwrap().push((text.to_string(), image.to_vec()));
            Ok(())
        }
    }

    #[derive(Clone, Default)]
    pub(crate) struct RecordingTelemetry {
        pub codes: Arc<Mutex<Vec<u8>>>,
        pub fail: bool,
    }

    impl TelemetrySink for RecordingTelemetry {
        async fn post_code(&self, code: u8) -> Result<(), TelemetryError> {
            if self.fail {
                return Err(TelemetryError::Rejected);
            }
            self.codes.lock().unwrap().push(code);
            Ok(())
        }
    }

    fn wet() -> ClassificationResult {
        ClassificationResult {
            waste_type: WasteType::Wet,
            image: vec![0xff, 0xd8, 0xff],
        }
    }

    #[test]
    fn event_message_layout() {
        let now = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        let event = NotificationEvent::new(&wet(), now, "https://maps.example/bin-7");

        assert_eq!(
            event.message,
            "Detected: Wet Waste\nTime: 2024-03-09 14:05:07\nLocation: https://maps.example/bin-7"
        );
        assert_eq!(event.telemetry_code, 1);
        assert_eq!(event.image, vec![0xff, 0xd8, 0xff]);
    }

    #[test]
    fn dry_waste_posts_code_two() {
        let result = ClassificationResult {
            waste_type: WasteType::Dry,
            image: Vec::new(),
        };
        let event = NotificationEvent::new(&result, Local::now(), "here");
        assert_eq!(event.telemetry_code, 2);
        assert!(event.message.starts_with("Detected: Dry Waste\n"));
    }

    #[test]
    fn failed_message_does_not_block_telemetry() {
        let messenger = RecordingMessenger {
            fail: true,
            ..Default::default()
        };
        let telemetry = RecordingTelemetry::default();
        let codes = telemetry.codes.clone();
        let dispatcher = Dispatcher::new(messenger, telemetry, "here");

        let outcome = smol::block_on(dispatcher.dispatch(&wet()));

        assert!(outcome.message.is_err());
        assert!(outcome.telemetry.is_ok());
        assert!(!outcome.is_complete());
        assert_eq!(*codes.lock().unwrap(), vec![1]);
    }

    #[test]
    fn failed_telemetry_does_not_block_message() {
        let messenger = RecordingMessenger::default();
        let sent = messenger.sent.clone();
        let telemetry = RecordingTelemetry {
            fail: true,
            ..Default::default()
        };
        let dispatcher = Dispatcher::new(messenger, telemetry, "here");

        let outcome = smol::block_on(dispatcher.dispatch(&wet()));

        assert!(outcome.message.is_ok());
        assert!(matches!(outcome.telemetry, Err(TelemetryError::Rejected)));
        let sent = sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].0.contains("Detected: Wet Waste"));
    }
}
