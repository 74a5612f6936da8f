pub(crate) mod aggregator;
pub(crate) mod controller;
pub(crate) mod parser;
pub(crate) mod reader;
pub(crate) mod source;

use crate::error::DeviceError;
use chrono::Utc;
use parser::ParsedReading;

/// One record as it came off the device, before parsing.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RawLine {
    pub text: String,
    pub received_at: chrono::DateTime<Utc>,
}

impl RawLine {
    pub(crate) fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            received_at: Utc::now(),
        }
    }
}

/// Messages from the reader task to the controller.
#[derive(Debug)]
pub(crate) enum UpdateMessage {
    Reading {
        timestamp: chrono::DateTime<Utc>,
        reading: ParsedReading,
    },
    DeviceFailed {
        error: DeviceError,
    },
}

/// Where a detection cycle currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CycleState {
    Sampling,
    Classifying,
    Dispatching,
    Done,
    Interrupted,
}
