use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failures of the serial device. All of them end the current cycle.
#[derive(Debug, Error)]
pub(crate) enum DeviceError {
    #[error("cannot open device {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("device read failed: {0}")]
    Read(#[from] io::Error),

    #[error("device stream closed")]
    Closed,
}

/// Errors from a blocking HTTP exchange.
#[derive(Debug, Error)]
pub(crate) enum HttpError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("server error {status}: {message}")]
    Status { status: u16, message: String },

    #[error("unexpected response: {0}")]
    Response(String),
}

impl From<ureq::Error> for HttpError {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::Status(status, resp) => HttpError::Status {
                status,
                message: resp.into_string().unwrap_or_default(),
            },
            ureq::Error::Transport(e) => HttpError::Transport(e.to_string()),
        }
    }
}

#[derive(Debug, Error)]
pub(crate) enum ClassifierError {
    #[error("image capture failed: {0}")]
    Capture(#[source] HttpError),

    #[error("classification failed: {0}")]
    Classify(#[source] HttpError),
}

#[derive(Debug, Error)]
pub(crate) enum NotificationError {
    #[error("messaging transport failed: {0}")]
    Transport(#[from] HttpError),

    #[error("messaging channel refused {method}: {description}")]
    Refused {
        method: &'static str,
        description: String,
    },
}

#[derive(Debug, Error)]
pub(crate) enum TelemetryError {
    #[error("telemetry transport failed: {0}")]
    Transport(#[from] HttpError),

    #[error("telemetry update rejected")]
    Rejected,
}

/// Why a cycle ended without reaching `Done`.
#[derive(Debug, Error)]
pub(crate) enum CycleError {
    #[error(transparent)]
    Device(#[from] DeviceError),

    #[error(transparent)]
    Classifier(#[from] ClassifierError),

    #[error("cycle interrupted by termination request")]
    Interrupted,
}

#[derive(Debug, Error)]
pub(crate) enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid TOML in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration: {}", .0.join("; "))]
    Invalid(Vec<String>),
}
