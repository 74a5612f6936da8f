//! Camera capture and waste classification.
//!
//! Both run outside the serial stream: once a window fills, one frame is
//! fetched from the bin camera and handed to the classifier service.

use crate::error::ClassifierError;
use crate::http::HttpClient;
use serde::Deserialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WasteType {
    Wet,
    Dry,
    /// Nothing detected in the frame.
    Unknown,
}

impl WasteType {
    pub(crate) fn from_label(label: Option<&str>) -> Self {
        match label.map(str::trim) {
            None | Some("") => WasteType::Unknown,
            Some(l) if l.eq_ignore_ascii_case("none") => WasteType::Unknown,
            Some(l) if l.contains("Wet") => WasteType::Wet,
            Some(_) => WasteType::Dry,
        }
    }

    pub(crate) fn is_resolved(self) -> bool {
        self != WasteType::Unknown
    }

    /// Field value posted to telemetry.
    pub(crate) fn telemetry_code(self) -> u8 {
        match self {
            WasteType::Wet => 1,
            _ => 2,
        }
    }
}

impl fmt::Display for WasteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WasteType::Wet => write!(f, "Wet Waste"),
            WasteType::Dry => write!(f, "Dry Waste"),
            WasteType::Unknown => write!(f, "Unknown"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ClassificationResult {
    pub waste_type: WasteType,
    pub image: Vec<u8>,
}

pub(crate) trait ImageSource {
    async fn capture(&self) -> Result<Vec<u8>, ClassifierError>;
}

pub(crate) trait Classifier {
    async fn classify(&self, image: Vec<u8>) -> Result<ClassificationResult, ClassifierError>;
}

/// ESP32-CAM style endpoint returning one JPEG per GET.
pub(crate) struct HttpCamera {
    client: HttpClient,
    url: String,
}

impl HttpCamera {
    pub(crate) fn new(client: HttpClient, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

impl ImageSource for HttpCamera {
    async fn capture(&self) -> Result<Vec<u8>, ClassifierError> {
        self.client
            .get_bytes(&self.url)
            .await
            .map_err(ClassifierError::Capture)
    }
}

#[derive(Debug, Deserialize)]
struct LabelResponse {
    label: Option<String>,
}

/// Inference service taking a JPEG body and answering `{"label": ...}`.
pub(crate) struct HttpClassifier {
    client: HttpClient,
    url: String,
}

impl HttpClassifier {
    pub(crate) fn new(client: HttpClient, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

impl Classifier for HttpClassifier {
    async fn classify(&self, image: Vec<u8>) -> Result<ClassificationResult, ClassifierError> {
        let body = self
            .client
            .post_bytes(&self.url, "image/jpeg", image.clone())
            .await
            .map_err(ClassifierError::Classify)?;
        let waste_type = parse_label_response(&body)?;
        Ok(ClassificationResult { waste_type, image })
    }
}

fn parse_label_response(body: &str) -> Result<WasteType, ClassifierError> {
    let response: LabelResponse = serde_json::from_str(body).map_err(|e| {
        ClassifierError::Classify(crate::error::HttpError::Response(e.to_string()))
    })?;
    Ok(WasteType::from_label(response.label.as_deref()))
}
