use super::TelemetrySink;
use crate::error::TelemetryError;
use crate::http::HttpClient;
use tracing::debug;

/// Channel update endpoint. One numeric field per post.
pub(crate) struct ThingSpeak {
    client: HttpClient,
    url: String,
    write_api_key: String,
    field: String,
}

impl ThingSpeak {
    pub(crate) fn new(
        client: HttpClient,
        url: impl Into<String>,
        write_api_key: impl Into<String>,
        field: impl Into<String>,
    ) -> Self {
        Self {
            client,
            url: url.into(),
            write_api_key: write_api_key.into(),
            field: field.into(),
        }
    }
}

impl TelemetrySink for ThingSpeak {
    async fn post_code(&self, code: u8) -> Result<(), TelemetryError> {
        let fields = vec![
            ("api_key".to_string(), self.write_api_key.clone()),
            (self.field.clone(), code.to_string()),
        ];
        let body = self.client.post_form(&self.url, fields).await?;
        debug!("ThingSpeak response: {}", body.trim());
        check_entry(&body)
    }
}

/// The update endpoint answers with the new entry id, or `0` when it dropped
/// the update (bad key, rate limit).
fn check_entry(body: &str) -> Result<(), TelemetryError> {
    match body.trim().parse::<u64>() {
        Ok(0) => Err(TelemetryError::Rejected),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_entry_is_rejected() {
        assert!(matches!(check_entry("0"), Err(TelemetryError::Rejected)));
        assert!(check_entry("1874\n").is_ok());
        // update.json answers with the entry as JSON
        assert!(check_entry(r#"{"channel_id":1,"entry_id":12}"#).is_ok());
    }
}
