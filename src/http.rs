//! Blocking `ureq` agent driven from async code.
//!
//! Every exchange runs on the blocking pool through [`smol::unblock`], so the
//! executor keeps polling the termination receiver while a request is stuck.
//! Dropping the returned future abandons the request; the pool thread
//! finishes (or hangs) on its own.

use crate::error::HttpError;
use std::io::Read;
use std::time::Duration;

#[derive(Clone)]
pub(crate) struct HttpClient {
    agent: ureq::Agent,
}

impl HttpClient {
    pub(crate) fn new(timeout: Option<Duration>) -> Self {
        let mut builder =
            ureq::AgentBuilder::new().user_agent(&format!("waste-sens/{}", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Self {
            agent: builder.build(),
        }
    }

    pub(crate) async fn get_bytes(&self, url: &str) -> Result<Vec<u8>, HttpError> {
        let request = self.agent.get(url);
        smol::unblock(move || {
            let mut body = Vec::new();
            request
                .call()?
                .into_reader()
                .read_to_end(&mut body)
                .map_err(|e| HttpError::Response(e.to_string()))?;
            Ok(body)
        })
        .await
    }

    pub(crate) async fn post_bytes(
        &self,
        url: &str,
        content_type: &str,
        body: Vec<u8>,
    ) -> Result<String, HttpError> {
        let request = self.agent.post(url).set("Content-Type", content_type);
        smol::unblock(move || read_text(request.send_bytes(&body)?)).await
    }

    pub(crate) async fn post_json(
        &self,
        url: &str,
        body: serde_json::Value,
    ) -> Result<String, HttpError> {
        let request = self.agent.post(url);
        smol::unblock(move || read_text(request.send_json(body)?)).await
    }

    pub(crate) async fn post_form(
        &self,
        url: &str,
        fields: Vec<(String, String)>,
    ) -> Result<String, HttpError> {
        let request = self.agent.post(url);
        smol::unblock(move || {
            let pairs: Vec<(&str, &str)> = fields
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str()))
                .collect();
            read_text(request.send_form(&pairs)?)
        })
        .await
    }
}

fn read_text(response: ureq::Response) -> Result<String, HttpError> {
    response
        .into_string()
        .map_err(|e| HttpError::Response(e.to_string()))
}
