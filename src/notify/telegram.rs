use super::Messenger;
use crate::error::{HttpError, NotificationError};
use crate::http::HttpClient;
use serde::Deserialize;
use serde_json::json;

const PHOTO_FILENAME: &str = "detected_waste.jpg";

/// Bot API client bound to a single chat.
pub(crate) struct TelegramBot {
    client: HttpClient,
    api_base: String,
    token: String,
    chat_id: String,
}

#[derive(Debug, Deserialize)]
struct BotReply {
    ok: bool,
    description: Option<String>,
}

impl TelegramBot {
    pub(crate) fn new(
        client: HttpClient,
        api_base: impl Into<String>,
        token: impl Into<String>,
        chat_id: impl Into<String>,
    ) -> Self {
        Self {
            client,
            api_base: api_base.into(),
            token: token.into(),
            chat_id: chat_id.into(),
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!(
            "{}/bot{}/{}",
            self.api_base.trim_end_matches('/'),
            self.token,
            method
        )
    }

    async fn send_message(&self, text: &str) -> Result<(), NotificationError> {
        let body = json!({ "chat_id": self.chat_id, "text": text });
        let reply = self
            .client
            .post_json(&self.method_url("sendMessage"), body)
            .await?;
        check_reply("sendMessage", &reply)
    }

    async fn send_photo(&self, image: &[u8]) -> Result<(), NotificationError> {
        let boundary = format!(
            "waste-sens-{}",
            chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
        );
        let body = photo_form(&boundary, &self.chat_id, image);
        let reply = self
            .client
            .post_bytes(
                &self.method_url("sendPhoto"),
                &format!("multipart/form-data; boundary={boundary}"),
                body,
            )
            .await?;
        check_reply("sendPhoto", &reply)
    }
}

impl Messenger for TelegramBot {
    /// Text first, then the frame, as two Bot API calls.
    async fn send_alert(&self, text: &str, image: &[u8]) -> Result<(), NotificationError> {
        self.send_message(text).await?;
        self.send_photo(image).await
    }
}

fn check_reply(method: &'static str, reply: &str) -> Result<(), NotificationError> {
    let reply: BotReply = serde_json::from_str(reply)
        .map_err(|e| NotificationError::Transport(HttpError::Response(e.to_string())))?;
    if reply.ok {
        Ok(())
    } else {
        Err(NotificationError::Refused {
            method,
            description: reply.description.unwrap_or_default(),
        })
    }
}

fn photo_form(boundary: &str, chat_id: &str, image: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(image.len() + 320);
    body.extend_from_slice(
        format!(
            "--{boundary}\r\n\
             Content-Disposition: form-data; name=\"chat_id\"\r\n\r\n\
             {chat_id}\r\n\
             --{boundary}\r\n\
             Content-Disposition: form-data; name=\"photo\"; filename=\"{PHOTO_FILENAME}\"\r\n\
             Content-Type: image/jpeg\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(image);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    body
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_url_tolerates_trailing_slash() {
        let bot = TelegramBot::new(HttpClient::new(None), "https://api.telegram.org/", "123:abc", "42");
        assert_eq!(
            bot.method_url("sendPhoto"),
            "https://api.telegram.org/bot123:abc/sendPhoto"
        );
    }

    #[test]
    fn photo_form_wraps_image_between_boundaries() {
        let body = photo_form("b0", "1893", &[0xff, 0xd8, 0x00, 0xd9]);
        let head = b"--b0\r\nContent-Disposition: form-data; name=\"chat_id\"\r\n\r\n1893\r\n--b0\r\n";
        assert!(body.starts_with(head));
        assert!(body.ends_with(b"\xff\xd8\x00\xd9\r\n--b0--\r\n"));
        let text = String::from_utf8_lossy(&body);
        assert!(text.contains("name=\"photo\"; filename=\"detected_waste.jpg\"\r\nContent-Type: image/jpeg\r\n\r\n"));
    }

    #[test]
    fn refused_reply_is_an_error() {
        assert!(check_reply("sendMessage", r#"{"ok":true,"result":{}}"#).is_ok());
        match check_reply("sendPhoto", r#"{"ok":false,"description":"chat not found"}"#) {
            Err(NotificationError::Refused {
                method,
                description,
            }) => {
                assert_eq!(method, "sendPhoto");
                assert_eq!(description, "chat not found");
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
