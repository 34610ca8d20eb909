use std::sync::Arc;

use base64::Engine;
use terminly_core::error::{Result, TerminError};

use super::GoogleAuth;

const GMAIL_API: &str = "https://gmail.googleapis.com/gmail/v1/users/me";

/// Sends the booking confirmation mail through the connected account.
pub struct GmailClient {
    auth: Arc<GoogleAuth>,
    http: reqwest::Client,
}

impl GmailClient {
    pub fn new(auth: Arc<GoogleAuth>) -> Self {
        Self {
            auth,
            http: reqwest::Client::new(),
        }
    }

    /// Send a plain-text email. Returns the Gmail message id.
    pub async fn send(&self, to: &str, subject: &str, body: &str) -> Result<String> {
        let raw = build_raw_message(to, subject, body);
        let url = format!("{GMAIL_API}/messages/send");
        let payload = serde_json::json!({ "raw": raw });

        let token = self.auth.access_token().await?;
        let resp = self
            .http
            .post(&url)
            .bearer_auth(&token)
            .json(&payload)
            .send()
            .await
            .map_err(|e| TerminError::Integration(format!("gmail request failed: {e}")))?;

        let status = resp.status().as_u16();
        let text = resp
            .text()
            .await
            .map_err(|e| TerminError::Integration(format!("gmail response read failed: {e}")))?;

        if status != 200 {
            return Err(TerminError::Http { status, body: text });
        }

        let data: serde_json::Value = serde_json::from_str(&text)
            .map_err(|e| TerminError::Integration(format!("gmail json parse failed: {e}")))?;
        Ok(data["id"].as_str().unwrap_or_default().to_string())
    }
}

fn build_raw_message(to: &str, subject: &str, body: &str) -> String {
    let message = format!(
        "To: {to}\r\nSubject: {subject}\r\nContent-Type: text/plain; charset=utf-8\r\n\r\n{body}"
    );
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(message.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_message_roundtrip() {
        let raw = build_raw_message("a@b.com", "Your appointment", "See you then.");
        let decoded = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(raw)
            .unwrap();
        let text = String::from_utf8(decoded).unwrap();
        assert!(text.starts_with("To: a@b.com\r\n"));
        assert!(text.contains("Subject: Your appointment\r\n"));
        assert!(text.ends_with("\r\n\r\nSee you then."));
    }
}
