use reqwest::Client;
use terminly_core::error::{Result, TerminError};

const TWILIO_API: &str = "https://api.twilio.com/2010-04-01";

/// Outbound SMS via the Twilio Messages API.
pub struct TwilioClient {
    client: Client,
    account_sid: String,
    auth_token: String,
    from_number: String,
}

impl TwilioClient {
    pub fn new(account_sid: String, auth_token: String, from_number: String) -> Self {
        Self {
            client: Client::new(),
            account_sid,
            auth_token,
            from_number,
        }
    }

    /// Send one SMS. Returns the message SID as the delivery receipt.
    pub async fn send(&self, to: &str, body: &str) -> Result<String> {
        let url = format!("{TWILIO_API}/Accounts/{}/Messages.json", self.account_sid);
        let params = [
            ("From", self.from_number.as_str()),
            ("To", to),
            ("Body", body),
        ];

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&params)
            .send()
            .await
            .map_err(|e| TerminError::Sms(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TerminError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let data: serde_json::Value = response
            .json()
            .await
            .map_err(|e| TerminError::Sms(e.to_string()))?;

        data["sid"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| TerminError::Sms("missing sid in response".to_string()))
    }
}
