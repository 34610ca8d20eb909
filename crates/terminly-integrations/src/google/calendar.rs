use std::sync::Arc;

use serde::{Deserialize, Serialize};
use terminly_core::error::{Result, TerminError};
use terminly_core::types::new_id;

use super::GoogleAuth;

const CALENDAR_API: &str = "https://www.googleapis.com/calendar/v3";

/// What the booking flow needs back from an insert: the event id and,
/// when Google granted one, the conferencing link.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedEvent {
    pub id: String,
    pub html_link: Option<String>,
    pub join_link: Option<String>,
}

pub struct CalendarClient {
    auth: Arc<GoogleAuth>,
    http: reqwest::Client,
}

impl CalendarClient {
    pub fn new(auth: Arc<GoogleAuth>) -> Self {
        Self {
            auth,
            http: reqwest::Client::new(),
        }
    }

    pub async fn connected(&self) -> bool {
        self.auth.is_connected().await
    }

    async fn post(&self, url: &str, body: &serde_json::Value) -> Result<serde_json::Value> {
        let token = self.auth.access_token().await?;
        let resp = self
            .http
            .post(url)
            .bearer_auth(&token)
            .json(body)
            .send()
            .await
            .map_err(|e| TerminError::Integration(format!("calendar request failed: {e}")))?;

        let status = resp.status().as_u16();
        let text = resp
            .text()
            .await
            .map_err(|e| TerminError::Integration(format!("calendar response read failed: {e}")))?;

        if status != 200 {
            return Err(TerminError::Http { status, body: text });
        }

        serde_json::from_str(&text)
            .map_err(|e| TerminError::Integration(format!("calendar json parse failed: {e}")))
    }

    /// True iff no event on the primary calendar overlaps the given
    /// RFC3339 interval.
    pub async fn is_free(&self, start: &str, end: &str) -> Result<bool> {
        let url = format!("{CALENDAR_API}/freeBusy");
        let body = serde_json::json!({
            "timeMin": start,
            "timeMax": end,
            "items": [{ "id": "primary" }],
        });

        let data = self.post(&url, &body).await?;
        let busy = data["calendars"]["primary"]["busy"]
            .as_array()
            .cloned()
            .unwrap_or_default();
        Ok(busy.is_empty())
    }

    /// Insert an event with a generated Meet link and one attendee.
    pub async fn create_event(
        &self,
        summary: &str,
        start: &str,
        end: &str,
        attendee_email: &str,
    ) -> Result<CreatedEvent> {
        let url = format!("{CALENDAR_API}/calendars/primary/events?conferenceDataVersion=1");
        let body = serde_json::json!({
            "summary": summary,
            "start": { "dateTime": start },
            "end": { "dateTime": end },
            "attendees": [{ "email": attendee_email }],
            "conferenceData": {
                "createRequest": {
                    "requestId": new_id(),
                    "conferenceSolutionKey": { "type": "hangoutsMeet" },
                }
            },
        });

        let data = self.post(&url, &body).await?;
        Ok(parse_created(&data))
    }
}

fn parse_created(v: &serde_json::Value) -> CreatedEvent {
    CreatedEvent {
        id: v["id"].as_str().unwrap_or_default().to_string(),
        html_link: v["htmlLink"].as_str().map(|s| s.to_string()),
        join_link: parse_join_link(v),
    }
}

/// The Meet link lives in `hangoutLink` on current API responses; older
/// ones only carry conference entry points.
fn parse_join_link(v: &serde_json::Value) -> Option<String> {
    if let Some(link) = v["hangoutLink"].as_str() {
        return Some(link.to_string());
    }

    v["conferenceData"]["entryPoints"]
        .as_array()?
        .iter()
        .find(|ep| ep["entryPointType"].as_str() == Some("video"))
        .and_then(|ep| ep["uri"].as_str())
        .map(|s| s.to_string())
}
