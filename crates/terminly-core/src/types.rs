use serde::{Deserialize, Serialize};

/// Generate a ULID-like ID using timestamp + random bytes.
/// Uses only std — no external ULID crate needed.
pub fn new_id() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};

    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_millis() as u64;

    let random: u64 = {
        // Simple random from /dev/urandom or fallback
        let mut buf = [0u8; 8];
        if let Ok(mut f) = std::fs::File::open("/dev/urandom") {
            use std::io::Read;
            let _ = f.read_exact(&mut buf);
        } else {
            // Fallback: use timestamp nanos as entropy
            buf = ts.to_le_bytes();
        }
        u64::from_le_bytes(buf)
    };

    format!("{ts:012x}{random:016x}")
}

/// Unix epoch timestamp in seconds.
pub fn now_unix() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64
}

/// Where in the booking conversation a session currently is.
///
/// The collection stages advance strictly forward; the only backward
/// moves are a slot conflict (back to `AwaitingTime`) and a missing
/// field discovered in `Creating` (back to that field's stage).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Start,
    AwaitingDate,
    AwaitingTime,
    AwaitingDuration,
    AwaitingEmail,
    Creating,
    Completed,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::AwaitingDate => "awaiting_date",
            Self::AwaitingTime => "awaiting_time",
            Self::AwaitingDuration => "awaiting_duration",
            Self::AwaitingEmail => "awaiting_email",
            Self::Creating => "creating",
            Self::Completed => "completed",
        }
    }
}

/// Partially filled booking record. Date and time keep the exact
/// substring the user typed; fields are only ever set, never cleared,
/// within a session's lifetime.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookingData {
    pub date: Option<String>,
    pub time: Option<String>,
    pub duration_minutes: Option<u32>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl BookingData {
    /// The stage of the first unset required field, in collection order.
    /// `None` means the record is complete enough to book.
    pub fn first_missing(&self) -> Option<Stage> {
        if self.date.is_none() {
            Some(Stage::AwaitingDate)
        } else if self.time.is_none() {
            Some(Stage::AwaitingTime)
        } else if self.duration_minutes.is_none() {
            Some(Stage::AwaitingDuration)
        } else if self.email.is_none() {
            Some(Stage::AwaitingEmail)
        } else {
            None
        }
    }
}

/// Per-user conversational state, kept only in process memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub stage: Stage,
    pub data: BookingData,
    pub created_at: i64,
}

impl Session {
    pub fn new() -> Self {
        Self {
            stage: Stage::Start,
            data: BookingData::default(),
            created_at: now_unix(),
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Inbound CRM lead payload. Field names follow the webhook's camelCase.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Lead {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_missing_order() {
        let mut data = BookingData::default();
        assert_eq!(data.first_missing(), Some(Stage::AwaitingDate));

        data.date = Some("08.11.2025".to_string());
        assert_eq!(data.first_missing(), Some(Stage::AwaitingTime));

        data.time = Some("10:00".to_string());
        assert_eq!(data.first_missing(), Some(Stage::AwaitingDuration));

        data.duration_minutes = Some(30);
        assert_eq!(data.first_missing(), Some(Stage::AwaitingEmail));

        data.email = Some("a@b.com".to_string());
        assert_eq!(data.first_missing(), None);
    }

    #[test]
    fn test_missing_duration_only() {
        let data = BookingData {
            date: Some("08.11.2025".to_string()),
            time: Some("10:00".to_string()),
            email: Some("a@b.com".to_string()),
            ..Default::default()
        };
        assert_eq!(data.first_missing(), Some(Stage::AwaitingDuration));
    }

    #[test]
    fn test_new_session_starts_empty() {
        let session = Session::new();
        assert_eq!(session.stage, Stage::Start);
        assert!(session.data.date.is_none());
    }
}
