use std::sync::Arc;

use terminly_core::config::Config;
use terminly_core::error::Result;
use terminly_core::phone;
use terminly_core::types::{BookingData, Lead, Session, Stage};

use crate::extract;
use crate::gateway::{Calendar, Completion, MailSender, SmsSender};
use crate::session::SessionStore;
use crate::slot;

const TRIGGER_WORDS: &[&str] = &["termin", "appointment", "meeting", "book"];

const REPLY_ASK_DATE: &str =
    "Great, let's find you a slot. What date works for you? (DD.MM.YYYY)";
const REPLY_DATE_RETRY: &str =
    "Sorry, I couldn't spot a date in that. Please send it as DD.MM.YYYY, e.g. 08.11.2025.";
const REPLY_TIME_RETRY: &str =
    "Sorry, I couldn't spot a time in that. Please send it like 10:00.";
const REPLY_DURATION_RETRY: &str =
    "How many minutes should I reserve? A plain number like 30 works best.";
const REPLY_EMAIL_RETRY: &str =
    "I couldn't spot an email address in that. Where should the invitation go?";
const REPLY_NOT_CONNECTED: &str =
    "The calendar isn't connected yet, so I can't book anything right now. Please try again later.";
const REPLY_ERROR: &str =
    "Sorry, something went wrong while booking. Could you send your email address again?";
const REPLY_COMPLETED: &str =
    "Your appointment is already booked. If you need anything else, just start a new request.";
const REPLY_SMALLTALK_FALLBACK: &str =
    "Sorry, I'm having trouble answering right now. Say \"appointment\" whenever you'd like to book a slot.";
const NO_LINK: &str = "no link available";

/// One row per collection stage: how to pull the field out of the text,
/// where to put it, what to say on failure, and what to ask for next.
/// The linear flow is this table, not a pile of per-stage branches.
struct FieldRule {
    stage: Stage,
    next: Stage,
    extract: fn(&str) -> Option<String>,
    store: fn(&mut BookingData, &str) -> bool,
    reprompt: &'static str,
    ask_next: fn(&BookingData) -> String,
}

const RULES: &[FieldRule] = &[
    FieldRule {
        stage: Stage::AwaitingDate,
        next: Stage::AwaitingTime,
        extract: extract::extract_date,
        store: store_date,
        reprompt: REPLY_DATE_RETRY,
        ask_next: ask_time,
    },
    FieldRule {
        stage: Stage::AwaitingTime,
        next: Stage::AwaitingDuration,
        extract: extract::extract_time,
        store: store_time,
        reprompt: REPLY_TIME_RETRY,
        ask_next: ask_duration,
    },
    FieldRule {
        stage: Stage::AwaitingDuration,
        next: Stage::AwaitingEmail,
        extract: extract::extract_duration,
        store: store_duration,
        reprompt: REPLY_DURATION_RETRY,
        ask_next: ask_email,
    },
    FieldRule {
        stage: Stage::AwaitingEmail,
        next: Stage::Creating,
        extract: extract::extract_email,
        store: store_email,
        reprompt: REPLY_EMAIL_RETRY,
        ask_next: ask_nothing,
    },
];

fn store_date(data: &mut BookingData, value: &str) -> bool {
    data.date = Some(value.to_string());
    true
}

fn store_time(data: &mut BookingData, value: &str) -> bool {
    data.time = Some(value.to_string());
    true
}

fn store_duration(data: &mut BookingData, value: &str) -> bool {
    match value.parse::<u32>() {
        Ok(minutes) if minutes > 0 => {
            data.duration_minutes = Some(minutes);
            true
        }
        _ => false,
    }
}

fn store_email(data: &mut BookingData, value: &str) -> bool {
    data.email = Some(value.to_string());
    true
}

fn ask_time(data: &BookingData) -> String {
    format!(
        "Noted {} for the date. What time should we start? (e.g. 10:00)",
        data.date.as_deref().unwrap_or_default()
    )
}

fn ask_duration(data: &BookingData) -> String {
    format!(
        "{} it is. How long should the meeting run, in minutes?",
        data.time.as_deref().unwrap_or_default()
    )
}

fn ask_email(_data: &BookingData) -> String {
    "Almost done: which email address should the calendar invitation go to?".to_string()
}

// The email rule books in the same turn, so there is nothing to ask.
fn ask_nothing(_data: &BookingData) -> String {
    String::new()
}

fn is_trigger(text: &str) -> bool {
    let lower = text.to_lowercase();
    TRIGGER_WORDS.iter().any(|word| lower.contains(word))
}

/// The conversation stage machine, wired to its external collaborators
/// through the gateway traits.
pub struct Engine {
    sessions: SessionStore,
    llm: Arc<dyn Completion>,
    calendar: Arc<dyn Calendar>,
    sms: Arc<dyn SmsSender>,
    mail: Option<Arc<dyn MailSender>>,
    config: Config,
}

impl Engine {
    pub fn new(
        config: Config,
        llm: Arc<dyn Completion>,
        calendar: Arc<dyn Calendar>,
        sms: Arc<dyn SmsSender>,
        mail: Option<Arc<dyn MailSender>>,
    ) -> Self {
        let sessions = SessionStore::new(
            config.session.capacity,
            (config.session.ttl_minutes * 60) as i64,
        );
        Self {
            sessions,
            llm,
            calendar,
            sms,
            mail,
            config,
        }
    }

    /// Handle one inbound message for `user_key` and return the reply.
    ///
    /// The per-key session lock is held for the whole turn, so two
    /// near-simultaneous messages from the same user are sequenced
    /// rather than racing on the stage. Provider failures never escape:
    /// they are logged and turned into user-facing replies.
    pub async fn handle_message(&self, user_key: &str, text: &str, lang: Option<&str>) -> String {
        let handle = self.sessions.get_or_create(user_key);
        let mut session = handle.lock().await;

        let before = session.stage;
        let reply = self.advance(&mut session, text, lang).await;
        if session.stage != before {
            log!(
                " [flow] {user_key}: {} -> {}",
                before.as_str(),
                session.stage.as_str()
            );
        }
        reply
    }

    async fn advance(&self, session: &mut Session, text: &str, lang: Option<&str>) -> String {
        match session.stage {
            Stage::Start => self.handle_start(session, text, lang).await,
            Stage::AwaitingDate
            | Stage::AwaitingTime
            | Stage::AwaitingDuration
            | Stage::AwaitingEmail => self.collect_field(session, text).await,
            Stage::Creating => self.try_book(session).await,
            Stage::Completed => REPLY_COMPLETED.to_string(),
        }
    }

    async fn handle_start(&self, session: &mut Session, text: &str, lang: Option<&str>) -> String {
        if is_trigger(text) {
            session.stage = Stage::AwaitingDate;
            return REPLY_ASK_DATE.to_string();
        }

        let language = lang.unwrap_or(self.config.bot.language.as_str());
        let system = format!(
            "You are {}, a friendly scheduling assistant. Keep replies short and \
             conversational. If the user seems interested in an appointment, tell \
             them to say \"appointment\" to start booking. Reply in {language}.",
            self.config.bot.name
        );

        match self.llm.complete(&system, text).await {
            Ok(reply) if !reply.trim().is_empty() => reply,
            Ok(_) => REPLY_SMALLTALK_FALLBACK.to_string(),
            Err(e) => {
                log!(" [llm] smalltalk completion failed: {e}");
                REPLY_SMALLTALK_FALLBACK.to_string()
            }
        }
    }

    async fn collect_field(&self, session: &mut Session, text: &str) -> String {
        let Some(rule) = RULES.iter().find(|r| r.stage == session.stage) else {
            return REPLY_ERROR.to_string();
        };

        let Some(value) = (rule.extract)(text) else {
            return rule.reprompt.to_string();
        };
        if !(rule.store)(&mut session.data, &value) {
            return rule.reprompt.to_string();
        }

        session.stage = rule.next;
        if rule.next == Stage::Creating {
            self.try_book(session).await
        } else {
            (rule.ask_next)(&session.data)
        }
    }

    /// The `Creating` step: validate, check the slot, insert the event.
    ///
    /// Reverts: missing field → that field's stage; busy slot →
    /// `AwaitingTime`; any compute/create failure → `AwaitingEmail`.
    async fn try_book(&self, session: &mut Session) -> String {
        if let Some(missing) = session.data.first_missing() {
            session.stage = missing;
            let reprompt = RULES
                .iter()
                .find(|r| r.stage == missing)
                .map(|r| r.reprompt)
                .unwrap_or(REPLY_ERROR);
            return format!("I lost one of your details along the way. {reprompt}");
        }

        if !self.calendar.connected().await {
            return REPLY_NOT_CONNECTED.to_string();
        }

        let Some((start, end)) = slot::resolve(&session.data, self.config.booking.timezone_offset)
        else {
            log!(" [flow] stored fields did not resolve to a valid slot");
            session.stage = Stage::AwaitingEmail;
            return REPLY_ERROR.to_string();
        };

        let date = session.data.date.clone().unwrap_or_default();
        let time = session.data.time.clone().unwrap_or_default();
        let duration = session.data.duration_minutes.unwrap_or_default();
        let email = session.data.email.clone().unwrap_or_default();

        match self.calendar.is_free(&start, &end).await {
            Ok(true) => {}
            Ok(false) => {
                session.stage = Stage::AwaitingTime;
                return format!(
                    "That slot on {date} is already taken. Could you pick a different time?"
                );
            }
            Err(e) => {
                log!(" [calendar] free/busy check failed: {e}");
                session.stage = Stage::AwaitingEmail;
                return REPLY_ERROR.to_string();
            }
        }

        match self
            .calendar
            .create_event(&self.config.booking.summary, &start, &end, &email)
            .await
        {
            Ok(event) => {
                session.stage = Stage::Completed;
                let link = event.join_link.unwrap_or_else(|| NO_LINK.to_string());
                self.send_confirmation_mail(&session.data, &link);

                let name_part = session
                    .data
                    .first_name
                    .as_deref()
                    .map(|n| format!(", {n}"))
                    .unwrap_or_default();
                format!(
                    "All set{name_part}! Your appointment on {date} at {time} is booked \
                     for {duration} minutes. The invitation goes to {email}. Join link: {link}"
                )
            }
            Err(e) => {
                log!(" [calendar] create event failed: {e}");
                session.stage = Stage::AwaitingEmail;
                REPLY_ERROR.to_string()
            }
        }
    }

    /// Fire-and-forget confirmation mail; failures are only logged.
    fn send_confirmation_mail(&self, data: &BookingData, link: &str) {
        let Some(mail) = self.mail.clone() else {
            return;
        };
        let Some(email) = data.email.clone() else {
            return;
        };
        let date = data.date.clone().unwrap_or_default();
        let time = data.time.clone().unwrap_or_default();
        let link = link.to_string();

        tokio::spawn(async move {
            let subject = format!("Your appointment on {date}");
            let body = format!(
                "Hello,\n\nyour appointment is confirmed for {date} at {time}.\n\
                 Join link: {link}\n\nSee you then!"
            );
            if let Err(e) = mail.send(&email, &subject, &body).await {
                log!(" [mail] confirmation send failed: {e}");
            }
        });
    }

    /// A new CRM lead: start a fresh session under the normalized number
    /// and send the greeting SMS. Send failures propagate to the caller.
    pub async fn handle_lead(&self, lead: &Lead) -> Result<String> {
        let raw = lead.phone.as_deref().unwrap_or_default();
        let to = phone::normalize(raw, &self.config.sms.default_country_code);

        let mut session = Session::new();
        session.data.first_name = lead.first_name.clone();
        session.data.last_name = lead.last_name.clone();
        self.sessions.put_fresh(&to, session);

        let receipt = self.sms.send(&to, &self.greeting(lead)).await?;
        log!(" [sms] greeting sent to {to} (receipt {receipt})");
        Ok(to)
    }

    fn greeting(&self, lead: &Lead) -> String {
        let bot = &self.config.bot.name;
        match lead.first_name.as_deref() {
            Some(name) => format!(
                "Hi {name}, this is {bot}! Thanks for your interest. Reply \
                 \"appointment\" and I'll find you a slot."
            ),
            None => format!(
                "Hi, this is {bot}! Thanks for your interest. Reply \
                 \"appointment\" and I'll find you a slot."
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use terminly_core::error::TerminError;
    use terminly_integrations::google::calendar::CreatedEvent;

    struct FakeLlm {
        fail: bool,
    }

    #[async_trait]
    impl Completion for FakeLlm {
        async fn complete(&self, _system: &str, _user: &str) -> Result<String> {
            if self.fail {
                Err(TerminError::Llm {
                    provider: "fake".to_string(),
                    message: "down".to_string(),
                })
            } else {
                Ok("Hello from the model".to_string())
            }
        }
    }

    struct FakeCalendar {
        connected: bool,
        free: bool,
        fail_create: bool,
    }

    impl Default for FakeCalendar {
        fn default() -> Self {
            Self {
                connected: true,
                free: true,
                fail_create: false,
            }
        }
    }

    #[async_trait]
    impl Calendar for FakeCalendar {
        async fn connected(&self) -> bool {
            self.connected
        }

        async fn is_free(&self, _start: &str, _end: &str) -> Result<bool> {
            Ok(self.free)
        }

        async fn create_event(
            &self,
            _summary: &str,
            _start: &str,
            _end: &str,
            _attendee_email: &str,
        ) -> Result<CreatedEvent> {
            if self.fail_create {
                Err(TerminError::Integration("calendar down".to_string()))
            } else {
                Ok(CreatedEvent {
                    id: "ev1".to_string(),
                    html_link: None,
                    join_link: Some("https://meet.google.com/abc-defg-hij".to_string()),
                })
            }
        }
    }

    #[derive(Default)]
    struct FakeSms {
        fail: bool,
        sent: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl SmsSender for FakeSms {
        async fn send(&self, to: &str, body: &str) -> Result<String> {
            if self.fail {
                return Err(TerminError::Sms("unreachable".to_string()));
            }
            self.sent
                .lock()
                .unwrap()
                .push((to.to_string(), body.to_string()));
            Ok("SM123".to_string())
        }
    }

    fn engine_with(calendar: FakeCalendar, llm: FakeLlm, sms: Arc<FakeSms>) -> Engine {
        Engine::new(
            Config::default(),
            Arc::new(llm),
            Arc::new(calendar),
            sms,
            None,
        )
    }

    fn engine(calendar: FakeCalendar) -> Engine {
        engine_with(calendar, FakeLlm { fail: false }, Arc::new(FakeSms::default()))
    }

    async fn stage_of(engine: &Engine, key: &str) -> Stage {
        engine.sessions.get_or_create(key).lock().await.stage
    }

    #[tokio::test]
    async fn test_trigger_starts_flow() {
        let engine = engine(FakeCalendar::default());
        let reply = engine.handle_message("u1", "Ich möchte einen Termin", None).await;
        assert_eq!(reply, REPLY_ASK_DATE);
        assert_eq!(stage_of(&engine, "u1").await, Stage::AwaitingDate);
    }

    #[tokio::test]
    async fn test_smalltalk_delegates_to_llm() {
        let engine = engine(FakeCalendar::default());
        let reply = engine.handle_message("u1", "hallo, wer bist du?", None).await;
        assert_eq!(reply, "Hello from the model");
        assert_eq!(stage_of(&engine, "u1").await, Stage::Start);
    }

    #[tokio::test]
    async fn test_smalltalk_fallback_on_llm_failure() {
        let engine = engine_with(
            FakeCalendar::default(),
            FakeLlm { fail: true },
            Arc::new(FakeSms::default()),
        );
        let reply = engine.handle_message("u1", "hallo", None).await;
        assert_eq!(reply, REPLY_SMALLTALK_FALLBACK);
        assert_eq!(stage_of(&engine, "u1").await, Stage::Start);
    }

    #[tokio::test]
    async fn test_invalid_date_reprompts_without_advancing() {
        let engine = engine(FakeCalendar::default());
        engine.handle_message("u1", "termin", None).await;
        let reply = engine.handle_message("u1", "tomorrow sometime", None).await;
        assert_eq!(reply, REPLY_DATE_RETRY);
        assert_eq!(stage_of(&engine, "u1").await, Stage::AwaitingDate);
    }

    #[tokio::test]
    async fn test_full_booking_scenario() {
        let engine = engine(FakeCalendar::default());
        engine.handle_message("u1", "termin bitte", None).await;

        let reply = engine.handle_message("u1", "Termin am 08.11.2025", None).await;
        assert!(reply.contains("08.11.2025"));
        assert_eq!(stage_of(&engine, "u1").await, Stage::AwaitingTime);

        engine.handle_message("u1", "10:00", None).await;
        assert_eq!(stage_of(&engine, "u1").await, Stage::AwaitingDuration);

        engine.handle_message("u1", "30", None).await;
        assert_eq!(stage_of(&engine, "u1").await, Stage::AwaitingEmail);

        let reply = engine.handle_message("u1", "a@b.com", None).await;
        assert_eq!(stage_of(&engine, "u1").await, Stage::Completed);
        assert!(reply.contains("08.11.2025"));
        assert!(reply.contains("10:00"));
        assert!(reply.contains("a@b.com"));
        assert!(reply.contains("https://meet.google.com/abc-defg-hij"));

        let session = engine.sessions.get_or_create("u1");
        let data = session.lock().await.data.clone();
        assert_eq!(data.date.as_deref(), Some("08.11.2025"));
        assert_eq!(data.time.as_deref(), Some("10:00"));
        assert_eq!(data.duration_minutes, Some(30));
    }

    #[tokio::test]
    async fn test_completed_is_idempotent() {
        let engine = engine(FakeCalendar::default());
        engine.handle_message("u1", "termin", None).await;
        engine.handle_message("u1", "08.11.2025", None).await;
        engine.handle_message("u1", "10:00", None).await;
        engine.handle_message("u1", "30", None).await;
        engine.handle_message("u1", "a@b.com", None).await;

        let first = engine.handle_message("u1", "termin 09.11.2025", None).await;
        let second = engine.handle_message("u1", "termin 09.11.2025", None).await;
        assert_eq!(first, REPLY_COMPLETED);
        assert_eq!(first, second);

        let session = engine.sessions.get_or_create("u1");
        let data = session.lock().await.data.clone();
        assert_eq!(data.date.as_deref(), Some("08.11.2025"));
    }

    #[tokio::test]
    async fn test_conflict_reverts_to_time_and_keeps_data() {
        let engine = engine(FakeCalendar {
            free: false,
            ..Default::default()
        });
        engine.handle_message("u1", "termin", None).await;
        engine.handle_message("u1", "08.11.2025", None).await;
        engine.handle_message("u1", "10:00", None).await;
        engine.handle_message("u1", "30", None).await;
        let reply = engine.handle_message("u1", "a@b.com", None).await;

        assert!(reply.contains("08.11.2025"));
        assert!(reply.contains("already taken"));
        assert_eq!(stage_of(&engine, "u1").await, Stage::AwaitingTime);

        let session = engine.sessions.get_or_create("u1");
        let data = session.lock().await.data.clone();
        assert_eq!(data.date.as_deref(), Some("08.11.2025"));
        assert_eq!(data.email.as_deref(), Some("a@b.com"));
    }

    #[tokio::test]
    async fn test_missing_duration_reverts_exactly_there() {
        let engine = engine(FakeCalendar::default());
        {
            let handle = engine.sessions.get_or_create("u1");
            let mut session = handle.lock().await;
            session.stage = Stage::Creating;
            session.data.date = Some("08.11.2025".to_string());
            session.data.time = Some("10:00".to_string());
            session.data.email = Some("a@b.com".to_string());
        }

        let reply = engine.handle_message("u1", "anything", None).await;
        assert_eq!(stage_of(&engine, "u1").await, Stage::AwaitingDuration);
        assert!(reply.contains(REPLY_DURATION_RETRY));
    }

    #[tokio::test]
    async fn test_not_connected_short_circuits() {
        let engine = engine(FakeCalendar {
            connected: false,
            ..Default::default()
        });
        engine.handle_message("u1", "termin", None).await;
        engine.handle_message("u1", "08.11.2025", None).await;
        engine.handle_message("u1", "10:00", None).await;
        engine.handle_message("u1", "30", None).await;
        let reply = engine.handle_message("u1", "a@b.com", None).await;

        assert_eq!(reply, REPLY_NOT_CONNECTED);
        assert_eq!(stage_of(&engine, "u1").await, Stage::Creating);
    }

    #[tokio::test]
    async fn test_create_failure_reverts_to_email() {
        let engine = engine(FakeCalendar {
            fail_create: true,
            ..Default::default()
        });
        engine.handle_message("u1", "termin", None).await;
        engine.handle_message("u1", "08.11.2025", None).await;
        engine.handle_message("u1", "10:00", None).await;
        engine.handle_message("u1", "30", None).await;
        let reply = engine.handle_message("u1", "a@b.com", None).await;

        assert_eq!(reply, REPLY_ERROR);
        assert_eq!(stage_of(&engine, "u1").await, Stage::AwaitingEmail);
    }

    #[tokio::test]
    async fn test_lead_sends_normalized_greeting() {
        let sms = Arc::new(FakeSms::default());
        let engine = engine_with(
            FakeCalendar::default(),
            FakeLlm { fail: false },
            Arc::clone(&sms),
        );

        let lead = Lead {
            first_name: Some("Max".to_string()),
            last_name: Some("Mustermann".to_string()),
            phone: Some("0170 1234567".to_string()),
            email: None,
        };
        let to = engine.handle_lead(&lead).await.unwrap();
        assert_eq!(to, "+491701234567");

        let sent = sms.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "+491701234567");
        assert!(sent[0].1.contains("Max"));

        assert_eq!(stage_of(&engine, "+491701234567").await, Stage::Start);
        let session = engine.sessions.get_or_create("+491701234567");
        assert_eq!(
            session.lock().await.data.first_name.as_deref(),
            Some("Max")
        );
    }

    #[tokio::test]
    async fn test_lead_sms_failure_propagates() {
        let engine = engine_with(
            FakeCalendar::default(),
            FakeLlm { fail: false },
            Arc::new(FakeSms {
                fail: true,
                ..Default::default()
            }),
        );
        let lead = Lead {
            phone: Some("+491701234567".to_string()),
            ..Default::default()
        };
        assert!(engine.handle_lead(&lead).await.is_err());
    }
}
