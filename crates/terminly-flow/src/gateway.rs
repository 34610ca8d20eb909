use async_trait::async_trait;
use terminly_core::error::Result;
use terminly_integrations::google::calendar::{CalendarClient, CreatedEvent};
use terminly_integrations::google::gmail::GmailClient;
use terminly_integrations::twilio::TwilioClient;
use terminly_llm::dispatch::LlmDispatch;
use terminly_llm::provider::CompletionRequest;

/// Narrow capability traits over the external collaborators, so the
/// engine can be exercised against fakes. Each real client gets a
/// blanket impl below.

#[async_trait]
pub trait Completion: Send + Sync {
    async fn complete(&self, system: &str, user: &str) -> Result<String>;
}

#[async_trait]
pub trait Calendar: Send + Sync {
    /// Whether a calendar credential is stored at all.
    async fn connected(&self) -> bool;
    async fn is_free(&self, start: &str, end: &str) -> Result<bool>;
    async fn create_event(
        &self,
        summary: &str,
        start: &str,
        end: &str,
        attendee_email: &str,
    ) -> Result<CreatedEvent>;
}

#[async_trait]
pub trait SmsSender: Send + Sync {
    /// Returns the provider's delivery receipt id.
    async fn send(&self, to: &str, body: &str) -> Result<String>;
}

#[async_trait]
pub trait MailSender: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()>;
}

#[async_trait]
impl Completion for LlmDispatch {
    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        LlmDispatch::complete(self, &CompletionRequest::new(system, user)).await
    }
}

#[async_trait]
impl Calendar for CalendarClient {
    async fn connected(&self) -> bool {
        CalendarClient::connected(self).await
    }

    async fn is_free(&self, start: &str, end: &str) -> Result<bool> {
        CalendarClient::is_free(self, start, end).await
    }

    async fn create_event(
        &self,
        summary: &str,
        start: &str,
        end: &str,
        attendee_email: &str,
    ) -> Result<CreatedEvent> {
        CalendarClient::create_event(self, summary, start, end, attendee_email).await
    }
}

#[async_trait]
impl SmsSender for TwilioClient {
    async fn send(&self, to: &str, body: &str) -> Result<String> {
        TwilioClient::send(self, to, body).await
    }
}

#[async_trait]
impl MailSender for GmailClient {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        GmailClient::send(self, to, subject, body).await.map(|_| ())
    }
}
