use std::path::Path;
use std::sync::Arc;

use terminly_core::config::Config;
use terminly_flow::engine::Engine;
use terminly_flow::gateway::{Calendar, Completion, MailSender, SmsSender};
use terminly_integrations::file_store::FileTokenStore;
use terminly_integrations::google::calendar::CalendarClient;
use terminly_integrations::google::gmail::GmailClient;
use terminly_integrations::google::GoogleAuth;
use terminly_integrations::twilio::TwilioClient;
use terminly_integrations::TokenStore;
use terminly_llm::dispatch::LlmDispatch;
use terminly_server::AppState;

#[tokio::main]
async fn main() {
    let config_path =
        std::env::var("TERMINLY_CONFIG").unwrap_or_else(|_| "terminly.toml".to_string());

    let config = Config::load(Path::new(&config_path)).unwrap_or_else(|e| {
        eprintln!("fatal: failed to load config: {e}");
        std::process::exit(1);
    });

    if config.llm.api_key.is_empty() {
        eprintln!("terminly: warning: TERMINLY_LLM_API_KEY is not set, small talk will fail");
    }
    if config.sms.account_sid.is_empty() || config.sms.auth_token.is_empty() {
        eprintln!("terminly: warning: Twilio credentials are not set, SMS delivery will fail");
    }
    if config.google.client_id.is_empty() {
        eprintln!(
            "terminly: warning: Google credentials are not set, bookings stay unavailable \
             until /setup/google is configured"
        );
    }

    eprintln!("terminly: starting...");

    let tokens = FileTokenStore::open(config.google.token_path.clone())
        .await
        .unwrap_or_else(|e| {
            eprintln!("fatal: failed to open token store: {e}");
            std::process::exit(1);
        });
    let tokens: Arc<dyn TokenStore> = Arc::new(tokens);

    let auth = Arc::new(GoogleAuth::new(
        config.google.client_id.clone(),
        config.google.client_secret.clone(),
        config.google.callback_url.clone(),
        Arc::clone(&tokens),
    ));

    let calendar: Arc<dyn Calendar> = Arc::new(CalendarClient::new(Arc::clone(&auth)));
    let mail: Option<Arc<dyn MailSender>> = if config.google.client_id.is_empty() {
        None
    } else {
        Some(Arc::new(GmailClient::new(Arc::clone(&auth))))
    };

    let sms: Arc<dyn SmsSender> = Arc::new(TwilioClient::new(
        config.sms.account_sid.clone(),
        config.sms.auth_token.clone(),
        config.sms.from_number.clone(),
    ));

    let llm: Arc<dyn Completion> = Arc::new(LlmDispatch::new(config.llm.clone()));

    let port = config.server.port;
    let static_dir = config.server.static_dir.clone();

    let engine = Arc::new(Engine::new(config, llm, calendar, sms, mail));
    let state = Arc::new(AppState { engine, auth });

    if let Err(e) = terminly_server::serve(port, state, &static_dir).await {
        eprintln!("fatal: server error: {e}");
        std::process::exit(1);
    }
}
