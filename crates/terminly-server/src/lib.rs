/// Log with HH:MM:SS timestamp.
macro_rules! log {
    ($($arg:tt)*) => {{
        let secs = terminly_core::types::now_unix();
        let h = (secs % 86400) / 3600;
        let m = (secs % 3600) / 60;
        let s = secs % 60;
        eprintln!("{h:02}:{m:02}:{s:02} terminly: {}", format_args!($($arg)*));
    }};
}

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Form, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Redirect};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tower_http::services::ServeDir;

use terminly_core::error::{Result, TerminError};
use terminly_core::types::Lead;
use terminly_flow::engine::Engine;
use terminly_integrations::google::GoogleAuth;

pub struct AppState {
    pub engine: Arc<Engine>,
    pub auth: Arc<GoogleAuth>,
}

#[derive(serde::Deserialize)]
struct ChatBody {
    message: String,
    #[serde(rename = "userLang")]
    user_lang: Option<String>,
    #[serde(rename = "userEmail")]
    user_email: Option<String>,
}

#[derive(serde::Deserialize)]
struct SmsForm {
    #[serde(rename = "From")]
    from: String,
    #[serde(rename = "Body")]
    body: String,
}

#[derive(serde::Deserialize)]
pub struct OAuthCallback {
    code: Option<String>,
    error: Option<String>,
}

/// Web chat entry point. The user key is the email when the page sends
/// one, otherwise the caller's IP.
async fn chat(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(body): Json<ChatBody>,
) -> Json<serde_json::Value> {
    let key = body
        .user_email
        .clone()
        .filter(|e| !e.is_empty())
        .unwrap_or_else(|| addr.ip().to_string());

    let reply = state
        .engine
        .handle_message(&key, &body.message, body.user_lang.as_deref())
        .await;
    Json(json!({ "reply": reply }))
}

/// Twilio webhook for inbound SMS. The reply goes back as TwiML, so no
/// outbound API call is needed on this path.
async fn incoming_sms(
    State(state): State<Arc<AppState>>,
    Form(form): Form<SmsForm>,
) -> impl IntoResponse {
    let reply = state.engine.handle_message(&form.from, &form.body, None).await;

    let twiml = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
         <Response><Message>{}</Message></Response>",
        xml_escape(&reply)
    );
    ([(header::CONTENT_TYPE, "text/xml")], twiml)
}

/// CRM lead webhook: greets the new lead by SMS.
async fn lead_webhook(
    State(state): State<Arc<AppState>>,
    Json(lead): Json<Lead>,
) -> impl IntoResponse {
    if lead.phone.as_deref().map_or(true, |p| p.trim().is_empty()) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "phone is required" })),
        );
    }

    match state.engine.handle_lead(&lead).await {
        Ok(to) => {
            log!(" [lead] greeted {to}");
            (StatusCode::OK, Json(json!({ "success": true })))
        }
        Err(e) => {
            log!(" [lead] greeting failed: {e}");
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({ "error": "failed to send greeting" })),
            )
        }
    }
}

async fn setup_google(State(state): State<Arc<AppState>>) -> Redirect {
    Redirect::temporary(&state.auth.auth_url())
}

async fn oauth_callback(
    State(state): State<Arc<AppState>>,
    Query(params): Query<OAuthCallback>,
) -> Html<String> {
    if let Some(error) = params.error {
        return Html(format!("<h1>Authorization failed</h1><p>{error}</p>"));
    }

    let code = match params.code {
        Some(c) => c,
        None => {
            return Html("<h1>Error</h1><p>No authorization code received.</p>".to_string())
        }
    };

    match state.auth.exchange_code(&code).await {
        Ok(()) => Html(
            "<h1>Connected!</h1><p>Google Calendar is connected. You can close this tab.</p>"
                .to_string(),
        ),
        Err(e) => Html(format!("<h1>Error</h1><p>Failed to connect: {e}</p>")),
    }
}

fn xml_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

pub fn router(state: Arc<AppState>, static_dir: &str) -> Router {
    Router::new()
        .route("/chat", post(chat))
        .route("/twilio/incoming-sms", post(incoming_sms))
        .route("/lead-webhook", post(lead_webhook))
        .route("/setup/google", get(setup_google))
        .route("/auth/google/callback", get(oauth_callback))
        .fallback_service(ServeDir::new(static_dir))
        .with_state(state)
}

/// Bind and serve until the process is stopped.
pub async fn serve(port: u16, state: Arc<AppState>, static_dir: &str) -> Result<()> {
    let app = router(state, static_dir);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .map_err(|e| TerminError::Integration(format!("failed to bind port {port}: {e}")))?;

    log!("listening on port {port}");
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .map_err(|e| TerminError::Integration(format!("server error: {e}")))?;

    Ok(())
}
