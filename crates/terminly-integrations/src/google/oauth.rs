use std::sync::Arc;

use terminly_core::error::{Result, TerminError};
use terminly_core::types::now_unix;

use super::urlencode;
use crate::TokenStore;

const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";

/// Scopes requested for calendar access and confirmation mail.
const SCOPES: &str = "https://www.googleapis.com/auth/calendar \
                       https://www.googleapis.com/auth/gmail.send";

/// Manages Google OAuth tokens (access + refresh) via a TokenStore.
pub struct GoogleAuth {
    client_id: String,
    client_secret: String,
    callback_url: String,
    store: Arc<dyn TokenStore>,
    http: reqwest::Client,
}

impl GoogleAuth {
    pub fn new(
        client_id: String,
        client_secret: String,
        callback_url: String,
        store: Arc<dyn TokenStore>,
    ) -> Self {
        Self {
            client_id,
            client_secret,
            callback_url,
            store,
            http: reqwest::Client::new(),
        }
    }

    /// The authorization URL the user is redirected to from /setup/google.
    pub fn auth_url(&self) -> String {
        format!(
            "{AUTH_URL}?client_id={}&redirect_uri={}&response_type=code&scope={}&access_type=offline&prompt=consent",
            urlencode(&self.client_id),
            urlencode(&self.callback_url),
            urlencode(SCOPES),
        )
    }

    /// Exchange an authorization code for access + refresh tokens and
    /// persist them.
    pub async fn exchange_code(&self, code: &str) -> Result<()> {
        let params = [
            ("code", code),
            ("client_id", &self.client_id),
            ("client_secret", &self.client_secret),
            ("redirect_uri", &self.callback_url),
            ("grant_type", "authorization_code"),
        ];
        let json = self.token_request(&params).await?;

        let access_token = json["access_token"]
            .as_str()
            .ok_or_else(|| TerminError::Integration("missing access_token".to_string()))?;
        self.store_access_token(access_token, json["expires_in"].as_i64())
            .await?;

        if let Some(refresh) = json["refresh_token"].as_str() {
            self.store.set("refresh_token", refresh).await?;
        }

        Ok(())
    }

    /// Get a valid access token, refreshing if necessary.
    pub async fn access_token(&self) -> Result<String> {
        if let Some(token) = self.store.get("access_token").await? {
            if let Some(expiry_str) = self.store.get("token_expiry").await? {
                if let Ok(expiry) = expiry_str.parse::<i64>() {
                    // Refresh 60 seconds before actual expiry
                    if now_unix() < expiry - 60 {
                        return Ok(token);
                    }
                }
            }
        }

        self.refresh().await
    }

    /// Refresh the access token using the stored refresh token.
    async fn refresh(&self) -> Result<String> {
        let refresh_token = self.store.get("refresh_token").await?.ok_or_else(|| {
            TerminError::Integration(
                "no Google refresh token. Visit /setup/google to authorize.".to_string(),
            )
        })?;

        let params = [
            ("refresh_token", refresh_token.as_str()),
            ("client_id", &self.client_id),
            ("client_secret", &self.client_secret),
            ("grant_type", "refresh_token"),
        ];
        let json = self.token_request(&params).await?;

        let access_token = json["access_token"]
            .as_str()
            .ok_or_else(|| TerminError::Integration("missing access_token in refresh".to_string()))?
            .to_string();
        self.store_access_token(&access_token, json["expires_in"].as_i64())
            .await?;

        Ok(access_token)
    }

    async fn token_request(&self, params: &[(&str, &str)]) -> Result<serde_json::Value> {
        let resp = self
            .http
            .post(TOKEN_URL)
            .form(params)
            .send()
            .await
            .map_err(|e| TerminError::Integration(format!("google token request failed: {e}")))?;

        let status = resp.status().as_u16();
        let text = resp
            .text()
            .await
            .map_err(|e| TerminError::Integration(format!("google token read failed: {e}")))?;

        if status != 200 {
            return Err(TerminError::Http { status, body: text });
        }

        serde_json::from_str(&text)
            .map_err(|e| TerminError::Integration(format!("google token parse failed: {e}")))
    }

    async fn store_access_token(&self, token: &str, expires_in: Option<i64>) -> Result<()> {
        self.store.set("access_token", token).await?;
        let expiry = now_unix() + expires_in.unwrap_or(3600);
        self.store.set("token_expiry", &expiry.to_string()).await
    }

    /// Check if Google is connected (has a refresh token).
    pub async fn is_connected(&self) -> bool {
        matches!(self.store.get("refresh_token").await, Ok(Some(_)))
    }
}
