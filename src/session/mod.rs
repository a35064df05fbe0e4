//! Realtime session bootstrap.
//!
//! Mints the ephemeral credential the browser dashboard uses to authorize
//! its WebRTC connection to the realtime voice API. One blocking POST;
//! failures surface as a single user-visible connection error and the
//! session stays "not started" so the user can retry. No automatic retries.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::Config;

/// Realtime sessions endpoint.
const SESSIONS_URL: &str = "https://api.openai.com/v1/realtime/sessions";

/// Errors that can occur while minting a session credential.
#[derive(Debug, Error)]
pub enum SessionError {
    /// No API key available from config or environment
    #[error("No API key configured: set api_key in config.toml or the OPENAI_API_KEY environment variable")]
    MissingApiKey,

    /// API key rejected (401 Unauthorized)
    #[error("API key rejected: server returned 401 Unauthorized")]
    Unauthorized,

    /// Network or other HTTP error
    #[error("Session request failed: {0}")]
    Http(String),

    /// Failed to parse response
    #[error("Failed to parse session response: {0}")]
    Parse(String),
}

/// Ephemeral client secret minted for one realtime session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientSecret {
    /// Bearer value the browser presents during SDP negotiation
    pub value: String,
    /// Expiration time (Unix timestamp)
    pub expires_at: i64,
}

/// Response from the realtime sessions endpoint (only fields we use).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionCredential {
    /// Session identifier
    pub id: String,
    /// Ephemeral credential for the WebRTC handshake
    pub client_secret: ClientSecret,
}

/// Create a realtime session and return its ephemeral credential.
pub fn create_session(config: &Config) -> Result<SessionCredential, SessionError> {
    let api_key = config.api_key().ok_or(SessionError::MissingApiKey)?;

    let response = ureq::post(SESSIONS_URL)
        .set("Authorization", &format!("Bearer {}", api_key))
        .set("Content-Type", "application/json")
        .send_json(serde_json::json!({
            "model": config.model,
            "voice": config.voice,
        }));

    match response {
        Ok(resp) => resp
            .into_json()
            .map_err(|e| SessionError::Parse(e.to_string())),
        Err(ureq::Error::Status(401, _)) => Err(SessionError::Unauthorized),
        Err(ureq::Error::Status(code, resp)) => {
            let body = resp.into_string().unwrap_or_default();
            Err(SessionError::Http(format!("HTTP {}: {}", code, body)))
        }
        Err(e) => Err(SessionError::Http(e.to_string())),
    }
}
