//! Remote challenge endpoint.
//!
//! [`ChallengeEndpoint`] moves raw JSON bodies; this module shapes them.
//!
//! ```text
//! GET  ?account=..&home_domain=..[&client_domain=..]
//!   -> {"authorization_entries": ["<base64>", ...], "network_passphrase": "..."}
//! POST {"authorization_entries": ["<base64>", ...]}
//!   -> {"token": "..."} | {"error": "..."}
//! ```

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use smartauth_core::{AuthorizationEntry, Codec};

use crate::error::{AuthError, Result, TransportError};

/// Query parameters for a challenge request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChallengeQuery {
    pub account: String,
    pub home_domain: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_domain: Option<String>,
}

/// Transport to the authentication server.
#[async_trait]
pub trait ChallengeEndpoint: Send + Sync {
    /// Request a challenge. Returns the response body.
    async fn get_challenge(&self, query: &ChallengeQuery) -> std::result::Result<String, TransportError>;

    /// Post signed entries. Returns the response body.
    async fn post_signed(&self, body: String) -> std::result::Result<String, TransportError>;
}

#[derive(Debug, Serialize, Deserialize)]
struct EntriesBody {
    authorization_entries: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    network_passphrase: Option<String>,
}

/// A decoded challenge response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeResponse {
    pub entries: Vec<AuthorizationEntry>,
    pub network_passphrase: Option<String>,
}

/// Parse a challenge response body.
pub fn parse_challenge(codec: &dyn Codec, body: &str) -> Result<ChallengeResponse> {
    if let Some(error) = error_message(body) {
        return Err(AuthError::Endpoint(error));
    }
    let parsed: EntriesBody = serde_json::from_str(body)
        .map_err(|e| AuthError::Endpoint(format!("malformed challenge: {}", e)))?;

    let entries = parsed
        .authorization_entries
        .iter()
        .map(|encoded| -> Result<AuthorizationEntry> {
            let bytes = STANDARD
                .decode(encoded)
                .map_err(|e| AuthError::Endpoint(format!("malformed entry: {}", e)))?;
            Ok(codec.decode_entry(&bytes)?)
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(ChallengeResponse {
        entries,
        network_passphrase: parsed.network_passphrase,
    })
}

/// Build the body posting signed entries.
pub fn signed_entries_body(codec: &dyn Codec, entries: &[AuthorizationEntry]) -> Result<String> {
    challenge_body(codec, entries, None)
}

/// Build a challenge response body. Used by servers and test doubles.
pub fn challenge_body(
    codec: &dyn Codec,
    entries: &[AuthorizationEntry],
    network_passphrase: Option<&str>,
) -> Result<String> {
    let authorization_entries = entries
        .iter()
        .map(|entry| -> Result<String> { Ok(STANDARD.encode(codec.encode_entry(entry)?)) })
        .collect::<Result<Vec<_>>>()?;
    serde_json::to_string(&EntriesBody {
        authorization_entries,
        network_passphrase: network_passphrase.map(str::to_string),
    })
    .map_err(|e| AuthError::Endpoint(e.to_string()))
}

/// Parse a posted-entries body. Used by servers and test doubles.
pub fn parse_signed_entries(codec: &dyn Codec, body: &str) -> Result<Vec<AuthorizationEntry>> {
    Ok(parse_challenge(codec, body)?.entries)
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// The `error` field of a response body, if it has one.
pub(crate) fn error_message(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorBody>(body).ok().map(|b| b.error)
}
