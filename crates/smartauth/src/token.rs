//! Session tokens returned by the authentication server.
//!
//! The token is a JWT. Its signature is the server's business and is not
//! checked here; the claims are read to bind the session to the
//! authenticated principal and its expiry.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{Deserialize, Serialize};

use crate::endpoint::error_message;
use crate::error::{AuthError, Result};

/// Claims carried by a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// The authenticated principal's identifier.
    pub sub: String,
    /// The issuing server.
    pub iss: String,
    /// Issued-at, unix seconds.
    pub iat: u64,
    /// Expiry, unix seconds.
    pub exp: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home_domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_domain: Option<String>,
}

/// A parsed session token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthToken {
    /// The raw token, as returned by the server.
    pub token: String,
    pub claims: TokenClaims,
}

impl AuthToken {
    /// Parse `token` and check that it was issued to `principal_id`.
    pub fn parse(token: &str, principal_id: &str) -> Result<Self> {
        let claims = decode_claims(token)?;
        if claims.sub != principal_id {
            return Err(AuthError::InvalidToken(format!(
                "subject `{}` does not match principal `{}`",
                claims.sub, principal_id
            )));
        }
        if claims.exp <= claims.iat {
            return Err(AuthError::InvalidToken("token expires before it was issued".into()));
        }
        Ok(Self {
            token: token.to_string(),
            claims,
        })
    }

    pub fn expires_at(&self) -> u64 {
        self.claims.exp
    }
}

#[derive(Debug, Deserialize)]
struct TokenBody {
    token: String,
}

/// Extract the token from a submission response body.
pub fn token_from_body(body: &str) -> Result<String> {
    if let Some(error) = error_message(body) {
        return Err(AuthError::Endpoint(error));
    }
    serde_json::from_str::<TokenBody>(body)
        .map(|b| b.token)
        .map_err(|e| AuthError::Endpoint(format!("malformed token response: {}", e)))
}

fn decode_claims(token: &str) -> Result<TokenClaims> {
    let mut parts = token.split('.');
    let (Some(_header), Some(payload), Some(_signature), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(AuthError::InvalidToken("expected three segments".into()));
    };
    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| AuthError::InvalidToken(format!("claims encoding: {}", e)))?;
    serde_json::from_slice(&bytes).map_err(|e| AuthError::InvalidToken(format!("claims: {}", e)))
}

/// Encode claims as a JWT carrying `signature`. Used by servers and test doubles.
pub fn encode_token(claims: &TokenClaims, signature: &[u8]) -> Result<String> {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"EdDSA","typ":"JWT"}"#);
    let payload = serde_json::to_vec(claims).map_err(|e| AuthError::InvalidToken(e.to_string()))?;
    Ok(format!(
        "{}.{}.{}",
        header,
        URL_SAFE_NO_PAD.encode(payload),
        URL_SAFE_NO_PAD.encode(signature)
    ))
}
