//! Client configuration.
//!
//! Values normally come from the home domain's published service
//! description. Fetching that is left to the caller; this module only
//! parses and checks the result.

use std::time::Duration;

use serde::Deserialize;
use smartauth_core::{Address, ChallengeParams, Ed25519PublicKey, Principal};

use crate::error::{AuthError, Result};

/// Default safety margin, in ledgers, added to the latest ledger height
/// when choosing a signature expiration.
pub const DEFAULT_EXPIRATION_MARGIN: u32 = 60;

/// Configuration for [`SmartAuth`](crate::SmartAuth).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthConfig {
    /// Network passphrase; hashed into every signature payload.
    pub network_passphrase: String,
    /// Domain the principal authenticates to.
    pub home_domain: String,
    /// Domain of the authentication server.
    pub web_auth_domain: String,
    /// Hex of the verifying contract's 32-byte hash.
    pub web_auth_contract: String,
    /// Hex of the server's Ed25519 signing key.
    pub server_signing_key: String,
    /// Textual identifier of the server account.
    pub server_account: String,
    /// Ledgers added to the latest ledger for signature expiration.
    pub signature_expiration_margin: u32,
    /// Timeout for each simulation call, in milliseconds.
    pub simulate_timeout_ms: u64,
    /// Timeout for each submission or endpoint call, in milliseconds.
    pub submit_timeout_ms: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            network_passphrase: String::new(),
            home_domain: String::new(),
            web_auth_domain: String::new(),
            web_auth_contract: String::new(),
            server_signing_key: String::new(),
            server_account: String::new(),
            signature_expiration_margin: DEFAULT_EXPIRATION_MARGIN,
            simulate_timeout_ms: 30_000,
            submit_timeout_ms: 30_000,
        }
    }
}

impl AuthConfig {
    /// Parse and validate a JSON configuration.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| AuthError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every required field is present and well-formed.
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("network_passphrase", &self.network_passphrase),
            ("home_domain", &self.home_domain),
            ("web_auth_domain", &self.web_auth_domain),
            ("server_account", &self.server_account),
        ];
        for (name, value) in required {
            if value.is_empty() {
                return Err(AuthError::Config(format!("{} is required", name)));
            }
        }
        self.verifying_contract()?;
        self.server_key()?;
        if self.signature_expiration_margin == 0 {
            return Err(AuthError::Config(
                "signature_expiration_margin must be positive".into(),
            ));
        }
        Ok(())
    }

    pub fn verifying_contract(&self) -> Result<Address> {
        Ok(Address::Contract(parse_hex32(
            "web_auth_contract",
            &self.web_auth_contract,
        )?))
    }

    pub fn server_key(&self) -> Result<Ed25519PublicKey> {
        Ok(Ed25519PublicKey::from_bytes(parse_hex32(
            "server_signing_key",
            &self.server_signing_key,
        )?))
    }

    pub fn server(&self) -> Result<Principal> {
        Ok(Principal::new(
            Address::account(&self.server_key()?),
            self.server_account.clone(),
        ))
    }

    pub fn simulate_timeout(&self) -> Duration {
        Duration::from_millis(self.simulate_timeout_ms)
    }

    pub fn submit_timeout(&self) -> Duration {
        Duration::from_millis(self.submit_timeout_ms)
    }

    /// Expected challenge values for `client`.
    pub fn challenge_params(
        &self,
        client: Principal,
        client_domain: Option<Principal>,
    ) -> Result<ChallengeParams> {
        Ok(ChallengeParams {
            client,
            server_key: self.server_key()?,
            server_id: self.server_account.clone(),
            home_domain: self.home_domain.clone(),
            web_auth_domain: self.web_auth_domain.clone(),
            verifying_contract: self.verifying_contract()?,
            client_domain,
        })
    }
}

fn parse_hex32(field: &str, value: &str) -> Result<[u8; 32]> {
    let bytes = hex::decode(value).map_err(|e| AuthError::Config(format!("{}: {}", field, e)))?;
    bytes
        .try_into()
        .map_err(|_| AuthError::Config(format!("{}: expected 32 bytes", field)))
}
