//! In-memory authentication server.
//!
//! Issues challenges for registered principals, signs the server entry with
//! the fixture server key, and answers posted entries with a session token.
//! Tampering switches make it issue challenges a client must reject.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use smartauth::endpoint::{challenge_body, parse_signed_entries};
use smartauth::token::{encode_token, TokenClaims};
use smartauth::{ChallengeEndpoint, ChallengeQuery, TransportError};
use smartauth_core::{
    account_signature_value, Address, AuthorizationEntry, AuthorizedInvocation, CborCodec,
    ChallengeArgs, Crypto, Ed25519Sha256, EntryBuilder, Keypair, PayloadHasher, Principal, Value,
    WEB_AUTH_VERIFY_FN,
};

use crate::fixtures::{
    hasher, server_keypair, HOME_DOMAIN, PASSPHRASE, SERVER_ID, VERIFYING_CONTRACT,
    WEB_AUTH_DOMAIN,
};

/// Ways to corrupt an issued challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tamper {
    /// Flip one byte of the server entry's signature.
    FlipServerSignature,
    /// Give the client entry a sub-invocation.
    SubInvocation,
    /// Advertise a different network passphrase.
    WrongPassphrase,
    /// Leave out the client entry.
    DropClientEntry,
}

/// Session token lifetime, in seconds.
pub const TOKEN_TTL: u64 = 3_600;

/// A scripted challenge endpoint.
pub struct MockChallengeServer {
    keypair: Keypair,
    hasher: PayloadHasher,
    principals: Mutex<HashMap<String, Principal>>,
    client_domains: Mutex<HashMap<String, Principal>>,
    tamper: Mutex<Option<Tamper>>,
    next_nonce: AtomicI64,
    ttl: AtomicU64,
    issued: Mutex<Vec<Vec<AuthorizationEntry>>>,
    posted: Mutex<Vec<Vec<AuthorizationEntry>>>,
}

impl MockChallengeServer {
    pub fn new() -> Self {
        Self {
            keypair: server_keypair(),
            hasher: hasher(),
            principals: Mutex::new(HashMap::new()),
            client_domains: Mutex::new(HashMap::new()),
            tamper: Mutex::new(None),
            next_nonce: AtomicI64::new(1),
            ttl: AtomicU64::new(TOKEN_TTL),
            issued: Mutex::new(Vec::new()),
            posted: Mutex::new(Vec::new()),
        }
    }

    /// Issue challenges for `principal`.
    pub fn register(&self, principal: Principal) {
        self.principals
            .lock()
            .unwrap()
            .insert(principal.id.clone(), principal);
    }

    /// Add a client-domain entry for `domain`, addressed to `principal`.
    pub fn register_client_domain(&self, domain: impl Into<String>, principal: Principal) {
        self.client_domains
            .lock()
            .unwrap()
            .insert(domain.into(), principal);
    }

    pub fn tamper(&self, tamper: Tamper) {
        *self.tamper.lock().unwrap() = Some(tamper);
    }

    pub fn set_token_ttl(&self, seconds: u64) {
        self.ttl.store(seconds, Ordering::SeqCst);
    }

    /// Every challenge issued, in order.
    pub fn issued(&self) -> Vec<Vec<AuthorizationEntry>> {
        self.issued.lock().unwrap().clone()
    }

    /// Every set of posted entries, in order.
    pub fn posted(&self) -> Vec<Vec<AuthorizationEntry>> {
        self.posted.lock().unwrap().clone()
    }

    /// Build a signed challenge for `client`.
    pub fn challenge_for(
        &self,
        client: &Principal,
        client_domain: Option<(&str, &Principal)>,
    ) -> Vec<AuthorizationEntry> {
        let nonce = self.next_nonce.fetch_add(1, Ordering::SeqCst);
        let args = ChallengeArgs {
            account: client.id.clone(),
            home_domain: HOME_DOMAIN.into(),
            web_auth_domain: WEB_AUTH_DOMAIN.into(),
            web_auth_domain_account: SERVER_ID.into(),
            nonce: format!("{:016x}", nonce),
            client_domain: client_domain.map(|(domain, _)| domain.to_string()),
            client_domain_account: client_domain.map(|(_, p)| p.id.clone()),
        };
        let tamper = *self.tamper.lock().unwrap();

        let server = self.sign_server_entry(self.entry_for(
            Address::account(&self.keypair.public_key()),
            nonce,
            &args,
        ));
        let server = match tamper {
            Some(Tamper::FlipServerSignature) => flip_signature_byte(&server),
            _ => server,
        };

        let mut client_entry = self.entry_for(client.address, nonce, &args);
        if tamper == Some(Tamper::SubInvocation) {
            client_entry.root_invocation.sub_invocations.push(
                AuthorizedInvocation::contract_call(VERIFYING_CONTRACT, "nested", vec![]),
            );
        }

        let mut entries = vec![server];
        if tamper != Some(Tamper::DropClientEntry) {
            entries.push(client_entry);
        }
        if let Some((_, principal)) = client_domain {
            entries.push(self.entry_for(principal.address, nonce, &args));
        }
        entries
    }

    fn entry_for(&self, address: Address, nonce: i64, args: &ChallengeArgs) -> AuthorizationEntry {
        EntryBuilder::new(address, VERIFYING_CONTRACT, WEB_AUTH_VERIFY_FN)
            .nonce(nonce)
            .expiration(0)
            .arg(args.to_value())
            .build()
    }

    fn sign_server_entry(&self, entry: AuthorizationEntry) -> AuthorizationEntry {
        let digest = self
            .hasher
            .hash_current(&entry)
            .expect("challenge entries encode");
        let signature = Ed25519Sha256.sign(digest.as_bytes(), &self.keypair);
        entry.with_signature(account_signature_value(
            &self.keypair.public_key(),
            signature.as_bytes(),
        ))
    }

    fn issue_token(&self, client: &str) -> Result<String, TransportError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        let claims = TokenClaims {
            sub: client.to_string(),
            iss: format!("https://{}", WEB_AUTH_DOMAIN),
            iat: now,
            exp: now + self.ttl.load(Ordering::SeqCst).max(1),
            home_domain: Some(HOME_DOMAIN.into()),
            client_domain: None,
        };
        let payload = serde_json::to_vec(&claims).map_err(|e| TransportError::Rejected(e.to_string()))?;
        let signature = self.keypair.sign(&payload);
        encode_token(&claims, signature.as_bytes()).map_err(|e| TransportError::Rejected(e.to_string()))
    }
}

impl Default for MockChallengeServer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MockChallengeServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockChallengeServer")
            .field("tamper", &self.tamper)
            .finish_non_exhaustive()
    }
}

fn error_body(message: &str) -> String {
    serde_json::json!({ "error": message }).to_string()
}

/// Flip the first byte of an account signature.
pub fn flip_signature_byte(entry: &AuthorizationEntry) -> AuthorizationEntry {
    let Some((public_key, signature)) = entry
        .signature()
        .and_then(|v| smartauth_core::extract_account_signature(v).ok())
    else {
        return entry.clone();
    };
    let public_key = smartauth_core::Ed25519PublicKey::from_bytes(
        public_key.try_into().expect("32-byte public key"),
    );
    let mut signature = signature.to_vec();
    signature[0] ^= 0x01;
    entry.with_signature(account_signature_value(&public_key, &signature))
}

#[async_trait]
impl ChallengeEndpoint for MockChallengeServer {
    async fn get_challenge(&self, query: &ChallengeQuery) -> Result<String, TransportError> {
        if query.home_domain != HOME_DOMAIN {
            return Ok(error_body("unknown home domain"));
        }
        let Some(client) = self.principals.lock().unwrap().get(&query.account).cloned() else {
            return Ok(error_body("unknown account"));
        };
        let client_domain = match &query.client_domain {
            Some(domain) => match self.client_domains.lock().unwrap().get(domain).cloned() {
                Some(principal) => Some((domain.clone(), principal)),
                None => return Ok(error_body("unknown client domain")),
            },
            None => None,
        };

        let entries = self.challenge_for(
            &client,
            client_domain.as_ref().map(|(d, p)| (d.as_str(), p)),
        );
        self.issued.lock().unwrap().push(entries.clone());

        let passphrase = match *self.tamper.lock().unwrap() {
            Some(Tamper::WrongPassphrase) => "Public Global Stellar Network ; September 2015",
            _ => PASSPHRASE,
        };
        challenge_body(&CborCodec, &entries, Some(passphrase))
            .map_err(|e| TransportError::Rejected(e.to_string()))
    }

    async fn post_signed(&self, body: String) -> Result<String, TransportError> {
        let entries = match parse_signed_entries(&CborCodec, &body) {
            Ok(entries) => entries,
            Err(e) => return Ok(error_body(&e.to_string())),
        };
        self.posted.lock().unwrap().push(entries.clone());

        let server = Address::account(&self.keypair.public_key());
        let principals: Vec<Principal> =
            self.principals.lock().unwrap().values().cloned().collect();
        let Some(client) = principals.iter().find(|p| {
            entries
                .iter()
                .any(|e| e.is_addressed_to(&p.address) && p.address != server)
        }) else {
            return Ok(error_body("no client entry"));
        };

        let unsigned = entries
            .iter()
            .filter(|e| e.address().is_some_and(|a| *a != server))
            .any(|e| e.signature().map_or(true, Value::is_void));
        if unsigned {
            return Ok(error_body("unsigned entry"));
        }

        Ok(serde_json::json!({ "token": self.issue_token(&client.id)? }).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{challenge_params, client_principal};
    use smartauth_core::validate_challenge;

    #[test]
    fn test_issued_challenge_validates() {
        let server = MockChallengeServer::new();
        let entries = server.challenge_for(&client_principal(), None);
        validate_challenge(&entries, &challenge_params(), &hasher()).unwrap();
    }

    #[test]
    fn test_flipped_challenge_rejected() {
        let server = MockChallengeServer::new();
        server.tamper(Tamper::FlipServerSignature);
        let entries = server.challenge_for(&client_principal(), None);
        assert!(validate_challenge(&entries, &challenge_params(), &hasher()).is_err());
    }

    #[tokio::test]
    async fn test_unknown_account() {
        let server = MockChallengeServer::new();
        let body = server
            .get_challenge(&ChallengeQuery {
                account: "CNOBODY".into(),
                home_domain: HOME_DOMAIN.into(),
                client_domain: None,
            })
            .await
            .unwrap();
        assert!(body.contains("unknown account"));
    }
}
