//! Test fixtures and helpers.
//!
//! Deterministic keys, a valid configuration and a ready-to-use client
//! wired to in-memory collaborators.

use std::sync::Arc;

use smartauth::{AuthConfig, AuthContext, SmartAuth};
use smartauth_core::{
    Address, CborCodec, ChallengeParams, Ed25519Sha256, Keypair, PayloadHasher, Principal,
};
use smartauth_signer::{KeypairSigner, Signer};

use crate::ledger::MockLedger;
use crate::server::MockChallengeServer;

pub const PASSPHRASE: &str = "Test SDF Network ; September 2015";
pub const HOME_DOMAIN: &str = "example.com";
pub const WEB_AUTH_DOMAIN: &str = "auth.example.com";
pub const SERVER_ID: &str = "GSERVER";
pub const CLIENT_ID: &str = "CCLIENT";
pub const VERIFYING_CONTRACT: Address = Address::Contract([0xee; 32]);
pub const CLIENT_CONTRACT: Address = Address::Contract([0xc1; 32]);
pub const SERVER_SEED: [u8; 32] = [0x51; 32];

pub fn server_keypair() -> Keypair {
    Keypair::from_seed(&SERVER_SEED)
}

pub fn client_principal() -> Principal {
    Principal::new(CLIENT_CONTRACT, CLIENT_ID)
}

/// A valid configuration matching [`MockChallengeServer::new`].
pub fn config() -> AuthConfig {
    AuthConfig {
        network_passphrase: PASSPHRASE.into(),
        home_domain: HOME_DOMAIN.into(),
        web_auth_domain: WEB_AUTH_DOMAIN.into(),
        web_auth_contract: VERIFYING_CONTRACT.to_hex(),
        server_signing_key: server_keypair().public_key().to_hex(),
        server_account: SERVER_ID.into(),
        ..AuthConfig::default()
    }
}

/// Expected challenge values for the default client.
pub fn challenge_params() -> ChallengeParams {
    ChallengeParams {
        client: client_principal(),
        server_key: server_keypair().public_key(),
        server_id: SERVER_ID.into(),
        home_domain: HOME_DOMAIN.into(),
        web_auth_domain: WEB_AUTH_DOMAIN.into(),
        verifying_contract: VERIFYING_CONTRACT,
        client_domain: None,
    }
}

pub fn hasher() -> PayloadHasher {
    PayloadHasher::new(Arc::new(CborCodec), Arc::new(Ed25519Sha256), PASSPHRASE)
}

/// A keypair signer with a deterministic key.
pub fn keypair_signer(seed: u8) -> Signer {
    Signer::digest(KeypairSigner::new(Keypair::from_seed(&[seed; 32])))
}

/// A client wired to a mock ledger and challenge server.
pub struct TestFixture {
    pub ledger: Arc<MockLedger>,
    pub server: Arc<MockChallengeServer>,
    pub auth: SmartAuth,
}

impl TestFixture {
    /// The default client registered with the server; ledger at height 1000.
    pub fn new() -> Self {
        Self::with_context(|ctx| ctx)
    }

    /// Like [`TestFixture::new`], with a hook to adjust the context
    /// (e.g. to install signer discovery).
    pub fn with_context(adjust: impl FnOnce(AuthContext) -> AuthContext) -> Self {
        let ledger = Arc::new(MockLedger::new(1_000));
        let server = Arc::new(MockChallengeServer::new());
        server.register(client_principal());

        let ctx = AuthContext::new(
            config(),
            Arc::new(CborCodec),
            Arc::new(Ed25519Sha256),
            ledger.clone(),
            server.clone(),
        )
        .expect("fixture config is valid");

        Self {
            ledger,
            server,
            auth: SmartAuth::from_context(adjust(ctx)),
        }
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}
