//! # smartauth
//!
//! Challenge-response authentication and multi-signer authorization for
//! smart accounts.
//!
//! ## Overview
//!
//! - **Authenticate**: fetch a server-issued challenge, validate it, sign the
//!   client entries, post them back and receive a session token.
//! - **Operate**: simulate an operation, sign the entries addressed to the
//!   connected account with every supplied signer, re-simulate for the real
//!   fee, then submit.
//! - **Observe**: lifecycle events on an [`EventBus`].
//!
//! Remote services sit behind traits ([`LedgerClient`], [`ChallengeEndpoint`],
//! [`SignerDiscovery`], [`CredentialStore`]) so transports are pluggable.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use smartauth::{AuthOptions, SmartAuth};
//! use smartauth::core::{CborCodec, Ed25519Sha256, Keypair, Principal};
//! use smartauth::signer::{KeypairSigner, Signer};
//! # async fn example(
//! #     ledger: Arc<dyn smartauth::LedgerClient>,
//! #     endpoint: Arc<dyn smartauth::ChallengeEndpoint>,
//! #     principal: Principal,
//! #     config_json: &str,
//! # ) -> smartauth::Result<()> {
//! let config = smartauth::AuthConfig::from_json(config_json)?;
//! let auth = SmartAuth::new(
//!     config,
//!     Arc::new(CborCodec),
//!     Arc::new(Ed25519Sha256),
//!     ledger,
//!     endpoint,
//! )?;
//!
//! let signer = Signer::digest(KeypairSigner::new(Keypair::generate()));
//! let token = auth
//!     .authenticate(principal, &[signer], AuthOptions::default())
//!     .await?;
//! println!("session valid until {}", token.expires_at());
//! # Ok(())
//! # }
//! ```
//!
//! ## Re-exports
//!
//! - `smartauth::core` - entries, codec, hasher and challenge validator
//! - `smartauth::signer` - signer variants and signature collection

pub mod challenge;
pub mod client;
pub mod config;
pub mod context;
pub mod discovery;
pub mod endpoint;
pub mod error;
pub mod events;
pub mod ledger;
pub mod pipeline;
pub mod session;
pub mod store;
pub mod token;

pub use smartauth_core as core;
pub use smartauth_signer as signer;

pub use challenge::{AuthOptions, ChallengeFlow, ClientDomain, FlowState};
pub use client::SmartAuth;
pub use config::{AuthConfig, DEFAULT_EXPIRATION_MARGIN};
pub use context::AuthContext;
pub use discovery::{select_signers, SignerDiscovery};
pub use endpoint::{ChallengeEndpoint, ChallengeQuery, ChallengeResponse};
pub use error::{AuthError, ErrorKind, Result, TransportError};
pub use events::{Event, EventBus, EventKind, SubscriptionId};
pub use ledger::{
    AssembledOperation, LedgerClient, LedgerResult, Operation, SimulationResult, SubmitResult,
};
pub use session::{Session, SessionSnapshot};
pub use store::{CredentialStore, MemoryCredentialStore, StoreError, StoreResult};
pub use token::{AuthToken, TokenClaims};
