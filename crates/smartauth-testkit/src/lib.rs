//! # smartauth testkit
//!
//! Testing utilities for smartauth.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: deterministic keys, a valid configuration and a client
//!   wired to in-memory collaborators
//! - **Collaborators**: a mock ledger, a mock challenge server, scripted
//!   device authenticators, delegate wallets and signer discovery
//! - **Generators**: proptest strategies for property-based testing
//!
//! ## Test Fixtures
//!
//! ```rust,no_run
//! use smartauth::AuthOptions;
//! use smartauth_testkit::{client_principal, keypair_signer, TestFixture};
//!
//! # async fn example() -> smartauth::Result<()> {
//! let fixture = TestFixture::new();
//! let token = fixture
//!     .auth
//!     .authenticate(client_principal(), &[keypair_signer(1)], AuthOptions::default())
//!     .await?;
//! assert_eq!(token.claims.sub, "CCLIENT");
//! # Ok(())
//! # }
//! ```

pub mod fixtures;
pub mod generators;
pub mod ledger;
pub mod server;
pub mod signers;

pub use fixtures::{
    challenge_params, client_principal, config, hasher, keypair_signer, server_keypair,
    TestFixture,
};
pub use ledger::MockLedger;
pub use server::{MockChallengeServer, Tamper};
pub use signers::{
    DeviceMode, FailingDiscovery, FixedDiscovery, ScriptedDelegate, ScriptedDevice,
    DEVICE_VERIFIER,
};
