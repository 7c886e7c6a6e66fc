//! End-to-end challenge authentication against the in-memory server.

use std::sync::{Arc, Mutex, OnceLock};

use smartauth::core::{
    Address, ChallengeError, Keypair, PrincipalRole, Principal, StructuralViolation, Value,
};
use smartauth::signer::{KeypairSigner, Signer};
use smartauth::{
    AuthError, AuthOptions, ClientDomain, ErrorKind, Event, EventKind, FlowState,
    MemoryCredentialStore,
};
use smartauth_testkit::fixtures::CLIENT_CONTRACT;
use smartauth_testkit::{
    client_principal, keypair_signer, DeviceMode, ScriptedDelegate, ScriptedDevice, Tamper,
    TestFixture,
};

fn init_tracing() {
    static ONCE: OnceLock<()> = OnceLock::new();
    ONCE.get_or_init(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

fn record(fixture: &TestFixture) -> Arc<Mutex<Vec<Event>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    fixture
        .auth
        .events()
        .subscribe_all(move |e| sink.lock().unwrap().push(e.clone()));
    seen
}

#[tokio::test]
async fn test_authenticate_connects_session() -> anyhow::Result<()> {
    init_tracing();
    let fixture = TestFixture::new();
    let seen = record(&fixture);

    let token = fixture
        .auth
        .authenticate(client_principal(), &[keypair_signer(1)], AuthOptions::default())
        .await?;

    assert_eq!(token.claims.sub, "CCLIENT");
    let session = fixture.auth.current_session().await?;
    assert_eq!(session.contract_id, CLIENT_CONTRACT);
    assert_eq!(session.expires_at, Some(token.expires_at()));

    let kinds: Vec<_> = seen.lock().unwrap().iter().map(Event::kind).collect();
    assert_eq!(kinds, vec![EventKind::EntrySigned, EventKind::Connected]);
    Ok(())
}

#[tokio::test]
async fn test_server_entry_left_untouched() -> anyhow::Result<()> {
    init_tracing();
    let fixture = TestFixture::new();
    fixture
        .auth
        .authenticate(client_principal(), &[keypair_signer(1)], AuthOptions::default())
        .await?;

    let issued = fixture.server.issued().remove(0);
    let posted = fixture.server.posted().remove(0);
    assert_eq!(posted.len(), 2);
    assert_eq!(posted[0], issued[0]);

    let client = &posted[1];
    assert_eq!(client.address(), Some(&CLIENT_CONTRACT));
    assert_eq!(client.nonce(), issued[1].nonce());
    // Latest ledger 1000 plus the default margin.
    assert_eq!(client.signature_expiration_ledger(), Some(1_060));
    match client.signature() {
        Some(Value::Map(items)) => assert_eq!(items.len(), 1),
        other => panic!("expected a signature map, got {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn test_flipped_server_signature_rejected_before_prompting() {
    init_tracing();
    let fixture = TestFixture::new();
    fixture.server.tamper(Tamper::FlipServerSignature);
    let device = ScriptedDevice::new(DeviceMode::Confirm, 4);

    let err = fixture
        .auth
        .authenticate(client_principal(), &[device.signer()], AuthOptions::default())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::SignatureVerificationFailure);
    assert!(err.to_string().contains("GSERVER"));
    assert_eq!(device.prompts(), 0);
    assert!(fixture.server.posted().is_empty());
    assert!(!fixture.auth.session().is_connected().await);
}

#[tokio::test]
async fn test_sub_invocation_names_entry() {
    init_tracing();
    let fixture = TestFixture::new();
    fixture.server.tamper(Tamper::SubInvocation);

    let err = fixture
        .auth
        .authenticate(client_principal(), &[keypair_signer(1)], AuthOptions::default())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::StructuralViolation);
    assert!(matches!(
        err,
        AuthError::Challenge(ChallengeError::Structural {
            index: Some(1),
            violation: StructuralViolation::NonEmptySubInvocations { count: 1 },
        })
    ));
}

#[tokio::test]
async fn test_missing_client_entry() {
    init_tracing();
    let fixture = TestFixture::new();
    fixture.server.tamper(Tamper::DropClientEntry);

    let err = fixture
        .auth
        .authenticate(client_principal(), &[keypair_signer(1)], AuthOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AuthError::Challenge(ChallengeError::MissingPrincipalEntry {
            role: PrincipalRole::Client,
            ..
        })
    ));
}

#[tokio::test]
async fn test_passphrase_mismatch() {
    init_tracing();
    let fixture = TestFixture::new();
    fixture.server.tamper(Tamper::WrongPassphrase);

    let err = fixture
        .auth
        .authenticate(client_principal(), &[keypair_signer(1)], AuthOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ProtocolViolation);
}

#[tokio::test]
async fn test_unknown_account_is_endpoint_error() {
    init_tracing();
    let fixture = TestFixture::new();
    let stranger = Principal::new(Address::Contract([0x99; 32]), "CSTRANGER");

    let err = fixture
        .auth
        .authenticate(stranger, &[keypair_signer(1)], AuthOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Endpoint(ref m) if m == "unknown account"));
}

#[tokio::test]
async fn test_cancellation_skips_delegate() {
    init_tracing();
    let fixture = TestFixture::new();
    let device = ScriptedDevice::new(DeviceMode::Cancel, 4);
    let delegate = ScriptedDelegate::new(Address::Contract([0xde; 32]), 5);

    // Delegate listed first; collection order still prompts the device first.
    let err = fixture
        .auth
        .authenticate(
            client_principal(),
            &[delegate.signer(), device.signer()],
            AuthOptions::default(),
        )
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::SigningCancelled);
    assert!(!err.is_retryable());
    assert_eq!(device.prompts(), 1);
    assert!(delegate.requests().is_empty());
    assert!(fixture.server.posted().is_empty());
}

#[tokio::test]
async fn test_client_domain_entry_signed() -> anyhow::Result<()> {
    init_tracing();
    let fixture = TestFixture::new();
    let domain_key = Keypair::from_seed(&[0xd0; 32]);
    let domain = Principal::new(Address::account(&domain_key.public_key()), "GWALLET");
    fixture
        .server
        .register_client_domain("wallet.example.org", domain.clone());

    let options = AuthOptions {
        client_domain: Some(ClientDomain {
            domain: "wallet.example.org".into(),
            principal: domain.clone(),
            signers: vec![Signer::digest(KeypairSigner::new(domain_key))],
        }),
        credential_id: None,
    };
    fixture
        .auth
        .authenticate(client_principal(), &[keypair_signer(1)], options)
        .await?;

    let posted = fixture.server.posted().remove(0);
    assert_eq!(posted.len(), 3);
    let domain_entry = posted
        .iter()
        .find(|e| e.is_addressed_to(&domain.address))
        .expect("client domain entry posted");
    // Classic accounts take a single account signature, not a map.
    assert!(matches!(domain_entry.signature(), Some(Value::Vec(items)) if items.len() == 1));
    Ok(())
}

#[tokio::test]
async fn test_client_domain_without_signers() {
    init_tracing();
    let fixture = TestFixture::new();
    let domain = Principal::new(Address::Account([0xd1; 32]), "GWALLET");
    fixture
        .server
        .register_client_domain("wallet.example.org", domain.clone());

    let options = AuthOptions {
        client_domain: Some(ClientDomain {
            domain: "wallet.example.org".into(),
            principal: domain,
            signers: vec![],
        }),
        credential_id: None,
    };
    let err = fixture
        .auth
        .authenticate(client_principal(), &[keypair_signer(1)], options)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SigningUnavailable);
}

#[tokio::test]
async fn test_flow_steps_in_order() -> anyhow::Result<()> {
    init_tracing();
    let fixture = TestFixture::new();
    let mut flow = fixture
        .auth
        .challenge(client_principal(), &AuthOptions::default())?;

    flow.fetch().await?;
    assert_eq!(flow.state(), FlowState::Received);
    assert_eq!(flow.validate()?.client_index, 1);
    assert_eq!(flow.state(), FlowState::Validated);

    flow.sign(&[keypair_signer(1)]).await?;
    flow.submit().await?;
    assert_eq!(flow.state(), FlowState::Submitted);

    // Signing again after submission is out of order.
    let err = flow.sign(&[keypair_signer(1)]).await.unwrap_err();
    assert!(matches!(
        err,
        AuthError::InvalidTransition {
            from: FlowState::Submitted,
            attempted: FlowState::Signed
        }
    ));
    assert_eq!(flow.state(), FlowState::Failed);
    Ok(())
}

#[tokio::test]
async fn test_validate_challenge_is_pure() {
    init_tracing();
    let fixture = TestFixture::new();
    let entries = fixture.server.challenge_for(&client_principal(), None);
    let params = smartauth_testkit::challenge_params();

    let first = fixture.auth.validate_challenge(&entries, &params);
    let second = fixture.auth.validate_challenge(&entries, &params);
    assert_eq!(first, second);
    assert!(first.is_ok());
    assert!(!fixture.auth.session().is_connected().await);
}

#[tokio::test]
async fn test_credential_store_reconnect() -> anyhow::Result<()> {
    init_tracing();
    let store = Arc::new(MemoryCredentialStore::new());
    let fixture = TestFixture::new();
    let auth = fixture.auth.clone().with_store(store.clone());

    let options = AuthOptions {
        credential_id: Some("cred-1".into()),
        ..AuthOptions::default()
    };
    auth.authenticate(client_principal(), &[keypair_signer(1)], options)
        .await?;
    assert!(auth.disconnect(false).await?);

    assert_eq!(auth.connect("cred-1").await?, CLIENT_CONTRACT);
    let session = auth.current_session().await?;
    assert_eq!(session.credential_id.as_deref(), Some("cred-1"));

    assert!(auth.disconnect(true).await?);
    assert!(matches!(auth.connect("cred-1").await, Err(AuthError::NotConnected)));
    Ok(())
}
