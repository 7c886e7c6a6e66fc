//! Scripted signer collaborators: device authenticators, delegate wallets
//! and signer discovery.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use smartauth::{SignerDiscovery, TransportError};
use smartauth_core::{
    account_signature_value, Address, AuthorizationEntry, CborCodec, Codec, Hash32, Keypair,
    Value,
};
use smartauth_signer::{
    DelegateError, DelegateWallet, DelegatedSigner, DeviceAssertion, DeviceAuthenticator,
    DeviceError, DeviceSigner, Signer,
};

/// Verifier contract used by scripted device signers.
pub const DEVICE_VERIFIER: Address = Address::Contract([0x7e; 32]);

/// How a scripted device answers a prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceMode {
    Confirm,
    Cancel,
    Fail,
}

/// A device authenticator that answers from a script and counts prompts.
#[derive(Debug)]
pub struct ScriptedDevice {
    mode: DeviceMode,
    keypair: Keypair,
    prompts: AtomicUsize,
}

impl ScriptedDevice {
    pub fn new(mode: DeviceMode, seed: u8) -> Arc<Self> {
        Arc::new(Self {
            mode,
            keypair: Keypair::from_seed(&[seed; 32]),
            prompts: AtomicUsize::new(0),
        })
    }

    pub fn prompts(&self) -> usize {
        self.prompts.load(Ordering::SeqCst)
    }

    /// Key material identifying this device to the verifier.
    pub fn key_material(&self) -> Bytes {
        Bytes::copy_from_slice(self.keypair.public_key().as_bytes())
    }

    /// A signer backed by this device.
    pub fn signer(self: &Arc<Self>) -> Signer {
        Signer::digest(DeviceSigner::new(
            DEVICE_VERIFIER,
            self.key_material(),
            Arc::clone(self) as Arc<dyn DeviceAuthenticator>,
        ))
    }
}

#[async_trait]
impl DeviceAuthenticator for ScriptedDevice {
    async fn authenticate(&self, digest: &Hash32) -> Result<DeviceAssertion, DeviceError> {
        self.prompts.fetch_add(1, Ordering::SeqCst);
        match self.mode {
            DeviceMode::Confirm => Ok(DeviceAssertion {
                authenticator_data: Bytes::from_static(&[0x49; 37]),
                client_data: Bytes::from(format!(r#"{{"challenge":"{}"}}"#, digest.to_hex())),
                signature: Bytes::copy_from_slice(self.keypair.sign(digest.as_bytes()).as_bytes()),
            }),
            DeviceMode::Cancel => Err(DeviceError::Cancelled),
            DeviceMode::Fail => Err(DeviceError::Failed("authenticator unavailable".into())),
        }
    }
}

/// A delegate wallet that signs every request for its own address.
#[derive(Debug)]
pub struct ScriptedDelegate {
    address: Address,
    keypair: Keypair,
    requests: Mutex<Vec<AuthorizationEntry>>,
}

impl ScriptedDelegate {
    pub fn new(address: Address, seed: u8) -> Arc<Self> {
        Arc::new(Self {
            address,
            keypair: Keypair::from_seed(&[seed; 32]),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Entries the wallet was asked to sign.
    pub fn requests(&self) -> Vec<AuthorizationEntry> {
        self.requests.lock().unwrap().clone()
    }

    pub fn signer(self: &Arc<Self>) -> Signer {
        Signer::entry(DelegatedSigner::new(
            self.address,
            Arc::clone(self) as Arc<dyn DelegateWallet>,
            Arc::new(CborCodec),
        ))
    }
}

#[async_trait]
impl DelegateWallet for ScriptedDelegate {
    async fn can_sign_for(&self, address: &Address) -> Result<bool, DelegateError> {
        Ok(*address == self.address)
    }

    async fn sign_entry(&self, encoded_entry: Bytes) -> Result<Bytes, DelegateError> {
        let entry = CborCodec
            .decode_entry(&encoded_entry)
            .map_err(|e| DelegateError::Rejected(e.to_string()))?;
        self.requests.lock().unwrap().push(entry.clone());

        let signature = self.keypair.sign(&encoded_entry);
        let signed = entry.with_signature(account_signature_value(
            &self.keypair.public_key(),
            signature.as_bytes(),
        ));
        CborCodec
            .encode_entry(&signed)
            .map(Bytes::from)
            .map_err(|e| DelegateError::Rejected(e.to_string()))
    }
}

/// Discovery that reports a fixed key set.
#[derive(Debug, Clone)]
pub struct FixedDiscovery(pub Vec<Value>);

impl FixedDiscovery {
    pub fn of(signers: &[Signer]) -> Self {
        Self(signers.iter().map(Signer::key).collect())
    }
}

#[async_trait]
impl SignerDiscovery for FixedDiscovery {
    async fn registered_signers(&self, _account: &Address) -> Result<Vec<Value>, TransportError> {
        Ok(self.0.clone())
    }
}

/// Discovery whose lookups always fail.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingDiscovery;

#[async_trait]
impl SignerDiscovery for FailingDiscovery {
    async fn registered_signers(&self, _account: &Address) -> Result<Vec<Value>, TransportError> {
        Err(TransportError::Network("discovery service unreachable".into()))
    }
}
