//! Challenge validation.
//!
//! A challenge is an untrusted list of authorization entries issued by a
//! remote authentication server. Nothing in it may be signed until every
//! check here passes. Checks run in a fixed order and stop at the first
//! violation:
//!
//! 1. the entry list is non-empty
//! 2. each root invocation has no sub-invocations
//! 3. each authorized function is a contract call
//! 4. each call targets the verifying contract
//! 5. each call uses the verification function name
//! 6. each call's first argument is a string-keyed map of challenge fields
//! 7. account, domains and server account match the expected values
//! 8. the nonce is present and identical across all entries
//! 9. a declared client-domain account matches the expected one
//! 10. each entry addresses exactly one known principal, at most once
//! 11. the server entry carries a valid signature by the server key
//! 12. server, client and (if requested) client-domain entries all exist

use crate::crypto::{Ed25519PublicKey, Hash32};
use crate::entry::AuthorizationEntry;
use crate::error::{
    ChallengeError, ChallengeField, PrincipalRole, SignatureFailure, StructuralViolation,
};
use crate::payload::PayloadHasher;
use crate::types::{Address, Principal};
use crate::value::Value;

/// Function every challenge entry must invoke on the verifying contract.
pub const WEB_AUTH_VERIFY_FN: &str = "web_auth_verify";

/// Challenge argument keys.
pub mod keys {
    pub const ACCOUNT: &str = "account";
    pub const CLIENT_DOMAIN: &str = "client_domain";
    pub const CLIENT_DOMAIN_ACCOUNT: &str = "client_domain_account";
    pub const HOME_DOMAIN: &str = "home_domain";
    pub const NONCE: &str = "nonce";
    pub const WEB_AUTH_DOMAIN: &str = "web_auth_domain";
    pub const WEB_AUTH_DOMAIN_ACCOUNT: &str = "web_auth_domain_account";
}

/// Values the client expects a challenge to carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeParams {
    /// The principal authenticating.
    pub client: Principal,
    /// The server's signing key.
    pub server_key: Ed25519PublicKey,
    /// The server account's textual identifier.
    pub server_id: String,
    pub home_domain: String,
    pub web_auth_domain: String,
    /// The contract every entry must invoke.
    pub verifying_contract: Address,
    /// Set when client-domain verification is requested.
    pub client_domain: Option<Principal>,
}

impl ChallengeParams {
    /// The server principal as it appears in entry credentials.
    pub fn server(&self) -> Principal {
        Principal::new(Address::account(&self.server_key), self.server_id.clone())
    }
}

/// The string-keyed argument map of a challenge entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeArgs {
    pub account: String,
    pub home_domain: String,
    pub web_auth_domain: String,
    pub web_auth_domain_account: String,
    pub nonce: String,
    pub client_domain: Option<String>,
    pub client_domain_account: Option<String>,
}

impl ChallengeArgs {
    /// Extract the challenge fields from an entry's first argument.
    pub fn from_value(value: &Value) -> Result<Self, StructuralViolation> {
        if !value.is_string_keyed_map() {
            return Err(StructuralViolation::MissingArgumentMap);
        }
        if let Some(key) = value.repeated_map_key() {
            return Err(StructuralViolation::DuplicateArgument {
                key: key.to_string(),
            });
        }
        let required = |key: &'static str| -> Result<String, StructuralViolation> {
            match value.map_get(key) {
                None => Err(StructuralViolation::MissingArgument { key }),
                Some(Value::String(s)) => Ok(s.clone()),
                Some(_) => Err(StructuralViolation::MalformedArgument { key }),
            }
        };
        let optional = |key: &'static str| -> Result<Option<String>, StructuralViolation> {
            match value.map_get(key) {
                None => Ok(None),
                Some(Value::String(s)) => Ok(Some(s.clone())),
                Some(_) => Err(StructuralViolation::MalformedArgument { key }),
            }
        };

        Ok(Self {
            account: required(keys::ACCOUNT)?,
            home_domain: required(keys::HOME_DOMAIN)?,
            web_auth_domain: required(keys::WEB_AUTH_DOMAIN)?,
            web_auth_domain_account: required(keys::WEB_AUTH_DOMAIN_ACCOUNT)?,
            nonce: required(keys::NONCE)?,
            client_domain: optional(keys::CLIENT_DOMAIN)?,
            client_domain_account: optional(keys::CLIENT_DOMAIN_ACCOUNT)?,
        })
    }

    /// Build the argument map, keys in ascending order.
    pub fn to_value(&self) -> Value {
        let mut entries = vec![(keys::ACCOUNT, self.account.clone())];
        if let Some(domain) = &self.client_domain {
            entries.push((keys::CLIENT_DOMAIN, domain.clone()));
        }
        if let Some(account) = &self.client_domain_account {
            entries.push((keys::CLIENT_DOMAIN_ACCOUNT, account.clone()));
        }
        entries.push((keys::HOME_DOMAIN, self.home_domain.clone()));
        entries.push((keys::NONCE, self.nonce.clone()));
        entries.push((keys::WEB_AUTH_DOMAIN, self.web_auth_domain.clone()));
        entries.push((keys::WEB_AUTH_DOMAIN_ACCOUNT, self.web_auth_domain_account.clone()));

        Value::Map(
            entries
                .into_iter()
                .map(|(k, v)| (Value::symbol(k), Value::String(v)))
                .collect(),
        )
    }
}

/// Positions of the classified entries in an accepted challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedChallenge {
    pub server_index: usize,
    pub client_index: usize,
    pub client_domain_index: Option<usize>,
    /// The nonce shared by every entry.
    pub nonce: String,
}

/// Validate an untrusted challenge against the expected parameters.
///
/// Pure: repeated calls on the same inputs return the same verdict.
pub fn validate_challenge(
    entries: &[AuthorizationEntry],
    params: &ChallengeParams,
    hasher: &PayloadHasher,
) -> Result<ValidatedChallenge, ChallengeError> {
    if entries.is_empty() {
        return Err(ChallengeError::Structural {
            index: None,
            violation: StructuralViolation::EmptyEntryList,
        });
    }

    let server = params.server();
    let mut nonce: Option<String> = None;
    let mut server_index = None;
    let mut client_index = None;
    let mut client_domain_index = None;

    for (index, entry) in entries.iter().enumerate() {
        let args = check_entry_shape(index, entry, params)?;
        check_identity(index, &args, params)?;

        match &nonce {
            None => nonce = Some(args.nonce.clone()),
            Some(expected) if expected.as_bytes() != args.nonce.as_bytes() => {
                return Err(ChallengeError::IdentityMismatch {
                    index,
                    field: ChallengeField::Nonce,
                    expected: expected.clone(),
                    actual: args.nonce,
                });
            }
            Some(_) => {}
        }

        if let (Some(expected), Some(declared)) =
            (&params.client_domain, &args.client_domain_account)
        {
            if declared != &expected.id {
                return Err(ChallengeError::IdentityMismatch {
                    index,
                    field: ChallengeField::ClientDomainAccount,
                    expected: expected.id.clone(),
                    actual: declared.clone(),
                });
            }
        }

        let address = entry.address().ok_or_else(|| {
            ChallengeError::structural(index, StructuralViolation::NotAddressBased)
        })?;

        let role = if *address == server.address {
            PrincipalRole::Server
        } else if *address == params.client.address {
            PrincipalRole::Client
        } else if params
            .client_domain
            .as_ref()
            .is_some_and(|cd| *address == cd.address)
        {
            PrincipalRole::ClientDomain
        } else {
            return Err(ChallengeError::structural(
                index,
                StructuralViolation::UnexpectedPrincipal { address: *address },
            ));
        };

        let slot = match role {
            PrincipalRole::Server => &mut server_index,
            PrincipalRole::Client => &mut client_index,
            PrincipalRole::ClientDomain => &mut client_domain_index,
        };
        if slot.is_some() {
            return Err(ChallengeError::structural(
                index,
                StructuralViolation::DuplicatePrincipalEntry { role },
            ));
        }
        *slot = Some(index);

        if role == PrincipalRole::Server {
            verify_server_signature(entry, params, hasher)?;
        }
    }

    let server_index = server_index.ok_or_else(|| ChallengeError::MissingPrincipalEntry {
        role: PrincipalRole::Server,
        principal: server.id.clone(),
    })?;
    let client_index = client_index.ok_or_else(|| ChallengeError::MissingPrincipalEntry {
        role: PrincipalRole::Client,
        principal: params.client.id.clone(),
    })?;
    if let Some(cd) = &params.client_domain {
        if client_domain_index.is_none() {
            return Err(ChallengeError::MissingPrincipalEntry {
                role: PrincipalRole::ClientDomain,
                principal: cd.id.clone(),
            });
        }
    }

    tracing::debug!(
        entries = entries.len(),
        client = %params.client,
        "challenge accepted"
    );

    Ok(ValidatedChallenge {
        server_index,
        client_index,
        client_domain_index,
        nonce: nonce.unwrap_or_default(),
    })
}

/// Checks 2 through 6: structure of a single entry.
fn check_entry_shape(
    index: usize,
    entry: &AuthorizationEntry,
    params: &ChallengeParams,
) -> Result<ChallengeArgs, ChallengeError> {
    let root = &entry.root_invocation;
    if !root.is_leaf() {
        return Err(ChallengeError::structural(
            index,
            StructuralViolation::NonEmptySubInvocations {
                count: root.sub_invocations.len(),
            },
        ));
    }

    let call = root
        .as_contract_call()
        .ok_or_else(|| ChallengeError::structural(index, StructuralViolation::NotContractFunction))?;

    if call.contract_address != params.verifying_contract {
        return Err(ChallengeError::structural(
            index,
            StructuralViolation::WrongContract {
                expected: params.verifying_contract,
                actual: call.contract_address,
            },
        ));
    }

    if call.function_name != WEB_AUTH_VERIFY_FN {
        return Err(ChallengeError::structural(
            index,
            StructuralViolation::WrongFunction {
                expected: WEB_AUTH_VERIFY_FN.to_string(),
                actual: call.function_name.clone(),
            },
        ));
    }

    let first = call
        .args
        .first()
        .ok_or_else(|| ChallengeError::structural(index, StructuralViolation::MissingArgumentMap))?;
    ChallengeArgs::from_value(first).map_err(|violation| ChallengeError::structural(index, violation))
}

/// Check 7: identity fields.
fn check_identity(
    index: usize,
    args: &ChallengeArgs,
    params: &ChallengeParams,
) -> Result<(), ChallengeError> {
    let checks = [
        (ChallengeField::Account, &params.client.id, &args.account),
        (ChallengeField::HomeDomain, &params.home_domain, &args.home_domain),
        (ChallengeField::WebAuthDomain, &params.web_auth_domain, &args.web_auth_domain),
        (
            ChallengeField::WebAuthDomainAccount,
            &params.server_id,
            &args.web_auth_domain_account,
        ),
    ];
    for (field, expected, actual) in checks {
        if expected != actual {
            return Err(ChallengeError::IdentityMismatch {
                index,
                field,
                expected: expected.clone(),
                actual: actual.clone(),
            });
        }
    }
    Ok(())
}

/// Check 11: the server entry is signed by the server key.
fn verify_server_signature(
    entry: &AuthorizationEntry,
    params: &ChallengeParams,
    hasher: &PayloadHasher,
) -> Result<(), ChallengeError> {
    let reject = |reason| ChallengeError::SignatureVerification {
        principal: params.server_id.clone(),
        reason,
    };

    let signature_value = entry.signature().unwrap_or(&Value::Void);
    let (public_key, signature) = extract_account_signature(signature_value).map_err(reject)?;

    if public_key != params.server_key.as_bytes() {
        return Err(reject(SignatureFailure::PublicKeyMismatch));
    }

    let digest: Hash32 = hasher.hash_current(entry)?;
    if !hasher
        .crypto()
        .verify(digest.as_bytes(), signature, public_key)
    {
        return Err(reject(SignatureFailure::Invalid));
    }
    Ok(())
}

/// Extract `(public_key, signature)` from a classic account signature value.
///
/// Accepts `Vec[Map{public_key, signature}]` or a bare map.
pub fn extract_account_signature(value: &Value) -> Result<(&[u8], &[u8]), SignatureFailure> {
    let map = match value {
        Value::Void => return Err(SignatureFailure::Missing),
        Value::Vec(items) => match items.as_slice() {
            [] => return Err(SignatureFailure::Missing),
            [single] => single,
            _ => return Err(SignatureFailure::Malformed),
        },
        Value::Map(_) => value,
        _ => return Err(SignatureFailure::Malformed),
    };

    let public_key = map
        .map_get("public_key")
        .and_then(Value::as_bytes)
        .ok_or(SignatureFailure::Malformed)?;
    let signature = map
        .map_get("signature")
        .and_then(Value::as_bytes)
        .ok_or(SignatureFailure::Malformed)?;
    Ok((public_key, signature))
}

/// Build a classic account signature value: `Vec[Map{public_key, signature}]`.
pub fn account_signature_value(public_key: &Ed25519PublicKey, signature: &[u8]) -> Value {
    Value::Vec(vec![Value::Map(vec![
        (Value::symbol("public_key"), Value::bytes(public_key.as_bytes())),
        (Value::symbol("signature"), Value::bytes(signature)),
    ])])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical::CborCodec;
    use crate::crypto::{Crypto, Ed25519Sha256, Keypair};
    use crate::entry::{AuthorizedInvocation, Credentials, EntryBuilder};
    use std::sync::Arc;

    const PASSPHRASE: &str = "Test SDF Network ; September 2015";

    struct Fixture {
        server: Keypair,
        params: ChallengeParams,
        hasher: PayloadHasher,
    }

    impl Fixture {
        fn new() -> Self {
            let server = Keypair::from_seed(&[0x51; 32]);
            let params = ChallengeParams {
                client: Principal::new(Address::Contract([0xc1; 32]), "CCLIENT"),
                server_key: server.public_key(),
                server_id: "GSERVER".into(),
                home_domain: "example.com".into(),
                web_auth_domain: "auth.example.com".into(),
                verifying_contract: Address::Contract([0xee; 32]),
                client_domain: None,
            };
            let hasher = PayloadHasher::new(Arc::new(CborCodec), Arc::new(Ed25519Sha256), PASSPHRASE);
            Self { server, params, hasher }
        }

        fn args(&self, nonce: &str) -> ChallengeArgs {
            ChallengeArgs {
                account: self.params.client.id.clone(),
                home_domain: self.params.home_domain.clone(),
                web_auth_domain: self.params.web_auth_domain.clone(),
                web_auth_domain_account: self.params.server_id.clone(),
                nonce: nonce.into(),
                client_domain: None,
                client_domain_account: None,
            }
        }

        fn entry_for(&self, address: Address, args: &ChallengeArgs) -> AuthorizationEntry {
            EntryBuilder::new(address, self.params.verifying_contract, WEB_AUTH_VERIFY_FN)
                .nonce(1)
                .expiration(1_000)
                .arg(args.to_value())
                .build()
        }

        fn signed_server_entry(&self, args: &ChallengeArgs) -> AuthorizationEntry {
            let entry = self.entry_for(Address::account(&self.server.public_key()), args);
            let digest = self.hasher.hash_current(&entry).unwrap();
            let sig = Ed25519Sha256.sign(digest.as_bytes(), &self.server);
            entry.with_signature(account_signature_value(&self.server.public_key(), sig.as_bytes()))
        }

        fn challenge(&self, nonce: &str) -> Vec<AuthorizationEntry> {
            let args = self.args(nonce);
            vec![
                self.signed_server_entry(&args),
                self.entry_for(self.params.client.address, &args),
            ]
        }

        fn validate(&self, entries: &[AuthorizationEntry]) -> Result<ValidatedChallenge, ChallengeError> {
            validate_challenge(entries, &self.params, &self.hasher)
        }
    }

    fn flip_signature_byte(entry: &AuthorizationEntry) -> AuthorizationEntry {
        let value = entry.signature().unwrap();
        let (pk, sig) = extract_account_signature(value).unwrap();
        let mut sig = sig.to_vec();
        sig[0] ^= 0x01;
        let pk = Ed25519PublicKey::from_bytes(pk.try_into().unwrap());
        entry.with_signature(account_signature_value(&pk, &sig))
    }

    #[test]
    fn test_valid_challenge() {
        let f = Fixture::new();
        let result = f.validate(&f.challenge("abc")).unwrap();
        assert_eq!(result.server_index, 0);
        assert_eq!(result.client_index, 1);
        assert_eq!(result.nonce, "abc");
    }

    #[test]
    fn test_entry_order_independent() {
        let f = Fixture::new();
        let mut entries = f.challenge("abc");
        entries.reverse();
        let result = f.validate(&entries).unwrap();
        assert_eq!(result.server_index, 1);
        assert_eq!(result.client_index, 0);
    }

    #[test]
    fn test_validation_is_idempotent() {
        let f = Fixture::new();
        let entries = f.challenge("abc");
        assert_eq!(f.validate(&entries), f.validate(&entries));

        let mut bad = entries.clone();
        bad[0] = flip_signature_byte(&bad[0]);
        assert_eq!(f.validate(&bad), f.validate(&bad));
    }

    #[test]
    fn test_empty_challenge() {
        let f = Fixture::new();
        assert!(matches!(
            f.validate(&[]),
            Err(ChallengeError::Structural {
                index: None,
                violation: StructuralViolation::EmptyEntryList
            })
        ));
    }

    #[test]
    fn test_flipped_signature_byte() {
        let f = Fixture::new();
        let mut entries = f.challenge("abc");
        entries[0] = flip_signature_byte(&entries[0]);
        assert!(matches!(
            f.validate(&entries),
            Err(ChallengeError::SignatureVerification {
                reason: SignatureFailure::Invalid,
                ..
            })
        ));
    }

    #[test]
    fn test_server_signature_by_wrong_key() {
        let f = Fixture::new();
        let mut entries = f.challenge("abc");
        let impostor = Keypair::from_seed(&[0x99; 32]);
        let digest = f.hasher.hash_current(&entries[0]).unwrap();
        let sig = impostor.sign(digest.as_bytes());
        entries[0] = entries[0].with_signature(account_signature_value(&impostor.public_key(), sig.as_bytes()));
        assert!(matches!(
            f.validate(&entries),
            Err(ChallengeError::SignatureVerification {
                reason: SignatureFailure::PublicKeyMismatch,
                ..
            })
        ));
    }

    #[test]
    fn test_unsigned_server_entry() {
        let f = Fixture::new();
        let mut entries = f.challenge("abc");
        entries[0] = entries[0].with_signature(Value::Void);
        assert!(matches!(
            f.validate(&entries),
            Err(ChallengeError::SignatureVerification {
                reason: SignatureFailure::Missing,
                ..
            })
        ));
    }

    #[test]
    fn test_sub_invocation_names_entry() {
        let f = Fixture::new();
        let mut entries = f.challenge("abc");
        entries[1]
            .root_invocation
            .sub_invocations
            .push(AuthorizedInvocation::contract_call(Address::Contract([0x01; 32]), "transfer", vec![]));
        assert_eq!(
            f.validate(&entries),
            Err(ChallengeError::Structural {
                index: Some(1),
                violation: StructuralViolation::NonEmptySubInvocations { count: 1 },
            })
        );
    }

    #[test]
    fn test_wrong_contract() {
        let f = Fixture::new();
        let args = f.args("abc");
        let entry = EntryBuilder::new(f.params.client.address, Address::Contract([0x01; 32]), WEB_AUTH_VERIFY_FN)
            .arg(args.to_value())
            .build();
        let entries = vec![f.signed_server_entry(&args), entry];
        assert!(matches!(
            f.validate(&entries),
            Err(ChallengeError::Structural {
                index: Some(1),
                violation: StructuralViolation::WrongContract { .. },
            })
        ));
    }

    #[test]
    fn test_wrong_function_name() {
        let f = Fixture::new();
        let args = f.args("abc");
        let entry = EntryBuilder::new(f.params.client.address, f.params.verifying_contract, "transfer")
            .arg(args.to_value())
            .build();
        let entries = vec![f.signed_server_entry(&args), entry];
        assert!(matches!(
            f.validate(&entries),
            Err(ChallengeError::Structural {
                violation: StructuralViolation::WrongFunction { .. },
                ..
            })
        ));
    }

    #[test]
    fn test_create_contract_function_rejected() {
        let f = Fixture::new();
        let mut entries = f.challenge("abc");
        entries[1].root_invocation.function =
            crate::entry::AuthorizedFunction::CreateContract(crate::entry::CreateContractArgs {
                deployer: f.params.client.address,
                salt: [0; 32],
                wasm_hash: [0; 32],
            });
        assert!(matches!(
            f.validate(&entries),
            Err(ChallengeError::Structural {
                index: Some(1),
                violation: StructuralViolation::NotContractFunction,
            })
        ));
    }

    #[test]
    fn test_missing_argument_map() {
        let f = Fixture::new();
        let entries = vec![
            f.signed_server_entry(&f.args("abc")),
            EntryBuilder::new(f.params.client.address, f.params.verifying_contract, WEB_AUTH_VERIFY_FN)
                .arg(Value::U32(1))
                .build(),
        ];
        assert!(matches!(
            f.validate(&entries),
            Err(ChallengeError::Structural {
                violation: StructuralViolation::MissingArgumentMap,
                ..
            })
        ));
    }

    #[test]
    fn test_missing_nonce_argument() {
        let f = Fixture::new();
        let args = f.args("abc");
        let mut map = args.to_value();
        if let Value::Map(entries) = &mut map {
            entries.retain(|(k, _)| k.as_str() != Some(keys::NONCE));
        }
        let entry = EntryBuilder::new(f.params.client.address, f.params.verifying_contract, WEB_AUTH_VERIFY_FN)
            .arg(map)
            .build();
        assert!(matches!(
            f.validate(&[entry]),
            Err(ChallengeError::Structural {
                violation: StructuralViolation::MissingArgument { key: "nonce" },
                ..
            })
        ));
    }

    /// Sign `map` as the server and attach the same map to the client entry.
    fn challenge_with_map(f: &Fixture, map: Value) -> Vec<AuthorizationEntry> {
        let server_entry = EntryBuilder::new(
            Address::account(&f.server.public_key()),
            f.params.verifying_contract,
            WEB_AUTH_VERIFY_FN,
        )
        .nonce(1)
        .expiration(1_000)
        .arg(map.clone())
        .build();
        let digest = f.hasher.hash_current(&server_entry).unwrap();
        let sig = Ed25519Sha256.sign(digest.as_bytes(), &f.server);
        let server_entry =
            server_entry.with_signature(account_signature_value(&f.server.public_key(), sig.as_bytes()));
        let client_entry =
            EntryBuilder::new(f.params.client.address, f.params.verifying_contract, WEB_AUTH_VERIFY_FN)
                .nonce(1)
                .expiration(1_000)
                .arg(map)
                .build();
        vec![server_entry, client_entry]
    }

    fn with_extra(args: &ChallengeArgs, extra: &[(&str, &str)]) -> Value {
        let mut map = args.to_value();
        if let Value::Map(entries) = &mut map {
            for (k, v) in extra {
                entries.push((Value::symbol(*k), Value::string(*v)));
            }
        }
        map
    }

    #[test]
    fn test_duplicate_required_argument() {
        let f = Fixture::new();
        let map = with_extra(&f.args("abc"), &[("account", "CEVIL"), ("home_domain", "evil.com")]);
        assert_eq!(
            f.validate(&challenge_with_map(&f, map)),
            Err(ChallengeError::Structural {
                index: Some(0),
                violation: StructuralViolation::DuplicateArgument { key: "account".into() },
            })
        );
    }

    #[test]
    fn test_duplicate_optional_argument() {
        let f = Fixture::new();
        let map = with_extra(
            &f.args("abc"),
            &[("client_domain", "wallet.example.org"), ("client_domain", "evil.com")],
        );
        assert!(matches!(
            f.validate(&challenge_with_map(&f, map)),
            Err(ChallengeError::Structural {
                violation: StructuralViolation::DuplicateArgument { ref key },
                ..
            }) if key == "client_domain"
        ));
    }

    #[test]
    fn test_duplicate_key_mixing_string_and_symbol() {
        let f = Fixture::new();
        let mut map = f.args("abc").to_value();
        if let Value::Map(entries) = &mut map {
            entries.push((Value::string("nonce"), Value::string("other")));
        }
        assert_eq!(
            ChallengeArgs::from_value(&map),
            Err(StructuralViolation::DuplicateArgument { key: "nonce".into() })
        );
    }

    #[test]
    fn test_single_field_flips() {
        let f = Fixture::new();
        let fields = [
            ChallengeField::Account,
            ChallengeField::HomeDomain,
            ChallengeField::WebAuthDomain,
            ChallengeField::WebAuthDomainAccount,
            ChallengeField::Nonce,
        ];

        for field in fields {
            let good = f.args("abc");
            let mut bad = good.clone();
            match field {
                ChallengeField::Account => bad.account = "COTHER".into(),
                ChallengeField::HomeDomain => bad.home_domain = "evil.com".into(),
                ChallengeField::WebAuthDomain => bad.web_auth_domain = "evil.com".into(),
                ChallengeField::WebAuthDomainAccount => bad.web_auth_domain_account = "GOTHER".into(),
                ChallengeField::Nonce => bad.nonce = "abd".into(),
                ChallengeField::ClientDomainAccount => unreachable!(),
            }
            let entries = vec![
                f.signed_server_entry(&good),
                f.entry_for(f.params.client.address, &bad),
            ];
            match f.validate(&entries) {
                Err(ChallengeError::IdentityMismatch { index, field: got, .. }) => {
                    assert_eq!(index, 1);
                    assert_eq!(got, field);
                }
                other => panic!("expected {} mismatch, got {:?}", field, other),
            }
        }
    }

    #[test]
    fn test_missing_client_entry() {
        let f = Fixture::new();
        let entries = vec![f.signed_server_entry(&f.args("abc"))];
        assert!(matches!(
            f.validate(&entries),
            Err(ChallengeError::MissingPrincipalEntry {
                role: PrincipalRole::Client,
                ..
            })
        ));
    }

    #[test]
    fn test_missing_server_entry() {
        let f = Fixture::new();
        let entries = vec![f.entry_for(f.params.client.address, &f.args("abc"))];
        assert!(matches!(
            f.validate(&entries),
            Err(ChallengeError::MissingPrincipalEntry {
                role: PrincipalRole::Server,
                ..
            })
        ));
    }

    #[test]
    fn test_duplicate_client_entry() {
        let f = Fixture::new();
        let mut entries = f.challenge("abc");
        entries.push(entries[1].clone());
        assert!(matches!(
            f.validate(&entries),
            Err(ChallengeError::Structural {
                index: Some(2),
                violation: StructuralViolation::DuplicatePrincipalEntry {
                    role: PrincipalRole::Client
                },
            })
        ));
    }

    #[test]
    fn test_unexpected_principal() {
        let f = Fixture::new();
        let mut entries = f.challenge("abc");
        entries.push(f.entry_for(Address::Contract([0x77; 32]), &f.args("abc")));
        assert!(matches!(
            f.validate(&entries),
            Err(ChallengeError::Structural {
                violation: StructuralViolation::UnexpectedPrincipal { .. },
                ..
            })
        ));
    }

    #[test]
    fn test_source_account_entry_rejected() {
        let f = Fixture::new();
        let mut entries = f.challenge("abc");
        entries[1].credentials = Credentials::SourceAccount;
        assert!(matches!(
            f.validate(&entries),
            Err(ChallengeError::Structural {
                index: Some(1),
                violation: StructuralViolation::NotAddressBased,
            })
        ));
    }

    #[test]
    fn test_client_domain_required_and_checked() {
        let mut f = Fixture::new();
        let domain = Principal::new(Address::Account([0xd0; 32]), "GDOMAIN");
        f.params.client_domain = Some(domain.clone());

        // Requested but absent.
        assert!(matches!(
            f.validate(&f.challenge("abc")),
            Err(ChallengeError::MissingPrincipalEntry {
                role: PrincipalRole::ClientDomain,
                ..
            })
        ));

        // Present and declared correctly.
        let mut args = f.args("abc");
        args.client_domain = Some("wallet.example".into());
        args.client_domain_account = Some(domain.id.clone());
        let entries = vec![
            f.signed_server_entry(&args),
            f.entry_for(f.params.client.address, &args),
            f.entry_for(domain.address, &args),
        ];
        let result = f.validate(&entries).unwrap();
        assert_eq!(result.client_domain_index, Some(2));

        // Declared with the wrong account.
        let mut wrong = args.clone();
        wrong.client_domain_account = Some("GWRONG".into());
        let entries = vec![
            f.signed_server_entry(&args),
            f.entry_for(f.params.client.address, &wrong),
        ];
        assert!(matches!(
            f.validate(&entries),
            Err(ChallengeError::IdentityMismatch {
                field: ChallengeField::ClientDomainAccount,
                ..
            })
        ));
    }

    #[test]
    fn test_extract_account_signature_shapes() {
        let pk = Ed25519PublicKey::from_bytes([1; 32]);
        let v = account_signature_value(&pk, &[2; 64]);
        let (k, s) = extract_account_signature(&v).unwrap();
        assert_eq!(k, &[1; 32]);
        assert_eq!(s.len(), 64);

        let bare = v.as_vec().unwrap()[0].clone();
        assert!(extract_account_signature(&bare).is_ok());
        assert_eq!(extract_account_signature(&Value::Void), Err(SignatureFailure::Missing));
        assert_eq!(extract_account_signature(&Value::Vec(vec![])), Err(SignatureFailure::Missing));
        assert_eq!(extract_account_signature(&Value::U32(1)), Err(SignatureFailure::Malformed));
    }

    mod prop {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn verdict_ignores_entry_order(
                nonce in "[a-zA-Z0-9]{1,24}",
                seed in any::<u64>(),
            ) {
                let f = Fixture::new();
                let mut entries = f.challenge(&nonce);
                entries.push(f.entry_for(Address::Contract([0x77; 32]), &f.args(&nonce)));
                if seed % 2 == 0 {
                    entries.rotate_left((seed % 3) as usize);
                } else {
                    entries.reverse();
                }
                let rejected = matches!(
                    f.validate(&entries),
                    Err(ChallengeError::Structural {
                        violation: StructuralViolation::UnexpectedPrincipal { .. },
                        ..
                    })
                );
                prop_assert!(rejected);

                let valid: Vec<_> = entries
                    .into_iter()
                    .filter(|e| e.address() != Some(&Address::Contract([0x77; 32])))
                    .collect();
                let result = f.validate(&valid).unwrap();
                prop_assert_eq!(result.nonce, nonce);
                prop_assert!(valid[result.server_index].is_addressed_to(&f.params.server().address));
                prop_assert!(valid[result.client_index].is_addressed_to(&f.params.client.address));
            }
        }
    }
}
