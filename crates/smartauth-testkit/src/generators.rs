//! Proptest generators for property-based testing.

use proptest::prelude::*;

use smartauth_core::{Address, AuthorizationEntry, EntryBuilder, Keypair, Value};
use smartauth_signer::{KeypairSigner, Signer};

/// Generate a random keypair.
pub fn keypair() -> impl Strategy<Value = Keypair> {
    any::<[u8; 32]>().prop_map(|seed| Keypair::from_seed(&seed))
}

pub fn contract_address() -> impl Strategy<Value = Address> {
    any::<[u8; 32]>().prop_map(Address::Contract)
}

/// Generate either kind of address.
pub fn address() -> impl Strategy<Value = Address> {
    prop_oneof![
        any::<[u8; 32]>().prop_map(Address::Account),
        any::<[u8; 32]>().prop_map(Address::Contract),
    ]
}

/// Generate a challenge nonce string.
pub fn nonce() -> impl Strategy<Value = String> {
    "[0-9a-f]{16,48}".prop_map(String::from)
}

/// Generate `1..=max` keypair signers with distinct keys.
pub fn keypair_signers(max: usize) -> impl Strategy<Value = Vec<Signer>> {
    prop::collection::hash_set(any::<[u8; 32]>(), 1..=max).prop_map(|seeds| {
        seeds
            .into_iter()
            .map(|seed| Signer::digest(KeypairSigner::new(Keypair::from_seed(&seed))))
            .collect()
    })
}

/// Generate a leaf argument value.
pub fn leaf_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Void),
        any::<bool>().prop_map(Value::Bool),
        any::<u32>().prop_map(Value::U32),
        any::<i64>().prop_map(Value::I64),
        any::<i128>().prop_map(Value::I128),
        prop::collection::vec(any::<u8>(), 0..64).prop_map(Value::bytes),
        "[a-z_]{1,16}".prop_map(Value::symbol),
        ".{0,32}".prop_map(Value::string),
        address().prop_map(Value::Address),
    ]
}

/// Generate an unsigned entry addressed to `address`-like principals.
pub fn entry() -> impl Strategy<Value = AuthorizationEntry> {
    (
        address(),
        contract_address(),
        "[a-z_]{1,16}",
        any::<i64>(),
        any::<u32>(),
        prop::collection::vec(leaf_value(), 0..4),
    )
        .prop_map(|(address, contract, function, nonce, expiration, args)| {
            args.into_iter()
                .fold(
                    EntryBuilder::new(address, contract, function)
                        .nonce(nonce)
                        .expiration(expiration),
                    EntryBuilder::arg,
                )
                .build()
        })
}
