//! Canonical encoding for hashing and deterministic ordering.
//!
//! The wire codec is a collaborator behind the [`Codec`] trait. Everything
//! that must be byte-identical across independent signers (payload
//! preimages, signer-map ordering keys) goes through it.
//!
//! [`CborCodec`] is the bundled implementation. It writes RFC 8949 Core
//! Deterministic Encoding:
//! - Integers use smallest valid encoding
//! - Definite lengths only
//! - No floats, no tags, no CBOR maps
//!
//! Every structure is a positional array with a leading integer tag, so the
//! layout never depends on field names. 128-bit integers are 16-byte
//! big-endian byte strings. Decoding rejects anything that would not
//! re-encode to the exact same bytes.

use ciborium::value::{Integer, Value as Cbor};

use crate::entry::{
    AddressCredentials, AuthorizationEntry, AuthorizedFunction, AuthorizedInvocation,
    CreateContractArgs, Credentials, InvokeContractArgs,
};
use crate::error::CodecError;
use crate::payload::SignaturePayloadPreimage;
use crate::types::Address;
use crate::value::Value;

/// Envelope discriminator that prefixes every signature payload preimage.
pub const ENVELOPE_TYPE_SOROBAN_AUTHORIZATION: u64 = 9;

/// Maximum symbol length accepted by the ledger.
pub const MAX_SYMBOL_LEN: usize = 32;

/// Encode and decode structured values.
///
/// Implementations must be deterministic: equal inputs always produce equal
/// bytes.
pub trait Codec: Send + Sync {
    fn encode_value(&self, value: &Value) -> Result<Vec<u8>, CodecError>;

    fn decode_value(&self, bytes: &[u8]) -> Result<Value, CodecError>;

    fn encode_entry(&self, entry: &AuthorizationEntry) -> Result<Vec<u8>, CodecError>;

    fn decode_entry(&self, bytes: &[u8]) -> Result<AuthorizationEntry, CodecError>;

    fn encode_preimage(&self, preimage: &SignaturePayloadPreimage) -> Result<Vec<u8>, CodecError>;
}

/// Ordering key for a signer-map key: lowercase hex of its encoded bytes.
pub fn hex_sort_key(codec: &dyn Codec, key: &Value) -> Result<String, CodecError> {
    Ok(hex::encode(codec.encode_value(key)?))
}

/// Structure tags.
mod tags {
    pub const VOID: u64 = 0;
    pub const BOOL: u64 = 1;
    pub const U32: u64 = 2;
    pub const I32: u64 = 3;
    pub const U64: u64 = 4;
    pub const I64: u64 = 5;
    pub const U128: u64 = 6;
    pub const I128: u64 = 7;
    pub const BYTES: u64 = 8;
    pub const STRING: u64 = 9;
    pub const SYMBOL: u64 = 10;
    pub const ADDRESS: u64 = 11;
    pub const VEC: u64 = 12;
    pub const MAP: u64 = 13;

    pub const CREDENTIALS_SOURCE_ACCOUNT: u64 = 0;
    pub const CREDENTIALS_ADDRESS: u64 = 1;

    pub const FUNCTION_CONTRACT: u64 = 0;
    pub const FUNCTION_CREATE_CONTRACT: u64 = 1;
}

/// Deterministic CBOR codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct CborCodec;

impl Codec for CborCodec {
    fn encode_value(&self, value: &Value) -> Result<Vec<u8>, CodecError> {
        encode_canonical(&value_to_cbor(value)?)
    }

    fn decode_value(&self, bytes: &[u8]) -> Result<Value, CodecError> {
        let cbor = read_canonical(bytes)?;
        cbor_to_value(&cbor)
    }

    fn encode_entry(&self, entry: &AuthorizationEntry) -> Result<Vec<u8>, CodecError> {
        encode_canonical(&entry_to_cbor(entry)?)
    }

    fn decode_entry(&self, bytes: &[u8]) -> Result<AuthorizationEntry, CodecError> {
        let cbor = read_canonical(bytes)?;
        cbor_to_entry(&cbor)
    }

    fn encode_preimage(&self, preimage: &SignaturePayloadPreimage) -> Result<Vec<u8>, CodecError> {
        let cbor = Cbor::Array(vec![
            uint(ENVELOPE_TYPE_SOROBAN_AUTHORIZATION),
            Cbor::Bytes(preimage.network_id.0.to_vec()),
            Cbor::Integer(preimage.nonce.into()),
            Cbor::Integer(preimage.signature_expiration_ledger.into()),
            invocation_to_cbor(&preimage.invocation)?,
        ]);
        encode_canonical(&cbor)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Typed structures -> CBOR
// ─────────────────────────────────────────────────────────────────────────────

fn uint(n: u64) -> Cbor {
    Cbor::Integer(n.into())
}

fn tagged(tag: u64, fields: Vec<Cbor>) -> Cbor {
    let mut items = Vec::with_capacity(fields.len() + 1);
    items.push(uint(tag));
    items.extend(fields);
    Cbor::Array(items)
}

fn value_to_cbor(value: &Value) -> Result<Cbor, CodecError> {
    let cbor = match value {
        Value::Void => tagged(tags::VOID, vec![]),
        Value::Bool(b) => tagged(tags::BOOL, vec![Cbor::Bool(*b)]),
        Value::U32(n) => tagged(tags::U32, vec![Cbor::Integer((*n).into())]),
        Value::I32(n) => tagged(tags::I32, vec![Cbor::Integer((*n).into())]),
        Value::U64(n) => tagged(tags::U64, vec![Cbor::Integer((*n).into())]),
        Value::I64(n) => tagged(tags::I64, vec![Cbor::Integer((*n).into())]),
        Value::U128(n) => tagged(tags::U128, vec![Cbor::Bytes(n.to_be_bytes().to_vec())]),
        Value::I128(n) => tagged(tags::I128, vec![Cbor::Bytes(n.to_be_bytes().to_vec())]),
        Value::Bytes(b) => tagged(tags::BYTES, vec![Cbor::Bytes(b.to_vec())]),
        Value::String(s) => tagged(tags::STRING, vec![Cbor::Text(s.clone())]),
        Value::Symbol(s) => {
            check_symbol(s)?;
            tagged(tags::SYMBOL, vec![Cbor::Text(s.clone())])
        }
        Value::Address(a) => tagged(tags::ADDRESS, vec![address_to_cbor(a)]),
        Value::Vec(items) => {
            let items = items.iter().map(value_to_cbor).collect::<Result<_, _>>()?;
            tagged(tags::VEC, vec![Cbor::Array(items)])
        }
        Value::Map(entries) => {
            let pairs = entries
                .iter()
                .map(|(k, v)| Ok(Cbor::Array(vec![value_to_cbor(k)?, value_to_cbor(v)?])))
                .collect::<Result<_, CodecError>>()?;
            tagged(tags::MAP, vec![Cbor::Array(pairs)])
        }
    };
    Ok(cbor)
}

fn check_symbol(s: &str) -> Result<(), CodecError> {
    if s.len() > MAX_SYMBOL_LEN {
        return Err(CodecError::Unsupported(format!(
            "symbol longer than {} bytes",
            MAX_SYMBOL_LEN
        )));
    }
    if !s.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_') {
        return Err(CodecError::Unsupported(format!(
            "symbol `{}` contains invalid characters",
            s
        )));
    }
    Ok(())
}

fn address_to_cbor(address: &Address) -> Cbor {
    Cbor::Array(vec![
        uint(address.tag().into()),
        Cbor::Bytes(address.as_bytes().to_vec()),
    ])
}

fn credentials_to_cbor(credentials: &Credentials) -> Result<Cbor, CodecError> {
    Ok(match credentials {
        Credentials::SourceAccount => tagged(tags::CREDENTIALS_SOURCE_ACCOUNT, vec![]),
        Credentials::Address(creds) => tagged(
            tags::CREDENTIALS_ADDRESS,
            vec![
                address_to_cbor(&creds.address),
                Cbor::Integer(creds.nonce.into()),
                Cbor::Integer(creds.signature_expiration_ledger.into()),
                value_to_cbor(&creds.signature)?,
            ],
        ),
    })
}

fn function_to_cbor(function: &AuthorizedFunction) -> Result<Cbor, CodecError> {
    Ok(match function {
        AuthorizedFunction::ContractFn(call) => {
            check_symbol(&call.function_name)?;
            let args = call.args.iter().map(value_to_cbor).collect::<Result<_, _>>()?;
            tagged(
                tags::FUNCTION_CONTRACT,
                vec![
                    address_to_cbor(&call.contract_address),
                    Cbor::Text(call.function_name.clone()),
                    Cbor::Array(args),
                ],
            )
        }
        AuthorizedFunction::CreateContract(create) => tagged(
            tags::FUNCTION_CREATE_CONTRACT,
            vec![
                address_to_cbor(&create.deployer),
                Cbor::Bytes(create.salt.to_vec()),
                Cbor::Bytes(create.wasm_hash.to_vec()),
            ],
        ),
    })
}

fn invocation_to_cbor(invocation: &AuthorizedInvocation) -> Result<Cbor, CodecError> {
    let subs = invocation
        .sub_invocations
        .iter()
        .map(invocation_to_cbor)
        .collect::<Result<_, _>>()?;
    Ok(Cbor::Array(vec![
        function_to_cbor(&invocation.function)?,
        Cbor::Array(subs),
    ]))
}

fn entry_to_cbor(entry: &AuthorizationEntry) -> Result<Cbor, CodecError> {
    Ok(Cbor::Array(vec![
        credentials_to_cbor(&entry.credentials)?,
        invocation_to_cbor(&entry.root_invocation)?,
    ]))
}

// ─────────────────────────────────────────────────────────────────────────────
// CBOR -> typed structures
// ─────────────────────────────────────────────────────────────────────────────

fn read_canonical(bytes: &[u8]) -> Result<Cbor, CodecError> {
    let cbor: Cbor =
        ciborium::de::from_reader(bytes).map_err(|e| CodecError::Decode(e.to_string()))?;
    if encode_canonical(&cbor)? != bytes {
        return Err(CodecError::malformed(
            "document",
            "not in canonical form or has trailing bytes",
        ));
    }
    Ok(cbor)
}

fn array<'a>(cbor: &'a Cbor, what: &'static str) -> Result<&'a [Cbor], CodecError> {
    match cbor {
        Cbor::Array(items) => Ok(items),
        _ => Err(CodecError::malformed(what, "expected array")),
    }
}

fn fixed<'a>(cbor: &'a Cbor, len: usize, what: &'static str) -> Result<&'a [Cbor], CodecError> {
    let items = array(cbor, what)?;
    if items.len() != len {
        return Err(CodecError::malformed(
            what,
            format!("expected {} fields, got {}", len, items.len()),
        ));
    }
    Ok(items)
}

fn int<T: TryFrom<i128>>(cbor: &Cbor, what: &'static str) -> Result<T, CodecError> {
    match cbor {
        Cbor::Integer(i) => {
            let n: i128 = (*i).into();
            T::try_from(n).map_err(|_| CodecError::malformed(what, "integer out of range"))
        }
        _ => Err(CodecError::malformed(what, "expected integer")),
    }
}

fn bytes<'a>(cbor: &'a Cbor, what: &'static str) -> Result<&'a [u8], CodecError> {
    match cbor {
        Cbor::Bytes(b) => Ok(b),
        _ => Err(CodecError::malformed(what, "expected byte string")),
    }
}

fn bytes32(cbor: &Cbor, what: &'static str) -> Result<[u8; 32], CodecError> {
    bytes(cbor, what)?
        .try_into()
        .map_err(|_| CodecError::malformed(what, "expected 32 bytes"))
}

fn bytes16(cbor: &Cbor, what: &'static str) -> Result<[u8; 16], CodecError> {
    bytes(cbor, what)?
        .try_into()
        .map_err(|_| CodecError::malformed(what, "expected 16 bytes"))
}

fn text(cbor: &Cbor, what: &'static str) -> Result<String, CodecError> {
    match cbor {
        Cbor::Text(s) => Ok(s.clone()),
        _ => Err(CodecError::malformed(what, "expected text")),
    }
}

/// Split a tagged array into its tag and the remaining fields.
fn split_tag<'a>(cbor: &'a Cbor, what: &'static str) -> Result<(u64, &'a [Cbor]), CodecError> {
    let items = array(cbor, what)?;
    let (tag, rest) = items
        .split_first()
        .ok_or_else(|| CodecError::malformed(what, "missing tag"))?;
    Ok((int(tag, what)?, rest))
}

fn expect_len(fields: &[Cbor], len: usize, what: &'static str) -> Result<(), CodecError> {
    if fields.len() != len {
        return Err(CodecError::malformed(
            what,
            format!("expected {} fields, got {}", len, fields.len()),
        ));
    }
    Ok(())
}

fn cbor_to_value(cbor: &Cbor) -> Result<Value, CodecError> {
    const WHAT: &str = "value";
    let (tag, fields) = split_tag(cbor, WHAT)?;
    let arity = if tag == tags::VOID { 0 } else { 1 };
    expect_len(fields, arity, WHAT)?;

    let value = match tag {
        tags::VOID => Value::Void,
        tags::BOOL => match &fields[0] {
            Cbor::Bool(b) => Value::Bool(*b),
            _ => return Err(CodecError::malformed(WHAT, "expected bool")),
        },
        tags::U32 => Value::U32(int(&fields[0], WHAT)?),
        tags::I32 => Value::I32(int(&fields[0], WHAT)?),
        tags::U64 => Value::U64(int(&fields[0], WHAT)?),
        tags::I64 => Value::I64(int(&fields[0], WHAT)?),
        tags::U128 => Value::U128(u128::from_be_bytes(bytes16(&fields[0], WHAT)?)),
        tags::I128 => Value::I128(i128::from_be_bytes(bytes16(&fields[0], WHAT)?)),
        tags::BYTES => Value::bytes(bytes(&fields[0], WHAT)?),
        tags::STRING => Value::String(text(&fields[0], WHAT)?),
        tags::SYMBOL => {
            let s = text(&fields[0], WHAT)?;
            check_symbol(&s)?;
            Value::Symbol(s)
        }
        tags::ADDRESS => Value::Address(cbor_to_address(&fields[0])?),
        tags::VEC => Value::Vec(
            array(&fields[0], WHAT)?
                .iter()
                .map(cbor_to_value)
                .collect::<Result<_, _>>()?,
        ),
        tags::MAP => {
            let pairs = array(&fields[0], WHAT)?
                .iter()
                .map(|pair| {
                    let kv = fixed(pair, 2, "map entry")?;
                    Ok((cbor_to_value(&kv[0])?, cbor_to_value(&kv[1])?))
                })
                .collect::<Result<_, CodecError>>()?;
            Value::Map(pairs)
        }
        other => {
            return Err(CodecError::malformed(WHAT, format!("unknown tag {}", other)));
        }
    };
    Ok(value)
}

fn cbor_to_address(cbor: &Cbor) -> Result<Address, CodecError> {
    const WHAT: &str = "address";
    let items = fixed(cbor, 2, WHAT)?;
    let raw = bytes32(&items[1], WHAT)?;
    match int::<u8>(&items[0], WHAT)? {
        0 => Ok(Address::Account(raw)),
        1 => Ok(Address::Contract(raw)),
        other => Err(CodecError::malformed(WHAT, format!("unknown tag {}", other))),
    }
}

fn cbor_to_credentials(cbor: &Cbor) -> Result<Credentials, CodecError> {
    const WHAT: &str = "credentials";
    let (tag, fields) = split_tag(cbor, WHAT)?;
    match tag {
        tags::CREDENTIALS_SOURCE_ACCOUNT => {
            expect_len(fields, 0, WHAT)?;
            Ok(Credentials::SourceAccount)
        }
        tags::CREDENTIALS_ADDRESS => {
            expect_len(fields, 4, WHAT)?;
            Ok(Credentials::Address(AddressCredentials {
                address: cbor_to_address(&fields[0])?,
                nonce: int(&fields[1], WHAT)?,
                signature_expiration_ledger: int(&fields[2], WHAT)?,
                signature: cbor_to_value(&fields[3])?,
            }))
        }
        other => Err(CodecError::malformed(WHAT, format!("unknown tag {}", other))),
    }
}

fn cbor_to_function(cbor: &Cbor) -> Result<AuthorizedFunction, CodecError> {
    const WHAT: &str = "authorized function";
    let (tag, fields) = split_tag(cbor, WHAT)?;
    expect_len(fields, 3, WHAT)?;
    match tag {
        tags::FUNCTION_CONTRACT => {
            let function_name = text(&fields[1], WHAT)?;
            check_symbol(&function_name)?;
            Ok(AuthorizedFunction::ContractFn(InvokeContractArgs {
                contract_address: cbor_to_address(&fields[0])?,
                function_name,
                args: array(&fields[2], WHAT)?
                    .iter()
                    .map(cbor_to_value)
                    .collect::<Result<_, _>>()?,
            }))
        }
        tags::FUNCTION_CREATE_CONTRACT => {
            Ok(AuthorizedFunction::CreateContract(CreateContractArgs {
                deployer: cbor_to_address(&fields[0])?,
                salt: bytes32(&fields[1], WHAT)?,
                wasm_hash: bytes32(&fields[2], WHAT)?,
            }))
        }
        other => Err(CodecError::malformed(WHAT, format!("unknown tag {}", other))),
    }
}

fn cbor_to_invocation(cbor: &Cbor) -> Result<AuthorizedInvocation, CodecError> {
    let items = fixed(cbor, 2, "invocation")?;
    Ok(AuthorizedInvocation {
        function: cbor_to_function(&items[0])?,
        sub_invocations: array(&items[1], "invocation")?
            .iter()
            .map(cbor_to_invocation)
            .collect::<Result<_, _>>()?,
    })
}

fn cbor_to_entry(cbor: &Cbor) -> Result<AuthorizationEntry, CodecError> {
    let items = fixed(cbor, 2, "authorization entry")?;
    Ok(AuthorizationEntry {
        credentials: cbor_to_credentials(&items[0])?,
        root_invocation: cbor_to_invocation(&items[1])?,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Deterministic writer
// ─────────────────────────────────────────────────────────────────────────────

/// Encode a CBOR value to canonical bytes.
fn encode_canonical(value: &Cbor) -> Result<Vec<u8>, CodecError> {
    let mut buf = Vec::new();
    encode_value_to(&mut buf, value)?;
    Ok(buf)
}

/// Recursively encode a CBOR value.
fn encode_value_to(buf: &mut Vec<u8>, value: &Cbor) -> Result<(), CodecError> {
    match value {
        Cbor::Integer(i) => encode_integer(buf, *i),
        Cbor::Bytes(b) => {
            encode_uint(buf, 2, b.len() as u64);
            buf.extend_from_slice(b);
        }
        Cbor::Text(s) => {
            encode_uint(buf, 3, s.len() as u64);
            buf.extend_from_slice(s.as_bytes());
        }
        Cbor::Array(arr) => {
            encode_uint(buf, 4, arr.len() as u64);
            for item in arr {
                encode_value_to(buf, item)?;
            }
        }
        Cbor::Map(_) => {
            return Err(CodecError::Unsupported(
                "maps are encoded as arrays of pairs".into(),
            ))
        }
        Cbor::Bool(b) => buf.push(if *b { 0xf5 } else { 0xf4 }),
        Cbor::Null => buf.push(0xf6),
        Cbor::Float(_) => {
            return Err(CodecError::Unsupported(
                "floats not supported in canonical encoding".into(),
            ))
        }
        _ => return Err(CodecError::Unsupported("unsupported CBOR value type".into())),
    }
    Ok(())
}

/// Encode a CBOR integer (major types 0 and 1).
fn encode_integer(buf: &mut Vec<u8>, i: Integer) {
    let n: i128 = i.into();
    if n >= 0 {
        encode_uint(buf, 0, n as u64);
    } else {
        // CBOR encodes -1 as 0, -2 as 1, etc.
        encode_uint(buf, 1, (-1 - n) as u64);
    }
}

/// Encode an unsigned integer with the given major type.
fn encode_uint(buf: &mut Vec<u8>, major: u8, n: u64) {
    let mt = major << 5;
    if n < 24 {
        buf.push(mt | (n as u8));
    } else if n <= 0xff {
        buf.push(mt | 24);
        buf.push(n as u8);
    } else if n <= 0xffff {
        buf.push(mt | 25);
        buf.extend_from_slice(&(n as u16).to_be_bytes());
    } else if n <= 0xffff_ffff {
        buf.push(mt | 26);
        buf.extend_from_slice(&(n as u32).to_be_bytes());
    } else {
        buf.push(mt | 27);
        buf.extend_from_slice(&n.to_be_bytes());
    }
}
