//! Authorization entries: signable statements authorizing one invocation.
//!
//! Entries arrive from the ledger (simulation) or a remote server, are
//! decoded from wire bytes, and are only ever mutated by wholesale
//! replacement of the credential's signature and expiration ledger.


use crate::types::Address;
use crate::value::Value;

/// Credentials of an address-based entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressCredentials {
    /// The address that must authorize the invocation.
    pub address: Address,
    /// Replay-protection nonce.
    pub nonce: i64,
    /// Ledger height after which the signature is no longer valid.
    pub signature_expiration_ledger: u32,
    /// Signature material; `Void` until signed.
    pub signature: Value,
}

/// Who must authorize an entry and how.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Authorized implicitly by the transaction source account.
    SourceAccount,
    /// Authorized by an explicit signature from `address`.
    Address(AddressCredentials),
}

/// A contract function call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvokeContractArgs {
    pub contract_address: Address,
    pub function_name: String,
    pub args: Vec<Value>,
}

/// A contract deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateContractArgs {
    pub deployer: Address,
    pub salt: [u8; 32],
    pub wasm_hash: [u8; 32],
}

/// The function an invocation authorizes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizedFunction {
    ContractFn(InvokeContractArgs),
    CreateContract(CreateContractArgs),
}

/// A tree of authorized invocations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizedInvocation {
    pub function: AuthorizedFunction,
    pub sub_invocations: Vec<AuthorizedInvocation>,
}

impl AuthorizedInvocation {
    /// A leaf contract call.
    pub fn contract_call(
        contract_address: Address,
        function_name: impl Into<String>,
        args: Vec<Value>,
    ) -> Self {
        Self {
            function: AuthorizedFunction::ContractFn(InvokeContractArgs {
                contract_address,
                function_name: function_name.into(),
                args,
            }),
            sub_invocations: Vec::new(),
        }
    }

    /// The contract call, if this invocation is one.
    pub fn as_contract_call(&self) -> Option<&InvokeContractArgs> {
        match &self.function {
            AuthorizedFunction::ContractFn(args) => Some(args),
            AuthorizedFunction::CreateContract(_) => None,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.sub_invocations.is_empty()
    }
}

/// A signable authorization for a single root invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationEntry {
    pub credentials: Credentials,
    pub root_invocation: AuthorizedInvocation,
}

impl AuthorizationEntry {
    pub fn new(credentials: Credentials, root_invocation: AuthorizedInvocation) -> Self {
        Self {
            credentials,
            root_invocation,
        }
    }

    pub fn is_address_based(&self) -> bool {
        matches!(self.credentials, Credentials::Address(_))
    }

    /// The address credentials, if any.
    pub fn address_credentials(&self) -> Option<&AddressCredentials> {
        match &self.credentials {
            Credentials::Address(creds) => Some(creds),
            Credentials::SourceAccount => None,
        }
    }

    /// The address that must authorize this entry.
    pub fn address(&self) -> Option<&Address> {
        self.address_credentials().map(|c| &c.address)
    }

    pub fn nonce(&self) -> Option<i64> {
        self.address_credentials().map(|c| c.nonce)
    }

    pub fn signature_expiration_ledger(&self) -> Option<u32> {
        self.address_credentials()
            .map(|c| c.signature_expiration_ledger)
    }

    pub fn signature(&self) -> Option<&Value> {
        self.address_credentials().map(|c| &c.signature)
    }

    /// Whether the root invocation has no sub-invocations.
    pub fn has_empty_sub_invocations(&self) -> bool {
        self.root_invocation.is_leaf()
    }

    /// Whether this entry must be authorized by `address`.
    pub fn is_addressed_to(&self, address: &Address) -> bool {
        self.address() == Some(address)
    }

    /// Copy of this entry with the expiration ledger replaced.
    ///
    /// Source-account entries are returned unchanged.
    pub fn with_expiration(&self, signature_expiration_ledger: u32) -> Self {
        let mut entry = self.clone();
        if let Credentials::Address(creds) = &mut entry.credentials {
            creds.signature_expiration_ledger = signature_expiration_ledger;
        }
        entry
    }

    /// Copy of this entry with the signature replaced.
    ///
    /// Source-account entries are returned unchanged.
    pub fn with_signature(&self, signature: Value) -> Self {
        let mut entry = self.clone();
        if let Credentials::Address(creds) = &mut entry.credentials {
            creds.signature = signature;
        }
        entry
    }
}

/// Builder for address-based contract-call entries.
#[derive(Debug, Clone)]
pub struct EntryBuilder {
    address: Address,
    nonce: i64,
    signature_expiration_ledger: u32,
    signature: Value,
    contract: Address,
    function_name: String,
    args: Vec<Value>,
    sub_invocations: Vec<AuthorizedInvocation>,
}

impl EntryBuilder {
    /// Start an entry that `address` must authorize, calling `function_name` on `contract`.
    pub fn new(address: Address, contract: Address, function_name: impl Into<String>) -> Self {
        Self {
            address,
            nonce: 0,
            signature_expiration_ledger: 0,
            signature: Value::Void,
            contract,
            function_name: function_name.into(),
            args: Vec::new(),
            sub_invocations: Vec::new(),
        }
    }

    pub fn nonce(mut self, nonce: i64) -> Self {
        self.nonce = nonce;
        self
    }

    pub fn expiration(mut self, ledger: u32) -> Self {
        self.signature_expiration_ledger = ledger;
        self
    }

    pub fn signature(mut self, signature: Value) -> Self {
        self.signature = signature;
        self
    }

    pub fn arg(mut self, arg: Value) -> Self {
        self.args.push(arg);
        self
    }

    pub fn sub_invocation(mut self, invocation: AuthorizedInvocation) -> Self {
        self.sub_invocations.push(invocation);
        self
    }

    pub fn build(self) -> AuthorizationEntry {
        let mut root =
            AuthorizedInvocation::contract_call(self.contract, self.function_name, self.args);
        root.sub_invocations = self.sub_invocations;
        AuthorizationEntry {
            credentials: Credentials::Address(AddressCredentials {
                address: self.address,
                nonce: self.nonce,
                signature_expiration_ledger: self.signature_expiration_ledger,
                signature: self.signature,
            }),
            root_invocation: root,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> AuthorizationEntry {
        EntryBuilder::new(
            Address::Contract([0x01; 32]),
            Address::Contract([0x02; 32]),
            "transfer",
        )
        .nonce(7)
        .expiration(100)
        .arg(Value::I128(5))
        .build()
    }

    #[test]
    fn test_predicates() {
        let e = entry();
        assert!(e.is_address_based());
        assert!(e.has_empty_sub_invocations());
        assert_eq!(e.nonce(), Some(7));
        assert!(e.is_addressed_to(&Address::Contract([0x01; 32])));
        assert!(!e.is_addressed_to(&Address::Account([0x01; 32])));
        assert_eq!(
            e.root_invocation.as_contract_call().map(|c| c.function_name.as_str()),
            Some("transfer")
        );
    }

    #[test]
    fn test_source_account_entry() {
        let e = AuthorizationEntry::new(
            Credentials::SourceAccount,
            AuthorizedInvocation::contract_call(Address::Contract([0x02; 32]), "f", vec![]),
        );
        assert!(!e.is_address_based());
        assert_eq!(e.address(), None);
        assert_eq!(e.with_expiration(50), e);
        assert_eq!(e.with_signature(Value::U32(1)), e);
    }

    #[test]
    fn test_wholesale_replacement_leaves_original() {
        let e = entry();
        let updated = e.with_expiration(500).with_signature(Value::empty_bytes());
        assert_eq!(e.signature_expiration_ledger(), Some(100));
        assert_eq!(updated.signature_expiration_ledger(), Some(500));
        assert_eq!(updated.signature(), Some(&Value::empty_bytes()));
        assert_eq!(updated.root_invocation, e.root_invocation);
        assert_eq!(updated.nonce(), e.nonce());
    }

    #[test]
    fn test_sub_invocations() {
        let e = EntryBuilder::new(
            Address::Contract([0x01; 32]),
            Address::Contract([0x02; 32]),
            "f",
        )
        .sub_invocation(AuthorizedInvocation::contract_call(
            Address::Contract([0x03; 32]),
            "g",
            vec![],
        ))
        .build();
        assert!(!e.has_empty_sub_invocations());
    }
}
