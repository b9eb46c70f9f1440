// Proxied Lottery - Storage
//
// Per-account persistent key-value storage.
//
// Every key carries a Namespace. Code running against an account may only
// touch its own namespace plus Namespace::ACCESS, so a proxy's reserved
// fields can never collide with the layout of the implementation it forwards to.
use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::program_error::ProgramError;
use std::collections::{BTreeMap, BTreeSet};

/// First component of every storage key
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Namespace(pub u8);

impl Namespace {
    /// Proxy reserved fields (implementation pointer)
    pub const PROXY: Namespace = Namespace(0);
    /// Shared owner record
    pub const ACCESS: Namespace = Namespace(1);
    pub const ENGINE: Namespace = Namespace(2);
    pub const LEDGER: Namespace = Namespace(3);
    pub const FACTORY: Namespace = Namespace(4);

    /// Namespaces an implementation behind a proxy must not own
    pub fn is_reserved(&self) -> bool {
        *self == Self::PROXY || *self == Self::ACCESS
    }
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StorageKey {
    pub namespace: Namespace,
    pub key: Vec<u8>,
}

impl StorageKey {
    pub fn new(namespace: Namespace, key: impl Into<Vec<u8>>) -> Self {
        Self {
            namespace,
            key: key.into(),
        }
    }

    /// Builds a key from a borsh-encoded key descriptor
    pub fn encoded<K: BorshSerialize>(namespace: Namespace, key: &K) -> Result<Self, ProgramError> {
        let key = key
            .try_to_vec()
            .map_err(|e| ProgramError::BorshIoError(e.to_string()))?;
        Ok(Self { namespace, key })
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Storage {
    slots: BTreeMap<StorageKey, Vec<u8>>,
}

impl Storage {
    pub fn get_raw(&self, key: &StorageKey) -> Option<&[u8]> {
        self.slots.get(key).map(Vec::as_slice)
    }

    pub fn set_raw(&mut self, key: StorageKey, value: Vec<u8>) {
        self.slots.insert(key, value);
    }

    pub fn get<T: BorshDeserialize>(&self, key: &StorageKey) -> Result<Option<T>, ProgramError> {
        self.get_raw(key)
            .map(|data| T::try_from_slice(data).map_err(|_| ProgramError::InvalidAccountData))
            .transpose()
    }

    /// Every namespace with at least one populated slot
    pub fn namespaces(&self) -> BTreeSet<Namespace> {
        self.slots.keys().map(|key| key.namespace).collect()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
