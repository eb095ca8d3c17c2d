//! Keyset model and handle.
//!
//! A keyset is an ordered list of keys, one of which is primary. The handle
//! validates the keyset once and resolves it into a [`PrimitiveSet`] through
//! the key-manager [`registry`](crate::registry) or a caller-supplied manager.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::primitive::Primitive;
use crate::primitive_set::{PrimitiveSet, PrimitiveSetBuilder};
use crate::registry::{self, KeyManager};

#[derive(Error, Debug)]
pub enum KeysetError {
    #[error("Empty keyset")]
    EmptyKeyset,
    #[error("Primary key id {0:#010x} appears more than once")]
    DuplicatePrimaryKeyId(u32),
    #[error("Primary key {0:#010x} not found in keyset")]
    PrimaryNotFound(u32),
    #[error("Primary key {0:#010x} is not enabled")]
    PrimaryNotEnabled(u32),
    #[error("Key {0:#010x} is not enabled")]
    KeyNotEnabled(u32),
    #[error("Primitive set has no primary")]
    NoPrimary,
    #[error("No key manager for type {0}")]
    KeyManagerNotFound(String),
    #[error("Key manager for type {0} already registered")]
    KeyManagerAlreadyRegistered(String),
    #[error("Key manager registry lock poisoned")]
    RegistryPoisoned,
    #[error("Invalid key material: {0}")]
    InvalidKey(String),
    #[error("Key type {0} has no public key")]
    NotAPrivateKey(String),
}

pub type Result<T> = std::result::Result<T, KeysetError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyStatus {
    Enabled,
    Disabled,
    Destroyed,
}

/// How ciphertexts produced by a key are tagged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutputPrefixType {
    /// `0x01 ‖ key_id`
    Tink,
    /// `0x00 ‖ key_id`
    Legacy,
    /// `0x00 ‖ key_id`
    Crunchy,
    /// No prefix.
    Raw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyMaterialType {
    SymmetricOrPrivate,
    AsymmetricPublic,
}

/// Serialized key material, interpreted by the key manager for `type_url`.
/// `value` is wiped on drop.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct KeyData {
    #[zeroize(skip)]
    pub type_url: String,
    pub value: Vec<u8>,
    #[zeroize(skip)]
    pub material_type: KeyMaterialType,
}

// Key material never goes to logs.
impl std::fmt::Debug for KeyData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyData")
            .field("type_url", &self.type_url)
            .field("value", &format_args!("<{} bytes>", self.value.len()))
            .field("material_type", &self.material_type)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Key {
    pub key_id: u32,
    pub status: KeyStatus,
    pub output_prefix_type: OutputPrefixType,
    pub key_data: KeyData,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keyset {
    pub primary_key_id: u32,
    pub keys: Vec<Key>,
}

impl Keyset {
    /// Check the structural invariants every handle relies on: at least one
    /// key, and exactly one key carrying the primary id, which is enabled.
    /// Other key ids may repeat; their ciphertexts share a prefix and every
    /// colliding key is tried on decryption.
    pub fn validate(&self) -> Result<()> {
        if self.keys.is_empty() {
            return Err(KeysetError::EmptyKeyset);
        }

        let mut candidates = self.keys.iter().filter(|k| k.key_id == self.primary_key_id);
        let primary = candidates
            .next()
            .ok_or(KeysetError::PrimaryNotFound(self.primary_key_id))?;
        if candidates.next().is_some() {
            return Err(KeysetError::DuplicatePrimaryKeyId(self.primary_key_id));
        }
        if primary.status != KeyStatus::Enabled {
            return Err(KeysetError::PrimaryNotEnabled(primary.key_id));
        }

        Ok(())
    }
}

/// Validated, immutable keyset.
#[derive(Debug, Clone)]
pub struct KeysetHandle {
    keyset: Keyset,
}

impl KeysetHandle {
    pub fn new(keyset: Keyset) -> Result<Self> {
        keyset.validate()?;
        Ok(Self { keyset })
    }

    pub fn keyset(&self) -> &Keyset {
        &self.keyset
    }

    /// Resolve every enabled key through the registry.
    pub fn primitives(&self) -> Result<PrimitiveSet<Arc<dyn Primitive>>> {
        self.primitives_with_key_manager(None)
    }

    /// Resolve every enabled key, preferring `key_manager` for the key types
    /// it supports and falling back to the registry for the rest.
    pub fn primitives_with_key_manager(
        &self,
        key_manager: Option<&dyn KeyManager>,
    ) -> Result<PrimitiveSet<Arc<dyn Primitive>>> {
        let mut builder = PrimitiveSetBuilder::new();

        for key in &self.keyset.keys {
            if key.status != KeyStatus::Enabled {
                log::trace!("skipping {:?} key {:#010x}", key.status, key.key_id);
                continue;
            }

            let primitive = match key_manager {
                Some(km) if km.does_support(&key.key_data.type_url) => {
                    km.primitive(&key.key_data.value)?
                }
                _ => registry::primitive(&key.key_data)?,
            };

            let index = builder.add(primitive, key)?;
            if key.key_id == self.keyset.primary_key_id {
                builder.set_primary(index)?;
            }
        }

        builder.build()
    }

    /// Derive the handle of the matching public keyset. Every key that is not
    /// destroyed must be a private key whose manager can produce public key
    /// data; destroyed keys are left out.
    pub fn public(&self) -> Result<KeysetHandle> {
        let mut keys = Vec::with_capacity(self.keyset.keys.len());
        for key in &self.keyset.keys {
            // Destroyed keys have no material left to derive from.
            if key.status == KeyStatus::Destroyed {
                log::trace!("omitting destroyed key {:#010x} from public keyset", key.key_id);
                continue;
            }
            if key.key_data.material_type != KeyMaterialType::SymmetricOrPrivate {
                return Err(KeysetError::NotAPrivateKey(key.key_data.type_url.clone()));
            }
            let manager = registry::get_key_manager(&key.key_data.type_url)?;
            keys.push(Key {
                key_id: key.key_id,
                status: key.status,
                output_prefix_type: key.output_prefix_type,
                key_data: manager.public_key_data(&key.key_data.value)?,
            });
        }

        KeysetHandle::new(Keyset {
            primary_key_id: self.keyset.primary_key_id,
            keys,
        })
    }
}
