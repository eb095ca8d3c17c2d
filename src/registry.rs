//! Key-manager registry.
//!
//! Global `type_url → KeyManager` map, seeded with the key managers bundled in
//! [`kem`](crate::kem). Lookups take a read lock; registration a write lock.
//! Neither happens on the decryption path.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use once_cell::sync::Lazy;

use crate::keyset::{KeyData, KeysetError, Result};
use crate::primitive::Primitive;

/// Turns serialized key material of one key type into primitives.
pub trait KeyManager: Send + Sync {
    fn type_url(&self) -> &str;

    /// Parse `key_value` and build its primitive.
    fn primitive(&self, key_value: &[u8]) -> Result<Arc<dyn Primitive>>;

    fn does_support(&self, type_url: &str) -> bool {
        self.type_url() == type_url
    }

    /// Public key data for a private key. Managers of public or symmetric
    /// key types keep the default.
    fn public_key_data(&self, _key_value: &[u8]) -> Result<KeyData> {
        Err(KeysetError::NotAPrivateKey(self.type_url().to_string()))
    }
}

static REGISTRY: Lazy<RwLock<HashMap<String, Arc<dyn KeyManager>>>> = Lazy::new(|| {
    let mut managers: HashMap<String, Arc<dyn KeyManager>> = HashMap::new();
    for manager in crate::kem::bundled_key_managers() {
        managers.insert(manager.type_url().to_string(), manager);
    }
    RwLock::new(managers)
});

/// Register a key manager for its type URL. A type URL can only be
/// registered once.
pub fn register_key_manager(manager: Arc<dyn KeyManager>) -> Result<()> {
    let mut registry = REGISTRY.write().map_err(|_| KeysetError::RegistryPoisoned)?;
    let type_url = manager.type_url().to_string();
    if registry.contains_key(&type_url) {
        return Err(KeysetError::KeyManagerAlreadyRegistered(type_url));
    }
    log::debug!("registered key manager for {}", type_url);
    registry.insert(type_url, manager);
    Ok(())
}

pub fn get_key_manager(type_url: &str) -> Result<Arc<dyn KeyManager>> {
    let registry = REGISTRY.read().map_err(|_| KeysetError::RegistryPoisoned)?;
    registry
        .get(type_url)
        .cloned()
        .ok_or_else(|| KeysetError::KeyManagerNotFound(type_url.to_string()))
}

/// Build the primitive for `key_data` through its registered manager.
pub fn primitive(key_data: &KeyData) -> Result<Arc<dyn Primitive>> {
    get_key_manager(&key_data.type_url)?.primitive(&key_data.value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kem::x25519_chacha::X25519_HKDF_CHACHA20POLY1305_PRIVATE_KEY_TYPE_URL;
    use crate::testutil::{FixedPrimitive, StubKeyManager};

    #[test]
    fn test_bundled_managers_registered() {
        let km = get_key_manager(X25519_HKDF_CHACHA20POLY1305_PRIVATE_KEY_TYPE_URL).unwrap();
        assert!(km.does_support(X25519_HKDF_CHACHA20POLY1305_PRIVATE_KEY_TYPE_URL));
    }

    #[test]
    fn test_unknown_type_url() {
        assert!(matches!(
            get_key_manager("type.example/none"),
            Err(KeysetError::KeyManagerNotFound(_))
        ));
    }

    #[test]
    fn test_register_once() {
        let url = "type.example/registry-test";
        register_key_manager(Arc::new(StubKeyManager::new(url, FixedPrimitive::encrypt_only())))
            .unwrap();
        assert!(get_key_manager(url).is_ok());

        let again = register_key_manager(Arc::new(StubKeyManager::new(
            url,
            FixedPrimitive::encrypt_only(),
        )));
        assert!(matches!(
            again,
            Err(KeysetError::KeyManagerAlreadyRegistered(_))
        ));
    }

    #[test]
    fn test_cannot_replace_bundled_manager() {
        let result = register_key_manager(Arc::new(StubKeyManager::new(
            X25519_HKDF_CHACHA20POLY1305_PRIVATE_KEY_TYPE_URL,
            FixedPrimitive::encrypt_only(),
        )));
        assert!(result.is_err());
    }
}
