//! Proxy re-encryption collaborator interface
//!
//! The proxy never implements PRE itself. It needs exactly one primitive
//! (`re_encrypt`) plus wire forms for the values it moves around. Instances
//! need the rest (key generation, re-encryption key derivation, decryption).
//! Both sides go through [`PreScheme`] so the backend can be swapped.
//!
//! Every public value has a `*Serialized` wire form: hex-encoded bytes in JSON.

mod mock;

pub use mock::MockScheme;

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors from PRE operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PreError {
    #[error("Key generation failed: {0}")]
    KeyGeneration(String),

    #[error("Invalid key material: {0}")]
    InvalidKey(String),

    #[error("Invalid public parameters: {0}")]
    InvalidParams(String),

    #[error("Re-encryption failed: {0}")]
    ReEncryption(String),

    #[error("Decryption failed: {0}")]
    Decryption(String),

    #[error("Deserialization failed: {0}")]
    Deserialization(String),
}

pub type PreResult<T> = std::result::Result<T, PreError>;

/// Declares a byte-backed PRE value together with its JSON wire form.
macro_rules! pre_value {
    ($(#[$meta:meta])* $name:ident, $wire:ident, $field:ident, $what:literal) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq)]
        pub struct $name {
            bytes: Vec<u8>,
        }

        impl $name {
            pub fn new(bytes: Vec<u8>) -> Self {
                Self { bytes }
            }

            pub fn as_bytes(&self) -> &[u8] {
                &self.bytes
            }

            pub fn serialize(&self) -> $wire {
                $wire {
                    $field: self.bytes.clone(),
                }
            }

            pub fn from_serialized(wire: &$wire) -> PreResult<Self> {
                if wire.$field.is_empty() {
                    return Err(PreError::Deserialization(concat!("empty ", $what).into()));
                }
                Ok(Self::new(wire.$field.clone()))
            }
        }

        #[doc = concat!("Wire form of a ", $what)]
        #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
        pub struct $wire {
            #[serde(with = "hex")]
            pub $field: Vec<u8>,
        }
    };
}

pre_value!(
    /// Scheme-wide public parameters, opaque to the proxy
    PublicParams,
    PublicParamsSerialized,
    params,
    "public parameters"
);

pre_value!(
    /// An instance's PRE public key
    PublicKey,
    PublicKeySerialized,
    key,
    "public key"
);

pre_value!(
    /// Re-encryption key from a leader's key domain to one target instance
    ReEncryptionKey,
    ReEncryptionKeySerialized,
    key,
    "re-encryption key"
);

pre_value!(
    /// Wrapped key encrypted directly under a leader's public key
    Ciphertext1,
    Ciphertext1Serialized,
    ct,
    "direct wrapped key"
);

pre_value!(
    /// Wrapped key after re-encryption towards a target instance
    Ciphertext2,
    Ciphertext2Serialized,
    ct,
    "re-encrypted wrapped key"
);

/// A PRE secret key. Never leaves the instance that generated it.
#[derive(Clone)]
pub struct SecretKey {
    bytes: Vec<u8>,
}

impl SecretKey {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey(..)")
    }
}

/// A keypair (public + secret)
#[derive(Clone, Debug)]
pub struct KeyPair {
    pub public: PublicKey,
    pub secret: SecretKey,
}

/// The external PRE primitives
pub trait PreScheme: Send + Sync {
    /// Human-readable backend name
    fn name(&self) -> &'static str;

    /// Generate fresh scheme-wide public parameters
    fn setup(&self) -> PublicParams;

    /// Check that externally supplied parameters are usable
    fn check_params(&self, pp: &PublicParams) -> PreResult<()>;

    fn generate_keypair(&self, pp: &PublicParams) -> PreResult<KeyPair>;

    /// Check that a public key is well formed for these parameters
    fn check_public_key(&self, pp: &PublicParams, pk: &PublicKey) -> PreResult<()>;

    /// Derive the re-encryption key `from_secret -> to_public` (leader side)
    fn re_encryption_key(
        &self,
        pp: &PublicParams,
        from_secret: &SecretKey,
        to_public: &PublicKey,
    ) -> PreResult<ReEncryptionKey>;

    fn encrypt(&self, pp: &PublicParams, recipient: &PublicKey, plaintext: &[u8]) -> PreResult<Ciphertext1>;

    /// Transform a direct wrapped key into one the re-encryption key's target can open
    fn re_encrypt(&self, pp: &PublicParams, rk: &ReEncryptionKey, ct: &Ciphertext1) -> PreResult<Ciphertext2>;

    fn decrypt(&self, pp: &PublicParams, secret: &SecretKey, ct: &Ciphertext1) -> PreResult<Vec<u8>>;

    fn decrypt_re_encrypted(&self, pp: &PublicParams, secret: &SecretKey, ct: &Ciphertext2) -> PreResult<Vec<u8>>;
}
