//! Public keys and the signing capability.
//!
//! Key material is carried as raw bytes tagged by algorithm; the
//! cryptographic math itself is supplied by callers through [`Signer`],
//! which is the boundary hardware wallets and external signing flows plug
//! into.

use hiero_proto::basic::signature_pair;
use hiero_proto::SignaturePair;

/// A public key, tagged by algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PublicKey {
    /// An Ed25519 public key.
    Ed25519([u8; 32]),
    /// A compressed ECDSA secp256k1 public key.
    EcdsaSecp256k1([u8; 33]),
}

impl PublicKey {
    /// The raw key bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Ed25519(bytes) => bytes,
            Self::EcdsaSecp256k1(bytes) => bytes,
        }
    }

    /// Pairs this key with a signature it produced, in wire form.
    pub(crate) fn to_signature_pair(self, signature: Vec<u8>) -> SignaturePair {
        let variant = match self {
            Self::Ed25519(_) => signature_pair::Signature::Ed25519(signature),
            Self::EcdsaSecp256k1(_) => signature_pair::Signature::EcdsaSecp256k1(signature),
        };
        SignaturePair {
            pub_key_prefix: self.as_bytes().to_vec(),
            signature: Some(variant),
        }
    }
}

/// A key that can authorize a transaction: a single public key or a
/// composite of other keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    /// One public key.
    Single(PublicKey),
    /// All keys in the list must sign.
    KeyList(Vec<Key>),
    /// At least `threshold` of the keys must sign.
    Threshold {
        /// Minimum number of signatures required.
        threshold: u32,
        /// The candidate keys.
        keys: Vec<Key>,
    },
}

/// Capability for producing signatures over signed transaction bodies.
///
/// Implementations hold the private key material; the SDK only ever asks
/// for the public key and for signatures over exact body bytes.
pub trait Signer: Send + Sync {
    /// The public key this signer signs with.
    fn public_key(&self) -> PublicKey;

    /// Signs the given message bytes.
    fn sign(&self, message: &[u8]) -> Vec<u8>;
}
