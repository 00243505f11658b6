//! Key derivation - turn a candidate private key into fingerprints and addresses.

use bitcoin::hashes::Hash;
use bitcoin::key::Secp256k1;
use bitcoin::network::Network;
use bitcoin::secp256k1::constants::CURVE_ORDER;
use bitcoin::secp256k1::SecretKey;
use bitcoin::{Address, CompressedPublicKey, PrivateKey, PublicKey};
use num_bigint::BigUint;

use crate::key::Key;

/// Everything derived from one candidate key.
#[derive(Debug, Clone)]
pub struct DerivedKey {
    /// Candidate as enumerated (before curve-order normalization)
    pub candidate: Key,
    /// Private key hex actually used for derivation (64 chars)
    pub private_key_hex: String,
    /// Candidate was zero or not below the curve order
    pub reduced: bool,
    /// Compressed public key hex (66 chars)
    pub pubkey_compressed: String,
    /// Uncompressed public key hex (130 chars)
    pub pubkey_uncompressed: String,
    /// HASH160 of the compressed public key (40 hex chars)
    pub hash160_compressed: String,
    /// HASH160 of the uncompressed public key (40 hex chars)
    pub hash160_uncompressed: String,
    pub wif_compressed: String,
    pub wif_uncompressed: String,
    /// P2PKH address (compressed pubkey)
    pub p2pkh_compressed: String,
    /// P2PKH address (uncompressed pubkey)
    pub p2pkh_uncompressed: String,
    /// P2WPKH (bech32) address
    pub p2wpkh: String,
}

impl DerivedKey {
    /// Addresses in match priority order.
    pub fn addresses(&self) -> [&str; 3] {
        [
            &self.p2pkh_compressed,
            &self.p2pkh_uncompressed,
            &self.p2wpkh,
        ]
    }
}

/// Converts candidate keys into public-key material.
pub struct KeyDeriver {
    secp: Secp256k1<bitcoin::secp256k1::All>,
    network: Network,
}

impl KeyDeriver {
    /// Create new deriver for mainnet.
    pub fn new() -> Self {
        Self::with_network(Network::Bitcoin)
    }

    pub fn with_network(network: Network) -> Self {
        Self {
            secp: Secp256k1::new(),
            network,
        }
    }

    /// Derive public keys, hashes and addresses for a candidate.
    ///
    /// Masks can describe zero or out-of-range scalars; those are reduced mod
    /// the curve order (zero maps to one) so every candidate yields a key.
    pub fn derive(&self, candidate: &Key) -> DerivedKey {
        let secret_key = normalize_secret(&candidate.to_be_bytes());
        let key_bytes = secret_key.secret_bytes();

        let secp_pubkey = bitcoin::secp256k1::PublicKey::from_secret_key(&self.secp, &secret_key);

        let mut priv_compressed = PrivateKey::new(secret_key, self.network);
        priv_compressed.compressed = true;
        let mut priv_uncompressed = PrivateKey::new(secret_key, self.network);
        priv_uncompressed.compressed = false;

        let pk_compressed = PublicKey::from_private_key(&self.secp, &priv_compressed);
        let pk_uncompressed = PublicKey::from_private_key(&self.secp, &priv_uncompressed);

        let p2pkh_compressed = Address::p2pkh(&pk_compressed, self.network).to_string();
        let p2pkh_uncompressed = Address::p2pkh(&pk_uncompressed, self.network).to_string();

        // P2WPKH requires the compressed form
        let compressed_pk = CompressedPublicKey(secp_pubkey);
        let p2wpkh = Address::p2wpkh(&compressed_pk, self.network).to_string();

        DerivedKey {
            candidate: *candidate,
            private_key_hex: hex::encode(key_bytes),
            reduced: Key::from_be_bytes(&key_bytes) != *candidate,
            pubkey_compressed: hex::encode(secp_pubkey.serialize()),
            pubkey_uncompressed: hex::encode(secp_pubkey.serialize_uncompressed()),
            hash160_compressed: hex::encode(pk_compressed.pubkey_hash().to_byte_array()),
            hash160_uncompressed: hex::encode(pk_uncompressed.pubkey_hash().to_byte_array()),
            wif_compressed: priv_compressed.to_wif(),
            wif_uncompressed: priv_uncompressed.to_wif(),
            p2pkh_compressed,
            p2pkh_uncompressed,
            p2wpkh,
        }
    }
}

impl Default for KeyDeriver {
    fn default() -> Self {
        Self::new()
    }
}

fn normalize_secret(bytes: &[u8; 32]) -> SecretKey {
    if let Ok(secret) = SecretKey::from_slice(bytes) {
        return secret;
    }

    let mut int_val = BigUint::from_bytes_be(bytes);
    let order = BigUint::from_bytes_be(&CURVE_ORDER);
    int_val %= &order;
    if int_val == BigUint::from(0u8) {
        int_val = BigUint::from(1u8);
    }

    let mut normalized = [0u8; 32];
    let reduced = int_val.to_bytes_be();
    normalized[32 - reduced.len()..].copy_from_slice(&reduced);
    SecretKey::from_slice(&normalized).expect("normalized key")
}
