//! Target matcher - check derived keys against addresses or HASH160 fingerprints.

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::derive::DerivedKey;

/// Match information when a key is found.
#[derive(Debug, Clone)]
pub struct MatchInfo {
    /// Which target form matched
    pub address_type: AddressType,
    /// The matched target as written in the target list
    pub address: String,
}

/// Target forms a derived key is checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressType {
    P2pkhCompressed,
    P2pkhUncompressed,
    P2wpkh,
    Hash160Compressed,
    Hash160Uncompressed,
}

impl AddressType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AddressType::P2pkhCompressed => "p2pkh_compressed",
            AddressType::P2pkhUncompressed => "p2pkh_uncompressed",
            AddressType::P2wpkh => "p2wpkh",
            AddressType::Hash160Compressed => "hash160_compressed",
            AddressType::Hash160Uncompressed => "hash160_uncompressed",
        }
    }
}

/// Target set. Addresses are kept verbatim; 40-char hex lines are treated as
/// HASH160 values and compared case-insensitively.
#[derive(Debug, Default)]
pub struct Matcher {
    addresses: HashSet<String>,
    hash160s: HashSet<String>,
}

impl Matcher {
    /// Load targets from file (one per line, `#` starts a comment line).
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("failed to open targets file {}", path.display()))?;
        let reader = BufReader::new(file);

        let mut matcher = Self::default();
        for line in reader.lines() {
            let l = line?;
            let s = l.trim();
            if !s.is_empty() && !s.starts_with('#') {
                matcher.insert(s);
            }
        }

        Ok(matcher)
    }

    /// Create matcher from a target list.
    pub fn from_targets<I, S>(targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut matcher = Self::default();
        for target in targets {
            matcher.insert(target.as_ref().trim());
        }
        matcher
    }

    fn insert(&mut self, target: &str) {
        if is_hash160(target) {
            self.hash160s.insert(target.to_ascii_lowercase());
        } else {
            self.addresses.insert(target.to_string());
        }
    }

    /// First matching target, checked in a fixed order.
    pub fn check(&self, derived: &DerivedKey) -> Option<MatchInfo> {
        let address_checks = [
            (AddressType::P2pkhCompressed, &derived.p2pkh_compressed),
            (AddressType::P2pkhUncompressed, &derived.p2pkh_uncompressed),
            (AddressType::P2wpkh, &derived.p2wpkh),
        ];
        for (address_type, address) in address_checks {
            if self.addresses.contains(address) {
                return Some(MatchInfo {
                    address_type,
                    address: address.clone(),
                });
            }
        }

        let hash_checks = [
            (AddressType::Hash160Compressed, &derived.hash160_compressed),
            (AddressType::Hash160Uncompressed, &derived.hash160_uncompressed),
        ];
        for (address_type, hash) in hash_checks {
            if self.hash160s.contains(hash) {
                return Some(MatchInfo {
                    address_type,
                    address: hash.clone(),
                });
            }
        }

        None
    }

    /// Number of targets.
    pub fn count(&self) -> usize {
        self.addresses.len() + self.hash160s.len()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }
}

fn is_hash160(s: &str) -> bool {
    s.len() == 40 && s.bytes().all(|b| b.is_ascii_hexdigit())
}
