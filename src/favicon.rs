//! Favicon hash index.
//!
//! Two independent lookup tables (md5 and mmh3 hash spaces) map a
//! precomputed favicon hash to the name of the signature declaring it. When
//! two signatures declare the same hash, the one indexed later wins.

use crate::signature::{Signature, SignatureSet};
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct FaviconIndex {
    md5: HashMap<String, String>,
    mmh3: HashMap<String, String>,
}

impl FaviconIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index every favicon hash declared by `signatures`, in order.
    pub fn build(signatures: &SignatureSet) -> Self {
        let mut index = Self::new();
        for signature in signatures {
            index.insert_signature(signature);
        }
        index
    }

    /// Index one signature's hashes, overwriting earlier owners.
    pub fn insert_signature(&mut self, signature: &Signature) {
        for hashes in signature.favicon_hashes() {
            for hash in &hashes.md5 {
                insert(&mut self.md5, "md5", hash, signature.name());
            }
            for hash in &hashes.mmh3 {
                insert(&mut self.mmh3, "mmh3", hash, signature.name());
            }
        }
    }

    pub fn lookup_md5(&self, hash: &str) -> Option<&str> {
        self.md5.get(hash).map(String::as_str)
    }

    pub fn lookup_mmh3(&self, hash: &str) -> Option<&str> {
        self.mmh3.get(hash).map(String::as_str)
    }

    /// Resolve either hash, md5 first. Empty hashes are ignored.
    pub fn lookup(&self, md5: &str, mmh3: &str) -> Option<&str> {
        Some(md5)
            .filter(|h| !h.is_empty())
            .and_then(|h| self.lookup_md5(h))
            .or_else(|| {
                Some(mmh3)
                    .filter(|h| !h.is_empty())
                    .and_then(|h| self.lookup_mmh3(h))
            })
    }

    pub fn md5_len(&self) -> usize {
        self.md5.len()
    }

    pub fn mmh3_len(&self) -> usize {
        self.mmh3.len()
    }

    pub fn is_empty(&self) -> bool {
        self.md5.is_empty() && self.mmh3.is_empty()
    }
}

fn insert(table: &mut HashMap<String, String>, space: &str, hash: &str, owner: &str) {
    if let Some(previous) = table.insert(hash.to_string(), owner.to_string()) {
        if previous != owner {
            debug!(space, hash, previous = %previous, owner, "favicon hash reassigned");
        }
    }
}
